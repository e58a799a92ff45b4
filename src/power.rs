//! Power management - periodic scanning vs. row wake-up.
//!
//! While keys are in use the matrix is scanned every scan period.  After
//! a quiet window with no key edit the periodic timer is stopped, every
//! column is driven and the rows are armed as wake-up sources.  The first
//! row edge restarts periodic scanning and runs one scan immediately.
//!
//! nRF52840 power modes:
//! - System ON: scan timer running (~0.5 mA with the link idle)
//! - System ON Idle: CPU sleeping until a GPIOTE row event (~3 µA)

/// Hardware side of the scan/wake switch.
pub trait ScanControl {
    /// Stop the scan timer, drive all columns, arm row wake-up.
    fn enter_low_power(&mut self);
    /// Disarm row wake-up, release the columns, restart the scan timer.
    fn exit_low_power(&mut self);
}

/// Power state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerState {
    /// Periodic matrix scanning.
    Scanning,
    /// Waiting for a row edge.
    LowPower,
}

/// Countdown of edit-free scan time.
#[derive(Clone, Copy, Debug)]
pub struct IdleTimer {
    window_ms: i32,
    remaining_ms: i32,
}

impl IdleTimer {
    pub const fn new(window_ms: i32) -> Self {
        Self {
            window_ms,
            remaining_ms: window_ms,
        }
    }

    /// Account for one scan.  Returns `true` once the quiet window has
    /// elapsed; the countdown is re-armed at the same time.
    pub fn observe(&mut self, activity: bool, elapsed_ms: i32) -> bool {
        if activity {
            self.remaining_ms = self.window_ms;
            return false;
        }

        self.remaining_ms -= elapsed_ms;
        if self.remaining_ms > 0 {
            return false;
        }

        self.remaining_ms = self.window_ms;
        true
    }

    pub fn reset(&mut self) {
        self.remaining_ms = self.window_ms;
    }

    pub fn remaining_ms(&self) -> i32 {
        self.remaining_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_after_window_without_activity() {
        let mut idle = IdleTimer::new(10);
        assert!(!idle.observe(false, 3));
        assert!(!idle.observe(false, 3));
        assert!(!idle.observe(false, 3));
        assert!(idle.observe(false, 3));
        assert_eq!(idle.remaining_ms(), 10);
    }

    #[test]
    fn activity_restarts_window() {
        let mut idle = IdleTimer::new(6);
        assert!(!idle.observe(false, 3));
        assert!(!idle.observe(true, 3));
        assert!(!idle.observe(false, 3));
        assert!(idle.observe(false, 3));
    }

    #[test]
    fn reset_restores_full_window() {
        let mut idle = IdleTimer::new(6);
        idle.observe(false, 3);
        idle.reset();
        assert_eq!(idle.remaining_ms(), 6);
    }
}
