//! Half-to-half link relay.
//!
//! The slave half does not translate anything: it scans and debounces its
//! own matrix and forwards the signed key edits of each scan as one
//! notification.  Every byte of the payload is one `i8` edit, `+index`
//! for a press and `-index` for a release, in scan order.  There are no
//! sequence numbers; the master applies the edits in payload order to
//! the registry under [`Source::Remote`](crate::registry::Source).

use heapless::Vec;

use crate::config::{Settings, SLAVE_KEY_NUM};
use crate::matrix::{Debouncer, MatrixLayout, MatrixPins};
use crate::power::IdleTimer;

/// Signed key edits carried by one link notification.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RelayPayload {
    edits: Vec<i8, SLAVE_KEY_NUM>,
}

impl RelayPayload {
    pub const fn new() -> Self {
        Self { edits: Vec::new() }
    }

    /// Decode a notification.  Bytes beyond the payload limit are dropped.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut payload = Self::new();
        for &byte in data {
            if !payload.push(byte as i8) {
                warn!("relay payload of {} bytes truncated", data.len());
                break;
            }
        }
        payload
    }

    /// Append one edit.  Returns `false` when the payload is full.
    pub fn push(&mut self, edit: i8) -> bool {
        self.edits.push(edit).is_ok()
    }

    pub fn edits(&self) -> &[i8] {
        &self.edits
    }

    /// Wire form (two's complement bytes).
    pub fn to_bytes(&self) -> Vec<u8, SLAVE_KEY_NUM> {
        self.edits.iter().map(|&e| e as u8).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

/// Scanner side of the slave half.
pub struct SlaveHalf<'a, const ROWS: usize, const COLS: usize> {
    layout: &'a MatrixLayout<ROWS, COLS>,
    matrix: Debouncer<ROWS, COLS>,
    idle: IdleTimer,
    scan_period_ms: i32,
}

/// Result of one slave scan.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SlaveScan {
    /// Edits to notify, `None` when nothing changed.
    pub payload: Option<RelayPayload>,
    /// The idle window elapsed; switch to row wake-up.
    pub enter_low_power: bool,
}

impl<'a, const ROWS: usize, const COLS: usize> SlaveHalf<'a, ROWS, COLS> {
    pub fn new(layout: &'a MatrixLayout<ROWS, COLS>, settings: &Settings) -> Self {
        Self {
            layout,
            matrix: Debouncer::new(settings),
            idle: IdleTimer::new(settings.low_power_delay_ms),
            scan_period_ms: settings.scan_period_ms as i32,
        }
    }

    pub fn scan<P: MatrixPins + ?Sized>(&mut self, pins: &mut P) -> SlaveScan {
        let mut payload = RelayPayload::new();
        let summary = self.matrix.scan(pins, self.layout, |edit| {
            if !payload.push(edit) {
                warn!("relay payload full, dropping edit {}", edit);
            }
        });

        let enter_low_power = self.idle.observe(!summary.is_idle(), self.scan_period_ms);

        SlaveScan {
            payload: (!payload.is_empty()).then_some(payload),
            enter_low_power,
        }
    }

    /// Restart the idle window after a wake-up.
    pub fn wake(&mut self) {
        self.idle.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::tests::FakePins;

    #[test]
    fn payload_decodes_signed_bytes() {
        let payload = RelayPayload::from_bytes(&[0x02, 0x09, 0xFE]);
        assert_eq!(payload.edits(), &[2, 9, -2]);
        assert_eq!(payload.to_bytes().as_slice(), &[0x02, 0x09, 0xFE]);
    }

    #[test]
    fn oversized_payload_is_truncated() {
        let data = [1u8; SLAVE_KEY_NUM + 4];
        let payload = RelayPayload::from_bytes(&data);
        assert_eq!(payload.edits().len(), SLAVE_KEY_NUM);
    }

    const LAYOUT: MatrixLayout<1, 3> = [[14, 13, 12]];

    fn settle<P: MatrixPins>(half: &mut SlaveHalf<'_, 1, 3>, pins: &mut P) -> SlaveScan {
        let first = half.scan(pins);
        assert_eq!(first.payload, None);
        half.scan(pins)
    }

    #[test]
    fn slave_scan_forwards_edits_in_one_payload() {
        let mut half = SlaveHalf::new(&LAYOUT, &Settings::default());
        let mut pins = FakePins::<1, 3>::new();
        pins.levels[0][0] = true;
        pins.levels[0][2] = true;

        let scan = settle(&mut half, &mut pins);
        assert_eq!(scan.payload.unwrap().edits(), &[14, 12]);

        assert_eq!(half.scan(&mut pins).payload, None);
    }

    #[test]
    fn slave_release_is_negative() {
        let settings = Settings {
            release_debounce_ms: 3,
            ..Settings::default()
        };
        let mut half = SlaveHalf::new(&LAYOUT, &settings);
        let mut pins = FakePins::<1, 3>::new();
        pins.levels[0][1] = true;
        settle(&mut half, &mut pins);

        pins.levels[0][1] = false;
        assert_eq!(half.scan(&mut pins).payload.unwrap().edits(), &[-13]);
    }

    #[test]
    fn slave_goes_idle_after_quiet_window() {
        let settings = Settings {
            low_power_delay_ms: 9,
            ..Settings::default()
        };
        let mut half = SlaveHalf::new(&LAYOUT, &settings);
        let mut pins = FakePins::<1, 3>::new();

        assert!(!half.scan(&mut pins).enter_low_power);
        assert!(!half.scan(&mut pins).enter_low_power);
        assert!(half.scan(&mut pins).enter_low_power);

        half.wake();
        assert!(!half.scan(&mut pins).enter_low_power);
    }
}
