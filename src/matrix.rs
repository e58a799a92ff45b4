//! Key matrix scanner and debouncer.
//!
//! Each scan strobes one column at a time and samples every row.  A cell
//! keeps a confirmed (stable) level and a countdown in milliseconds:
//!
//! - raw == stable: the countdown is re-armed with the threshold for the
//!   stable level (release threshold while pressed, press threshold while
//!   released).
//! - raw != stable: the countdown drops by one scan period; once it
//!   reaches zero the stable level flips and an edge is emitted, `+index`
//!   for a press and `-index` for a release.
//!
//! Debounce is pure level counting, no timestamps are involved.

use crate::config::Settings;

/// Electrical access to the switch matrix.
///
/// Implementations drive one column, let it settle and read each row.
pub trait MatrixPins {
    /// Drive `col` active.
    fn select_column(&mut self, col: usize);
    /// Sample `row` while a column is driven. `true` = switch closed.
    fn read_row(&mut self, row: usize) -> bool;
    /// Return `col` to idle.
    fn release_column(&mut self, col: usize);
}

/// Logical key index for each `(row, col)` cell.
///
/// Indices are 1-based; `0` marks a position with no switch.
pub type MatrixLayout<const ROWS: usize, const COLS: usize> = [[i8; COLS]; ROWS];

#[derive(Clone, Copy, Debug)]
struct Cell {
    pressed: bool,
    countdown: i32,
}

/// Edges produced by one scan pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanSummary {
    pub presses: u8,
    pub releases: u8,
}

impl ScanSummary {
    /// `true` if the pass emitted no edge at all.
    pub fn is_idle(&self) -> bool {
        self.presses == 0 && self.releases == 0
    }
}

/// Debounced view of a `ROWS x COLS` matrix.
pub struct Debouncer<const ROWS: usize, const COLS: usize> {
    cells: [[Cell; COLS]; ROWS],
    period_ms: i32,
    press_ms: i32,
    release_ms: i32,
}

impl<const ROWS: usize, const COLS: usize> Debouncer<ROWS, COLS> {
    pub fn new(settings: &Settings) -> Self {
        let press_ms = settings.press_debounce_ms;
        Self {
            cells: [[Cell {
                pressed: false,
                countdown: press_ms,
            }; COLS]; ROWS],
            period_ms: settings.scan_period_ms as i32,
            press_ms,
            release_ms: settings.release_debounce_ms,
        }
    }

    /// Run one scan pass, calling `emit` with every confirmed edge in
    /// column-major order.
    pub fn scan<P, F>(
        &mut self,
        pins: &mut P,
        layout: &MatrixLayout<ROWS, COLS>,
        mut emit: F,
    ) -> ScanSummary
    where
        P: MatrixPins + ?Sized,
        F: FnMut(i8),
    {
        let mut summary = ScanSummary::default();

        for col in 0..COLS {
            pins.select_column(col);
            for row in 0..ROWS {
                let raw = pins.read_row(row);
                let Some(pressed) = self.sample(row, col, raw) else {
                    continue;
                };
                let index = layout[row][col];
                if index <= 0 {
                    continue;
                }
                if pressed {
                    summary.presses = summary.presses.saturating_add(1);
                    emit(index);
                } else {
                    summary.releases = summary.releases.saturating_add(1);
                    emit(-index);
                }
            }
            pins.release_column(col);
        }

        summary
    }

    /// Confirmed level of a cell.
    pub fn is_pressed(&self, row: usize, col: usize) -> bool {
        self.cells[row][col].pressed
    }

    /// Feed one raw sample. Returns the new stable level when it flips.
    fn sample(&mut self, row: usize, col: usize, raw: bool) -> Option<bool> {
        let (press_ms, release_ms) = (self.press_ms, self.release_ms);
        let cell = &mut self.cells[row][col];

        if raw == cell.pressed {
            cell.countdown = if cell.pressed { release_ms } else { press_ms };
            return None;
        }

        cell.countdown -= self.period_ms;
        if cell.countdown > 0 {
            return None;
        }

        cell.pressed = raw;
        cell.countdown = if raw { release_ms } else { press_ms };
        Some(raw)
    }
}
