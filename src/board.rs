//! nRF52840 implementation of the keyboard's hardware seams.
//!
//! - Matrix: columns are push-pull outputs driven high one at a time,
//!   rows are pulled-down inputs.  In low power all columns stay high and
//!   any row edge wakes the scan loop.
//! - Reports go to the USB writer through `REPORTS`; a full channel is
//!   reported as busy.
//! - Profile writes go to the storage task through `PROFILE_WRITES`.
//! - Entropy comes from the SoftDevice RNG pool.

use cortex_m::peripheral::SCB;
use defmt::{debug, warn};
use embassy_futures::select::select_array;
use embassy_time::{block_for, Duration};
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal_async::digital::Wait;
use nrf_softdevice::Softdevice;
use rand_core::{impls, RngCore};

use splitkb::channel::ReportSink;
use splitkb::config::COLUMN_SETTLE_US;
use splitkb::hid::HidReport;
use splitkb::matrix::MatrixPins;
use splitkb::power::ScanControl;
use splitkb::profile::{DeviceProfile, ProfileBackend, SystemControl};
use splitkb::{StorageError, TransportError};

use crate::{PROFILE_WRITES, REPORTS};

pub struct NrfBoard<C, R, const ROWS: usize, const COLS: usize> {
    sd: &'static Softdevice,
    columns: [C; COLS],
    rows: [R; ROWS],
}

impl<C, R, const ROWS: usize, const COLS: usize> NrfBoard<C, R, ROWS, COLS>
where
    C: OutputPin,
    R: InputPin + Wait,
{
    pub fn new(sd: &'static Softdevice, columns: [C; COLS], rows: [R; ROWS]) -> Self {
        Self { sd, columns, rows }
    }

    /// Wait for any row to change level.  Only meaningful after
    /// [`ScanControl::enter_low_power`] drove every column.
    pub async fn wait_for_wake(&mut self) {
        let edges = self.rows.each_mut().map(|row| row.wait_for_any_edge());
        let (result, row) = select_array(edges).await;
        if result.is_err() {
            warn!("row {} wake-up wait failed", row);
        }
    }
}

impl<C, R, const ROWS: usize, const COLS: usize> MatrixPins for NrfBoard<C, R, ROWS, COLS>
where
    C: OutputPin,
    R: InputPin + Wait,
{
    fn select_column(&mut self, col: usize) {
        let _ = self.columns[col].set_high();
        block_for(Duration::from_micros(COLUMN_SETTLE_US));
    }

    fn read_row(&mut self, row: usize) -> bool {
        self.rows[row].is_high().unwrap_or(false)
    }

    fn release_column(&mut self, col: usize) {
        let _ = self.columns[col].set_low();
    }
}

impl<C, R, const ROWS: usize, const COLS: usize> ScanControl for NrfBoard<C, R, ROWS, COLS>
where
    C: OutputPin,
    R: InputPin + Wait,
{
    fn enter_low_power(&mut self) {
        for column in self.columns.iter_mut() {
            let _ = column.set_high();
        }
    }

    fn exit_low_power(&mut self) {
        for column in self.columns.iter_mut() {
            let _ = column.set_low();
        }
    }
}

impl<C, R, const ROWS: usize, const COLS: usize> ReportSink for NrfBoard<C, R, ROWS, COLS> {
    fn send_report(&mut self, report: &HidReport) -> Result<(), TransportError> {
        REPORTS.try_send(*report).map_err(|_| TransportError::Busy)
    }
}

impl<C, R, const ROWS: usize, const COLS: usize> ProfileBackend for NrfBoard<C, R, ROWS, COLS> {
    fn persist(&mut self, profile: &DeviceProfile) -> Result<(), StorageError> {
        PROFILE_WRITES
            .try_send(*profile)
            .map_err(|_| StorageError::Busy)
    }
}

impl<C, R, const ROWS: usize, const COLS: usize> SystemControl for NrfBoard<C, R, ROWS, COLS> {
    fn restart(&mut self) {
        SCB::sys_reset();
    }
}

impl<C, R, const ROWS: usize, const COLS: usize> RngCore for NrfBoard<C, R, ROWS, COLS> {
    fn next_u32(&mut self) -> u32 {
        impls::next_u32_via_fill(self)
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_fill(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        // The pool refills in the background; spin until it has enough.
        while nrf_softdevice::random_bytes(self.sd, dest).is_err() {
            debug!("rng pool empty");
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
