//! Application-wide constants and compile-time configuration.
//!
//! All timing parameters, capacities, storage keys and protocol
//! constants live here so they can be tuned in one place.  The few
//! values that tests want to shrink are also exposed through
//! [`Settings`].

// Matrix scanning

/// Period of the matrix scan timer (ms).
pub const SCAN_PERIOD_MS: u32 = 3;

/// Time a raw level must differ from the stable released state before a
/// press is confirmed (ms).
pub const KEY_PRESS_DEBOUNCE_MS: i32 = 5;

/// Time a raw level must differ from the stable pressed state before a
/// release is confirmed (ms).
pub const KEY_RELEASE_DEBOUNCE_MS: i32 = 19;

/// Edit-free time after which scanning is replaced by a row wake-up (ms).
pub const LOW_POWER_DELAY_MS: i32 = 3000;

// Capacities

/// Keys that can be held on the master half at the same time.
pub const MASTER_KEY_NUM: usize = 10;

/// Keys that can be held on the slave half at the same time.  Also the
/// maximum number of edits in one relay payload.
pub const SLAVE_KEY_NUM: usize = 10;

/// Key registry capacity.
pub const KEY_SLOT_CAPACITY: usize = MASTER_KEY_NUM + SLAVE_KEY_NUM;

/// Key codes carried by one keyboard report.
pub const REPORT_KEY_COUNT: usize = 6;

/// Pending HID reports held while the transport is busy.
pub const REPORT_BUFFER_CAPACITY: usize = 5;

/// Pending cooperative tasks.
pub const TASK_QUEUE_CAPACITY: usize = 10;

/// Number of paired-host profiles.
pub const PROFILE_SLOTS: usize = 3;

/// Number of keymap layers addressable by a layer-switch code.
pub const MAX_LAYERS: u8 = 16;

// Profile storage

/// Storage key of the device profile record.
pub const PROFILE_RECORD_KEY: u16 = 0x4816;

/// Flash page index where profile storage starts (4 KB per page on nRF52840).
pub const STORAGE_FLASH_PAGE_START: u32 = 240;

/// Number of flash pages reserved for profile storage.
pub const STORAGE_FLASH_PAGE_COUNT: u32 = 4;

// Link relay (half-to-half BLE link)

/// Link service UUID `0D66F36B-AF06-44F6-A004-F8A8138518C0`, little-endian
/// as found in advertising data.
pub const LINK_SERVICE_UUID_LE: [u8; 16] = [
    0xC0, 0x18, 0x85, 0x13, 0xA8, 0xF8, 0x04, 0xA0, 0xF6, 0x44, 0x06, 0xAF, 0x6B, 0xF3, 0x66, 0x0D,
];

/// BLE connection interval range for the link (in 1.25 ms units).
/// 6 = 7.5 ms.
pub const LINK_CONN_INTERVAL_MIN: u16 = 6;
pub const LINK_CONN_INTERVAL_MAX: u16 = 12;

/// BLE slave latency on the link.
pub const LINK_SLAVE_LATENCY: u16 = 0;

/// BLE supervision timeout (in 10 ms units). 400 = 4 s.
pub const LINK_SUP_TIMEOUT: u16 = 400;

// USB

/// USB VID/PID - use the "pid.codes" open-source test VID.
/// Replace with your own allocated VID/PID for production.
pub const USB_VID: u16 = 0x1209;
pub const USB_PID: u16 = 0x0002;

/// GAP device name of the master half.
pub const DEVICE_NAME: &str = "ErgoTravel";

/// USB device strings.
pub const USB_MANUFACTURER: &str = "splitkb";
pub const USB_PRODUCT: &str = "ErgoTravel split keyboard";
pub const USB_SERIAL_NUMBER: &str = "000001";

/// USB HID polling interval (ms).
pub const USB_HID_POLL_MS: u8 = 1;

// GPIO pin assignments (both halves)
//
//   Rows    → P0.28, P0.29, P0.30, P0.15   (inputs, pull-down)
//   Columns → P0.04, P0.03, P0.02, P0.12, P0.14, P0.13, P0.11  (outputs)

/// Settle time after driving a column before sampling rows (µs).
pub const COLUMN_SETTLE_US: u64 = 100;

/// Runtime-tunable timing.
///
/// `Default` mirrors the constants above.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Settings {
    pub scan_period_ms: u32,
    pub press_debounce_ms: i32,
    pub release_debounce_ms: i32,
    pub low_power_delay_ms: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scan_period_ms: SCAN_PERIOD_MS,
            press_debounce_ms: KEY_PRESS_DEBOUNCE_MS,
            release_debounce_ms: KEY_RELEASE_DEBOUNCE_MS,
            low_power_delay_ms: LOW_POWER_DELAY_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layouts::ergo_travel::COLS;

    #[test]
    fn column_settling_fits_in_one_scan_period() {
        assert!(COLUMN_SETTLE_US >= 100);
        assert!(COLUMN_SETTLE_US * COLS as u64 <= SCAN_PERIOD_MS as u64 * 1000);
    }
}
