//! Keyboard input report and LED output report.
//!
//! The input report uses the boot layout so it works before the host
//! loads a report parser:
//! ```text
//! [0]     modifier bits, LCtrl = bit 0 ... RGUI = bit 7
//! [1]     0
//! [2..8]  key usages in press order, zero padded
//! ```

use crate::config::REPORT_KEY_COUNT;

/// Keyboard report size in bytes.
pub const KEYBOARD_REPORT_SIZE: usize = 2 + REPORT_KEY_COUNT;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardReport {
    pub modifier: u8,
    pub reserved: u8,
    /// Key codes in press order, zero padded.
    pub keycodes: [u8; REPORT_KEY_COUNT],
}

impl KeyboardReport {
    pub const fn empty() -> Self {
        Self {
            modifier: 0,
            reserved: 0,
            keycodes: [0; REPORT_KEY_COUNT],
        }
    }

    /// Put `usage` in the next free key position.
    ///
    /// Returns `false` when all positions are taken (rollover exceeded).
    pub fn push_key(&mut self, usage: u8) -> bool {
        match self.keycodes.iter_mut().find(|k| **k == 0) {
            Some(slot) => {
                *slot = usage;
                true
            }
            None => false,
        }
    }

    /// Write the report to `buf`.  Returns the byte count, or 0 when
    /// `buf` cannot hold it.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        let Some(out) = buf.get_mut(..KEYBOARD_REPORT_SIZE) else {
            return 0;
        };
        out[0] = self.modifier;
        out[1] = self.reserved;
        out[2..].copy_from_slice(&self.keycodes);
        KEYBOARD_REPORT_SIZE
    }

    /// No key and no modifier held.
    pub fn is_empty(&self) -> bool {
        self.modifier == 0 && self.keycodes.iter().all(|&k| k == 0)
    }
}

/// Host-controlled keyboard LEDs (output report, byte 0).
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardLeds(pub u8);

impl KeyboardLeds {
    pub const NUM_LOCK: u8 = 0x01;
    pub const CAPS_LOCK: u8 = 0x02;
    pub const SCROLL_LOCK: u8 = 0x04;

    /// Parse an output report.  An empty report leaves all LEDs off.
    pub fn from_output_report(data: &[u8]) -> Self {
        Self(data.first().copied().unwrap_or(0))
    }

    pub fn caps_lock(&self) -> bool {
        self.0 & Self::CAPS_LOCK != 0
    }

    pub fn num_lock(&self) -> bool {
        self.0 & Self::NUM_LOCK != 0
    }
}

/// Boot-compatible keyboard: modifier bits, a padding byte, five LED
/// outputs and a six-entry key array.
pub const KEYBOARD_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    // modifiers
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0xE0, //   Usage Minimum (224)
    0x29, 0xE7, //   Usage Maximum (231)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    0x95, 0x01, //   Report Count (1)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x01, //   Input (Constant)
    // host LEDs
    0x05, 0x08, //   Usage Page (LEDs)
    0x19, 0x01, //   Usage Minimum (1)
    0x29, 0x05, //   Usage Maximum (5)
    0x95, 0x05, //   Report Count (5)
    0x75, 0x01, //   Report Size (1)
    0x91, 0x02, //   Output (Data, Variable, Absolute)
    0x95, 0x01, //   Report Count (1)
    0x75, 0x03, //   Report Size (3)
    0x91, 0x01, //   Output (Constant)
    // key array
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0x00, //   Usage Minimum (0)
    0x29, 0xFF, //   Usage Maximum (255)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, //   Logical Maximum (255)
    0x95, 0x06, //   Report Count (6)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x00, //   Input (Data, Array)
    0xC0, // End Collection
];
