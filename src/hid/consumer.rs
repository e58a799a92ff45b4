//! Consumer page (0x0C) report for media and brightness keys.
//!
//! Sent on its own interface next to the keyboard report.  It carries one
//! usage at a time; when several consumer keys are held the most recently
//! pressed one is reported.

/// Wire size: one little-endian 16-bit usage.
pub const CONSUMER_REPORT_SIZE: usize = 2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConsumerReport {
    /// Held usage, `0` when released.
    pub usage: u16,
}

impl ConsumerReport {
    pub const fn empty() -> Self {
        Self::new(0)
    }

    pub const fn new(usage: u16) -> Self {
        Self { usage }
    }

    pub const fn to_bytes(&self) -> [u8; CONSUMER_REPORT_SIZE] {
        self.usage.to_le_bytes()
    }

    /// Write the report to `buf`.  Returns the byte count, or 0 when
    /// `buf` cannot hold it.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        match buf.get_mut(..CONSUMER_REPORT_SIZE) {
            Some(out) => {
                out.copy_from_slice(&self.to_bytes());
                CONSUMER_REPORT_SIZE
            }
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.usage == 0
    }
}

/// One 16-bit array field covering consumer usages 0..=0x3FF.
pub const CONSUMER_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x0C, // Usage Page (Consumer)
    0x09, 0x01, // Usage (Consumer Control)
    0xA1, 0x01, // Collection (Application)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x03, //   Logical Maximum (0x3FF)
    0x19, 0x00, //   Usage Minimum (0)
    0x2A, 0xFF, 0x03, //   Usage Maximum (0x3FF)
    0x75, 0x10, //   Report Size (16)
    0x95, 0x01, //   Report Count (1)
    0x81, 0x00, //   Input (Data, Array, Absolute)
    0xC0, // End Collection
];
