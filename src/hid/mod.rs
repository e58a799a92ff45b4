//! HID report types sent to the host.

pub mod consumer;
pub mod keyboard;


pub use consumer::ConsumerReport;
pub use keyboard::{KeyboardLeds, KeyboardReport};

/// One outgoing report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HidReport {
    Keyboard(KeyboardReport),
    Consumer(ConsumerReport),
}

impl HidReport {
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        match self {
            HidReport::Keyboard(k) => k.serialize(buf),
            HidReport::Consumer(c) => c.serialize(buf),
        }
    }

    pub fn is_keyboard(&self) -> bool {
        matches!(self, HidReport::Keyboard(_))
    }

    pub fn is_consumer(&self) -> bool {
        matches!(self, HidReport::Consumer(_))
    }
}
