//! USB Device subsystem - presents a composite HID device to the host.
//!
//! The nRF52840's built-in USB 2.0 Full-Speed controller is driven by
//! `embassy-usb`.  We create a **composite device** with two HID
//! interfaces:
//!
//! - Interface 0: Keyboard (boot protocol, LED output report)
//! - Interface 1: Consumer control (media, volume, brightness)
//!
//! The writer task takes finished reports from the keyboard one at a
//! time and signals when it is ready for the next.

pub mod hid_device;
