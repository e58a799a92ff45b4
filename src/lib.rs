//! Split wireless keyboard firmware core.
//!
//! Everything here is hardware independent and runs on the host:
//! matrix debouncing, the key registry, keymap translation, HID report
//! building and delivery, the half-to-half relay, device profiles and the
//! cooperative task queue.  The nRF52840 binary (`src/main.rs`, feature
//! `embedded`) implements the [`keyboard::Board`] traits on real hardware
//! and feeds events into [`keyboard::Keyboard`].

#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible to every module.
#[macro_use]
mod fmt;

// ═══════════════════════════════════════════════════════════════════════════
// Configuration and errors
// ═══════════════════════════════════════════════════════════════════════════

pub mod config;
pub mod error;

// ═══════════════════════════════════════════════════════════════════════════
// Key pipeline: matrix → registry → translation → reports → channel
// ═══════════════════════════════════════════════════════════════════════════

pub mod channel;
pub mod hid;
pub mod keymap;
pub mod layouts;
pub mod matrix;
pub mod registry;
pub mod report;
pub mod translate;

// ═══════════════════════════════════════════════════════════════════════════
// Link, profiles, power and scheduling
// ═══════════════════════════════════════════════════════════════════════════

#[path = "ble/adv_parser.rs"]
pub mod adv_parser;
pub mod keyboard;
pub mod power;
pub mod profile;
pub mod relay;
pub mod task;

pub use config::Settings;
pub use error::{Error, StorageError, TransportError};
pub use keyboard::{Board, Keyboard};
pub use task::Task;
