//! Board layouts: matrix wiring tables and keymaps.

pub mod ergo_travel;
