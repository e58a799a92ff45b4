//! Bluetooth Low Energy subsystem.
//!
//! The master half drives the Nordic SoftDevice S140 in **Central** role
//! towards the slave half only:
//!
//! 1. **Scan** for a peripheral advertising the link service UUID.
//! 2. **Connect** and discover the link service.
//! 3. **Subscribe** to the key-index characteristic and forward every
//!    notification to the keyboard as a relay payload.
//!
//! When the link drops the keyboard is told to release all remote keys
//! and the cycle starts over.

pub mod link;
