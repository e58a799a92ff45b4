//! Unified error type for splitkb.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Every variant here is fatal: the firmware logs it and resets rather
//! than keep running with an inconsistent pipeline or pairing state.
//! Recoverable conditions (full registry, full report buffer, busy
//! transport) never surface as an `Error`.

/// Top-level error type used across the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // Scheduling
    /// The cooperative task queue had no room for a new task.
    TaskQueueFull,

    // Host transport
    /// The host transport rejected a report with a non-retryable error.
    Transport(u32),

    // Storage
    /// Persisting the device profile failed.
    Storage(StorageError),
}

/// Failures of the profile persistence backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// The write request could not be queued.
    Busy,
    /// Flash read/write/erase failed.
    Flash,
    /// The stored record is too short or malformed.
    Corrupt,
}

/// Result of handing one report to the host transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// Transport buffers are full. Retry after the next ready signal.
    Busy,
    /// The transport refused this report for a transient reason
    /// (notifications disabled, bus suspended). The report is dropped.
    Discarded,
    /// Any other failure, with the raw stack error code.
    Failed(u32),
}

// Convenience conversions

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Error::Storage(e)
    }
}
