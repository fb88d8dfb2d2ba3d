//! Logging abstraction layer
//!
//! Logging macros that work with both the `log` and `tracing` crates.
//!
//! # Features
//!
//! - `log` (default) - Uses the standard `log` crate
//! - `tracing` - Uses the `tracing` crate for structured logging
//!
//! Choose one feature at compile time. They are mutually exclusive.
//!
//! # Usage
//!
//! ```ignore
//! use client_mvc::{debug_log, info_log, trace_log};
//!
//! trace_log!("Checking url");
//! debug_log!("Dispatching fragment: {}", fragment);
//! info_log!("History started");
//! ```

/// Trace-level logging
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::trace!($($arg)*);
        #[cfg(feature = "log")]
        ::log::trace!($($arg)*);
    };
}

/// Debug-level logging
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::debug!($($arg)*);
        #[cfg(feature = "log")]
        ::log::debug!($($arg)*);
    };
}

/// Info-level logging
#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::info!($($arg)*);
        #[cfg(feature = "log")]
        ::log::info!($($arg)*);
    };
}

/// Warn-level logging
///
/// Used for misuse that is reported back to the caller as an error.
#[macro_export]
macro_rules! warn_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::warn!($($arg)*);
        #[cfg(feature = "log")]
        ::log::warn!($($arg)*);
    };
}

/// Error-level logging
#[macro_export]
macro_rules! error_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::error!($($arg)*);
        #[cfg(feature = "log")]
        ::log::error!($($arg)*);
    };
}
