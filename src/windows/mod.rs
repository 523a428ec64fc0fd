//! Windows API layer
//!
//! All unsafe FFI lives in [`bindings`], which only exists on Windows.
//! [`error_codes`] is plain data and is shared with the simulated system.

#[cfg(windows)]
pub mod bindings;
pub mod error_codes;

pub use error_codes::ErrorCode;
