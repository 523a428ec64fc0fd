//! Error types for cross-process memory operations

use super::{Address, ProcessId, ScalarType};
use crate::windows::error_codes::{ErrorCode, ERROR_PARTIAL_COPY};
use std::fmt;
use thiserror::Error;

/// Main error type for memory operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("{call} failed: {} ({code})", describe(.code))]
    OsCallFailure { call: &'static str, code: u32 },

    #[error("Short transfer at {address}: expected {expected} bytes, moved {actual}")]
    ShortTransfer {
        address: Address,
        expected: usize,
        actual: usize,
    },

    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Module not found in process {pid}: {name}")]
    ModuleNotFound { pid: ProcessId, name: String },

    #[error("Offset chain must contain at least one offset")]
    EmptyOffsetChain,

    #[error("Value {value} cannot be represented exactly as {scalar_type}")]
    ValueNotRepresentable {
        value: String,
        scalar_type: ScalarType,
    },

    #[error("Address {address} overflows when offset by {offset}")]
    AddressOverflow { address: Address, offset: i64 },

    #[error("Invalid memory address: {0}")]
    InvalidAddress(String),

    #[error("Invalid scalar type: {0}")]
    InvalidScalarType(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

fn describe(code: &u32) -> ErrorCode {
    ErrorCode::from(*code)
}

/// Result type alias for memory operations
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Coarse classification of a [`MemoryError`]
///
/// Every error is terminal for the attempted operation. Only an
/// `OsCallFailure` raised by [`close`](crate::memory::MemoryAccessor::close)
/// leaves the handle in an undefined state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An operating system service reported failure
    OsCallFailure,
    /// Enumeration completed but no record matched
    NotFound,
    /// The caller supplied an argument the operation cannot accept
    InvalidArgument,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::OsCallFailure => write!(f, "OS call failure"),
            ErrorKind::NotFound => write!(f, "not found"),
            ErrorKind::InvalidArgument => write!(f, "invalid argument"),
        }
    }
}

impl MemoryError {
    /// Creates an OS call failure carrying the native error code
    pub fn os_call(call: &'static str, code: u32) -> Self {
        MemoryError::OsCallFailure { call, code }
    }

    /// Creates a short transfer error
    pub fn short_transfer(address: Address, expected: usize, actual: usize) -> Self {
        MemoryError::ShortTransfer {
            address,
            expected,
            actual,
        }
    }

    /// Creates a value-not-representable error
    pub fn not_representable(value: impl fmt::Display, scalar_type: ScalarType) -> Self {
        MemoryError::ValueNotRepresentable {
            value: value.to_string(),
            scalar_type,
        }
    }

    /// Creates a module-not-found error
    pub fn module_not_found(pid: ProcessId, name: impl Into<String>) -> Self {
        MemoryError::ModuleNotFound {
            pid,
            name: name.into(),
        }
    }

    /// Returns the taxonomy bucket this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            MemoryError::OsCallFailure { .. } | MemoryError::ShortTransfer { .. } => {
                ErrorKind::OsCallFailure
            }
            MemoryError::ProcessNotFound(_) | MemoryError::ModuleNotFound { .. } => {
                ErrorKind::NotFound
            }
            MemoryError::EmptyOffsetChain
            | MemoryError::ValueNotRepresentable { .. }
            | MemoryError::AddressOverflow { .. }
            | MemoryError::InvalidAddress(_)
            | MemoryError::InvalidScalarType(_)
            | MemoryError::InvalidValue(_) => ErrorKind::InvalidArgument,
        }
    }

    /// Native OS error code, when the error originated from an OS call
    ///
    /// Short transfers report `ERROR_PARTIAL_COPY`.
    pub fn os_code(&self) -> Option<u32> {
        match self {
            MemoryError::OsCallFailure { code, .. } => Some(*code),
            MemoryError::ShortTransfer { .. } => Some(ERROR_PARTIAL_COPY),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}
