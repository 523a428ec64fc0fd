//! Win32 error code handling
//!
//! The numeric codes are plain data and available on every host so the
//! simulated system can report the same failures the native one does.

use std::fmt;

pub const ERROR_SUCCESS: u32 = 0;
pub const ERROR_FILE_NOT_FOUND: u32 = 2;
pub const ERROR_ACCESS_DENIED: u32 = 5;
pub const ERROR_INVALID_HANDLE: u32 = 6;
pub const ERROR_NO_MORE_FILES: u32 = 18;
pub const ERROR_BAD_LENGTH: u32 = 24;
pub const ERROR_INVALID_PARAMETER: u32 = 87;
pub const ERROR_PARTIAL_COPY: u32 = 299;
pub const ERROR_NOACCESS: u32 = 998;

/// Common Windows error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Success,
    FileNotFound,
    AccessDenied,
    InvalidHandle,
    NoMoreFiles,
    BadLength,
    InvalidParameter,
    PartialCopy,
    NoAccess,
    Unknown(u32),
}

impl From<u32> for ErrorCode {
    fn from(code: u32) -> Self {
        match code {
            ERROR_SUCCESS => ErrorCode::Success,
            ERROR_FILE_NOT_FOUND => ErrorCode::FileNotFound,
            ERROR_ACCESS_DENIED => ErrorCode::AccessDenied,
            ERROR_INVALID_HANDLE => ErrorCode::InvalidHandle,
            ERROR_NO_MORE_FILES => ErrorCode::NoMoreFiles,
            ERROR_BAD_LENGTH => ErrorCode::BadLength,
            ERROR_INVALID_PARAMETER => ErrorCode::InvalidParameter,
            ERROR_PARTIAL_COPY => ErrorCode::PartialCopy,
            ERROR_NOACCESS => ErrorCode::NoAccess,
            _ => ErrorCode::Unknown(code),
        }
    }
}

impl ErrorCode {
    /// Raw numeric value
    pub fn code(&self) -> u32 {
        match self {
            ErrorCode::Success => ERROR_SUCCESS,
            ErrorCode::FileNotFound => ERROR_FILE_NOT_FOUND,
            ErrorCode::AccessDenied => ERROR_ACCESS_DENIED,
            ErrorCode::InvalidHandle => ERROR_INVALID_HANDLE,
            ErrorCode::NoMoreFiles => ERROR_NO_MORE_FILES,
            ErrorCode::BadLength => ERROR_BAD_LENGTH,
            ErrorCode::InvalidParameter => ERROR_INVALID_PARAMETER,
            ErrorCode::PartialCopy => ERROR_PARTIAL_COPY,
            ErrorCode::NoAccess => ERROR_NOACCESS,
            ErrorCode::Unknown(code) => *code,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Success => write!(f, "Success"),
            ErrorCode::FileNotFound => write!(f, "File not found"),
            ErrorCode::AccessDenied => write!(f, "Access denied"),
            ErrorCode::InvalidHandle => write!(f, "Invalid handle"),
            ErrorCode::NoMoreFiles => write!(f, "No more files"),
            ErrorCode::BadLength => write!(f, "Bad length"),
            ErrorCode::InvalidParameter => write!(f, "Invalid parameter"),
            ErrorCode::PartialCopy => write!(f, "Partial copy"),
            ErrorCode::NoAccess => write!(f, "Invalid access to memory location"),
            ErrorCode::Unknown(_) => write!(f, "Unknown error"),
        }
    }
}

/// `GetLastError` for the calling thread
#[cfg(windows)]
pub fn last_error_code() -> u32 {
    unsafe { winapi::um::errhandlingapi::GetLastError() }
}
