//! Target-process address type with hex parsing

use super::error::{MemoryError, MemoryResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A virtual address in the *target* process
///
/// Never dereferenced locally; every access goes through a
/// [`MemoryAccessor`](crate::memory::MemoryAccessor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub usize);

impl Address {
    /// Creates a new address from a usize value
    pub const fn new(value: usize) -> Self {
        Address(value)
    }

    /// Creates a null address (0x0)
    pub const fn null() -> Self {
        Address(0)
    }

    /// Checks if the address is null
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Returns the raw usize value
    pub const fn as_usize(&self) -> usize {
        self.0
    }

    /// Returns the raw value as u64
    pub const fn as_u64(&self) -> u64 {
        self.0 as u64
    }

    /// Adds a signed offset, failing instead of wrapping around the address space
    pub fn checked_offset(&self, offset: i64) -> MemoryResult<Self> {
        isize::try_from(offset)
            .ok()
            .and_then(|delta| self.0.checked_add_signed(delta))
            .map(Address)
            .ok_or(MemoryError::AddressOverflow {
                address: *self,
                offset,
            })
    }

    /// Adds an unsigned byte count, failing on overflow
    pub fn checked_add(&self, count: usize) -> Option<Self> {
        self.0.checked_add(count).map(Address)
    }
}

impl FromStr for Address {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let prefixed = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .or_else(|| s.strip_prefix('$'));

        let (digits, radix) = if let Some(hex) = prefixed {
            (hex, 16)
        } else if s.chars().any(|c| c.is_ascii_alphabetic()) {
            (s, 16)
        } else {
            (s, 10)
        };

        unsigned_digits(digits)
            .and_then(|digits| usize::from_str_radix(digits, radix).ok())
            .map(Address::new)
            .ok_or_else(|| MemoryError::InvalidAddress(s.to_string()))
    }
}

/// `digits` unless it starts with a sign; `from_str_radix` would accept one
pub(super) fn unsigned_digits(digits: &str) -> Option<&str> {
    (!digits.starts_with(['+', '-'])).then_some(digits)
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

impl fmt::UpperHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

impl From<usize> for Address {
    fn from(value: usize) -> Self {
        Address::new(value)
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Address::new(value as usize)
    }
}
