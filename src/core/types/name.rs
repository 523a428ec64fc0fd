//! Fixed-capacity name buffers as filled in by snapshot enumeration

use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;

/// `MAX_PATH`, capacity of a process executable name
pub const MAX_PATH: usize = 260;

/// `MAX_MODULE_NAME32 + 1`, capacity of a module name
pub const MAX_MODULE_NAME: usize = 256;

/// A name stored in an `N`-byte buffer that is NUL-terminated only when shorter than `N`
///
/// The OS is not required to terminate a name that fills the whole buffer,
/// so the logical name is every byte up to the first NUL, or all `N` bytes
/// when there is none. Comparison is an exact byte comparison of that span.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedName<const N: usize> {
    bytes: [u8; N],
}

pub type ExeName = FixedName<MAX_PATH>;
pub type ModuleName = FixedName<MAX_MODULE_NAME>;

impl<const N: usize> FixedName<N> {
    pub const CAPACITY: usize = N;

    /// Wraps a raw buffer exactly as the OS filled it
    pub const fn from_raw(bytes: [u8; N]) -> Self {
        FixedName { bytes }
    }

    /// Builds a buffer from a name, truncating to `N` bytes and zero-filling the rest
    pub fn from_bytes(name: &[u8]) -> Self {
        let mut bytes = [0u8; N];
        let len = name.len().min(N);
        bytes[..len].copy_from_slice(&name[..len]);
        FixedName { bytes }
    }

    /// Logical name bytes, bounded by the buffer capacity
    pub fn as_bytes(&self) -> &[u8] {
        let len = self.bytes.iter().position(|&b| b == 0).unwrap_or(N);
        &self.bytes[..len]
    }

    /// Whether the name was terminated inside the buffer
    pub fn is_terminated(&self) -> bool {
        self.bytes.contains(&0)
    }

    /// Exact, case-sensitive match against the full name
    pub fn matches(&self, name: &str) -> bool {
        self.as_bytes() == name.as_bytes()
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }

    pub fn raw(&self) -> &[u8; N] {
        &self.bytes
    }
}

impl<const N: usize> From<&str> for FixedName<N> {
    fn from(name: &str) -> Self {
        FixedName::from_bytes(name.as_bytes())
    }
}

impl<const N: usize> fmt::Debug for FixedName<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string_lossy())
    }
}

impl<const N: usize> fmt::Display for FixedName<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl<const N: usize> Serialize for FixedName<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name() {
        let name = ExeName::from("notepad.exe");
        assert_eq!(name.as_bytes(), b"notepad.exe");
        assert!(name.is_terminated());
        assert!(name.matches("notepad.exe"));
    }

    #[test]
    fn test_exact_match_only() {
        let name = ExeName::from("notepad.exe");
        assert!(!name.matches("notepad"));
        assert!(!name.matches("notepad.exe.bak"));
        assert!(!name.matches("NOTEPAD.EXE"));
        assert!(!name.matches(""));
    }

    #[test]
    fn test_name_filling_whole_buffer() {
        let full = "a".repeat(MAX_PATH);
        let name = ExeName::from_raw([b'a'; MAX_PATH]);
        assert!(!name.is_terminated());
        assert_eq!(name.as_bytes().len(), MAX_PATH);
        assert!(name.matches(&full));
        assert!(!name.matches(&full[..MAX_PATH - 1]));
    }

    #[test]
    fn test_longer_query_than_capacity() {
        let name = ExeName::from_raw([b'a'; MAX_PATH]);
        let longer = "a".repeat(MAX_PATH + 1);
        assert!(!name.matches(&longer));
    }

    #[test]
    fn test_bytes_after_terminator_ignored() {
        let mut raw = [0u8; MAX_MODULE_NAME];
        raw[..5].copy_from_slice(b"a.dll");
        raw[6..10].copy_from_slice(b"junk");
        let name = ModuleName::from_raw(raw);
        assert!(name.matches("a.dll"));
        assert_eq!(name.to_string(), "a.dll");
    }

    #[test]
    fn test_truncation() {
        let long = "b".repeat(MAX_MODULE_NAME + 10);
        let name = ModuleName::from(long.as_str());
        assert_eq!(name.as_bytes().len(), MAX_MODULE_NAME);
    }

    #[test]
    fn test_non_utf8_name() {
        let name = FixedName::<8>::from_bytes(&[0xFF, b'x']);
        assert_eq!(name.to_string_lossy(), "\u{FFFD}x");
        assert!(!name.matches("x"));
    }
}
