//! Non-empty pointer offset chains

use super::address::unsigned_digits;
use super::error::{MemoryError, MemoryResult};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Offsets describing successive pointer hops
///
/// All offsets but the last are added to a pointer that is then
/// dereferenced; the last one is added without a further dereference.
/// `[0x10, 0x0, 0x30]` evaluates `[[base + 0x10] + 0x0] + 0x30`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OffsetChain(Vec<i64>);

impl OffsetChain {
    /// Fails with [`MemoryError::EmptyOffsetChain`] when `offsets` is empty
    pub fn new(offsets: Vec<i64>) -> MemoryResult<Self> {
        if offsets.is_empty() {
            return Err(MemoryError::EmptyOffsetChain);
        }
        Ok(OffsetChain(offsets))
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    /// Number of dereferences the chain performs
    pub fn depth(&self) -> usize {
        self.0.len() - 1
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl TryFrom<Vec<i64>> for OffsetChain {
    type Error = MemoryError;

    fn try_from(offsets: Vec<i64>) -> Result<Self, Self::Error> {
        OffsetChain::new(offsets)
    }
}

impl TryFrom<&[i64]> for OffsetChain {
    type Error = MemoryError;

    fn try_from(offsets: &[i64]) -> Result<Self, Self::Error> {
        OffsetChain::new(offsets.to_vec())
    }
}

/// Parses comma-separated offsets such as `0x10,0,-0x8,40`
impl FromStr for OffsetChain {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let offsets = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(parse_offset)
            .collect::<MemoryResult<Vec<_>>>()?;
        OffsetChain::new(offsets)
    }
}

fn parse_offset(text: &str) -> MemoryResult<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let bad_offset = || MemoryError::InvalidValue(format!("bad offset: {}", text));
    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => unsigned_digits(hex).map(|hex| i64::from_str_radix(hex, 16)),
        None => unsigned_digits(digits).map(str::parse::<i64>),
    }
    .and_then(Result::ok)
    .ok_or_else(bad_offset)?;
    Ok(if negative { -magnitude } else { magnitude })
}

impl fmt::Display for OffsetChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|&o| {
                if o < 0 {
                    format!("-0x{:X}", o.unsigned_abs())
                } else {
                    format!("0x{:X}", o)
                }
            })
            .collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_chain_rejected() {
        assert_eq!(OffsetChain::new(vec![]), Err(MemoryError::EmptyOffsetChain));
        assert_eq!(
            OffsetChain::try_from(&[][..]),
            Err(MemoryError::EmptyOffsetChain)
        );
    }

    #[test]
    fn test_depth() {
        let chain = OffsetChain::new(vec![0x10]).unwrap();
        assert_eq!(chain.depth(), 0);
        let chain = OffsetChain::new(vec![0x10, 0x0, 0x30, 0x40, 0x50]).unwrap();
        assert_eq!(chain.depth(), 4);
        assert_eq!(chain.len(), 5);
    }

    #[test]
    fn test_parse() {
        let chain: OffsetChain = "0x10, 0, -0x8, 40".parse().unwrap();
        assert_eq!(chain.as_slice(), &[0x10, 0, -8, 40]);
        assert!("".parse::<OffsetChain>().is_err());
        assert!("0x10,zz".parse::<OffsetChain>().is_err());
    }

    #[test]
    fn test_parse_rejects_doubled_signs() {
        for text in ["0x-10", "-0x-10", "0x+10", "--8", "+-8"] {
            assert!(
                matches!(text.parse::<OffsetChain>(), Err(MemoryError::InvalidValue(_))),
                "{} should not parse",
                text
            );
        }
        let chain: OffsetChain = "+8,-8".parse().unwrap();
        assert_eq!(chain.as_slice(), &[8, -8]);
    }

    #[test]
    fn test_display() {
        let chain = OffsetChain::new(vec![0x10, -0x8]).unwrap();
        assert_eq!(chain.to_string(), "[0x10, -0x8]");
    }
}
