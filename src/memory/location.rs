//! Direct and pointer-chased memory locations

use super::MemoryAccessor;
use crate::core::types::{
    Address, MemoryError, MemoryResult, OffsetChain, Scalar, ScalarType, ScalarValue,
};
use std::fmt;

/// A typed slot in the target process, borrowed from an accessor
///
/// `Direct` always names the same address. `Indirect` re-walks its offset
/// chain on every access, so a moved intermediate pointer redirects the
/// next read or write.
#[derive(Clone)]
pub enum MemoryLocation<'a> {
    Direct {
        accessor: &'a MemoryAccessor,
        address: Address,
        scalar_type: ScalarType,
    },
    Indirect {
        accessor: &'a MemoryAccessor,
        base: Address,
        offsets: OffsetChain,
        scalar_type: ScalarType,
    },
}

impl<'a> MemoryLocation<'a> {
    /// `Direct` when `offsets` is `None`, `Indirect` otherwise
    ///
    /// `Some` with an empty list is rejected.
    pub fn new(
        accessor: &'a MemoryAccessor,
        scalar_type: ScalarType,
        base: Address,
        offsets: Option<Vec<i64>>,
    ) -> MemoryResult<Self> {
        match offsets {
            None => Ok(Self::direct(accessor, scalar_type, base)),
            Some(offsets) => Self::indirect(accessor, scalar_type, base, offsets),
        }
    }

    pub fn direct(
        accessor: &'a MemoryAccessor,
        scalar_type: ScalarType,
        address: Address,
    ) -> Self {
        MemoryLocation::Direct {
            accessor,
            address,
            scalar_type,
        }
    }

    pub fn indirect(
        accessor: &'a MemoryAccessor,
        scalar_type: ScalarType,
        base: Address,
        offsets: Vec<i64>,
    ) -> MemoryResult<Self> {
        Ok(MemoryLocation::Indirect {
            accessor,
            base,
            offsets: OffsetChain::new(offsets)?,
            scalar_type,
        })
    }

    pub fn scalar_type(&self) -> ScalarType {
        match self {
            MemoryLocation::Direct { scalar_type, .. }
            | MemoryLocation::Indirect { scalar_type, .. } => *scalar_type,
        }
    }

    fn accessor(&self) -> &'a MemoryAccessor {
        match self {
            MemoryLocation::Direct { accessor, .. } | MemoryLocation::Indirect { accessor, .. } => {
                accessor
            }
        }
    }

    pub fn is_indirect(&self) -> bool {
        matches!(self, MemoryLocation::Indirect { .. })
    }

    /// Current target address; resolves the chain for `Indirect`
    pub fn address(&self) -> MemoryResult<Address> {
        match self {
            MemoryLocation::Direct { address, .. } => Ok(*address),
            MemoryLocation::Indirect {
                accessor,
                base,
                offsets,
                ..
            } => accessor.resolve(*base, offsets.as_slice()),
        }
    }

    /// Direct location at the address this one names right now
    ///
    /// An `Indirect` location walks its chain once; the result keeps that
    /// address even if an intermediate pointer later moves.
    pub fn resolved(&self) -> MemoryResult<MemoryLocation<'a>> {
        Ok(Self::direct(self.accessor(), self.scalar_type(), self.address()?))
    }

    pub fn read(&self) -> MemoryResult<ScalarValue> {
        let address = self.address()?;
        self.accessor().read_scalar(address, self.scalar_type())
    }

    /// Writes `value`, which must convert exactly to the location's type
    pub fn write(&self, value: impl Into<ScalarValue>) -> MemoryResult<usize> {
        let value = value.into();
        // Unrepresentable values fail before any target access
        let value = self.scalar_type().coerce(value)?;
        let address = self.address()?;
        self.accessor().write_scalar(address, self.scalar_type(), value)
    }

    /// Reads the location and converts the value exactly to `T`
    pub fn read_as<T: Scalar>(&self) -> MemoryResult<T> {
        let value = T::TYPE.coerce(self.read()?)?;
        T::from_value(value).ok_or_else(|| MemoryError::InvalidScalarType(T::TYPE.to_string()))
    }
}

impl fmt::Debug for MemoryLocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryLocation::Direct {
                address,
                scalar_type,
                ..
            } => f
                .debug_struct("Direct")
                .field("address", address)
                .field("scalar_type", scalar_type)
                .finish(),
            MemoryLocation::Indirect {
                base,
                offsets,
                scalar_type,
                ..
            } => f
                .debug_struct("Indirect")
                .field("base", base)
                .field("offsets", offsets)
                .field("scalar_type", scalar_type)
                .finish(),
        }
    }
}

impl fmt::Display for MemoryLocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryLocation::Direct {
                address,
                scalar_type,
                ..
            } => write!(f, "{} @ {}", scalar_type, address),
            MemoryLocation::Indirect {
                base,
                offsets,
                scalar_type,
                ..
            } => write!(f, "{} @ {} -> {}", scalar_type, base, offsets),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ErrorKind;
    use crate::system::SimulatedSystem;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const PID: u32 = 77;

    fn fixture() -> (Arc<SimulatedSystem>, MemoryAccessor) {
        let system = Arc::new(SimulatedSystem::new());
        system.spawn(PID, "game.exe");
        system.map_zeroed(PID, Address::new(0x1000), 0x40);
        system.map_zeroed(PID, Address::new(0x2000), 0x40);
        system.map_zeroed(PID, Address::new(0x3000), 0x40);
        system.poke(PID, Address::new(0x1008), &0x2000u64.to_le_bytes());
        let accessor = MemoryAccessor::open(system.clone(), PID).unwrap();
        (system, accessor)
    }

    #[test]
    fn test_variant_chosen_by_offsets() {
        let (_system, accessor) = fixture();
        let direct = accessor.location(ScalarType::I32, Address::new(0x1000), None).unwrap();
        let indirect = accessor
            .location(ScalarType::I32, Address::new(0x1000), Some(vec![0x8, 0x4]))
            .unwrap();
        assert!(!direct.is_indirect());
        assert!(indirect.is_indirect());

        let err = accessor
            .location(ScalarType::I32, Address::new(0x1000), Some(vec![]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_direct_matches_accessor() {
        let (_system, accessor) = fixture();
        let location = MemoryLocation::direct(&accessor, ScalarType::F32, Address::new(0x1010));
        assert_eq!(location.write(1.5f32).unwrap(), 4);
        assert_eq!(
            location.read().unwrap(),
            accessor.read_scalar(Address::new(0x1010), ScalarType::F32).unwrap()
        );
        assert_eq!(location.read_as::<f64>().unwrap(), 1.5);
    }

    #[test]
    fn test_indirect_follows_moved_pointer() {
        let (system, accessor) = fixture();
        system.poke(PID, Address::new(0x2004), &11i32.to_le_bytes());
        system.poke(PID, Address::new(0x3004), &22i32.to_le_bytes());
        let offsets = vec![0x8, 0x4];
        let location =
            MemoryLocation::indirect(&accessor, ScalarType::I32, Address::new(0x1000), offsets)
                .unwrap();

        assert_eq!(location.read().unwrap(), ScalarValue::I32(11));

        system.poke(PID, Address::new(0x1008), &0x3000u64.to_le_bytes());
        assert_eq!(location.address().unwrap(), Address::new(0x3004));
        assert_eq!(location.read().unwrap(), ScalarValue::I32(22));

        location.write(33i32).unwrap();
        assert_eq!(system.peek(PID, Address::new(0x3004), 4), 33i32.to_le_bytes().to_vec());
    }

    #[test]
    fn test_resolved_pins_current_address() {
        let (system, accessor) = fixture();
        system.poke(PID, Address::new(0x2004), &11i32.to_le_bytes());
        let offsets = vec![0x8, 0x4];
        let location =
            MemoryLocation::indirect(&accessor, ScalarType::I32, Address::new(0x1000), offsets)
                .unwrap();

        let pinned = location.resolved().unwrap();
        assert!(!pinned.is_indirect());
        assert_eq!(pinned.address().unwrap(), Address::new(0x2004));

        system.poke(PID, Address::new(0x1008), &0x3000u64.to_le_bytes());
        let reads = system.stats().reads;
        assert_eq!(pinned.read().unwrap(), ScalarValue::I32(11));
        assert_eq!(system.stats().reads, reads + 1);
        assert_eq!(location.address().unwrap(), Address::new(0x3004));
    }

    #[test]
    fn test_bad_value_rejected_before_resolving() {
        let (system, accessor) = fixture();
        let offsets = vec![0x8, 0x0];
        let location =
            MemoryLocation::indirect(&accessor, ScalarType::U8, Address::new(0x1000), offsets)
                .unwrap();
        let reads = system.stats().reads;

        let err = location.write(300u16).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(system.stats().reads, reads);
    }

    #[test]
    fn test_display() {
        let (_system, accessor) = fixture();
        let offsets = vec![0x8, -0x8];
        let location =
            MemoryLocation::indirect(&accessor, ScalarType::U64, Address::new(0x1000), offsets)
                .unwrap();
        assert_eq!(
            location.to_string(),
            "u64 @ 0x0000000000001000 -> [0x8, -0x8]"
        );
    }
}
