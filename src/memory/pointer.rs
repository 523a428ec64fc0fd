//! Multi-level pointer resolution

use super::MemoryAccessor;
use crate::core::types::{Address, MemoryError, MemoryResult};
use tracing::{debug, trace};

/// Walks `offsets` from `base` through the target's memory
///
/// Every offset but the last is added to the current pointer and the
/// 64-bit value stored there becomes the next pointer. The last offset is
/// added to the final pointer without reading it.
///
/// An empty chain is rejected. Read failures along the way are returned
/// unchanged.
pub fn resolve(
    accessor: &MemoryAccessor,
    base: Address,
    offsets: &[i64],
) -> MemoryResult<Address> {
    let (last, hops) = offsets
        .split_last()
        .ok_or(MemoryError::EmptyOffsetChain)?;

    let mut pointer = base;
    for (depth, &offset) in hops.iter().enumerate() {
        let slot = pointer.checked_offset(offset)?;
        pointer = accessor.read_pointer(slot)?;
        trace!(depth, %slot, %pointer, "dereferenced");
    }

    let address = pointer.checked_offset(*last)?;
    debug!(%base, hops = hops.len(), %address, "resolved pointer chain");
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ErrorKind;
    use crate::system::SimulatedSystem;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const PID: u32 = 9;

    fn accessor() -> (Arc<SimulatedSystem>, MemoryAccessor) {
        let system = Arc::new(SimulatedSystem::new());
        system.spawn(PID, "game.exe");
        system.map_zeroed(PID, Address::new(0x1000), 0x100);
        system.map_zeroed(PID, Address::new(0x5000), 0x100);
        system.map_zeroed(PID, Address::new(0x9000), 0x100);
        // [0x1000 + 0x10] -> 0x5000, [0x5000 + 0x20] -> 0x9000
        system.poke(PID, Address::new(0x1010), &0x5000u64.to_le_bytes());
        system.poke(PID, Address::new(0x5020), &0x9000u64.to_le_bytes());
        let accessor = MemoryAccessor::open(system.clone(), PID).unwrap();
        (system, accessor)
    }

    #[test]
    fn test_single_offset_reads_nothing() {
        let (system, accessor) = accessor();
        let address = resolve(&accessor, Address::new(0x1234_5678), &[0x40]).unwrap();
        assert_eq!(address, Address::new(0x1234_56B8));
        assert_eq!(system.stats().reads, 0);
    }

    #[test]
    fn test_last_offset_not_dereferenced() {
        let (system, accessor) = accessor();
        let address = resolve(&accessor, Address::new(0x1000), &[0x10, 0x20, 0x8]).unwrap();
        assert_eq!(address, Address::new(0x9008));
        assert_eq!(system.stats().reads, 2);
    }

    #[test]
    fn test_negative_offsets() {
        let (_system, accessor) = accessor();
        let address = resolve(&accessor, Address::new(0x1020), &[-0x10, -0x8]).unwrap();
        assert_eq!(address, Address::new(0x4FF8));
    }

    #[test]
    fn test_empty_chain_rejected() {
        let (_system, accessor) = accessor();
        let err = resolve(&accessor, Address::new(0x1000), &[]).unwrap_err();
        assert_eq!(err, MemoryError::EmptyOffsetChain);
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_unreadable_hop_propagates() {
        let (_system, accessor) = accessor();
        // [0x1000 + 0x0] is a null pointer; the next hop reads address 0x10
        let err = resolve(&accessor, Address::new(0x1000), &[0x0, 0x10, 0x0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OsCallFailure);
    }

    #[test]
    fn test_overflow_rejected() {
        let (_system, accessor) = accessor();
        let err = resolve(&accessor, Address::new(usize::MAX), &[1]).unwrap_err();
        assert!(matches!(err, MemoryError::AddressOverflow { offset: 1, .. }));
    }
}
