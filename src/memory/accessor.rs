//! Cross-process reads and writes through one owned process handle

use super::location::MemoryLocation;
use super::pointer;
use crate::core::types::{
    Address, MemoryError, MemoryResult, ProcessId, Scalar, ScalarType, ScalarValue,
};
use crate::process::{ModuleDirectory, ProcessAccess, ProcessHandle};
use crate::system::SystemApi;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Reads and writes the memory of one target process
///
/// The accessor exclusively owns a handle opened with read, write and
/// operation rights. [`close`](Self::close) consumes it, so no call can
/// reach a released handle. Dropping an accessor without closing it
/// releases the handle and only logs a failure.
///
/// The accessor is `Send + Sync`. Concurrent transfers on one accessor
/// are passed to the OS unsynchronised; whether interleaved writes to
/// overlapping ranges are meaningful is the caller's concern.
pub struct MemoryAccessor {
    handle: ProcessHandle,
}

impl MemoryAccessor {
    /// Rights requested when opening the target
    pub const ACCESS: ProcessAccess = ProcessAccess::READ_WRITE;

    /// Opens `pid` for reading and writing
    pub fn open(api: Arc<dyn SystemApi>, pid: ProcessId) -> MemoryResult<Self> {
        let handle = ProcessHandle::open(api, pid, Self::ACCESS)?;
        Ok(MemoryAccessor { handle })
    }

    pub fn pid(&self) -> ProcessId {
        self.handle.pid()
    }

    /// Reads exactly `scalar_type.size()` bytes and decodes them
    ///
    /// Fewer bytes than the type's width is an OS call failure.
    pub fn read_scalar(
        &self,
        address: Address,
        scalar_type: ScalarType,
    ) -> MemoryResult<ScalarValue> {
        let size = scalar_type.size();
        let mut buffer = [0u8; 8];
        let buffer = &mut buffer[..size];
        let read = self.handle.read_memory(address, buffer)?;
        trace!(%address, %scalar_type, read, "read scalar");
        if read != size {
            return Err(MemoryError::short_transfer(address, size, read));
        }
        scalar_type
            .decode(buffer)
            .ok_or_else(|| MemoryError::short_transfer(address, size, read))
    }

    /// Writes `value` encoded as `scalar_type`
    ///
    /// The value must convert to `scalar_type` without loss; `300` as
    /// [`ScalarType::U8`] is rejected before anything is written.
    pub fn write_scalar(
        &self,
        address: Address,
        scalar_type: ScalarType,
        value: impl Into<ScalarValue>,
    ) -> MemoryResult<usize> {
        let value = scalar_type.coerce(value.into())?;
        let bytes = value.to_bytes();
        let written = self.handle.write_memory(address, &bytes)?;
        trace!(%address, %value, written, "wrote scalar");
        if written != bytes.len() {
            return Err(MemoryError::short_transfer(address, bytes.len(), written));
        }
        Ok(written)
    }

    /// Typed read of a Rust primitive
    pub fn read<T: Scalar>(&self, address: Address) -> MemoryResult<T> {
        let value = self.read_scalar(address, T::TYPE)?;
        T::from_value(value).ok_or_else(|| MemoryError::InvalidScalarType(T::TYPE.to_string()))
    }

    /// Typed write of a Rust primitive
    pub fn write<T: Scalar>(&self, address: Address, value: T) -> MemoryResult<usize> {
        self.write_scalar(address, T::TYPE, value)
    }

    /// Reads a 64-bit pointer stored at `address`
    pub fn read_pointer(&self, address: Address) -> MemoryResult<Address> {
        self.read::<u64>(address).map(Address::from)
    }

    /// Reads up to `size` bytes; the result holds only the bytes transferred
    pub fn read_bytes(&self, address: Address, size: usize) -> MemoryResult<Vec<u8>> {
        let mut buffer = vec![0u8; size];
        let read = self.handle.read_memory(address, &mut buffer)?;
        trace!(%address, size, read, "read bytes");
        buffer.truncate(read);
        Ok(buffer)
    }

    /// Writes `data` and returns the number of bytes actually written
    pub fn write_bytes(&self, address: Address, data: &[u8]) -> MemoryResult<usize> {
        let written = self.handle.write_memory(address, data)?;
        trace!(%address, size = data.len(), written, "wrote bytes");
        Ok(written)
    }

    /// Follows `offsets` from `base`; see [`pointer::resolve`]
    pub fn resolve(&self, base: Address, offsets: &[i64]) -> MemoryResult<Address> {
        pointer::resolve(self, base, offsets)
    }

    /// Base address of a module loaded in the target
    ///
    /// Uses its own module snapshot; the accessor's handle is not involved.
    pub fn module_base(&self, name: &str) -> MemoryResult<Address> {
        ModuleDirectory::new(Arc::clone(self.handle.api())).find_module_base(self.pid(), name)
    }

    /// Direct location when `offsets` is `None`, pointer-chased otherwise
    pub fn location(
        &self,
        scalar_type: ScalarType,
        base: Address,
        offsets: Option<Vec<i64>>,
    ) -> MemoryResult<MemoryLocation<'_>> {
        MemoryLocation::new(self, scalar_type, base, offsets)
    }

    /// Releases the process handle
    ///
    /// After an error the handle's OS-side state is undefined.
    pub fn close(self) -> MemoryResult<()> {
        self.handle.close()
    }
}

impl fmt::Debug for MemoryAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryAccessor")
            .field("handle", &self.handle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ErrorKind;
    use crate::system::{Faults, SimulatedSystem};
    use crate::windows::error_codes::{ERROR_ACCESS_DENIED, ERROR_PARTIAL_COPY};
    use pretty_assertions::assert_eq;

    const PID: ProcessId = 4242;
    const DATA: Address = Address(0x10_0000);

    fn system() -> Arc<SimulatedSystem> {
        let system = Arc::new(SimulatedSystem::new());
        system.spawn(PID, "game.exe");
        system.add_module(PID, "game.exe", Address::new(0x40_0000), 0x1000);
        system.map_zeroed(PID, DATA, 0x100);
        system
    }

    #[test]
    fn test_open_requests_read_write_operation() {
        let system = system();
        let accessor = MemoryAccessor::open(system.clone(), PID).unwrap();
        assert_eq!(accessor.pid(), PID);
        assert_eq!(MemoryAccessor::ACCESS.value(), 0x38);
        accessor.close().unwrap();
        assert_eq!(system.open_handles(), 0);
    }

    #[test]
    fn test_open_denied_is_os_failure() {
        let system = system();
        system.protect(PID);
        let err = MemoryAccessor::open(system, PID).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OsCallFailure);
        assert_eq!(err.os_code(), Some(ERROR_ACCESS_DENIED));
    }

    #[test]
    fn test_scalar_round_trip() {
        let accessor = MemoryAccessor::open(system(), PID).unwrap();
        assert_eq!(accessor.write_scalar(DATA, ScalarType::I32, -5i32).unwrap(), 4);
        assert_eq!(
            accessor.read_scalar(DATA, ScalarType::I32).unwrap(),
            ScalarValue::I32(-5)
        );
        assert_eq!(accessor.read::<u32>(DATA).unwrap(), 0xFFFF_FFFB);
    }

    #[test]
    fn test_unrepresentable_value_writes_nothing() {
        let system = system();
        let accessor = MemoryAccessor::open(system.clone(), PID).unwrap();
        let err = accessor.write_scalar(DATA, ScalarType::U8, 300i32).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(system.stats().writes, 0);
        assert_eq!(system.peek(PID, DATA, 1), vec![0]);
    }

    #[test]
    fn test_short_scalar_read_is_os_failure() {
        let accessor = MemoryAccessor::open(system(), PID).unwrap();
        let err = accessor
            .read_scalar(Address::new(0x10_00FC), ScalarType::U64)
            .unwrap_err();

        assert_eq!(err, MemoryError::short_transfer(Address::new(0x10_00FC), 8, 4));
        assert_eq!(err.kind(), ErrorKind::OsCallFailure);
    }

    #[test]
    fn test_short_scalar_write_is_os_failure() {
        let system = system();
        let accessor = MemoryAccessor::open(system.clone(), PID).unwrap();
        system.set_faults(Faults {
            max_transfer: Some(2),
            ..Faults::default()
        });
        let err = accessor.write::<u32>(DATA, 7).unwrap_err();
        assert_eq!(err.os_code(), Some(ERROR_PARTIAL_COPY));
    }

    #[test]
    fn test_bytes_report_actual_counts() {
        let accessor = MemoryAccessor::open(system(), PID).unwrap();
        let end = Address::new(0x10_00FE);

        assert_eq!(accessor.write_bytes(end, &[1, 2, 3, 4]).unwrap(), 2);
        assert_eq!(accessor.read_bytes(end, 16).unwrap(), vec![1, 2]);
        assert!(accessor.read_bytes(DATA, 0).unwrap().is_empty());
    }

    #[test]
    fn test_module_base() {
        let accessor = MemoryAccessor::open(system(), PID).unwrap();
        assert_eq!(
            accessor.module_base("game.exe").unwrap(),
            Address::new(0x40_0000)
        );
        assert!(accessor.module_base("missing.dll").unwrap_err().is_not_found());
    }

    #[test]
    fn test_accessor_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MemoryAccessor>();
    }
}
