//! Operating system process and memory services
//!
//! Everything the crate needs from the OS goes through [`SystemApi`]. The
//! directories and the memory accessor receive it as an injected
//! `Arc<dyn SystemApi>`, so the native Windows bindings and the
//! [`SimulatedSystem`] are interchangeable.

#[cfg(windows)]
mod native;
mod scenario;
mod simulated;

#[cfg(windows)]
pub use native::{native, NativeSystem};
pub use crate::process::ProcessAccess;
pub use scenario::{ModuleSpec, ProcessSpec, RegionSpec, Scenario, ScenarioError};
pub use simulated::{Faults, SimStats, SimulatedSystem};

use crate::core::types::{Address, MemoryResult, ModuleRecord, ProcessId, ProcessRecord};
use std::fmt;

/// Opaque OS handle value (snapshot or process)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(pub isize);

impl fmt::Display for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

/// Process enumeration, handle management and cross-process transfer
///
/// Enumeration follows the ToolHelp model: a snapshot handle is opened,
/// walked with `first_*` then `next_*`, and closed with
/// [`close_handle`](SystemApi::close_handle). `Ok(None)` from a walk call
/// means the listing is exhausted; `Err` means the call itself failed.
///
/// Transfer calls return the number of bytes actually moved, which may be
/// less than requested when the range crosses into inaccessible memory.
///
/// Implementations must be safe to call from several threads. Whether
/// concurrent transfers on one process handle are meaningful is up to the
/// host OS; the crate adds no locking of its own.
pub trait SystemApi: Send + Sync {
    fn open_process_snapshot(&self) -> MemoryResult<RawHandle>;

    /// Snapshot of native and 32-bit modules loaded in `pid`
    fn open_module_snapshot(&self, pid: ProcessId) -> MemoryResult<RawHandle>;

    fn first_process(&self, snapshot: RawHandle) -> MemoryResult<Option<ProcessRecord>>;

    fn next_process(&self, snapshot: RawHandle) -> MemoryResult<Option<ProcessRecord>>;

    fn first_module(&self, snapshot: RawHandle) -> MemoryResult<Option<ModuleRecord>>;

    fn next_module(&self, snapshot: RawHandle) -> MemoryResult<Option<ModuleRecord>>;

    fn open_process(&self, pid: ProcessId, access: ProcessAccess) -> MemoryResult<RawHandle>;

    fn read_memory(
        &self,
        process: RawHandle,
        address: Address,
        buffer: &mut [u8],
    ) -> MemoryResult<usize>;

    fn write_memory(&self, process: RawHandle, address: Address, data: &[u8])
        -> MemoryResult<usize>;

    fn close_handle(&self, handle: RawHandle) -> MemoryResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_raw_handle_display() {
        assert_eq!(RawHandle(0x1F4).to_string(), "0x1F4");
    }

    #[test]
    fn test_trait_object_is_shareable() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn SystemApi>();

        let api: Arc<dyn SystemApi> = Arc::new(SimulatedSystem::new());
        let clone = Arc::clone(&api);
        assert_eq!(Arc::strong_count(&clone), 2);
    }
}
