//! Native Windows implementation of [`SystemApi`]

use super::{RawHandle, SystemApi};
use crate::core::types::{Address, MemoryResult, ModuleRecord, ProcessId, ProcessRecord};
use crate::process::ProcessAccess;
use crate::windows::bindings::{kernel32, toolhelp};
use lazy_static::lazy_static;
use std::sync::Arc;
use tracing::trace;
use winapi::um::winnt::HANDLE;

/// Kernel32 + ToolHelp32 backed OS services
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeSystem;

lazy_static! {
    static ref NATIVE: Arc<NativeSystem> = Arc::new(NativeSystem);
}

/// The process-wide native system instance
pub fn native() -> Arc<dyn SystemApi> {
    NATIVE.clone()
}

fn to_handle(raw: RawHandle) -> HANDLE {
    raw.0 as HANDLE
}

fn to_raw(handle: HANDLE) -> RawHandle {
    RawHandle(handle as isize)
}

impl SystemApi for NativeSystem {
    fn open_process_snapshot(&self) -> MemoryResult<RawHandle> {
        toolhelp::create_process_snapshot().map(to_raw)
    }

    fn open_module_snapshot(&self, pid: ProcessId) -> MemoryResult<RawHandle> {
        toolhelp::create_module_snapshot(pid).map(to_raw)
    }

    fn first_process(&self, snapshot: RawHandle) -> MemoryResult<Option<ProcessRecord>> {
        unsafe { toolhelp::process_entry(to_handle(snapshot), true) }
    }

    fn next_process(&self, snapshot: RawHandle) -> MemoryResult<Option<ProcessRecord>> {
        unsafe { toolhelp::process_entry(to_handle(snapshot), false) }
    }

    fn first_module(&self, snapshot: RawHandle) -> MemoryResult<Option<ModuleRecord>> {
        unsafe { toolhelp::module_entry(to_handle(snapshot), true) }
    }

    fn next_module(&self, snapshot: RawHandle) -> MemoryResult<Option<ModuleRecord>> {
        unsafe { toolhelp::module_entry(to_handle(snapshot), false) }
    }

    fn open_process(&self, pid: ProcessId, access: ProcessAccess) -> MemoryResult<RawHandle> {
        kernel32::open_process(pid, access.value()).map(to_raw)
    }

    fn read_memory(
        &self,
        process: RawHandle,
        address: Address,
        buffer: &mut [u8],
    ) -> MemoryResult<usize> {
        trace!(%address, len = buffer.len(), "ReadProcessMemory");
        unsafe { kernel32::read_process_memory(to_handle(process), address.as_usize(), buffer) }
    }

    fn write_memory(
        &self,
        process: RawHandle,
        address: Address,
        data: &[u8],
    ) -> MemoryResult<usize> {
        trace!(%address, len = data.len(), "WriteProcessMemory");
        unsafe { kernel32::write_process_memory(to_handle(process), address.as_usize(), data) }
    }

    fn close_handle(&self, handle: RawHandle) -> MemoryResult<()> {
        unsafe { kernel32::close_handle(to_handle(handle)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessDirectory;

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_native_singleton() {
        let a = native();
        let b = native();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_current_process_listed() {
        let processes = ProcessDirectory::new(native()).processes().unwrap();
        assert!(processes.iter().any(|p| p.pid == std::process::id()));
    }
}
