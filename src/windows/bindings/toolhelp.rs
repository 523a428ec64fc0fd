//! ToolHelp32 snapshot bindings for process and module enumeration

use crate::core::types::{
    Address, ExeName, MemoryError, MemoryResult, ModuleName, ModuleRecord, ProcessRecord,
};
use crate::windows::error_codes::{last_error_code, ERROR_NO_MORE_FILES};
use std::mem;
use winapi::shared::minwindef::{BOOL, FALSE};
use winapi::um::handleapi::INVALID_HANDLE_VALUE;
use winapi::um::tlhelp32::{
    CreateToolhelp32Snapshot, Module32First, Module32Next, Process32First, Process32Next,
    MODULEENTRY32, PROCESSENTRY32, TH32CS_SNAPMODULE, TH32CS_SNAPMODULE32, TH32CS_SNAPPROCESS,
};
use winapi::um::winnt::HANDLE;

/// Snapshot of every process in the system
pub fn create_process_snapshot() -> MemoryResult<HANDLE> {
    create_snapshot(TH32CS_SNAPPROCESS, 0)
}

/// Snapshot of the native and WOW64 modules of one process
pub fn create_module_snapshot(pid: u32) -> MemoryResult<HANDLE> {
    create_snapshot(TH32CS_SNAPMODULE | TH32CS_SNAPMODULE32, pid)
}

fn create_snapshot(flags: u32, pid: u32) -> MemoryResult<HANDLE> {
    let snapshot = unsafe { CreateToolhelp32Snapshot(flags, pid) };
    if snapshot.is_null() || snapshot == INVALID_HANDLE_VALUE {
        Err(MemoryError::os_call("CreateToolhelp32Snapshot", last_error_code()))
    } else {
        Ok(snapshot)
    }
}

/// `ERROR_NO_MORE_FILES` ends the walk; anything else is a failed call
fn walk_result<T>(
    call: &'static str,
    success: BOOL,
    record: impl FnOnce() -> T,
) -> MemoryResult<Option<T>> {
    if success != FALSE {
        return Ok(Some(record()));
    }
    match last_error_code() {
        ERROR_NO_MORE_FILES => Ok(None),
        code => Err(MemoryError::os_call(call, code)),
    }
}

/// Process32First / Process32Next
///
/// # Safety
/// `snapshot` must be a live process snapshot handle
pub unsafe fn process_entry(
    snapshot: HANDLE,
    first: bool,
) -> MemoryResult<Option<ProcessRecord>> {
    let mut entry: PROCESSENTRY32 = mem::zeroed();
    entry.dwSize = mem::size_of::<PROCESSENTRY32>() as u32;

    let (call, success) = if first {
        ("Process32First", Process32First(snapshot, &mut entry))
    } else {
        ("Process32Next", Process32Next(snapshot, &mut entry))
    };

    walk_result(call, success, || ProcessRecord {
        pid: entry.th32ProcessID,
        name: ExeName::from_raw(entry.szExeFile.map(|c| c as u8)),
        parent_pid: entry.th32ParentProcessID,
        thread_count: entry.cntThreads,
    })
}

/// Module32First / Module32Next
///
/// # Safety
/// `snapshot` must be a live module snapshot handle
pub unsafe fn module_entry(
    snapshot: HANDLE,
    first: bool,
) -> MemoryResult<Option<ModuleRecord>> {
    let mut entry: MODULEENTRY32 = mem::zeroed();
    entry.dwSize = mem::size_of::<MODULEENTRY32>() as u32;

    let (call, success) = if first {
        ("Module32First", Module32First(snapshot, &mut entry))
    } else {
        ("Module32Next", Module32Next(snapshot, &mut entry))
    };

    walk_result(call, success, || ModuleRecord {
        pid: entry.th32ProcessID,
        name: ModuleName::from_raw(entry.szModule.map(|c| c as u8)),
        base_address: Address::new(entry.modBaseAddr as usize),
        size: entry.modBaseSize as usize,
    })
}
