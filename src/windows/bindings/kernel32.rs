//! Kernel32.dll bindings for process handles and memory transfer

use crate::core::types::{MemoryError, MemoryResult};
use crate::windows::error_codes::{last_error_code, ERROR_PARTIAL_COPY};
use winapi::shared::basetsd::SIZE_T;
use winapi::shared::minwindef::{FALSE, LPCVOID, LPVOID};
use winapi::um::handleapi::CloseHandle;
use winapi::um::memoryapi::{ReadProcessMemory, WriteProcessMemory};
use winapi::um::processthreadsapi::OpenProcess;
use winapi::um::winnt::HANDLE;

/// Safe wrapper for OpenProcess
pub fn open_process(pid: u32, desired_access: u32) -> MemoryResult<HANDLE> {
    let handle = unsafe { OpenProcess(desired_access, FALSE, pid) };
    if handle.is_null() {
        Err(MemoryError::os_call("OpenProcess", last_error_code()))
    } else {
        Ok(handle)
    }
}

/// Safe wrapper for CloseHandle
///
/// # Safety
/// The handle must be a valid Windows handle that is not used afterwards
pub unsafe fn close_handle(handle: HANDLE) -> MemoryResult<()> {
    if CloseHandle(handle) == FALSE {
        Err(MemoryError::os_call("CloseHandle", last_error_code()))
    } else {
        Ok(())
    }
}

/// Safe wrapper for ReadProcessMemory
///
/// A read that stops early at an inaccessible page reports
/// `ERROR_PARTIAL_COPY`; when some bytes did arrive it is returned as a
/// short count instead of an error.
///
/// # Safety
/// The handle must be a valid process handle with `PROCESS_VM_READ`
pub unsafe fn read_process_memory(
    handle: HANDLE,
    address: usize,
    buffer: &mut [u8],
) -> MemoryResult<usize> {
    let mut bytes_read: SIZE_T = 0;

    let result = ReadProcessMemory(
        handle,
        address as LPCVOID,
        buffer.as_mut_ptr() as LPVOID,
        buffer.len(),
        &mut bytes_read,
    );

    if result == FALSE {
        let code = last_error_code();
        if code == ERROR_PARTIAL_COPY && bytes_read > 0 {
            return Ok(bytes_read);
        }
        return Err(MemoryError::os_call("ReadProcessMemory", code));
    }
    Ok(bytes_read)
}

/// Safe wrapper for WriteProcessMemory
///
/// Same short-count rule as [`read_process_memory`].
///
/// # Safety
/// The handle must be a valid process handle with `PROCESS_VM_WRITE` and
/// `PROCESS_VM_OPERATION`
pub unsafe fn write_process_memory(
    handle: HANDLE,
    address: usize,
    data: &[u8],
) -> MemoryResult<usize> {
    let mut bytes_written: SIZE_T = 0;

    let result = WriteProcessMemory(
        handle,
        address as LPVOID,
        data.as_ptr() as LPCVOID,
        data.len(),
        &mut bytes_written,
    );

    if result == FALSE {
        let code = last_error_code();
        if code == ERROR_PARTIAL_COPY && bytes_written > 0 {
            return Ok(bytes_written);
        }
        return Err(MemoryError::os_call("WriteProcessMemory", code));
    }
    Ok(bytes_written)
}
