//! Owned process handle with RAII semantics

use crate::core::types::{Address, MemoryResult, ProcessId};
use crate::system::{RawHandle, SystemApi};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Access rights for process handles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessAccess {
    value: u32,
}

impl ProcessAccess {
    /// Read memory access
    pub const VM_READ: Self = Self { value: 0x0010 };
    /// Write memory access
    pub const VM_WRITE: Self = Self { value: 0x0020 };
    /// Memory operation access, required alongside `VM_WRITE`
    pub const VM_OPERATION: Self = Self { value: 0x0008 };
    /// Read, write and operation rights
    pub const READ_WRITE: Self = Self {
        value: 0x0010 | 0x0020 | 0x0008,
    };

    /// Combine access rights
    pub fn combine(rights: &[Self]) -> Self {
        let mut value = 0;
        for right in rights {
            value |= right.value;
        }
        Self { value }
    }

    /// Whether every right in `other` is also granted here
    pub fn contains(&self, other: Self) -> bool {
        self.value & other.value == other.value
    }

    /// Get raw value
    pub fn value(&self) -> u32 {
        self.value
    }
}

/// Process handle released exactly once
///
/// [`close`](Self::close) consumes the handle and reports the release
/// result. A handle dropped without `close` is released by `Drop`, which
/// can only log a failure.
pub struct ProcessHandle {
    api: Arc<dyn SystemApi>,
    raw: Option<RawHandle>,
    pid: ProcessId,
    access: ProcessAccess,
}

impl ProcessHandle {
    /// Open a process with specified access rights
    pub fn open(
        api: Arc<dyn SystemApi>,
        pid: ProcessId,
        access: ProcessAccess,
    ) -> MemoryResult<Self> {
        let raw = api.open_process(pid, access)?;
        debug!(pid, handle = %raw, access = access.value(), "opened process");
        Ok(ProcessHandle {
            api,
            raw: Some(raw),
            pid,
            access,
        })
    }

    /// Get the process ID
    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    /// Get the access rights
    pub fn access(&self) -> ProcessAccess {
        self.access
    }

    pub fn api(&self) -> &Arc<dyn SystemApi> {
        &self.api
    }

    fn raw(&self) -> RawHandle {
        // Only `close` and `drop` take the handle, and both end the value
        self.raw.unwrap_or(RawHandle(0))
    }

    /// Read memory from the process; returns the count actually read
    pub fn read_memory(&self, address: Address, buffer: &mut [u8]) -> MemoryResult<usize> {
        self.api.read_memory(self.raw(), address, buffer)
    }

    /// Write memory to the process; returns the count actually written
    pub fn write_memory(&self, address: Address, data: &[u8]) -> MemoryResult<usize> {
        self.api.write_memory(self.raw(), address, data)
    }

    /// Release the handle
    ///
    /// On error the OS-side state of the handle is undefined; it is not
    /// released a second time.
    pub fn close(mut self) -> MemoryResult<()> {
        match self.raw.take() {
            Some(raw) => {
                debug!(pid = self.pid, handle = %raw, "closing process handle");
                self.api.close_handle(raw)
            }
            None => Ok(()),
        }
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if let Some(raw) = self.raw.take() {
            if let Err(e) = self.api.close_handle(raw) {
                warn!(
                    pid = self.pid,
                    handle = %raw,
                    error = %e,
                    "failed to release process handle"
                );
            }
        }
    }
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.pid)
            .field("handle", &self.raw)
            .field("access", &format!("0x{:X}", self.access.value()))
            .finish()
    }
}

impl fmt::Display for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProcessHandle(pid={}, handle={})", self.pid, self.raw())
    }
}
