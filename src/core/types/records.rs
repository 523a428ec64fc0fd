//! Process and module records produced by snapshot enumeration

use super::name::{ExeName, ModuleName};
use super::{Address, ProcessId};
use serde::Serialize;

/// One running process as listed in a process snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessRecord {
    pub pid: ProcessId,
    pub name: ExeName,
    pub parent_pid: ProcessId,
    pub thread_count: u32,
}

impl ProcessRecord {
    /// Creates a new ProcessRecord with minimal information
    pub fn new(pid: ProcessId, name: impl Into<ExeName>) -> Self {
        ProcessRecord {
            pid,
            name: name.into(),
            parent_pid: 0,
            thread_count: 0,
        }
    }

    /// Exact, case-sensitive comparison of the executable name
    pub fn name_matches(&self, name: &str) -> bool {
        self.name.matches(name)
    }

    /// Checks if this is a system process
    pub fn is_system_process(&self) -> bool {
        self.pid == 0 || self.pid == 4
    }
}

/// One module loaded in a target process
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleRecord {
    pub pid: ProcessId,
    pub name: ModuleName,
    pub base_address: Address,
    pub size: usize,
}

impl ModuleRecord {
    /// Creates a new ModuleRecord
    pub fn new(
        pid: ProcessId,
        name: impl Into<ModuleName>,
        base_address: Address,
        size: usize,
    ) -> Self {
        ModuleRecord {
            pid,
            name: name.into(),
            base_address,
            size,
        }
    }

    /// Exact, case-sensitive comparison of the module name
    pub fn name_matches(&self, name: &str) -> bool {
        self.name.matches(name)
    }

    /// One past the last byte of the module image
    pub fn end_address(&self) -> Address {
        Address::new(self.base_address.as_usize().saturating_add(self.size))
    }

    /// Checks if an address is within this module
    pub fn contains_address(&self, address: Address) -> bool {
        address >= self.base_address && address < self.end_address()
    }
}
