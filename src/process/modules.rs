//! Module lookup inside one target process

use super::snapshot::{collect_all, find_first, Snapshot};
use crate::core::types::{Address, MemoryError, MemoryResult, ModuleRecord, ProcessId};
use crate::system::SystemApi;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Resolves module names to base addresses through module snapshots
///
/// Each lookup opens its own transient snapshot, independent of any
/// process handle the caller holds.
#[derive(Clone)]
pub struct ModuleDirectory {
    api: Arc<dyn SystemApi>,
}

impl ModuleDirectory {
    pub fn new(api: Arc<dyn SystemApi>) -> Self {
        ModuleDirectory { api }
    }

    /// Every module loaded in `pid`, in snapshot order
    pub fn modules(&self, pid: ProcessId) -> MemoryResult<Vec<ModuleRecord>> {
        collect_all(Snapshot::modules(self.api.as_ref(), pid)?)
    }

    /// First module of `pid` whose name equals `name` exactly
    pub fn find_module(&self, pid: ProcessId, name: &str) -> MemoryResult<ModuleRecord> {
        let snapshot = Snapshot::modules(self.api.as_ref(), pid)?;
        match find_first(snapshot, |record| record.name_matches(name))? {
            Some(record) => {
                debug!(pid, name, base = %record.base_address, "found module");
                Ok(record)
            }
            None => Err(MemoryError::module_not_found(pid, name)),
        }
    }

    /// Base address of the first module of `pid` named `name`
    pub fn find_module_base(&self, pid: ProcessId, name: &str) -> MemoryResult<Address> {
        self.find_module(pid, name).map(|record| record.base_address)
    }
}

impl fmt::Debug for ModuleDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDirectory").finish_non_exhaustive()
    }
}

/// Looks up a module base with the given OS services
pub fn find_module_base(
    api: Arc<dyn SystemApi>,
    pid: ProcessId,
    name: &str,
) -> MemoryResult<Address> {
    ModuleDirectory::new(api).find_module_base(pid, name)
}
