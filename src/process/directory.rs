//! Process lookup by executable name

use super::snapshot::{collect_all, find_first, Snapshot};
use crate::core::types::{MemoryError, MemoryResult, ProcessId, ProcessRecord};
use crate::system::SystemApi;
use std::sync::Arc;
use tracing::debug;

/// Resolves process names to ids through process snapshots
#[derive(Clone)]
pub struct ProcessDirectory {
    api: Arc<dyn SystemApi>,
}

impl ProcessDirectory {
    pub fn new(api: Arc<dyn SystemApi>) -> Self {
        ProcessDirectory { api }
    }

    /// Every process in one snapshot, in snapshot order
    pub fn processes(&self) -> MemoryResult<Vec<ProcessRecord>> {
        collect_all(Snapshot::processes(self.api.as_ref())?)
    }

    /// First process whose executable name equals `name` exactly
    pub fn find_process(&self, name: &str) -> MemoryResult<ProcessRecord> {
        let snapshot = Snapshot::processes(self.api.as_ref())?;
        let found = find_first(snapshot, |record| record.name_matches(name))?;
        match found {
            Some(record) => {
                debug!(name, pid = record.pid, "found process");
                Ok(record)
            }
            None => Err(MemoryError::ProcessNotFound(name.to_string())),
        }
    }

    /// Process id of the first process named `name`
    pub fn find_process_id(&self, name: &str) -> MemoryResult<ProcessId> {
        self.find_process(name).map(|record| record.pid)
    }
}

impl std::fmt::Debug for ProcessDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessDirectory").finish_non_exhaustive()
    }
}

/// Looks up a process id with the given OS services
pub fn find_process_id(api: Arc<dyn SystemApi>, name: &str) -> MemoryResult<ProcessId> {
    ProcessDirectory::new(api).find_process_id(name)
}
