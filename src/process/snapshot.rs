//! Snapshot enumeration with guaranteed release
//!
//! A [`Snapshot`] owns one ToolHelp-style snapshot handle and yields its
//! records as an iterator. The handle is closed when the guard drops, so
//! every exit path of a caller (match, no match, error, panic) releases it
//! exactly once.

use crate::core::types::{MemoryResult, ModuleRecord, ProcessId, ProcessRecord};
use crate::system::{RawHandle, SystemApi};
use std::marker::PhantomData;
use tracing::{debug, warn};

/// The record family a snapshot enumerates
pub trait SnapshotKind {
    type Record;

    const LABEL: &'static str;

    fn first(api: &dyn SystemApi, snapshot: RawHandle) -> MemoryResult<Option<Self::Record>>;

    fn next(api: &dyn SystemApi, snapshot: RawHandle) -> MemoryResult<Option<Self::Record>>;
}

/// Every process in the system
#[derive(Debug)]
pub enum Processes {}

/// Native and 32-bit modules of one process
#[derive(Debug)]
pub enum Modules {}

impl SnapshotKind for Processes {
    type Record = ProcessRecord;

    const LABEL: &'static str = "process";

    fn first(api: &dyn SystemApi, snapshot: RawHandle) -> MemoryResult<Option<ProcessRecord>> {
        api.first_process(snapshot)
    }

    fn next(api: &dyn SystemApi, snapshot: RawHandle) -> MemoryResult<Option<ProcessRecord>> {
        api.next_process(snapshot)
    }
}

impl SnapshotKind for Modules {
    type Record = ModuleRecord;

    const LABEL: &'static str = "module";

    fn first(api: &dyn SystemApi, snapshot: RawHandle) -> MemoryResult<Option<ModuleRecord>> {
        api.first_module(snapshot)
    }

    fn next(api: &dyn SystemApi, snapshot: RawHandle) -> MemoryResult<Option<ModuleRecord>> {
        api.next_module(snapshot)
    }
}

/// Open snapshot handle; closed on drop
///
/// Iteration stops after the last record or after the first error.
pub struct Snapshot<'a, K: SnapshotKind> {
    api: &'a dyn SystemApi,
    handle: RawHandle,
    started: bool,
    finished: bool,
    kind: PhantomData<K>,
}

impl<'a> Snapshot<'a, Processes> {
    pub fn processes(api: &'a dyn SystemApi) -> MemoryResult<Self> {
        let handle = api.open_process_snapshot()?;
        Ok(Self::from_handle(api, handle))
    }
}

impl<'a> Snapshot<'a, Modules> {
    pub fn modules(api: &'a dyn SystemApi, pid: ProcessId) -> MemoryResult<Self> {
        let handle = api.open_module_snapshot(pid)?;
        Ok(Self::from_handle(api, handle))
    }
}

impl<'a, K: SnapshotKind> Snapshot<'a, K> {
    fn from_handle(api: &'a dyn SystemApi, handle: RawHandle) -> Self {
        debug!(kind = K::LABEL, %handle, "opened snapshot");
        Snapshot {
            api,
            handle,
            started: false,
            finished: false,
            kind: PhantomData,
        }
    }

    pub fn handle(&self) -> RawHandle {
        self.handle
    }
}

impl<K: SnapshotKind> Iterator for Snapshot<'_, K> {
    type Item = MemoryResult<K::Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let step = if self.started {
            K::next(self.api, self.handle)
        } else {
            self.started = true;
            K::first(self.api, self.handle)
        };
        match step {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

impl<K: SnapshotKind> Drop for Snapshot<'_, K> {
    fn drop(&mut self) {
        match self.api.close_handle(self.handle) {
            Ok(()) => debug!(kind = K::LABEL, handle = %self.handle, "closed snapshot"),
            Err(e) => warn!(
                kind = K::LABEL,
                handle = %self.handle,
                error = %e,
                "failed to close snapshot"
            ),
        }
    }
}

/// First record, in snapshot order, accepted by `predicate`
///
/// Consumes the snapshot; its handle is released before this returns on
/// every path. `Ok(None)` means enumeration completed without a match.
pub fn find_first<K, P>(
    snapshot: Snapshot<'_, K>,
    mut predicate: P,
) -> MemoryResult<Option<K::Record>>
where
    K: SnapshotKind,
    P: FnMut(&K::Record) -> bool,
{
    for record in snapshot {
        let record = record?;
        if predicate(&record) {
            return Ok(Some(record));
        }
    }
    Ok(None)
}

/// All records of the snapshot, in order
pub fn collect_all<K: SnapshotKind>(snapshot: Snapshot<'_, K>) -> MemoryResult<Vec<K::Record>> {
    snapshot.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::{Faults, SimulatedSystem};
    use pretty_assertions::assert_eq;

    fn system(names: &[&str]) -> SimulatedSystem {
        let system = SimulatedSystem::new();
        for (i, name) in names.iter().enumerate() {
            system.spawn(100 + i as ProcessId, name);
        }
        system
    }

    #[test]
    fn test_iterates_in_order() {
        let system = system(&["a.exe", "b.exe", "c.exe"]);
        let snapshot = Snapshot::processes(&system).unwrap();
        let pids: Vec<ProcessId> = snapshot.map(|r| r.unwrap().pid).collect();
        assert_eq!(pids, vec![100, 101, 102]);
        assert_eq!(system.stats().snapshots_closed, 1);
    }

    #[test]
    fn test_find_first_stops_early_and_releases() {
        let system = system(&["a.exe", "b.exe", "a.exe"]);
        let snapshot = Snapshot::processes(&system).unwrap();
        let found = find_first(snapshot, |r| r.name_matches("a.exe")).unwrap();

        assert_eq!(found.map(|r| r.pid), Some(100));
        assert_eq!(system.open_handles(), 0);
    }

    #[test]
    fn test_empty_snapshot() {
        let system = system(&[]);
        let snapshot = Snapshot::processes(&system).unwrap();
        assert_eq!(find_first(snapshot, |_| true).unwrap(), None);
        assert_eq!(system.stats().snapshots_closed, 1);
    }

    #[test]
    fn test_error_ends_iteration() {
        let system = system(&["a.exe", "b.exe"]);
        system.set_faults(Faults {
            fail_enumeration_at: Some((1, 31)),
            ..Faults::default()
        });
        let results: Vec<_> = Snapshot::processes(&system).unwrap().collect();

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert_eq!(results[1].as_ref().unwrap_err().os_code(), Some(31));
        assert_eq!(system.stats().snapshots_closed, 1);
    }

    #[test]
    fn test_module_snapshot() {
        let system = system(&["game.exe"]);
        system.add_module(100, "game.exe", 0x400000usize.into(), 0x1000);
        system.add_module(100, "client.dll", 0x10000000usize.into(), 0x2000);

        let modules = collect_all(Snapshot::modules(&system, 100).unwrap()).unwrap();
        let names: Vec<String> = modules.iter().map(|m| m.name.to_string()).collect();
        assert_eq!(names, vec!["game.exe", "client.dll"]);
        assert_eq!(system.open_handles(), 0);
    }
}
