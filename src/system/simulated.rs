//! In-memory operating system for tests, benchmarks and dry runs
//!
//! [`SimulatedSystem`] keeps a process table, per-process module lists and
//! mapped memory regions behind a mutex and answers every [`SystemApi`]
//! call the way the Windows services would, including their error codes.
//! [`Faults`] injects failures at the points callers must survive.

use super::{RawHandle, SystemApi};
use crate::core::types::{
    Address, MemoryError, MemoryResult, ModuleRecord, ProcessId, ProcessRecord,
};
use crate::process::ProcessAccess;
use crate::windows::error_codes::{
    ERROR_ACCESS_DENIED, ERROR_INVALID_HANDLE, ERROR_INVALID_PARAMETER, ERROR_PARTIAL_COPY,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Failure injection switches; every `u32` is the native error code reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Faults {
    /// Refuse `CreateToolhelp32Snapshot`
    pub fail_snapshot: Option<u32>,
    /// Fail the walk call that would return record `index` (0 = the first call)
    pub fail_enumeration_at: Option<(usize, u32)>,
    /// Refuse `OpenProcess`
    pub deny_open: Option<u32>,
    /// Make `CloseHandle` fail; the handle is still released
    pub fail_close: Option<u32>,
    /// Upper bound on bytes moved by one read or write
    pub max_transfer: Option<usize>,
}

/// Call counters for asserting resource discipline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimStats {
    pub snapshots_opened: usize,
    pub snapshots_closed: usize,
    pub processes_opened: usize,
    pub processes_closed: usize,
    pub reads: usize,
    pub writes: usize,
}

#[derive(Debug)]
struct SimProcess {
    record: ProcessRecord,
    modules: Vec<ModuleRecord>,
    regions: BTreeMap<usize, Vec<u8>>,
    protected: bool,
}

impl SimProcess {
    /// Maps `bytes` at `base`, replacing whatever was mapped under that range
    ///
    /// Regions stay disjoint: older regions that overlap are cut back to
    /// the parts outside the new one.
    fn map(&mut self, base: usize, bytes: Vec<u8>) {
        if bytes.is_empty() {
            return;
        }
        let end = base.saturating_add(bytes.len());
        let overlapping: Vec<usize> = self
            .regions
            .range(..end)
            .filter(|&(&start, region)| start.saturating_add(region.len()) > base)
            .map(|(&start, _)| start)
            .collect();

        for start in overlapping {
            let Some(region) = self.regions.remove(&start) else {
                continue;
            };
            let region_end = start.saturating_add(region.len());
            if start < base {
                self.regions.insert(start, region[..base - start].to_vec());
            }
            if region_end > end {
                self.regions.insert(end, region[end - start..].to_vec());
            }
        }
        self.regions.insert(base, bytes);
    }

    /// Region holding `address`, with the offset of `address` inside it
    fn region_at(&self, address: usize) -> Option<(usize, usize)> {
        let (&base, bytes) = self.regions.range(..=address).next_back()?;
        let offset = address - base;
        (offset < bytes.len()).then_some((base, offset))
    }

    fn read(&self, address: usize, buffer: &mut [u8]) -> usize {
        let mut done = 0;
        while done < buffer.len() {
            let Some(cursor) = address.checked_add(done) else {
                break;
            };
            let Some((base, offset)) = self.region_at(cursor) else {
                break;
            };
            let source = &self.regions[&base][offset..];
            let count = source.len().min(buffer.len() - done);
            buffer[done..done + count].copy_from_slice(&source[..count]);
            done += count;
        }
        done
    }

    fn write(&mut self, address: usize, data: &[u8]) -> usize {
        let mut done = 0;
        while done < data.len() {
            let Some(cursor) = address.checked_add(done) else {
                break;
            };
            let Some((base, offset)) = self.region_at(cursor) else {
                break;
            };
            let Some(target) = self.regions.get_mut(&base) else {
                break;
            };
            let target = &mut target[offset..];
            let count = target.len().min(data.len() - done);
            target[..count].copy_from_slice(&data[done..done + count]);
            done += count;
        }
        done
    }
}

#[derive(Debug)]
struct Walk<T> {
    records: Vec<T>,
    cursor: usize,
}

#[derive(Debug)]
enum HandleKind {
    ProcessSnapshot(Walk<ProcessRecord>),
    ModuleSnapshot(Walk<ModuleRecord>),
    Process {
        pid: ProcessId,
        access: ProcessAccess,
    },
}

#[derive(Debug)]
struct SimState {
    processes: Vec<SimProcess>,
    handles: HashMap<RawHandle, HandleKind>,
    next_handle: isize,
    faults: Faults,
    stats: SimStats,
}

impl SimState {
    fn process(&self, pid: ProcessId) -> Option<&SimProcess> {
        self.processes.iter().find(|p| p.record.pid == pid)
    }

    fn process_mut(&mut self, pid: ProcessId) -> Option<&mut SimProcess> {
        self.processes.iter_mut().find(|p| p.record.pid == pid)
    }

    fn allocate(&mut self, kind: HandleKind) -> RawHandle {
        // Handle values are multiples of 4 like real kernel handles
        self.next_handle += 4;
        let handle = RawHandle(self.next_handle);
        self.handles.insert(handle, kind);
        handle
    }

    fn transfer_limit(&self, requested: usize) -> usize {
        self.faults
            .max_transfer
            .map_or(requested, |limit| limit.min(requested))
    }

    fn process_handle(
        &self,
        handle: RawHandle,
        call: &'static str,
        required: ProcessAccess,
    ) -> MemoryResult<ProcessId> {
        match self.handles.get(&handle) {
            Some(HandleKind::Process { pid, access }) => {
                if access.contains(required) {
                    Ok(*pid)
                } else {
                    Err(MemoryError::os_call(call, ERROR_ACCESS_DENIED))
                }
            }
            _ => Err(MemoryError::os_call(call, ERROR_INVALID_HANDLE)),
        }
    }
}

fn step<T: Clone>(
    walk: &mut Walk<T>,
    first: bool,
    call: &'static str,
    faults: &Faults,
) -> MemoryResult<Option<T>> {
    if first {
        walk.cursor = 0;
    }
    if let Some((index, code)) = faults.fail_enumeration_at {
        if index == walk.cursor {
            return Err(MemoryError::os_call(call, code));
        }
    }
    let record = walk.records.get(walk.cursor).cloned();
    if record.is_some() {
        walk.cursor += 1;
    }
    Ok(record)
}

/// Fully in-memory [`SystemApi`]
#[derive(Debug)]
pub struct SimulatedSystem {
    state: Mutex<SimState>,
}

impl Default for SimulatedSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedSystem {
    /// Empty system: no processes, no faults
    pub fn new() -> Self {
        SimulatedSystem {
            state: Mutex::new(SimState {
                processes: Vec::new(),
                handles: HashMap::new(),
                next_handle: 0,
                faults: Faults::default(),
                stats: SimStats::default(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // A panicking test thread must not wedge the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds a process; list order is snapshot order
    pub fn add_process(&self, record: ProcessRecord) {
        self.lock().processes.push(SimProcess {
            record,
            modules: Vec::new(),
            regions: BTreeMap::new(),
            protected: false,
        });
    }

    /// Adds a process with just a pid and executable name
    pub fn spawn(&self, pid: ProcessId, name: &str) {
        self.add_process(ProcessRecord::new(pid, name));
    }

    /// Removes a process; open handles to it start failing
    pub fn exit_process(&self, pid: ProcessId) {
        self.lock().processes.retain(|p| p.record.pid != pid);
    }

    /// Marks a process as refusing `OpenProcess` with `ERROR_ACCESS_DENIED`
    pub fn protect(&self, pid: ProcessId) {
        if let Some(process) = self.lock().process_mut(pid) {
            process.protected = true;
        }
    }

    /// Registers a module in a process's module list
    pub fn add_module(&self, pid: ProcessId, name: &str, base: Address, size: usize) {
        if let Some(process) = self.lock().process_mut(pid) {
            process.modules.push(ModuleRecord::new(pid, name, base, size));
        }
    }

    /// Maps a readable and writable region over anything already mapped in its range
    pub fn map_region(&self, pid: ProcessId, base: Address, bytes: Vec<u8>) {
        if let Some(process) = self.lock().process_mut(pid) {
            process.map(base.as_usize(), bytes);
        }
    }

    /// Maps a zero-filled region
    pub fn map_zeroed(&self, pid: ProcessId, base: Address, size: usize) {
        self.map_region(pid, base, vec![0; size]);
    }

    /// Writes directly into target memory, bypassing handles and faults
    ///
    /// Returns the number of bytes that landed in mapped memory.
    pub fn poke(&self, pid: ProcessId, address: Address, data: &[u8]) -> usize {
        self.lock()
            .process_mut(pid)
            .map_or(0, |p| p.write(address.as_usize(), data))
    }

    /// Reads directly from target memory, bypassing handles and faults
    pub fn peek(&self, pid: ProcessId, address: Address, size: usize) -> Vec<u8> {
        let state = self.lock();
        let mut buffer = vec![0; size];
        let count = state
            .process(pid)
            .map_or(0, |p| p.read(address.as_usize(), &mut buffer));
        buffer.truncate(count);
        buffer
    }

    pub fn set_faults(&self, faults: Faults) {
        self.lock().faults = faults;
    }

    pub fn clear_faults(&self) {
        self.set_faults(Faults::default());
    }

    pub fn stats(&self) -> SimStats {
        self.lock().stats
    }

    /// Number of handles currently open
    pub fn open_handles(&self) -> usize {
        self.lock().handles.len()
    }
}

impl SystemApi for SimulatedSystem {
    fn open_process_snapshot(&self) -> MemoryResult<RawHandle> {
        let mut state = self.lock();
        if let Some(code) = state.faults.fail_snapshot {
            return Err(MemoryError::os_call("CreateToolhelp32Snapshot", code));
        }
        let records = state.processes.iter().map(|p| p.record.clone()).collect();
        state.stats.snapshots_opened += 1;
        let handle = state.allocate(HandleKind::ProcessSnapshot(Walk { records, cursor: 0 }));
        debug!(%handle, "simulated process snapshot");
        Ok(handle)
    }

    fn open_module_snapshot(&self, pid: ProcessId) -> MemoryResult<RawHandle> {
        let mut state = self.lock();
        if let Some(code) = state.faults.fail_snapshot {
            return Err(MemoryError::os_call("CreateToolhelp32Snapshot", code));
        }
        let records = match state.process(pid) {
            Some(process) => process.modules.clone(),
            None => {
                return Err(MemoryError::os_call(
                    "CreateToolhelp32Snapshot",
                    ERROR_INVALID_PARAMETER,
                ))
            }
        };
        state.stats.snapshots_opened += 1;
        let handle = state.allocate(HandleKind::ModuleSnapshot(Walk { records, cursor: 0 }));
        debug!(%handle, pid, "simulated module snapshot");
        Ok(handle)
    }

    fn first_process(&self, snapshot: RawHandle) -> MemoryResult<Option<ProcessRecord>> {
        walk_processes(&mut self.lock(), snapshot, true)
    }

    fn next_process(&self, snapshot: RawHandle) -> MemoryResult<Option<ProcessRecord>> {
        walk_processes(&mut self.lock(), snapshot, false)
    }

    fn first_module(&self, snapshot: RawHandle) -> MemoryResult<Option<ModuleRecord>> {
        walk_modules(&mut self.lock(), snapshot, true)
    }

    fn next_module(&self, snapshot: RawHandle) -> MemoryResult<Option<ModuleRecord>> {
        walk_modules(&mut self.lock(), snapshot, false)
    }

    fn open_process(&self, pid: ProcessId, access: ProcessAccess) -> MemoryResult<RawHandle> {
        let mut state = self.lock();
        if let Some(code) = state.faults.deny_open {
            return Err(MemoryError::os_call("OpenProcess", code));
        }
        match state.process(pid).map(|p| p.protected) {
            None => Err(MemoryError::os_call("OpenProcess", ERROR_INVALID_PARAMETER)),
            Some(true) => Err(MemoryError::os_call("OpenProcess", ERROR_ACCESS_DENIED)),
            Some(false) => {
                state.stats.processes_opened += 1;
                Ok(state.allocate(HandleKind::Process { pid, access }))
            }
        }
    }

    fn read_memory(
        &self,
        process: RawHandle,
        address: Address,
        buffer: &mut [u8],
    ) -> MemoryResult<usize> {
        let mut state = self.lock();
        let pid = state.process_handle(process, "ReadProcessMemory", ProcessAccess::VM_READ)?;
        state.stats.reads += 1;
        let limit = state.transfer_limit(buffer.len());
        let target = state
            .process(pid)
            .ok_or_else(|| MemoryError::os_call("ReadProcessMemory", ERROR_ACCESS_DENIED))?;
        match target.read(address.as_usize(), &mut buffer[..limit]) {
            0 if !buffer.is_empty() => {
                Err(MemoryError::os_call("ReadProcessMemory", ERROR_PARTIAL_COPY))
            }
            count => Ok(count),
        }
    }

    fn write_memory(
        &self,
        process: RawHandle,
        address: Address,
        data: &[u8],
    ) -> MemoryResult<usize> {
        let mut state = self.lock();
        let required =
            ProcessAccess::combine(&[ProcessAccess::VM_WRITE, ProcessAccess::VM_OPERATION]);
        let pid = state.process_handle(process, "WriteProcessMemory", required)?;
        state.stats.writes += 1;
        let limit = state.transfer_limit(data.len());
        let target = state
            .process_mut(pid)
            .ok_or_else(|| MemoryError::os_call("WriteProcessMemory", ERROR_ACCESS_DENIED))?;
        match target.write(address.as_usize(), &data[..limit]) {
            0 if !data.is_empty() => {
                Err(MemoryError::os_call("WriteProcessMemory", ERROR_PARTIAL_COPY))
            }
            count => Ok(count),
        }
    }

    fn close_handle(&self, handle: RawHandle) -> MemoryResult<()> {
        let mut state = self.lock();
        let kind = state
            .handles
            .remove(&handle)
            .ok_or_else(|| MemoryError::os_call("CloseHandle", ERROR_INVALID_HANDLE))?;
        match kind {
            HandleKind::Process { .. } => state.stats.processes_closed += 1,
            _ => state.stats.snapshots_closed += 1,
        }
        match state.faults.fail_close {
            Some(code) => Err(MemoryError::os_call("CloseHandle", code)),
            None => Ok(()),
        }
    }
}

fn walk_processes(
    state: &mut SimState,
    snapshot: RawHandle,
    first: bool,
) -> MemoryResult<Option<ProcessRecord>> {
    let call = if first { "Process32First" } else { "Process32Next" };
    let faults = state.faults;
    match state.handles.get_mut(&snapshot) {
        Some(HandleKind::ProcessSnapshot(walk)) => step(walk, first, call, &faults),
        _ => Err(MemoryError::os_call(call, ERROR_INVALID_HANDLE)),
    }
}

fn walk_modules(
    state: &mut SimState,
    snapshot: RawHandle,
    first: bool,
) -> MemoryResult<Option<ModuleRecord>> {
    let call = if first { "Module32First" } else { "Module32Next" };
    let faults = state.faults;
    match state.handles.get_mut(&snapshot) {
        Some(HandleKind::ModuleSnapshot(walk)) => step(walk, first, call, &faults),
        _ => Err(MemoryError::os_call(call, ERROR_INVALID_HANDLE)),
    }
}
