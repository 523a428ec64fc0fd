//! Process and module discovery
//!
//! This module provides the owned process handle, RAII snapshot
//! enumeration and the name-based process and module directories.

pub mod directory;
pub mod handle;
pub mod modules;
pub mod snapshot;

pub use directory::{find_process_id, ProcessDirectory};
pub use handle::{ProcessAccess, ProcessHandle};
pub use modules::{find_module_base, ModuleDirectory};
pub use snapshot::{find_first, Snapshot, SnapshotKind};
