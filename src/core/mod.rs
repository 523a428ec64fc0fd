//! Core module containing fundamental types for memedit
//!
//! This module provides the foundational building blocks used throughout
//! the crate: target addresses, scalar values, snapshot records, offset
//! chains and error types.

pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    Address, ErrorKind, MemoryError, MemoryResult, ModuleRecord, OffsetChain, ProcessId,
    ProcessRecord, ScalarType, ScalarValue,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

// Target addresses are carried in a usize
#[cfg(not(target_pointer_width = "64"))]
compile_error!("memedit requires 64-bit architecture");
