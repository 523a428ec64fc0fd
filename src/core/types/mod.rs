//! Core type definitions for memedit
//!
//! Address wrappers, scalar shapes and values, snapshot records,
//! offset chains and the error taxonomy.

mod address;
mod error;
mod name;
mod offsets;
mod records;
mod scalar;

// Re-export all public types
pub use address::Address;
pub use error::{ErrorKind, MemoryError, MemoryResult};
pub use name::{ExeName, FixedName, ModuleName, MAX_MODULE_NAME, MAX_PATH};
pub use offsets::OffsetChain;
pub use records::{ModuleRecord, ProcessRecord};
pub use scalar::{Scalar, ScalarType, ScalarValue};

// Common type aliases
pub type ProcessId = u32;
