//! Cross-process memory access
//!
//! This module provides:
//! - [`MemoryAccessor`], the owned read/write capability on one process
//! - [`resolve`], multi-level pointer chain resolution
//! - [`MemoryLocation`], direct or pointer-chased typed slots

pub mod accessor;
pub mod location;
pub mod pointer;

pub use accessor::MemoryAccessor;
pub use location::MemoryLocation;
pub use pointer::resolve;
