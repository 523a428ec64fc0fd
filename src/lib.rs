//! memedit library for cross-process memory inspection and editing
//!
//! Locate a process by executable name, locate a module's base address
//! inside it, then read and write typed values and byte ranges either at
//! fixed addresses or through multi-level pointer chains.
//!
//! All OS access goes through an injected [`system::SystemApi`]. On
//! Windows [`system::native`] provides the real services;
//! [`system::SimulatedSystem`] stands in everywhere else.

pub mod config;
pub mod core;
pub mod memory;
pub mod process;
pub mod system;
pub mod windows;

// Re-export main types from core module
pub use core::types::{
    Address, ErrorKind, MemoryError, MemoryResult, ModuleRecord, OffsetChain, ProcessId,
    ProcessRecord, Scalar, ScalarType, ScalarValue,
};

pub use memory::{MemoryAccessor, MemoryLocation};
pub use process::{ModuleDirectory, ProcessDirectory};

// Re-export core directly for full access
pub use core::{AUTHORS, VERSION};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::SimulatedSystem;
    use std::sync::Arc;

    #[test]
    fn test_core_constants() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
        assert_eq!(AUTHORS, env!("CARGO_PKG_AUTHORS"));
    }

    #[test]
    fn test_address_reexport() {
        let addr = Address::new(0x1000);
        assert_eq!(addr.as_usize(), 0x1000);
        assert!(Address::null().is_null());
    }

    #[test]
    fn test_memory_error_reexport() {
        let error = MemoryError::ProcessNotFound("notepad.exe".to_string());
        assert!(error.to_string().contains("Process not found"));
        assert_eq!(error.kind(), ErrorKind::NotFound);

        let error = MemoryError::InvalidAddress("0xBAD".to_string());
        assert!(error.to_string().contains("Invalid memory address"));
    }

    #[test]
    fn test_end_to_end_flow() {
        let system = Arc::new(SimulatedSystem::new());
        system.spawn(4, "System");
        system.spawn(1200, "game.exe");
        system.add_module(1200, "game.exe", Address::new(0x40_0000), 0x10_0000);
        system.map_zeroed(1200, Address::new(0x40_0000), 0x1000);
        system.map_zeroed(1200, Address::new(0x90_0000), 0x100);
        system.poke(1200, Address::new(0x40_0010), &0x90_0000u64.to_le_bytes());

        let pid = ProcessDirectory::new(system.clone())
            .find_process_id("game.exe")
            .unwrap();
        let accessor = MemoryAccessor::open(system.clone(), pid).unwrap();
        let base = accessor.module_base("game.exe").unwrap();

        let health = accessor
            .location(ScalarType::F32, base, Some(vec![0x10, 0x24]))
            .unwrap();
        assert_eq!(health.write(100.0f32).unwrap(), 4);
        assert_eq!(health.read().unwrap(), ScalarValue::F32(100.0));
        assert_eq!(accessor.read::<f32>(Address::new(0x90_0024)).unwrap(), 100.0);

        accessor.close().unwrap();
        assert_eq!(system.open_handles(), 0);
    }
}
