//! Windows API bindings
//!
//! Low-level FFI wrappers over kernel32 process, memory and ToolHelp calls.

pub mod kernel32;
pub mod toolhelp;
