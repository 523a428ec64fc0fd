//! TOML description of a simulated machine
//!
//! ```toml
//! [[process]]
//! pid = 4242
//! name = "game.exe"
//!
//! [[process.module]]
//! name = "game.exe"
//! base = 0x140000000
//! size = 0x2000
//!
//! [[process.region]]
//! base = 0x140001000
//! bytes = "e803000000000000"
//! size = 0x100
//! ```

use super::SimulatedSystem;
use crate::core::types::{Address, ProcessId, ProcessRecord};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading a scenario
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Failed to read scenario file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse scenario: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Region at 0x{base:X} in process {pid} has invalid hex bytes: {source}")]
    Hex {
        pid: ProcessId,
        base: u64,
        source: hex::FromHexError,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Scenario {
    #[serde(rename = "process", default)]
    pub processes: Vec<ProcessSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessSpec {
    pub pid: ProcessId,
    pub name: String,
    #[serde(default)]
    pub parent_pid: ProcessId,
    #[serde(default = "default_threads")]
    pub threads: u32,
    /// Refuse `OpenProcess` with access denied
    #[serde(default)]
    pub protected: bool,
    #[serde(rename = "module", default)]
    pub modules: Vec<ModuleSpec>,
    #[serde(rename = "region", default)]
    pub regions: Vec<RegionSpec>,
}

fn default_threads() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModuleSpec {
    pub name: String,
    pub base: u64,
    pub size: usize,
}

/// Mapped memory; `bytes` is hex, zero-padded up to `size` when given
///
/// Regions are mapped in file order. A later region that overlaps an
/// earlier one replaces the overlapping bytes.
#[derive(Debug, Clone, Deserialize)]
pub struct RegionSpec {
    pub base: u64,
    #[serde(default)]
    pub bytes: String,
    pub size: Option<usize>,
}

impl RegionSpec {
    fn contents(&self, pid: ProcessId) -> Result<Vec<u8>, ScenarioError> {
        let mut bytes = hex::decode(self.bytes.trim()).map_err(|source| ScenarioError::Hex {
            pid,
            base: self.base,
            source,
        })?;
        if let Some(size) = self.size {
            if bytes.len() < size {
                bytes.resize(size, 0);
            }
        }
        Ok(bytes)
    }
}

impl Scenario {
    pub fn from_toml_str(text: &str) -> Result<Self, ScenarioError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Builds a fresh simulated system populated with this scenario
    pub fn build(&self) -> Result<SimulatedSystem, ScenarioError> {
        let system = SimulatedSystem::new();
        for spec in &self.processes {
            system.add_process(ProcessRecord {
                parent_pid: spec.parent_pid,
                thread_count: spec.threads,
                ..ProcessRecord::new(spec.pid, spec.name.as_str())
            });
            if spec.protected {
                system.protect(spec.pid);
            }
            for module in &spec.modules {
                system.add_module(
                    spec.pid,
                    &module.name,
                    Address::from(module.base),
                    module.size,
                );
            }
            for region in &spec.regions {
                let bytes = region.contents(spec.pid)?;
                system.map_region(spec.pid, Address::from(region.base), bytes);
            }
        }
        Ok(system)
    }
}
