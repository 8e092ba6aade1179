//! Runtime configuration types.
//!
//! Every field has a default, so an empty TOML file (or none at all) is a
//! valid configuration:
//!
//! ```toml
//! [vm]
//! dispatch = "threaded"
//! optimize = true
//! trace = "minimal"
//!
//! [executive]
//! gas_limit = 1000000
//! stack_limit = 1024
//! memory_limit = 1048576
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Dispatch strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchStrategy {
    /// One loop around a `match` on the opcode byte
    #[default]
    #[serde(rename = "loop", alias = "loop-and-branch")]
    LoopAndBranch,
    /// Each handler dispatches its successor through a function-pointer table
    #[serde(rename = "threaded", alias = "indirect-threaded")]
    IndirectThreaded,
}

/// Per-instruction instrumentation level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceLevel {
    /// Hook compiled out
    #[default]
    Off,
    /// Count steps
    Minimal,
    /// Count steps and record each one
    Verbose,
}

/// Configuration for the dispatch engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VmConfig {
    pub dispatch: DispatchStrategy,
    /// Run the bytecode optimizer when loading programs
    pub optimize: bool,
    pub trace: TraceLevel,
}

/// Limits for the reference executive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutiveConfig {
    pub gas_limit: u64,
    /// Maximum operand stack depth
    pub stack_limit: usize,
    /// Hard limit on memory size in bytes
    pub memory_limit: usize,
}

impl Default for ExecutiveConfig {
    fn default() -> Self {
        Self {
            gas_limit: 10_000_000,
            stack_limit: 1024,
            memory_limit: 16 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub vm: VmConfig,
    pub executive: ExecutiveConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.executive.stack_limit == 0 {
            return Err(ConfigError::Invalid("stack_limit must be at least 1".into()));
        }
        Ok(())
    }
}
