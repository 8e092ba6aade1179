//! ethvm - instruction dispatch core for an EVM-style stack machine
//!
//! This library provides the dispatch engine, the bytecode optimizer and a
//! reference executive that supplies the stack, memory and gas meter.

pub mod config;
pub mod executive;
pub mod vm;

// Re-export commonly used types
pub use config::{Config, DispatchStrategy, ExecutiveConfig, TraceLevel, VmConfig};
pub use executive::{Env, Executive};
pub use vm::{Engine, Fault, Host, Outcome, Program, Report, Word};
