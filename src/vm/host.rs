//! Interfaces to the collaborators owned by the surrounding executive.
//!
//! The dispatch core never owns the operand stack, memory or the resource
//! budget. It reaches them only through these traits, and forwards every
//! opcode it does not implement itself to [`Host::execute`].

use super::fault::Fault;
use super::instruction::Opcode;
use super::word::Word;

/// LIFO operand stack.
pub trait Stack {
    fn push(&mut self, value: Word) -> Result<(), Fault>;
    fn pop(&mut self) -> Result<Word, Fault>;
    /// Item `depth` places below the top (0 is the top).
    fn peek(&self, depth: usize) -> Result<Word, Fault>;
    fn depth(&self) -> usize;
    /// Maximum depth; a push at this depth overflows.
    fn limit(&self) -> usize;
}

/// Byte-addressable linear memory.
pub trait Memory {
    /// Read `len` bytes at `offset`, growing memory as needed.
    fn read_memory(&mut self, offset: Word, len: Word) -> Result<Vec<u8>, Fault>;
    fn write_memory(&mut self, offset: Word, data: &[u8]) -> Result<(), Fault>;
    fn memory_size(&self) -> usize;
}

/// Resource budget.
pub trait Meter {
    /// Fixed cost of executing `op` once. The core never decides amounts.
    fn step_cost(&self, op: Opcode) -> u64;
    fn charge(&mut self, amount: u64) -> Result<(), Fault>;
    fn remaining(&self) -> u64;
}

/// Everything the dispatch engine needs from the executive.
pub trait Host: Stack + Memory + Meter {
    /// Apply the effect of a non-control-flow opcode at `pc`.
    ///
    /// The base cost from [`Meter::step_cost`] has already been charged;
    /// dynamic costs are the host's to charge.
    fn execute(&mut self, op: Opcode, pc: usize) -> Result<(), Fault>;
}
