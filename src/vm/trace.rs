//! Per-instruction instrumentation.
//!
//! The hook runs once per step, before the handler, and is purely
//! observational: it cannot touch pc, stack, memory or the outcome.
//!
//! The trace level is lifted to a type parameter of the machine, so at
//! [`TraceLevel::Off`] the hook body is a constant-false branch and is
//! removed entirely by the compiler.

use std::fmt;
use std::io::{self, Write};

use tracing::trace;

use crate::config::TraceLevel;

use super::instruction::Opcode;

/// Type-level trace level.
pub trait TraceMode: 'static {
    const LEVEL: TraceLevel;
    /// Count hook invocations.
    const COUNT: bool = !matches!(Self::LEVEL, TraceLevel::Off);
    /// Send a record to the diagnostic sink.
    const RECORD: bool = matches!(Self::LEVEL, TraceLevel::Verbose);
}

/// Hook not invoked.
pub enum NoTrace {}
/// Hook counts steps only.
pub enum CountTrace {}
/// Hook counts steps and emits a record per step.
pub enum FullTrace {}

impl TraceMode for NoTrace {
    const LEVEL: TraceLevel = TraceLevel::Off;
}

impl TraceMode for CountTrace {
    const LEVEL: TraceLevel = TraceLevel::Minimal;
}

impl TraceMode for FullTrace {
    const LEVEL: TraceLevel = TraceLevel::Verbose;
}

/// One executed step as seen by the hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepRecord {
    /// Zero-based step index.
    pub step: u64,
    pub pc: usize,
    /// The opcode actually dispatched (a rewritten variant in optimized programs).
    pub opcode: Opcode,
}

impl StepRecord {
    pub fn name(&self) -> &'static str {
        self.opcode.name()
    }
}

impl fmt::Display for StepRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "### {} @{} {}", self.step, self.pc, self.opcode)
    }
}

/// Destination for verbose step records.
pub trait DiagnosticSink {
    fn record(&mut self, record: &StepRecord);
}

/// Discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn record(&mut self, _record: &StepRecord) {}
}

/// Keeps every record in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub records: Vec<StepRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.records.iter().map(StepRecord::name).collect()
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&mut self, record: &StepRecord) {
        self.records.push(*record);
    }
}

/// Writes one human-readable line per record.
///
/// Write errors never reach the run; the first one is kept and returned
/// from [`WriterSink::finish`].
pub struct WriterSink<W: Write> {
    writer: W,
    error: Option<io::Error>,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, error: None }
    }

    pub fn finish(mut self) -> io::Result<W> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> DiagnosticSink for WriterSink<W> {
    fn record(&mut self, record: &StepRecord) {
        if self.error.is_some() {
            return;
        }
        if let Err(err) = writeln!(self.writer, "{}", record) {
            self.error = Some(err);
        }
    }
}

/// Forwards records as `tracing` events on target `ethvm::step`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&mut self, record: &StepRecord) {
        trace!(target: "ethvm::step", step = record.step, pc = record.pc, op = record.name());
    }
}
