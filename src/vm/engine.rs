//! Strategy selection and run entry point.

use std::sync::Arc;

use tracing::debug;

use crate::config::{DispatchStrategy, TraceLevel, VmConfig};

use super::fault::Report;
use super::host::Host;
use super::machine::Machine;
use super::program::Program;
use super::threaded::DispatchTable;
use super::trace::{CountTrace, DiagnosticSink, FullTrace, NoTrace, TraceMode};
use super::{switch, threaded};

/// A configured dispatch engine for hosts of type `H`.
///
/// The dispatch tables for every trace level are built here, once, and are
/// only read afterwards, so one engine can serve any number of runs and
/// threads.
pub struct Engine<H> {
    config: VmConfig,
    untraced: DispatchTable<H, NoTrace>,
    counted: DispatchTable<H, CountTrace>,
    recorded: DispatchTable<H, FullTrace>,
}

impl<H: Host> Engine<H> {
    pub fn new(config: VmConfig) -> Self {
        Self {
            config,
            untraced: DispatchTable::new(),
            counted: DispatchTable::new(),
            recorded: DispatchTable::new(),
        }
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn strategy(&self) -> DispatchStrategy {
        self.config.dispatch
    }

    /// Load `code`, optimizing it if the engine is configured to.
    pub fn load(&self, code: impl Into<Arc<[u8]>>) -> Program {
        Program::load(code, self.config.optimize)
    }

    /// Execute `program` to completion against `host`.
    ///
    /// `sink` only receives records at [`TraceLevel::Verbose`].
    pub fn run(&self, program: &Program, host: &mut H, sink: &mut dyn DiagnosticSink) -> Report {
        let report = match self.config.trace {
            TraceLevel::Off => self.execute(program, host, sink, &self.untraced),
            TraceLevel::Minimal => self.execute(program, host, sink, &self.counted),
            TraceLevel::Verbose => self.execute(program, host, sink, &self.recorded),
        };
        debug!(
            strategy = ?self.config.dispatch,
            outcome = report.outcome.label(),
            fault = ?report.outcome.fault(),
            steps = report.steps,
            "run finished"
        );
        report
    }

    fn execute<T: TraceMode>(
        &self,
        program: &Program,
        host: &mut H,
        sink: &mut dyn DiagnosticSink,
        table: &DispatchTable<H, T>,
    ) -> Report {
        let mut machine = Machine::<H, T>::new(program, host, sink);
        let outcome = match self.config.dispatch {
            DispatchStrategy::LoopAndBranch => switch::run(&mut machine),
            DispatchStrategy::IndirectThreaded => threaded::run(&mut machine, table),
        };
        machine.report(outcome)
    }
}

impl<H: Host> Default for Engine<H> {
    fn default() -> Self {
        Self::new(VmConfig::default())
    }
}
