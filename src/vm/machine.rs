//! Per-run execution state and the instruction bodies shared by both
//! dispatch strategies.
//!
//! Each `op_*` method is the complete effect of one instruction,
//! including the base-cost charge and the pc update. The strategies only
//! decide how control reaches them.

use std::marker::PhantomData;

use super::fault::{Fault, Outcome, Report};
use super::host::Host;
use super::instruction::Opcode;
use super::program::{Program, push_literal};
use super::trace::{DiagnosticSink, StepRecord, TraceMode};
use super::word::Word;

/// How the core handles an opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Route {
    Stop,
    Push,
    PushPooled,
    Jump,
    JumpI,
    JumpConst,
    JumpConstI,
    JumpDest,
    Pc,
    Return,
    Revert,
    Suicide,
    /// Effect supplied by [`Host::execute`].
    Delegate,
    Invalid,
}

pub(super) fn route(op: Opcode) -> Route {
    match op {
        Opcode::STOP => Route::Stop,
        Opcode(0x60..=0x7f) => Route::Push,
        Opcode::PUSHC => Route::PushPooled,
        Opcode::JUMP => Route::Jump,
        Opcode::JUMPI => Route::JumpI,
        Opcode::JUMPC => Route::JumpConst,
        Opcode::JUMPCI => Route::JumpConstI,
        Opcode::JUMPDEST => Route::JumpDest,
        Opcode::PC => Route::Pc,
        Opcode::RETURN => Route::Return,
        Opcode::REVERT => Route::Revert,
        Opcode::SUICIDE => Route::Suicide,
        Opcode(0x01..=0x0b)
        | Opcode(0x10..=0x1a)
        | Opcode::SHA3
        | Opcode(0x30..=0x3c)
        | Opcode(0x40..=0x45)
        | Opcode(0x50..=0x55)
        | Opcode::MSIZE
        | Opcode::GAS
        | Opcode(0x80..=0xa4)
        | Opcode(0xf0..=0xf2)
        | Opcode::DELEGATECALL => Route::Delegate,
        _ => Route::Invalid,
    }
}

/// Execution state for a single run.
///
/// `pc` always points at the instruction being executed; handlers move it.
pub struct Machine<'a, H, T> {
    pc: usize,
    steps: u64,
    traced: u64,
    program: &'a Program,
    ops: &'a [u8],
    host: &'a mut H,
    sink: &'a mut dyn DiagnosticSink,
    mode: PhantomData<T>,
}

impl<'a, H: Host, T: TraceMode> Machine<'a, H, T> {
    pub fn new(program: &'a Program, host: &'a mut H, sink: &'a mut dyn DiagnosticSink) -> Self {
        Self {
            pc: 0,
            steps: 0,
            traced: 0,
            program,
            ops: program.ops(),
            host,
            sink,
            mode: PhantomData,
        }
    }

    pub fn report(&self, outcome: Outcome) -> Report {
        Report {
            outcome,
            steps: self.steps,
            traced: self.traced,
        }
    }

    /// Decode the instruction at `pc` and run the hook for it.
    #[inline(always)]
    pub(super) fn fetch(&mut self) -> Result<Opcode, Fault> {
        let op = match self.ops.get(self.pc) {
            Some(&byte) => Opcode(byte),
            None => return Err(Fault::BadInstruction),
        };
        let step = self.steps;
        self.steps += 1;
        if T::COUNT {
            self.observe(step, op);
        }
        Ok(op)
    }

    #[inline(always)]
    fn observe(&mut self, step: u64, opcode: Opcode) {
        self.traced += 1;
        if T::RECORD {
            self.sink.record(&StepRecord {
                step,
                pc: self.pc,
                opcode,
            });
        }
    }

    /// Opcode at `pc` in the dispatch stream; only valid after `fetch`.
    #[inline(always)]
    pub(super) fn current(&self) -> Opcode {
        Opcode(self.ops[self.pc])
    }

    /// Opcode at `pc` in the raw stream, i.e. before any rewrite.
    #[inline(always)]
    fn original(&self) -> Opcode {
        Opcode(self.program.code()[self.pc])
    }

    #[inline(always)]
    fn charge(&mut self, op: Opcode) -> Result<(), Fault> {
        let cost = self.host.step_cost(op);
        self.host.charge(cost)
    }

    pub(super) fn op_stop(&mut self) -> Result<Outcome, Fault> {
        self.charge(Opcode::STOP)?;
        Ok(Outcome::Stopped)
    }

    #[inline(always)]
    pub(super) fn op_push(&mut self, op: Opcode) -> Result<(), Fault> {
        self.charge(op)?;
        let width = op.immediates();
        self.host.push(push_literal(self.program.code(), self.pc, width))?;
        self.pc += 1 + width;
        Ok(())
    }

    #[inline(always)]
    pub(super) fn op_push_pooled(&mut self) -> Result<(), Fault> {
        let op = self.original();
        self.charge(op)?;
        self.host.push(self.program.pooled_unchecked(self.pc))?;
        self.pc += 1 + op.immediates();
        Ok(())
    }

    pub(super) fn op_jump(&mut self) -> Result<(), Fault> {
        self.charge(Opcode::JUMP)?;
        let target = self.host.pop()?;
        self.pc = self.program.checked_dest(target)?;
        Ok(())
    }

    pub(super) fn op_jumpi(&mut self) -> Result<(), Fault> {
        self.charge(Opcode::JUMPI)?;
        let target = self.host.pop()?;
        let cond = self.host.pop()?;
        if cond.is_zero() {
            self.pc += 1;
        } else {
            self.pc = self.program.checked_dest(target)?;
        }
        Ok(())
    }

    /// Charges and stack checks of the push half of a fused jump.
    /// Returns the verified target and the width of the absorbed push.
    #[inline(always)]
    fn fused_push(&mut self, jump: Opcode) -> Result<(usize, usize), Fault> {
        let push = self.original();
        self.charge(push)?;
        if self.host.depth() >= self.host.limit() {
            return Err(Fault::StackOverflow);
        }
        self.charge(jump)?;
        // Checked against the jump table when the program was optimized.
        let target = self.program.pooled_unchecked(self.pc).low_u64() as usize;
        Ok((target, push.immediates()))
    }

    pub(super) fn op_jump_const(&mut self) -> Result<(), Fault> {
        let (target, _) = self.fused_push(Opcode::JUMP)?;
        self.pc = target;
        Ok(())
    }

    pub(super) fn op_jumpi_const(&mut self) -> Result<(), Fault> {
        let (target, width) = self.fused_push(Opcode::JUMPI)?;
        let cond = self.host.pop()?;
        if cond.is_zero() {
            self.pc += 1 + width + 1;
        } else {
            self.pc = target;
        }
        Ok(())
    }

    pub(super) fn op_jumpdest(&mut self) -> Result<(), Fault> {
        self.charge(Opcode::JUMPDEST)?;
        self.pc += 1;
        Ok(())
    }

    pub(super) fn op_pc(&mut self) -> Result<(), Fault> {
        self.charge(Opcode::PC)?;
        self.host.push(Word::from(self.pc))?;
        self.pc += 1;
        Ok(())
    }

    #[inline(always)]
    pub(super) fn op_delegate(&mut self, op: Opcode) -> Result<(), Fault> {
        self.charge(op)?;
        self.host.execute(op, self.pc)?;
        self.pc += 1;
        Ok(())
    }

    pub(super) fn op_return(&mut self) -> Result<Outcome, Fault> {
        self.charge(Opcode::RETURN)?;
        self.output().map(Outcome::Returned)
    }

    pub(super) fn op_revert(&mut self) -> Result<Outcome, Fault> {
        self.charge(Opcode::REVERT)?;
        self.output().map(Outcome::Reverted)
    }

    fn output(&mut self) -> Result<Vec<u8>, Fault> {
        let offset = self.host.pop()?;
        let len = self.host.pop()?;
        self.host.read_memory(offset, len)
    }

    pub(super) fn op_suicide(&mut self) -> Result<Outcome, Fault> {
        self.charge(Opcode::SUICIDE)?;
        self.host.execute(Opcode::SUICIDE, self.pc)?;
        Ok(Outcome::Stopped)
    }

    pub(super) fn op_invalid(&mut self) -> Result<Outcome, Fault> {
        Err(Fault::BadInstruction)
    }
}
