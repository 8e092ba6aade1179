//! One-time bytecode rewriting pass.
//!
//! Runs after loading, before any execution. It never changes what a
//! program does, only how much work the dispatch loop repeats:
//!
//! - `PUSHn` literals are decoded once into the constant pool and the push
//!   is rewritten to `PUSHC`, which reads the pool instead of the stream.
//! - A push immediately followed by `JUMP`/`JUMPI` whose literal is a known
//!   jump destination is fused into `JUMPC`/`JUMPCI`: one step, no stack
//!   round trip, no run-time destination check.
//!
//! A pair whose target cannot be proven valid is left as `PUSHC` plus a
//! checked jump, so it still faults when executed.

use serde::Serialize;
use tracing::{debug, trace};

use super::instruction::Opcode;
use super::program::{Boundaries, NO_SLOT, Program, push_literal};

/// Counters reported by one optimizer run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OptimizerStats {
    /// Pushes rewritten to `PUSHC`.
    pub pushes_pooled: usize,
    /// Push/jump pairs fused into `JUMPC`/`JUMPCI`.
    pub jumps_rewritten: usize,
    /// Constant jumps left unrewritten because the target is not a destination.
    pub jumps_checked: usize,
}

/// Bytecode optimizer.
#[derive(Debug, Clone, Copy)]
pub struct Optimizer {
    constant_pool: bool,
    fuse_jumps: bool,
}

impl Default for Optimizer {
    fn default() -> Self {
        Self {
            constant_pool: true,
            fuse_jumps: true,
        }
    }
}

impl Optimizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable rewriting pushes to `PUSHC`.
    pub fn with_constant_pool(mut self, enabled: bool) -> Self {
        self.constant_pool = enabled;
        self
    }

    /// Enable or disable fusing constant jumps.
    pub fn with_jump_fusion(mut self, enabled: bool) -> Self {
        self.fuse_jumps = enabled;
        self
    }

    /// Rewrite `program` in place. A program is optimized at most once;
    /// later calls return the stats of the first run.
    pub fn run(&self, program: &mut Program) -> OptimizerStats {
        if let Some(stats) = program.stats {
            return stats;
        }

        let code = program.code.clone();
        let mut stats = OptimizerStats::default();
        let mut slots = vec![NO_SLOT; code.len()].into_boxed_slice();
        let mut pool = Vec::new();

        for (pc, op) in Boundaries::new(&code) {
            if !op.is_push() {
                continue;
            }
            let width = op.immediates();
            let value = push_literal(&code, pc, width);

            let fused = match code.get(pc + 1 + width).copied().map(Opcode) {
                Some(Opcode::JUMP) if self.fuse_jumps => Some(Opcode::JUMPC),
                Some(Opcode::JUMPI) if self.fuse_jumps => Some(Opcode::JUMPCI),
                _ => None,
            };

            let rewrite = match fused {
                Some(variant) if value.to_usize().is_some_and(|t| program.is_jump_dest(t)) => {
                    stats.jumps_rewritten += 1;
                    variant
                }
                Some(_) => {
                    stats.jumps_checked += 1;
                    trace!(pc, target = %value, "constant jump target is not a destination");
                    if !self.constant_pool {
                        continue;
                    }
                    Opcode::PUSHC
                }
                None if self.constant_pool => Opcode::PUSHC,
                None => continue,
            };

            if rewrite == Opcode::PUSHC {
                stats.pushes_pooled += 1;
            }
            slots[pc] = pool.len() as u32;
            pool.push(value);
            program.ops[pc] = rewrite.0;
            trace!(pc, from = %op, to = %rewrite, "rewrote instruction");
        }

        debug!(
            pushes_pooled = stats.pushes_pooled,
            jumps_rewritten = stats.jumps_rewritten,
            jumps_checked = stats.jumps_checked,
            pool = pool.len(),
            "optimized program"
        );

        program.pool = pool;
        program.slots = slots;
        program.stats = Some(stats);
        stats
    }
}
