//! Loaded programs and jump-destination analysis.
//!
//! Loading always performs one linear scan over the instruction stream:
//! - Operand bytes of `PUSHn` are skipped, so only instruction boundaries
//!   are considered.
//! - Boundary `JUMPDEST`s are recorded in the jump table.
//! - Synthetic opcodes supplied by user code are replaced with `INVALID` in
//!   the dispatch stream, so they fault if reached.
//!
//! The raw stream is never modified. Rewrites land in a separate dispatch
//! stream (`ops`) of the same length.

use std::sync::Arc;

use tracing::debug;

use super::fault::Fault;
use super::instruction::{Kind, Opcode};
use super::optimizer::{Optimizer, OptimizerStats};
use super::word::Word;

/// Slot value meaning "no pooled constant at this position".
pub(super) const NO_SLOT: u32 = u32::MAX;

/// Iterator over `(pc, opcode)` at every instruction boundary.
#[derive(Debug, Clone)]
pub struct Boundaries<'a> {
    code: &'a [u8],
    pc: usize,
}

impl<'a> Boundaries<'a> {
    pub fn new(code: &'a [u8]) -> Self {
        Self { code, pc: 0 }
    }
}

impl Iterator for Boundaries<'_> {
    type Item = (usize, Opcode);

    fn next(&mut self) -> Option<Self::Item> {
        let op = Opcode(*self.code.get(self.pc)?);
        let pc = self.pc;
        self.pc = pc + 1 + op.immediates();
        Some((pc, op))
    }
}

/// One bit per code position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JumpTable {
    bits: Box<[u64]>,
}

impl JumpTable {
    fn with_len(len: usize) -> Self {
        Self {
            bits: vec![0; len.div_ceil(64)].into_boxed_slice(),
        }
    }

    fn insert(&mut self, pc: usize) {
        self.bits[pc / 64] |= 1 << (pc % 64);
    }

    #[inline(always)]
    pub fn contains(&self, pc: usize) -> bool {
        self.bits
            .get(pc / 64)
            .is_some_and(|word| (word >> (pc % 64)) & 1 == 1)
    }

    pub fn len(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|w| *w == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter().enumerate().flat_map(|(i, word)| {
            (0..64).filter(move |bit| (word >> bit) & 1 == 1).map(move |bit| i * 64 + bit)
        })
    }
}

/// Literal of the `PUSHn` at `pc`. Bytes past the end of `code` read as zero.
pub fn push_literal(code: &[u8], pc: usize, width: usize) -> Word {
    let mut buf = [0u8; 32];
    let start = pc + 1;
    let available = code.len().saturating_sub(start).min(width);
    let dst = 32 - width;
    buf[dst..dst + available].copy_from_slice(&code[start..start + available]);
    Word::from_be_bytes(buf)
}

/// An instruction stream ready for execution.
///
/// Immutable once built; safe to share across threads and runs.
#[derive(Debug, Clone)]
pub struct Program {
    pub(super) code: Arc<[u8]>,
    pub(super) ops: Box<[u8]>,
    pub(super) jumps: JumpTable,
    pub(super) pool: Vec<Word>,
    pub(super) slots: Box<[u32]>,
    pub(super) stats: Option<OptimizerStats>,
}

impl Program {
    /// Load a program without optimization.
    pub fn new(code: impl Into<Arc<[u8]>>) -> Self {
        let code = code.into();
        let mut ops = code.to_vec().into_boxed_slice();
        let mut jumps = JumpTable::with_len(code.len());
        let mut sanitized = 0usize;

        for (pc, op) in Boundaries::new(&code) {
            match op.kind() {
                Kind::JumpDest => jumps.insert(pc),
                Kind::Synthetic => {
                    ops[pc] = Opcode::INVALID.0;
                    sanitized += 1;
                }
                _ => {}
            }
        }

        debug!(
            len = code.len(),
            jump_dests = jumps.len(),
            sanitized,
            "loaded program"
        );

        Self {
            code,
            ops,
            jumps,
            pool: Vec::new(),
            slots: Box::new([]),
            stats: None,
        }
    }

    /// Load a program and run the default optimizer over it.
    pub fn optimized(code: impl Into<Arc<[u8]>>) -> Self {
        let mut program = Self::new(code);
        Optimizer::new().run(&mut program);
        program
    }

    /// Load a program, optimizing when `optimize` is set.
    pub fn load(code: impl Into<Arc<[u8]>>, optimize: bool) -> Self {
        if optimize {
            Self::optimized(code)
        } else {
            Self::new(code)
        }
    }

    /// The raw instruction stream as supplied.
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// The dispatch stream, including any rewritten opcode bytes.
    pub fn ops(&self) -> &[u8] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn jump_table(&self) -> &JumpTable {
        &self.jumps
    }

    pub fn is_jump_dest(&self, pc: usize) -> bool {
        self.jumps.contains(pc)
    }

    /// Validate a run-time jump target.
    #[inline(always)]
    pub(super) fn checked_dest(&self, target: Word) -> Result<usize, Fault> {
        match target.to_usize() {
            Some(pc) if self.jumps.contains(pc) => Ok(pc),
            _ => Err(Fault::BadJumpDestination),
        }
    }

    pub fn is_optimized(&self) -> bool {
        self.stats.is_some()
    }

    pub fn optimizer_stats(&self) -> Option<OptimizerStats> {
        self.stats
    }

    pub fn constant_pool(&self) -> &[Word] {
        &self.pool
    }

    /// Pooled constant for the push (or fused jump) at `pc`.
    pub fn pooled(&self, pc: usize) -> Option<Word> {
        match self.slots.get(pc) {
            Some(&slot) if slot != NO_SLOT => self.pool.get(slot as usize).copied(),
            _ => None,
        }
    }

    /// Pooled constant on the hot path; `pc` is known to carry a slot.
    #[inline(always)]
    pub(super) fn pooled_unchecked(&self, pc: usize) -> Word {
        self.pool[self.slots[pc] as usize]
    }

    pub fn boundaries(&self) -> Boundaries<'_> {
        Boundaries::new(&self.code)
    }
}
