//! Fee schedule and gas meter.

use crate::vm::{Fault, Opcode};

pub const ZERO: u64 = 0;
pub const BASE: u64 = 2;
pub const VERY_LOW: u64 = 3;
pub const LOW: u64 = 5;
pub const MID: u64 = 8;
pub const HIGH: u64 = 10;
pub const EXT: u64 = 20;
pub const JUMPDEST: u64 = 1;

pub const EXP: u64 = 10;
pub const EXP_BYTE: u64 = 10;
pub const SHA3: u64 = 30;
pub const SLOAD: u64 = 50;
pub const SSTORE: u64 = 5000;
pub const LOG: u64 = 375;
pub const LOG_TOPIC: u64 = 375;
pub const LOG_DATA: u64 = 8;
pub const CREATE: u64 = 32000;
pub const CALL: u64 = 40;
pub const COPY: u64 = 3;
pub const MEMORY: u64 = 3;
pub const QUAD_DIVISOR: u64 = 512;

/// Fixed cost of one execution of `op`. Dynamic parts are charged by the
/// instruction itself.
pub fn base_cost(op: Opcode) -> u64 {
    match op {
        Opcode::STOP | Opcode::RETURN | Opcode::REVERT | Opcode::SUICIDE => ZERO,

        Opcode::ADDRESS
        | Opcode::ORIGIN
        | Opcode::CALLER
        | Opcode::CALLVALUE
        | Opcode::CALLDATASIZE
        | Opcode::CODESIZE
        | Opcode::GASPRICE
        | Opcode(0x41..=0x45)
        | Opcode::POP
        | Opcode::PC
        | Opcode::MSIZE
        | Opcode::GAS => BASE,

        Opcode::ADD
        | Opcode::SUB
        | Opcode(0x10..=0x1a)
        | Opcode::CALLDATALOAD
        | Opcode::CALLDATACOPY
        | Opcode::CODECOPY
        | Opcode::MLOAD
        | Opcode::MSTORE
        | Opcode::MSTORE8
        | Opcode(0x60..=0x9f) => VERY_LOW,

        Opcode::MUL
        | Opcode::DIV
        | Opcode::SDIV
        | Opcode::MOD
        | Opcode::SMOD
        | Opcode::SIGNEXTEND => LOW,

        Opcode::ADDMOD | Opcode::MULMOD | Opcode::JUMP => MID,
        Opcode::JUMPI => HIGH,
        Opcode::JUMPDEST => JUMPDEST,
        Opcode::EXP => EXP,

        Opcode::BALANCE | Opcode::EXTCODESIZE | Opcode::EXTCODECOPY | Opcode::BLOCKHASH => EXT,
        Opcode::SHA3 => SHA3,
        Opcode::SLOAD => SLOAD,
        Opcode::SSTORE => SSTORE,
        Opcode(0xa0..=0xa4) => LOG,
        Opcode::CREATE => CREATE,
        Opcode::CALL | Opcode::CALLCODE | Opcode::DELEGATECALL => CALL,

        _ => ZERO,
    }
}

/// Words needed to hold `bytes` bytes.
pub fn words(bytes: usize) -> u64 {
    bytes.div_ceil(32) as u64
}

/// Total cost of a memory of `words` words.
pub fn memory_cost(words: u64) -> u64 {
    MEMORY
        .saturating_mul(words)
        .saturating_add(words.saturating_mul(words) / QUAD_DIVISOR)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasMeter {
    limit: u64,
    used: u64,
}

impl GasMeter {
    pub fn new(limit: u64) -> Self {
        Self { limit, used: 0 }
    }

    /// Charge `amount`. On failure the meter is drained.
    pub fn charge(&mut self, amount: u64) -> Result<(), Fault> {
        match self.used.checked_add(amount) {
            Some(used) if used <= self.limit => {
                self.used = used;
                Ok(())
            }
            _ => {
                self.used = self.limit;
                Err(Fault::OutOfResource)
            }
        }
    }

    pub fn remaining(&self) -> u64 {
        self.limit - self.used
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }
}
