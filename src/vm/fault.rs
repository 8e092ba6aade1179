//! Faults and run outcomes.
//!
//! Every fault is terminal: the engine stops at the faulting step and hands
//! the kind back to the caller. Rollback, if any, is the caller's business.

use serde::Serialize;
use thiserror::Error;

/// Abnormal termination of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fault {
    /// pc past the end of the stream, or an undefined/invalid opcode.
    #[error("bad instruction")]
    BadInstruction,
    /// Jump target is not a `JUMPDEST` on an instruction boundary.
    #[error("bad jump destination")]
    BadJumpDestination,
    #[error("stack underflow")]
    StackUnderflow,
    #[error("stack overflow")]
    StackOverflow,
    /// Reported by the host's meter.
    #[error("out of resource")]
    OutOfResource,
    /// Opcode-specific precondition violated in the host.
    #[error("invalid operation")]
    InvalidOperation,
}

/// Result of a complete run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Stopped,
    Returned(Vec<u8>),
    Reverted(Vec<u8>),
    Faulted(Fault),
}

impl Outcome {
    /// `Stopped` and `Returned` are successful; everything else is not.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Stopped | Outcome::Returned(_))
    }

    pub fn fault(&self) -> Option<Fault> {
        match self {
            Outcome::Faulted(fault) => Some(*fault),
            _ => None,
        }
    }

    /// Output bytes of a `RETURN` or `REVERT`.
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Outcome::Returned(data) | Outcome::Reverted(data) => Some(data),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Stopped => "stopped",
            Outcome::Returned(_) => "returned",
            Outcome::Reverted(_) => "reverted",
            Outcome::Faulted(_) => "faulted",
        }
    }
}

impl From<Fault> for Outcome {
    fn from(fault: Fault) -> Self {
        Outcome::Faulted(fault)
    }
}

/// What a run produced, plus its step accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub outcome: Outcome,
    /// Instructions fetched and dispatched, including the faulting one.
    pub steps: u64,
    /// Hook invocations counted at `minimal` or `verbose` trace level.
    pub traced: u64,
}
