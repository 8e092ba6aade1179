//! Loop-and-branch dispatch: a single loop around one `match` on the
//! opcode byte.

use super::fault::{Fault, Outcome};
use super::host::Host;
use super::instruction::Opcode;
use super::machine::Machine;
use super::trace::TraceMode;

pub fn run<H: Host, T: TraceMode>(m: &mut Machine<'_, H, T>) -> Outcome {
    match execute(m) {
        Ok(outcome) => outcome,
        Err(fault) => Outcome::Faulted(fault),
    }
}

fn execute<H: Host, T: TraceMode>(m: &mut Machine<'_, H, T>) -> Result<Outcome, Fault> {
    loop {
        let op = m.fetch()?;
        match op {
            Opcode::STOP => return m.op_stop(),
            Opcode(0x60..=0x7f) => m.op_push(op)?,
            Opcode::PUSHC => m.op_push_pooled()?,
            Opcode::JUMP => m.op_jump()?,
            Opcode::JUMPI => m.op_jumpi()?,
            Opcode::JUMPC => m.op_jump_const()?,
            Opcode::JUMPCI => m.op_jumpi_const()?,
            Opcode::JUMPDEST => m.op_jumpdest()?,
            Opcode::PC => m.op_pc()?,
            Opcode::RETURN => return m.op_return(),
            Opcode::REVERT => return m.op_revert(),
            Opcode::SUICIDE => return m.op_suicide(),

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
            | Opcode::DELEGATECALL => m.op_delegate(op)?,

            _ => return m.op_invalid(),
        }
    }
}
