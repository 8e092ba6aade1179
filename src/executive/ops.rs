//! Effects of the instructions the dispatch core forwards to the host.

use crate::vm::{Fault, Memory, Opcode, Stack, Word};

use super::gas;
use super::{Executive, LogEntry};

impl Executive {
    pub(super) fn apply(&mut self, op: Opcode, _pc: usize) -> Result<(), Fault> {
        match op {
            Opcode::ADD => self.binary(|a, b| a.wrapping_add(b)),
            Opcode::MUL => self.binary(|a, b| a.wrapping_mul(b)),
            Opcode::SUB => self.binary(|a, b| a.wrapping_sub(b)),
            Opcode::DIV => self.binary(|a, b| a.div_rem(b).0),
            Opcode::SDIV => self.binary(|a, b| a.signed_div(b)),
            Opcode::MOD => self.binary(|a, b| a.div_rem(b).1),
            Opcode::SMOD => self.binary(|a, b| a.signed_rem(b)),
            Opcode::ADDMOD => self.ternary(|a, b, n| a.add_mod(b, n)),
            Opcode::MULMOD => self.ternary(|a, b, n| a.mul_mod(b, n)),
            Opcode::EXP => {
                let base = self.pop()?;
                let exponent = self.pop()?;
                self.gas.charge(gas::EXP_BYTE * exponent.byte_len() as u64)?;
                self.push(base.wrapping_pow(exponent))
            }
            Opcode::SIGNEXTEND => self.binary(|index, value| value.sign_extend(index)),

            Opcode::LT => self.binary(|a, b| Word::from(a < b)),
            Opcode::GT => self.binary(|a, b| Word::from(a > b)),
            Opcode::SLT => self.binary(|a, b| Word::from(a.signed_cmp(&b).is_lt())),
            Opcode::SGT => self.binary(|a, b| Word::from(a.signed_cmp(&b).is_gt())),
            Opcode::EQ => self.binary(|a, b| Word::from(a == b)),
            Opcode::ISZERO => self.unary(|a| Word::from(a.is_zero())),
            Opcode::AND => self.binary(|a, b| a & b),
            Opcode::OR => self.binary(|a, b| a | b),
            Opcode::XOR => self.binary(|a, b| a ^ b),
            Opcode::NOT => self.unary(|a| !a),
            Opcode::BYTE => self.binary(|index, value| match index.to_usize() {
                Some(i) => Word::from_u64(value.byte(i) as u64),
                None => Word::ZERO,
            }),

            Opcode::ADDRESS => self.push(self.env.address),
            Opcode::ORIGIN => self.push(self.env.origin),
            Opcode::CALLER => self.push(self.env.caller),
            Opcode::CALLVALUE => self.push(self.env.value),
            Opcode::CALLDATALOAD => {
                let offset = self.pop()?;
                let mut word = [0u8; 32];
                copy_padded(&mut word, &self.env.calldata, offset);
                self.push(Word::from_be_bytes(word))
            }
            Opcode::CALLDATASIZE => self.push(Word::from(self.env.calldata.len())),
            Opcode::CALLDATACOPY => self.copy_to_memory(|exec| &exec.env.calldata),
            Opcode::CODESIZE => self.push(Word::from(self.env.code.len())),
            Opcode::CODECOPY => self.copy_to_memory(|exec| &exec.env.code),
            Opcode::GASPRICE => self.push(self.env.gas_price),

            Opcode::COINBASE => self.push(self.env.coinbase),
            Opcode::TIMESTAMP => self.push(self.env.timestamp),
            Opcode::NUMBER => self.push(self.env.number),
            Opcode::DIFFICULTY => self.push(self.env.difficulty),
            Opcode::GASLIMIT => self.push(self.env.gas_limit),

            Opcode::POP => self.pop().map(drop),
            Opcode::MLOAD => {
                let offset = self.pop()?;
                let bytes = self.read_memory(offset, Word::from_u64(32))?;
                self.push(Word::from_be_slice(&bytes))
            }
            Opcode::MSTORE => {
                let offset = self.pop()?;
                let value = self.pop()?;
                self.write_memory(offset, &value.to_be_bytes())
            }
            Opcode::MSTORE8 => {
                let offset = self.pop()?;
                let value = self.pop()?;
                self.write_memory(offset, &[value.byte(31)])
            }
            Opcode::MSIZE => self.push(Word::from(self.memory.len())),
            Opcode::GAS => self.push(Word::from_u64(self.gas.remaining())),

            Opcode(byte @ 0x80..=0x8f) => {
                let value = self.peek((byte - 0x80) as usize)?;
                self.push(value)
            }
            Opcode(byte @ 0x90..=0x9f) => {
                let depth = (byte - 0x90) as usize + 1;
                let len = self.stack.len();
                if depth >= len {
                    return Err(Fault::StackUnderflow);
                }
                self.stack.swap(len - 1, len - 1 - depth);
                Ok(())
            }
            Opcode(byte @ 0xa0..=0xa4) => self.log((byte - 0xa0) as usize),

            Opcode::SUICIDE => {
                self.beneficiary = Some(self.pop()?);
                Ok(())
            }

            Opcode::SHA3
            | Opcode::BALANCE
            | Opcode::EXTCODESIZE
            | Opcode::EXTCODECOPY
            | Opcode::BLOCKHASH
            | Opcode::SLOAD
            | Opcode::SSTORE
            | Opcode::CREATE
            | Opcode::CALL
            | Opcode::CALLCODE
            | Opcode::DELEGATECALL => Err(Fault::InvalidOperation),

            // Control flow belongs to the dispatch core.
            _ => Err(Fault::InvalidOperation),
        }
    }

    fn unary(&mut self, f: impl FnOnce(Word) -> Word) -> Result<(), Fault> {
        let a = self.pop()?;
        self.push(f(a))
    }

    fn binary(&mut self, f: impl FnOnce(Word, Word) -> Word) -> Result<(), Fault> {
        let a = self.pop()?;
        let b = self.pop()?;
        self.push(f(a, b))
    }

    fn ternary(&mut self, f: impl FnOnce(Word, Word, Word) -> Word) -> Result<(), Fault> {
        let a = self.pop()?;
        let b = self.pop()?;
        let c = self.pop()?;
        self.push(f(a, b, c))
    }

    /// `CALLDATACOPY` / `CODECOPY`: memory offset, source offset, length.
    fn copy_to_memory(&mut self, source: impl Fn(&Executive) -> &Vec<u8>) -> Result<(), Fault> {
        let dest = self.pop()?;
        let offset = self.pop()?;
        let len = self.pop()?;
        let Some(range) = self.memory.range(dest, len)? else {
            return Ok(());
        };
        self.gas.charge(gas::COPY * gas::words(range.len()))?;
        let mut data = vec![0u8; range.len()];
        copy_padded(&mut data, source(self), offset);
        self.write_memory(dest, &data)
    }

    fn log(&mut self, topics: usize) -> Result<(), Fault> {
        let offset = self.pop()?;
        let len = self.pop()?;
        let topics = (0..topics).map(|_| self.pop()).collect::<Result<Vec<_>, _>>()?;
        let size = len.to_usize().ok_or(Fault::OutOfResource)? as u64;
        self.gas.charge(
            (gas::LOG_TOPIC * topics.len() as u64).saturating_add(gas::LOG_DATA.saturating_mul(size)),
        )?;
        let data = self.read_memory(offset, len)?;
        self.logs.push(LogEntry {
            address: self.env.address,
            topics,
            data,
        });
        Ok(())
    }
}

/// Fill `dst` from `src` starting at `offset`; bytes past the end of `src` are zero.
fn copy_padded(dst: &mut [u8], src: &[u8], offset: Word) {
    let Some(start) = offset.to_usize().filter(|start| *start < src.len()) else {
        return;
    };
    let available = (src.len() - start).min(dst.len());
    dst[..available].copy_from_slice(&src[start..start + available]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutiveConfig;
    use crate::executive::Env;
    use crate::vm::Meter;

    fn w(v: u64) -> Word {
        Word::from_u64(v)
    }

    /// Run `op` on a fresh executive whose stack holds `stack` (top last).
    fn exec(op: Opcode, stack: &[u64]) -> Result<Executive, Fault> {
        let mut host = Executive::new(&ExecutiveConfig::default()).with_stack(stack.iter().map(|v| w(*v)));
        host.apply(op, 0)?;
        Ok(host)
    }

    #[test]
    fn test_operand_order() {
        // SUB computes top - second
        assert_eq!(exec(Opcode::SUB, &[3, 10]).unwrap().top(), Some(w(7)));
        assert_eq!(exec(Opcode::DIV, &[2, 10]).unwrap().top(), Some(w(5)));
        assert_eq!(exec(Opcode::LT, &[10, 3]).unwrap().top(), Some(w(1)));
        assert_eq!(exec(Opcode::ADDMOD, &[7, 5, 4]).unwrap().top(), Some(w(2)));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(exec(Opcode::DIV, &[0, 10]).unwrap().top(), Some(Word::ZERO));
        assert_eq!(exec(Opcode::MOD, &[0, 10]).unwrap().top(), Some(Word::ZERO));
    }

    #[test]
    fn test_exp_charges_per_byte() {
        let host = exec(Opcode::EXP, &[10, 2]).unwrap();
        assert_eq!(host.top(), Some(w(1024)));
        assert_eq!(host.gas_used(), 10);
        let host = exec(Opcode::EXP, &[0x100, 2]).unwrap();
        assert_eq!(host.top(), Some(Word::ZERO));
        assert_eq!(host.gas_used(), 20);
    }

    #[test]
    fn test_byte() {
        assert_eq!(exec(Opcode::BYTE, &[0xab, 31]).unwrap().top(), Some(w(0xab)));
        assert_eq!(exec(Opcode::BYTE, &[0xab, 32]).unwrap().top(), Some(Word::ZERO));
    }

    #[test]
    fn test_dup_and_swap() {
        let host = exec(Opcode::DUP2, &[1, 2]).unwrap();
        assert_eq!(host.stack(), &[w(1), w(2), w(1)]);
        let host = exec(Opcode::SWAP2, &[1, 2, 3]).unwrap();
        assert_eq!(host.stack(), &[w(3), w(2), w(1)]);
        assert_eq!(exec(Opcode::SWAP1, &[1]).err(), Some(Fault::StackUnderflow));
        assert_eq!(exec(Opcode::DUP3, &[1, 2]).err(), Some(Fault::StackUnderflow));
    }

    #[test]
    fn test_mstore_mload() {
        let mut host = exec(Opcode::MSTORE, &[0xbeef, 0]).unwrap();
        assert_eq!(host.memory().len(), 32);
        host.push(w(0)).unwrap();
        host.apply(Opcode::MLOAD, 0).unwrap();
        assert_eq!(host.top(), Some(w(0xbeef)));
    }

    #[test]
    fn test_calldata() {
        let env = Env {
            calldata: vec![0x11, 0x22],
            ..Env::default()
        };
        let mut host = Executive::new(&ExecutiveConfig::default()).with_env(env).with_stack([w(1)]);
        host.apply(Opcode::CALLDATALOAD, 0).unwrap();
        let mut expected = [0u8; 32];
        expected[0] = 0x22;
        assert_eq!(host.top(), Some(Word::from_be_bytes(expected)));
        host.apply(Opcode::CALLDATASIZE, 0).unwrap();
        assert_eq!(host.top(), Some(w(2)));
    }

    #[test]
    fn test_log_collects_entry() {
        // LOG1 with topic 7 over two bytes at offset 0
        let mut host = exec(Opcode::MSTORE8, &[0xaa, 0]).unwrap();
        for value in [7, 2, 0] {
            host.push(w(value)).unwrap();
        }
        let before = host.remaining();
        host.apply(Opcode::LOG1, 0).unwrap();
        assert_eq!(host.logs().len(), 1);
        assert_eq!(host.logs()[0].topics, vec![w(7)]);
        assert_eq!(host.logs()[0].data, vec![0xaa, 0x00]);
        assert_eq!(before - host.remaining(), 375 + 16);
    }

    #[test]
    fn test_suicide_records_beneficiary() {
        let host = exec(Opcode::SUICIDE, &[0x42]).unwrap();
        assert_eq!(host.beneficiary(), Some(w(0x42)));
    }

    #[test]
    fn test_world_state_is_unsupported() {
        assert_eq!(exec(Opcode::SLOAD, &[0]).err(), Some(Fault::InvalidOperation));
        assert_eq!(exec(Opcode::CALL, &[]).err(), Some(Fault::InvalidOperation));
        assert_eq!(exec(Opcode::JUMP, &[0]).err(), Some(Fault::InvalidOperation));
    }
}
