//! Reference executive: a self-contained [`Host`] with an operand stack,
//! linear memory, a gas meter and the call environment.
//!
//! World-state instructions (storage, balances, hashing, sub-calls and
//! contract creation) are not modelled and fault with `InvalidOperation`.

pub mod gas;
pub mod memory;
mod ops;

use serde::{Serialize, Serializer};

use crate::config::ExecutiveConfig;
use crate::vm::asm::encode_hex;
use crate::vm::{Fault, Host, Memory, Meter, Opcode, Stack, Word};

use self::gas::GasMeter;
use self::memory::LinearMemory;

/// Call context visible to environment instructions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Env {
    pub address: Word,
    pub caller: Word,
    pub origin: Word,
    pub value: Word,
    pub calldata: Vec<u8>,
    pub code: Vec<u8>,
    pub gas_price: Word,
    pub coinbase: Word,
    pub timestamp: Word,
    pub number: Word,
    pub difficulty: Word,
    pub gas_limit: Word,
}

/// Record produced by `LOG0`..`LOG4`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub address: Word,
    pub topics: Vec<Word>,
    #[serde(serialize_with = "hex_bytes")]
    pub data: Vec<u8>,
}

fn hex_bytes<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&format_args!("0x{}", encode_hex(bytes)))
}

pub struct Executive {
    env: Env,
    stack: Vec<Word>,
    stack_limit: usize,
    memory: LinearMemory,
    gas: GasMeter,
    logs: Vec<LogEntry>,
    beneficiary: Option<Word>,
}

impl Executive {
    pub fn new(config: &ExecutiveConfig) -> Self {
        Self {
            env: Env::default(),
            stack: Vec::new(),
            stack_limit: config.stack_limit,
            memory: LinearMemory::new(config.memory_limit),
            gas: GasMeter::new(config.gas_limit),
            logs: Vec::new(),
            beneficiary: None,
        }
    }

    pub fn with_env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }

    /// Seed the operand stack, bottom first.
    pub fn with_stack(mut self, items: impl IntoIterator<Item = Word>) -> Self {
        self.stack.extend(items);
        self
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Operand stack, bottom first.
    pub fn stack(&self) -> &[Word] {
        &self.stack
    }

    pub fn top(&self) -> Option<Word> {
        self.stack.last().copied()
    }

    pub fn memory(&self) -> &[u8] {
        self.memory.as_slice()
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    /// Recipient recorded by `SUICIDE`.
    pub fn beneficiary(&self) -> Option<Word> {
        self.beneficiary
    }

    pub fn gas_used(&self) -> u64 {
        self.gas.used()
    }

    /// Charge for and perform growth of memory to cover `offset..offset+len`.
    fn touch(&mut self, offset: Word, len: Word) -> Result<Option<std::ops::Range<usize>>, Fault> {
        let Some(range) = self.memory.range(offset, len)? else {
            return Ok(None);
        };
        let before = gas::memory_cost(gas::words(self.memory.len()));
        let after = gas::memory_cost(gas::words(range.end));
        if after > before {
            self.gas.charge(after - before)?;
            self.memory.grow(range.end);
        }
        Ok(Some(range))
    }
}

impl Stack for Executive {
    fn push(&mut self, value: Word) -> Result<(), Fault> {
        if self.stack.len() >= self.stack_limit {
            return Err(Fault::StackOverflow);
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<Word, Fault> {
        self.stack.pop().ok_or(Fault::StackUnderflow)
    }

    fn peek(&self, depth: usize) -> Result<Word, Fault> {
        self.stack
            .len()
            .checked_sub(depth + 1)
            .map(|index| self.stack[index])
            .ok_or(Fault::StackUnderflow)
    }

    fn depth(&self) -> usize {
        self.stack.len()
    }

    fn limit(&self) -> usize {
        self.stack_limit
    }
}

impl Memory for Executive {
    fn read_memory(&mut self, offset: Word, len: Word) -> Result<Vec<u8>, Fault> {
        match self.touch(offset, len)? {
            Some(range) => Ok(self.memory.get(range).to_vec()),
            None => Ok(Vec::new()),
        }
    }

    fn write_memory(&mut self, offset: Word, data: &[u8]) -> Result<(), Fault> {
        if let Some(range) = self.touch(offset, Word::from(data.len()))? {
            self.memory.set(range.start, data);
        }
        Ok(())
    }

    fn memory_size(&self) -> usize {
        self.memory.len()
    }
}

impl Meter for Executive {
    fn step_cost(&self, op: Opcode) -> u64 {
        gas::base_cost(op)
    }

    fn charge(&mut self, amount: u64) -> Result<(), Fault> {
        self.gas.charge(amount)
    }

    fn remaining(&self) -> u64 {
        self.gas.remaining()
    }
}

impl Host for Executive {
    fn execute(&mut self, op: Opcode, pc: usize) -> Result<(), Fault> {
        self.apply(op, pc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executive() -> Executive {
        Executive::new(&ExecutiveConfig::default())
    }

    #[test]
    fn test_stack_limit() {
        let mut host = Executive::new(&ExecutiveConfig {
            stack_limit: 2,
            ..ExecutiveConfig::default()
        });
        host.push(Word::ONE).unwrap();
        host.push(Word::ONE).unwrap();
        assert_eq!(host.push(Word::ONE), Err(Fault::StackOverflow));
        assert_eq!(host.depth(), 2);
    }

    #[test]
    fn test_peek_and_underflow() {
        let mut host = executive().with_stack([Word::from_u64(1), Word::from_u64(2)]);
        assert_eq!(host.peek(0), Ok(Word::from_u64(2)));
        assert_eq!(host.peek(1), Ok(Word::from_u64(1)));
        assert_eq!(host.peek(2), Err(Fault::StackUnderflow));
        host.pop().unwrap();
        host.pop().unwrap();
        assert_eq!(host.pop(), Err(Fault::StackUnderflow));
    }

    #[test]
    fn test_memory_expansion_is_charged_once() {
        let mut host = executive();
        host.write_memory(Word::ZERO, &[1, 2, 3]).unwrap();
        assert_eq!(host.gas_used(), 3);
        assert_eq!(host.memory_size(), 32);
        host.write_memory(Word::from_u64(4), &[9]).unwrap();
        assert_eq!(host.gas_used(), 3);
        assert_eq!(host.read_memory(Word::ZERO, Word::from_u64(5)).unwrap(), vec![1, 2, 3, 0, 9]);
    }

    #[test]
    fn test_memory_limit() {
        let mut host = Executive::new(&ExecutiveConfig {
            memory_limit: 64,
            ..ExecutiveConfig::default()
        });
        assert_eq!(
            host.read_memory(Word::from_u64(64), Word::ONE),
            Err(Fault::OutOfResource)
        );
        assert_eq!(host.read_memory(Word::from_u64(1000), Word::ZERO), Ok(Vec::new()));
    }

    #[test]
    fn test_meter() {
        let mut host = Executive::new(&ExecutiveConfig {
            gas_limit: 5,
            ..ExecutiveConfig::default()
        });
        assert_eq!(host.step_cost(Opcode::ADD), 3);
        host.charge(3).unwrap();
        assert_eq!(host.remaining(), 2);
        assert_eq!(host.charge(3), Err(Fault::OutOfResource));
    }
}
