//! Text assembler and disassembler.
//!
//! Source is a whitespace-separated list of items; `;` starts a comment that
//! runs to the end of the line.
//!
//! - `ADD`, `jumpdest`: any defined mnemonic, case-insensitive
//! - `PUSH2 0x0100`, `PUSH1 7`: push with an explicit width
//! - `PUSH 300`: push with the smallest width that holds the literal
//! - `:loop`: label definition (marks the next byte, emits nothing)
//! - `PUSH @loop`: two-byte push of a label's offset
//! - `DATA 0xfe00`: raw bytes

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use super::instruction::{Kind, Opcode};
use super::program::{Program, push_literal};
use super::word::Word;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsmError {
    #[error("unknown mnemonic `{0}`")]
    UnknownMnemonic(String),
    #[error("`{0}` expects an operand")]
    MissingOperand(String),
    #[error("bad literal `{0}`")]
    BadLiteral(String),
    #[error("literal `{literal}` does not fit in {width} bytes")]
    LiteralTooWide { literal: String, width: usize },
    #[error("unknown label `{0}`")]
    UnknownLabel(String),
    #[error("label `{0}` defined twice")]
    DuplicateLabel(String),
    #[error("odd-length hex string")]
    OddHex,
}

/// Width of a label reference operand.
const LABEL_WIDTH: usize = 2;

/// Assemble source text into bytecode.
pub fn assemble(source: &str) -> Result<Vec<u8>, AsmError> {
    let mut code = Vec::new();
    let mut labels = HashMap::new();
    let mut fixups = Vec::new();

    let mut tokens = source
        .lines()
        .flat_map(|line| line.split(';').next().unwrap_or("").split_whitespace());

    while let Some(token) = tokens.next() {
        if let Some(name) = token.strip_prefix(':') {
            if labels.insert(name.to_string(), code.len()).is_some() {
                return Err(AsmError::DuplicateLabel(name.to_string()));
            }
            continue;
        }

        if token.eq_ignore_ascii_case("DATA") {
            let operand = tokens
                .next()
                .ok_or_else(|| AsmError::MissingOperand(token.to_string()))?;
            let digits = operand
                .strip_prefix("0x")
                .ok_or_else(|| AsmError::BadLiteral(operand.to_string()))?;
            code.extend(decode_hex(digits).map_err(|_| AsmError::BadLiteral(operand.to_string()))?);
            continue;
        }

        let explicit = if token.eq_ignore_ascii_case("PUSH") {
            None
        } else {
            let op = Opcode::from_name(token)
                .ok_or_else(|| AsmError::UnknownMnemonic(token.to_string()))?;
            if !op.is_push() {
                code.push(op.0);
                continue;
            }
            Some(op.immediates())
        };

        let operand = tokens
            .next()
            .ok_or_else(|| AsmError::MissingOperand(token.to_string()))?;

        if let Some(label) = operand.strip_prefix('@') {
            let width = explicit.unwrap_or(LABEL_WIDTH);
            code.push(push_opcode(width).0);
            fixups.push((code.len(), width, label.to_string()));
            code.resize(code.len() + width, 0);
            continue;
        }

        let value = parse_literal(operand)?;
        let width = match explicit {
            Some(width) if value.byte_len() > width => {
                return Err(AsmError::LiteralTooWide {
                    literal: operand.to_string(),
                    width,
                });
            }
            Some(width) => width,
            None => value.byte_len().max(1),
        };
        code.push(push_opcode(width).0);
        code.extend_from_slice(&value.to_be_bytes()[32 - width..]);
    }

    for (at, width, label) in fixups {
        let target = *labels
            .get(&label)
            .ok_or_else(|| AsmError::UnknownLabel(label.clone()))?;
        let value = Word::from(target);
        if value.byte_len() > width {
            return Err(AsmError::LiteralTooWide {
                literal: format!("@{}", label),
                width,
            });
        }
        code[at..at + width].copy_from_slice(&value.to_be_bytes()[32 - width..]);
    }

    Ok(code)
}

fn push_opcode(width: usize) -> Opcode {
    Opcode::push(width).unwrap_or(Opcode::PUSH32)
}

/// Parse a `0x` hex or decimal literal of up to 256 bits.
pub fn parse_literal(text: &str) -> Result<Word, AsmError> {
    let bad = || AsmError::BadLiteral(text.to_string());
    if let Some(digits) = text.strip_prefix("0x") {
        if digits.is_empty() || digits.len() > 64 {
            return Err(bad());
        }
        let padded = if digits.len() % 2 == 1 {
            format!("0{}", digits)
        } else {
            digits.to_string()
        };
        let bytes = decode_hex(&padded).map_err(|_| bad())?;
        return Ok(Word::from_be_slice(&bytes));
    }

    if text.is_empty() {
        return Err(bad());
    }
    let ten = Word::from_u64(10);
    let (limit, _) = Word::MAX.div_rem(ten);
    let mut value = Word::ZERO;
    for c in text.chars() {
        let digit = c.to_digit(10).ok_or_else(bad)?;
        if value > limit {
            return Err(bad());
        }
        let (next, overflow) = value.wrapping_mul(ten).overflowing_add(Word::from_u64(digit as u64));
        if overflow {
            return Err(bad());
        }
        value = next;
    }
    Ok(value)
}

/// Decode a hex string (no prefix, even length). Whitespace is ignored.
pub fn decode_hex(text: &str) -> Result<Vec<u8>, AsmError> {
    let digits: Vec<u8> = text.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err(AsmError::OddHex);
    }
    digits
        .chunks(2)
        .map(|pair| {
            let hi = hex_value(pair[0]);
            let lo = hex_value(pair[1]);
            match (hi, lo) {
                (Some(hi), Some(lo)) => Ok(hi << 4 | lo),
                _ => Err(AsmError::BadLiteral(String::from_utf8_lossy(pair).into_owned())),
            }
        })
        .collect()
}

fn hex_value(digit: u8) -> Option<u8> {
    (digit as char).to_digit(16).map(|d| d as u8)
}

pub fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// One instruction of a disassembly listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub pc: usize,
    /// Opcode as written in the raw stream.
    pub opcode: Opcode,
    /// Push literal, zero-padded when truncated.
    pub operand: Option<Word>,
    /// Opcode the engine dispatches, when the loader or optimizer rewrote it.
    pub rewritten: Option<Opcode>,
    pub pooled: Option<Word>,
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}: {}", self.pc, self.opcode)?;
        if let Some(operand) = self.operand {
            write!(f, " {:#x}", operand)?;
        }
        if let Some(rewritten) = self.rewritten {
            write!(f, "    ; {}", rewritten)?;
            if let Some(pooled) = self.pooled {
                write!(f, " {:#x}", pooled)?;
            }
        }
        Ok(())
    }
}

pub fn disassemble(program: &Program) -> Vec<Line> {
    let ops = program.ops();
    program
        .boundaries()
        .map(|(pc, opcode)| {
            let dispatched = Opcode(ops[pc]);
            let operand = match opcode.kind() {
                Kind::Push => Some(push_literal(program.code(), pc, opcode.immediates())),
                _ => None,
            };
            Line {
                pc,
                opcode,
                operand,
                rewritten: (dispatched != opcode).then_some(dispatched),
                pooled: program.pooled(pc),
            }
        })
        .collect()
}

/// Disassembly as text, one instruction per line.
pub fn listing(program: &Program) -> String {
    disassemble(program)
        .iter()
        .map(|line| format!("{}\n", line))
        .collect()
}
