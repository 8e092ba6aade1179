//! Instruction table: static metadata for every opcode byte.
//!
//! The mapping from byte to [`InstructionInfo`] is total. Bytes without a
//! defined instruction report [`Kind::Undefined`] and are never valid.

use std::fmt;

/// A single opcode byte.
///
/// Defined opcodes are available as associated constants, so an
/// `Opcode` can be matched directly in a dispatch `match`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Opcode(pub u8);

/// Dispatch category of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Effect is supplied by the host.
    Plain,
    /// `PUSH1`..`PUSH32`: followed by literal operand bytes.
    Push,
    /// `JUMP` / `JUMPI`: target checked against the jump table at run time.
    Jump,
    /// The only legal landing site for a jump.
    JumpDest,
    /// Ends the run (`STOP`, `RETURN`, `REVERT`, `SUICIDE`).
    Terminator,
    /// Produced by the optimizer; invalid in user code.
    Synthetic,
    /// Designated invalid instructions (`INVALID`, `BAD`).
    Invalid,
    /// No instruction at this byte.
    Undefined,
}

impl Kind {
    const fn is_valid(self) -> bool {
        !matches!(self, Kind::Synthetic | Kind::Invalid | Kind::Undefined)
    }
}

/// Metadata for one opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionInfo {
    pub name: &'static str,
    /// Literal operand bytes following the opcode (1..=32 for pushes, else 0).
    pub immediates: u8,
    /// Stack items consumed.
    pub inputs: u8,
    /// Stack items produced.
    pub outputs: u8,
    pub kind: Kind,
    pub valid: bool,
}

impl InstructionInfo {
    const UNDEFINED: InstructionInfo = InstructionInfo {
        name: "UNDEFINED",
        immediates: 0,
        inputs: 0,
        outputs: 0,
        kind: Kind::Undefined,
        valid: false,
    };

    const fn new(name: &'static str, immediates: u8, inputs: u8, outputs: u8, kind: Kind) -> Self {
        Self {
            name,
            immediates,
            inputs,
            outputs,
            kind,
            valid: kind.is_valid(),
        }
    }
}

macro_rules! instructions {
    ($( $name:ident = $byte:literal, $imm:literal, $inputs:literal, $outputs:literal, $kind:ident; )*) => {
        impl Opcode {
            $( pub const $name: Opcode = Opcode($byte); )*
        }

        const fn build_table() -> [InstructionInfo; 256] {
            let mut table = [InstructionInfo::UNDEFINED; 256];
            $( table[$byte] = InstructionInfo::new(stringify!($name), $imm, $inputs, $outputs, Kind::$kind); )*
            table
        }
    };
}

instructions! {
    STOP = 0x00, 0, 0, 0, Terminator;
    ADD = 0x01, 0, 2, 1, Plain;
    MUL = 0x02, 0, 2, 1, Plain;
    SUB = 0x03, 0, 2, 1, Plain;
    DIV = 0x04, 0, 2, 1, Plain;
    SDIV = 0x05, 0, 2, 1, Plain;
    MOD = 0x06, 0, 2, 1, Plain;
    SMOD = 0x07, 0, 2, 1, Plain;
    ADDMOD = 0x08, 0, 3, 1, Plain;
    MULMOD = 0x09, 0, 3, 1, Plain;
    EXP = 0x0a, 0, 2, 1, Plain;
    SIGNEXTEND = 0x0b, 0, 2, 1, Plain;

    LT = 0x10, 0, 2, 1, Plain;
    GT = 0x11, 0, 2, 1, Plain;
    SLT = 0x12, 0, 2, 1, Plain;
    SGT = 0x13, 0, 2, 1, Plain;
    EQ = 0x14, 0, 2, 1, Plain;
    ISZERO = 0x15, 0, 1, 1, Plain;
    AND = 0x16, 0, 2, 1, Plain;
    OR = 0x17, 0, 2, 1, Plain;
    XOR = 0x18, 0, 2, 1, Plain;
    NOT = 0x19, 0, 1, 1, Plain;
    BYTE = 0x1a, 0, 2, 1, Plain;

    SHA3 = 0x20, 0, 2, 1, Plain;

    ADDRESS = 0x30, 0, 0, 1, Plain;
    BALANCE = 0x31, 0, 1, 1, Plain;
    ORIGIN = 0x32, 0, 0, 1, Plain;
    CALLER = 0x33, 0, 0, 1, Plain;
    CALLVALUE = 0x34, 0, 0, 1, Plain;
    CALLDATALOAD = 0x35, 0, 1, 1, Plain;
    CALLDATASIZE = 0x36, 0, 0, 1, Plain;
    CALLDATACOPY = 0x37, 0, 3, 0, Plain;
    CODESIZE = 0x38, 0, 0, 1, Plain;
    CODECOPY = 0x39, 0, 3, 0, Plain;
    GASPRICE = 0x3a, 0, 0, 1, Plain;
    EXTCODESIZE = 0x3b, 0, 1, 1, Plain;
    EXTCODECOPY = 0x3c, 0, 4, 0, Plain;

    BLOCKHASH = 0x40, 0, 1, 1, Plain;
    COINBASE = 0x41, 0, 0, 1, Plain;
    TIMESTAMP = 0x42, 0, 0, 1, Plain;
    NUMBER = 0x43, 0, 0, 1, Plain;
    DIFFICULTY = 0x44, 0, 0, 1, Plain;
    GASLIMIT = 0x45, 0, 0, 1, Plain;

    POP = 0x50, 0, 1, 0, Plain;
    MLOAD = 0x51, 0, 1, 1, Plain;
    MSTORE = 0x52, 0, 2, 0, Plain;
    MSTORE8 = 0x53, 0, 2, 0, Plain;
    SLOAD = 0x54, 0, 1, 1, Plain;
    SSTORE = 0x55, 0, 2, 0, Plain;
    JUMP = 0x56, 0, 1, 0, Jump;
    JUMPI = 0x57, 0, 2, 0, Jump;
    PC = 0x58, 0, 0, 1, Plain;
    MSIZE = 0x59, 0, 0, 1, Plain;
    GAS = 0x5a, 0, 0, 1, Plain;
    JUMPDEST = 0x5b, 0, 0, 0, JumpDest;

    PUSH1 = 0x60, 1, 0, 1, Push;
    PUSH2 = 0x61, 2, 0, 1, Push;
    PUSH3 = 0x62, 3, 0, 1, Push;
    PUSH4 = 0x63, 4, 0, 1, Push;
    PUSH5 = 0x64, 5, 0, 1, Push;
    PUSH6 = 0x65, 6, 0, 1, Push;
    PUSH7 = 0x66, 7, 0, 1, Push;
    PUSH8 = 0x67, 8, 0, 1, Push;
    PUSH9 = 0x68, 9, 0, 1, Push;
    PUSH10 = 0x69, 10, 0, 1, Push;
    PUSH11 = 0x6a, 11, 0, 1, Push;
    PUSH12 = 0x6b, 12, 0, 1, Push;
    PUSH13 = 0x6c, 13, 0, 1, Push;
    PUSH14 = 0x6d, 14, 0, 1, Push;
    PUSH15 = 0x6e, 15, 0, 1, Push;
    PUSH16 = 0x6f, 16, 0, 1, Push;
    PUSH17 = 0x70, 17, 0, 1, Push;
    PUSH18 = 0x71, 18, 0, 1, Push;
    PUSH19 = 0x72, 19, 0, 1, Push;
    PUSH20 = 0x73, 20, 0, 1, Push;
    PUSH21 = 0x74, 21, 0, 1, Push;
    PUSH22 = 0x75, 22, 0, 1, Push;
    PUSH23 = 0x76, 23, 0, 1, Push;
    PUSH24 = 0x77, 24, 0, 1, Push;
    PUSH25 = 0x78, 25, 0, 1, Push;
    PUSH26 = 0x79, 26, 0, 1, Push;
    PUSH27 = 0x7a, 27, 0, 1, Push;
    PUSH28 = 0x7b, 28, 0, 1, Push;
    PUSH29 = 0x7c, 29, 0, 1, Push;
    PUSH30 = 0x7d, 30, 0, 1, Push;
    PUSH31 = 0x7e, 31, 0, 1, Push;
    PUSH32 = 0x7f, 32, 0, 1, Push;

    DUP1 = 0x80, 0, 1, 2, Plain;
    DUP2 = 0x81, 0, 2, 3, Plain;
    DUP3 = 0x82, 0, 3, 4, Plain;
    DUP4 = 0x83, 0, 4, 5, Plain;
    DUP5 = 0x84, 0, 5, 6, Plain;
    DUP6 = 0x85, 0, 6, 7, Plain;
    DUP7 = 0x86, 0, 7, 8, Plain;
    DUP8 = 0x87, 0, 8, 9, Plain;
    DUP9 = 0x88, 0, 9, 10, Plain;
    DUP10 = 0x89, 0, 10, 11, Plain;
    DUP11 = 0x8a, 0, 11, 12, Plain;
    DUP12 = 0x8b, 0, 12, 13, Plain;
    DUP13 = 0x8c, 0, 13, 14, Plain;
    DUP14 = 0x8d, 0, 14, 15, Plain;
    DUP15 = 0x8e, 0, 15, 16, Plain;
    DUP16 = 0x8f, 0, 16, 17, Plain;

    SWAP1 = 0x90, 0, 2, 2, Plain;
    SWAP2 = 0x91, 0, 3, 3, Plain;
    SWAP3 = 0x92, 0, 4, 4, Plain;
    SWAP4 = 0x93, 0, 5, 5, Plain;
    SWAP5 = 0x94, 0, 6, 6, Plain;
    SWAP6 = 0x95, 0, 7, 7, Plain;
    SWAP7 = 0x96, 0, 8, 8, Plain;
    SWAP8 = 0x97, 0, 9, 9, Plain;
    SWAP9 = 0x98, 0, 10, 10, Plain;
    SWAP10 = 0x99, 0, 11, 11, Plain;
    SWAP11 = 0x9a, 0, 12, 12, Plain;
    SWAP12 = 0x9b, 0, 13, 13, Plain;
    SWAP13 = 0x9c, 0, 14, 14, Plain;
    SWAP14 = 0x9d, 0, 15, 15, Plain;
    SWAP15 = 0x9e, 0, 16, 16, Plain;
    SWAP16 = 0x9f, 0, 17, 17, Plain;

    LOG0 = 0xa0, 0, 2, 0, Plain;
    LOG1 = 0xa1, 0, 3, 0, Plain;
    LOG2 = 0xa2, 0, 4, 0, Plain;
    LOG3 = 0xa3, 0, 5, 0, Plain;
    LOG4 = 0xa4, 0, 6, 0, Plain;

    PUSHC = 0xac, 0, 0, 1, Synthetic;
    JUMPC = 0xad, 0, 0, 0, Synthetic;
    JUMPCI = 0xae, 0, 1, 0, Synthetic;
    BAD = 0xaf, 0, 0, 0, Invalid;

    CREATE = 0xf0, 0, 3, 1, Plain;
    CALL = 0xf1, 0, 7, 1, Plain;
    CALLCODE = 0xf2, 0, 7, 1, Plain;
    RETURN = 0xf3, 0, 2, 0, Terminator;
    DELEGATECALL = 0xf4, 0, 6, 1, Plain;
    REVERT = 0xfd, 0, 2, 0, Terminator;
    INVALID = 0xfe, 0, 0, 0, Invalid;
    SUICIDE = 0xff, 0, 1, 0, Terminator;
}

/// Metadata for all 256 byte values.
pub static INSTRUCTIONS: [InstructionInfo; 256] = build_table();

/// Look up the metadata for an opcode byte. Total over all byte values.
#[inline(always)]
pub fn lookup(byte: u8) -> &'static InstructionInfo {
    &INSTRUCTIONS[byte as usize]
}

impl Opcode {
    #[inline(always)]
    pub fn info(self) -> &'static InstructionInfo {
        lookup(self.0)
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    #[inline(always)]
    pub fn immediates(self) -> usize {
        self.info().immediates as usize
    }

    pub fn kind(self) -> Kind {
        self.info().kind
    }

    pub fn is_valid(self) -> bool {
        self.info().valid
    }

    pub fn is_push(self) -> bool {
        (Opcode::PUSH1.0..=Opcode::PUSH32.0).contains(&self.0)
    }

    /// `PUSHn` for `n` in 1..=32.
    pub fn push(width: usize) -> Option<Opcode> {
        match width {
            1..=32 => Some(Opcode(Opcode::PUSH1.0 + (width as u8 - 1))),
            _ => None,
        }
    }

    /// Find a defined opcode by mnemonic (case-insensitive).
    pub fn from_name(name: &str) -> Option<Opcode> {
        INSTRUCTIONS
            .iter()
            .position(|info| info.kind != Kind::Undefined && info.name.eq_ignore_ascii_case(name))
            .map(|byte| Opcode(byte as u8))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Kind::Undefined => write!(f, "UNDEFINED(0x{:02x})", self.0),
            _ => f.write_str(self.name()),
        }
    }
}

impl fmt::Debug for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opcode({})", self)
    }
}
