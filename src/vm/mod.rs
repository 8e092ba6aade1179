pub mod asm;
mod engine;
mod fault;
mod host;
pub mod instruction;
mod machine;
mod optimizer;
mod program;
mod switch;
mod threaded;
pub mod trace;
mod word;

pub use asm::{AsmError, assemble, disassemble, listing};
pub use engine::Engine;
pub use fault::{Fault, Outcome, Report};
pub use host::{Host, Memory, Meter, Stack};
pub use instruction::{InstructionInfo, Kind, Opcode, lookup};
pub use optimizer::{Optimizer, OptimizerStats};
pub use program::{Boundaries, JumpTable, Program};
pub use trace::{DiagnosticSink, MemorySink, NullSink, StepRecord, TracingSink, WriterSink};
pub use word::Word;
