mod instr;
mod reg;

pub use self::instr::{Instruction, Offset};
pub use self::reg::Reg;

/// Word size in bytes on the target MIPS/SPIM machine; used throughout
/// `codegen` to turn slot indices into byte offsets.
pub const WORD_SIZE: i32 = 4;
