mod cpu;
mod opcode;
mod status;

pub use cpu::Cpu;
pub use opcode::{Mnemonic, Mode, OpCode, OPCODE_TABLE};
pub use status::Status;
