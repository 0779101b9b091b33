//! Text assembler and disassembler for the 5-byte record format.
//!
//! The assembler's only contract with the CPU core is the binary record
//! format and the opcode table; it has no runtime interaction with the
//! engine.

pub mod assembler;
pub mod disasm;

pub use assembler::{assemble, AssemblerError};
pub use disasm::{disassemble, disassemble_record};
