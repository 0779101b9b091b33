//! # vm16
//!
//! A 16-bit software CPU: fixed 5-byte instruction records executed
//! against 64 KiB of flat memory with three memory-mapped I/O ports
//! (numeric output, character output, and a free-running timer).
//!
//! The crate splits into the execution core ([`cpu`]) and its external
//! collaborators: the two-pass assembler and disassembler ([`asm`]) and
//! the CLI in `main.rs`.

pub mod asm;
pub mod cpu;

// Re-export commonly used types.
pub use asm::{assemble, disassemble, AssemblerError};
pub use cpu::{
    Cpu, CpuError, CpuState, Flags, HaltSnapshot, InvalidOpcodePolicy, MachineConfig, Memory,
    RegisterFile,
};
