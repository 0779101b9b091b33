//! The virtual CPU.
//!
//! Four components under one engine:
//! - 64 KiB flat memory with three memory-mapped I/O ports
//! - a register file with PC, SP, and ZF/CF flags
//! - stateless ALU primitives
//! - a pure, total instruction decoder
//!
//! [`Cpu`] owns all of them and drives the fetch-decode-execute loop.

pub mod alu;
pub mod config;
pub mod decode;
pub mod execute;
pub mod memory;
pub mod registers;

pub use config::{InvalidOpcodePolicy, MachineConfig, MEM_SIZE};
pub use decode::{decode, AluOp, DecodedInstr, InstrKind};
pub use execute::{Cpu, CpuError, CpuState, HaltSnapshot};
pub use memory::Memory;
pub use registers::{Flags, RegisterFile};
