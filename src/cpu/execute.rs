//! The execution engine.
//!
//! Implements the fetch-decode-execute cycle for the 5-byte record
//! format. The engine owns the memory and the register file; halting is
//! a successful result carrying a [`HaltSnapshot`], not a process exit,
//! so callers decide what to do with a finished machine.

use std::io::Write;

use log::trace;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cpu::alu;
use crate::cpu::config::{InvalidOpcodePolicy, MachineConfig};
use crate::cpu::decode::{self, opcodes, AluOp, DecodedInstr, InstrKind, RECORD_SIZE};
use crate::cpu::memory::Memory;
use crate::cpu::registers::{Flags, RegisterFile};

/// Engine execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// Fetching and executing instructions.
    Running,
    /// A HALT instruction was executed.
    Halted,
}

/// Last address included in the halt snapshot's memory window.
pub const HALT_DUMP_END: u16 = 0x60;

/// Terminal result of a run: the machine state at the halt instruction,
/// with a bounded window of low memory for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HaltSnapshot {
    /// General registers, lowest index first.
    pub registers: Vec<u16>,
    pub pc: u16,
    pub sp: u16,
    pub flags: Flags,
    /// Instructions executed since power-on.
    pub cycles: u64,
    /// Bytes `0..=HALT_DUMP_END` at the time of the halt.
    pub memory: Vec<u8>,
}

/// The virtual CPU.
#[derive(Debug)]
pub struct Cpu {
    /// Register file.
    pub regs: RegisterFile,
    /// Main memory and MMIO ports.
    pub mem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Instructions executed since power-on.
    pub cycles: u64,
    config: MachineConfig,
}

impl Cpu {
    /// A powered-on machine with ports emitting to stdout.
    pub fn new(config: MachineConfig) -> Self {
        let mem = Memory::new(&config);
        Self::assemble_parts(config, mem)
    }

    /// A powered-on machine whose ports emit to `out` instead of stdout.
    pub fn with_output(config: MachineConfig, out: Box<dyn Write>) -> Self {
        let mem = Memory::with_output(&config, out);
        Self::assemble_parts(config, mem)
    }

    fn assemble_parts(config: MachineConfig, mem: Memory) -> Self {
        Self {
            regs: RegisterFile::new(&config),
            mem,
            state: CpuState::Running,
            cycles: 0,
            config,
        }
    }

    /// The machine's configuration.
    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Copy a program image into memory and point PC at it.
    pub fn load_program(&mut self, image: &[u8], start: u16) {
        self.mem.load(start, image);
        self.regs.pc = start;
    }

    /// Reset registers, memory, and cycle count to power-on state.
    pub fn reset(&mut self) {
        self.regs.reset(&self.config);
        self.mem.clear();
        self.state = CpuState::Running;
        self.cycles = 0;
    }

    /// Whether a HALT instruction has been executed.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Execute a single instruction and return the state afterwards.
    pub fn step(&mut self) -> Result<CpuState, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        // Fetch: opcode byte plus two little-endian operand words. PC
        // advances past the whole record before execute; a taken control
        // transfer overwrites the advanced value.
        let pc = self.regs.pc;
        let opcode = self.mem.read8(pc);
        let op1 = self.mem.read16(pc.wrapping_add(1));
        let op2 = self.mem.read16(pc.wrapping_add(3));
        self.regs.pc = pc.wrapping_add(RECORD_SIZE);

        let instr = decode::decode(opcode, op1, op2, self.regs.count());
        trace!("pc={pc:04x} op={opcode:02x} {:?}", instr.kind);

        self.execute(opcode, instr)?;
        self.cycles += 1;

        // The timer runs once per instruction, but halt terminates the
        // step before the tick.
        if self.state == CpuState::Running {
            self.mem.tick_timer();
        }

        Ok(self.state)
    }

    /// Run until halt. The halt snapshot is the only exit.
    pub fn run(&mut self) -> Result<HaltSnapshot, CpuError> {
        loop {
            if self.step()? == CpuState::Halted {
                return Ok(self.snapshot());
            }
        }
    }

    /// Capture the diagnostic snapshot of the current machine state.
    pub fn snapshot(&self) -> HaltSnapshot {
        HaltSnapshot {
            registers: self.regs.all(),
            pc: self.regs.pc,
            sp: self.regs.sp,
            flags: self.regs.flags,
            cycles: self.cycles,
            memory: self
                .mem
                .dump(0, HALT_DUMP_END)
                .into_iter()
                .map(|(_, byte)| byte)
                .collect(),
        }
    }

    fn execute(&mut self, opcode: u8, instr: DecodedInstr) -> Result<(), CpuError> {
        match instr.kind {
            InstrKind::RegImm => {
                let value = alu::mov(instr.imm);
                self.regs.set(instr.rd, value);
                self.regs.flags.zf = value == 0;
            }

            InstrKind::RegReg => {
                let value = alu::mov(self.regs.get(instr.rs));
                self.regs.set(instr.rd, value);
                self.regs.flags.zf = value == 0;
            }

            InstrKind::AluRegReg => {
                let a = self.regs.get(instr.rd);
                let b = self.regs.get(instr.rs);
                let mut flags = self.regs.flags;

                let result = match instr.alu_op {
                    AluOp::Add => Some(alu::add(a, b, &mut flags)),
                    AluOp::Sub => Some(alu::sub(a, b, &mut flags)),
                    AluOp::And => Some(alu::and(a, b, &mut flags)),
                    AluOp::Or => Some(alu::or(a, b, &mut flags)),
                    AluOp::Xor => Some(alu::xor(a, b, &mut flags)),
                    AluOp::Cmp => {
                        alu::cmp(a, b, &mut flags);
                        None
                    }
                    AluOp::Mov | AluOp::None => None,
                };

                self.regs.flags = flags;
                if let Some(result) = result {
                    self.regs.set(instr.rd, result);
                }
            }

            // ZF is deliberately left alone by loads.
            InstrKind::LoadWord => {
                let value = self.mem.read16(instr.imm);
                self.regs.set(instr.rd, value);
            }

            // Single-byte store: only the low half of the register
            // leaves the CPU, so a store into densely packed code
            // clobbers at most one byte of a record.
            InstrKind::StoreWord => {
                self.mem.write8(instr.imm, self.regs.get(instr.rs) as u8);
            }

            InstrKind::Jump => {
                self.regs.pc = instr.imm;
            }

            InstrKind::JumpCond => {
                // The condition lives in the raw opcode, not the
                // decoded form.
                let taken = if opcode == opcodes::JZ {
                    self.regs.flags.zf
                } else {
                    !self.regs.flags.zf
                };

                if taken {
                    self.regs.pc = instr.imm;
                }
            }

            InstrKind::PushReg => {
                self.regs.sp = self.regs.sp.wrapping_sub(2);
                self.mem.write16(self.regs.sp, self.regs.get(instr.rs));
            }

            InstrKind::PopReg => {
                let value = self.mem.read16(self.regs.sp);
                self.regs.sp = self.regs.sp.wrapping_add(2);
                self.regs.set(instr.rd, value);
            }

            InstrKind::Call => {
                self.regs.sp = self.regs.sp.wrapping_sub(2);
                self.mem.write16(self.regs.sp, self.regs.pc);
                self.regs.pc = instr.imm;
            }

            InstrKind::Ret => {
                let ret_addr = self.mem.read16(self.regs.sp);
                self.regs.sp = self.regs.sp.wrapping_add(2);
                self.regs.pc = ret_addr;
            }

            InstrKind::Halt => {
                self.state = CpuState::Halted;
            }

            InstrKind::None => match self.config.invalid_opcode {
                InvalidOpcodePolicy::Fault => {
                    return Err(CpuError::InvalidOpcode {
                        opcode,
                        pc: self.regs.pc.wrapping_sub(RECORD_SIZE),
                    });
                }
                InvalidOpcodePolicy::Ignore => {}
            },
        }

        Ok(())
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new(MachineConfig::default())
    }
}

/// Errors that can surface from the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("invalid opcode {opcode:#04x} at {pc:#06x}")]
    InvalidOpcode { opcode: u8, pc: u16 },
}
