//! The register file: general registers, PC, SP, and status flags.

use serde::{Deserialize, Serialize};

use crate::cpu::config::MachineConfig;

/// Status flags written by ALU operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags {
    /// Zero flag: the last result was zero.
    pub zf: bool,
    /// Carry flag: unsigned overflow on add, borrow on sub/cmp.
    pub cf: bool,
}

/// The register file.
///
/// General registers are reachable only through [`get`](Self::get) and
/// [`set`](Self::set). The decoder reduces every register operand modulo
/// the register count, so each index handed to the accessors is in range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterFile {
    r: Vec<u16>,
    /// Program counter.
    pub pc: u16,
    /// Stack pointer; grows downward from the configured stack top.
    pub sp: u16,
    /// Status flags.
    pub flags: Flags,
}

impl RegisterFile {
    /// Power-on register file: all general registers zero, PC at zero,
    /// SP at the configured stack top, flags clear.
    pub fn new(config: &MachineConfig) -> Self {
        Self {
            r: vec![0; config.register_count as usize],
            pc: 0,
            sp: config.stack_top,
            flags: Flags::default(),
        }
    }

    /// Number of general registers.
    #[inline]
    pub fn count(&self) -> u16 {
        self.r.len() as u16
    }

    /// Read a general register.
    #[inline]
    pub fn get(&self, index: u16) -> u16 {
        self.r[index as usize]
    }

    /// Write a general register.
    #[inline]
    pub fn set(&mut self, index: u16, value: u16) {
        self.r[index as usize] = value;
    }

    /// Snapshot of the general registers, lowest index first.
    pub fn all(&self) -> Vec<u16> {
        self.r.clone()
    }

    /// Reset to power-on state.
    pub fn reset(&mut self, config: &MachineConfig) {
        *self = Self::new(config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_on_state() {
        let config = MachineConfig::default();
        let regs = RegisterFile::new(&config);

        assert_eq!(regs.count(), config.register_count);
        assert!(regs.all().iter().all(|&r| r == 0));
        assert_eq!(regs.pc, 0);
        assert_eq!(regs.sp, config.stack_top);
        assert_eq!(regs.flags, Flags::default());
    }

    #[test]
    fn get_set_roundtrip() {
        let mut regs = RegisterFile::new(&MachineConfig::default());

        regs.set(3, 0xBEEF);
        assert_eq!(regs.get(3), 0xBEEF);
        assert_eq!(regs.get(0), 0);
    }

    #[test]
    fn reset_restores_power_on_state() {
        let config = MachineConfig::default();
        let mut regs = RegisterFile::new(&config);

        regs.set(0, 1);
        regs.pc = 0x1234;
        regs.sp = 0x10;
        regs.flags.zf = true;
        regs.reset(&config);

        assert_eq!(regs.get(0), 0);
        assert_eq!(regs.pc, 0);
        assert_eq!(regs.sp, config.stack_top);
        assert!(!regs.flags.zf);
    }
}
