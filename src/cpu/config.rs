//! Machine configuration.
//!
//! The hardware constants of the machine (register count, stack top,
//! port addresses, invalid-opcode policy) live in one immutable value
//! handed to the CPU at construction, so independently configured
//! machines can coexist in the same process.

use serde::{Deserialize, Serialize};

/// Number of bytes in the address space. Fixed by the 16-bit address width.
pub const MEM_SIZE: usize = 65536;

/// What the engine does with an opcode outside the instruction table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvalidOpcodePolicy {
    /// `step()` reports the opcode and faulting PC as an error.
    Fault,
    /// Silent no-op, matching the legacy machine.
    Ignore,
}

/// Immutable machine parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineConfig {
    /// Number of general registers. Register operands are reduced modulo
    /// this count by the decoder, so it must be at least 1.
    pub register_count: u16,
    /// Initial stack pointer. The stack grows downward from here.
    pub stack_top: u16,
    /// Numeric output port: a write prints the value in decimal plus a space.
    pub port_numeric_out: u16,
    /// Character output port: a write prints the low byte as ASCII.
    pub port_char_out: u16,
    /// Free-running 8-bit timer register, incremented once per instruction.
    pub port_timer: u16,
    /// Policy for unrecognized opcodes.
    pub invalid_opcode: InvalidOpcodePolicy,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            register_count: 8,
            stack_top: 0x8000,
            port_numeric_out: 0xFF00,
            port_char_out: 0xFF10,
            port_timer: 0xFF01,
            invalid_opcode: InvalidOpcodePolicy::Fault,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stack_sits_below_the_ports() {
        let config = MachineConfig::default();
        assert!(config.stack_top < config.port_numeric_out);
        assert!(config.stack_top < config.port_char_out);
        assert!(config.stack_top < config.port_timer);
    }
}
