//! Disassembler for 5-byte instruction records.

use crate::cpu::decode::{opcodes, RECORD_SIZE};

/// Render one record as assembly text. Opcodes outside the table render
/// as `???` with the raw byte.
pub fn disassemble_record(opcode: u8, op1: u16, op2: u16) -> String {
    use opcodes::*;

    match opcode {
        MOVI => format!("MOVI R{op1}, {op2}"),
        MOV => format!("MOV R{op1}, R{op2}"),

        ADD => format!("ADD R{op1}, R{op2}"),
        SUB => format!("SUB R{op1}, R{op2}"),
        AND => format!("AND R{op1}, R{op2}"),
        OR => format!("OR R{op1}, R{op2}"),
        XOR => format!("XOR R{op1}, R{op2}"),
        CMP => format!("CMP R{op1}, R{op2}"),

        LOAD => format!("LOAD R{op1}, {op2:#06x}"),
        STORE => format!("STORE R{op1}, {op2:#06x}"),

        JMP => format!("JMP {op1:#06x}"),
        JZ => format!("JZ {op1:#06x}"),
        JNZ => format!("JNZ {op1:#06x}"),

        PUSH => format!("PUSH R{op1}"),
        POP => format!("POP R{op1}"),

        CALL => format!("CALL {op1:#06x}"),
        RET => "RET".to_string(),

        HALT => "HALT".to_string(),

        _ => format!("??? ; opcode {opcode:#04x}"),
    }
}

/// Disassemble a flat program image, one line per record.
pub fn disassemble(image: &[u8]) -> String {
    let mut out = String::new();

    for (index, record) in image.chunks(RECORD_SIZE as usize).enumerate() {
        // A truncated trailing record reads as zero-padded.
        let byte = |i: usize| record.get(i).copied().unwrap_or(0);
        let op1 = u16::from_le_bytes([byte(1), byte(2)]);
        let op2 = u16::from_le_bytes([byte(3), byte(4)]);
        let addr = index * RECORD_SIZE as usize;

        out.push_str(&format!(
            "{addr:04x}: {}\n",
            disassemble_record(byte(0), op1, op2)
        ));
    }

    out
}
