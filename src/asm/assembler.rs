//! Two-pass assembler for the 5-byte record format.
//!
//! Pass one counts five bytes per instruction line and records `label:`
//! definitions; pass two encodes mnemonics and operands, resolving label
//! references to absolute addresses.
//!
//! Syntax:
//! ```text
//! ; comment
//! start:
//!     MOVI R0, 5
//!     STORE R0, 0xFF00
//!     JMP start
//!     HALT
//! ```

use std::collections::HashMap;

use log::debug;
use thiserror::Error;

use crate::cpu::decode::{encode_record, opcodes, RECORD_SIZE};

/// Assemble source text into a flat binary image.
pub fn assemble(source: &str) -> Result<Vec<u8>, AssemblerError> {
    let labels = first_pass(source)?;
    debug!("pass 1: {} label(s)", labels.len());
    second_pass(source, &labels)
}

/// Strip the comment and surrounding whitespace from one line.
fn clean(line: &str) -> &str {
    line.split(';').next().unwrap_or("").trim()
}

fn first_pass(source: &str) -> Result<HashMap<String, u16>, AssemblerError> {
    let mut labels = HashMap::new();
    let mut pc: u16 = 0;

    for (idx, raw) in source.lines().enumerate() {
        let line = clean(raw);
        if line.is_empty() {
            continue;
        }

        if let Some(name) = line.strip_suffix(':') {
            let name = name.trim().to_string();
            if labels.insert(name.clone(), pc).is_some() {
                return Err(AssemblerError::DuplicateLabel {
                    line: idx + 1,
                    label: name,
                });
            }
            continue;
        }

        // Every instruction line occupies exactly one record.
        pc = pc.wrapping_add(RECORD_SIZE);
    }

    Ok(labels)
}

fn second_pass(source: &str, labels: &HashMap<String, u16>) -> Result<Vec<u8>, AssemblerError> {
    let mut out = Vec::new();

    for (idx, raw) in source.lines().enumerate() {
        let line_num = idx + 1;
        let line = clean(raw);
        if line.is_empty() || line.ends_with(':') {
            continue;
        }

        let tokens: Vec<String> = line
            .split_whitespace()
            .map(|t| t.trim_end_matches(',').to_string())
            .collect();
        let mnemonic = tokens[0].to_uppercase();
        let operands = &tokens[1..];

        let (opcode, op1, op2) = match mnemonic.as_str() {
            "MOVI" => {
                expect_operands(&mnemonic, operands, 2, line_num)?;
                (
                    opcodes::MOVI,
                    parse_register(&operands[0], line_num)?,
                    parse_value(&operands[1], labels, line_num)?,
                )
            }

            m @ ("MOV" | "ADD" | "SUB" | "AND" | "OR" | "XOR" | "CMP") => {
                expect_operands(m, operands, 2, line_num)?;
                let opcode = match m {
                    "MOV" => opcodes::MOV,
                    "ADD" => opcodes::ADD,
                    "SUB" => opcodes::SUB,
                    "AND" => opcodes::AND,
                    "OR" => opcodes::OR,
                    "XOR" => opcodes::XOR,
                    _ => opcodes::CMP,
                };
                (
                    opcode,
                    parse_register(&operands[0], line_num)?,
                    parse_register(&operands[1], line_num)?,
                )
            }

            m @ ("LOAD" | "STORE") => {
                expect_operands(m, operands, 2, line_num)?;
                let opcode = if m == "LOAD" {
                    opcodes::LOAD
                } else {
                    opcodes::STORE
                };
                (
                    opcode,
                    parse_register(&operands[0], line_num)?,
                    parse_value(&operands[1], labels, line_num)?,
                )
            }

            m @ ("JMP" | "JZ" | "JNZ" | "CALL") => {
                expect_operands(m, operands, 1, line_num)?;
                let opcode = match m {
                    "JMP" => opcodes::JMP,
                    "JZ" => opcodes::JZ,
                    "JNZ" => opcodes::JNZ,
                    _ => opcodes::CALL,
                };
                (opcode, parse_value(&operands[0], labels, line_num)?, 0)
            }

            m @ ("PUSH" | "POP") => {
                expect_operands(m, operands, 1, line_num)?;
                let opcode = if m == "PUSH" {
                    opcodes::PUSH
                } else {
                    opcodes::POP
                };
                (opcode, parse_register(&operands[0], line_num)?, 0)
            }

            "RET" => {
                expect_operands("RET", operands, 0, line_num)?;
                (opcodes::RET, 0, 0)
            }

            "HALT" => {
                expect_operands("HALT", operands, 0, line_num)?;
                (opcodes::HALT, 0, 0)
            }

            _ => {
                return Err(AssemblerError::UnknownMnemonic {
                    line: line_num,
                    mnemonic,
                })
            }
        };

        out.extend_from_slice(&encode_record(opcode, op1, op2));
    }

    debug!("pass 2: {} byte(s)", out.len());
    Ok(out)
}

fn expect_operands(
    mnemonic: &str,
    operands: &[String],
    expected: usize,
    line: usize,
) -> Result<(), AssemblerError> {
    if operands.len() != expected {
        return Err(AssemblerError::OperandCount {
            line,
            mnemonic: mnemonic.to_string(),
            expected,
            found: operands.len(),
        });
    }
    Ok(())
}

fn parse_register(token: &str, line: usize) -> Result<u16, AssemblerError> {
    token
        .strip_prefix('R')
        .or_else(|| token.strip_prefix('r'))
        .and_then(|n| n.parse::<u16>().ok())
        .ok_or_else(|| AssemblerError::BadRegister {
            line,
            token: token.to_string(),
        })
}

/// Parse an immediate or address operand: a label, a `0x` hex literal,
/// or a decimal number.
fn parse_value(
    token: &str,
    labels: &HashMap<String, u16>,
    line: usize,
) -> Result<u16, AssemblerError> {
    if let Some(&addr) = labels.get(token) {
        return Ok(addr);
    }

    let parsed = if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).ok()
    } else {
        token.parse::<u16>().ok()
    };

    parsed.ok_or_else(|| {
        if looks_like_label(token) {
            AssemblerError::UndefinedLabel {
                line,
                label: token.to_string(),
            }
        } else {
            AssemblerError::BadOperand {
                line,
                token: token.to_string(),
            }
        }
    })
}

fn looks_like_label(token: &str) -> bool {
    let mut chars = token.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("line {line}: {mnemonic} takes {expected} operand(s), got {found}")]
    OperandCount {
        line: usize,
        mnemonic: String,
        expected: usize,
        found: usize,
    },

    #[error("invalid register on line {line}: {token}")]
    BadRegister { line: usize, token: String },

    #[error("invalid operand on line {line}: {token}")]
    BadOperand { line: usize, token: String },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("duplicate label on line {line}: {label}")]
    DuplicateLabel { line: usize, label: String },
}
