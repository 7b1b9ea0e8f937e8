//! # Parse REIL listings
//!
//! Reads single REIL instructions in the listing format produced by
//! `ReilInstruction`'s `Display` implementation:
//!
//! ```text
//! 0000000100C32C00: add [DWORD 12, DWORD ebp, QWORD t0]
//! 0000000100C32C10: bisz [BYTE t13, EMPTY , BYTE ZF]
//! 0000000100C32D00: nop
//! ```

use super::{Opcode, OperandSize, ReilInstruction, ReilOperand};
use lazy_static::lazy_static;
use regex::Regex;
use std::{convert::TryFrom, str::FromStr};
use thiserror::Error;

lazy_static! {
    static ref INSTRUCTION_PATTERN: Regex =
        Regex::new(r"^\s*([0-9A-Fa-f]+)\s*:\s*([A-Za-z][A-Za-z0-9_]*)\s*(?:\[(.*)\])?\s*$")
            .unwrap();
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed REIL instruction '{0}'")]
    MalformedInstruction(String),

    #[error("invalid REIL address '{0}'")]
    InvalidAddress(String),

    #[error("unknown operand size '{0}'")]
    UnknownOperandSize(String),

    #[error("malformed operand '{0}'")]
    MalformedOperand(String),

    #[error("REIL instructions take 3 operands but found {0}")]
    OperandCount(usize),
}

impl FromStr for ReilInstruction {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let captures = INSTRUCTION_PATTERN
            .captures(line)
            .ok_or_else(|| ParseError::MalformedInstruction(line.to_string()))?;

        let address = u64::from_str_radix(&captures[1], 16)
            .map_err(|_| ParseError::InvalidAddress(captures[1].to_string()))?;

        let opcode = captures[2]
            .parse::<Opcode>()
            .map_err(|_| ParseError::MalformedInstruction(line.to_string()))?;

        let [first, second, third] = match captures.get(3) {
            Some(operands) => parse_operands(operands.as_str())?,
            None => [
                ReilOperand::empty(),
                ReilOperand::empty(),
                ReilOperand::empty(),
            ],
        };

        Ok(ReilInstruction::new(address, opcode, first, second, third))
    }
}

fn parse_operands(operands: &str) -> Result<[ReilOperand; 3], ParseError> {
    let parsed = operands
        .split(',')
        .map(parse_operand)
        .collect::<Result<Vec<_>, _>>()?;

    match <[ReilOperand; 3]>::try_from(parsed) {
        Ok(operands) => Ok(operands),
        Err(parsed) => Err(ParseError::OperandCount(parsed.len())),
    }
}

fn parse_operand(operand: &str) -> Result<ReilOperand, ParseError> {
    let mut tokens = operand.split_whitespace();

    let size = match tokens.next() {
        Some(size) => size
            .parse::<OperandSize>()
            .map_err(|_| ParseError::UnknownOperandSize(size.to_string()))?,
        None => return Ok(ReilOperand::empty()),
    };

    match (size, tokens.next(), tokens.next()) {
        (OperandSize::Empty, None, _) => Ok(ReilOperand::empty()),
        (OperandSize::Empty, Some(_), _) => Err(ParseError::MalformedOperand(operand.to_string())),
        (size, Some(value), None) => Ok(ReilOperand::new(size, value)),
        _ => Err(ParseError::MalformedOperand(operand.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reil::OperandType;

    #[test]
    fn parse_three_operand_instruction() {
        let instruction: ReilInstruction = "0000000100C32C06: sub [BYTE t2, BYTE t4, WORD t7]"
            .parse()
            .unwrap();

        assert_eq!(instruction.address(), 0x1_00C3_2C06);
        assert_eq!(instruction.opcode(), &Opcode::Sub);
        assert_eq!(instruction.first_operand().value(), "t2");
        assert_eq!(instruction.third_operand().size(), OperandSize::Word);
    }

    #[test]
    fn parse_empty_operands_and_bare_nop() {
        let bisz: ReilInstruction = "0000000100C32C10: bisz [BYTE t13, EMPTY , BYTE ZF]"
            .parse()
            .unwrap();
        assert_eq!(bisz.second_operand().operand_type(), OperandType::Empty);

        let nop: ReilInstruction = "100: nop".parse().unwrap();
        assert_eq!(nop, ReilInstruction::nop(0x100));
    }

    #[test]
    fn display_output_parses_back() {
        let line = "0000000000000801: and [DWORD ebx, BYTE 255, BYTE t4]";
        let instruction: ReilInstruction = line.parse().unwrap();

        assert_eq!(instruction.to_string(), line);
    }

    #[test]
    fn listing_parses_from_several_threads() {
        let handles = (0..4u64)
            .map(|native| {
                std::thread::spawn(move || {
                    (0..=0xFFu64)
                        .map(|index| format!("{:X}: nop", (native << 8) | index))
                        .map(|line| line.parse::<ReilInstruction>().unwrap().address())
                        .collect::<Vec<_>>()
                })
            })
            .collect::<Vec<_>>();

        for (native, handle) in handles.into_iter().enumerate() {
            let addresses = handle.join().unwrap();

            assert_eq!(addresses.len(), 0x100);
            assert_eq!(addresses[0x42], ((native as u64) << 8) | 0x42);
        }
    }

    #[test]
    fn reject_malformed_lines() {
        assert_eq!(
            "100: add [DWORD eax, DWORD ebx]".parse::<ReilInstruction>(),
            Err(ParseError::OperandCount(2))
        );
        assert_eq!(
            "100: add [DWORD eax, NIBBLE ebx, DWORD ecx]".parse::<ReilInstruction>(),
            Err(ParseError::UnknownOperandSize(String::from("NIBBLE")))
        );
        assert!(matches!(
            "add [DWORD eax, DWORD ebx, DWORD ecx]".parse::<ReilInstruction>(),
            Err(ParseError::MalformedInstruction(_))
        ));
    }
}
