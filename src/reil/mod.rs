//! # REIL instructions
//!
//! REIL is a reduced intermediate language: every native instruction is
//! expanded into a short sequence of micro-instructions that share the native
//! address in their upper bits. The lowest 8 bits of a REIL address index the
//! micro-instruction inside its native instruction.

mod instruction;
mod operand;
mod parse;

pub use self::{instruction::*, operand::*, parse::*};

const MICRO_INSTRUCTION_BITS: u32 = 8;
const MICRO_INSTRUCTION_MASK: u64 = 0xFF;

pub fn native_address(reil_address: u64) -> u64 {
    reil_address >> MICRO_INSTRUCTION_BITS
}

pub fn reil_address(native_address: u64, index: u8) -> u64 {
    (native_address << MICRO_INSTRUCTION_BITS) | u64::from(index)
}

/// True if the REIL address belongs to the first micro-instruction of a
/// native instruction.
pub fn starts_native_instruction(reil_address: u64) -> bool {
    reil_address & MICRO_INSTRUCTION_MASK == 0
}

/// REIL temporaries (`t0`, `t1`, ...) only live inside a single native
/// instruction.
pub fn is_temporary_register(register: &str) -> bool {
    match register.strip_prefix('t') {
        Some(index) => !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}
