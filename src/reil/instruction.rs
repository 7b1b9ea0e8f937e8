use super::{native_address, operand::ReilOperand};
use std::fmt;
use strum::{EnumString, IntoStaticStr};

/// The closed REIL opcode set. Mnemonics outside of it are kept verbatim in
/// `Unrecognized` so that analyses can degrade gracefully.
#[derive(Clone, Debug, Eq, Hash, PartialEq, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Opcode {
    Add,
    And,
    Bisz,
    Bsh,
    Div,
    Jcc,
    Ldm,
    Mod,
    Mul,
    Nop,
    Or,
    Stm,
    Str,
    Sub,
    Undef,
    Unkn,
    Xor,
    #[strum(default)]
    Unrecognized(String),
}

impl Opcode {
    pub fn mnemonic(&self) -> &str {
        match self {
            Opcode::Unrecognized(mnemonic) => mnemonic.as_str(),
            known => {
                let name: &'static str = known.into();
                name
            }
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ReilInstruction {
    address: u64,
    opcode: Opcode,
    operands: [ReilOperand; 3],
    function_call: bool,
}

impl ReilInstruction {
    pub fn new(
        address: u64,
        opcode: Opcode,
        first: ReilOperand,
        second: ReilOperand,
        third: ReilOperand,
    ) -> Self {
        Self {
            address,
            opcode,
            operands: [first, second, third],
            function_call: false,
        }
    }

    pub fn nop(address: u64) -> Self {
        Self::new(
            address,
            Opcode::Nop,
            ReilOperand::empty(),
            ReilOperand::empty(),
            ReilOperand::empty(),
        )
    }

    /// Marks a `jcc` as the REIL expansion of a native call.
    pub fn into_function_call(mut self) -> Self {
        self.function_call = true;
        self
    }

    /// REIL address, i.e. the native address shifted left by 8 bits plus the
    /// index of the micro-instruction.
    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn native_address(&self) -> u64 {
        native_address(self.address)
    }

    pub fn opcode(&self) -> &Opcode {
        &self.opcode
    }

    pub fn first_operand(&self) -> &ReilOperand {
        &self.operands[0]
    }

    pub fn second_operand(&self) -> &ReilOperand {
        &self.operands[1]
    }

    pub fn third_operand(&self) -> &ReilOperand {
        &self.operands[2]
    }

    pub fn operands(&self) -> &[ReilOperand; 3] {
        &self.operands
    }

    pub fn is_function_call(&self) -> bool {
        self.opcode == Opcode::Jcc && self.function_call
    }
}

impl fmt::Display for ReilInstruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:016X}: {} [{}, {}, {}]",
            self.address, self.opcode, self.operands[0], self.operands[1], self.operands[2]
        )
    }
}
