use std::fmt;
use strum::{EnumString, EnumVariantNames, IntoStaticStr};

#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    EnumString,
    EnumVariantNames,
    IntoStaticStr,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum OperandSize {
    Empty,
    Byte,
    Word,
    Dword,
    Qword,
    Oword,
    Address,
}

impl OperandSize {
    pub fn bit_size(&self) -> Option<u32> {
        match self {
            OperandSize::Byte => Some(8),
            OperandSize::Word => Some(16),
            OperandSize::Dword => Some(32),
            OperandSize::Qword => Some(64),
            OperandSize::Oword => Some(128),
            OperandSize::Empty | OperandSize::Address => None,
        }
    }

    /// All-ones mask of this size, used to recognize truncating `or` idioms.
    pub fn truncate_mask(&self) -> Option<u64> {
        match self {
            OperandSize::Byte => Some(0xFF),
            OperandSize::Word => Some(0xFFFF),
            OperandSize::Dword => Some(0xFFFF_FFFF),
            OperandSize::Qword => Some(u64::MAX),
            _ => None,
        }
    }
}

impl fmt::Display for OperandSize {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name: &'static str = self.into();

        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum OperandType {
    Empty,
    IntegerLiteral,
    Register,
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ReilOperand {
    size: OperandSize,
    value: String,
}

impl ReilOperand {
    pub fn new<S>(size: OperandSize, value: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            size,
            value: value.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new(OperandSize::Empty, "")
    }

    pub fn size(&self) -> OperandSize {
        self.size
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn operand_type(&self) -> OperandType {
        if self.size == OperandSize::Empty {
            OperandType::Empty
        } else if self.literal_value().is_some() {
            OperandType::IntegerLiteral
        } else {
            OperandType::Register
        }
    }

    pub fn is_register(&self) -> bool {
        self.operand_type() == OperandType::Register
    }

    /// Literal value of this operand. Negative literals (shift amounts) are
    /// returned in two's complement.
    pub fn literal_value(&self) -> Option<u64> {
        self.value
            .parse::<u64>()
            .ok()
            .or_else(|| self.value.parse::<i64>().ok().map(|v| v as u64))
    }
}

impl fmt::Display for ReilOperand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.operand_type() {
            OperandType::Empty => write!(f, "{}", self.size),
            _ => write!(f, "{} {}", self.size, self.value),
        }
    }
}
