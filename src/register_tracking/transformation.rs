use super::{RegisterSet, RegisterTrackingOptions};
use crate::{
    mono::{AnalysisDirection, PerInstructionTransformationProvider, Transformed},
    reil::{OperandType, ReilInstruction},
};
use log::warn;
use std::collections::BTreeSet;

type Update = Transformed<RegisterSet>;

/// Transfer functions of the register tracking analysis.
///
/// Walking down, a register is tainted as soon as it is computed from a
/// tainted register. Walking up, the inputs of an instruction become tainted
/// once its output is.
pub struct RegisterTrackingTransformationProvider<'a> {
    options: &'a RegisterTrackingOptions,
}

impl<'a> RegisterTrackingTransformationProvider<'a> {
    pub fn new(options: &'a RegisterTrackingOptions) -> Self {
        Self { options }
    }

    fn transform_normal_instruction(
        &self,
        instruction: &ReilInstruction,
        state: &RegisterSet,
    ) -> Update {
        match self.options.direction {
            AnalysisDirection::Down => self.transform_forward(instruction, state),
            AnalysisDirection::Up => self.transform_backward(instruction, state),
        }
    }

    fn transform_forward(
        &self,
        instruction: &ReilInstruction,
        state: &RegisterSet,
    ) -> Update {
        let inputs = input_registers(instruction);
        let output = instruction.third_operand().value();

        let mut next = state.clone();

        if state.is_any_tainted(&inputs) {
            inputs
                .iter()
                .filter(|r| state.is_tainted(r))
                .for_each(|r| next.add_read_register(r));

            next.taint(output);
        } else {
            next.untaint(output);
        }

        (next, None)
    }

    fn transform_backward(
        &self,
        instruction: &ReilInstruction,
        state: &RegisterSet,
    ) -> Update {
        let inputs = input_registers(instruction);
        let output = instruction.third_operand().value();

        let mut next = state.clone();

        if state.is_tainted(output) {
            next.untaint(output);

            if !inputs.is_empty() {
                next.add_read_register(output);
                next.taint_all(&inputs);
            }
        }

        (next, None)
    }

    /// The output is overwritten with a value that does not depend on any
    /// register.
    fn clear_output(
        &self,
        instruction: &ReilInstruction,
        state: &RegisterSet,
    ) -> Update {
        let mut next = state.clone();
        next.untaint(instruction.third_operand().value());

        (next, None)
    }
}

fn input_registers(instruction: &ReilInstruction) -> BTreeSet<&str> {
    instruction.operands()[..2]
        .iter()
        .filter(|o| o.is_register())
        .map(|o| o.value())
        .collect()
}

fn has_literal_input(instruction: &ReilInstruction, value: u64) -> bool {
    instruction.operands()[..2].iter().any(|o| {
        o.operand_type() == OperandType::IntegerLiteral && o.literal_value() == Some(value)
    })
}

fn has_equal_inputs(instruction: &ReilInstruction) -> bool {
    instruction
        .first_operand()
        .value()
        .eq_ignore_ascii_case(instruction.second_operand().value())
}

/// `or` with an all-ones literal of the output width.
fn is_saturating_or(instruction: &ReilInstruction) -> bool {
    let size = instruction.third_operand().size();

    let same_size = instruction.first_operand().size() == size
        && instruction.second_operand().size() == size;

    match size.truncate_mask() {
        Some(mask) => same_size && has_literal_input(instruction, mask),
        None => false,
    }
}

impl<'a> PerInstructionTransformationProvider<RegisterSet>
    for RegisterTrackingTransformationProvider<'a>
{
    fn transform_add(&self, instruction: &ReilInstruction, state: &RegisterSet) -> Update {
        self.transform_normal_instruction(instruction, state)
    }

    fn transform_and(&self, instruction: &ReilInstruction, state: &RegisterSet) -> Update {
        if has_literal_input(instruction, 0) {
            self.clear_output(instruction, state)
        } else {
            self.transform_normal_instruction(instruction, state)
        }
    }

    fn transform_bisz(&self, instruction: &ReilInstruction, state: &RegisterSet) -> Update {
        self.transform_normal_instruction(instruction, state)
    }

    fn transform_bsh(&self, instruction: &ReilInstruction, state: &RegisterSet) -> Update {
        self.transform_normal_instruction(instruction, state)
    }

    fn transform_div(&self, instruction: &ReilInstruction, state: &RegisterSet) -> Update {
        self.transform_normal_instruction(instruction, state)
    }

    fn transform_jcc(&self, instruction: &ReilInstruction, state: &RegisterSet) -> Update {
        let mut next = state.clone();

        if instruction.is_function_call() {
            if self.options.clears_all_registers {
                next.untaint_all(state.tainted_registers());
            } else {
                next.untaint_all(&self.options.cleared_registers);
            }
        }

        (next.clone(), Some(next))
    }

    fn transform_ldm(&self, instruction: &ReilInstruction, state: &RegisterSet) -> Update {
        self.clear_output(instruction, state)
    }

    fn transform_mod(&self, instruction: &ReilInstruction, state: &RegisterSet) -> Update {
        self.transform_normal_instruction(instruction, state)
    }

    fn transform_mul(&self, instruction: &ReilInstruction, state: &RegisterSet) -> Update {
        if has_literal_input(instruction, 0) {
            self.clear_output(instruction, state)
        } else {
            self.transform_normal_instruction(instruction, state)
        }
    }

    fn transform_nop(&self, instruction: &ReilInstruction, state: &RegisterSet) -> Update {
        self.transform_normal_instruction(instruction, state)
    }

    fn transform_or(&self, instruction: &ReilInstruction, state: &RegisterSet) -> Update {
        if is_saturating_or(instruction) {
            self.clear_output(instruction, state)
        } else {
            self.transform_normal_instruction(instruction, state)
        }
    }

    fn transform_stm(&self, instruction: &ReilInstruction, state: &RegisterSet) -> Update {
        let value = instruction.first_operand();
        let mut next = state.clone();

        if value.is_register() && state.is_tainted(value.value()) {
            next.add_read_register(value.value());
        }

        (next, None)
    }

    fn transform_str(&self, instruction: &ReilInstruction, state: &RegisterSet) -> Update {
        self.transform_normal_instruction(instruction, state)
    }

    fn transform_sub(&self, instruction: &ReilInstruction, state: &RegisterSet) -> Update {
        if has_equal_inputs(instruction) {
            self.clear_output(instruction, state)
        } else {
            self.transform_normal_instruction(instruction, state)
        }
    }

    fn transform_undef(&self, instruction: &ReilInstruction, state: &RegisterSet) -> Update {
        self.clear_output(instruction, state)
    }

    fn transform_unknown(&self, _: &ReilInstruction, state: &RegisterSet) -> Update {
        (state.clone(), None)
    }

    fn transform_unknown_opcode(
        &self,
        instruction: &ReilInstruction,
        state: &RegisterSet,
    ) -> Update {
        warn!(
            "unknown opcode \"{}\" at {:#x}, passing register state on unchanged",
            instruction.opcode(),
            instruction.address()
        );

        (state.clone(), None)
    }

    fn transform_xor(&self, instruction: &ReilInstruction, state: &RegisterSet) -> Update {
        if has_equal_inputs(instruction) {
            self.clear_output(instruction, state)
        } else {
            self.transform_normal_instruction(instruction, state)
        }
    }
}
