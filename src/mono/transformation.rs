use super::{graph::InstructionGraph, lattice::LatticeElement};
use crate::reil::{Opcode, ReilInstruction};

/// States leaving a node: the first element flows along true edges, the
/// optional second one along false edges. Both are owned independently.
pub type Transformed<E> = (E, Option<E>);

/// Transfer function of an analysis.
pub trait TransformationProvider<G, E>
where
    G: InstructionGraph,
    E: LatticeElement,
{
    fn transform(&self, graph: &G, node: G::Node, state: &E) -> Transformed<E>;
}

/// Transfer function defined per REIL opcode.
///
/// Every implementor is a `TransformationProvider` for any instruction graph.
/// Mnemonics outside of the REIL opcode set are routed to
/// `transform_unknown_opcode`.
pub trait PerInstructionTransformationProvider<E: LatticeElement> {
    fn transform_add(&self, instruction: &ReilInstruction, state: &E) -> Transformed<E>;

    fn transform_and(&self, instruction: &ReilInstruction, state: &E) -> Transformed<E>;

    fn transform_bisz(&self, instruction: &ReilInstruction, state: &E) -> Transformed<E>;

    fn transform_bsh(&self, instruction: &ReilInstruction, state: &E) -> Transformed<E>;

    fn transform_div(&self, instruction: &ReilInstruction, state: &E) -> Transformed<E>;

    fn transform_jcc(&self, instruction: &ReilInstruction, state: &E) -> Transformed<E>;

    fn transform_ldm(&self, instruction: &ReilInstruction, state: &E) -> Transformed<E>;

    fn transform_mod(&self, instruction: &ReilInstruction, state: &E) -> Transformed<E>;

    fn transform_mul(&self, instruction: &ReilInstruction, state: &E) -> Transformed<E>;

    fn transform_nop(&self, instruction: &ReilInstruction, state: &E) -> Transformed<E>;

    fn transform_or(&self, instruction: &ReilInstruction, state: &E) -> Transformed<E>;

    fn transform_stm(&self, instruction: &ReilInstruction, state: &E) -> Transformed<E>;

    fn transform_str(&self, instruction: &ReilInstruction, state: &E) -> Transformed<E>;

    fn transform_sub(&self, instruction: &ReilInstruction, state: &E) -> Transformed<E>;

    fn transform_undef(&self, instruction: &ReilInstruction, state: &E) -> Transformed<E>;

    /// The REIL `unkn` opcode, i.e. a native instruction REIL can not express.
    fn transform_unknown(&self, instruction: &ReilInstruction, state: &E) -> Transformed<E>;

    /// A mnemonic that is not part of the REIL opcode set.
    fn transform_unknown_opcode(&self, instruction: &ReilInstruction, state: &E)
        -> Transformed<E>;

    fn transform_xor(&self, instruction: &ReilInstruction, state: &E) -> Transformed<E>;

    fn transform_instruction(&self, instruction: &ReilInstruction, state: &E) -> Transformed<E> {
        match instruction.opcode() {
            Opcode::Add => self.transform_add(instruction, state),
            Opcode::And => self.transform_and(instruction, state),
            Opcode::Bisz => self.transform_bisz(instruction, state),
            Opcode::Bsh => self.transform_bsh(instruction, state),
            Opcode::Div => self.transform_div(instruction, state),
            Opcode::Jcc => self.transform_jcc(instruction, state),
            Opcode::Ldm => self.transform_ldm(instruction, state),
            Opcode::Mod => self.transform_mod(instruction, state),
            Opcode::Mul => self.transform_mul(instruction, state),
            Opcode::Nop => self.transform_nop(instruction, state),
            Opcode::Or => self.transform_or(instruction, state),
            Opcode::Stm => self.transform_stm(instruction, state),
            Opcode::Str => self.transform_str(instruction, state),
            Opcode::Sub => self.transform_sub(instruction, state),
            Opcode::Undef => self.transform_undef(instruction, state),
            Opcode::Unkn => self.transform_unknown(instruction, state),
            Opcode::Xor => self.transform_xor(instruction, state),
            Opcode::Unrecognized(_) => self.transform_unknown_opcode(instruction, state),
        }
    }
}

impl<G, E, P> TransformationProvider<G, E> for P
where
    G: InstructionGraph,
    E: LatticeElement,
    P: PerInstructionTransformationProvider<E>,
{
    fn transform(&self, graph: &G, node: G::Node, state: &E) -> Transformed<E> {
        self.transform_instruction(graph.instruction(node), state)
    }
}
