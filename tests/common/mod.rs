#![allow(dead_code)]

use monoreil::{
    mono::{
        InstructionGraph, Lattice, LatticeElement, ReilInstructionGraph, TransformationProvider,
        Transformed,
    },
    reil::{reil_address, Opcode, ReilInstruction, ReilOperand},
};
use petgraph::graph::{EdgeIndex, NodeIndex};
use std::{collections::BTreeSet, sync::Once};

static INIT_LOGGER: Once = Once::new();

pub fn init() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Set of integers ordered by inclusion.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Values(pub BTreeSet<u64>);

impl LatticeElement for Values {
    fn on_instruction_exit(&mut self) {}
}

pub fn values(vs: &[u64]) -> Values {
    Values(vs.iter().copied().collect())
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ValuesLattice;

impl Lattice for ValuesLattice {
    type Element = Values;

    fn is_smaller_equal(&self, lhs: &Values, rhs: &Values) -> bool {
        lhs.0.is_subset(&rhs.0)
    }

    fn combine(&self, elements: &[&Values]) -> Values {
        Values(elements.iter().flat_map(|v| v.0.iter().copied()).collect())
    }

    fn minimal_element(&self) -> Values {
        Values::default()
    }
}

/// `add` increments every value, `jcc` optionally sends all values plus 100
/// along false edges. Every other instruction is the identity.
#[derive(Clone, Copy, Debug, Default)]
pub struct Increment {
    pub limit: Option<u64>,
    pub split_branches: bool,
}

impl Increment {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn saturating(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    fn shift(&self, state: &Values, offset: u64) -> Values {
        Values(
            state
                .0
                .iter()
                .map(|v| match self.limit {
                    Some(limit) => (v + offset).min(limit),
                    None => v + offset,
                })
                .collect(),
        )
    }
}

impl TransformationProvider<ReilInstructionGraph, Values> for Increment {
    fn transform(
        &self,
        graph: &ReilInstructionGraph,
        node: NodeIndex,
        state: &Values,
    ) -> Transformed<Values> {
        match graph.instruction(node).opcode() {
            Opcode::Add => (self.shift(state, 1), None),
            Opcode::Jcc if self.split_branches => (state.clone(), Some(self.shift(state, 100))),
            _ => (state.clone(), None),
        }
    }
}

pub fn instruction(native: u64, index: u8, opcode: Opcode) -> ReilInstruction {
    ReilInstruction::new(
        reil_address(native, index),
        opcode,
        ReilOperand::empty(),
        ReilOperand::empty(),
        ReilOperand::empty(),
    )
}

/// Straight line of single micro-instruction native instructions at native
/// addresses 1, 2, ...
pub fn chain(opcodes: &[Opcode]) -> (ReilInstructionGraph, Vec<NodeIndex>, Vec<EdgeIndex>) {
    let mut graph = ReilInstructionGraph::new();

    let nodes = opcodes
        .iter()
        .enumerate()
        .map(|(i, opcode)| graph.add_instruction(instruction(i as u64 + 1, 0, opcode.clone())))
        .collect::<Vec<_>>();

    let edges = nodes
        .windows(2)
        .map(|pair| graph.add_edge(pair[0], pair[1], true))
        .collect::<Vec<_>>();

    (graph, nodes, edges)
}

/// Graph from REIL listing lines, wired with `(source, destination, is_true)`
/// line indices.
pub fn listing(
    lines: &[&str],
    edges: &[(usize, usize, bool)],
) -> (ReilInstructionGraph, Vec<NodeIndex>) {
    let mut graph = ReilInstructionGraph::new();

    let nodes = lines
        .iter()
        .map(|line| {
            let instruction = line
                .parse::<ReilInstruction>()
                .unwrap_or_else(|e| panic!("can not parse \"{}\": {}", line, e));

            graph.add_instruction(instruction)
        })
        .collect::<Vec<_>>();

    for (source, destination, is_true) in edges {
        graph.add_edge(nodes[*source], nodes[*destination], *is_true);
    }

    (graph, nodes)
}
