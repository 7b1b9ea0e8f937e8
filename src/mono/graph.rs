//! # Instruction graphs
//!
//! The solver works on graphs whose nodes are single REIL
//! micro-instructions. Every edge carries two facets:
//! - `is_true`: the edge is taken when a conditional jump is taken (all
//!   unconditional edges are true edges)
//! - `is_instruction_exit`: the edge leaves one native instruction and enters
//!   the next one

use crate::reil::{starts_native_instruction, ReilInstruction};
use petgraph::{
    dot::Dot,
    graph::{EdgeIndex, NodeIndex},
    visit::EdgeRef,
    Direction,
};
use std::{fmt, hash::Hash};

/// Read-only view of an instruction graph. The solver never mutates the
/// graph; node and edge handles are cheap copies.
pub trait InstructionGraph {
    type Node: Copy + fmt::Debug + Eq + Hash;
    type Edge: Copy + fmt::Debug + Eq + Hash;

    fn incoming_edges(&self, node: Self::Node) -> Vec<Self::Edge>;

    fn outgoing_edges(&self, node: Self::Node) -> Vec<Self::Edge>;

    fn source(&self, edge: Self::Edge) -> Self::Node;

    fn destination(&self, edge: Self::Edge) -> Self::Node;

    fn edges(&self) -> Vec<Self::Edge>;

    /// Number of edges.
    fn size(&self) -> usize;

    fn is_true(&self, edge: Self::Edge) -> bool;

    fn is_instruction_exit(&self, edge: Self::Edge) -> bool;

    fn instruction(&self, node: Self::Node) -> &ReilInstruction;
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct InstructionEdge {
    pub is_true: bool,
    pub is_instruction_exit: bool,
}

impl fmt::Display for InstructionEdge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", if self.is_true { "true" } else { "false" })?;

        if self.is_instruction_exit {
            write!(f, " (exit)")?;
        }

        Ok(())
    }
}

pub type Graph = petgraph::Graph<ReilInstruction, InstructionEdge>;

#[derive(Clone, Debug, Default)]
pub struct ReilInstructionGraph {
    graph: Graph,
}

impl ReilInstructionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_instruction(&mut self, instruction: ReilInstruction) -> NodeIndex {
        self.graph.add_node(instruction)
    }

    /// Adds an edge and marks it as instruction exit if its destination is
    /// the first micro-instruction of a native instruction.
    pub fn add_edge(
        &mut self,
        source: NodeIndex,
        destination: NodeIndex,
        is_true: bool,
    ) -> EdgeIndex {
        let is_instruction_exit = starts_native_instruction(self.graph[destination].address());

        self.add_edge_with(source, destination, is_true, is_instruction_exit)
    }

    pub fn add_edge_with(
        &mut self,
        source: NodeIndex,
        destination: NodeIndex,
        is_true: bool,
        is_instruction_exit: bool,
    ) -> EdgeIndex {
        self.graph.add_edge(
            source,
            destination,
            InstructionEdge {
                is_true,
                is_instruction_exit,
            },
        )
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// All edges whose destination belongs to the native instruction.
    pub fn incoming_edges_for_address(&self, native_address: u64) -> Vec<EdgeIndex> {
        self.graph
            .edge_references()
            .filter(|e| self.graph[e.target()].native_address() == native_address)
            .map(|e| e.id())
            .collect()
    }

    /// All instruction exit edges leaving the native instruction.
    pub fn outgoing_edges_for_address(&self, native_address: u64) -> Vec<EdgeIndex> {
        self.graph
            .edge_references()
            .filter(|e| {
                e.weight().is_instruction_exit
                    && self.graph[e.source()].native_address() == native_address
            })
            .map(|e| e.id())
            .collect()
    }

    fn edges_directed(&self, node: NodeIndex, direction: Direction) -> Vec<EdgeIndex> {
        self.graph
            .edges_directed(node, direction)
            .map(|e| e.id())
            .collect()
    }

    fn facets(&self, edge: EdgeIndex) -> &InstructionEdge {
        &self.graph.raw_edges()[edge.index()].weight
    }
}

impl InstructionGraph for ReilInstructionGraph {
    type Node = NodeIndex;
    type Edge = EdgeIndex;

    fn incoming_edges(&self, node: NodeIndex) -> Vec<EdgeIndex> {
        self.edges_directed(node, Direction::Incoming)
    }

    fn outgoing_edges(&self, node: NodeIndex) -> Vec<EdgeIndex> {
        self.edges_directed(node, Direction::Outgoing)
    }

    fn source(&self, edge: EdgeIndex) -> NodeIndex {
        self.graph.raw_edges()[edge.index()].source()
    }

    fn destination(&self, edge: EdgeIndex) -> NodeIndex {
        self.graph.raw_edges()[edge.index()].target()
    }

    fn edges(&self) -> Vec<EdgeIndex> {
        self.graph.edge_indices().collect()
    }

    fn size(&self) -> usize {
        self.graph.edge_count()
    }

    fn is_true(&self, edge: EdgeIndex) -> bool {
        self.facets(edge).is_true
    }

    fn is_instruction_exit(&self, edge: EdgeIndex) -> bool {
        self.facets(edge).is_instruction_exit
    }

    fn instruction(&self, node: NodeIndex) -> &ReilInstruction {
        &self.graph[node]
    }
}

impl fmt::Display for ReilInstructionGraph {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", Dot::with_config(&self.graph, &[]))
    }
}
