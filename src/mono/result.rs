use super::{AnalysisDirection, InstructionGraph, Lattice};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Fixed point of a solver run.
///
/// Holds the final state of every edge the solver wrote, seeds included.
/// Edges that never received a state have no result.
pub struct SolverResult<'a, G, L>
where
    G: InstructionGraph,
    L: Lattice,
{
    graph: &'a G,
    direction: AnalysisDirection,
    lattice: &'a L,
    states: HashMap<G::Edge, L::Element>,
    traversed: HashSet<G::Edge>,
    iterations: u64,
}

impl<'a, G, L> SolverResult<'a, G, L>
where
    G: InstructionGraph,
    L: Lattice,
{
    pub(crate) fn new(
        graph: &'a G,
        direction: AnalysisDirection,
        lattice: &'a L,
        states: HashMap<G::Edge, L::Element>,
        traversed: HashSet<G::Edge>,
        iterations: u64,
    ) -> Self {
        Self {
            graph,
            direction,
            lattice,
            states,
            traversed,
            iterations,
        }
    }

    /// True if a seed or propagation wrote a state to the edge.
    pub fn has_result(&self, edge: G::Edge) -> bool {
        self.traversed.contains(&edge)
    }

    /// Final state of the edge.
    pub fn result(&self, edge: G::Edge) -> Option<&L::Element> {
        self.states.get(&edge)
    }

    /// All written edges together with their final state.
    pub fn results(&self) -> impl Iterator<Item = (G::Edge, &L::Element)> + '_ {
        self.states
            .iter()
            .filter(move |(edge, _)| self.traversed.contains(*edge))
            .map(|(edge, state)| (*edge, state))
    }

    pub fn direction(&self) -> AnalysisDirection {
        self.direction
    }

    /// Number of node visits it took to reach the fixed point.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Collapses edge states to native instruction granularity.
    ///
    /// Only instruction exit edges contribute. An edge is keyed by the native
    /// instruction it leaves when walking down and by the one it enters when
    /// walking up; edges sharing a key are joined. Exit edges at
    /// `start_address` on the side the analysis started from always
    /// contribute their stored state.
    pub fn generate_address_to_state_mapping(
        &self,
        start_address: u64,
        track_incoming: bool,
    ) -> BTreeMap<u64, L::Element> {
        let mut mapping: BTreeMap<u64, L::Element> = BTreeMap::new();

        for edge in self.graph.edges() {
            if !self.graph.is_instruction_exit(edge) {
                continue;
            }

            let address = self.key_address(edge);

            let included = self.has_result(edge)
                || self.is_start_edge(address, start_address, track_incoming);

            let state = match self.states.get(&edge) {
                Some(state) if included => state,
                _ => continue,
            };

            let merged = match mapping.remove(&address) {
                Some(existing) => self.lattice.combine(&[&existing, state]),
                None => state.clone(),
            };

            mapping.insert(address, merged);
        }

        mapping
    }

    fn key_address(&self, edge: G::Edge) -> u64 {
        let node = match self.direction {
            AnalysisDirection::Down => self.graph.source(edge),
            AnalysisDirection::Up => self.graph.destination(edge),
        };

        self.graph.instruction(node).native_address()
    }

    fn is_start_edge(&self, address: u64, start_address: u64, track_incoming: bool) -> bool {
        address == start_address
            && match self.direction {
                AnalysisDirection::Down => !track_incoming,
                AnalysisDirection::Up => track_incoming,
            }
    }
}
