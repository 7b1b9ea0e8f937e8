use super::{
    AnalysisDirection, InstructionGraph, Lattice, LatticeElement, SolverError, SolverResult,
    TransformationProvider,
};
use log::{debug, trace, warn};
use std::collections::{HashMap, HashSet, VecDeque};

/// Worklist based fixed point engine.
///
/// A solver is set up for one graph, direction and lattice and is consumed
/// by `solve`.
pub struct MonotoneSolver<'a, G, L>
where
    G: InstructionGraph,
    L: Lattice,
{
    graph: &'a G,
    direction: AnalysisDirection,
    lattice: &'a L,
    bottom: L::Element,
    states: HashMap<G::Edge, L::Element>,
    worklist: VecDeque<G::Node>,
    traversed: HashSet<G::Edge>,
}

impl<'a, G, L> MonotoneSolver<'a, G, L>
where
    G: InstructionGraph,
    L: Lattice,
{
    pub fn new(graph: &'a G, direction: AnalysisDirection, lattice: &'a L) -> Self {
        Self {
            graph,
            direction,
            lattice,
            bottom: lattice.minimal_element(),
            states: HashMap::new(),
            worklist: VecDeque::new(),
            traversed: HashSet::new(),
        }
    }

    /// Installs the seed states and propagates until the worklist runs dry.
    ///
    /// Every visit of a node uses up one of `maximum_iteration` iterations
    /// and the run is aborted once none are left, so at most
    /// `maximum_iteration - 1` nodes are visited. Running out means the
    /// lattice has no finite height or the transfer function is not monotone
    /// and is reported as `SolverError::IterationLimitReached`.
    pub fn solve<P, I>(
        mut self,
        provider: &P,
        initial_states: I,
        maximum_iteration: u64,
    ) -> Result<SolverResult<'a, G, L>, SolverError>
    where
        P: TransformationProvider<G, L::Element>,
        I: IntoIterator<Item = (G::Edge, L::Element)>,
    {
        if maximum_iteration == 0 {
            return Err(SolverError::InvalidIterationLimit);
        }

        let direction: &'static str = self.direction.into();

        debug!(
            "solving {} analysis on graph with {} edges",
            direction,
            self.graph.size()
        );

        for (edge, state) in initial_states {
            self.set_state(edge, state);
        }

        debug!(
            "seeded {} edges, {} nodes pending",
            self.states.len(),
            self.worklist.len()
        );

        let iterations = time_debug!("propagated states", {
            self.propagate(provider, maximum_iteration)
        })?;

        debug!("reached fixed point after {} iterations", iterations);

        Ok(SolverResult::new(
            self.graph,
            self.direction,
            self.lattice,
            self.states,
            self.traversed,
            iterations,
        ))
    }

    fn propagate<P>(&mut self, provider: &P, maximum_iteration: u64) -> Result<u64, SolverError>
    where
        P: TransformationProvider<G, L::Element>,
    {
        let mut remaining = maximum_iteration;

        while let Some(node) = self.worklist.pop_front() {
            remaining -= 1;

            if remaining == 0 {
                warn!(
                    "giving up after {} iterations, {} nodes still pending",
                    maximum_iteration,
                    self.worklist.len() + 1
                );

                return Err(SolverError::IterationLimitReached(maximum_iteration));
            }

            trace!("visit {:?}: {}", node, self.graph.instruction(node));

            let state = self.combined_state(node);

            let (on_true, on_false) = provider.transform(self.graph, node, &state);

            match self.direction {
                AnalysisDirection::Down => {
                    for edge in self.graph.outgoing_edges(node) {
                        if self.graph.is_true(edge) {
                            self.set_state(edge, on_true.clone());
                        } else if let Some(on_false) = &on_false {
                            self.set_state(edge, on_false.clone());
                        }
                    }
                }
                AnalysisDirection::Up => {
                    // there is no branch split when walking backwards
                    for edge in self.graph.incoming_edges(node) {
                        self.set_state(edge, on_true.clone());
                    }
                }
            }
        }

        Ok(maximum_iteration - remaining)
    }

    /// Join of all states that reached the node so far.
    fn combined_state(&self, node: G::Node) -> L::Element {
        let edges = match self.direction {
            AnalysisDirection::Down => self.graph.incoming_edges(node),
            AnalysisDirection::Up => self.graph.outgoing_edges(node),
        };

        let states = edges
            .iter()
            .filter_map(|edge| self.states.get(edge))
            .collect::<Vec<_>>();

        self.lattice.combine(&states)
    }

    fn set_state(&mut self, edge: G::Edge, mut state: L::Element) {
        if self.graph.is_instruction_exit(edge) {
            state.on_instruction_exit();
        }

        let next = match self.states.get(&edge) {
            Some(stored) if self.lattice.is_smaller_equal(&state, stored) => return,
            Some(stored) => self.lattice.combine(&[&state, stored]),
            None => state,
        };

        let informative = !self.lattice.is_smaller_equal(&next, &self.bottom);

        self.states.insert(edge, next);
        self.traversed.insert(edge);

        if informative {
            let node = match self.direction {
                AnalysisDirection::Down => self.graph.destination(edge),
                AnalysisDirection::Up => self.graph.source(edge),
            };

            trace!("{:?} changed, enqueue {:?}", edge, node);

            self.worklist.push_back(node);
        }
    }
}
