//! # Register tracking
//!
//! Follows how the value of one register spreads through (DOWN) or was
//! assembled from (UP) other registers, starting at a native instruction.
//! Function calls can be configured to clobber all or a given set of
//! registers.

mod lattice;
mod transformation;

pub use self::{lattice::*, transformation::*};

use crate::mono::{AnalysisDirection, MonotoneSolver, ReilInstructionGraph, SolverResult};
use anyhow::{ensure, Context, Result};
use log::debug;
use std::collections::BTreeSet;

pub mod defaults {
    use super::*;

    pub const CLEARS_ALL_REGISTERS: bool = true;
    pub const TRACK_INCOMING: bool = false;
    pub const DIRECTION: AnalysisDirection = AnalysisDirection::Down;
    pub const MAXIMUM_ITERATIONS: u64 = 1_000_000;
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RegisterTrackingOptions {
    /// Calls untaint every tainted register.
    pub clears_all_registers: bool,
    /// Registers untainted by calls unless `clears_all_registers` is set.
    pub cleared_registers: BTreeSet<String>,
    /// Seed the edges entering the start instruction instead of the ones
    /// leaving it.
    pub track_incoming: bool,
    pub direction: AnalysisDirection,
    pub maximum_iterations: u64,
}

impl Default for RegisterTrackingOptions {
    fn default() -> Self {
        Self {
            clears_all_registers: defaults::CLEARS_ALL_REGISTERS,
            cleared_registers: BTreeSet::new(),
            track_incoming: defaults::TRACK_INCOMING,
            direction: defaults::DIRECTION,
            maximum_iterations: defaults::MAXIMUM_ITERATIONS,
        }
    }
}

pub type RegisterTrackingResult<'a> = SolverResult<'a, ReilInstructionGraph, RegisterSetLattice>;

/// Tracks `register` starting at the native instruction at `start_address`.
///
/// Use `generate_address_to_state_mapping(start_address,
/// options.track_incoming)` on the result to get the state per native
/// instruction.
pub fn track<'a>(
    graph: &'a ReilInstructionGraph,
    start_address: u64,
    register: &str,
    options: &RegisterTrackingOptions,
) -> Result<RegisterTrackingResult<'a>> {
    let seeds = if options.track_incoming {
        graph.incoming_edges_for_address(start_address)
    } else {
        graph.outgoing_edges_for_address(start_address)
    };

    ensure!(
        !seeds.is_empty(),
        "no {} edges for native instruction at {:#x}",
        if options.track_incoming { "incoming" } else { "outgoing" },
        start_address
    );

    debug!(
        "tracking {} from {:#x} over {} seed edges",
        register,
        start_address,
        seeds.len()
    );

    let lattice: &'static RegisterSetLattice = &RegisterSetLattice;
    let provider = RegisterTrackingTransformationProvider::new(options);

    let initial_states = seeds
        .into_iter()
        .map(|edge| (edge, RegisterSet::new_tainted(register)));

    time_info!("tracked register", {
        MonotoneSolver::new(graph, options.direction, lattice).solve(
            &provider,
            initial_states,
            options.maximum_iterations,
        )
    })
    .with_context(|| {
        format!(
            "failed to track register {} from {:#x}",
            register, start_address
        )
    })
}
