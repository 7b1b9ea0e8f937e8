//! # Monotone dataflow framework
//!
//! A maximal fixed point (MFP) solver over REIL instruction graphs. An
//! analysis is described by a `Lattice` of abstract values and a
//! `TransformationProvider`; the solver propagates values along the edges of
//! an `InstructionGraph` until no edge can grow any further.

pub mod graph;
pub mod lattice;
pub mod result;
pub mod solver;
pub mod transformation;

pub use self::{graph::*, lattice::*, result::*, solver::*, transformation::*};

use strum::{EnumString, EnumVariantNames, IntoStaticStr};
use thiserror::Error;

/// Direction in which values flow through the instruction graph.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, EnumString, EnumVariantNames, IntoStaticStr)]
#[strum(serialize_all = "kebab_case", ascii_case_insensitive)]
pub enum AnalysisDirection {
    /// Forward, from sources towards destinations.
    Down,
    /// Backward, from destinations towards sources.
    Up,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SolverError {
    #[error("maximum iteration count has to be positive")]
    InvalidIterationLimit,

    #[error("did not reach a fixed point within {0} iterations")]
    IterationLimitReached(u64),
}
