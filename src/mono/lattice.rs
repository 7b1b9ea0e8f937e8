use std::fmt::Debug;

/// Abstract value attached to an edge of an instruction graph.
///
/// `Clone` is the independent copy the solver hands to every edge it updates;
/// elements stored for different edges never share state.
pub trait LatticeElement: Clone + Debug {
    /// Invoked once on a candidate element before it is stored on an edge
    /// that leaves a native instruction. Used to drop state that must not
    /// outlive the instruction, e.g. REIL temporaries.
    fn on_instruction_exit(&mut self);
}

/// Partially ordered domain with a join.
///
/// The solver terminates only if every chain reachable from the seed states
/// has finite height and `combine` is a proper join, that is idempotent,
/// commutative, associative and `combine(&[x]) == x`.
pub trait Lattice {
    type Element: LatticeElement;

    /// Partial order test `lhs ⊑ rhs`.
    fn is_smaller_equal(&self, lhs: &Self::Element, rhs: &Self::Element) -> bool;

    /// Least upper bound of all elements. Joining an empty list yields
    /// `minimal_element`.
    fn combine(&self, elements: &[&Self::Element]) -> Self::Element;

    /// The bottom element.
    fn minimal_element(&self) -> Self::Element;
}
