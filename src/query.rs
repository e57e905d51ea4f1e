/*!
# Path Query Engine

The evaluation pipeline for path descriptions:

1. a [`PathDescription`] (built by a frontend or via [`DescriptionBuilder`])
   is compiled into an [`Nfa`] whose transitions consume graph incidences;
2. the NFA is determinized into a [`Dfa`] via the subset construction;
3. the DFA is executed against a data graph by the [`walk`] routines,
   recording traversal history into a
   [`PathSystem`](crate::path::PathSystem) or
   [`Slice`](crate::path::Slice).
*/

pub mod ast;
pub mod dfa;
pub mod nfa;
pub mod transition;
pub mod walk;

// Re-exports
pub use ast::{DescriptionBuilder, EdgeStep, ElementPredicate, PathDescription};
pub use dfa::{Dfa, DfaTransition};
pub use nfa::{ConstructionError, Nfa};
pub use transition::TransitionLabel;
