/*!
# Traversal Histories

The result side of a query evaluation: while the automaton walks the data
graph, every visit of a graph element in an automaton state is recorded as
an entry keyed by that (element, state) pair. [`PathSystem`] keeps the best
entry per key under a single root, [`Slice`] keeps every entry under a set
of criterion roots, and [`HyperPath`] is the materialized path extracted
from a finished history.
*/
use std::fmt::{self, Display};

use crate::graph::{Element, Incidence};

pub mod hyper;
pub mod slice;
pub mod system;

pub use hyper::{HyperPath, HyperPathError};
pub use slice::Slice;
pub use system::PathSystem;

/// Identifies one visit: this element was reached while the automaton was
/// in this state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathSystemKey {
    pub element: Element,
    pub state_number: usize,
}

impl Display for PathSystemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, state {})", self.element, self.state_number)
    }
}

/// How a visit was reached: the previous element on the path, the incidence
/// that was consumed to get here (absent for same-element re-keyings), and
/// the automaton state the parent was visited in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentLink {
    pub element: Element,
    pub incidence: Option<Incidence>,
    pub state_number: usize,
}

impl ParentLink {
    /// The key of the parent visit.
    #[must_use]
    pub const fn key(&self) -> PathSystemKey {
        PathSystemKey {
            element: self.element,
            state_number: self.state_number,
        }
    }
}

/// One recorded visit. Root entries have no parent link.
#[derive(Debug, Clone)]
pub struct PathSystemEntry {
    pub parent: Option<ParentLink>,
    pub distance_to_root: usize,
    pub state_is_final: bool,
}

/// Contract violations and lookup failures of the history stores.
///
/// State errors (`Finished`, `Unfinished`, `RootAlreadySet`) signal illegal
/// API sequencing and are not recoverable; plain lookup misses never raise
/// an error and yield empty results instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSystemError {
    /// Mutation attempted after `finish()`.
    Finished,
    /// Query attempted before `finish()`.
    Unfinished,
    /// `set_root_element` called twice.
    RootAlreadySet,
    /// A parentless entry was added for an element that is not the root
    /// (or not a slicing criterion).
    Detached(PathSystemKey),
    /// An entry's parent key never materialized.
    UnresolvedParent(PathSystemKey),
    /// A parent chain does not form a connected path back to the root.
    InvalidParentChain(PathSystemKey),
}

impl std::error::Error for PathSystemError {}

impl Display for PathSystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finished => write!(f, "path system is already finished"),
            Self::Unfinished => write!(f, "path system has not been finished yet"),
            Self::RootAlreadySet => write!(f, "root element is already declared"),
            Self::Detached(key) => {
                write!(f, "entry {key} has no parent and is not a root")
            }
            Self::UnresolvedParent(key) => {
                write!(f, "no entry recorded for parent key {key}")
            }
            Self::InvalidParentChain(key) => {
                write!(f, "parent chain starting at {key} is not connected")
            }
        }
    }
}
