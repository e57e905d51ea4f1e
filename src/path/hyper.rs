/*!
# Hyper Paths

A [`HyperPath`] is a concrete, materialized path through an incidence
graph: an alternating sequence of elements connected by incidences. Paths
are only ever produced by extraction from a finished
[`PathSystem`](crate::path::PathSystem) — the sole way to build one by hand
is the single-element [`HyperPath::start`] path extended with
[`HyperPath::append`].
*/
use std::collections::HashSet;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::graph::{Direction, EdgeId, Element, Incidence, IncidenceId, VertexId};

/// Errors raised when assembling a hyper path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HyperPathError {
    /// The appended incidence does not attach to the path's current end
    /// element.
    NotConnected {
        end: Element,
        incidence: IncidenceId,
    },
}

impl std::error::Error for HyperPathError {}

impl Display for HyperPathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected { end, incidence } => {
                write!(f, "incidence i{} does not attach to path end {end}", incidence.0)
            }
        }
    }
}

/// An ordered pair of sequences: `n + 1` elements and the `n` incidences
/// connecting them; `incidences[i]` joins `elements[i]` and
/// `elements[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HyperPath {
    elements: Vec<Element>,
    incidences: Vec<Incidence>,
}

impl HyperPath {
    /// The path containing only `element` and no incidences.
    #[must_use]
    pub fn start(element: Element) -> Self {
        Self {
            elements: vec![element],
            incidences: Vec::new(),
        }
    }

    /// Extends the path over `incidence`, which must attach to the current
    /// end element; the new end is the incidence's other endpoint.
    pub fn append(&mut self, incidence: Incidence) -> Result<(), HyperPathError> {
        let end = self.last_element();
        match incidence.other_end(end) {
            Some(next) => {
                self.incidences.push(incidence);
                self.elements.push(next);
                Ok(())
            }
            None => Err(HyperPathError::NotConnected {
                end,
                incidence: incidence.id,
            }),
        }
    }

    /// Builds a path from pre-collected parts, validating the alternation
    /// invariant.
    pub(crate) fn from_parts(
        elements: Vec<Element>,
        incidences: Vec<Incidence>,
    ) -> Result<Self, HyperPathError> {
        debug_assert_eq!(elements.len(), incidences.len() + 1);
        let mut path = Self::start(elements[0]);
        for incidence in incidences {
            path.append(incidence)?;
        }
        debug_assert_eq!(path.elements, elements);
        Ok(path)
    }

    /// Number of incidences in the path.
    #[must_use]
    pub fn length(&self) -> usize {
        self.incidences.len()
    }

    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    #[must_use]
    pub fn incidences(&self) -> &[Incidence] {
        &self.incidences
    }

    /// The element the path starts at.
    ///
    /// # Panics
    /// Never panics; a path always holds at least one element.
    #[must_use]
    pub fn first_element(&self) -> Element {
        self.elements[0]
    }

    /// The element the path ends at.
    #[must_use]
    pub fn last_element(&self) -> Element {
        self.elements[self.elements.len() - 1]
    }

    /// The same path traversed end-to-start.
    #[must_use]
    pub fn reverse(&self) -> Self {
        Self {
            elements: self.elements.iter().rev().copied().collect(),
            incidences: self.incidences.iter().rev().cloned().collect(),
        }
    }

    /// Whether no element occurs twice.
    #[must_use]
    pub fn is_trail(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.elements.len());
        self.elements.iter().all(|e| seen.insert(*e))
    }

    /// Number of incidences of the path attached to `element` in the given
    /// direction (`Any` counts all of them).
    #[must_use]
    pub fn degree(&self, element: Element, direction: Direction) -> usize {
        self.incidences
            .iter()
            .filter(|inc| {
                inc.connects(element)
                    && match direction {
                        Direction::Any => true,
                        Direction::Out => inc.tail() == element,
                        Direction::In => inc.head() == element,
                    }
            })
            .count()
    }

    #[must_use]
    pub fn contains_element(&self, element: Element) -> bool {
        self.elements.contains(&element)
    }

    #[must_use]
    pub fn contains_vertex(&self, vertex: VertexId) -> bool {
        self.contains_element(Element::Vertex(vertex))
    }

    #[must_use]
    pub fn contains_edge(&self, edge: EdgeId) -> bool {
        self.contains_element(Element::Edge(edge))
    }

    #[must_use]
    pub fn contains_incidence(&self, incidence: IncidenceId) -> bool {
        self.incidences.iter().any(|inc| inc.id == incidence)
    }
}

impl Display for HyperPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                write!(f, " -[i{}]- ", self.incidences[i - 1].id.0)?;
            }
            write!(f, "{element}")?;
        }
        Ok(())
    }
}
