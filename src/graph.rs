/*!
# Incidence Graphs

Defines the read-only graph interface the query evaluator runs against,
together with the small value types shared between the automaton and the
path-system layers.

The data model is incidence-centric: an [`Incidence`] is a directed
connection between a vertex and an edge (never vertex-to-vertex), so a path
through the graph alternates vertex and edge [`Element`]s. Traversal
direction is judged per incidence: stepping over an incidence along its own
orientation is an *out* step, stepping against it is an *in* step.

The evaluator only ever reads the graph. Anything implementing
[`IncidenceGraph`] can be queried; [`MemoryGraph`] is the bundled in-memory
implementation used by the tests and benchmarks.
*/
use std::collections::BTreeSet;
use std::fmt::Display;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

pub mod memory;

pub use memory::MemoryGraph;

/// Identifier of a vertex within a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexId(pub usize);

/// Identifier of an edge within a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub usize);

/// Identifier of an incidence within a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IncidenceId(pub usize);

/// Identifier of an element type (vertex types and edge types share one
/// registry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub usize);

/// A graph element: either a vertex or an edge. Paths through an incidence
/// graph alternate between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Element {
    Vertex(VertexId),
    Edge(EdgeId),
}

impl Element {
    #[must_use]
    pub const fn is_vertex(self) -> bool {
        matches!(self, Self::Vertex(_))
    }

    #[must_use]
    pub const fn is_edge(self) -> bool {
        matches!(self, Self::Edge(_))
    }
}

impl Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vertex(VertexId(id)) => write!(f, "v{id}"),
            Self::Edge(EdgeId(id)) => write!(f, "e{id}"),
        }
    }
}

/// Orientation of an incidence: every incidence points either from its
/// vertex into its edge, or from its edge out to its vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IncidenceDirection {
    VertexToEdge,
    EdgeToVertex,
}

/// Query-side traversal direction. A step from element `x` over an
/// incidence is `Out` when `x` is the incidence's tail (the step runs along
/// the incidence's own orientation) and `In` when `x` is its head. `Any`
/// admits both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    In,
    Out,
    Any,
}

impl Direction {
    /// The direction matched after reversing the traversal, used when an
    /// automaton is transposed.
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::In => Self::Out,
            Self::Out => Self::In,
            Self::Any => Self::Any,
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::In => write!(f, "in"),
            Self::Out => write!(f, "out"),
            Self::Any => write!(f, "any"),
        }
    }
}

/// Whether an aggregation incidence models shared or composite (exclusive)
/// ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AggregationKind {
    Shared,
    Composite,
}

/// A directed connection between one vertex and one edge.
///
/// Incidences carry their endpoints so that consumers (notably
/// [`HyperPath`](crate::path::HyperPath)) can validate connectivity without
/// holding a graph reference. Role names are shared behind `Rc` because the
/// same incidence value is stored in both endpoint adjacency lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Incidence {
    pub id: IncidenceId,
    pub vertex: VertexId,
    pub edge: EdgeId,
    pub direction: IncidenceDirection,
    pub role: Option<Rc<str>>,
    pub aggregation: Option<AggregationKind>,
}

impl Incidence {
    /// The element the incidence points away from.
    #[must_use]
    pub const fn tail(&self) -> Element {
        match self.direction {
            IncidenceDirection::VertexToEdge => Element::Vertex(self.vertex),
            IncidenceDirection::EdgeToVertex => Element::Edge(self.edge),
        }
    }

    /// The element the incidence points at.
    #[must_use]
    pub const fn head(&self) -> Element {
        match self.direction {
            IncidenceDirection::VertexToEdge => Element::Edge(self.edge),
            IncidenceDirection::EdgeToVertex => Element::Vertex(self.vertex),
        }
    }

    /// Whether `element` is one of the incidence's two endpoints.
    #[must_use]
    pub fn connects(&self, element: Element) -> bool {
        element == Element::Vertex(self.vertex) || element == Element::Edge(self.edge)
    }

    /// The endpoint opposite to `from`, or `None` if `from` is not an
    /// endpoint of this incidence.
    #[must_use]
    pub fn other_end(&self, from: Element) -> Option<Element> {
        match from {
            Element::Vertex(v) if v == self.vertex => Some(Element::Edge(self.edge)),
            Element::Edge(e) if e == self.edge => Some(Element::Vertex(self.vertex)),
            _ => None,
        }
    }
}

impl Display for Incidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let arrow = match self.direction {
            IncidenceDirection::VertexToEdge => "->",
            IncidenceDirection::EdgeToVertex => "<-",
        };
        write!(f, "i{} (v{} {arrow} e{}", self.id.0, self.vertex.0, self.edge.0)?;
        if let Some(role) = &self.role {
            write!(f, " @{role}")?;
        }
        write!(f, ")")
    }
}

/// Set of accepted incidence role names.
pub type RoleSet = BTreeSet<Rc<str>>;

/// Set of allowed element types.
pub type TypeSet = BTreeSet<TypeId>;

/// Precomputed element result set of a sub-expression.
pub type ElementSet = BTreeSet<Element>;

/// Read-only view of an attributed incidence graph.
///
/// This is the seam between the evaluator and whatever storage actually
/// holds the graph: the walk only needs each element's incidences and its
/// type. The graph must not change while an evaluation runs.
pub trait IncidenceGraph {
    /// All incidences attached to `element`, in stable order.
    fn incidences(&self, element: Element) -> &[Incidence];

    /// The type of `element`.
    fn element_type(&self, element: Element) -> TypeId;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incidence(direction: IncidenceDirection) -> Incidence {
        Incidence {
            id: IncidenceId(0),
            vertex: VertexId(1),
            edge: EdgeId(2),
            direction,
            role: None,
            aggregation: None,
        }
    }

    #[test]
    fn vertex_to_edge_endpoints() {
        let inc = incidence(IncidenceDirection::VertexToEdge);
        assert_eq!(inc.tail(), Element::Vertex(VertexId(1)));
        assert_eq!(inc.head(), Element::Edge(EdgeId(2)));
    }

    #[test]
    fn edge_to_vertex_endpoints() {
        let inc = incidence(IncidenceDirection::EdgeToVertex);
        assert_eq!(inc.tail(), Element::Edge(EdgeId(2)));
        assert_eq!(inc.head(), Element::Vertex(VertexId(1)));
    }

    #[test]
    fn other_end_requires_endpoint() {
        let inc = incidence(IncidenceDirection::VertexToEdge);
        assert_eq!(
            inc.other_end(Element::Vertex(VertexId(1))),
            Some(Element::Edge(EdgeId(2)))
        );
        assert_eq!(
            inc.other_end(Element::Edge(EdgeId(2))),
            Some(Element::Vertex(VertexId(1)))
        );
        assert_eq!(inc.other_end(Element::Vertex(VertexId(9))), None);
    }

    #[test]
    fn direction_reversal_is_involutive() {
        for dir in [Direction::In, Direction::Out, Direction::Any] {
            assert_eq!(dir.reversed().reversed(), dir);
        }
    }
}
