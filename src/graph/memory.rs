/*!
# In-Memory Graphs

A straightforward adjacency-list implementation of [`IncidenceGraph`], used
by the tests and benchmarks and as the reference structure for embedding the
evaluator without a dedicated storage layer.

Every edge materializes two incidences: the alpha incidence runs from the
start vertex into the edge, the omega incidence from the edge out to the end
vertex. Both are stored in the adjacency lists of both endpoints, so walking
`vertex -> edge -> vertex` and the reverse never needs an index lookup.
*/
use std::rc::Rc;

use crate::graph::{
    AggregationKind, EdgeId, Element, Incidence, IncidenceDirection, IncidenceGraph, IncidenceId,
    TypeId, VertexId,
};

/// Mutable in-memory incidence graph with a shared type registry.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    type_names: Vec<String>,
    vertex_types: Vec<TypeId>,
    edge_types: Vec<TypeId>,
    vertex_incidences: Vec<Vec<Incidence>>,
    edge_incidences: Vec<Vec<Incidence>>,
    incidence_count: usize,
}

impl MemoryGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a type name, returning the existing id if the name is
    /// already known.
    pub fn add_type(&mut self, name: &str) -> TypeId {
        if let Some(pos) = self.type_names.iter().position(|n| n == name) {
            return TypeId(pos);
        }
        self.type_names.push(name.to_string());
        TypeId(self.type_names.len() - 1)
    }

    /// The registered name of a type id, if any.
    #[must_use]
    pub fn type_name(&self, ty: TypeId) -> Option<&str> {
        self.type_names.get(ty.0).map(String::as_str)
    }

    pub fn add_vertex(&mut self, ty: TypeId) -> VertexId {
        self.vertex_types.push(ty);
        self.vertex_incidences.push(Vec::new());
        VertexId(self.vertex_types.len() - 1)
    }

    /// Adds a directed edge from `alpha` to `omega` with unnamed roles.
    pub fn add_edge(&mut self, ty: TypeId, alpha: VertexId, omega: VertexId) -> EdgeId {
        self.insert_edge(ty, alpha, omega, None, None, None)
    }

    /// Adds a directed edge whose alpha-side and omega-side incidences carry
    /// the given role names.
    pub fn add_edge_with_roles(
        &mut self,
        ty: TypeId,
        alpha: VertexId,
        omega: VertexId,
        alpha_role: Option<&str>,
        omega_role: Option<&str>,
    ) -> EdgeId {
        self.insert_edge(ty, alpha, omega, alpha_role, omega_role, None)
    }

    /// Adds an aggregation edge from `part` to `whole`; the whole-side
    /// (omega) incidence is marked with the aggregation kind.
    pub fn add_aggregation(
        &mut self,
        ty: TypeId,
        part: VertexId,
        whole: VertexId,
        kind: AggregationKind,
    ) -> EdgeId {
        self.insert_edge(ty, part, whole, None, None, Some(kind))
    }

    fn insert_edge(
        &mut self,
        ty: TypeId,
        alpha: VertexId,
        omega: VertexId,
        alpha_role: Option<&str>,
        omega_role: Option<&str>,
        aggregation: Option<AggregationKind>,
    ) -> EdgeId {
        let edge = EdgeId(self.edge_types.len());
        self.edge_types.push(ty);
        self.edge_incidences.push(Vec::new());

        let alpha_inc = Incidence {
            id: IncidenceId(self.incidence_count),
            vertex: alpha,
            edge,
            direction: IncidenceDirection::VertexToEdge,
            role: alpha_role.map(Rc::from),
            aggregation: None,
        };
        let omega_inc = Incidence {
            id: IncidenceId(self.incidence_count + 1),
            vertex: omega,
            edge,
            direction: IncidenceDirection::EdgeToVertex,
            role: omega_role.map(Rc::from),
            aggregation,
        };
        self.incidence_count += 2;

        self.vertex_incidences[alpha.0].push(alpha_inc.clone());
        self.vertex_incidences[omega.0].push(omega_inc.clone());
        self.edge_incidences[edge.0].push(alpha_inc);
        self.edge_incidences[edge.0].push(omega_inc);
        edge
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertex_types.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_types.len()
    }
}

impl IncidenceGraph for MemoryGraph {
    fn incidences(&self, element: Element) -> &[Incidence] {
        match element {
            Element::Vertex(VertexId(id)) => &self.vertex_incidences[id],
            Element::Edge(EdgeId(id)) => &self.edge_incidences[id],
        }
    }

    fn element_type(&self, element: Element) -> TypeId {
        match element {
            Element::Vertex(VertexId(id)) => self.vertex_types[id],
            Element::Edge(EdgeId(id)) => self.edge_types[id],
        }
    }
}
