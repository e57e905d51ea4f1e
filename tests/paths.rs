//! End-to-end scenarios: compile a description, determinize it, walk a
//! `MemoryGraph`, and inspect the resulting path systems and slices.

use anyhow::Result;

use pathgrep::graph::{Direction, Element, MemoryGraph, VertexId};
use pathgrep::query::walk::{path_system, reachable_elements, slice};
use pathgrep::query::{DescriptionBuilder, Dfa, PathDescription};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// The three-vertex chain from the matching scenarios: a --r1--> b --r1--> c.
fn chain() -> (MemoryGraph, VertexId, VertexId, VertexId) {
    let mut g = MemoryGraph::new();
    let v = g.add_type("V");
    let e = g.add_type("E");
    let a = g.add_vertex(v);
    let b = g.add_vertex(v);
    let c = g.add_vertex(v);
    g.add_edge_with_roles(e, a, b, None, Some("r1"));
    g.add_edge_with_roles(e, b, c, None, Some("r1"));
    (g, a, b, c)
}

fn compile(descr: &PathDescription) -> Result<Dfa> {
    Ok(Dfa::from_description(descr)?)
}

#[test]
fn single_edge_description_matches_each_hop() -> Result<()> {
    init_logging();
    let (g, a, b, c) = chain();
    let dfa = compile(&DescriptionBuilder::new().edge(Direction::Out).build())?;

    // `-->` matches (a, b) and (b, c) as one-edge paths.
    let from_a = path_system(&g, &dfa, Element::Vertex(a))?;
    assert_eq!(from_a.leaves()?, vec![Element::Vertex(b)]);
    assert_eq!(from_a.extract_paths_with_length(2)?.len(), 1);

    let from_b = path_system(&g, &dfa, Element::Vertex(b))?;
    assert_eq!(from_b.leaves()?, vec![Element::Vertex(c)]);

    let from_c = path_system(&g, &dfa, Element::Vertex(c))?;
    assert!(from_c.leaves()?.is_empty());
    assert_eq!(from_c.weight()?, 1); // just the root
    Ok(())
}

#[test]
fn two_edge_description_matches_exactly_the_full_chain() -> Result<()> {
    init_logging();
    let (g, a, b, c) = chain();
    let dfa = compile(
        &DescriptionBuilder::new()
            .edge(Direction::Out)
            .edge(Direction::Out)
            .build(),
    )?;

    let from_a = path_system(&g, &dfa, Element::Vertex(a))?;
    let paths = from_a.extract_paths()?;
    assert_eq!(paths.len(), 1);
    let path = &paths[0];
    assert_eq!(path.first_element(), Element::Vertex(a));
    assert_eq!(path.last_element(), Element::Vertex(c));
    assert!(path.contains_vertex(b));
    assert!(path.is_trail());

    // No other start vertex completes the description.
    assert!(reachable_elements(&g, &dfa, Element::Vertex(b)).is_empty());
    assert!(reachable_elements(&g, &dfa, Element::Vertex(c)).is_empty());
    Ok(())
}

#[test]
fn exponent_matches_the_same_language_as_spelled_out_sequence() -> Result<()> {
    init_logging();
    let (g, a, _, _) = chain();
    let spelled = compile(
        &DescriptionBuilder::new()
            .edge(Direction::Out)
            .edge(Direction::Out)
            .build(),
    )?;
    let squared = compile(&DescriptionBuilder::new().edge(Direction::Out).times(2).build())?;
    assert_eq!(
        reachable_elements(&g, &spelled, Element::Vertex(a)),
        reachable_elements(&g, &squared, Element::Vertex(a))
    );
    Ok(())
}

#[test]
fn optional_step_matches_both_lengths() -> Result<()> {
    init_logging();
    let (g, a, b, c) = chain();
    let dfa = compile(
        &DescriptionBuilder::new()
            .edge(Direction::Out)
            .edge(Direction::Out)
            .optional()
            .build(),
    )?;
    assert_eq!(
        reachable_elements(&g, &dfa, Element::Vertex(a)),
        vec![Element::Vertex(b), Element::Vertex(c)]
    );
    Ok(())
}

#[test]
fn alternative_unions_both_branches() -> Result<()> {
    init_logging();
    let (g, _, b, _) = chain();
    let dfa = compile(
        &DescriptionBuilder::new()
            .alternative(vec![
                DescriptionBuilder::new().edge(Direction::Out).build(),
                DescriptionBuilder::new().edge(Direction::In).build(),
            ])
            .build(),
    )?;
    // b has one predecessor and one successor.
    assert_eq!(reachable_elements(&g, &dfa, Element::Vertex(b)).len(), 2);
    Ok(())
}

#[test]
fn backward_slice_via_transposition() -> Result<()> {
    init_logging();
    let (g, a, b, c) = chain();
    // Everything that reaches c: walk `(-->)+` transposed from c.
    let dfa = compile(
        &DescriptionBuilder::new()
            .edge(Direction::Out)
            .plus()
            .transpose()
            .build(),
    )?;
    let backward = slice(&g, &dfa, &[Element::Vertex(c)])?;
    assert!(backward.contains(Element::Vertex(a))?);
    assert!(backward.contains(Element::Vertex(b))?);
    assert_eq!(backward.criterion_elements(), &[Element::Vertex(c)]);

    // b's parent toward the criterion is the edge between b and c.
    let parents = backward.parents(Element::Vertex(b))?;
    assert_eq!(parents.len(), 1);
    Ok(())
}

#[test]
fn diamond_path_system_keeps_one_shortest_entry_per_key() -> Result<()> {
    init_logging();
    // Diamond: a -> b -> d and a -> c -> d.
    let mut g = MemoryGraph::new();
    let v = g.add_type("V");
    let et = g.add_type("E");
    let a = g.add_vertex(v);
    let b = g.add_vertex(v);
    let c = g.add_vertex(v);
    let d = g.add_vertex(v);
    g.add_edge(et, a, b);
    g.add_edge(et, a, c);
    g.add_edge(et, b, d);
    g.add_edge(et, c, d);

    let dfa = compile(&DescriptionBuilder::new().edge(Direction::Out).plus().build())?;
    let system = path_system(&g, &dfa, Element::Vertex(a))?;

    // d is reachable two ways but keeps a single entry per key, at the
    // shortest distance.
    assert_eq!(system.distance(Element::Vertex(d))?, Some(4));
    let path = system.extract_path(Element::Vertex(d))?.expect("d is a leaf");
    assert_eq!(path.length(), 4);
    assert_eq!(path.first_element(), Element::Vertex(a));

    // The history is a tree: b and c are siblings under a's edges.
    assert!(system.is_neighbour(Element::Vertex(a), path.elements()[1])?);
    assert_eq!(system.depth()?, 4);
    assert_eq!(system.min_path_length()?, Some(2));
    assert_eq!(system.max_path_length()?, Some(4));
    Ok(())
}

#[test]
fn role_restricted_iteration_stops_at_the_role_boundary() -> Result<()> {
    init_logging();
    let mut g = MemoryGraph::new();
    let v = g.add_type("V");
    let e = g.add_type("E");
    let a = g.add_vertex(v);
    let b = g.add_vertex(v);
    let c = g.add_vertex(v);
    g.add_edge_with_roles(e, a, b, None, Some("r1"));
    g.add_edge_with_roles(e, b, c, None, Some("r2"));

    let dfa = compile(
        &DescriptionBuilder::new()
            .edge_step(
                pathgrep::query::EdgeStep::new(Direction::Out).with_roles(["r1"]),
            )
            .plus()
            .build(),
    )?;
    assert_eq!(
        reachable_elements(&g, &dfa, Element::Vertex(a)),
        vec![Element::Vertex(b)]
    );
    Ok(())
}

#[test]
fn construction_errors_abort_the_evaluation() {
    init_logging();
    let conflicted = DescriptionBuilder::new()
        .edge_step(
            pathgrep::query::EdgeStep::new(Direction::Out)
                .with_types([pathgrep::graph::TypeId(0)])
                .with_elements([Element::Vertex(VertexId(0))]),
        )
        .build();
    assert!(Dfa::from_description(&conflicted).is_err());

    let zero_exponent = DescriptionBuilder::new().edge(Direction::Out).times(0).build();
    assert!(Dfa::from_description(&zero_exponent).is_err());
}
