/*!
# Automaton Execution

Walks a determinized path description against a data graph. The walk
explores the product of graph elements and automaton states breadth-first:
consuming transitions try every incidence of the current element and move to
its other end one step further from the root, non-consuming transitions
re-key the current element under the target state at the same distance.
Every visit is recorded into the target history store, and a visit is only
expanded when the store reports it as new or improved — on cyclic graphs
revisits arrive at no smaller distance and the expansion stops.

Non-consuming steps are queued at the front (a 0/1-weight BFS), so every
key is first reached at its minimal distance and the history stores never
have to displace already-expanded entries.
*/
use std::collections::{BTreeSet, HashSet, VecDeque};

use log::debug;

use crate::graph::{Element, IncidenceGraph};
use crate::path::{ParentLink, PathSystem, PathSystemError, PathSystemKey, Slice};
use crate::query::dfa::Dfa;

/// Runs `dfa` over the graph from a single root element and records the
/// full traversal history. Elements from which nothing matches still yield
/// a path system (holding just the root) with no leaves.
pub fn path_system<G: IncidenceGraph>(
    graph: &G,
    dfa: &Dfa,
    root: Element,
) -> Result<PathSystem, PathSystemError> {
    let mut system = PathSystem::new();
    let initial = dfa.initial();
    system.set_root_element(root, initial, dfa.is_final(initial))?;

    let mut queue: VecDeque<(Element, usize, usize)> = VecDeque::new();
    queue.push_back((root, initial, 0));
    let mut visits = 0usize;

    while let Some((element, state, distance)) = queue.pop_front() {
        visits += 1;
        for t in dfa.transitions_from(state) {
            if t.label.consumes_incidence() {
                for inc in graph.incidences(element) {
                    if !t.label.accepts(graph, element, Some(inc)) {
                        continue;
                    }
                    let Some(next) = inc.other_end(element) else {
                        continue;
                    };
                    let key = PathSystemKey {
                        element: next,
                        state_number: t.target,
                    };
                    let parent = ParentLink {
                        element,
                        incidence: Some(inc.clone()),
                        state_number: state,
                    };
                    if system.add_element(key, Some(parent), distance + 1, dfa.is_final(t.target))? {
                        queue.push_back((next, t.target, distance + 1));
                    }
                }
            } else if t.label.accepts(graph, element, None) {
                // Re-keying the same element: the new entry inherits the
                // parent link of the entry it extends, so parent chains
                // always step between real path elements.
                let current = PathSystemKey {
                    element,
                    state_number: state,
                };
                let parent = system.entry(current).and_then(|e| e.parent.clone());
                let key = PathSystemKey {
                    element,
                    state_number: t.target,
                };
                if system.add_element(key, parent, distance, dfa.is_final(t.target))? {
                    queue.push_front((element, t.target, distance));
                }
            }
        }
    }

    system.finish()?;
    debug!("path-system walk from {root} expanded {visits} visits");
    Ok(system)
}

/// Runs `dfa` from every slicing-criterion element at once, keeping every
/// distinct derivation of every visit.
pub fn slice<G: IncidenceGraph>(
    graph: &G,
    dfa: &Dfa,
    criteria: &[Element],
) -> Result<Slice, PathSystemError> {
    let mut slice = Slice::new();
    let initial = dfa.initial();
    let mut queue: VecDeque<(Element, usize, usize)> = VecDeque::new();
    let mut expanded: HashSet<PathSystemKey> = HashSet::new();

    for &criterion in criteria {
        slice.add_slicing_criterion_element(criterion, initial, dfa.is_final(initial));
        let key = PathSystemKey {
            element: criterion,
            state_number: initial,
        };
        if expanded.insert(key) {
            queue.push_back((criterion, initial, 0));
        }
    }

    while let Some((element, state, distance)) = queue.pop_front() {
        for t in dfa.transitions_from(state) {
            if t.label.consumes_incidence() {
                for inc in graph.incidences(element) {
                    if !t.label.accepts(graph, element, Some(inc)) {
                        continue;
                    }
                    let Some(next) = inc.other_end(element) else {
                        continue;
                    };
                    let key = PathSystemKey {
                        element: next,
                        state_number: t.target,
                    };
                    let parent = ParentLink {
                        element,
                        incidence: Some(inc.clone()),
                        state_number: state,
                    };
                    slice.add_element(key, Some(parent), distance + 1, dfa.is_final(t.target))?;
                    if expanded.insert(key) {
                        queue.push_back((next, t.target, distance + 1));
                    }
                }
            } else if t.label.accepts(graph, element, None) {
                // Slice entries accrete parents over time, so the re-keyed
                // visit records an incidence-less link to its predecessor
                // key instead of copying a possibly incomplete parent set.
                let key = PathSystemKey {
                    element,
                    state_number: t.target,
                };
                let parent = ParentLink {
                    element,
                    incidence: None,
                    state_number: state,
                };
                slice.add_element(key, Some(parent), distance, dfa.is_final(t.target))?;
                if expanded.insert(key) {
                    queue.push_front((element, t.target, distance));
                }
            }
        }
    }

    slice.resolve()?;
    debug!(
        "slice walk from {} criteria expanded {} keys",
        criteria.len(),
        expanded.len()
    );
    Ok(slice)
}

/// The terminal projection of a walk: every element reachable from `start`
/// in a final automaton state, in element order. This is the
/// path-existence surface consumers use when the full history is not
/// needed.
#[must_use]
pub fn reachable_elements<G: IncidenceGraph>(graph: &G, dfa: &Dfa, start: Element) -> Vec<Element> {
    let mut seen: HashSet<(Element, usize)> = HashSet::new();
    let mut queue: VecDeque<(Element, usize)> = VecDeque::new();
    let mut finals: BTreeSet<Element> = BTreeSet::new();

    seen.insert((start, dfa.initial()));
    queue.push_back((start, dfa.initial()));

    while let Some((element, state)) = queue.pop_front() {
        if dfa.is_final(state) {
            finals.insert(element);
        }
        for t in dfa.transitions_from(state) {
            if t.label.consumes_incidence() {
                for inc in graph.incidences(element) {
                    if !t.label.accepts(graph, element, Some(inc)) {
                        continue;
                    }
                    if let Some(next) = inc.other_end(element) {
                        if seen.insert((next, t.target)) {
                            queue.push_back((next, t.target));
                        }
                    }
                }
            } else if t.label.accepts(graph, element, None) && seen.insert((element, t.target)) {
                queue.push_back((element, t.target));
            }
        }
    }
    finals.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::graph::{Direction, MemoryGraph, VertexId};
    use crate::query::ast::{DescriptionBuilder, EdgeStep, ElementPredicate};
    use crate::query::dfa::Dfa;

    /// a --r1--> b --r1--> c
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

    fn dfa_for(descr: &crate::query::ast::PathDescription) -> Dfa {
        Dfa::from_description(descr).expect("valid description")
    }

    fn vertices(elements: &[Element]) -> Vec<Element> {
        elements.iter().copied().filter(|e| e.is_vertex()).collect()
    }

    #[test]
    fn single_edge_reaches_the_successor() {
        let (g, a, b, c) = chain();
        let dfa = dfa_for(&DescriptionBuilder::new().edge(Direction::Out).build());
        assert_eq!(
            reachable_elements(&g, &dfa, Element::Vertex(a)),
            vec![Element::Vertex(b)]
        );
        assert_eq!(
            reachable_elements(&g, &dfa, Element::Vertex(b)),
            vec![Element::Vertex(c)]
        );
    }

    #[test]
    fn concatenation_matches_the_concatenated_language() {
        let (g, a, b, c) = chain();
        let two = dfa_for(
            &DescriptionBuilder::new()
                .edge(Direction::Out)
                .edge(Direction::Out)
                .build(),
        );
        // `--> -->` spans the whole chain but neither single hop.
        assert_eq!(
            reachable_elements(&g, &two, Element::Vertex(a)),
            vec![Element::Vertex(c)]
        );
        assert!(reachable_elements(&g, &two, Element::Vertex(b)).is_empty());
    }

    #[test]
    fn star_accepts_zero_repetitions_plus_does_not() {
        let (g, a, b, c) = chain();
        let star = dfa_for(&DescriptionBuilder::new().edge(Direction::Out).star().build());
        let plus = dfa_for(&DescriptionBuilder::new().edge(Direction::Out).plus().build());

        let starred = vertices(&reachable_elements(&g, &star, Element::Vertex(a)));
        assert_eq!(
            starred,
            vec![Element::Vertex(a), Element::Vertex(b), Element::Vertex(c)]
        );
        let plussed = vertices(&reachable_elements(&g, &plus, Element::Vertex(a)));
        assert_eq!(plussed, vec![Element::Vertex(b), Element::Vertex(c)]);
    }

    #[test]
    fn any_edge_rejects_the_mixed_incidence_pair() {
        let (g, a, b, _) = chain();
        let any_edge = dfa_for(&DescriptionBuilder::new().edge(Direction::Any).build());
        // `<->` from a only reaches b: entering and leaving the edge
        // through the same side is not an edge traversal.
        assert_eq!(
            reachable_elements(&g, &any_edge, Element::Vertex(a)),
            vec![Element::Vertex(b)]
        );

        // Two any-direction incidences, by contrast, accept the bounce
        // back to a as well.
        let two_incidences = dfa_for(
            &DescriptionBuilder::new()
                .incidence(Direction::Any)
                .incidence(Direction::Any)
                .build(),
        );
        assert_eq!(
            reachable_elements(&g, &two_incidences, Element::Vertex(a)),
            vec![Element::Vertex(a), Element::Vertex(b)]
        );
    }

    #[test]
    fn any_edge_traverses_against_the_direction_too() {
        let (g, _, b, _) = chain();
        let any_edge = dfa_for(&DescriptionBuilder::new().edge(Direction::Any).build());
        let reached = reachable_elements(&g, &any_edge, Element::Vertex(b));
        // b sits between a and c and reaches both over one undirected hop.
        assert_eq!(reached.len(), 2);
    }

    #[test]
    fn transpose_is_involutive_on_the_language() {
        let (g, a, b, _) = chain();
        let forward = DescriptionBuilder::new().edge(Direction::Out).build();
        let transposed = dfa_for(&DescriptionBuilder::new().edge(Direction::Out).transpose().build());
        let double = dfa_for(
            &DescriptionBuilder::new()
                .edge(Direction::Out)
                .transpose()
                .transpose()
                .build(),
        );

        // `(-->)^T` walks backward.
        assert_eq!(
            reachable_elements(&g, &transposed, Element::Vertex(b)),
            vec![Element::Vertex(a)]
        );
        // `((-->)^T)^T` accepts the same pairs as `-->`.
        assert_eq!(
            reachable_elements(&g, &double, Element::Vertex(a)),
            reachable_elements(&g, &dfa_for(&forward), Element::Vertex(a))
        );
    }

    #[test]
    fn role_restriction_filters_edges() {
        let mut g = MemoryGraph::new();
        let v = g.add_type("V");
        let e = g.add_type("E");
        let a = g.add_vertex(v);
        let b = g.add_vertex(v);
        let c = g.add_vertex(v);
        g.add_edge_with_roles(e, a, b, None, Some("r1"));
        g.add_edge_with_roles(e, a, c, None, Some("r2"));

        let r1_only = dfa_for(
            &DescriptionBuilder::new()
                .edge_step(EdgeStep::new(Direction::Out).with_roles(["r1"]))
                .build(),
        );
        assert_eq!(
            reachable_elements(&g, &r1_only, Element::Vertex(a)),
            vec![Element::Vertex(b)]
        );
    }

    #[test]
    fn type_restriction_applies_to_the_edge_element() {
        let mut g = MemoryGraph::new();
        let v = g.add_type("V");
        let knows = g.add_type("Knows");
        let likes = g.add_type("Likes");
        let a = g.add_vertex(v);
        let b = g.add_vertex(v);
        let c = g.add_vertex(v);
        g.add_edge(knows, a, b);
        g.add_edge(likes, a, c);

        let knows_only = dfa_for(
            &DescriptionBuilder::new()
                .edge_step(EdgeStep::new(Direction::Out).with_types([knows]))
                .build(),
        );
        assert_eq!(
            reachable_elements(&g, &knows_only, Element::Vertex(a)),
            vec![Element::Vertex(b)]
        );
    }

    #[test]
    fn element_restriction_uses_the_precomputed_set() {
        let (g, a, b, _) = chain();
        let allowed = [Element::Edge(crate::graph::EdgeId(0))];
        let restricted = dfa_for(
            &DescriptionBuilder::new()
                .edge_step(EdgeStep::new(Direction::Out).with_elements(allowed))
                .plus()
                .build(),
        );
        // Only the first edge is in the allowed set, so the walk stops at b.
        assert_eq!(
            reachable_elements(&g, &restricted, Element::Vertex(a)),
            vec![Element::Vertex(b)]
        );
    }

    #[test]
    fn intermediate_vertex_checks_the_midpoint() {
        let (g, a, b, c) = chain();
        let via_b = ElementPredicate::new(move |e| e == Element::Vertex(b));
        let via_c = ElementPredicate::new(move |e| e == Element::Vertex(c));

        let through_b = dfa_for(
            &DescriptionBuilder::new()
                .edge(Direction::Out)
                .intermediate_vertex(via_b)
                .edge(Direction::Out)
                .build(),
        );
        assert_eq!(
            reachable_elements(&g, &through_b, Element::Vertex(a)),
            vec![Element::Vertex(c)]
        );

        let through_c = dfa_for(
            &DescriptionBuilder::new()
                .edge(Direction::Out)
                .intermediate_vertex(via_c)
                .edge(Direction::Out)
                .build(),
        );
        assert!(reachable_elements(&g, &through_c, Element::Vertex(a)).is_empty());
    }

    #[test]
    fn goal_restriction_prunes_terminals() {
        let mut g = MemoryGraph::new();
        let person = g.add_type("Person");
        let city = g.add_type("City");
        let e = g.add_type("E");
        let a = g.add_vertex(person);
        let b = g.add_vertex(person);
        let t = g.add_vertex(city);
        g.add_edge(e, a, b);
        g.add_edge(e, a, t);

        let to_city = dfa_for(
            &DescriptionBuilder::new()
                .edge(Direction::Out)
                .goal_restriction(Some([city]), None)
                .build(),
        );
        assert_eq!(
            reachable_elements(&g, &to_city, Element::Vertex(a)),
            vec![Element::Vertex(t)]
        );
    }

    #[test]
    fn start_restriction_gates_the_root() {
        let mut g = MemoryGraph::new();
        let person = g.add_type("Person");
        let city = g.add_type("City");
        let e = g.add_type("E");
        let a = g.add_vertex(city);
        let b = g.add_vertex(person);
        g.add_edge(e, a, b);

        let from_person = dfa_for(
            &DescriptionBuilder::new()
                .edge(Direction::Out)
                .start_restriction(Some([person]), None)
                .build(),
        );
        // a is a city, so nothing matches from a.
        assert!(reachable_elements(&g, &from_person, Element::Vertex(a)).is_empty());
    }

    #[test]
    fn aggregation_step_requires_aggregation_incidences() {
        let mut g = MemoryGraph::new();
        let v = g.add_type("V");
        let e = g.add_type("E");
        let part = g.add_vertex(v);
        let whole = g.add_vertex(v);
        let other = g.add_vertex(v);
        g.add_aggregation(e, part, whole, crate::graph::AggregationKind::Composite);
        g.add_edge(e, part, other);

        let aggregated = dfa_for(
            &DescriptionBuilder::new()
                .aggregation(Direction::Out, None)
                .build(),
        );
        assert_eq!(
            reachable_elements(&g, &aggregated, Element::Vertex(part)),
            vec![Element::Vertex(whole)]
        );
    }

    #[test]
    fn path_system_walk_records_the_chain() {
        let (g, a, b, c) = chain();
        let dfa = dfa_for(
            &DescriptionBuilder::new()
                .edge(Direction::Out)
                .edge(Direction::Out)
                .build(),
        );
        let system = path_system(&g, &dfa, Element::Vertex(a)).unwrap();
        assert_eq!(system.root_element(), Some(Element::Vertex(a)));
        assert_eq!(system.leaves().unwrap(), vec![Element::Vertex(c)]);
        assert!(system.contains(Element::Vertex(b)).unwrap());

        let path = system.extract_path(Element::Vertex(c)).unwrap().unwrap();
        assert_eq!(path.first_element(), Element::Vertex(a));
        assert_eq!(path.last_element(), Element::Vertex(c));
        assert_eq!(path.length(), 4);
        assert!(path.is_trail());
    }

    #[test]
    fn path_system_walk_on_a_cycle_terminates() {
        let mut g = MemoryGraph::new();
        let v = g.add_type("V");
        let e = g.add_type("E");
        let a = g.add_vertex(v);
        let b = g.add_vertex(v);
        g.add_edge(e, a, b);
        g.add_edge(e, b, a);

        let dfa = dfa_for(&DescriptionBuilder::new().edge(Direction::Out).star().build());
        let system = path_system(&g, &dfa, Element::Vertex(a)).unwrap();
        assert!(system.contains(Element::Vertex(a)).unwrap());
        assert!(system.contains(Element::Vertex(b)).unwrap());
        // Shortest distances survive the cycle.
        assert_eq!(system.distance(Element::Vertex(b)).unwrap(), Some(2));
    }

    #[test]
    fn bool_predicate_binds_the_current_element() {
        let (g, a, b, _) = chain();
        let seen: Rc<std::cell::RefCell<Vec<Element>>> = Rc::default();
        let recorder = {
            let seen = seen.clone();
            ElementPredicate::new(move |e| {
                seen.borrow_mut().push(e);
                true
            })
        };
        let dfa = dfa_for(
            &DescriptionBuilder::new()
                .edge_step(EdgeStep::new(Direction::Out).with_predicate(recorder))
                .build(),
        );
        assert_eq!(
            reachable_elements(&g, &dfa, Element::Vertex(a)),
            vec![Element::Vertex(b)]
        );
        // The predicate ran against the midpoint edge element.
        assert!(seen.borrow().iter().all(|e| e.is_edge()));
    }

    #[test]
    fn slice_walk_keeps_multiple_derivations() {
        // Diamond: a -> b -> d and a -> c -> d.
        let mut g = MemoryGraph::new();
        let v = g.add_type("V");
        let e = g.add_type("E");
        let a = g.add_vertex(v);
        let b = g.add_vertex(v);
        let c = g.add_vertex(v);
        let d = g.add_vertex(v);
        g.add_edge(e, a, b);
        g.add_edge(e, a, c);
        g.add_edge(e, b, d);
        g.add_edge(e, c, d);

        let dfa = dfa_for(&DescriptionBuilder::new().edge(Direction::Out).plus().build());
        let result = slice(&g, &dfa, &[Element::Vertex(a)]).unwrap();

        assert!(result.contains(Element::Vertex(d)).unwrap());
        // d keeps both derivations: one through each incoming edge.
        let parents = result.parents(Element::Vertex(d)).unwrap();
        assert_eq!(parents.len(), 2);
        assert!(parents.iter().all(|e| e.is_edge()));
    }

    #[test]
    fn slice_walk_from_multiple_criteria() {
        let (g, a, b, c) = chain();
        let dfa = dfa_for(&DescriptionBuilder::new().edge(Direction::Out).build());
        let result = slice(&g, &dfa, &[Element::Vertex(a), Element::Vertex(b)]).unwrap();
        assert_eq!(result.criterion_elements().len(), 2);
        assert!(result.contains(Element::Vertex(b)).unwrap());
        assert!(result.contains(Element::Vertex(c)).unwrap());
        assert_eq!(result.distance(Element::Vertex(c)).unwrap(), Some(2));
    }
}
