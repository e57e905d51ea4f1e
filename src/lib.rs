/*!
# `pathgrep` Library

Regular path queries over incidence graphs: compile a declarative path
description into a finite automaton and walk it against an attributed graph
to enumerate matching paths, element sets and sub-path-systems.
*/

pub mod graph;
pub mod path;
pub mod query;
