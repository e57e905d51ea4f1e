/*!
# Query NFA

Compiles a path description into a nondeterministic finite automaton whose
transitions consume graph incidences. The construction is Thompson-style:
every AST node maps onto one composition operator, and fragments are glued
together with epsilon transitions. The NFA is not meant to be executed
directly — it is determinized via the subset construction in
[`dfa`](crate::query::dfa) before matching.

States and transitions live in one arena per automaton and are addressed by
plain indices, so the cyclic structures produced by `*`/`+` back-edges need
no ownership tricks. Composition operators take ownership of their input
fragments and re-base the absorbed fragment's indices, so two live automata
never share state ids.
*/
use std::fmt::{self, Display};

use itertools::Itertools;
use log::trace;
use smallvec::SmallVec;

use crate::query::ast::{EdgeStep, ElementPredicate, PathDescription};
use crate::query::transition::TransitionLabel;
use crate::graph::{AggregationKind, Direction, TypeSet};
use std::rc::Rc;

/// Errors raised while compiling a path description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructionError {
    /// An edge step carries both an element restriction and a type
    /// restriction; the two are mutually exclusive.
    RestrictionConflict,
    /// An exponent of zero repetitions.
    MalformedExponent,
}

impl std::error::Error for ConstructionError {}

impl Display for ConstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RestrictionConflict => {
                write!(f, "element and type restrictions cannot be combined on one edge step")
            }
            Self::MalformedExponent => write!(f, "exponent must repeat at least once"),
        }
    }
}

/// One automaton state: finality flag plus ordered outgoing and incoming
/// transition-id lists. The incoming list is derived bookkeeping that makes
/// transposition a pure swap.
#[derive(Debug, Clone, Default)]
pub struct State {
    is_final: bool,
    out: SmallVec<[usize; 4]>,
    inc: SmallVec<[usize; 4]>,
}

/// One automaton transition between two states of the owning arena.
#[derive(Debug, Clone)]
pub struct Transition {
    pub from: usize,
    pub to: usize,
    pub label: TransitionLabel,
}

/// A nondeterministic finite automaton over incidence-consuming transitions.
#[derive(Debug, Clone)]
pub struct Nfa {
    states: Vec<State>,
    transitions: Vec<Transition>,
    initial: usize,
    finals: Vec<usize>,
}

impl Nfa {
    /// Compiles a path description into an NFA; the AST node kinds map 1:1
    /// onto the composition operators below.
    pub fn from_description(descr: &PathDescription) -> Result<Self, ConstructionError> {
        let nfa = match descr {
            PathDescription::Incidence { direction, roles } => {
                Self::single(TransitionLabel::SimpleIncidence {
                    direction: *direction,
                    roles: roles.clone(),
                })
            }
            PathDescription::Edge(step) => Self::edge_fragment(step, None)?,
            PathDescription::Aggregation { step, kind } => Self::edge_fragment(step, Some(*kind))?,
            PathDescription::Sequence(items) => {
                let mut acc: Option<Self> = None;
                for item in items {
                    let next = Self::from_description(item)?;
                    acc = Some(match acc {
                        None => next,
                        Some(done) => done.concat(next),
                    });
                }
                acc.unwrap_or_else(Self::empty_word)
            }
            PathDescription::Alternative(items) => {
                let branches = items
                    .iter()
                    .map(Self::from_description)
                    .collect::<Result<Vec<_>, _>>()?;
                Self::alternative(branches)
            }
            PathDescription::Optional(inner) => Self::from_description(inner)?.optional(),
            PathDescription::Star(inner) => Self::from_description(inner)?.star(),
            PathDescription::Plus(inner) => Self::from_description(inner)?.plus(),
            PathDescription::Exponent(inner, n) => Self::from_description(inner)?.exponent(*n)?,
            PathDescription::Transposition(inner) => Self::from_description(inner)?.transpose(),
            PathDescription::IntermediateVertex { left, check, right } => {
                Self::from_description(left)?
                    .through_intermediate(check.clone(), Self::from_description(right)?)
            }
            PathDescription::StartRestriction {
                inner,
                types,
                predicate,
            } => Self::from_description(inner)?
                .with_start_restriction(types.clone(), predicate.clone()),
            PathDescription::GoalRestriction {
                inner,
                types,
                predicate,
            } => Self::from_description(inner)?
                .with_goal_restriction(types.clone(), predicate.clone()),
        };
        trace!(
            "compiled `{descr}` into an NFA with {} states / {} transitions",
            nfa.states.len(),
            nfa.transitions.len()
        );
        Ok(nfa)
    }

    /// The NFA accepting only the empty traversal.
    #[must_use]
    pub fn empty_word() -> Self {
        let mut nfa = Self::fragment();
        nfa.states[0].is_final = true;
        nfa.finals.push(0);
        nfa
    }

    /// Two states joined by one labeled transition.
    #[must_use]
    pub fn single(label: TransitionLabel) -> Self {
        let mut nfa = Self::fragment();
        let end = nfa.add_state();
        nfa.add_transition(0, end, label);
        nfa.states[end].is_final = true;
        nfa.finals.push(end);
        nfa
    }

    /// An edge traversal is not atomic: it is compiled into two consecutive
    /// incidence transitions through intermediate states, with the step's
    /// restriction (if any) spliced between them — the midpoint of the pair
    /// is the edge element, so that is where edge restrictions apply.
    ///
    /// `Out` maps to an (out, out) incidence pair and `In` to (in, in). For
    /// `Any` the pairs (out, out) and (in, in) are added as two parallel
    /// routes into the same final state: an any-direction edge is *not* two
    /// any-direction incidences, which would also accept entering and
    /// leaving the edge through the same side.
    fn edge_fragment(
        step: &EdgeStep,
        aggregation: Option<Option<AggregationKind>>,
    ) -> Result<Self, ConstructionError> {
        if step.types.is_some() && step.elements.is_some() {
            return Err(ConstructionError::RestrictionConflict);
        }
        let restriction = if let Some(elements) = &step.elements {
            Some(TransitionLabel::ElementRestriction {
                elements: elements.clone(),
            })
        } else if step.types.is_some() || step.predicate.is_some() {
            Some(TransitionLabel::TypeRestriction {
                types: step.types.clone(),
                predicate: step.predicate.clone(),
            })
        } else {
            None
        };

        let mut nfa = Self::fragment();
        let end = nfa.add_state();
        nfa.states[end].is_final = true;
        nfa.finals.push(end);

        let add_route = |nfa: &mut Self, leg: Direction| {
            // Role sets (and the aggregation marker) belong to the incidence
            // at the edge's far end: the second leg when traveling out, the
            // first when traveling in.
            let labeled = |marker: bool| {
                if marker {
                    match aggregation {
                        Some(kind) => TransitionLabel::AggregationIncidence {
                            direction: leg,
                            roles: step.roles.clone(),
                            kind,
                        },
                        None => TransitionLabel::SimpleIncidence {
                            direction: leg,
                            roles: step.roles.clone(),
                        },
                    }
                } else {
                    TransitionLabel::SimpleIncidence {
                        direction: leg,
                        roles: None,
                    }
                }
            };
            let first = labeled(leg == Direction::In);
            let second = labeled(leg == Direction::Out);

            let mid = nfa.add_state();
            nfa.add_transition(0, mid, first);
            let mut cur = mid;
            if let Some(r) = &restriction {
                let checked = nfa.add_state();
                nfa.add_transition(cur, checked, r.clone());
                cur = checked;
            }
            nfa.add_transition(cur, end, second);
        };

        match step.direction {
            Direction::Out => add_route(&mut nfa, Direction::Out),
            Direction::In => add_route(&mut nfa, Direction::In),
            Direction::Any => {
                add_route(&mut nfa, Direction::Out);
                add_route(&mut nfa, Direction::In);
            }
        }
        Ok(nfa)
    }

    /// Sequential composition: epsilon edges from every final state of
    /// `self` into `right`'s initial state; `self`'s finals become plain
    /// states and `right`'s finals take over.
    #[must_use]
    pub fn concat(mut self, right: Self) -> Self {
        let (right_initial, right_finals) = self.absorb(right);
        let old_finals = std::mem::take(&mut self.finals);
        for f in old_finals {
            self.states[f].is_final = false;
            self.add_transition(f, right_initial, TransitionLabel::Epsilon);
        }
        self.finals = right_finals;
        self
    }

    /// Alternation: a shared initial state with epsilon edges into every
    /// branch, and every branch final folded into one shared final state.
    #[must_use]
    pub fn alternative(branches: Vec<Self>) -> Self {
        let mut nfa = Self::fragment();
        let mut branch_finals = Vec::new();
        for branch in branches {
            let (initial, finals) = nfa.absorb(branch);
            nfa.add_transition(0, initial, TransitionLabel::Epsilon);
            branch_finals.extend(finals);
        }
        let shared = nfa.add_state();
        for f in branch_finals {
            nfa.states[f].is_final = false;
            nfa.add_transition(f, shared, TransitionLabel::Epsilon);
        }
        nfa.states[shared].is_final = true;
        nfa.finals = vec![shared];
        nfa
    }

    /// Zero-or-one occurrence: a direct epsilon from the initial state to
    /// the (collapsed) final state, preserving the fragment's own paths.
    #[must_use]
    pub fn optional(mut self) -> Self {
        let f = self.collapse_finals();
        let initial = self.initial;
        self.add_transition(initial, f, TransitionLabel::Epsilon);
        self
    }

    /// Zero-or-more iteration: like [`Nfa::plus`], and additionally the
    /// initial state itself becomes final to admit zero repetitions.
    #[must_use]
    pub fn star(mut self) -> Self {
        self = self.plus();
        let initial = self.initial;
        if !self.states[initial].is_final {
            self.states[initial].is_final = true;
            self.finals.push(initial);
        }
        self
    }

    /// One-or-more iteration: all finals collapse into one, which gets an
    /// epsilon back-edge to the initial state to admit repetition.
    #[must_use]
    pub fn plus(mut self) -> Self {
        let f = self.collapse_finals();
        let initial = self.initial;
        self.add_transition(f, initial, TransitionLabel::Epsilon);
        self
    }

    /// Exactly-n repetition: the fragment is deep-copied `n - 1` times and
    /// the copies concatenated. Absorbing each copy re-bases its state ids,
    /// so no two copies ever share a state number.
    pub fn exponent(self, n: u32) -> Result<Self, ConstructionError> {
        if n == 0 {
            return Err(ConstructionError::MalformedExponent);
        }
        let mut result = self.clone();
        for _ in 1..n {
            result = result.concat(self.clone());
        }
        Ok(result)
    }

    /// Backward traversal: every transition is reversed (endpoints swapped,
    /// `In`/`Out` flipped on incidence labels) and the initial/final roles
    /// change sides. Multiple former finals are fronted by one synthesized
    /// initial state with epsilon edges to each.
    #[must_use]
    pub fn transpose(mut self) -> Self {
        for t in &mut self.transitions {
            std::mem::swap(&mut t.from, &mut t.to);
            t.label = t.label.reversed();
        }
        for s in &mut self.states {
            std::mem::swap(&mut s.out, &mut s.inc);
        }
        let old_initial = self.initial;
        let old_finals = std::mem::take(&mut self.finals);
        for &f in &old_finals {
            self.states[f].is_final = false;
        }
        self.initial = if old_finals.len() == 1 {
            old_finals[0]
        } else {
            let synth = self.add_state();
            for &f in &old_finals {
                self.add_transition(synth, f, TransitionLabel::Epsilon);
            }
            synth
        };
        self.states[old_initial].is_final = true;
        self.finals = vec![old_initial];
        self
    }

    /// Concatenation through a dedicated midpoint-check transition.
    #[must_use]
    pub fn through_intermediate(mut self, check: ElementPredicate, right: Self) -> Self {
        let f = self.collapse_finals();
        let (right_initial, right_finals) = self.absorb(right);
        self.states[f].is_final = false;
        self.add_transition(
            f,
            right_initial,
            TransitionLabel::IntermediateVertex { predicate: check },
        );
        self.finals = right_finals;
        self
    }

    /// Prepends a restriction on the element a path starts at.
    #[must_use]
    pub fn with_start_restriction(
        mut self,
        types: Option<Rc<TypeSet>>,
        predicate: Option<ElementPredicate>,
    ) -> Self {
        let restricted = self.add_state();
        let initial = self.initial;
        self.add_transition(
            restricted,
            initial,
            TransitionLabel::TypeRestriction { types, predicate },
        );
        self.initial = restricted;
        self
    }

    /// Appends a restriction on the element a path ends at, collapsing
    /// multiple finals first.
    #[must_use]
    pub fn with_goal_restriction(
        mut self,
        types: Option<Rc<TypeSet>>,
        predicate: Option<ElementPredicate>,
    ) -> Self {
        let f = self.collapse_finals();
        let goal = self.add_state();
        self.states[f].is_final = false;
        self.add_transition(f, goal, TransitionLabel::TypeRestriction { types, predicate });
        self.states[goal].is_final = true;
        self.finals = vec![goal];
        self
    }

    #[must_use]
    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn num_transitions(&self) -> usize {
        self.transitions.len()
    }

    #[must_use]
    pub const fn initial(&self) -> usize {
        self.initial
    }

    #[must_use]
    pub fn finals(&self) -> &[usize] {
        &self.finals
    }

    #[must_use]
    pub fn is_final(&self, state: usize) -> bool {
        self.states[state].is_final
    }

    /// The outgoing transitions of `state`, in insertion order.
    pub fn transitions_from(&self, state: usize) -> impl Iterator<Item = &Transition> {
        self.states[state].out.iter().map(|&t| &self.transitions[t])
    }

    /// A fresh one-state fragment with state 0 as its initial state.
    fn fragment() -> Self {
        Self {
            states: vec![State::default()],
            transitions: Vec::new(),
            initial: 0,
            finals: Vec::new(),
        }
    }

    fn add_state(&mut self) -> usize {
        self.states.push(State::default());
        self.states.len() - 1
    }

    fn add_transition(&mut self, from: usize, to: usize, label: TransitionLabel) {
        let id = self.transitions.len();
        self.transitions.push(Transition { from, to, label });
        self.states[from].out.push(id);
        self.states[to].inc.push(id);
    }

    /// Merges `other`'s arena into `self` under a fresh id remapping (a
    /// plain offset, which is bijective), returning the re-based initial and
    /// final states. After absorbing, `other` no longer exists and no state
    /// ids are shared between the fragments.
    fn absorb(&mut self, other: Self) -> (usize, Vec<usize>) {
        let Self {
            states,
            transitions,
            initial,
            finals,
        } = other;
        let state_off = self.states.len();
        let trans_off = self.transitions.len();
        for mut s in states {
            for t in &mut s.out {
                *t += trans_off;
            }
            for t in &mut s.inc {
                *t += trans_off;
            }
            self.states.push(s);
        }
        for t in transitions {
            self.transitions.push(Transition {
                from: t.from + state_off,
                to: t.to + state_off,
                label: t.label,
            });
        }
        (
            initial + state_off,
            finals.into_iter().map(|f| f + state_off).collect(),
        )
    }

    /// Folds all final states into a single one via epsilon edges and
    /// returns it.
    fn collapse_finals(&mut self) -> usize {
        debug_assert!(!self.finals.is_empty());
        if self.finals.len() == 1 {
            return self.finals[0];
        }
        let collapsed = self.add_state();
        let old = std::mem::take(&mut self.finals);
        for f in old {
            self.states[f].is_final = false;
            self.add_transition(f, collapsed, TransitionLabel::Epsilon);
        }
        self.states[collapsed].is_final = true;
        self.finals = vec![collapsed];
        collapsed
    }
}

impl Display for Nfa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "NFA States: {}", self.states.len())?;
        writeln!(f, "Initial State: {}", self.initial)?;
        writeln!(f, "Final States: [{}]", self.finals.iter().join(", "))?;
        writeln!(f, "Transitions:")?;
        for (id, t) in self.transitions.iter().enumerate() {
            writeln!(f, "\t[{id}] {} --{}--> {}", t.from, t.label, t.to)?;
        }
        Ok(())
    }
}
