/*!
# Query DFA

Determinizes a query NFA via the [subset construction](https://en.wikipedia.org/wiki/Powerset_construction)
so that executing a path description never needs to backtrack over epsilon
ambiguity.

Each DFA state corresponds to a non-empty, epsilon-closed set of NFA states.
The "alphabet" is query-dependent: transitions are grouped into symbol
classes by [`TransitionLabel::equal_symbol`] — structural equality on
direction and role sets, reference identity on restriction sets and
predicates. Non-consuming predicated labels (type/element restrictions, bool
expressions, intermediate-vertex checks) are symbols in their own right and
survive determinization; only plain epsilon transitions are closed away.

Determinism here means the outgoing transitions of one DFA state are
pairwise distinct symbol classes. Two different classes may still accept the
same concrete incidence (an unrestricted `out` step and a role-restricted
`out` step, say); the walk follows every accepting transition and the
(element, state) keyed history stores absorb the fan-out.
*/
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt::{self, Display};

use itertools::Itertools;
use log::debug;

use crate::query::ast::PathDescription;
use crate::query::nfa::{ConstructionError, Nfa};
use crate::query::transition::TransitionLabel;

/// One deterministic state: its finality, the constituent NFA states it
/// stands for, and its per-symbol-class outgoing transitions.
#[derive(Debug, Clone)]
pub struct DfaState {
    is_final: bool,
    nfa_states: Vec<usize>,
    out: Vec<DfaTransition>,
}

/// One deterministic transition.
#[derive(Debug, Clone)]
pub struct DfaTransition {
    pub label: TransitionLabel,
    pub target: usize,
}

/// A deterministic finite automaton equivalent to a query NFA.
#[derive(Debug, Clone)]
pub struct Dfa {
    states: Vec<DfaState>,
    initial: usize,
}

impl Dfa {
    /// Compiles a path description straight to a DFA.
    pub fn from_description(descr: &PathDescription) -> Result<Self, ConstructionError> {
        Ok(Self::from_nfa(&Nfa::from_description(descr)?))
    }

    /// Subset construction. Starts from the epsilon closure of the NFA's
    /// initial state; for every unprocessed DFA state, the non-epsilon
    /// transitions of its constituent NFA states are grouped into symbol
    /// classes, and the epsilon closure of each class's target set is
    /// interned as a (possibly new) DFA state. A DFA state is final iff any
    /// constituent NFA state is final.
    #[must_use]
    pub fn from_nfa(nfa: &Nfa) -> Self {
        let mut start: BTreeSet<usize> = BTreeSet::from([nfa.initial()]);
        epsilon_closure(nfa, &mut start);
        let start_key: Vec<usize> = start.iter().copied().collect();

        let mut set_to_state: HashMap<Vec<usize>, usize> = HashMap::new();
        let mut states: Vec<DfaState> = Vec::new();
        let mut work_queue: VecDeque<usize> = VecDeque::new();

        set_to_state.insert(start_key.clone(), 0);
        states.push(DfaState {
            is_final: start_key.iter().any(|&s| nfa.is_final(s)),
            nfa_states: start_key,
            out: Vec::new(),
        });
        work_queue.push_back(0);

        while let Some(current) = work_queue.pop_front() {
            let constituents = states[current].nfa_states.clone();

            // Group the outgoing non-epsilon transitions into symbol
            // classes, preserving first-seen order.
            let mut classes: Vec<(TransitionLabel, BTreeSet<usize>)> = Vec::new();
            for &nfa_state in &constituents {
                for t in nfa.transitions_from(nfa_state) {
                    if t.label.is_epsilon() {
                        continue;
                    }
                    match classes.iter_mut().find(|(l, _)| l.equal_symbol(&t.label)) {
                        Some((_, targets)) => {
                            targets.insert(t.to);
                        }
                        None => classes.push((t.label.clone(), BTreeSet::from([t.to]))),
                    }
                }
            }

            let mut out = Vec::with_capacity(classes.len());
            for (label, mut targets) in classes {
                epsilon_closure(nfa, &mut targets);
                let key: Vec<usize> = targets.iter().copied().collect();
                let target = match set_to_state.get(&key) {
                    Some(&existing) => existing,
                    None => {
                        let id = states.len();
                        set_to_state.insert(key.clone(), id);
                        states.push(DfaState {
                            is_final: key.iter().any(|&s| nfa.is_final(s)),
                            nfa_states: key,
                            out: Vec::new(),
                        });
                        work_queue.push_back(id);
                        id
                    }
                };
                out.push(DfaTransition { label, target });
            }
            states[current].out = out;
        }

        debug!(
            "determinized NFA ({} states) into DFA ({} states)",
            nfa.num_states(),
            states.len()
        );
        Self { states, initial: 0 }
    }

    #[must_use]
    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub const fn initial(&self) -> usize {
        self.initial
    }

    #[must_use]
    pub fn is_final(&self, state: usize) -> bool {
        self.states[state].is_final
    }

    /// The constituent NFA states behind a DFA state.
    #[must_use]
    pub fn nfa_states(&self, state: usize) -> &[usize] {
        &self.states[state].nfa_states
    }

    /// The outgoing transitions of `state`; pairwise distinct symbol
    /// classes.
    #[must_use]
    pub fn transitions_from(&self, state: usize) -> &[DfaTransition] {
        &self.states[state].out
    }
}

/// Extends `set` to its closure under plain epsilon transitions. Predicated
/// non-consuming transitions are deliberately not closed over — their
/// checks run during the walk.
fn epsilon_closure(nfa: &Nfa, set: &mut BTreeSet<usize>) {
    let mut pending: Vec<usize> = set.iter().copied().collect();
    while let Some(state) = pending.pop() {
        for t in nfa.transitions_from(state) {
            if t.label.is_epsilon() && set.insert(t.to) {
                pending.push(t.to);
            }
        }
    }
}

impl Display for Dfa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DFA States: {}", self.states.len())?;
        writeln!(f, "Initial State: {}", self.initial)?;
        writeln!(
            f,
            "Final States: [{}]",
            self.states
                .iter()
                .enumerate()
                .filter_map(|(i, s)| if s.is_final { Some(i) } else { None })
                .join(", ")
        )?;
        writeln!(f, "Transitions:")?;
        for (id, state) in self.states.iter().enumerate() {
            writeln!(
                f,
                "\tstate {id} (nfa states [{}]):",
                state.nfa_states.iter().join(", ")
            )?;
            for t in &state.out {
                writeln!(f, "\t\ton [{}] -> {}", t.label, t.target)?;
            }
        }
        Ok(())
    }
}
