/*!
# Transition Labels

The closed set of atomic predicates a single automaton transition can carry.
Two of the variants consume an incidence when taken (moving the walk to the
other end of the incidence); the rest re-test the current element and stay
put. The original design dispatched these polymorphically; here they are a
tagged variant set matched exhaustively.

Every variant implements the same three contracts the automata rely on:

- [`accepts`](TransitionLabel::accepts): may this transition fire for the
  given element (and incidence, when one is consumed)?
- [`equal_symbol`](TransitionLabel::equal_symbol): do two transitions denote
  the same symbol class for subset construction? Structural for direction +
  role sets, reference identity for restriction sets and predicates —
  deliberately distinct from object identity.
- [`consumes_incidence`](TransitionLabel::consumes_incidence): does taking
  the transition advance along an incidence?

`Clone` produces a structurally-equal, independently-owned label; shared
restriction data sits behind `Rc` and is immutable, so clones spliced into
different automata never alias mutable state.
*/
use std::fmt::{self, Display};
use std::rc::Rc;

use itertools::Itertools;

use crate::graph::{
    AggregationKind, Direction, Element, ElementSet, Incidence, IncidenceGraph, RoleSet, TypeSet,
};
use crate::query::ast::ElementPredicate;

/// Label on one automaton transition.
#[derive(Debug, Clone)]
pub enum TransitionLabel {
    /// Fires unconditionally without consuming anything.
    Epsilon,
    /// Consumes one incidence in the given direction, optionally restricted
    /// to a role set.
    SimpleIncidence {
        direction: Direction,
        roles: Option<Rc<RoleSet>>,
    },
    /// Like [`TransitionLabel::SimpleIncidence`], but only accepts
    /// incidences that are part of an aggregation, optionally of a specific
    /// kind.
    AggregationIncidence {
        direction: Direction,
        roles: Option<Rc<RoleSet>>,
        kind: Option<AggregationKind>,
    },
    /// Passes when the element's type is in the allowed collection and the
    /// optional predicate holds.
    TypeRestriction {
        types: Option<Rc<TypeSet>>,
        predicate: Option<ElementPredicate>,
    },
    /// Passes when the element is in a precomputed sub-expression result.
    ElementRestriction { elements: Rc<ElementSet> },
    /// Passes when the attached boolean predicate holds for the element.
    BoolExpression { predicate: ElementPredicate },
    /// Midpoint check of an intermediate-vertex description.
    IntermediateVertex { predicate: ElementPredicate },
}

impl TransitionLabel {
    #[must_use]
    pub const fn is_epsilon(&self) -> bool {
        matches!(self, Self::Epsilon)
    }

    /// Whether taking this transition consumes an incidence and moves to its
    /// other end; non-consuming transitions stay on the current element.
    #[must_use]
    pub const fn consumes_incidence(&self) -> bool {
        matches!(
            self,
            Self::SimpleIncidence { .. } | Self::AggregationIncidence { .. }
        )
    }

    /// Whether this transition may fire for `element`. Consuming variants
    /// require the candidate incidence; non-consuming variants ignore it.
    pub fn accepts<G: IncidenceGraph>(
        &self,
        graph: &G,
        element: Element,
        incidence: Option<&Incidence>,
    ) -> bool {
        match self {
            Self::Epsilon => true,
            Self::SimpleIncidence { direction, roles } => incidence
                .is_some_and(|inc| incidence_matches(inc, element, *direction, roles.as_deref())),
            Self::AggregationIncidence {
                direction,
                roles,
                kind,
            } => incidence.is_some_and(|inc| {
                let kind_ok = match kind {
                    None => inc.aggregation.is_some(),
                    Some(k) => inc.aggregation == Some(*k),
                };
                kind_ok && incidence_matches(inc, element, *direction, roles.as_deref())
            }),
            Self::TypeRestriction { types, predicate } => {
                let type_ok = types
                    .as_ref()
                    .is_none_or(|t| t.contains(&graph.element_type(element)));
                type_ok && predicate.as_ref().is_none_or(|p| p.eval(element))
            }
            Self::ElementRestriction { elements } => elements.contains(&element),
            Self::BoolExpression { predicate } | Self::IntermediateVertex { predicate } => {
                predicate.eval(element)
            }
        }
    }

    /// Symbol-class equality for subset construction: structural on
    /// direction and role sets, reference identity on restriction sets and
    /// predicates.
    #[must_use]
    pub fn equal_symbol(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Epsilon, Self::Epsilon) => true,
            (
                Self::SimpleIncidence { direction, roles },
                Self::SimpleIncidence {
                    direction: od,
                    roles: or,
                },
            ) => direction == od && roles == or,
            (
                Self::AggregationIncidence {
                    direction,
                    roles,
                    kind,
                },
                Self::AggregationIncidence {
                    direction: od,
                    roles: or,
                    kind: ok,
                },
            ) => direction == od && roles == or && kind == ok,
            (
                Self::TypeRestriction { types, predicate },
                Self::TypeRestriction {
                    types: ot,
                    predicate: op,
                },
            ) => types == ot && same_predicate(predicate.as_ref(), op.as_ref()),
            (
                Self::ElementRestriction { elements },
                Self::ElementRestriction { elements: oe },
            ) => Rc::ptr_eq(elements, oe),
            (Self::BoolExpression { predicate }, Self::BoolExpression { predicate: op })
            | (Self::IntermediateVertex { predicate }, Self::IntermediateVertex { predicate: op }) => {
                predicate.same(op)
            }
            _ => false,
        }
    }

    /// The label matched after reversing the traversal: incidence-consuming
    /// variants flip `In`/`Out`, everything else is unchanged.
    #[must_use]
    pub fn reversed(&self) -> Self {
        match self {
            Self::SimpleIncidence { direction, roles } => Self::SimpleIncidence {
                direction: direction.reversed(),
                roles: roles.clone(),
            },
            Self::AggregationIncidence {
                direction,
                roles,
                kind,
            } => Self::AggregationIncidence {
                direction: direction.reversed(),
                roles: roles.clone(),
                kind: *kind,
            },
            other => other.clone(),
        }
    }
}

fn same_predicate(a: Option<&ElementPredicate>, b: Option<&ElementPredicate>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.same(b),
        _ => false,
    }
}

/// Direction + role test shared by the incidence-consuming variants. The
/// incidence must actually attach to `element`; `Any` would otherwise admit
/// foreign incidences.
fn incidence_matches(
    incidence: &Incidence,
    element: Element,
    direction: Direction,
    roles: Option<&RoleSet>,
) -> bool {
    if !incidence.connects(element) {
        return false;
    }
    let direction_ok = match direction {
        Direction::Any => true,
        Direction::Out => incidence.tail() == element,
        Direction::In => incidence.head() == element,
    };
    let role_ok = roles.is_none_or(|rs| incidence.role.as_ref().is_some_and(|r| rs.contains(r)));
    direction_ok && role_ok
}

impl Display for TransitionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Epsilon => write!(f, "eps"),
            Self::SimpleIncidence { direction, roles } => {
                write!(f, "inc[{direction}]")?;
                if let Some(roles) = roles {
                    write!(f, "{{{}}}", roles.iter().join(","))?;
                }
                Ok(())
            }
            Self::AggregationIncidence {
                direction, kind, ..
            } => match kind {
                Some(k) => write!(f, "agg[{direction},{k:?}]"),
                None => write!(f, "agg[{direction}]"),
            },
            Self::TypeRestriction { types, predicate } => {
                write!(f, "type-restr")?;
                if let Some(types) = types {
                    write!(f, "{{{}}}", types.iter().map(|t| t.0).join(","))?;
                }
                if predicate.is_some() {
                    write!(f, "+pred")?;
                }
                Ok(())
            }
            Self::ElementRestriction { elements } => {
                write!(f, "elem-restr({} elements)", elements.len())
            }
            Self::BoolExpression { .. } => write!(f, "bool-expr"),
            Self::IntermediateVertex { .. } => write!(f, "intermediate"),
        }
    }
}
