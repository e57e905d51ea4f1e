/*!
# Path Descriptions

Defines the AST of path descriptions and exposes a fluent API for
constructing them using a builder pattern. A path description is the
regex-like specification of an allowed sequence of incidence traversals;
it is normally produced by a query frontend, but can be assembled directly.

# Examples

```
use pathgrep::graph::Direction;
use pathgrep::query::{DescriptionBuilder, PathDescription};

let descr = DescriptionBuilder::new().edge(Direction::Out).build();
assert!(matches!(descr, PathDescription::Sequence(ref seq)
    if matches!(seq[0], PathDescription::Edge(_))));
```
*/
use std::fmt::{self, Display};
use std::rc::Rc;

use itertools::Itertools;

use crate::graph::{AggregationKind, Direction, Element, ElementSet, RoleSet, TypeId, TypeSet};

/// A boolean predicate over a graph element, attached to restriction and
/// bool-expression transitions.
///
/// The closure captures whatever context it needs (typically the data graph
/// behind an `Rc`); the element under test is the bound "this" value. Two
/// predicates are equal only if they are the same closure — restriction
/// symbols compare by reference, never structurally.
#[derive(Clone)]
pub struct ElementPredicate(Rc<dyn Fn(Element) -> bool>);

impl ElementPredicate {
    pub fn new(f: impl Fn(Element) -> bool + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Evaluates the predicate against `element`.
    #[must_use]
    pub fn eval(&self, element: Element) -> bool {
        (self.0)(element)
    }

    /// Reference identity, the equality notion used by `equal_symbol`.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ElementPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementPredicate({:p})", Rc::as_ptr(&self.0))
    }
}

impl PartialEq for ElementPredicate {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl Eq for ElementPredicate {}

/// One edge (or aggregation) traversal step: a direction plus optional
/// role/type/element/predicate restrictions.
///
/// A type restriction and an element restriction are mutually exclusive on
/// one step; the conflict is reported when the description is compiled.
#[derive(Debug, Clone)]
pub struct EdgeStep {
    pub direction: Direction,
    pub roles: Option<Rc<RoleSet>>,
    pub types: Option<Rc<TypeSet>>,
    pub elements: Option<Rc<ElementSet>>,
    pub predicate: Option<ElementPredicate>,
}

impl EdgeStep {
    #[must_use]
    pub const fn new(direction: Direction) -> Self {
        Self {
            direction,
            roles: None,
            types: None,
            elements: None,
            predicate: None,
        }
    }

    /// Restricts the step to incidences carrying one of the given roles.
    #[must_use]
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Rc<str>>,
    {
        self.roles = Some(Rc::new(roles.into_iter().map(Into::into).collect()));
        self
    }

    /// Restricts the traversed edge to one of the given types.
    #[must_use]
    pub fn with_types(mut self, types: impl IntoIterator<Item = TypeId>) -> Self {
        self.types = Some(Rc::new(types.into_iter().collect()));
        self
    }

    /// Restricts the traversed edge to a precomputed element result set.
    #[must_use]
    pub fn with_elements(mut self, elements: impl IntoIterator<Item = Element>) -> Self {
        self.elements = Some(Rc::new(elements.into_iter().collect()));
        self
    }

    /// Restricts the traversed edge with a boolean predicate.
    #[must_use]
    pub fn with_predicate(mut self, predicate: ElementPredicate) -> Self {
        self.predicate = Some(predicate);
        self
    }
}

/// The AST of a path description. Node kinds map 1:1 onto the NFA
/// composition operators on [`Nfa`](crate::query::Nfa).
#[derive(Debug, Clone)]
pub enum PathDescription {
    /// A single incidence traversal, e.g. `+>{role}`.
    Incidence {
        direction: Direction,
        roles: Option<Rc<RoleSet>>,
    },
    /// A whole-edge traversal (`-->`), compiled into two incidence steps.
    Edge(EdgeStep),
    /// An aggregation-edge traversal (`--<>`), optionally restricted to a
    /// shared or composite aggregation.
    Aggregation {
        step: EdgeStep,
        kind: Option<AggregationKind>,
    },
    /// Concatenation, e.g. `--> <--`.
    Sequence(Vec<PathDescription>),
    /// Alternation, e.g. `(--> | <--)`.
    Alternative(Vec<PathDescription>),
    /// Zero-or-one occurrence, e.g. `[-->]`.
    Optional(Box<PathDescription>),
    /// Zero-or-more iteration, e.g. `-->*`.
    Star(Box<PathDescription>),
    /// One-or-more iteration, e.g. `-->+`.
    Plus(Box<PathDescription>),
    /// Exactly-n repetition, e.g. `-->^3`. `n == 0` is malformed and
    /// rejected at compile time.
    Exponent(Box<PathDescription>, u32),
    /// Backward traversal, e.g. `p^T`.
    Transposition(Box<PathDescription>),
    /// Two sub-descriptions joined through a restricted midpoint element.
    IntermediateVertex {
        left: Box<PathDescription>,
        check: ElementPredicate,
        right: Box<PathDescription>,
    },
    /// Restriction on the element a path starts at.
    StartRestriction {
        inner: Box<PathDescription>,
        types: Option<Rc<TypeSet>>,
        predicate: Option<ElementPredicate>,
    },
    /// Restriction on the element a path ends at.
    GoalRestriction {
        inner: Box<PathDescription>,
        types: Option<Rc<TypeSet>>,
        predicate: Option<ElementPredicate>,
    },
}

impl PathDescription {
    /// Wraps `self` in parentheses when it binds weaker than a postfix
    /// operator applied to it.
    fn fmt_atom(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequence(items) if items.len() > 1 => write!(f, "({self})"),
            Self::Alternative(_) | Self::IntermediateVertex { .. } => write!(f, "({self})"),
            _ => write!(f, "{self}"),
        }
    }
}

fn fmt_roles(f: &mut fmt::Formatter<'_>, roles: Option<&Rc<RoleSet>>) -> fmt::Result {
    if let Some(roles) = roles {
        write!(f, "{{{}}}", roles.iter().join(","))?;
    }
    Ok(())
}

impl Display for PathDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incidence { direction, roles } => {
                match direction {
                    Direction::Out => write!(f, "+>")?,
                    Direction::In => write!(f, "<+")?,
                    Direction::Any => write!(f, "<+>")?,
                }
                fmt_roles(f, roles.as_ref())
            }
            Self::Edge(step) => {
                match step.direction {
                    Direction::Out => write!(f, "-->")?,
                    Direction::In => write!(f, "<--")?,
                    Direction::Any => write!(f, "<->")?,
                }
                fmt_roles(f, step.roles.as_ref())?;
                if step.types.is_some() || step.elements.is_some() || step.predicate.is_some() {
                    write!(f, "[..]")?;
                }
                Ok(())
            }
            Self::Aggregation { step, kind } => {
                match step.direction {
                    Direction::Out => write!(f, "--<>")?,
                    Direction::In => write!(f, "<>--")?,
                    Direction::Any => write!(f, "<>--<>")?,
                }
                fmt_roles(f, step.roles.as_ref())?;
                if let Some(kind) = kind {
                    write!(f, "[{kind:?}]")?;
                }
                Ok(())
            }
            Self::Sequence(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    match item {
                        Self::Alternative(_) => write!(f, "({item})")?,
                        _ => write!(f, "{item}")?,
                    }
                }
                Ok(())
            }
            Self::Alternative(items) => {
                write!(f, "{}", items.iter().join(" | "))
            }
            Self::Optional(inner) => write!(f, "[{inner}]"),
            Self::Star(inner) => {
                inner.fmt_atom(f)?;
                write!(f, "*")
            }
            Self::Plus(inner) => {
                inner.fmt_atom(f)?;
                write!(f, "+")
            }
            Self::Exponent(inner, n) => {
                inner.fmt_atom(f)?;
                write!(f, "^{n}")
            }
            Self::Transposition(inner) => {
                inner.fmt_atom(f)?;
                write!(f, "^T")
            }
            Self::IntermediateVertex { left, right, .. } => {
                write!(f, "{left} @ {right}")
            }
            Self::StartRestriction { inner, .. } => write!(f, "{{..}} & {inner}"),
            Self::GoalRestriction { inner, .. } => write!(f, "{inner} & {{..}}"),
        }
    }
}

/// Builder for assembling path descriptions step by step.
///
/// Postfix modifiers (`optional`, `star`, `plus`, `times`, `transpose`)
/// apply to the most recently added step, mirroring how they bind in the
/// written query syntax.
#[derive(Debug, Default)]
pub struct DescriptionBuilder {
    sequence: Vec<PathDescription>,
    intermediates: Vec<(Vec<PathDescription>, ElementPredicate)>,
    start_restriction: Option<(Option<Rc<TypeSet>>, Option<ElementPredicate>)>,
    goal_restriction: Option<(Option<Rc<TypeSet>>, Option<ElementPredicate>)>,
}

impl DescriptionBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a single incidence traversal.
    ///
    /// # Examples
    /// ```
    /// use pathgrep::graph::Direction;
    /// use pathgrep::query::{DescriptionBuilder, PathDescription};
    ///
    /// let descr = DescriptionBuilder::new().incidence(Direction::Out).build();
    /// assert!(matches!(descr, PathDescription::Sequence(ref seq)
    ///     if matches!(seq[0], PathDescription::Incidence { .. })));
    /// ```
    #[must_use]
    pub fn incidence(mut self, direction: Direction) -> Self {
        self.sequence.push(PathDescription::Incidence {
            direction,
            roles: None,
        });
        self
    }

    /// Adds a single incidence traversal restricted to the given roles.
    #[must_use]
    pub fn incidence_with_roles<I, S>(mut self, direction: Direction, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Rc<str>>,
    {
        self.sequence.push(PathDescription::Incidence {
            direction,
            roles: Some(Rc::new(roles.into_iter().map(Into::into).collect())),
        });
        self
    }

    /// Adds an unrestricted whole-edge traversal.
    ///
    /// # Examples
    /// ```
    /// use pathgrep::graph::Direction;
    /// use pathgrep::query::DescriptionBuilder;
    ///
    /// // The description `--> -->`: two forward edge traversals.
    /// let descr = DescriptionBuilder::new()
    ///     .edge(Direction::Out)
    ///     .edge(Direction::Out)
    ///     .build();
    /// assert_eq!(descr.to_string(), "--> -->");
    /// ```
    #[must_use]
    pub fn edge(mut self, direction: Direction) -> Self {
        self.sequence
            .push(PathDescription::Edge(EdgeStep::new(direction)));
        self
    }

    /// Adds an edge traversal with explicit restrictions.
    #[must_use]
    pub fn edge_step(mut self, step: EdgeStep) -> Self {
        self.sequence.push(PathDescription::Edge(step));
        self
    }

    /// Adds an aggregation-edge traversal.
    #[must_use]
    pub fn aggregation(mut self, direction: Direction, kind: Option<AggregationKind>) -> Self {
        self.sequence.push(PathDescription::Aggregation {
            step: EdgeStep::new(direction),
            kind,
        });
        self
    }

    /// Adds an alternation over complete sub-descriptions.
    #[must_use]
    pub fn alternative(mut self, branches: Vec<PathDescription>) -> Self {
        self.sequence.push(PathDescription::Alternative(branches));
        self
    }

    /// Wraps the last step in an optional.
    ///
    /// # Examples
    /// ```
    /// use pathgrep::graph::Direction;
    /// use pathgrep::query::{DescriptionBuilder, PathDescription};
    ///
    /// let descr = DescriptionBuilder::new().edge(Direction::Out).optional().build();
    /// assert!(matches!(descr, PathDescription::Sequence(ref seq)
    ///     if matches!(seq[0], PathDescription::Optional(_))));
    /// ```
    #[must_use]
    pub fn optional(mut self) -> Self {
        let inner = self.take_last();
        self.sequence
            .push(PathDescription::Optional(Box::new(inner)));
        self
    }

    /// Wraps the last step in a zero-or-more iteration.
    #[must_use]
    pub fn star(mut self) -> Self {
        let inner = self.take_last();
        self.sequence.push(PathDescription::Star(Box::new(inner)));
        self
    }

    /// Wraps the last step in a one-or-more iteration.
    #[must_use]
    pub fn plus(mut self) -> Self {
        let inner = self.take_last();
        self.sequence.push(PathDescription::Plus(Box::new(inner)));
        self
    }

    /// Repeats the last step exactly `n` times.
    ///
    /// # Examples
    /// ```
    /// use pathgrep::graph::Direction;
    /// use pathgrep::query::{DescriptionBuilder, PathDescription};
    ///
    /// let descr = DescriptionBuilder::new().edge(Direction::Out).times(3).build();
    /// assert!(matches!(descr, PathDescription::Sequence(ref seq)
    ///     if matches!(seq[0], PathDescription::Exponent(_, 3))));
    /// ```
    #[must_use]
    pub fn times(mut self, n: u32) -> Self {
        let inner = self.take_last();
        self.sequence
            .push(PathDescription::Exponent(Box::new(inner), n));
        self
    }

    /// Transposes the last step (backward traversal).
    #[must_use]
    pub fn transpose(mut self) -> Self {
        let inner = self.take_last();
        self.sequence
            .push(PathDescription::Transposition(Box::new(inner)));
        self
    }

    /// Ends the current sub-description at an intermediate element that must
    /// satisfy `check`; subsequent steps build the continuation.
    #[must_use]
    pub fn intermediate_vertex(mut self, check: ElementPredicate) -> Self {
        let left = std::mem::take(&mut self.sequence);
        self.intermediates.push((left, check));
        self
    }

    /// Restricts the element paths start at.
    #[must_use]
    pub fn start_restriction(
        mut self,
        types: Option<impl IntoIterator<Item = TypeId>>,
        predicate: Option<ElementPredicate>,
    ) -> Self {
        let types = types.map(|t| Rc::new(t.into_iter().collect()));
        self.start_restriction = Some((types, predicate));
        self
    }

    /// Restricts the element paths end at.
    #[must_use]
    pub fn goal_restriction(
        mut self,
        types: Option<impl IntoIterator<Item = TypeId>>,
        predicate: Option<ElementPredicate>,
    ) -> Self {
        let types = types.map(|t| Rc::new(t.into_iter().collect()));
        self.goal_restriction = Some((types, predicate));
        self
    }

    /// Assembles the built description.
    #[must_use]
    pub fn build(mut self) -> PathDescription {
        let mut descr = PathDescription::Sequence(std::mem::take(&mut self.sequence));
        while let Some((left, check)) = self.intermediates.pop() {
            descr = PathDescription::IntermediateVertex {
                left: Box::new(PathDescription::Sequence(left)),
                check,
                right: Box::new(descr),
            };
        }
        if let Some((types, predicate)) = self.goal_restriction.take() {
            descr = PathDescription::GoalRestriction {
                inner: Box::new(descr),
                types,
                predicate,
            };
        }
        if let Some((types, predicate)) = self.start_restriction.take() {
            descr = PathDescription::StartRestriction {
                inner: Box::new(descr),
                types,
                predicate,
            };
        }
        descr
    }

    /// Pops the step a postfix modifier applies to; an empty builder yields
    /// an empty sequence, matching how modifiers on nothing parse.
    fn take_last(&mut self) -> PathDescription {
        self.sequence
            .pop()
            .unwrap_or(PathDescription::Sequence(Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_sequence() {
        let descr = DescriptionBuilder::new()
            .edge(Direction::Out)
            .edge(Direction::In)
            .build();
        match descr {
            PathDescription::Sequence(seq) => assert_eq!(seq.len(), 2),
            other => panic!("expected sequence, got {other:?}"),
        }
    }

    #[test]
    fn postfix_modifiers_wrap_last_step() {
        let descr = DescriptionBuilder::new()
            .edge(Direction::Out)
            .edge(Direction::Out)
            .star()
            .build();
        match descr {
            PathDescription::Sequence(seq) => {
                assert!(matches!(seq[0], PathDescription::Edge(_)));
                assert!(matches!(seq[1], PathDescription::Star(_)));
            }
            other => panic!("expected sequence, got {other:?}"),
        }
    }

    #[test]
    fn intermediate_vertex_splits_description() {
        let check = ElementPredicate::new(|_| true);
        let descr = DescriptionBuilder::new()
            .edge(Direction::Out)
            .intermediate_vertex(check)
            .edge(Direction::Out)
            .build();
        assert!(matches!(descr, PathDescription::IntermediateVertex { .. }));
    }

    #[test]
    fn restrictions_wrap_whole_description() {
        let descr = DescriptionBuilder::new()
            .edge(Direction::Out)
            .start_restriction(Some([TypeId(0)]), None)
            .goal_restriction(Some([TypeId(1)]), None)
            .build();
        match descr {
            PathDescription::StartRestriction { inner, .. } => {
                assert!(matches!(*inner, PathDescription::GoalRestriction { .. }));
            }
            other => panic!("expected start restriction on the outside, got {other:?}"),
        }
    }

    #[test]
    fn predicate_equality_is_by_identity() {
        let p = ElementPredicate::new(|_| true);
        let q = ElementPredicate::new(|_| true);
        assert_eq!(p, p.clone());
        assert_ne!(p, q);
    }

    #[test]
    fn display_renders_arrows() {
        let descr = DescriptionBuilder::new()
            .edge(Direction::Out)
            .edge(Direction::Any)
            .star()
            .build();
        assert_eq!(descr.to_string(), "--> <->*");
    }

    #[test]
    fn display_renders_roles_and_optionals() {
        let descr = DescriptionBuilder::new()
            .edge_step(EdgeStep::new(Direction::Out).with_roles(["r1"]))
            .edge(Direction::In)
            .optional()
            .build();
        assert_eq!(descr.to_string(), "-->{r1} [<--]");
    }
}
