//! Boolean trigger expression tree.
//!
//! A parsed trigger condition combines per-query match sets. The tree is
//! immutable and evaluated once per cycle against fresh match sets.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ParseErrorKind;

use super::lexer::is_query_name;
use super::matches::QueryMatchMap;

/// A node of a trigger condition.
///
/// `And` and `Or` are n-ary. Chains of the same operator are flattened by
/// the constructors, so `a AND b AND c` is a single `And` with three
/// operands. `Not` always has exactly one operand.
///
/// Deserialization applies the parser's rules: query names must be plain
/// identifiers other than a keyword, and `And`/`Or` need at least two
/// operands. Nested nodes of the same operator are flattened.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", try_from = "RawExpression")]
pub enum TriggerExpression {
    /// Documents matched by the named query.
    Query {
        /// Query identifier.
        name: String,
    },

    /// Documents matched by every operand.
    And {
        /// Operands (an empty list matches the whole universe).
        operands: Vec<TriggerExpression>,
    },

    /// Documents matched by at least one operand.
    Or {
        /// Operands (an empty list matches nothing).
        operands: Vec<TriggerExpression>,
    },

    /// Documents in the universe not matched by the operand.
    Not {
        /// Negated operand.
        operand: Box<TriggerExpression>,
    },
}

/// Wire shape of [`TriggerExpression`] before validation.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawExpression {
    Query { name: String },
    And { operands: Vec<TriggerExpression> },
    Or { operands: Vec<TriggerExpression> },
    Not { operand: Box<TriggerExpression> },
}

impl TryFrom<RawExpression> for TriggerExpression {
    type Error = ParseErrorKind;

    fn try_from(raw: RawExpression) -> Result<Self, Self::Error> {
        match raw {
            RawExpression::Query { name } => {
                if is_query_name(&name) {
                    Ok(Self::Query { name })
                } else {
                    Err(ParseErrorKind::InvalidQueryName { name })
                }
            }
            RawExpression::And { operands } => {
                check_arity("AND", &operands)?;
                Ok(Self::and(operands))
            }
            RawExpression::Or { operands } => {
                check_arity("OR", &operands)?;
                Ok(Self::or(operands))
            }
            RawExpression::Not { operand } => Ok(Self::Not { operand }),
        }
    }
}

fn check_arity(operator: &'static str, operands: &[TriggerExpression]) -> Result<(), ParseErrorKind> {
    if operands.len() < 2 {
        return Err(ParseErrorKind::TooFewOperands {
            operator,
            found: operands.len(),
        });
    }
    Ok(())
}

impl TriggerExpression {
    /// Creates a query reference.
    #[must_use]
    pub fn query(name: impl Into<String>) -> Self {
        Self::Query { name: name.into() }
    }

    /// Creates a conjunction, flattening nested conjunctions.
    ///
    /// A single operand is returned unchanged.
    #[must_use]
    pub fn and(operands: impl IntoIterator<Item = Self>) -> Self {
        let mut flat = Vec::new();
        for op in operands {
            match op {
                Self::And { operands } => flat.extend(operands),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            return flat.remove(0);
        }
        Self::And { operands: flat }
    }

    /// Creates a disjunction, flattening nested disjunctions.
    ///
    /// A single operand is returned unchanged.
    #[must_use]
    pub fn or(operands: impl IntoIterator<Item = Self>) -> Self {
        let mut flat = Vec::new();
        for op in operands {
            match op {
                Self::Or { operands } => flat.extend(operands),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            return flat.remove(0);
        }
        Self::Or { operands: flat }
    }

    /// Creates a negation.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(operand: Self) -> Self {
        Self::Not {
            operand: Box::new(operand),
        }
    }

    /// Evaluates the expression against one cycle's match sets.
    ///
    /// A query absent from `matches` contributes the empty set. `Not` is
    /// the complement relative to `matches.universe()`.
    #[must_use]
    pub fn evaluate(&self, matches: &QueryMatchMap) -> BTreeSet<String> {
        let universe = if self.needs_universe() {
            matches.universe()
        } else {
            BTreeSet::new()
        };
        self.evaluate_in(matches, &universe)
    }

    fn evaluate_in(&self, matches: &QueryMatchMap, universe: &BTreeSet<String>) -> BTreeSet<String> {
        match self {
            Self::Query { name } => matches.get(name).cloned().unwrap_or_default(),
            Self::And { operands } => {
                let mut iter = operands.iter();
                let Some(first) = iter.next() else {
                    return universe.clone();
                };
                let mut acc = first.evaluate_in(matches, universe);
                for op in iter {
                    if acc.is_empty() {
                        break;
                    }
                    let next = op.evaluate_in(matches, universe);
                    acc.retain(|doc| next.contains(doc));
                }
                acc
            }
            Self::Or { operands } => {
                let mut acc = BTreeSet::new();
                for op in operands {
                    acc.extend(op.evaluate_in(matches, universe));
                }
                acc
            }
            Self::Not { operand } => {
                let negated = operand.evaluate_in(matches, universe);
                universe.difference(&negated).cloned().collect()
            }
        }
    }

    // An empty `And` also resolves to the universe.
    fn needs_universe(&self) -> bool {
        match self {
            Self::Query { .. } => false,
            Self::Not { .. } => true,
            Self::And { operands } => operands.is_empty() || operands.iter().any(Self::needs_universe),
            Self::Or { operands } => operands.iter().any(Self::needs_universe),
        }
    }

    /// Distinct query names referenced by the expression, in sorted order.
    #[must_use]
    pub fn referenced_queries(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_queries(&mut out);
        out
    }

    fn collect_queries<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Self::Query { name } => {
                out.insert(name.as_str());
            }
            Self::And { operands } | Self::Or { operands } => {
                for op in operands {
                    op.collect_queries(out);
                }
            }
            Self::Not { operand } => operand.collect_queries(out),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Self::Or { .. } => 1,
            Self::And { .. } => 2,
            Self::Not { .. } | Self::Query { .. } => 3,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, parent_precedence: u8) -> fmt::Result {
        if self.precedence() <= parent_precedence && !matches!(self, Self::Query { .. }) {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

impl fmt::Display for TriggerExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query { name } => write!(f, "{name}"),
            Self::And { operands } | Self::Or { operands } => {
                let (keyword, precedence) = if matches!(self, Self::And { .. }) {
                    ("AND", 2)
                } else {
                    ("OR", 1)
                };
                for (i, op) in operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {keyword} ")?;
                    }
                    op.fmt_operand(f, precedence)?;
                }
                Ok(())
            }
            Self::Not { operand } => {
                write!(f, "NOT ")?;
                operand.fmt_operand(f, 2)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| (*s).to_string()).collect()
    }

    fn sample() -> QueryMatchMap {
        [
            ("a", vec!["d1", "d2", "d3"]),
            ("b", vec!["d2", "d3", "d4"]),
            ("c", vec!["d5"]),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_leaf_returns_query_set() {
        let expr = TriggerExpression::query("a");
        assert_eq!(expr.evaluate(&sample()), docs(&["d1", "d2", "d3"]));
    }

    #[test]
    fn test_absent_query_is_empty() {
        let expr = TriggerExpression::query("missing");
        assert!(expr.evaluate(&sample()).is_empty());
    }

    #[test]
    fn test_and_intersects() {
        let expr = TriggerExpression::and([TriggerExpression::query("a"), TriggerExpression::query("b")]);
        assert_eq!(expr.evaluate(&sample()), docs(&["d2", "d3"]));
    }

    #[test]
    fn test_or_unions() {
        let expr = TriggerExpression::or([TriggerExpression::query("a"), TriggerExpression::query("c")]);
        assert_eq!(expr.evaluate(&sample()), docs(&["d1", "d2", "d3", "d5"]));
    }

    #[test]
    fn test_not_is_relative_to_universe() {
        let expr = TriggerExpression::not(TriggerExpression::query("a"));
        assert_eq!(expr.evaluate(&sample()), docs(&["d4", "d5"]));
    }

    #[test]
    fn test_not_of_absent_query_is_whole_universe() {
        let expr = TriggerExpression::not(TriggerExpression::query("missing"));
        assert_eq!(expr.evaluate(&sample()), sample().universe());
    }

    #[test]
    fn test_constructors_flatten() {
        let expr = TriggerExpression::and([
            TriggerExpression::and([TriggerExpression::query("a"), TriggerExpression::query("b")]),
            TriggerExpression::query("c"),
        ]);
        let TriggerExpression::And { operands } = &expr else {
            panic!("expected conjunction");
        };
        assert_eq!(operands.len(), 3);
    }

    #[test]
    fn test_single_operand_collapses() {
        let expr = TriggerExpression::or([TriggerExpression::query("a")]);
        assert_eq!(expr, TriggerExpression::query("a"));
    }

    #[test]
    fn test_empty_operand_lists() {
        let and = TriggerExpression::And { operands: vec![] };
        let or = TriggerExpression::Or { operands: vec![] };
        assert_eq!(and.evaluate(&sample()), sample().universe());
        assert!(or.evaluate(&sample()).is_empty());
    }

    #[test]
    fn test_referenced_queries() {
        let expr = TriggerExpression::or([
            TriggerExpression::and([TriggerExpression::query("b"), TriggerExpression::query("a")]),
            TriggerExpression::not(TriggerExpression::query("b")),
        ]);
        assert_eq!(expr.referenced_queries().into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_display_parenthesizes_lower_precedence() {
        let expr = TriggerExpression::and([
            TriggerExpression::or([TriggerExpression::query("a"), TriggerExpression::query("b")]),
            TriggerExpression::not(TriggerExpression::and([
                TriggerExpression::query("c"),
                TriggerExpression::query("d"),
            ])),
        ]);
        assert_eq!(expr.to_string(), "(a OR b) AND NOT (c AND d)");
    }

    #[test]
    fn test_evaluate_is_repeatable() {
        let expr = TriggerExpression::or([
            TriggerExpression::query("c"),
            TriggerExpression::not(TriggerExpression::query("b")),
        ]);
        let m = sample();
        assert_eq!(expr.evaluate(&m), expr.evaluate(&m));

        let mut next_cycle = QueryMatchMap::new();
        next_cycle.insert("b", ["x1"]);
        next_cycle.insert("c", ["x2"]);
        assert_eq!(expr.evaluate(&next_cycle), docs(&["x2"]));
    }

    #[test]
    fn test_deserialize_flattens_nested_operators() {
        let json = r#"{"type":"or","operands":[
            {"type":"or","operands":[{"type":"query","name":"a"},{"type":"query","name":"b"}]},
            {"type":"query","name":"c"}]}"#;
        let expr: TriggerExpression = serde_json::from_str(json).unwrap();
        let TriggerExpression::Or { operands } = &expr else {
            panic!("expected disjunction");
        };
        assert_eq!(operands.len(), 3);
        assert_eq!(expr.to_string(), "a OR b OR c");
    }

    #[test]
    fn test_deserialize_rejects_single_operand() {
        let err = serde_json::from_str::<TriggerExpression>(
            r#"{"type":"and","operands":[{"type":"query","name":"a"}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("AND needs at least 2 operands, got 1"));
    }

    #[test]
    fn test_serialization_shape() {
        let expr = TriggerExpression::not(TriggerExpression::query("a"));
        let json = serde_json::to_value(&expr).unwrap();
        assert_eq!(json["type"], "not");
        assert_eq!(json["operand"]["type"], "query");
        assert_eq!(json["operand"]["name"], "a");
    }
}
