//! Condition trees and the three-valued rule evaluator.
//!
//! Eligibility rules are closed tagged-variant trees, never free-form
//! expressions, so evaluation stays total and auditable. A leaf that
//! references a field absent from the context does not silently evaluate
//! to false; it yields a distinguishable `Missing` outcome carrying the
//! field name, and combinators union those sets so one evaluation pass
//! reports every field still needed to resolve the result.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Comparison operator for a leaf condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        };
        write!(f, "{s}")
    }
}

/// A typed value in an evaluation context or condition literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Int(i64),
    Number(Decimal),
    Text(String),
    Flag(bool),
}

impl FieldValue {
    /// Numeric view, if this value is numeric. Int and Number compare
    /// under the same natural ordering.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Int(i) => Some(Decimal::from(*i)),
            Self::Number(d) => Some(*d),
            Self::Text(_) | Self::Flag(_) => None,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Number(d) => write!(f, "{d}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Flag(b) => write!(f, "{b}"),
        }
    }
}

/// Read-only mapping from field name to typed value: the profile subset
/// relevant to evaluation.
pub type EvalContext = BTreeMap<String, FieldValue>;

/// Result of evaluating a condition against a context.
///
/// `Missing` carries every field that must be supplied before the
/// condition can resolve, not just the first one encountered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Match,
    NoMatch,
    Missing(BTreeSet<String>),
}

impl Outcome {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }

    fn negate(self) -> Self {
        match self {
            Self::Match => Self::NoMatch,
            Self::NoMatch => Self::Match,
            missing @ Self::Missing(_) => missing,
        }
    }
}

/// A boolean condition over profile fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    /// Leaf: compare `context[field]` to a literal.
    Compare {
        field: String,
        op: CompareOp,
        value: FieldValue,
    },
    /// AND over children.
    All { children: Vec<Condition> },
    /// OR over children.
    Any { children: Vec<Condition> },
    /// Negation of a single child.
    Not { child: Box<Condition> },
}

impl Condition {
    /// Convenience constructor for a leaf comparison.
    pub fn compare(field: impl Into<String>, op: CompareOp, value: FieldValue) -> Self {
        Self::Compare {
            field: field.into(),
            op,
            value,
        }
    }

    /// Evaluate against a context. Total: every input yields an `Outcome`.
    ///
    /// `Any` resolves `Match` as soon as one branch is true; missing fields
    /// in sibling branches are then irrelevant and not reported. `All`
    /// likewise resolves `NoMatch` when any branch is false. A node only
    /// reports `Missing` when the absent fields are genuinely needed to
    /// decide its value.
    pub fn evaluate(&self, context: &EvalContext) -> Outcome {
        match self {
            Self::Compare { field, op, value } => match context.get(field) {
                None => Outcome::Missing(BTreeSet::from([field.clone()])),
                Some(actual) => {
                    if compare_values(actual, *op, value) {
                        Outcome::Match
                    } else {
                        Outcome::NoMatch
                    }
                }
            },
            Self::All { children } => {
                let mut missing = BTreeSet::new();
                for child in children {
                    match child.evaluate(context) {
                        Outcome::NoMatch => return Outcome::NoMatch,
                        Outcome::Missing(fields) => missing.extend(fields),
                        Outcome::Match => {}
                    }
                }
                if missing.is_empty() {
                    Outcome::Match
                } else {
                    Outcome::Missing(missing)
                }
            }
            Self::Any { children } => {
                if children.is_empty() {
                    return Outcome::NoMatch;
                }
                let mut missing = BTreeSet::new();
                for child in children {
                    match child.evaluate(context) {
                        Outcome::Match => return Outcome::Match,
                        Outcome::Missing(fields) => missing.extend(fields),
                        Outcome::NoMatch => {}
                    }
                }
                if missing.is_empty() {
                    Outcome::NoMatch
                } else {
                    Outcome::Missing(missing)
                }
            }
            Self::Not { child } => child.evaluate(context).negate(),
        }
    }

    /// All field names referenced anywhere in this tree.
    pub fn referenced_fields(&self) -> BTreeSet<String> {
        let mut fields = BTreeSet::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields(&self, out: &mut BTreeSet<String>) {
        match self {
            Self::Compare { field, .. } => {
                out.insert(field.clone());
            }
            Self::All { children } | Self::Any { children } => {
                for child in children {
                    child.collect_fields(out);
                }
            }
            Self::Not { child } => child.collect_fields(out),
        }
    }
}

/// Compare two typed values. Numeric values compare under the natural
/// ordering on reals; text equality is exact (no case folding). Ordering
/// operators on non-numeric values and cross-type comparisons do not
/// match, and are logged since they indicate a malformed rule.
fn compare_values(actual: &FieldValue, op: CompareOp, expected: &FieldValue) -> bool {
    if let (Some(a), Some(b)) = (actual.as_decimal(), expected.as_decimal()) {
        return match op {
            CompareOp::Eq => a == b,
            CompareOp::Ne => a != b,
            CompareOp::Lt => a < b,
            CompareOp::Le => a <= b,
            CompareOp::Gt => a > b,
            CompareOp::Ge => a >= b,
        };
    }

    match (actual, expected, op) {
        (FieldValue::Text(a), FieldValue::Text(b), CompareOp::Eq) => a == b,
        (FieldValue::Text(a), FieldValue::Text(b), CompareOp::Ne) => a != b,
        (FieldValue::Flag(a), FieldValue::Flag(b), CompareOp::Eq) => a == b,
        (FieldValue::Flag(a), FieldValue::Flag(b), CompareOp::Ne) => a != b,
        _ => {
            warn!(
                actual = %actual,
                expected = %expected,
                op = %op,
                "unsupported comparison in rule; treating as no-match"
            );
            false
        }
    }
}
