//! Eligibility criteria and the criterion-by-criterion matcher.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::rules::{CompareOp, Condition, EvalContext, FieldValue, Outcome};

/// An extra rule-tree condition with a stable human-readable label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedCondition {
    pub label: String,
    pub condition: Condition,
}

/// Declarative per-program eligibility criteria. Immutable, owned by the
/// program catalog; read-only to the core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EligibilityCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_income: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_income: Option<Decimal>,
    /// Allowed occupations; membership is checked when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupations: Option<Vec<String>>,
    /// Extra condition trees beyond the standard bounds.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<NamedCondition>,
}

impl EligibilityCriteria {
    /// Whether no criterion is declared at all.
    pub fn is_empty(&self) -> bool {
        self.min_age.is_none()
            && self.max_age.is_none()
            && self.min_income.is_none()
            && self.max_income.is_none()
            && self.occupations.is_none()
            && self.extra.is_empty()
    }

    /// Synthesize labelled checks in declaration order. A criterion absent
    /// from the definition produces no check (it is vacuously matched, not
    /// missing).
    pub fn checks(&self) -> Vec<CriterionCheck> {
        let mut checks = Vec::new();
        if let Some(min) = self.min_age {
            checks.push(CriterionCheck {
                label: format!("minimum age {min}"),
                condition: Condition::compare("age", CompareOp::Ge, FieldValue::Int(min.into())),
            });
        }
        if let Some(max) = self.max_age {
            checks.push(CriterionCheck {
                label: format!("maximum age {max}"),
                condition: Condition::compare("age", CompareOp::Le, FieldValue::Int(max.into())),
            });
        }
        if let Some(min) = self.min_income {
            checks.push(CriterionCheck {
                label: format!("minimum income {min}"),
                condition: Condition::compare("income", CompareOp::Ge, FieldValue::Number(min)),
            });
        }
        if let Some(max) = self.max_income {
            checks.push(CriterionCheck {
                label: format!("maximum income {max}"),
                condition: Condition::compare("income", CompareOp::Le, FieldValue::Number(max)),
            });
        }
        if let Some(ref occupations) = self.occupations {
            checks.push(CriterionCheck {
                label: format!("occupation one of {}", occupations.join(", ")),
                condition: Condition::Any {
                    children: occupations
                        .iter()
                        .map(|occ| {
                            Condition::compare(
                                "occupation",
                                CompareOp::Eq,
                                FieldValue::Text(occ.clone()),
                            )
                        })
                        .collect(),
                },
            });
        }
        for named in &self.extra {
            checks.push(CriterionCheck {
                label: named.label.clone(),
                condition: named.condition.clone(),
            });
        }
        checks
    }
}

/// One labelled check synthesized from the criteria.
#[derive(Debug, Clone)]
pub struct CriterionCheck {
    pub label: String,
    pub condition: Condition,
}

/// Final reading of an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Eligible,
    Ineligible,
    /// One or more checks referenced fields the profile does not have;
    /// no verdict can be asserted until they are supplied.
    NeedsInformation,
}

/// Outcome of matching a profile against one program's criteria.
/// Constructed fresh per evaluation, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityResult {
    /// True only when every check matched and nothing is missing.
    pub eligible: bool,
    /// Labels of matched criteria, in declaration order.
    pub matched: Vec<String>,
    /// Labels of unmatched criteria, in declaration order.
    pub unmatched: Vec<String>,
    /// Fields that must be supplied before a verdict can be given.
    pub missing_information: Vec<String>,
    /// One sentence per unmatched criterion naming the failing value.
    pub explanation: String,
}

impl EligibilityResult {
    pub fn verdict(&self) -> Verdict {
        if !self.missing_information.is_empty() {
            Verdict::NeedsInformation
        } else if self.eligible {
            Verdict::Eligible
        } else {
            Verdict::Ineligible
        }
    }
}

/// Evaluates a profile context against program criteria, check by check.
#[derive(Debug, Clone, Copy, Default)]
pub struct EligibilityMatcher;

impl EligibilityMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate every check and classify each as matched, unmatched, or
    /// missing-field. Empty criteria are vacuously eligible; an absent
    /// profile (empty context) makes every referenced field missing.
    /// Checks that resolve despite other checks missing are still reported
    /// for transparency.
    pub fn evaluate(
        &self,
        context: &EvalContext,
        criteria: &EligibilityCriteria,
    ) -> EligibilityResult {
        let mut matched = Vec::new();
        let mut unmatched = Vec::new();
        let mut missing: Vec<String> = Vec::new();
        let mut sentences = Vec::new();

        for check in criteria.checks() {
            match check.condition.evaluate(context) {
                Outcome::Match => matched.push(check.label),
                Outcome::NoMatch => {
                    sentences.push(unmatched_sentence(&check, context));
                    unmatched.push(check.label);
                }
                Outcome::Missing(fields) => {
                    for field in fields {
                        if !missing.contains(&field) {
                            missing.push(field);
                        }
                    }
                }
            }
        }

        let eligible = unmatched.is_empty() && missing.is_empty();
        let explanation = if !missing.is_empty() {
            let mut parts = vec![format!(
                "More information is needed before a decision: {}.",
                missing.join(", ")
            )];
            parts.extend(sentences);
            parts.join(" ")
        } else if eligible {
            "All criteria are met.".to_string()
        } else {
            sentences.join(" ")
        };

        EligibilityResult {
            eligible,
            matched,
            unmatched,
            missing_information: missing,
            explanation,
        }
    }
}

/// Sentence naming the unmatched criterion and the profile value(s) that
/// failed it.
fn unmatched_sentence(check: &CriterionCheck, context: &EvalContext) -> String {
    let values: Vec<String> = check
        .condition
        .referenced_fields()
        .into_iter()
        .filter_map(|field| {
            context
                .get(&field)
                .map(|value| format!("your {field} is {value}"))
        })
        .collect();
    if values.is_empty() {
        format!("The criterion \"{}\" is not met.", check.label)
    } else {
        format!(
            "The criterion \"{}\" is not met ({}).",
            check.label,
            values.join(", ")
        )
    }
}
