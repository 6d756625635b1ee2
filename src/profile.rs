//! Citizen profile model and per-field validation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::rules::{EvalContext, FieldValue};

/// A profile field the assistant can collect and validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Age,
    Income,
    Occupation,
}

impl ProfileField {
    /// Context/field-name key used in rule conditions and metadata.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::Income => "income",
            Self::Occupation => "occupation",
        }
    }

    /// Parse a field key back to a field, if it names one.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "age" => Some(Self::Age),
            "income" => Some(Self::Income),
            "occupation" => Some(Self::Occupation),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProfileField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Per-user attributes used for eligibility evaluation.
///
/// Created on first contact and mutated field-by-field as the user supplies
/// values. Deletion happens through the profile store and must be total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitizenProfile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub income: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    pub language_preference: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CitizenProfile {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            age: None,
            income: None,
            occupation: None,
            language_preference: "en".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a field currently holds a value.
    pub fn has(&self, field: ProfileField) -> bool {
        match field {
            ProfileField::Age => self.age.is_some(),
            ProfileField::Income => self.income.is_some(),
            ProfileField::Occupation => self.occupation.is_some(),
        }
    }

    /// Required fields not yet supplied, in collection order.
    pub fn missing_fields(&self, required: &[ProfileField]) -> Vec<ProfileField> {
        required.iter().copied().filter(|f| !self.has(*f)).collect()
    }

    /// Parse and validate a raw answer for `field`, storing it on success.
    /// The profile is untouched when validation fails.
    pub fn apply(&mut self, field: ProfileField, raw: &str) -> Result<(), ValidationError> {
        match field {
            ProfileField::Age => self.age = Some(parse_age(raw)?),
            ProfileField::Income => self.income = Some(parse_income(raw)?),
            ProfileField::Occupation => self.occupation = Some(parse_occupation(raw)?),
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Project the profile into a rule-evaluation context. Absent fields
    /// are absent from the context, which is what lets the evaluator
    /// report them as missing.
    pub fn eval_context(&self) -> EvalContext {
        let mut ctx = EvalContext::new();
        if let Some(age) = self.age {
            ctx.insert("age".to_string(), FieldValue::Int(i64::from(age)));
        }
        if let Some(income) = self.income {
            ctx.insert("income".to_string(), FieldValue::Number(income));
        }
        if let Some(ref occupation) = self.occupation {
            ctx.insert(
                "occupation".to_string(),
                FieldValue::Text(occupation.clone()),
            );
        }
        ctx
    }
}

/// Parse an age answer. Valid iff a whole number in 1..=150.
pub fn parse_age(raw: &str) -> Result<u32, ValidationError> {
    let trimmed = raw.trim();
    let value: i64 = trimmed.parse().map_err(|_| ValidationError::NotAnInteger {
        input: trimmed.to_string(),
    })?;
    if !(1..=150).contains(&value) {
        return Err(ValidationError::AgeOutOfRange { value });
    }
    Ok(value as u32)
}

/// Parse an income answer. Valid iff a non-negative number. Thousands
/// separators and a leading currency marker are tolerated.
pub fn parse_income(raw: &str) -> Result<Decimal, ValidationError> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    let value: Decimal = cleaned.parse().map_err(|_| ValidationError::NotANumber {
        input: raw.trim().to_string(),
    })?;
    if value < Decimal::ZERO {
        return Err(ValidationError::NegativeIncome);
    }
    Ok(value)
}

/// Parse an occupation answer. Valid iff non-empty after trimming.
pub fn parse_occupation(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyOccupation);
    }
    Ok(trimmed.to_lowercase())
}
