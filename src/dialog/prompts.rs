//! User-facing prompt and response text builders.
//!
//! Pure functions of their inputs; the engine owns all state. Text is
//! authored in the default language and translated downstream.

use crate::catalog::ProgramDefinition;
use crate::eligibility::{EligibilityResult, Verdict};
use crate::error::ValidationError;
use crate::profile::ProfileField;

/// First-contact greeting plus the first profile question.
pub fn greeting(field: ProfileField) -> String {
    format!(
        "Welcome! I can help you find government programs and check whether \
         you are eligible for them. First I need a few details. {}",
        field_question(field)
    )
}

/// The question asked for one profile field.
pub fn field_question(field: ProfileField) -> String {
    match field {
        ProfileField::Age => "What is your age in years?".to_string(),
        ProfileField::Income => "What is your monthly income?".to_string(),
        ProfileField::Occupation => "What is your occupation?".to_string(),
    }
}

/// Corrective re-prompt after a failed validation.
pub fn reprompt(field: ProfileField, error: &ValidationError) -> String {
    format!("Sorry, {error}. {}", field_question(field))
}

/// Acknowledgement once the profile is complete.
pub fn profile_complete() -> String {
    "Thanks, that's everything I need. You can ask about a program, check \
     your eligibility, or ask how to apply."
        .to_string()
}

/// Request to restate an unclear query.
pub fn clarification() -> String {
    "I'm not sure what you're asking for. Could you rephrase? For example: \
     \"tell me about the pension scheme\" or \"am I eligible for farm support?\""
        .to_string()
}

/// Capability summary for general queries.
pub fn general_help() -> String {
    "I can describe government programs, check whether you are eligible, \
     explain how to apply, and update your saved details."
        .to_string()
}

/// No program matched the query's keywords.
pub fn no_program_found() -> String {
    "I couldn't find a program matching that. Could you name the scheme, or \
     describe what kind of support you're looking for?"
        .to_string()
}

/// Scheme information rendering.
pub fn scheme_info(program: &ProgramDefinition, simplified: &str) -> String {
    format!("{}: {}", program.name, simplified)
}

/// Eligibility verdict rendering.
pub fn verdict(program: &ProgramDefinition, result: &EligibilityResult) -> String {
    match result.verdict() {
        Verdict::Eligible => format!(
            "Good news: based on your profile you appear to be eligible for {}.",
            program.name
        ),
        Verdict::Ineligible => format!(
            "Based on your profile you do not appear to be eligible for {}. {}",
            program.name, result.explanation
        ),
        Verdict::NeedsInformation => format!(
            "I need a little more information to check {} for you.",
            program.name
        ),
    }
}

/// Intro sentence when entering the missing-field detour, followed by the
/// first missing-field question.
pub fn missing_field_intro(
    program: &ProgramDefinition,
    result: &EligibilityResult,
    first: ProfileField,
) -> String {
    let mut text = format!(
        "To check {} I still need: {}.",
        program.name,
        result.missing_information.join(", ")
    );
    if !result.unmatched.is_empty() {
        text.push_str(&format!(
            " So far, these criteria are not met: {}.",
            result.unmatched.join("; ")
        ));
    }
    if !result.matched.is_empty() {
        text.push_str(&format!(
            " Already satisfied: {}.",
            result.matched.join("; ")
        ));
    }
    format!("{text} {}", field_question(first))
}

/// Application guidance rendering: numbered steps and required documents.
pub fn guidance(program: &ProgramDefinition) -> String {
    let mut lines = vec![format!("How to apply for {}:", program.name)];
    for step in &program.steps {
        lines.push(format!("{}. {}", step.number, step.instruction));
    }
    if !program.documents.is_empty() {
        lines.push(format!(
            "Documents you will need: {}.",
            program.documents.join(", ")
        ));
    }
    lines.join("\n")
}

/// Which field does the user want to change?
pub fn which_field() -> String {
    "Which detail would you like to update: your age, income, or occupation?"
        .to_string()
}

/// Confirmation after a profile field update.
pub fn field_updated(field: ProfileField) -> String {
    format!("Done: your {field} has been updated.")
}

/// Confirmation after total profile deletion.
pub fn profile_deleted() -> String {
    "Your profile has been deleted. If you come back, we'll start fresh."
        .to_string()
}

/// User-safe message for a failed turn. Names suggested actions; internal
/// detail stays in the logs.
pub fn error_recovery() -> String {
    "Sorry, something went wrong while handling that. Please try again in a \
     moment, or rephrase your question."
        .to_string()
}
