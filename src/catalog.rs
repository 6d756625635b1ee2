//! Program catalog models and the catalog collaborator trait.
//!
//! Programs are read-only from the core's perspective; the catalog itself
//! is an external collaborator behind `ProgramCatalog`. The in-memory
//! implementation ships for the CLI binary and tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::eligibility::EligibilityCriteria;
use crate::error::CatalogError;

/// One numbered step in a program's application procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationStep {
    pub number: u32,
    pub instruction: String,
}

/// A government program (scheme) definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramDefinition {
    pub id: String,
    pub name: String,
    pub category: String,
    /// Official description, simplified before display.
    pub description: String,
    pub criteria: EligibilityCriteria,
    pub steps: Vec<ApplicationStep>,
    /// Documents required when applying.
    pub documents: Vec<String>,
    /// Search keywords (lowercase).
    pub keywords: Vec<String>,
}

/// Validate that step numbers form the sequence `1..=N` with no gaps or
/// repeats, in order. Enforced before any step list is rendered.
pub fn validate_steps(program_id: &str, steps: &[ApplicationStep]) -> Result<(), CatalogError> {
    for (index, step) in steps.iter().enumerate() {
        let expected = index as u32 + 1;
        if step.number != expected {
            return Err(CatalogError::InvalidSteps {
                program: program_id.to_string(),
                reason: format!("expected step {expected}, found step {}", step.number),
            });
        }
    }
    Ok(())
}

/// Read-only program catalog collaborator.
#[async_trait]
pub trait ProgramCatalog: Send + Sync {
    /// Look up a program by id.
    async fn get_by_id(&self, id: &str) -> Result<Option<ProgramDefinition>, CatalogError>;

    /// Keyword search, best match first.
    async fn search(&self, keywords: &[String]) -> Result<Vec<ProgramDefinition>, CatalogError>;

    /// All programs in a category.
    async fn by_category(&self, category: &str) -> Result<Vec<ProgramDefinition>, CatalogError>;
}

/// In-memory catalog with keyword-overlap ranking.
pub struct InMemoryCatalog {
    programs: Vec<ProgramDefinition>,
}

impl InMemoryCatalog {
    pub fn new(programs: Vec<ProgramDefinition>) -> Self {
        Self { programs }
    }

    fn score(program: &ProgramDefinition, keywords: &[String]) -> usize {
        keywords
            .iter()
            .filter(|kw| {
                program.keywords.iter().any(|k| k == *kw)
                    || program.name.to_lowercase().contains(kw.as_str())
            })
            .count()
    }
}

#[async_trait]
impl ProgramCatalog for InMemoryCatalog {
    async fn get_by_id(&self, id: &str) -> Result<Option<ProgramDefinition>, CatalogError> {
        Ok(self.programs.iter().find(|p| p.id == id).cloned())
    }

    async fn search(&self, keywords: &[String]) -> Result<Vec<ProgramDefinition>, CatalogError> {
        let mut scored: Vec<(usize, &ProgramDefinition)> = self
            .programs
            .iter()
            .map(|p| (Self::score(p, keywords), p))
            .filter(|(score, _)| *score > 0)
            .collect();
        // Stable sort keeps catalog order among equal scores.
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored.into_iter().map(|(_, p)| p.clone()).collect())
    }

    async fn by_category(&self, category: &str) -> Result<Vec<ProgramDefinition>, CatalogError> {
        Ok(self
            .programs
            .iter()
            .filter(|p| p.category == category)
            .cloned()
            .collect())
    }
}
