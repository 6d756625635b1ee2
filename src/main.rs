//! CLI REPL for local testing: reads queries from stdin, prints responses.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::io::{AsyncBufReadExt, BufReader};

use civic_assist::catalog::{ApplicationStep, InMemoryCatalog, ProgramDefinition};
use civic_assist::config::AssistantConfig;
use civic_assist::dialog::DialogEngine;
use civic_assist::eligibility::EligibilityCriteria;
use civic_assist::store::InMemoryProfileStore;
use civic_assist::text::{PassthroughSummarizer, PassthroughTranslator};

fn demo_programs() -> Vec<ProgramDefinition> {
    vec![
        ProgramDefinition {
            id: "farm-support".to_string(),
            name: "Farm Support Grant".to_string(),
            category: "agriculture".to_string(),
            description: "Annual income support for small and marginal farmers \
                          and agricultural laborers."
                .to_string(),
            criteria: EligibilityCriteria {
                min_age: Some(18),
                max_age: Some(60),
                max_income: Some(Decimal::from(10_000)),
                occupations: Some(vec!["farmer".to_string(), "laborer".to_string()]),
                ..Default::default()
            },
            steps: vec![
                ApplicationStep {
                    number: 1,
                    instruction: "Collect your land record and identity card.".to_string(),
                },
                ApplicationStep {
                    number: 2,
                    instruction: "Fill the application form at the local office.".to_string(),
                },
                ApplicationStep {
                    number: 3,
                    instruction: "Submit the form and keep the receipt.".to_string(),
                },
            ],
            documents: vec!["identity card".to_string(), "land record".to_string()],
            keywords: vec!["farm".to_string(), "farmer".to_string(), "crop".to_string()],
        },
        ProgramDefinition {
            id: "old-age-pension".to_string(),
            name: "Old Age Pension".to_string(),
            category: "welfare".to_string(),
            description: "Monthly pension for senior citizens below the income \
                          ceiling."
                .to_string(),
            criteria: EligibilityCriteria {
                min_age: Some(65),
                max_income: Some(Decimal::from(5_000)),
                ..Default::default()
            },
            steps: vec![
                ApplicationStep {
                    number: 1,
                    instruction: "Obtain an age certificate.".to_string(),
                },
                ApplicationStep {
                    number: 2,
                    instruction: "Apply at the welfare office with your bank details.".to_string(),
                },
            ],
            documents: vec!["age certificate".to_string(), "bank passbook".to_string()],
            keywords: vec![
                "pension".to_string(),
                "old".to_string(),
                "senior".to_string(),
            ],
        },
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AssistantConfig::default();
    let engine = DialogEngine::new(
        Arc::new(InMemoryProfileStore::new()),
        Arc::new(InMemoryCatalog::new(demo_programs())),
        Arc::new(PassthroughSummarizer),
        Arc::new(PassthroughTranslator::new(config.default_language.clone())),
        config,
    );

    eprintln!("Civic Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("Type a message and press Enter. /quit to exit.\n");
    eprint!("> ");

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            eprint!("> ");
            continue;
        }
        if line == "/quit" {
            break;
        }
        let response = engine.handle_turn("local-user", line).await;
        println!("\n{}\n", response.text);
        if !response.suggested_actions.is_empty() {
            println!("  [suggestions: {}]\n", response.suggested_actions.join(", "));
        }
        eprint!("> ");
    }

    Ok(())
}
