//! End-to-end turn scenarios through the dialog engine with in-memory
//! collaborators.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal_macros::dec;
use serde_json::json;

use civic_assist::catalog::{
    ApplicationStep, InMemoryCatalog, ProgramCatalog, ProgramDefinition,
};
use civic_assist::config::AssistantConfig;
use civic_assist::dialog::DialogEngine;
use civic_assist::eligibility::EligibilityCriteria;
use civic_assist::error::CatalogError;
use civic_assist::profile::{CitizenProfile, ProfileField};
use civic_assist::store::{InMemoryProfileStore, ProfileStore};
use civic_assist::text::{PassthroughSummarizer, PassthroughTranslator};

fn farm_support() -> ProgramDefinition {
    ProgramDefinition {
        id: "farm-support".into(),
        name: "Farm Support Grant".into(),
        category: "agriculture".into(),
        description: "Annual income support for small farmers.".into(),
        criteria: EligibilityCriteria {
            min_age: Some(18),
            max_age: Some(60),
            max_income: Some(dec!(10000)),
            occupations: Some(vec!["farmer".into(), "laborer".into()]),
            ..Default::default()
        },
        steps: vec![
            ApplicationStep {
                number: 1,
                instruction: "Collect your identity card.".into(),
            },
            ApplicationStep {
                number: 2,
                instruction: "Fill the form at the local office.".into(),
            },
        ],
        documents: vec!["identity card".into()],
        keywords: vec!["farm".into(), "support".into(), "crop".into()],
    }
}

fn old_age_pension() -> ProgramDefinition {
    ProgramDefinition {
        id: "old-age-pension".into(),
        name: "Old Age Pension".into(),
        category: "welfare".into(),
        description: "Monthly pension for senior citizens.".into(),
        criteria: EligibilityCriteria {
            min_age: Some(65),
            ..Default::default()
        },
        steps: vec![ApplicationStep {
            number: 1,
            instruction: "Apply at the welfare office.".into(),
        }],
        documents: vec![],
        keywords: vec!["pension".into(), "old".into()],
    }
}

fn engine_with(
    store: Arc<InMemoryProfileStore>,
    catalog: Arc<dyn ProgramCatalog>,
    config: AssistantConfig,
) -> DialogEngine {
    let language = config.default_language.clone();
    DialogEngine::new(
        store,
        catalog,
        Arc::new(PassthroughSummarizer),
        Arc::new(PassthroughTranslator::new(language)),
        config,
    )
}

fn default_engine(store: Arc<InMemoryProfileStore>) -> DialogEngine {
    engine_with(
        store,
        Arc::new(InMemoryCatalog::new(vec![farm_support(), old_age_pension()])),
        AssistantConfig::default(),
    )
}

async fn seed_complete_profile(store: &InMemoryProfileStore, id: &str) {
    let mut profile = CitizenProfile::new(id);
    profile.apply(ProfileField::Age, "20").unwrap();
    profile.apply(ProfileField::Income, "5000").unwrap();
    profile.apply(ProfileField::Occupation, "farmer").unwrap();
    store.save(&profile).await.unwrap();
}

// ── Profile collection ──────────────────────────────────────────────

#[tokio::test]
async fn first_contact_greets_and_collects_profile_in_order() {
    let store = Arc::new(InMemoryProfileStore::new());
    let engine = default_engine(Arc::clone(&store));

    let r1 = engine.handle_turn("u1", "hello").await;
    assert!(r1.needs_input);
    assert_eq!(r1.meta("state").unwrap(), "collecting_profile");
    assert_eq!(r1.meta("pending_field").unwrap(), "age");

    let r2 = engine.handle_turn("u1", "20").await;
    assert_eq!(r2.meta("pending_field").unwrap(), "income");

    let r3 = engine.handle_turn("u1", "5000").await;
    assert_eq!(r3.meta("pending_field").unwrap(), "occupation");

    let r4 = engine.handle_turn("u1", "farmer").await;
    assert_eq!(r4.meta("state").unwrap(), "ready");
    assert!(!r4.needs_input);

    let saved = store.load("u1").await.unwrap().unwrap();
    assert_eq!(saved.age, Some(20));
    assert_eq!(saved.income, Some(dec!(5000)));
    assert_eq!(saved.occupation.as_deref(), Some("farmer"));
}

#[tokio::test]
async fn unparseable_age_reprompts_without_advancing() {
    let store = Arc::new(InMemoryProfileStore::new());
    let engine = default_engine(Arc::clone(&store));

    engine.handle_turn("u1", "hi").await;
    let reprompt = engine.handle_turn("u1", "thirty").await;
    assert!(reprompt.needs_input);
    assert_eq!(reprompt.meta("pending_field").unwrap(), "age");
    assert!(reprompt.meta("validation_error").is_some());

    // Still asking for age, and nothing was persisted for it.
    let profile = store.load("u1").await.unwrap();
    assert!(profile.is_none() || profile.unwrap().age.is_none());

    let next = engine.handle_turn("u1", "30").await;
    assert_eq!(next.meta("pending_field").unwrap(), "income");
}

#[tokio::test]
async fn out_of_range_age_is_rejected() {
    let engine = default_engine(Arc::new(InMemoryProfileStore::new()));
    engine.handle_turn("u1", "hi").await;
    let r = engine.handle_turn("u1", "151").await;
    assert_eq!(r.meta("pending_field").unwrap(), "age");
    let r = engine.handle_turn("u1", "0").await;
    assert_eq!(r.meta("pending_field").unwrap(), "age");
}

// ── Intent routing ──────────────────────────────────────────────────

#[tokio::test]
async fn low_confidence_query_requests_clarification() {
    let store = Arc::new(InMemoryProfileStore::new());
    seed_complete_profile(&store, "u1").await;
    let engine = default_engine(store);

    let vague = engine.handle_turn("u1", "details").await;
    assert!(vague.needs_input);
    assert_eq!(vague.meta("state").unwrap(), "awaiting_clarification");

    // The next message is a fresh query.
    let routed = engine.handle_turn("u1", "tell me about the farm support grant").await;
    assert_eq!(routed.meta("state").unwrap(), "ready");
    assert_eq!(routed.meta("program_id").unwrap(), "farm-support");
    assert_eq!(routed.meta("disclaimer").unwrap(), &json!(true));
}

#[tokio::test]
async fn general_query_gets_capability_summary() {
    let store = Arc::new(InMemoryProfileStore::new());
    seed_complete_profile(&store, "u1").await;
    let engine = default_engine(store);

    let r = engine.handle_turn("u1", "hello, what can you do?").await;
    assert_eq!(r.meta("state").unwrap(), "ready");
    assert!(r.meta("disclaimer").is_none());
}

#[tokio::test]
async fn unknown_program_asks_for_the_name() {
    let store = Arc::new(InMemoryProfileStore::new());
    seed_complete_profile(&store, "u1").await;
    let engine = default_engine(store);

    let r = engine.handle_turn("u1", "am I eligible for the xyzzy allowance?").await;
    assert!(r.needs_input);
    assert!(r.meta("program_id").is_none());
}

// ── Eligibility ─────────────────────────────────────────────────────

#[tokio::test]
async fn eligible_verdict_is_tagged_with_disclaimer() {
    let store = Arc::new(InMemoryProfileStore::new());
    seed_complete_profile(&store, "u1").await;
    let engine = default_engine(store);

    let r = engine.handle_turn("u1", "am I eligible for farm support?").await;
    assert_eq!(r.meta("eligible").unwrap(), &json!(true));
    assert_eq!(r.meta("disclaimer").unwrap(), &json!(true));
    assert!(r.text.contains("Farm Support Grant"));
}

#[tokio::test]
async fn ineligible_verdict_names_the_failed_criterion() {
    let store = Arc::new(InMemoryProfileStore::new());
    seed_complete_profile(&store, "u1").await; // age 20
    let engine = default_engine(store);

    let r = engine.handle_turn("u1", "do I qualify for the old age pension?").await;
    assert_eq!(r.meta("eligible").unwrap(), &json!(false));
    assert!(r.text.contains("minimum age 65"));
    assert!(r.text.contains("your age is 20"));
}

#[tokio::test]
async fn missing_field_detour_collects_then_delivers_verdict() {
    // Only age and occupation are collected up front; income is left to
    // the missing-field detour.
    let store = Arc::new(InMemoryProfileStore::new());
    let config = AssistantConfig {
        required_fields: vec![ProfileField::Age, ProfileField::Occupation],
        ..Default::default()
    };
    let engine = engine_with(
        Arc::clone(&store),
        Arc::new(InMemoryCatalog::new(vec![farm_support()])),
        config,
    );

    engine.handle_turn("u1", "hi").await;
    engine.handle_turn("u1", "20").await;
    engine.handle_turn("u1", "farmer").await;

    let detour = engine.handle_turn("u1", "am I eligible for farm support?").await;
    assert!(detour.needs_input);
    assert_eq!(detour.meta("state").unwrap(), "awaiting_missing_field");
    assert_eq!(detour.meta("pending_field").unwrap(), "income");
    assert_eq!(detour.meta("missing_information").unwrap(), &json!(["income"]));

    // Invalid answer re-prompts without losing the detour.
    let bad = engine.handle_turn("u1", "lots").await;
    assert_eq!(bad.meta("state").unwrap(), "awaiting_missing_field");
    assert_eq!(bad.meta("pending_field").unwrap(), "income");

    let verdict = engine.handle_turn("u1", "5000").await;
    assert_eq!(verdict.meta("state").unwrap(), "ready");
    assert_eq!(verdict.meta("eligible").unwrap(), &json!(true));
    assert_eq!(verdict.meta("disclaimer").unwrap(), &json!(true));

    let saved = store.load("u1").await.unwrap().unwrap();
    assert_eq!(saved.income, Some(dec!(5000)));
}

// ── Application guidance ────────────────────────────────────────────

#[tokio::test]
async fn guidance_renders_numbered_steps_and_documents() {
    let store = Arc::new(InMemoryProfileStore::new());
    seed_complete_profile(&store, "u1").await;
    let engine = default_engine(store);

    let r = engine.handle_turn("u1", "how do I apply for farm support?").await;
    assert_eq!(r.meta("program_id").unwrap(), "farm-support");
    assert!(r.text.contains("1. Collect your identity card."));
    assert!(r.text.contains("2. Fill the form at the local office."));
    assert!(r.text.contains("identity card"));
}

#[tokio::test]
async fn gapped_steps_are_never_rendered() {
    let mut broken = farm_support();
    broken.steps = vec![
        ApplicationStep {
            number: 1,
            instruction: "First.".into(),
        },
        ApplicationStep {
            number: 3,
            instruction: "Third.".into(),
        },
    ];
    let store = Arc::new(InMemoryProfileStore::new());
    seed_complete_profile(&store, "u1").await;
    let engine = engine_with(
        store,
        Arc::new(InMemoryCatalog::new(vec![broken])),
        AssistantConfig::default(),
    );

    let r = engine.handle_turn("u1", "how do I apply for farm support?").await;
    assert_eq!(r.meta("error").unwrap(), &json!(true));
    assert!(r.suggested_actions.contains(&"retry".to_string()));
    assert!(!r.text.contains("Third."));
}

// ── Profile updates and deletion ────────────────────────────────────

#[tokio::test]
async fn inline_profile_update_applies_immediately() {
    let store = Arc::new(InMemoryProfileStore::new());
    seed_complete_profile(&store, "u1").await;
    let engine = default_engine(Arc::clone(&store));

    let r = engine.handle_turn("u1", "update my income to 4000").await;
    assert_eq!(r.meta("state").unwrap(), "ready");
    assert!(!r.needs_input);

    let saved = store.load("u1").await.unwrap().unwrap();
    assert_eq!(saved.income, Some(dec!(4000)));
}

#[tokio::test]
async fn update_without_value_reenters_field_collection() {
    let store = Arc::new(InMemoryProfileStore::new());
    seed_complete_profile(&store, "u1").await;
    let engine = default_engine(Arc::clone(&store));

    let ask = engine.handle_turn("u1", "update my age").await;
    assert!(ask.needs_input);
    assert_eq!(ask.meta("state").unwrap(), "collecting_profile");
    assert_eq!(ask.meta("pending_field").unwrap(), "age");

    let bad = engine.handle_turn("u1", "two hundred").await;
    assert_eq!(bad.meta("pending_field").unwrap(), "age");

    let done = engine.handle_turn("u1", "35").await;
    assert_eq!(done.meta("state").unwrap(), "ready");
    assert_eq!(store.load("u1").await.unwrap().unwrap().age, Some(35));
}

#[tokio::test]
async fn deletion_is_total_and_resets_the_session() {
    let store = Arc::new(InMemoryProfileStore::new());
    seed_complete_profile(&store, "u1").await;
    let engine = default_engine(Arc::clone(&store));

    let r = engine.handle_turn("u1", "please delete my profile").await;
    assert_eq!(r.meta("state").unwrap(), "new");
    assert!(store.load("u1").await.unwrap().is_none());

    // Next contact starts over with collection.
    let fresh = engine.handle_turn("u1", "hello").await;
    assert_eq!(fresh.meta("state").unwrap(), "collecting_profile");
    assert_eq!(fresh.meta("pending_field").unwrap(), "age");
}

// ── Failure handling ────────────────────────────────────────────────

struct FailingCatalog;

#[async_trait]
impl ProgramCatalog for FailingCatalog {
    async fn get_by_id(&self, _id: &str) -> Result<Option<ProgramDefinition>, CatalogError> {
        Err(CatalogError::Unavailable("catalog offline".into()))
    }

    async fn search(&self, _keywords: &[String]) -> Result<Vec<ProgramDefinition>, CatalogError> {
        Err(CatalogError::Unavailable("catalog offline".into()))
    }

    async fn by_category(&self, _category: &str) -> Result<Vec<ProgramDefinition>, CatalogError> {
        Err(CatalogError::Unavailable("catalog offline".into()))
    }
}

/// Searches resolve, but the by-id lookup is down.
struct LookupFailsCatalog {
    inner: InMemoryCatalog,
}

#[async_trait]
impl ProgramCatalog for LookupFailsCatalog {
    async fn get_by_id(&self, _id: &str) -> Result<Option<ProgramDefinition>, CatalogError> {
        Err(CatalogError::Unavailable("catalog offline".into()))
    }

    async fn search(&self, keywords: &[String]) -> Result<Vec<ProgramDefinition>, CatalogError> {
        self.inner.search(keywords).await
    }

    async fn by_category(&self, category: &str) -> Result<Vec<ProgramDefinition>, CatalogError> {
        self.inner.by_category(category).await
    }
}

#[tokio::test]
async fn failed_turn_does_not_persist_profile_changes() {
    let store = Arc::new(InMemoryProfileStore::new());
    let config = AssistantConfig {
        required_fields: vec![ProfileField::Age, ProfileField::Occupation],
        ..Default::default()
    };
    let engine = engine_with(
        Arc::clone(&store),
        Arc::new(LookupFailsCatalog {
            inner: InMemoryCatalog::new(vec![farm_support()]),
        }),
        config,
    );

    engine.handle_turn("u1", "hi").await;
    engine.handle_turn("u1", "20").await;
    engine.handle_turn("u1", "farmer").await;

    let detour = engine.handle_turn("u1", "am I eligible for farm support?").await;
    assert_eq!(detour.meta("state").unwrap(), "awaiting_missing_field");

    // The answer mutates the profile, then the verdict lookup fails. The
    // store write must roll back along with the session.
    let failed = engine.handle_turn("u1", "5000").await;
    assert_eq!(failed.meta("error").unwrap(), &json!(true));
    assert_eq!(failed.meta("state").unwrap(), "awaiting_missing_field");

    let saved = store.load("u1").await.unwrap().unwrap();
    assert_eq!(saved.age, Some(20));
    assert_eq!(saved.income, None);
}

#[tokio::test]
async fn catalog_failure_yields_retry_and_preserves_state() {
    let store = Arc::new(InMemoryProfileStore::new());
    seed_complete_profile(&store, "u1").await;
    let engine = engine_with(
        Arc::clone(&store),
        Arc::new(FailingCatalog),
        AssistantConfig::default(),
    );

    let failed = engine.handle_turn("u1", "tell me about farm support").await;
    assert_eq!(failed.meta("error").unwrap(), &json!(true));
    assert!(failed.suggested_actions.contains(&"retry".to_string()));
    assert!(failed.suggested_actions.contains(&"rephrase".to_string()));
    // The failing turn was never committed: the session still holds the
    // state from before the turn began.
    assert_eq!(failed.meta("state").unwrap(), "new");

    // The session keeps working for routes that don't touch the catalog.
    let next = engine.handle_turn("u1", "hello, what can you do?").await;
    assert!(next.meta("error").is_none());
    assert_eq!(next.meta("state").unwrap(), "ready");
}

// ── Session lifecycle ───────────────────────────────────────────────

#[tokio::test]
async fn idle_sessions_are_swept_on_any_access() {
    let store = Arc::new(InMemoryProfileStore::new());
    let config = AssistantConfig {
        session_idle_timeout: Duration::from_millis(50),
        ..Default::default()
    };
    let engine = engine_with(
        Arc::clone(&store),
        Arc::new(InMemoryCatalog::new(vec![farm_support()])),
        config,
    );

    engine.handle_turn("ghost", "hello").await;
    assert_eq!(engine.session_count().await, 1);

    tokio::time::sleep(Duration::from_millis(120)).await;

    // Touching a different session drops the idle one too.
    engine.handle_turn("visitor", "hello").await;
    assert_eq!(engine.session_count().await, 1);
}

// ── Localization ────────────────────────────────────────────────────

#[tokio::test]
async fn unsupported_language_sets_translation_fallback() {
    let store = Arc::new(InMemoryProfileStore::new());
    let mut profile = CitizenProfile::new("u1");
    profile.apply(ProfileField::Age, "20").unwrap();
    profile.apply(ProfileField::Income, "5000").unwrap();
    profile.apply(ProfileField::Occupation, "farmer").unwrap();
    profile.language_preference = "hi".to_string();
    store.save(&profile).await.unwrap();

    let engine = default_engine(store);
    let r = engine.handle_turn("u1", "tell me about the farm support grant").await;
    assert_eq!(r.meta("translation_fallback").unwrap(), &json!(true));
}
