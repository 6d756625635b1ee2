//! DialogEngine coordinates sessions, intent routing, profile
//! collection, and eligibility evaluation, one turn at a time.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::catalog::{ProgramCatalog, ProgramDefinition, validate_steps};
use crate::config::AssistantConfig;
use crate::eligibility::{EligibilityMatcher, EligibilityResult, Verdict};
use crate::error::{CatalogError, Error, Result};
use crate::intent::{Intent, IntentClassifier};
use crate::profile::{CitizenProfile, ProfileField};
use crate::store::ProfileStore;
use crate::text::{Simplified, Summarizer, Translator};

use super::prompts;
use super::response::Response;
use super::state::{DialogState, Role, SessionState};

/// Words too generic to identify a program.
const SEARCH_STOPWORDS: &[&str] = &[
    "the", "for", "and", "about", "tell", "what", "how", "can", "could",
    "am", "is", "are", "you", "your", "my", "me", "do", "does", "with",
    "get", "scheme", "schemes", "program", "programs", "programme",
    "eligible", "eligibility", "qualify", "apply", "application",
    "information", "details", "benefit", "benefits", "check",
];

/// Per-user dialog state machine. One engine serves all sessions; sessions
/// are independent and processed concurrently, while turns within one
/// session are strictly sequential behind that session's lock.
pub struct DialogEngine {
    classifier: IntentClassifier,
    matcher: EligibilityMatcher,
    profiles: Arc<dyn ProfileStore>,
    catalog: Arc<dyn ProgramCatalog>,
    summarizer: Arc<dyn Summarizer>,
    translator: Arc<dyn Translator>,
    sessions: Mutex<HashMap<String, Arc<Mutex<SessionState>>>>,
    config: AssistantConfig,
    number_re: Regex,
    delete_re: Regex,
}

impl DialogEngine {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        catalog: Arc<dyn ProgramCatalog>,
        summarizer: Arc<dyn Summarizer>,
        translator: Arc<dyn Translator>,
        config: AssistantConfig,
    ) -> Self {
        Self {
            classifier: IntentClassifier::new(),
            matcher: EligibilityMatcher::new(),
            profiles,
            catalog,
            summarizer,
            translator,
            sessions: Mutex::new(HashMap::new()),
            config,
            // Fixed patterns; constructor tests cover them.
            number_re: Regex::new(r"\d[\d,]*(\.\d+)?").unwrap(),
            delete_re: Regex::new(r"\b(delete|remove|erase|forget)\b.*\b(profile|data|information|me)\b")
                .unwrap(),
        }
    }

    /// Process one turn. Never fails: validation problems re-prompt,
    /// collaborator and internal failures produce a user-safe recovery
    /// response, and in every failure case the session and the profile
    /// store keep the state they held before the turn began.
    pub async fn handle_turn(&self, session_id: &str, message: &str) -> Response {
        let handle = self.session_handle(session_id).await;
        let mut guard = handle.lock().await;

        // The turn runs against a scratch copy; it is committed only on
        // success, so a failed or cancelled turn leaves no trace.
        let mut scratch = guard.clone();
        scratch.touch();
        scratch.record(Role::User, message, self.config.max_history_messages);

        let outcome = match self.run_turn(&mut scratch, message).await {
            // The profile write is deferred to the commit point so a turn
            // that fails after mutating the profile leaves the store
            // untouched. If the save itself fails, the turn fails whole.
            Ok((response, Some(profile))) => self
                .profiles
                .save(&profile)
                .await
                .map(|()| response)
                .map_err(Error::from),
            Ok((response, None)) => Ok(response),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(response) => {
                scratch.record(Role::Assistant, &response.text, self.config.max_history_messages);
                *guard = scratch;
                response
            }
            Err(err) => {
                error!(
                    session_id,
                    turn = message,
                    error = %err,
                    "turn failed; prior session state preserved"
                );
                Response::new(prompts::error_recovery(), guard.state)
                    .with_action("retry")
                    .with_action("rephrase")
                    .with_meta("error", json!(true))
            }
        }
    }

    /// Fetch or create the session handle. Every call sweeps sessions
    /// idle past the configured window, whichever id triggered it, so the
    /// map does not retain entries for users who never return.
    async fn session_handle(&self, session_id: &str) -> Arc<Mutex<SessionState>> {
        let mut sessions = self.sessions.lock().await;
        // A session with a turn in flight holds its own lock and is
        // certainly not idle; only uncontended entries are inspected.
        sessions.retain(|id, handle| match handle.try_lock() {
            Ok(state) => {
                let expired = state.is_expired(self.config.session_idle_timeout);
                if expired {
                    debug!(session_id = %id, "session expired; dropping");
                }
                !expired
            }
            Err(_) => true,
        });
        if let Some(existing) = sessions.get(session_id) {
            return Arc::clone(existing);
        }
        let fresh = Arc::new(Mutex::new(SessionState::new(session_id)));
        sessions.insert(session_id.to_string(), Arc::clone(&fresh));
        fresh
    }

    /// Number of sessions currently held in memory.
    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Run one turn against the scratch session. Returns the response plus
    /// the profile to persist when the turn changed it; the caller performs
    /// the single store write at commit time.
    async fn run_turn(
        &self,
        session: &mut SessionState,
        message: &str,
    ) -> Result<(Response, Option<CitizenProfile>)> {
        let mut profile = match self.profiles.load(&session.user_id).await? {
            Some(profile) => profile,
            // Created on first contact; persisted once a field is supplied.
            None => CitizenProfile::new(&session.user_id),
        };
        let mut dirty = false;

        let response = match session.state {
            DialogState::New => {
                self.start_session(session, &mut profile, &mut dirty, message)
                    .await?
            }
            DialogState::CollectingProfile | DialogState::AwaitingMissingField => {
                self.collect_field(session, &mut profile, &mut dirty, message)
                    .await?
            }
            DialogState::Ready => {
                self.classify_and_route(session, &mut profile, &mut dirty, message)
                    .await?
            }
            DialogState::AwaitingClarification | DialogState::Error => {
                // The next message is a fresh query, not an answer to a
                // closed question.
                session.transition_to(DialogState::Ready)?;
                self.classify_and_route(session, &mut profile, &mut dirty, message)
                    .await?
            }
        };

        let response = self.localize(&profile, response).await;
        Ok((response, dirty.then_some(profile)))
    }

    /// First contact: greet and start profile collection, or route the
    /// query directly when a stored profile is already complete.
    async fn start_session(
        &self,
        session: &mut SessionState,
        profile: &mut CitizenProfile,
        dirty: &mut bool,
        message: &str,
    ) -> Result<Response> {
        let pending = profile.missing_fields(&self.config.required_fields);
        if pending.is_empty() {
            session.transition_to(DialogState::Ready)?;
            return self.classify_and_route(session, profile, dirty, message).await;
        }
        session.pending_fields = pending;
        session.transition_to(DialogState::CollectingProfile)?;
        let first = session.pending_fields[0];
        Ok(Response::new(prompts::greeting(first), session.state)
            .needs_input()
            .with_pending_field(first))
    }

    /// Interpret the message as the answer to the head pending field.
    /// Validation failure re-prompts the same field without advancing.
    async fn collect_field(
        &self,
        session: &mut SessionState,
        profile: &mut CitizenProfile,
        dirty: &mut bool,
        message: &str,
    ) -> Result<Response> {
        let Some(&field) = session.pending_fields.first() else {
            warn!(user_id = %session.user_id, "no pending field in collection state; rerouting");
            session.transition_to(DialogState::Ready)?;
            return self.classify_and_route(session, profile, dirty, message).await;
        };

        if let Err(validation) = profile.apply(field, message) {
            return Ok(Response::new(prompts::reprompt(field, &validation), session.state)
                .needs_input()
                .with_pending_field(field)
                .with_meta("validation_error", json!(validation.to_string())));
        }

        *dirty = true;
        session.pending_fields.remove(0);

        if let Some(&next) = session.pending_fields.first() {
            return Ok(Response::new(prompts::field_question(next), session.state)
                .needs_input()
                .with_pending_field(next));
        }

        // Collection finished: resume the interrupted eligibility check if
        // one is pending, otherwise acknowledge.
        let was_missing_detour = session.state == DialogState::AwaitingMissingField;
        session.transition_to(DialogState::Ready)?;

        if was_missing_detour {
            if let Some(program_id) = session.pending_program.take() {
                return self.verdict_for(session, profile, &program_id).await;
            }
        }

        if session.current_intent == Some(Intent::ProfileUpdate) {
            return Ok(Response::new(prompts::field_updated(field), session.state));
        }

        Ok(Response::new(prompts::profile_complete(), session.state)
            .with_action("ask about a program")
            .with_action("check eligibility")
            .with_action("how to apply"))
    }

    async fn classify_and_route(
        &self,
        session: &mut SessionState,
        profile: &mut CitizenProfile,
        dirty: &mut bool,
        message: &str,
    ) -> Result<Response> {
        let classification = self.classifier.classify(message);
        session.current_intent = Some(classification.intent);
        debug!(
            user_id = %session.user_id,
            intent = %classification.intent,
            confidence = classification.confidence,
            "routing turn"
        );

        if classification.intent == Intent::Unclear
            || classification.confidence < self.config.confidence_threshold
        {
            session.transition_to(DialogState::AwaitingClarification)?;
            return Ok(Response::new(prompts::clarification(), session.state)
                .needs_input()
                .with_meta("confidence", json!(classification.confidence)));
        }

        match classification.intent {
            Intent::SchemeInfo => self.scheme_info(session, message).await,
            Intent::EligibilityCheck => self.eligibility_check(session, profile, message).await,
            Intent::ApplicationGuidance => self.application_guidance(session, message).await,
            Intent::ProfileUpdate => self.profile_update(session, profile, dirty, message).await,
            Intent::GeneralQuery | Intent::Unclear => {
                Ok(Response::new(prompts::general_help(), session.state))
            }
        }
    }

    async fn scheme_info(&self, session: &SessionState, message: &str) -> Result<Response> {
        let Some(program) = self.find_program(message).await? else {
            return Ok(Response::new(prompts::no_program_found(), session.state).needs_input());
        };

        // The summarizer contract is degrade-not-fail; if an implementation
        // errors anyway, serve the official text with the warning flag.
        let simplified = match self.summarizer.simplify(&program.description).await {
            Ok(simplified) => simplified,
            Err(err) => {
                warn!(program = %program.id, error = %err, "summarizer failed; using official text");
                Simplified {
                    text: program.description.clone(),
                    degraded: true,
                }
            }
        };

        let mut response =
            Response::new(prompts::scheme_info(&program, &simplified.text), session.state)
                .with_disclaimer()
                .with_meta("program_id", json!(program.id));
        if simplified.degraded {
            response = response.with_meta("simplifier_warning", json!(true));
        }
        Ok(response)
    }

    async fn eligibility_check(
        &self,
        session: &mut SessionState,
        profile: &CitizenProfile,
        message: &str,
    ) -> Result<Response> {
        let Some(program) = self.find_program(message).await? else {
            return Ok(Response::new(prompts::no_program_found(), session.state).needs_input());
        };
        let result = self.matcher.evaluate(&profile.eval_context(), &program.criteria);
        if result.verdict() == Verdict::NeedsInformation {
            return self.request_missing(session, &program, result);
        }
        Ok(Self::verdict_response(session.state, &program, &result))
    }

    /// Re-run the matcher after a missing-field detour.
    async fn verdict_for(
        &self,
        session: &mut SessionState,
        profile: &CitizenProfile,
        program_id: &str,
    ) -> Result<Response> {
        let program = self
            .catalog
            .get_by_id(program_id)
            .await?
            .ok_or_else(|| CatalogError::ProgramNotFound {
                id: program_id.to_string(),
            })?;
        let result = self.matcher.evaluate(&profile.eval_context(), &program.criteria);
        if result.verdict() == Verdict::NeedsInformation {
            return self.request_missing(session, &program, result);
        }
        Ok(Self::verdict_response(session.state, &program, &result))
    }

    fn verdict_response(
        state: DialogState,
        program: &ProgramDefinition,
        result: &EligibilityResult,
    ) -> Response {
        Response::new(prompts::verdict(program, result), state)
            .with_disclaimer()
            .with_meta("program_id", json!(program.id))
            .with_meta("eligible", json!(result.eligible))
            .with_meta("unmatched", json!(result.unmatched))
    }

    /// Enter the missing-field detour: remember the program, queue the
    /// collectible fields, prompt for the first.
    fn request_missing(
        &self,
        session: &mut SessionState,
        program: &ProgramDefinition,
        result: EligibilityResult,
    ) -> Result<Response> {
        let collectible: Vec<ProfileField> = result
            .missing_information
            .iter()
            .filter_map(|key| ProfileField::from_key(key))
            .collect();

        if collectible.is_empty() {
            // Rules referencing fields the profile schema cannot supply.
            warn!(
                program = %program.id,
                missing = ?result.missing_information,
                "criteria reference uncollectible fields"
            );
            return Ok(Response::new(
                format!(
                    "I can't complete the check for {}: information I have no way \
                     to collect is required ({}).",
                    program.name,
                    result.missing_information.join(", ")
                ),
                session.state,
            )
            .with_meta("program_id", json!(program.id))
            .with_meta("missing_information", json!(result.missing_information)));
        }

        session.pending_fields = collectible;
        session.pending_program = Some(program.id.clone());
        session.transition_to(DialogState::AwaitingMissingField)?;
        let first = session.pending_fields[0];
        Ok(
            Response::new(prompts::missing_field_intro(program, &result, first), session.state)
                .needs_input()
                .with_pending_field(first)
                .with_meta("program_id", json!(program.id))
                .with_meta("missing_information", json!(result.missing_information)),
        )
    }

    async fn application_guidance(
        &self,
        session: &SessionState,
        message: &str,
    ) -> Result<Response> {
        let Some(program) = self.find_program(message).await? else {
            return Ok(Response::new(prompts::no_program_found(), session.state).needs_input());
        };
        // Never render a malformed step list.
        validate_steps(&program.id, &program.steps)?;
        Ok(Response::new(prompts::guidance(&program), session.state)
            .with_meta("program_id", json!(program.id)))
    }

    async fn profile_update(
        &self,
        session: &mut SessionState,
        profile: &mut CitizenProfile,
        dirty: &mut bool,
        message: &str,
    ) -> Result<Response> {
        let lower = message.to_lowercase();

        // Deletion takes effect immediately; it is the last store touch of
        // the turn, so there is nothing after it to roll back.
        if self.delete_re.is_match(&lower) {
            self.profiles.delete(&session.user_id).await?;
            session.pending_fields.clear();
            session.pending_program = None;
            session.current_intent = None;
            session.transition_to(DialogState::New)?;
            return Ok(Response::new(prompts::profile_deleted(), session.state));
        }

        let Some(field) = detect_field(&lower) else {
            return Ok(Response::new(prompts::which_field(), session.state).needs_input());
        };

        // Try the value inline ("update my income to 4000"); fall back to
        // the per-field prompt flow when absent or invalid.
        let inline = match field {
            ProfileField::Age | ProfileField::Income => self
                .number_re
                .find(&lower)
                .map(|m| m.as_str().to_string()),
            ProfileField::Occupation => lower
                .split(" to ")
                .nth(1)
                .map(|tail| tail.trim().to_string()),
        };
        if let Some(raw) = inline {
            if profile.apply(field, &raw).is_ok() {
                *dirty = true;
                return Ok(Response::new(prompts::field_updated(field), session.state));
            }
        }

        session.pending_fields = vec![field];
        session.transition_to(DialogState::CollectingProfile)?;
        Ok(Response::new(prompts::field_question(field), session.state)
            .needs_input()
            .with_pending_field(field))
    }

    /// Resolve the query to its best-matching program.
    async fn find_program(&self, message: &str) -> Result<Option<ProgramDefinition>> {
        let keywords = extract_keywords(message);
        if keywords.is_empty() {
            return Ok(None);
        }
        let results = self.catalog.search(&keywords).await?;
        Ok(results.into_iter().next())
    }

    /// Translate the response to the user's preferred language. Translation
    /// degrades rather than failing the turn.
    async fn localize(&self, profile: &CitizenProfile, mut response: Response) -> Response {
        if profile.language_preference == self.config.default_language {
            return response;
        }
        match self
            .translator
            .translate(&response.text, &profile.language_preference)
            .await
        {
            Ok(translated) => {
                response.text = translated.text;
                if translated.used_fallback {
                    response = response.with_meta("translation_fallback", json!(true));
                }
            }
            Err(err) => {
                warn!(
                    language = %profile.language_preference,
                    error = %err,
                    "translator failed; serving default language"
                );
                response = response.with_meta("translation_fallback", json!(true));
            }
        }
        response
    }
}

/// Which profile field a free-text update names, first mention wins.
fn detect_field(lower: &str) -> Option<ProfileField> {
    for word in lower.split(|c: char| !c.is_alphanumeric()) {
        match word {
            "age" => return Some(ProfileField::Age),
            "income" | "salary" | "earnings" => return Some(ProfileField::Income),
            "occupation" | "job" | "profession" => return Some(ProfileField::Occupation),
            _ => {}
        }
    }
    None
}

/// Content words usable for catalog search.
fn extract_keywords(message: &str) -> Vec<String> {
    message
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.len() >= 3 && !SEARCH_STOPWORDS.contains(word))
        .map(str::to_string)
        .collect()
}
