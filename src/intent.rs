//! Keyword-based intent classification.
//!
//! Runs before any routing to decide what the user is asking for. The
//! dictionaries are immutable and compiled once at construction, so
//! concurrent sessions never observe a dictionary update mid-evaluation.
//! No statistical model: matching is word-boundary regexes with a
//! specificity weight per pattern (multi-word phrases weigh more than
//! single generic words).

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What the user is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    SchemeInfo,
    EligibilityCheck,
    ApplicationGuidance,
    ProfileUpdate,
    GeneralQuery,
    Unclear,
}

impl Intent {
    /// Fixed tie-break priority: higher wins when scores are equal.
    pub fn priority(&self) -> u8 {
        match self {
            Self::EligibilityCheck => 5,
            Self::ApplicationGuidance => 4,
            Self::SchemeInfo => 3,
            Self::ProfileUpdate => 2,
            Self::GeneralQuery => 1,
            Self::Unclear => 0,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SchemeInfo => "scheme_info",
            Self::EligibilityCheck => "eligibility_check",
            Self::ApplicationGuidance => "application_guidance",
            Self::ProfileUpdate => "profile_update",
            Self::GeneralQuery => "general_query",
            Self::Unclear => "unclear",
        };
        write!(f, "{s}")
    }
}

/// Classifier output: intent plus confidence in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub intent: Intent,
    pub confidence: f32,
}

impl Classification {
    fn unclear() -> Self {
        Self {
            intent: Intent::Unclear,
            confidence: 0.0,
        }
    }
}

/// A weighted keyword pattern.
struct Keyword {
    regex: Regex,
    weight: f32,
}

fn kw(pattern: &str, weight: f32) -> Keyword {
    Keyword {
        // Patterns are fixed at construction; a panic here is a programming
        // error caught by the constructor tests.
        regex: Regex::new(pattern).expect("invalid keyword pattern"),
        weight,
    }
}

/// Keyword-dictionary intent classifier.
///
/// Pure: classification is a function of the query and the dictionaries.
/// Never returns an error past its boundary: unusable input degrades to
/// `Unclear` with confidence 0 so the caller's fallback path is uniform.
pub struct IntentClassifier {
    categories: Vec<(Intent, Vec<Keyword>)>,
}

impl IntentClassifier {
    /// Build the classifier with the default dictionaries.
    pub fn new() -> Self {
        let categories = vec![
            (
                Intent::EligibilityCheck,
                vec![
                    kw(r"\beligib(le|ility)\b", 2.0),
                    kw(r"\bqualif(y|ies|ication)\b", 2.0),
                    kw(r"\bam i (eligible|entitled)\b", 2.5),
                    kw(r"\bcan i (get|claim|receive|avail)\b", 2.0),
                    kw(r"\bdo i qualify\b", 2.5),
                    kw(r"\bentitled\b", 1.5),
                ],
            ),
            (
                Intent::ApplicationGuidance,
                vec![
                    kw(r"\bapply(ing)?\b", 2.0),
                    kw(r"\bapplication\b", 2.0),
                    kw(r"\bhow (do|can) i apply\b", 3.0),
                    kw(r"\bdocuments?\b", 1.5),
                    kw(r"\bsteps?\b", 1.5),
                    kw(r"\b(procedure|paperwork)\b", 1.5),
                    kw(r"\bform\b", 1.0),
                ],
            ),
            (
                Intent::SchemeInfo,
                vec![
                    kw(r"\btell me about\b", 2.0),
                    kw(r"\bwhat is\b", 1.5),
                    kw(r"\bscheme(s)?\b", 1.5),
                    kw(r"\bprogram(me)?s?\b", 1.5),
                    kw(r"\bbenefits?\b", 1.5),
                    kw(r"\bdetails?\b", 1.0),
                    kw(r"\binformation\b", 1.0),
                    kw(r"\bexplain\b", 1.5),
                ],
            ),
            (
                Intent::ProfileUpdate,
                vec![
                    kw(r"\bupdate\b", 2.0),
                    kw(r"\bchange\b", 1.5),
                    kw(r"\bcorrect my\b", 2.0),
                    kw(r"\bset my\b", 2.0),
                    kw(r"\bmy (age|income|occupation) (is|to)\b", 2.5),
                    kw(r"\b(delete|remove|erase) my (profile|data|information)\b", 3.0),
                    kw(r"\bforget me\b", 3.0),
                ],
            ),
            (
                Intent::GeneralQuery,
                vec![
                    kw(r"\b(hello|hi|hey|namaste)\b", 1.5),
                    kw(r"\bhelp\b", 1.5),
                    kw(r"\bwhat can you do\b", 2.5),
                    kw(r"\bthank(s| you)\b", 1.5),
                    kw(r"\bwho are you\b", 2.0),
                ],
            ),
        ];
        Self { categories }
    }

    /// Classify a query. Confidence grows with the total weight of matched
    /// keywords (`w / (w + 1)`), so one specific keyword clears the default
    /// 0.6 threshold while a lone generic word does not.
    pub fn classify(&self, query: &str) -> Classification {
        let normalized = query.trim().to_lowercase();
        if normalized.is_empty() {
            return Classification::unclear();
        }

        let mut best: Option<(Intent, f32)> = None;
        for (intent, keywords) in &self.categories {
            let score: f32 = keywords
                .iter()
                .filter(|k| k.regex.is_match(&normalized))
                .map(|k| k.weight)
                .sum();
            if score <= 0.0 {
                continue;
            }
            let better = match best {
                None => true,
                Some((best_intent, best_score)) => {
                    score > best_score
                        || (score == best_score && intent.priority() > best_intent.priority())
                }
            };
            if better {
                best = Some((*intent, score));
            }
        }

        match best {
            None => {
                debug!(query = %normalized, "no intent keywords matched");
                Classification::unclear()
            }
            Some((intent, score)) => {
                let confidence = (score / (score + 1.0)).clamp(0.0, 1.0);
                debug!(%intent, score, confidence, "classified query");
                Classification { intent, confidence }
            }
        }
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}
