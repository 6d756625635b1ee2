//! Summarizer and translator collaborator traits.
//!
//! Both are text-in/text-out services with degradation contracts: a
//! summarizer that cannot simplify returns the original text with
//! `degraded` set, and a translator that cannot reach the target language
//! returns the input with `used_fallback` set. Implementations should
//! degrade rather than error; the dialog engine treats a hard error from
//! either the same way (original text plus the flag).

use async_trait::async_trait;

use crate::error::TextServiceError;

/// Simplification output.
#[derive(Debug, Clone)]
pub struct Simplified {
    pub text: String,
    /// True when the original text is returned unsimplified.
    pub degraded: bool,
}

/// Translation output.
#[derive(Debug, Clone)]
pub struct Translated {
    pub text: String,
    /// True when the text was not translated to the requested language.
    pub used_fallback: bool,
}

/// Vocabulary-substitution text simplification service.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn simplify(&self, official_text: &str) -> Result<Simplified, TextServiceError>;
}

/// Translation service.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, language: &str) -> Result<Translated, TextServiceError>;
}

/// Identity summarizer for the CLI binary and tests.
pub struct PassthroughSummarizer;

#[async_trait]
impl Summarizer for PassthroughSummarizer {
    async fn simplify(&self, official_text: &str) -> Result<Simplified, TextServiceError> {
        Ok(Simplified {
            text: official_text.to_string(),
            degraded: false,
        })
    }
}

/// Translator that only knows the default language and falls back for
/// everything else.
pub struct PassthroughTranslator {
    native_language: String,
}

impl PassthroughTranslator {
    pub fn new(native_language: impl Into<String>) -> Self {
        Self {
            native_language: native_language.into(),
        }
    }
}

#[async_trait]
impl Translator for PassthroughTranslator {
    async fn translate(&self, text: &str, language: &str) -> Result<Translated, TextServiceError> {
        Ok(Translated {
            text: text.to_string(),
            used_fallback: language != self.native_language,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passthrough_summarizer_is_not_degraded() {
        let result = PassthroughSummarizer.simplify("official text").await.unwrap();
        assert_eq!(result.text, "official text");
        assert!(!result.degraded);
    }

    #[tokio::test]
    async fn passthrough_translator_flags_fallback() {
        let translator = PassthroughTranslator::new("en");
        let same = translator.translate("hello", "en").await.unwrap();
        assert!(!same.used_fallback);

        let other = translator.translate("hello", "hi").await.unwrap();
        assert!(other.used_fallback);
        assert_eq!(other.text, "hello");
    }
}
