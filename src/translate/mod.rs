//! Question-to-query translation: keyword heuristics, optionally replaced by an
//! OpenAI answer when a model key is configured.

mod heuristic;
mod model;

pub use heuristic::translate_heuristic;
pub use model::translate_with_model;

use reqwest::Client;
use tracing::info;

use crate::config::{ModelCredential, ModelSettings};
use crate::openai::ModelError;

/// A Shodan query and a short note naming the path that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationResult {
    pub query: String,
    pub explanation: String,
}

#[derive(Debug)]
pub struct Translation {
    pub result: TranslationResult,
    /// Why the model path was abandoned, when it was attempted and failed.
    /// `result` is then exactly the heuristic translation.
    pub degraded: Option<ModelError>,
}

impl Translation {
    pub fn heuristic(question: &str) -> Self {
        Self {
            result: translate_heuristic(question),
            degraded: None,
        }
    }

    pub fn degraded(question: &str, reason: ModelError) -> Self {
        Self {
            result: translate_heuristic(question),
            degraded: Some(reason),
        }
    }
}

/// Single entry point: model translation when a key is present, heuristics otherwise.
///
/// The query is non-empty for any non-empty `question`; callers reject blank
/// input before translating.
pub async fn translate(
    http: &Client,
    question: &str,
    credential: &ModelCredential,
    settings: &ModelSettings,
) -> Translation {
    if credential.is_empty() {
        info!("no OpenAI key configured, using heuristic translation");
        return Translation::heuristic(question);
    }
    translate_with_model(http, question, credential, settings).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::heuristic::HEURISTIC_EXPLANATION;

    #[tokio::test]
    async fn unmatched_question_without_key_is_normalized_input() {
        let translation = translate(
            &Client::new(),
            "  Impresoras   Expuestas ",
            &ModelCredential::default(),
            &ModelSettings::default(),
        )
        .await;

        assert_eq!(translation.result.query, "impresoras expuestas");
        assert_eq!(translation.result.explanation, HEURISTIC_EXPLANATION);
        assert!(translation.degraded.is_none());
    }
}
