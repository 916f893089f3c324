use reqwest::Client;
use tracing::{info, warn};

use super::{Translation, TranslationResult};
use crate::config::{ModelCredential, ModelSettings};
use crate::openai::{CompletionClient, ModelError, OpenAiClient};

pub(crate) const SYSTEM_PROMPT: &str = "Convert the user's question into a Shodan search query. \
Use filters such as country:, port:, product:, org:, etc. \
Reply ONLY with the query, without any additional explanation.";

/// Model-assisted translation. Never fails: any problem yields the heuristic
/// result with the reason recorded in [`Translation::degraded`].
pub async fn translate_with_model(
    http: &Client,
    question: &str,
    credential: &ModelCredential,
    settings: &ModelSettings,
) -> Translation {
    match OpenAiClient::new(http.clone(), credential, settings) {
        Ok(client) => translate_with_client(question, &client).await,
        Err(e) => fall_back(question, e),
    }
}

pub async fn translate_with_client(question: &str, client: &impl CompletionClient) -> Translation {
    let answer = match client.complete(SYSTEM_PROMPT, question).await {
        Ok(answer) => answer,
        Err(e) => return fall_back(question, e),
    };

    let query = answer.trim();
    if query.is_empty() {
        return fall_back(question, ModelError::EmptyResponse);
    }

    info!(model = client.model(), query, "model translation");
    Translation {
        result: TranslationResult {
            query: query.to_string(),
            explanation: format!("AI translation using OpenAI ({}).", client.model()),
        },
        degraded: None,
    }
}

fn fall_back(question: &str, reason: ModelError) -> Translation {
    warn!(error = %reason, "model translation failed, using heuristic translation");
    Translation::degraded(question, reason)
}
