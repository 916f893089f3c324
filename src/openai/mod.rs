//! OpenAI chat completions client used for model-assisted query translation.

pub mod client;
pub mod types;

pub use client::{CompletionClient, ModelError, OpenAiClient};
