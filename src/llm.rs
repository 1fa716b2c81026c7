//! # Language-model client
//!
//! [`LanguageModel`] is the seam between the answer service and whatever produces text
//! from a prompt. [`OpenAiChat`] implements it for any OpenAI-compatible chat-completions
//! endpoint (Groq by default) through `async-openai`.
//!
//! The prompt is sent as a single user message and the first choice's text is returned
//! verbatim (empty when the API sends no content).
//! There is no retry, timeout, or rate-limit handling here; failures propagate.
//!
//! # Example
//!
//! ```no_run
//! use rag_llm::llm::{LanguageModel, OpenAiChat};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let llm = OpenAiChat::new("https://api.groq.com/openai/v1", "gsk_...", "llama-3.1-8b-instant");
//! let answer = llm.complete("Say hello.").await?;
//! println!("{answer}");
//! # Ok(()) }
//! ```

use std::error::Error;

use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::RagConfig;

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";
/// Default chat model.
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

/// Prompt in, text out.
#[async_trait(?Send)]
pub trait LanguageModel {
    async fn complete(&self, prompt: &str) -> Result<String, Box<dyn Error>>;
}

/// Chat-completions client for OpenAI-compatible APIs.
pub struct OpenAiChat {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiChat {
    pub fn new(api_base: &str, api_key: &str, model: &str) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);
        debug!("Client created for {}", api_base);
        info!("LLM initialized: {}", model);
        Self {
            client: Client::with_config(openai_config),
            model: model.to_string(),
        }
    }

    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(&config.api_base, &config.api_key, &config.model)
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait(?Send)]
impl LanguageModel for OpenAiChat {
    async fn complete(&self, prompt: &str) -> Result<String, Box<dyn Error>> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.clone())
            .messages([ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()?
                .into()])
            .build()?;

        debug!("Sending request: {:?}", request);

        let response = self.client.chat().create(request).await?;

        let answer = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        Ok(answer)
    }
}
