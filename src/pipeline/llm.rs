//! Hosted model interaction: build the message sequence, call the provider,
//! and parse the answer as JSON.
//!
//! The prompt wording lives in [`crate::prompts`]; this module only knows the
//! message layout (system directives first, then one user message per input
//! unit) and the strict-JSON contract.

use crate::config::ServiceConfig;
use crate::error::ExtractError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Author of a [`ModelMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
}

/// One message of an extraction request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelMessage {
    pub role: Role,
    pub content: String,
}

impl ModelMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Assemble `directives` as system messages followed by one user message per
/// input, preserving order.
pub fn build_messages<I, S>(directives: &[&str], inputs: I) -> Vec<ModelMessage>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    directives
        .iter()
        .map(|d| ModelMessage::system(*d))
        .chain(inputs.into_iter().map(ModelMessage::user))
        .collect()
}

/// A synchronous request/response chat completion.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send `messages` and return the raw response text.
    async fn complete(&self, messages: &[ModelMessage]) -> Result<String, ExtractError>;
}

/// [`ChatModel`] backed by an edgequake-llm provider.
pub struct ProviderModel {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl ProviderModel {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ServiceConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
        }
    }

    /// Resolve the provider from `config` and the environment.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ExtractError> {
        Ok(Self::new(resolve_provider(config)?, config))
    }
}

#[async_trait]
impl ChatModel for ProviderModel {
    async fn complete(&self, messages: &[ModelMessage]) -> Result<String, ExtractError> {
        let start = Instant::now();
        let chat: Vec<ChatMessage> = messages
            .iter()
            .map(|m| match m.role {
                Role::System => ChatMessage::system(m.content.as_str()),
                Role::User => ChatMessage::user(m.content.as_str()),
            })
            .collect();

        let response = self
            .provider
            .chat(&chat, Some(&self.options))
            .await
            .map_err(|e| ExtractError::LlmApiError {
                message: e.to_string(),
            })?;

        info!(
            "Model answered: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );
        Ok(response.content)
    }
}

/// Build `CompletionOptions` from the service config.
fn build_options(config: &ServiceConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: config.temperature,
        max_tokens: config.max_tokens,
        ..Default::default()
    }
}

/// Parse the model's answer as JSON.
///
/// Strict: a reply wrapped in a Markdown fence, or with prose around the
/// object, is an error.
pub fn parse_structured(response: &str) -> Result<Value, ExtractError> {
    serde_json::from_str(response).map_err(|e| ExtractError::InvalidModelJson {
        detail: e.to_string(),
    })
}

/// Send `messages` to `model` and parse the answer as JSON.
pub async fn extract_structured(
    model: &dyn ChatModel,
    messages: &[ModelMessage],
) -> Result<Value, ExtractError> {
    debug!("Model request: {:?}", messages);
    let response = model.complete(messages).await?;
    debug!("Model response: {}", response);
    let value = parse_structured(&response)?;
    info!("Model response parsed as JSON");
    Ok(value)
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ExtractError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`): used as-is.
/// 2. **Named provider** (`config.provider_name`) with `config.model`.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **OpenAI** when `OPENAI_API_KEY` is set, with `config.model`.
/// 5. **Full auto-detection** via [`ProviderFactory::from_env`].
pub fn resolve_provider(config: &ServiceConfig) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_provider(name, &config.model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_provider("openai", &config.model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ExtractError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
