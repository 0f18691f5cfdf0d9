//! OpenAI-compatible streaming chat completions client.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;
use web2050_config::GeneratorConfig;
use web2050_store::AssetList;

use crate::generator::{ByteStream, ContentGenerator, GenerationError};
use crate::prompt::{ChatMessage, build_messages};

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

fn map_http_error(error: &reqwest::Error) -> GenerationError {
    if error.is_timeout() {
        GenerationError::Request(format!("request timeout: {error}"))
    } else if error.is_connect() {
        GenerationError::Request(format!("connection error: {error}"))
    } else {
        GenerationError::Request(error.to_string())
    }
}

/// [`ContentGenerator`] streaming from `{base_url}/chat/completions`.
pub struct OpenAiGenerator {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    output_tag: String,
    max_tokens: Option<u32>,
    system_prompt: Option<String>,
}

impl OpenAiGenerator {
    /// Build a client from the `[generator]` config section.
    pub fn from_config(config: &GeneratorConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| GenerationError::Request(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            output_tag: config.output_tag.clone(),
            max_tokens: config.max_tokens,
            system_prompt: config.system_prompt.clone(),
        })
    }

    /// Full completions endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ContentGenerator for OpenAiGenerator {
    async fn generate(
        &self,
        key: &str,
        context: &AssetList,
    ) -> Result<ByteStream, GenerationError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: build_messages(
                key,
                context,
                &self.output_tag,
                self.system_prompt.as_deref(),
            ),
            max_tokens: self.max_tokens,
            stream: true,
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await.map_err(|e| map_http_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_owned());
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(key = %key, model = %self.model, "Generator stream opened");
        let stream = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| GenerationError::Stream(e.to_string()))
        });
        Ok(Box::pin(stream))
    }
}
