use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use docket_core::llm::CompletionBackend;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Calls a locally-hosted Ollama model via its native chat API.
///
/// Intended for deployments where document content must not leave the
/// local machine.
pub struct OllamaBackend {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    label: String,
}

impl OllamaBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            base_url: base_url.into(),
            label: format!("ollama/{model}"),
            model,
            timeout_secs: 300,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

#[derive(Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

#[async_trait]
impl CompletionBackend for OllamaBackend {
    fn name(&self) -> &str {
        &self.label
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request_body = OllamaChatRequest {
            model: &self.model,
            messages: vec![OllamaMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
        };

        info!(
            model = %self.model,
            base_url = %self.base_url,
            prompt_len = prompt.len(),
            "calling ollama chat API"
        );

        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .build()?;

        let response = match client.post(&url).json(&request_body).send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                warn!(timeout_secs = self.timeout_secs, "ollama request timed out");
                bail!("Ollama request timed out after {}s", self.timeout_secs);
            },
            Err(e) => {
                warn!("ollama request failed: {}", e);
                bail!("Ollama request failed: {}", e);
            },
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "ollama returned non-200: {}", body);
            bail!("Ollama error {}: {}", status, body);
        }

        let parsed: OllamaChatResponse = response
            .json()
            .await
            .context("failed to parse Ollama response")?;

        let output = parsed.message.content;
        if output.trim().is_empty() {
            bail!("Ollama returned an empty response");
        }

        info!(output_len = output.len(), "ollama response received");

        Ok(output)
    }
}
