use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use docket_core::llm::CompletionBackend;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Google Gemini via the `generateContent` REST endpoint.
pub struct GeminiBackend {
    pub base_url: String,
    pub model: String,
    api_key: String,
    timeout_secs: u64,
    client: reqwest::Client,
    label: String,
}

impl GeminiBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            base_url: docket_core::config::DEFAULT_GEMINI_BASE_URL.into(),
            label: format!("gemini/{model}"),
            model,
            api_key: api_key.into(),
            timeout_secs: 120,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.model)
        )
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
    status: Option<String>,
}

/// Pull the generated text out of a `generateContent` response body.
pub fn parse_generate_response(body: &str) -> Result<String> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).context("failed to parse Gemini response")?;

    let Some(candidate) = parsed.candidates.into_iter().next() else {
        if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
            bail!("the prompt was blocked by the model (reason: {reason})");
        }
        bail!("Gemini returned no candidates");
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "UNKNOWN".into());
        bail!("Gemini returned an empty response (finish reason: {reason})");
    }
    Ok(text)
}

/// Human-readable message for a non-2xx Gemini response.
pub fn describe_error(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => match env.error.status {
            Some(s) => format!("Gemini error {status} ({s}): {}", env.error.message),
            None => format!("Gemini error {status}: {}", env.error.message),
        },
        Err(_) => format!("Gemini error {status}: {}", body.trim()),
    }
}

#[async_trait]
impl CompletionBackend for GeminiBackend {
    fn name(&self) -> &str {
        &self.label
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request_body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
        };

        info!(model = %self.model, prompt_len = prompt.len(), "calling gemini generateContent");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    warn!(timeout_secs = self.timeout_secs, "gemini request timed out");
                    anyhow!("Gemini request timed out after {}s", self.timeout_secs)
                } else {
                    warn!("gemini request failed: {e}");
                    anyhow!("Gemini request failed: {e}")
                }
            })?;

        let status = response.status();
        let body = response.text().await.context("failed to read Gemini response")?;
        if !status.is_success() {
            let message = describe_error(status, &body);
            warn!(status = %status, "{message}");
            bail!(message);
        }

        let output = parse_generate_response(&body)?;
        info!(model = %self.model, output_len = output.len(), "gemini response received");
        Ok(output)
    }
}
