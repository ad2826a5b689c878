use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

/// A hosted or local text-completion service.
///
/// One prompt in, one generated text out. Implementations keep no
/// conversation state; callers replay whatever context they need.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Short label for logs and reports, e.g. "gemini/gemini-1.5-flash".
    fn name(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Run a completion, turning any failure into displayable text.
pub async fn complete_or_explain(backend: &dyn CompletionBackend, prompt: &str) -> String {
    match backend.complete(prompt).await {
        Ok(text) => text,
        Err(e) => {
            warn!(backend = backend.name(), "completion failed: {e:#}");
            format!("Could not get a response from the language model. Error: {e:#}")
        },
    }
}
