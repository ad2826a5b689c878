pub mod gemini;
pub mod ollama;

use std::sync::Arc;

use anyhow::{bail, Result};
use docket_core::{config::Config, llm::CompletionBackend};

pub use gemini::GeminiBackend;
pub use ollama::OllamaBackend;

/// Select the completion backend named by `config.backend`.
pub fn backend_from_config(config: &Config) -> Result<Arc<dyn CompletionBackend>> {
    let backend: Arc<dyn CompletionBackend> = match config.backend.as_str() {
        "gemini" => {
            if config.gemini_api_key.is_empty() {
                bail!("Gemini API key not found. Set GEMINI_API_KEY in the environment or in .env");
            }
            Arc::new(
                GeminiBackend::new(&config.gemini_api_key, &config.model)
                    .with_base_url(&config.gemini_base_url)
                    .with_timeout(config.llm_timeout_s),
            )
        },
        "ollama" => Arc::new(
            OllamaBackend::new(&config.ollama_url, &config.ollama_model)
                .with_timeout(config.llm_timeout_s),
        ),
        other => bail!("unknown backend: {other}"),
    };
    Ok(backend)
}
