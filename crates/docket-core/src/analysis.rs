use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::{
    document::ExtractedDocument,
    llm::{complete_or_explain, CompletionBackend},
    prompts,
    types::{Analysis, ChatMessage},
};

/// Drives the completion calls behind the analysis views and the chat.
#[derive(Clone)]
pub struct Analyzer {
    backend: Arc<dyn CompletionBackend>,
    history_turns: usize,
}

impl Analyzer {
    pub fn new(backend: Arc<dyn CompletionBackend>, history_turns: usize) -> Self {
        Self { backend, history_turns }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Summary, risk breakdown and dashboard, one call after another.
    pub async fn analyze(&self, doc: &ExtractedDocument) -> Analysis {
        let backend = self.backend.as_ref();
        info!(backend = backend.name(), chars = doc.text.len(), "analyzing document");

        let summary = complete_or_explain(backend, &prompts::summary_prompt(&doc.text)).await;
        let risks = complete_or_explain(backend, &prompts::risks_prompt(&doc.text)).await;
        let dashboard = complete_or_explain(backend, &prompts::dashboard_prompt(&doc.text)).await;

        info!(
            summary_len = summary.len(),
            risks_len = risks.len(),
            dashboard_len = dashboard.len(),
            "analysis complete"
        );

        Analysis {
            summary,
            risks,
            dashboard,
            model: backend.name().to_string(),
            generated_at: Utc::now(),
        }
    }

    /// Answer one follow-up question. `history` excludes `question`.
    pub async fn answer(&self, document: &str, history: &[ChatMessage], question: &str) -> String {
        let prompt = prompts::qa_prompt(document, history, question, self.history_turns);
        info!(
            backend = self.backend.name(),
            prompt_len = prompt.len(),
            history = history.len().min(self.history_turns),
            "answering question"
        );
        complete_or_explain(self.backend.as_ref(), &prompt).await
    }
}
