use std::panic::{self, AssertUnwindSafe};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, warn};

use crate::types::DocumentInfo;

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("the uploaded file is not a PDF")]
    NotPdf,
    #[error("error processing PDF file: {0}")]
    Corrupt(String),
    #[error("Failed to extract text. The PDF might be image-based or corrupted.")]
    NoText,
}

/// Text pulled out of an uploaded PDF, plus the stats shown to the user.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub text: String,
    pub page_count: usize,
    pub text_pages: usize,
    pub sha256: String,
    pub truncated: bool,
}

impl ExtractedDocument {
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn info(&self, name: &str) -> DocumentInfo {
        DocumentInfo {
            name: name.to_string(),
            page_count: self.page_count,
            text_pages: self.text_pages,
            char_count: self.char_count(),
            sha256: self.sha256.clone(),
            truncated: self.truncated,
            uploaded_at: chrono::Utc::now(),
        }
    }
}

pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn extract_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    // pdf-extract panics on some malformed inputs
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }));
    match result {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(ExtractError::Corrupt(e.to_string())),
        Err(_) => Err(ExtractError::Corrupt("malformed document".into())),
    }
}

/// Cut `text` to at most `max_chars` chars. Returns whether anything was cut.
pub fn truncate_chars(text: &mut String, max_chars: usize) -> bool {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => {
            text.truncate(idx);
            true
        },
        None => false,
    }
}

/// Extract the text of a PDF held in memory.
///
/// Pages without text are skipped and the rest are joined with a newline.
/// Documents longer than `max_chars` are truncated.
pub fn extract_text(bytes: &[u8], max_chars: usize) -> Result<ExtractedDocument, ExtractError> {
    if !is_pdf(bytes) {
        return Err(ExtractError::NotPdf);
    }

    let pages = extract_pages(bytes).inspect_err(|e| warn!("pdf extraction failed: {e}"))?;
    let page_count = pages.len();

    let texts: Vec<&str> = pages
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();
    let text_pages = texts.len();
    let mut text = texts.join("\n");

    if text.trim().is_empty() {
        warn!(pages = page_count, "pdf has no extractable text");
        return Err(ExtractError::NoText);
    }

    let truncated = truncate_chars(&mut text, max_chars);
    if truncated {
        warn!(max_chars, "pdf text truncated");
    }

    let doc = ExtractedDocument {
        text,
        page_count,
        text_pages,
        sha256: fingerprint(bytes),
        truncated,
    };
    info!(
        pages = page_count,
        text_pages,
        chars = doc.char_count(),
        "pdf text extracted"
    );
    Ok(doc)
}
