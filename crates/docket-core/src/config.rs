use std::collections::HashMap;

use anyhow::{bail, Result};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Full application configuration.
/// Everything is read from the process env, falling back to `.env` in the
/// working directory, then to the defaults below.
#[derive(Debug, Clone)]
pub struct Config {
    /// "gemini" (default) or "ollama".
    pub backend: String,

    // Gemini
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub model: String,

    // Ollama
    pub ollama_url: String,
    pub ollama_model: String,

    /// Per-call timeout for completion requests.
    pub llm_timeout_s: u64,

    // Web
    pub web_bind: String,
    pub web_port: u16,
    pub max_upload_mb: usize,
    /// Mark the session cookie `Secure`. Set when served over HTTPS.
    pub cookie_secure: bool,

    // Documents / chat
    /// Document text beyond this many chars is cut before prompting.
    pub max_document_chars: usize,
    /// How many earlier transcript messages are replayed into a Q&A prompt.
    pub chat_history_turns: usize,

    // Sessions
    pub session_max_age_minutes: i64,

    // Logging
    pub log_ring_size: usize,
}

fn parse_dotenv() -> HashMap<String, String> {
    let Ok(contents) = std::fs::read_to_string(".env") else {
        return HashMap::new();
    };
    parse_dotenv_str(&contents)
}

fn parse_dotenv_str(contents: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            let v = v.trim().trim_matches('"');
            map.insert(k.trim().to_string(), v.to_string());
        }
    }
    map
}

fn get(key: &str, env: &HashMap<String, String>) -> Option<String> {
    env.get(key).filter(|v| !v.is_empty()).cloned()
}

fn get_str(key: &str, env: &HashMap<String, String>, default: &str) -> String {
    get(key, env).unwrap_or_else(|| default.to_string())
}

fn get_i64(key: &str, env: &HashMap<String, String>, default: i64) -> i64 {
    get(key, env)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn get_u64(key: &str, env: &HashMap<String, String>, default: u64) -> u64 {
    get(key, env)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn get_usize(key: &str, env: &HashMap<String, String>, default: usize) -> usize {
    get(key, env)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn get_bool(key: &str, env: &HashMap<String, String>, default: bool) -> bool {
    match get(key, env).map(|v| v.to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

fn get_u16(key: &str, env: &HashMap<String, String>, default: u16) -> u16 {
    get(key, env)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load from process env layered over `.env`, then validate.
    pub fn from_env() -> Result<Self> {
        let mut vars = parse_dotenv();
        vars.extend(std::env::vars());
        let config = Self::from_map(&vars);
        config.validate()?;
        Ok(config)
    }

    /// Build a config from an explicit key/value map. Does not validate.
    pub fn from_map(env: &HashMap<String, String>) -> Self {
        let backend = get_str("BACKEND", env, "gemini").to_lowercase();
        Self {
            backend,
            gemini_api_key: get_str("GEMINI_API_KEY", env, ""),
            gemini_base_url: get_str("GEMINI_BASE_URL", env, DEFAULT_GEMINI_BASE_URL),
            model: get_str("MODEL", env, DEFAULT_GEMINI_MODEL),
            ollama_url: get_str("OLLAMA_URL", env, "http://127.0.0.1:11434"),
            ollama_model: get_str("OLLAMA_MODEL", env, "llama3.1"),
            llm_timeout_s: get_u64("LLM_TIMEOUT_S", env, 120),
            web_bind: get_str("WEB_BIND", env, "127.0.0.1"),
            web_port: get_u16("WEB_PORT", env, 8501),
            max_upload_mb: get_usize("MAX_UPLOAD_MB", env, 20),
            cookie_secure: get_bool("COOKIE_SECURE", env, false),
            max_document_chars: get_usize("MAX_DOCUMENT_CHARS", env, 400_000),
            chat_history_turns: get_usize("CHAT_HISTORY_TURNS", env, 10),
            session_max_age_minutes: get_i64("SESSION_MAX_AGE_MINUTES", env, 120),
            log_ring_size: get_usize("LOG_RING_SIZE", env, 500),
        }
    }

    /// Build a config from `.env`-formatted text. Used by tests and tooling.
    pub fn from_dotenv_str(contents: &str) -> Self {
        Self::from_map(&parse_dotenv_str(contents))
    }

    pub fn validate(&self) -> Result<()> {
        match self.backend.as_str() {
            "gemini" => {
                if self.gemini_api_key.is_empty() {
                    bail!("Gemini API key not found. Set GEMINI_API_KEY in the environment or in .env");
                }
            },
            "ollama" => {},
            other => bail!("unknown BACKEND {other:?} (expected \"gemini\" or \"ollama\")"),
        }
        if self.max_upload_mb == 0 {
            bail!("MAX_UPLOAD_MB must be at least 1");
        }
        Ok(())
    }

    /// Model name of the active backend.
    pub fn active_model(&self) -> &str {
        match self.backend.as_str() {
            "ollama" => &self.ollama_model,
            _ => &self.model,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_map(&HashMap::new())
    }
}
