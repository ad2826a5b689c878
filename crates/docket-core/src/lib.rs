pub mod analysis;
pub mod config;
pub mod document;
pub mod export;
pub mod llm;
pub mod prompts;
pub mod session;
pub mod types;

pub use types::*;
