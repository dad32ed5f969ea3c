//! LLM-powered natural language to SQL synthesis.

pub mod client;
pub mod extract;
pub mod prompt;
pub mod synthesizer;

pub use client::{LlmClient, LlmProvider, SqlGenerator};
pub use extract::{extract_sql, fenced_block};
pub use synthesizer::{QuerySynthesizer, Synthesis};
