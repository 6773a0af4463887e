//! Analysis agents
//!
//! Each agent is a thin prompt builder over the shared [`TextGenerator`]:
//! it shapes a prompt from structured input, forwards it, and returns the
//! text response. No retries, no local control logic, no state.
//!
//! [`TextGenerator`]: crate::llm::TextGenerator

mod competitive;
mod synthesis;
mod trends;

pub use competitive::CompetitiveIntelligenceAgent;
pub use synthesis::SynthesisAgent;
pub use trends::MarketTrendAgent;

use serde_json::Value;

/// Render a JSON value as an indented block for prompt interpolation.
fn context_block(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
