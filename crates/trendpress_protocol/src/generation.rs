//! Request/response shapes for the text-generation provider.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConstraints {
    pub max_tokens: u32,
    /// Approximate article length the prompt asks for.
    pub target_words: u32,
    /// BCP-47 tag, e.g. "ko" or "en".
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl Default for GenerationConstraints {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            target_words: 1500,
            language: "ko".to_string(),
            temperature: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub constraints: GenerationConstraints,
}

/// Draft text plus the accounting the provider reports for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
    pub latency_ms: u64,
}
