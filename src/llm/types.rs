//! Common types for LLM interactions

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// LLM request: a single user turn, optionally with inline media
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub system: Option<String>,
    pub content: Vec<ContentBlock>,
    pub max_tokens: Option<u32>,
    pub response_format: ResponseFormat,
}

/// What the model is asked to emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Text,
    Json,
}

/// Content block in a request
#[derive(Debug, Clone)]
pub enum ContentBlock {
    Text { text: String },
    /// Raw media sent inline with the request
    Media { mime_type: String, data: Vec<u8> },
}

impl ContentBlock {
    pub fn text(s: impl Into<String>) -> Self {
        ContentBlock::Text { text: s.into() }
    }

    pub fn media(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        ContentBlock::Media {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Base64 payload for media blocks
    pub fn base64_data(&self) -> Option<String> {
        match self {
            ContentBlock::Media { data, .. } => Some(STANDARD.encode(data)),
            ContentBlock::Text { .. } => None,
        }
    }
}

/// LLM response
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub usage: Usage,
}

/// Usage statistics
#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}
