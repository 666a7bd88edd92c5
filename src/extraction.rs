//! Waste attribute extraction using a multimodal LLM
//!
//! Sends the photo or voice note inline and asks for a small JSON object.
//! The model is an oracle that can misbehave, so every failure mode comes
//! back as an [`ExtractionError`] for the conversation to re-prompt on.

use crate::llm::{ContentBlock, LlmError, LlmRequest, LlmService, ResponseFormat};
use crate::media::FetchedMedia;
use crate::report::WasteAttributes;
use crate::runtime::MediaExtractor;
use crate::state_machine::MediaKind;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

const EXTRACTION_PROMPT: &str = "Extract structured data: waste type, quantity, severity.";

const SHAPE_INSTRUCTION: &str = r#"Respond with a single JSON object and nothing else:
{"type": "...", "quantity": "...", "severity": "..."}
- type: one of Plastic, Organic, Sewage, Hazardous, or a short category name if none fit
- quantity: one of Small, Medium, Large
- severity: one of Low, Medium, High"#;

const EXTRACTION_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_OUTPUT_TOKENS: u32 = 256;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmError),
    #[error("Extraction timed out after {0:?}")]
    Timeout(Duration),
    #[error("Unparseable extraction output: {0}")]
    Malformed(String),
    #[error("Extraction returned no waste type")]
    Empty,
    #[error("No extraction model is configured")]
    Unavailable,
}

/// `MediaExtractor` backed by an LLM service
pub struct LlmExtractor {
    llm: Arc<dyn LlmService>,
}

impl LlmExtractor {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl MediaExtractor for LlmExtractor {
    async fn extract(
        &self,
        media: &FetchedMedia,
        kind: MediaKind,
    ) -> Result<WasteAttributes, ExtractionError> {
        let request = LlmRequest {
            system: None,
            content: vec![
                ContentBlock::media(&media.mime_type, media.bytes.clone()),
                ContentBlock::text(format!(
                    "This {} shows or describes waste reported by a citizen.\n{EXTRACTION_PROMPT}\n{SHAPE_INSTRUCTION}",
                    match kind {
                        MediaKind::Image => "image",
                        MediaKind::Audio => "voice note",
                    }
                )),
            ],
            max_tokens: Some(MAX_OUTPUT_TOKENS),
            response_format: ResponseFormat::Json,
        };

        let response = timeout(EXTRACTION_TIMEOUT, self.llm.complete(&request))
            .await
            .map_err(|_| ExtractionError::Timeout(EXTRACTION_TIMEOUT))??;

        parse_attributes(&response.text)
    }
}

/// Stand-in when no model is configured. Every attempt fails, so senders are
/// asked to resend instead of the webhook erroring out.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableExtractor;

#[async_trait]
impl MediaExtractor for UnavailableExtractor {
    async fn extract(
        &self,
        _media: &FetchedMedia,
        _kind: MediaKind,
    ) -> Result<WasteAttributes, ExtractionError> {
        Err(ExtractionError::Unavailable)
    }
}

/// Parse model output into attributes, tolerating code fences, prose around
/// the object, or a one-element array.
pub fn parse_attributes(raw: &str) -> Result<WasteAttributes, ExtractionError> {
    let trimmed = strip_code_fence(raw.trim());

    let value: serde_json::Value = serde_json::from_str(trimmed)
        .or_else(|_| serde_json::from_str(outermost_object(trimmed).unwrap_or(trimmed)))
        .map_err(|e| ExtractionError::Malformed(e.to_string()))?;

    let object = match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .next()
            .ok_or(ExtractionError::Empty)?,
        other => other,
    };

    let attributes: WasteAttributes =
        serde_json::from_value(object).map_err(|e| ExtractionError::Malformed(e.to_string()))?;

    if attributes.waste_type.trim().is_empty() {
        return Err(ExtractionError::Empty);
    }
    Ok(attributes)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop an info string such as `json` on the opening fence line
    let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    text.get(start..=end)
}
