//! API request and response types

use crate::state_machine::{InboundMessage, MediaAttachment};
use serde::{Deserialize, Serialize};

/// Fields of the Twilio `WhatsApp` webhook form that the bot reads
#[derive(Debug, Default, Deserialize)]
pub struct TwilioWebhook {
    #[serde(rename = "From", default)]
    pub from: String,
    #[serde(rename = "Body", default)]
    pub body: String,
    /// Kept as text so a malformed count reads as zero instead of failing the form
    #[serde(rename = "NumMedia", default)]
    pub num_media: Option<String>,
    #[serde(rename = "MediaUrl0", default)]
    pub media_url: Option<String>,
    #[serde(rename = "MediaContentType0", default)]
    pub media_content_type: Option<String>,
}

impl TwilioWebhook {
    pub fn num_media(&self) -> u32 {
        self.num_media
            .as_deref()
            .and_then(|n| n.trim().parse().ok())
            .unwrap_or(0)
    }

    pub fn into_message(self) -> InboundMessage {
        let num_media = self.num_media();
        let media = self
            .media_url
            .filter(|url| num_media > 0 && !url.is_empty())
            .map(|url| MediaAttachment {
                url,
                content_type: self.media_content_type.unwrap_or_default(),
            });

        InboundMessage {
            sender_id: self.from,
            body: self.body,
            num_media,
            media,
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
