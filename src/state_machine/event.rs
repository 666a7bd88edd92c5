//! Events that can occur in a conversation

use super::state::MediaKind;
use crate::report::{Location, WasteAttributes};
use serde::{Deserialize, Serialize};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // Sender events
    Inbound(InboundMessage),

    // Extraction events
    MediaExtracted {
        attributes: WasteAttributes,
    },
    ExtractionFailed {
        message: String,
    },

    // Geocoding events
    LocationResolved {
        location: Location,
    },
    LocationUnresolved,
    GeocodeFailed {
        message: String,
    },

    // Store events
    ReportSaved {
        report_id: String,
    },
    ReportSaveFailed {
        message: String,
    },
}

/// First attachment of an inbound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub url: String,
    pub content_type: String,
}

/// One inbound chat message, already parsed out of the webhook form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub sender_id: String,
    pub body: String,
    /// Attachment count as declared by the channel
    pub num_media: u32,
    pub media: Option<MediaAttachment>,
}

impl InboundMessage {
    #[cfg(test)]
    pub fn text(sender_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            body: body.into(),
            num_media: 0,
            media: None,
        }
    }

    #[cfg(test)]
    pub fn with_media(mut self, url: impl Into<String>, content_type: impl Into<String>) -> Self {
        self.num_media = self.num_media.max(1);
        self.media = Some(MediaAttachment {
            url: url.into(),
            content_type: content_type.into(),
        });
        self
    }

    /// Case-insensitive substring match against the body
    pub fn mentions(&self, keyword: &str) -> bool {
        self.body
            .to_lowercase()
            .contains(&keyword.to_lowercase())
    }

    /// The first attachment, if at least one was declared and it is of `kind`
    pub fn media_of(&self, kind: MediaKind) -> Option<&MediaAttachment> {
        if self.num_media == 0 {
            return None;
        }
        self.media
            .as_ref()
            .filter(|media| kind.matches(&media.content_type))
    }
}
