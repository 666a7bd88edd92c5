//! Conversation state types

use crate::report::WasteAttributes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of media a report can be submitted with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Audio,
}

impl MediaKind {
    /// Substring a declared MIME type must contain to count as this kind
    pub fn mime_marker(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
        }
    }

    /// Whether a declared content type (e.g. `image/jpeg`) is of this kind
    pub fn matches(self, content_type: &str) -> bool {
        content_type
            .to_ascii_lowercase()
            .contains(self.mime_marker())
    }

    /// The state that waits for media of this kind
    pub fn awaiting_state(self) -> ConvState {
        match self {
            MediaKind::Image => ConvState::AwaitingImage,
            MediaKind::Audio => ConvState::AwaitingVoice,
        }
    }
}

// ============================================================================
// Conversation State
// ============================================================================

/// Position of one sender in the reporting flow.
///
/// `Extracting`, `Geocoding` and `Saving` are transient: they only exist while
/// the runtime is executing the effects of a single inbound message and are
/// never committed to the session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConvState {
    /// First contact, or the menu was shown and no report requested yet
    #[default]
    Welcome,

    /// Waiting for the sender to pick text, voice or image
    SelectReportType,

    /// Free-text path. Descriptions sent here are not processed further.
    AwaitingWasteDetails,

    /// Waiting for a voice note
    AwaitingVoice,

    /// Waiting for a photo
    AwaitingImage,

    /// Media accepted, AI extraction in flight
    Extracting { kind: MediaKind, media_url: String },

    /// Attributes captured, waiting for a location
    AskLocation {
        description: WasteAttributes,
        image_ref: Option<String>,
    },

    /// Location text received, geocoding in flight
    Geocoding {
        description: WasteAttributes,
        image_ref: Option<String>,
    },

    /// Report finalized, store write in flight
    Saving {
        description: WasteAttributes,
        image_ref: Option<String>,
    },

    /// Report persisted. The session is dropped rather than stored.
    Completed,
}

impl ConvState {
    /// Check if the reporting cycle is over
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConvState::Completed)
    }

    /// Check if an effect for this state is still outstanding
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ConvState::Extracting { .. } | ConvState::Geocoding { .. } | ConvState::Saving { .. }
        )
    }

    /// Captured waste attributes, once media has been classified
    pub fn description(&self) -> Option<&WasteAttributes> {
        match self {
            ConvState::AskLocation { description, .. }
            | ConvState::Geocoding { description, .. }
            | ConvState::Saving { description, .. } => Some(description),
            _ => None,
        }
    }

    /// Reference to the submitted photo (image reports only)
    pub fn image_ref(&self) -> Option<&str> {
        match self {
            ConvState::AskLocation { image_ref, .. }
            | ConvState::Geocoding { image_ref, .. }
            | ConvState::Saving { image_ref, .. } => image_ref.as_deref(),
            _ => None,
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            ConvState::Welcome => "welcome",
            ConvState::SelectReportType => "select_report_type",
            ConvState::AwaitingWasteDetails => "ask_waste_details",
            ConvState::AwaitingVoice => "awaiting_voice",
            ConvState::AwaitingImage => "awaiting_image",
            ConvState::Extracting { .. } => "extracting",
            ConvState::AskLocation { .. } => "ask_location",
            ConvState::Geocoding { .. } => "geocoding",
            ConvState::Saving { .. } => "saving",
            ConvState::Completed => "completed",
        }
    }
}

/// Per-message context (immutable while one inbound message is processed)
#[derive(Debug, Clone)]
pub struct ConvContext {
    pub sender_id: String,
    /// No session existed for this sender before this message
    pub first_contact: bool,
    /// When the inbound message was received; stamps finalized reports
    pub received_at: DateTime<Utc>,
}

impl ConvContext {
    pub fn new(sender_id: impl Into<String>, first_contact: bool) -> Self {
        Self {
            sender_id: sender_id.into(),
            first_contact,
            received_at: Utc::now(),
        }
    }
}
