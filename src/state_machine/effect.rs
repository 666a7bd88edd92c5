//! Effects produced by state transitions

use super::event::MediaAttachment;
use super::state::MediaKind;
use crate::report::WasteReport;

/// Effects to be executed after state transition
#[derive(Debug, Clone)]
pub enum Effect {
    /// Send a text message back to the sender
    Reply { text: String },

    /// Download the attachment and run AI extraction on it
    ExtractMedia {
        kind: MediaKind,
        media: MediaAttachment,
    },

    /// Geocode free-form location text
    ResolveLocation { text: String },

    /// Append a finalized report to the record store
    PersistReport { report: WasteReport },
}

impl Effect {
    pub fn reply(text: impl Into<String>) -> Self {
        Effect::Reply { text: text.into() }
    }

    /// Reply text, if this is a reply
    pub fn reply_text(&self) -> Option<&str> {
        match self {
            Effect::Reply { text } => Some(text),
            _ => None,
        }
    }
}
