//! Pure state transition function
//!
//! Given the same state, context and event this always produces the same
//! new state and effects. Collaborator calls happen in the runtime, which
//! reports their outcome back as events.

use super::{ConvContext, ConvState, Effect, Event, MediaKind};
use crate::replies;
use crate::report::finalize;
use thiserror::Error;

const REPORT_KEYWORD: &str = "report";

/// Report type keywords, checked in this order
const REPORT_TYPE_KEYWORDS: [(&str, ReportType); 3] = [
    ("text", ReportType::Text),
    ("voice", ReportType::Media(MediaKind::Audio)),
    ("image", ReportType::Media(MediaKind::Image)),
];

#[derive(Debug, Clone, Copy)]
enum ReportType {
    Text,
    Media(MediaKind),
}

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.with_effect(Effect::reply(text))
    }

    /// Reply texts in the order they were produced
    #[cfg(test)]
    pub fn replies(&self) -> impl Iterator<Item = &str> {
        self.effects.iter().filter_map(Effect::reply_text)
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A {0} step is still in flight for this sender")]
    Busy(&'static str),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(
    state: &ConvState,
    context: &ConvContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Welcome
        // ============================================================

        // A brand-new sender always sees the welcome menu, and the same
        // message can already carry the report keyword.
        (ConvState::Welcome, Event::Inbound(msg)) if context.first_contact => {
            if msg.mentions(REPORT_KEYWORD) {
                Ok(TransitionResult::new(ConvState::SelectReportType)
                    .with_reply(replies::WELCOME)
                    .with_reply(replies::REPORT_TYPE_MENU))
            } else {
                Ok(TransitionResult::new(ConvState::Welcome).with_reply(replies::WELCOME))
            }
        }

        (ConvState::Welcome, Event::Inbound(msg)) => {
            if msg.mentions(REPORT_KEYWORD) {
                Ok(TransitionResult::new(ConvState::SelectReportType)
                    .with_reply(replies::REPORT_TYPE_MENU))
            } else {
                Ok(TransitionResult::new(ConvState::Welcome).with_reply(replies::WELCOME))
            }
        }

        // ============================================================
        // Report type selection
        // ============================================================
        (ConvState::SelectReportType, Event::Inbound(msg)) => {
            let selected = REPORT_TYPE_KEYWORDS
                .iter()
                .find(|(keyword, _)| msg.mentions(keyword))
                .map(|(_, report_type)| *report_type);

            Ok(match selected {
                Some(ReportType::Text) => TransitionResult::new(ConvState::AwaitingWasteDetails)
                    .with_reply(replies::DESCRIBE_WASTE),
                Some(ReportType::Media(kind)) => {
                    TransitionResult::new(kind.awaiting_state()).with_reply(replies::ask_media(kind))
                }
                None => TransitionResult::new(ConvState::SelectReportType)
                    .with_reply(replies::REPORT_TYPE_MENU),
            })
        }

        // Free-text descriptions are not extracted; the sender stays here.
        (ConvState::AwaitingWasteDetails, Event::Inbound(_)) => {
            Ok(TransitionResult::new(ConvState::AwaitingWasteDetails)
                .with_reply(replies::DESCRIBE_WASTE))
        }

        // ============================================================
        // Media submission
        // ============================================================
        (ConvState::AwaitingVoice, Event::Inbound(msg)) => {
            Ok(accept_media(MediaKind::Audio, &msg))
        }

        (ConvState::AwaitingImage, Event::Inbound(msg)) => {
            Ok(accept_media(MediaKind::Image, &msg))
        }

        (ConvState::Extracting { kind, media_url }, Event::MediaExtracted { attributes }) => {
            let image_ref = match kind {
                MediaKind::Image => Some(media_url.clone()),
                MediaKind::Audio => None,
            };
            Ok(TransitionResult::new(ConvState::AskLocation {
                description: attributes,
                image_ref,
            })
            .with_reply(replies::ASK_LOCATION))
        }

        (ConvState::Extracting { kind, .. }, Event::ExtractionFailed { .. }) => {
            Ok(TransitionResult::new(kind.awaiting_state())
                .with_reply(replies::not_understood(*kind)))
        }

        // ============================================================
        // Location
        // ============================================================
        (
            ConvState::AskLocation {
                description,
                image_ref,
            },
            Event::Inbound(msg),
        ) => Ok(TransitionResult::new(ConvState::Geocoding {
            description: description.clone(),
            image_ref: image_ref.clone(),
        })
        .with_effect(Effect::ResolveLocation { text: msg.body })),

        (
            ConvState::Geocoding {
                description,
                image_ref,
            },
            Event::LocationResolved { location },
        ) => {
            let report = finalize(
                description,
                location,
                &context.sender_id,
                image_ref.as_deref(),
                context.received_at,
            );
            Ok(TransitionResult::new(ConvState::Saving {
                description: description.clone(),
                image_ref: image_ref.clone(),
            })
            .with_effect(Effect::PersistReport { report }))
        }

        (
            ConvState::Geocoding {
                description,
                image_ref,
            },
            Event::LocationUnresolved,
        ) => Ok(TransitionResult::new(ConvState::AskLocation {
            description: description.clone(),
            image_ref: image_ref.clone(),
        })
        .with_reply(replies::LOCATION_NOT_RECOGNIZED)),

        (
            ConvState::Geocoding {
                description,
                image_ref,
            },
            Event::GeocodeFailed { .. },
        ) => Ok(TransitionResult::new(ConvState::AskLocation {
            description: description.clone(),
            image_ref: image_ref.clone(),
        })
        .with_reply(replies::TRY_AGAIN)),

        // ============================================================
        // Persistence
        // ============================================================
        (ConvState::Saving { .. }, Event::ReportSaved { .. }) => {
            Ok(TransitionResult::new(ConvState::Completed).with_reply(replies::THANKS))
        }

        (
            ConvState::Saving {
                description,
                image_ref,
            },
            Event::ReportSaveFailed { .. },
        ) => Ok(TransitionResult::new(ConvState::AskLocation {
            description: description.clone(),
            image_ref: image_ref.clone(),
        })
        .with_reply(replies::TRY_AGAIN)),

        // ============================================================
        // Rejections
        // ============================================================
        (state, Event::Inbound(_)) if state.is_transient() => {
            Err(TransitionError::Busy(state.name()))
        }

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {} with event {event:?}",
            state.name()
        ))),
    }
}

/// Voice and image steps: advance only on an attachment of the right kind,
/// otherwise ask again.
fn accept_media(kind: MediaKind, msg: &super::InboundMessage) -> TransitionResult {
    match msg.media_of(kind) {
        Some(media) => TransitionResult::new(ConvState::Extracting {
            kind,
            media_url: media.url.clone(),
        })
        .with_reply(replies::processing(kind))
        .with_effect(Effect::ExtractMedia {
            kind,
            media: media.clone(),
        }),
        None => TransitionResult::new(kind.awaiting_state()).with_reply(replies::ask_media(kind)),
    }
}
