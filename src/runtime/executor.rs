//! Conversation engine executor

use super::traits::{Geocoder, MediaExtractor, MediaFetcher, ReportStore};
use crate::replies;
use crate::session::SessionStore;
use crate::state_machine::{
    transition, ConvContext, ConvState, Effect, Event, InboundMessage, MediaAttachment, MediaKind,
    TransitionError,
};
use std::collections::VecDeque;
use std::sync::Arc;

/// Upper bound on transitions triggered by one inbound message. The longest
/// legitimate chain (location -> geocode -> save) is three.
const MAX_EVENTS_PER_MESSAGE: usize = 8;

/// Final state and replies of one applied message
#[derive(Debug)]
struct Applied {
    state: ConvState,
    replies: Vec<String>,
}

/// Drives the state machine for every sender, executing its effects against
/// the injected ports.
pub struct ConversationEngine<F, X, G, R>
where
    F: MediaFetcher,
    X: MediaExtractor,
    G: Geocoder,
    R: ReportStore,
{
    sessions: Arc<SessionStore>,
    fetcher: F,
    extractor: X,
    geocoder: G,
    store: R,
}

impl<F, X, G, R> ConversationEngine<F, X, G, R>
where
    F: MediaFetcher,
    X: MediaExtractor,
    G: Geocoder,
    R: ReportStore,
{
    pub fn new(
        sessions: Arc<SessionStore>,
        fetcher: F,
        extractor: X,
        geocoder: G,
        store: R,
    ) -> Self {
        Self {
            sessions,
            fetcher,
            extractor,
            geocoder,
            store,
        }
    }

    #[cfg(test)]
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn reports(&self) -> &R {
        &self.store
    }

    /// Apply one inbound message and return the replies, in order.
    ///
    /// The sender's session is locked for the whole message and written back
    /// once at the end. A rejected event leaves the stored session as it was.
    /// A closed session gives up its slot so the store does not grow with
    /// every sender ever seen.
    pub async fn handle_message(&self, message: InboundMessage) -> Vec<String> {
        let sender_id = message.sender_id.clone();
        let mut guard = self.sessions.lock(&sender_id).await;

        let (state, first_contact) = match guard.session() {
            Some(session) => (session.state.clone(), false),
            None => (ConvState::default(), true),
        };
        let context = ConvContext::new(&sender_id, first_contact);

        if matches!(state, ConvState::AwaitingWasteDetails) {
            tracing::warn!(sender = %sender_id, "Free-text report received; text descriptions are not processed");
        }

        let outgoing = match self.apply(state, &context, Event::Inbound(message)).await {
            Ok(applied) => {
                if applied.state.is_terminal() {
                    tracing::info!(sender = %sender_id, "Report cycle completed, session closed");
                    guard.clear();
                } else {
                    guard.commit(applied.state);
                    if let Some(session) = guard.session() {
                        tracing::debug!(
                            sender = %sender_id,
                            state = session.state.name(),
                            waste_type = session.description().map(|d| d.waste_type.as_str()),
                            has_image = session.image_ref().is_some(),
                            "Session updated"
                        );
                    }
                }
                applied.replies
            }
            Err(e) => {
                tracing::warn!(sender = %sender_id, error = %e, "Message rejected, session unchanged");
                vec![replies::TRY_AGAIN.to_string()]
            }
        };

        drop(guard);
        self.sessions.release(&sender_id);
        outgoing
    }

    async fn apply(
        &self,
        mut state: ConvState,
        context: &ConvContext,
        event: Event,
    ) -> Result<Applied, TransitionError> {
        let mut replies = Vec::new();
        let mut events = VecDeque::from([event]);
        let mut processed = 0;

        while let Some(event) = events.pop_front() {
            processed += 1;
            if processed > MAX_EVENTS_PER_MESSAGE {
                return Err(TransitionError::InvalidTransition(format!(
                    "More than {MAX_EVENTS_PER_MESSAGE} events for one message"
                )));
            }

            let result = transition(&state, context, event)?;
            state = result.new_state;

            for effect in result.effects {
                if let Some(next) = self.execute_effect(effect, context, &mut replies).await {
                    events.push_back(next);
                }
            }
        }

        Ok(Applied { state, replies })
    }

    /// Execute one effect. Collaborator outcomes come back as the next event.
    async fn execute_effect(
        &self,
        effect: Effect,
        context: &ConvContext,
        replies: &mut Vec<String>,
    ) -> Option<Event> {
        let sender = context.sender_id.as_str();
        let event = match effect {
            Effect::Reply { text } => {
                replies.push(text);
                return None;
            }

            Effect::ExtractMedia { kind, media } => self.extract(kind, &media, sender).await,

            Effect::ResolveLocation { text } => match self.geocoder.geocode(&text).await {
                Ok(Some(location)) => {
                    tracing::debug!(sender, lat = location.lat, lng = location.lng, "Location resolved");
                    Event::LocationResolved { location }
                }
                Ok(None) => {
                    tracing::info!(sender, "Location text not recognized");
                    Event::LocationUnresolved
                }
                Err(e) => {
                    tracing::warn!(sender, error = %e, "Geocoding failed");
                    Event::GeocodeFailed {
                        message: e.to_string(),
                    }
                }
            },

            Effect::PersistReport { report } => match self.store.add_report(&report).await {
                Ok(report_id) => {
                    tracing::info!(
                        sender,
                        report_id = %report_id,
                        waste_type = %report.waste_type,
                        points = report.points,
                        "Report saved"
                    );
                    Event::ReportSaved { report_id }
                }
                Err(e) => {
                    tracing::error!(sender, error = %e, "Failed to save report");
                    Event::ReportSaveFailed {
                        message: e.to_string(),
                    }
                }
            },
        };
        Some(event)
    }

    async fn extract(&self, kind: MediaKind, media: &MediaAttachment, sender: &str) -> Event {
        let fetched = match self.fetcher.fetch(media).await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!(sender, url = %media.url, error = %e, "Media download failed");
                return Event::ExtractionFailed {
                    message: e.to_string(),
                };
            }
        };

        match self.extractor.extract(&fetched, kind).await {
            Ok(attributes) => {
                tracing::info!(
                    sender,
                    waste_type = %attributes.waste_type,
                    quantity = %attributes.quantity,
                    "Media extracted"
                );
                Event::MediaExtracted { attributes }
            }
            Err(e) => {
                tracing::warn!(sender, error = %e, "Media extraction failed");
                Event::ExtractionFailed {
                    message: e.to_string(),
                }
            }
        }
    }
}
