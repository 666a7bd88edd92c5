//! Runtime for executing conversations
//!
//! The engine owns the session store and the collaborator ports; the webhook
//! hands it one parsed message at a time and gets the replies back.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::ConversationEngine;
pub use traits::*;

use std::sync::Arc;

/// Engine with type-erased ports, as wired up by `main` and the API layer
pub type SharedEngine = ConversationEngine<
    Arc<dyn MediaFetcher>,
    Arc<dyn MediaExtractor>,
    Arc<dyn Geocoder>,
    Arc<dyn ReportStore>,
>;
