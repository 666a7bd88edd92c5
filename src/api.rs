//! HTTP API for the `WhatsApp` intake bot
//!
//! `POST /whatsapp` is the Twilio webhook, `GET /reports` feeds the dashboard.

mod handlers;
mod twiml;
mod types;

pub use handlers::create_router;

use crate::runtime::SharedEngine;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SharedEngine>,
}

impl AppState {
    pub fn new(engine: SharedEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}
