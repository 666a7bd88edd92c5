//! Outbound message texts

use crate::state_machine::MediaKind;

pub const WELCOME: &str = "👋 Hi! Welcome to EcoVoice!\n\n\
How can we help you today? Please select an option:\n\
👉 *1. I want to report waste at an unwanted place*\n\n\
Reply with *report* to get started.";

pub const REPORT_TYPE_MENU: &str = "How would you like to report the waste?\n\
✍️ *text* - describe it in a message\n\
🎙 *voice* - send a voice note\n\
📷 *image* - send a photo";

pub const DESCRIBE_WASTE: &str = "Okay! Please describe the waste:\n\
- Type of waste\n\
- Approximate quantity (Small/Medium/Large)";

pub const ASK_VOICE: &str = "🎙 Please send a voice note describing the waste.";
pub const ASK_IMAGE: &str = "📷 Please send an image of the waste.";

pub const PROCESSING_VOICE: &str = "🎙 Processing voice note with AI...";
pub const PROCESSING_IMAGE: &str = "📷 Processing image with AI...";

pub const VOICE_NOT_UNDERSTOOD: &str =
    "⚠ We couldn't make sense of that voice note. Please send it again.";
pub const IMAGE_NOT_UNDERSTOOD: &str =
    "⚠ We couldn't make sense of that image. Please send it again.";

pub const ASK_LOCATION: &str = "📍 Where is the waste? Send an address, a landmark, \
or coordinates like *12.97,77.59*.";

pub const LOCATION_NOT_RECOGNIZED: &str = "⚠ Location format not recognized. Please try again.";

pub const TRY_AGAIN: &str = "⚠ Something went wrong on our side. Please try again.";

pub const THANKS: &str = "✅ Thanks for your time! We will get the issue resolved ASAP. 🌍";

/// Prompt asking for media of `kind`
pub fn ask_media(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Image => ASK_IMAGE,
        MediaKind::Audio => ASK_VOICE,
    }
}

/// Acknowledgement sent before extraction starts
pub fn processing(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Image => PROCESSING_IMAGE,
        MediaKind::Audio => PROCESSING_VOICE,
    }
}

/// Sent when extraction on media of `kind` failed
pub fn not_understood(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Image => IMAGE_NOT_UNDERSTOOD,
        MediaKind::Audio => VOICE_NOT_UNDERSTOOD,
    }
}
