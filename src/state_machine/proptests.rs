//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::*;
use super::transition::*;
use super::*;
use crate::replies;
use crate::report::{Location, WasteAttributes};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

const SENDER: &str = "whatsapp:+15550001";

fn context(first_contact: bool) -> ConvContext {
    ConvContext::new(SENDER, first_contact)
}

/// Filler text that can never contain any keyword
fn arb_filler() -> impl Strategy<Value = String> {
    "[0-9 .,!?]{0,20}"
}

/// A keyword in random letter case
fn arb_cased(keyword: &'static str) -> impl Strategy<Value = String> {
    proptest::collection::vec(any::<bool>(), keyword.len()).prop_map(move |upper| {
        keyword
            .chars()
            .zip(upper)
            .map(|(c, up)| if up { c.to_ascii_uppercase() } else { c })
            .collect()
    })
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_attributes() -> impl Strategy<Value = WasteAttributes> {
    (
        prop_oneof![
            Just("Plastic".to_string()),
            Just("Organic".to_string()),
            Just("Sewage".to_string()),
            Just("Hazardous".to_string()),
            "[A-Za-z]{0,12}",
        ],
        prop_oneof![
            Just("Small".to_string()),
            Just("Medium".to_string()),
            Just("Large".to_string()),
            "[A-Za-z]{0,12}",
        ],
    )
        .prop_map(|(waste_type, quantity)| WasteAttributes::new(waste_type, quantity))
}

fn arb_image_ref() -> impl Strategy<Value = Option<String>> {
    proptest::option::of("https://media\\.example/[a-z0-9]{6}")
}

fn arb_media_kind() -> impl Strategy<Value = MediaKind> {
    prop_oneof![Just(MediaKind::Image), Just(MediaKind::Audio)]
}

fn arb_inbound() -> impl Strategy<Value = InboundMessage> {
    (
        ".{0,40}",
        0u32..3,
        proptest::option::of((
            "https://media\\.example/[a-z0-9]{6}",
            prop_oneof![
                Just("image/jpeg".to_string()),
                Just("audio/ogg".to_string()),
                Just("video/mp4".to_string()),
                Just("application/pdf".to_string()),
            ],
        )),
    )
        .prop_map(|(body, num_media, media)| InboundMessage {
            sender_id: SENDER.to_string(),
            body,
            num_media,
            media: media.map(|(url, content_type)| MediaAttachment { url, content_type }),
        })
}

fn arb_state() -> impl Strategy<Value = ConvState> {
    prop_oneof![
        Just(ConvState::Welcome),
        Just(ConvState::SelectReportType),
        Just(ConvState::AwaitingWasteDetails),
        Just(ConvState::AwaitingVoice),
        Just(ConvState::AwaitingImage),
        (arb_media_kind(), "https://media\\.example/[a-z0-9]{6}")
            .prop_map(|(kind, media_url)| ConvState::Extracting { kind, media_url }),
        (arb_attributes(), arb_image_ref()).prop_map(|(description, image_ref)| {
            ConvState::AskLocation {
                description,
                image_ref,
            }
        }),
        (arb_attributes(), arb_image_ref()).prop_map(|(description, image_ref)| {
            ConvState::Geocoding {
                description,
                image_ref,
            }
        }),
        (arb_attributes(), arb_image_ref()).prop_map(|(description, image_ref)| {
            ConvState::Saving {
                description,
                image_ref,
            }
        }),
        Just(ConvState::Completed),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        arb_inbound().prop_map(Event::Inbound),
        arb_attributes().prop_map(|attributes| Event::MediaExtracted { attributes }),
        "[a-z ]{0,20}".prop_map(|message| Event::ExtractionFailed { message }),
        (-90.0f64..90.0, -180.0f64..180.0).prop_map(|(lat, lng)| Event::LocationResolved {
            location: Location::new(lat, lng),
        }),
        Just(Event::LocationUnresolved),
        "[a-z ]{0,20}".prop_map(|message| Event::GeocodeFailed { message }),
        "[a-f0-9]{8}".prop_map(|report_id| Event::ReportSaved { report_id }),
        "[a-z ]{0,20}".prop_map(|message| Event::ReportSaveFailed { message }),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// The transition function is total: it never panics, and a successful
    /// transition out of a settled state always says something to the sender
    /// or asks the runtime to do something.
    #[test]
    fn prop_transition_is_total(
        state in arb_state(),
        event in arb_event(),
        first_contact in any::<bool>(),
    ) {
        if let Ok(result) = transition(&state, &context(first_contact), event) {
            prop_assert!(!result.effects.is_empty());
        }
    }

    /// Same inputs, same outputs (apart from the timestamp carried in context)
    #[test]
    fn prop_transition_is_deterministic(state in arb_state(), event in arb_event()) {
        let ctx = context(false);
        let a = transition(&state, &ctx, event.clone());
        let b = transition(&state, &ctx, event);
        match (a, b) {
            (Ok(a), Ok(b)) => {
                prop_assert_eq!(a.new_state, b.new_state);
                prop_assert_eq!(a.effects.len(), b.effects.len());
            }
            (Err(a), Err(b)) => prop_assert_eq!(a, b),
            _ => prop_assert!(false, "results diverged"),
        }
    }

    /// Only a successful store write ends the cycle
    #[test]
    fn prop_completion_requires_saved_report(state in arb_state(), event in arb_event()) {
        let saved = matches!(event, Event::ReportSaved { .. });
        if let Ok(result) = transition(&state, &context(false), event) {
            if result.new_state.is_terminal() {
                prop_assert!(saved);
                let was_saving = matches!(state, ConvState::Saving { .. });
                prop_assert!(was_saving);
            }
        }
    }

    /// Without the keyword, a welcome-state sender is greeted again and stays put
    #[test]
    fn prop_welcome_without_keyword(body in arb_filler(), first_contact in any::<bool>()) {
        let event = Event::Inbound(InboundMessage::text(SENDER, body));
        let result = transition(&ConvState::Welcome, &context(first_contact), event).unwrap();
        prop_assert_eq!(&result.new_state, &ConvState::Welcome);
        prop_assert_eq!(result.replies().collect::<Vec<_>>(), vec![replies::WELCOME]);
    }

    /// The keyword in any case, anywhere in the text, advances to the menu
    #[test]
    fn prop_welcome_keyword_any_case(
        prefix in arb_filler(),
        keyword in arb_cased("report"),
        suffix in arb_filler(),
        first_contact in any::<bool>(),
    ) {
        let event = Event::Inbound(InboundMessage::text(SENDER, format!("{prefix}{keyword}{suffix}")));
        let result = transition(&ConvState::Welcome, &context(first_contact), event).unwrap();
        prop_assert_eq!(&result.new_state, &ConvState::SelectReportType);
        prop_assert_eq!(result.replies().last(), Some(replies::REPORT_TYPE_MENU));
    }

    /// Menu selection picks exactly the branch whose keyword was sent
    #[test]
    fn prop_report_type_selection(
        prefix in arb_filler(),
        choice in prop_oneof![
            arb_cased("text").prop_map(|k| (k, ConvState::AwaitingWasteDetails)),
            arb_cased("voice").prop_map(|k| (k, ConvState::AwaitingVoice)),
            arb_cased("image").prop_map(|k| (k, ConvState::AwaitingImage)),
        ],
        suffix in arb_filler(),
    ) {
        let (keyword, expected) = choice;
        let event = Event::Inbound(InboundMessage::text(SENDER, format!("{prefix}{keyword}{suffix}")));
        let result = transition(&ConvState::SelectReportType, &context(false), event).unwrap();
        prop_assert_eq!(result.new_state, expected);
    }

    /// Anything else re-issues the same menu and leaves the state alone
    #[test]
    fn prop_report_type_other_input(body in arb_filler()) {
        let event = Event::Inbound(InboundMessage::text(SENDER, body));
        let result = transition(&ConvState::SelectReportType, &context(false), event).unwrap();
        prop_assert_eq!(&result.new_state, &ConvState::SelectReportType);
        prop_assert_eq!(result.replies().collect::<Vec<_>>(), vec![replies::REPORT_TYPE_MENU]);
    }

    /// Location retries never lose the captured attributes
    #[test]
    fn prop_location_retry_preserves_description(
        description in arb_attributes(),
        image_ref in arb_image_ref(),
        body in ".{0,30}",
        failure in prop_oneof![
            Just(Event::LocationUnresolved),
            "[a-z]{0,10}".prop_map(|message| Event::GeocodeFailed { message }),
        ],
    ) {
        let ask = ConvState::AskLocation { description: description.clone(), image_ref: image_ref.clone() };
        let geocoding = transition(&ask, &context(false), Event::Inbound(InboundMessage::text(SENDER, body)))
            .unwrap()
            .new_state;
        let back = transition(&geocoding, &context(false), failure).unwrap().new_state;
        prop_assert_eq!(back.description(), Some(&description));
        prop_assert_eq!(back.image_ref(), image_ref.as_deref());
    }

    /// Media steps only advance on an attachment of their own kind
    #[test]
    fn prop_media_step_gate(kind in arb_media_kind(), msg in arb_inbound()) {
        let accepted = msg.num_media > 0
            && msg.media.as_ref().is_some_and(|m| m.content_type.contains(kind.mime_marker()));
        let result = transition(&kind.awaiting_state(), &context(false), Event::Inbound(msg)).unwrap();
        if accepted {
            let extracting = matches!(result.new_state, ConvState::Extracting { .. });
            prop_assert!(extracting);
        } else {
            prop_assert_eq!(result.new_state, kind.awaiting_state());
        }
    }
}
