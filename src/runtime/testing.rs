//! Mock implementations for testing
//!
//! These mocks enable engine tests without network or disk I/O.

use super::traits::*;
use super::ConversationEngine;
use crate::db::DbError;
use crate::extraction::ExtractionError;
use crate::geocode::{parse_coordinates, GeocodeError};
use crate::media::{FetchError, FetchedMedia};
use crate::report::{Location, StoredReport, WasteAttributes, WasteReport};
use crate::session::SessionStore;
use crate::state_machine::{InboundMessage, MediaAttachment, MediaKind};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

// ============================================================================
// Mock Media Fetcher
// ============================================================================

/// Fetcher that hands back a few bytes typed as the attachment declared
#[derive(Default)]
pub struct MockFetcher {
    failures: Mutex<VecDeque<FetchError>>,
    /// URLs requested, in order
    pub fetched: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn queue_failure(&self, error: FetchError) {
        self.failures.lock().unwrap().push_back(error);
    }
}

#[async_trait]
impl MediaFetcher for MockFetcher {
    async fn fetch(&self, media: &MediaAttachment) -> Result<FetchedMedia, FetchError> {
        self.fetched.lock().unwrap().push(media.url.clone());
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(FetchedMedia {
            bytes: vec![0x01, 0x02, 0x03],
            mime_type: media.content_type.clone(),
        })
    }
}

// ============================================================================
// Mock Extractor
// ============================================================================

/// Extractor that returns queued results
#[derive(Default)]
pub struct MockExtractor {
    results: Mutex<VecDeque<Result<WasteAttributes, ExtractionError>>>,
    /// Kinds requested, in order
    pub requests: Mutex<Vec<MediaKind>>,
}

impl MockExtractor {
    pub fn queue(&self, attributes: WasteAttributes) {
        self.results.lock().unwrap().push_back(Ok(attributes));
    }

    pub fn queue_error(&self, error: ExtractionError) {
        self.results.lock().unwrap().push_back(Err(error));
    }
}

#[async_trait]
impl MediaExtractor for MockExtractor {
    async fn extract(
        &self,
        _media: &FetchedMedia,
        kind: MediaKind,
    ) -> Result<WasteAttributes, ExtractionError> {
        self.requests.lock().unwrap().push(kind);
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ExtractionError::Empty))
    }
}

// ============================================================================
// Mock Geocoder
// ============================================================================

/// Geocoder that resolves coordinate text, unless a result was queued
#[derive(Default)]
pub struct MockGeocoder {
    results: Mutex<VecDeque<Result<Option<Location>, GeocodeError>>>,
    /// Texts looked up, in order
    pub queries: Mutex<Vec<String>>,
}

impl MockGeocoder {
    pub fn queue_error(&self, error: GeocodeError) {
        self.results.lock().unwrap().push_back(Err(error));
    }
}

#[async_trait]
impl Geocoder for MockGeocoder {
    async fn geocode(&self, text: &str) -> Result<Option<Location>, GeocodeError> {
        self.queries.lock().unwrap().push(text.to_string());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(parse_coordinates(text)))
    }
}

// ============================================================================
// Mock Report Store
// ============================================================================

/// In-memory report store
#[derive(Default)]
pub struct MockReportStore {
    reports: Mutex<Vec<StoredReport>>,
    failures: Mutex<usize>,
}

impl MockReportStore {
    /// Make the next `count` saves fail
    pub fn fail_next(&self, count: usize) {
        *self.failures.lock().unwrap() = count;
    }

    pub fn saved(&self) -> Vec<StoredReport> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportStore for MockReportStore {
    async fn add_report(&self, report: &WasteReport) -> Result<String, DbError> {
        {
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(DbError::Sqlite(rusqlite::Error::InvalidQuery));
            }
        }

        let mut reports = self.reports.lock().unwrap();
        let id = format!("report-{}", reports.len() + 1);
        reports.push(StoredReport {
            id: id.clone(),
            report: report.clone(),
        });
        Ok(id)
    }

    async fn list_reports(&self) -> Result<Vec<StoredReport>, DbError> {
        Ok(self.saved())
    }
}

// ============================================================================
// Test Harness
// ============================================================================

pub type MockEngine = ConversationEngine<
    Arc<MockFetcher>,
    Arc<MockExtractor>,
    Arc<MockGeocoder>,
    Arc<MockReportStore>,
>;

/// Engine wired to mocks, with handles kept for assertions
pub struct TestHarness {
    pub engine: MockEngine,
    pub fetcher: Arc<MockFetcher>,
    pub extractor: Arc<MockExtractor>,
    pub geocoder: Arc<MockGeocoder>,
    pub store: Arc<MockReportStore>,
}

impl TestHarness {
    pub fn new() -> Self {
        let fetcher = Arc::new(MockFetcher::default());
        let extractor = Arc::new(MockExtractor::default());
        let geocoder = Arc::new(MockGeocoder::default());
        let store = Arc::new(MockReportStore::default());
        let engine = ConversationEngine::new(
            Arc::new(SessionStore::new(None)),
            fetcher.clone(),
            extractor.clone(),
            geocoder.clone(),
            store.clone(),
        );
        Self {
            engine,
            fetcher,
            extractor,
            geocoder,
            store,
        }
    }

    pub async fn say(&self, sender: &str, body: &str) -> Vec<String> {
        self.engine
            .handle_message(InboundMessage::text(sender, body))
            .await
    }

    pub async fn send_media(&self, sender: &str, url: &str, content_type: &str) -> Vec<String> {
        self.engine
            .handle_message(InboundMessage::text(sender, "").with_media(url, content_type))
            .await
    }

    /// Walk a sender up to the location question of the image path
    pub async fn reach_image_location(&self, sender: &str, attributes: WasteAttributes) {
        self.say(sender, "hi").await;
        self.say(sender, "report").await;
        self.say(sender, "image").await;
        self.extractor.queue(attributes);
        self.send_media(sender, "https://media.example/img-1", "image/jpeg")
            .await;
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Engine Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replies;
    use crate::report::ReportStatus;
    use crate::state_machine::ConvState;
    use std::time::Duration;

    const ALICE: &str = "whatsapp:+15550001";
    const BOB: &str = "whatsapp:+15550002";

    fn plastic_medium() -> WasteAttributes {
        WasteAttributes::new("Plastic", "Medium")
    }

    async fn state_of(harness: &TestHarness, sender: &str) -> Option<ConvState> {
        harness
            .engine
            .sessions()
            .get(sender)
            .await
            .map(|s| s.state)
    }

    #[tokio::test]
    async fn test_image_report_end_to_end() {
        let h = TestHarness::new();

        assert_eq!(h.say(ALICE, "hi").await, vec![replies::WELCOME]);
        assert_eq!(h.say(ALICE, "report").await, vec![replies::REPORT_TYPE_MENU]);
        assert_eq!(h.say(ALICE, "Image").await, vec![replies::ASK_IMAGE]);

        h.extractor.queue(plastic_medium());
        let replies = h
            .send_media(ALICE, "https://media.example/img-1", "image/jpeg")
            .await;
        assert_eq!(replies, vec![replies::PROCESSING_IMAGE, replies::ASK_LOCATION]);

        assert_eq!(h.say(ALICE, "12.9716,77.5946").await, vec![replies::THANKS]);

        let saved = h.store.saved();
        assert_eq!(saved.len(), 1);
        let report = &saved[0].report;
        assert!((report.points - 45.0).abs() < f64::EPSILON);
        assert_eq!(report.status, ReportStatus::Unattended);
        assert_eq!(report.description, "Plastic waste");
        assert_eq!(report.amount, "Medium");
        assert_eq!(report.reported_by, ALICE);
        assert_eq!(report.image_url.as_deref(), Some("https://media.example/img-1"));
        assert!((report.location.lat - 12.9716).abs() < f64::EPSILON);

        assert_eq!(state_of(&h, ALICE).await, None);
        assert_eq!(*h.extractor.requests.lock().unwrap(), vec![MediaKind::Image]);
    }

    #[tokio::test]
    async fn test_first_message_with_keyword_skips_ahead() {
        let h = TestHarness::new();
        assert_eq!(
            h.say(ALICE, "I want to REPORT waste").await,
            vec![replies::WELCOME, replies::REPORT_TYPE_MENU]
        );
        assert_eq!(state_of(&h, ALICE).await, Some(ConvState::SelectReportType));
    }

    #[tokio::test]
    async fn test_next_message_after_completion_restarts() {
        let h = TestHarness::new();
        h.reach_image_location(ALICE, plastic_medium()).await;
        h.say(ALICE, "1.5,2.5").await;
        assert_eq!(state_of(&h, ALICE).await, None);

        assert_eq!(h.say(ALICE, "hello again").await, vec![replies::WELCOME]);
        assert_eq!(state_of(&h, ALICE).await, Some(ConvState::Welcome));
    }

    #[tokio::test]
    async fn test_voice_report_has_no_image_url() {
        let h = TestHarness::new();
        h.say(ALICE, "report").await;
        assert_eq!(h.say(ALICE, "voice").await, vec![replies::ASK_VOICE]);

        // An image is not a voice note
        assert_eq!(
            h.send_media(ALICE, "https://media.example/img", "image/png").await,
            vec![replies::ASK_VOICE]
        );

        h.extractor.queue(WasteAttributes::new("Sewage", "Large"));
        assert_eq!(
            h.send_media(ALICE, "https://media.example/v", "audio/ogg").await,
            vec![replies::PROCESSING_VOICE, replies::ASK_LOCATION]
        );
        h.say(ALICE, "10,20").await;

        let saved = h.store.saved();
        assert_eq!(saved[0].report.image_url, None);
        assert!((saved[0].report.points - 80.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_unrecognized_location_keeps_description() {
        let h = TestHarness::new();
        h.reach_image_location(ALICE, plastic_medium()).await;

        assert_eq!(
            h.say(ALICE, "somewhere near the lake").await,
            vec![replies::LOCATION_NOT_RECOGNIZED]
        );
        let session = h.engine.sessions().get(ALICE).await.unwrap();
        assert_eq!(session.description(), Some(&plastic_medium()));
        assert_eq!(session.image_ref(), Some("https://media.example/img-1"));
        assert!(h.store.saved().is_empty());

        // The retry succeeds with the original description
        assert_eq!(h.say(ALICE, "3,4").await, vec![replies::THANKS]);
        assert_eq!(h.store.saved()[0].report.waste_type, "Plastic");
    }

    #[tokio::test]
    async fn test_geocoder_error_asks_again() {
        let h = TestHarness::new();
        h.reach_image_location(ALICE, plastic_medium()).await;
        h.geocoder.queue_error(GeocodeError::Status(503));

        assert_eq!(h.say(ALICE, "3,4").await, vec![replies::TRY_AGAIN]);
        assert!(matches!(
            state_of(&h, ALICE).await,
            Some(ConvState::AskLocation { .. })
        ));
    }

    #[tokio::test]
    async fn test_extraction_failure_asks_for_resend() {
        let h = TestHarness::new();
        h.say(ALICE, "report").await;
        h.say(ALICE, "image").await;
        h.extractor
            .queue_error(ExtractionError::Malformed("not json".to_string()));

        assert_eq!(
            h.send_media(ALICE, "https://media.example/img", "image/jpeg").await,
            vec![replies::PROCESSING_IMAGE, replies::IMAGE_NOT_UNDERSTOOD]
        );
        assert_eq!(state_of(&h, ALICE).await, Some(ConvState::AwaitingImage));
    }

    #[tokio::test]
    async fn test_download_failure_asks_for_resend() {
        let h = TestHarness::new();
        h.say(ALICE, "report").await;
        h.say(ALICE, "image").await;
        h.fetcher.queue_failure(FetchError::Status(404));

        assert_eq!(
            h.send_media(ALICE, "https://media.example/gone", "image/jpeg").await,
            vec![replies::PROCESSING_IMAGE, replies::IMAGE_NOT_UNDERSTOOD]
        );
        assert!(h.extractor.requests.lock().unwrap().is_empty());
        assert_eq!(state_of(&h, ALICE).await, Some(ConvState::AwaitingImage));
    }

    #[tokio::test]
    async fn test_store_failure_keeps_session() {
        let h = TestHarness::new();
        h.reach_image_location(ALICE, plastic_medium()).await;
        h.store.fail_next(1);

        assert_eq!(h.say(ALICE, "3,4").await, vec![replies::TRY_AGAIN]);
        let session = h.engine.sessions().get(ALICE).await.unwrap();
        assert_eq!(session.description(), Some(&plastic_medium()));

        assert_eq!(h.say(ALICE, "3,4").await, vec![replies::THANKS]);
        assert_eq!(h.store.saved().len(), 1);
    }

    #[tokio::test]
    async fn test_text_path_never_persists() {
        let h = TestHarness::new();
        h.say(ALICE, "report").await;
        assert_eq!(h.say(ALICE, "text").await, vec![replies::DESCRIBE_WASTE]);
        assert_eq!(
            h.say(ALICE, "a pile of bottles by the road").await,
            vec![replies::DESCRIBE_WASTE]
        );
        assert_eq!(
            state_of(&h, ALICE).await,
            Some(ConvState::AwaitingWasteDetails)
        );
        assert!(h.store.saved().is_empty());
    }

    #[tokio::test]
    async fn test_interleaved_senders_are_isolated() {
        let h = TestHarness::new();

        h.say(ALICE, "report").await;
        h.say(BOB, "hello").await;
        h.say(ALICE, "image").await;
        h.say(BOB, "report").await;
        h.say(BOB, "voice").await;

        assert_eq!(state_of(&h, ALICE).await, Some(ConvState::AwaitingImage));
        assert_eq!(state_of(&h, BOB).await, Some(ConvState::AwaitingVoice));

        h.extractor.queue(WasteAttributes::new("Organic", "Small"));
        h.send_media(ALICE, "https://media.example/a", "image/jpeg")
            .await;
        assert_eq!(state_of(&h, BOB).await, Some(ConvState::AwaitingVoice));

        // Bob's location-looking text does not touch Alice's report
        h.say(BOB, "5,5").await;
        assert!(h.store.saved().is_empty());

        h.say(ALICE, "6,6").await;
        let saved = h.store.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].report.reported_by, ALICE);
        assert_eq!(state_of(&h, BOB).await, Some(ConvState::AwaitingVoice));
    }

    #[tokio::test]
    async fn test_concurrent_senders_complete_independently() {
        let h = Arc::new(TestHarness::new());
        h.reach_image_location(ALICE, plastic_medium()).await;
        h.reach_image_location(BOB, WasteAttributes::new("Hazardous", "Large"))
            .await;

        let (a, b) = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(h.say(ALICE, "1,1"), h.say(BOB, "2,2"))
        })
        .await
        .unwrap();
        assert_eq!(a, vec![replies::THANKS]);
        assert_eq!(b, vec![replies::THANKS]);

        let mut by_sender: Vec<_> = h
            .store
            .saved()
            .into_iter()
            .map(|r| (r.report.reported_by, r.report.points))
            .collect();
        by_sender.sort_by(|x, y| x.0.cmp(&y.0));
        assert_eq!(by_sender.len(), 2);
        assert_eq!(by_sender[0].0, ALICE);
        assert!((by_sender[0].1 - 45.0).abs() < f64::EPSILON);
        assert_eq!(by_sender[1].0, BOB);
        assert!((by_sender[1].1 - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_duplicate_delivery_saves_once() {
        let h = TestHarness::new();
        h.reach_image_location(ALICE, plastic_medium()).await;

        let (first, second) = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(h.say(ALICE, "1,1"), h.say(ALICE, "1,1"))
        })
        .await
        .unwrap();

        let mut all = [first, second].concat();
        all.sort();
        let mut expected = vec![replies::THANKS.to_string(), replies::WELCOME.to_string()];
        expected.sort();
        assert_eq!(all, expected);
        assert_eq!(h.store.saved().len(), 1);
    }

    #[tokio::test]
    async fn test_completed_sessions_release_their_slot() {
        let h = TestHarness::new();
        for i in 0..50 {
            let sender = format!("whatsapp:+1555{i:04}");
            h.reach_image_location(&sender, plastic_medium()).await;
            assert_eq!(h.engine.sessions().slot_count(), 1);
            h.say(&sender, "1,1").await;
        }

        assert_eq!(h.store.saved().len(), 50);
        assert_eq!(h.engine.sessions().slot_count(), 0);
        assert_eq!(h.engine.sessions().active_count(), 0);
    }

    #[tokio::test]
    async fn test_list_reports_through_engine() {
        let h = TestHarness::new();
        h.reach_image_location(ALICE, plastic_medium()).await;
        h.say(ALICE, "1,1").await;

        let listed = h.engine.reports().list_reports().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "report-1");
    }
}
