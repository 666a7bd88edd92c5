//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the engine with mock implementations.

use crate::db::{Database, DbError};
use crate::extraction::ExtractionError;
use crate::geocode::GeocodeError;
use crate::media::{FetchError, FetchedMedia};
use crate::report::{Location, StoredReport, WasteAttributes, WasteReport};
use crate::state_machine::{MediaAttachment, MediaKind};
use async_trait::async_trait;
use std::sync::Arc;

/// Downloads message attachments
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, media: &MediaAttachment) -> Result<FetchedMedia, FetchError>;
}

/// Turns a photo or voice note into structured waste attributes
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    async fn extract(
        &self,
        media: &FetchedMedia,
        kind: MediaKind,
    ) -> Result<WasteAttributes, ExtractionError>;
}

/// Resolves free-form location text
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` means the text is definitively not a location
    async fn geocode(&self, text: &str) -> Result<Option<Location>, GeocodeError>;
}

/// Append-only storage for finalized reports
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Persist a report, returning its store-assigned id
    async fn add_report(&self, report: &WasteReport) -> Result<String, DbError>;

    /// Every stored report, oldest first
    async fn list_reports(&self) -> Result<Vec<StoredReport>, DbError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: MediaFetcher + ?Sized> MediaFetcher for Arc<T> {
    async fn fetch(&self, media: &MediaAttachment) -> Result<FetchedMedia, FetchError> {
        (**self).fetch(media).await
    }
}

#[async_trait]
impl<T: MediaExtractor + ?Sized> MediaExtractor for Arc<T> {
    async fn extract(
        &self,
        media: &FetchedMedia,
        kind: MediaKind,
    ) -> Result<WasteAttributes, ExtractionError> {
        (**self).extract(media, kind).await
    }
}

#[async_trait]
impl<T: Geocoder + ?Sized> Geocoder for Arc<T> {
    async fn geocode(&self, text: &str) -> Result<Option<Location>, GeocodeError> {
        (**self).geocode(text).await
    }
}

#[async_trait]
impl<T: ReportStore + ?Sized> ReportStore for Arc<T> {
    async fn add_report(&self, report: &WasteReport) -> Result<String, DbError> {
        (**self).add_report(report).await
    }

    async fn list_reports(&self) -> Result<Vec<StoredReport>, DbError> {
        (**self).list_reports().await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as a `ReportStore`
#[derive(Clone)]
pub struct DatabaseStorage {
    db: Database,
}

impl DatabaseStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReportStore for DatabaseStorage {
    async fn add_report(&self, report: &WasteReport) -> Result<String, DbError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.db.insert_report(&id, report)?;
        Ok(id)
    }

    async fn list_reports(&self) -> Result<Vec<StoredReport>, DbError> {
        self.db.list_reports()
    }
}
