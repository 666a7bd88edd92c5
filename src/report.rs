//! Waste report types and the reward formula
//!
//! A report is built once, from the attributes the AI extracted and the
//! geocoded location, and never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Structured waste attributes produced by media extraction.
///
/// `type` and `quantity` are free-form strings. They are expected to line up
/// with [`WasteCategory`] and [`QuantityBucket`] but are never validated. A
/// missing or non-string `quantity` or `severity` is kept as text so scoring
/// falls back to its default instead of rejecting the extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WasteAttributes {
    #[serde(rename = "type")]
    pub waste_type: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub quantity: String,
    #[serde(
        default,
        deserialize_with = "lenient_optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub severity: Option<String>,
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(lenient_optional_text(deserializer)?.unwrap_or_default())
}

fn lenient_optional_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    })
}

impl WasteAttributes {
    #[cfg(test)]
    pub fn new(waste_type: impl Into<String>, quantity: impl Into<String>) -> Self {
        Self {
            waste_type: waste_type.into(),
            quantity: quantity.into(),
            severity: None,
        }
    }
}

/// A resolved location, shaped the way the dashboard reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Location {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            address: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

/// Known waste categories with their base reward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WasteCategory {
    Plastic,
    Organic,
    Sewage,
    Hazardous,
    Other,
}

impl WasteCategory {
    /// Case-insensitive lookup; anything unrecognized is `Other`
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        [
            ("plastic", Self::Plastic),
            ("organic", Self::Organic),
            ("sewage", Self::Sewage),
            ("hazardous", Self::Hazardous),
        ]
        .into_iter()
        .find(|(name, _)| raw.eq_ignore_ascii_case(name))
        .map_or(Self::Other, |(_, category)| category)
    }

    pub fn base_points(self) -> f64 {
        match self {
            Self::Plastic => 30.0,
            Self::Organic => 20.0,
            Self::Sewage => 40.0,
            Self::Hazardous => 50.0,
            Self::Other => 10.0,
        }
    }
}

/// Quantity buckets with their reward multiplier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityBucket {
    Small,
    Medium,
    Large,
    Other,
}

impl QuantityBucket {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        [
            ("small", Self::Small),
            ("medium", Self::Medium),
            ("large", Self::Large),
        ]
        .into_iter()
        .find(|(name, _)| raw.eq_ignore_ascii_case(name))
        .map_or(Self::Other, |(_, bucket)| bucket)
    }

    pub fn modifier(self) -> f64 {
        match self {
            Self::Medium => 1.5,
            Self::Large => 2.0,
            Self::Small | Self::Other => 1.0,
        }
    }
}

/// Reward for a report. Unknown vocabulary on either axis falls back to the
/// default for that axis only.
pub fn assign_points(waste_type: &str, quantity: &str) -> f64 {
    WasteCategory::parse(waste_type).base_points() * QuantityBucket::parse(quantity).modifier()
}

/// Lifecycle status of a persisted report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    #[default]
    Unattended,
}

/// A finalized report, as written to the `reports` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WasteReport {
    pub description: String,
    #[serde(rename = "type")]
    pub waste_type: String,
    pub amount: String,
    pub location: Location,
    pub points: f64,
    pub status: ReportStatus,
    pub reported_by: String,
    #[serde(
        rename = "imageUrl",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Shape the persisted record from what the conversation collected.
pub fn finalize(
    attributes: &WasteAttributes,
    location: Location,
    reported_by: &str,
    image_ref: Option<&str>,
    created_at: DateTime<Utc>,
) -> WasteReport {
    WasteReport {
        description: format!("{} waste", attributes.waste_type),
        waste_type: attributes.waste_type.clone(),
        amount: attributes.quantity.clone(),
        location,
        points: assign_points(&attributes.waste_type, &attributes.quantity),
        status: ReportStatus::Unattended,
        reported_by: reported_by.to_string(),
        image_url: image_ref.map(String::from),
        created_at,
    }
}

/// A report together with the identifier the store assigned to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReport {
    pub id: String,
    #[serde(flatten)]
    pub report: WasteReport,
}
