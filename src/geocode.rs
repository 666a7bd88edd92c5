//! Location resolution
//!
//! Free-form text goes to the Google Geocoding API. Text that already is a
//! `lat,lng` pair resolves without a forward lookup; the API is only asked for
//! a human-readable address, and its failure does not lose the coordinates.

use crate::report::Location;
use crate::runtime::Geocoder;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const GEOCODE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Geocoding request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Geocoding request could not be built: {0}")]
    InvalidUrl(String),
    #[error("Geocoding API answered HTTP {0}")]
    Status(u16),
    #[error("Geocoding API error {status}: {message}")]
    Api { status: String, message: String },
}

/// Parse `"lat,lng"` (whitespace allowed around either number).
pub fn parse_coordinates(text: &str) -> Option<Location> {
    let (lat, lng) = text.trim().split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lng: f64 = lng.trim().parse().ok()?;

    let valid = lat.is_finite()
        && lng.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lng);
    valid.then(|| Location::new(lat, lng))
}

/// Geocoder that only understands coordinate pairs. Used when no Maps API key
/// is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoordinateGeocoder;

#[async_trait]
impl Geocoder for CoordinateGeocoder {
    async fn geocode(&self, text: &str) -> Result<Option<Location>, GeocodeError> {
        Ok(parse_coordinates(text))
    }
}

/// Google Maps Geocoding API client
pub struct GoogleGeocoder {
    client: Client,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(api_key: String) -> Result<Self, GeocodeError> {
        let client = Client::builder().timeout(GEOCODE_TIMEOUT).build()?;
        Ok(Self { client, api_key })
    }

    async fn lookup(&self, param: &str, value: &str) -> Result<Option<Location>, GeocodeError> {
        let url = Url::parse_with_params(GEOCODE_URL, &[(param, value), ("key", self.api_key.as_str())])
            .map_err(|e| GeocodeError::InvalidUrl(e.to_string()))?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let body: GeocodeResponse = response.json().await?;
        interpret(body)
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn geocode(&self, text: &str) -> Result<Option<Location>, GeocodeError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        if let Some(coords) = parse_coordinates(text) {
            let latlng = format!("{},{}", coords.lat, coords.lng);
            return match self.lookup("latlng", &latlng).await {
                Ok(Some(found)) => Ok(Some(match found.address {
                    Some(address) => coords.with_address(address),
                    None => coords,
                })),
                Ok(None) => Ok(Some(coords)),
                Err(e) => {
                    tracing::warn!(error = %e, "Reverse geocoding failed, keeping raw coordinates");
                    Ok(Some(coords))
                }
            };
        }

        self.lookup("address", text).await
    }
}

/// Map an API response onto the geocoder contract
fn interpret(body: GeocodeResponse) -> Result<Option<Location>, GeocodeError> {
    match body.status.as_str() {
        "OK" => Ok(body.results.into_iter().next().map(|result| {
            let point = result.geometry.location;
            let location = Location::new(point.lat, point.lng);
            match result.formatted_address {
                Some(address) => location.with_address(address),
                None => location,
            }
        })),
        "ZERO_RESULTS" => Ok(None),
        _ => Err(GeocodeError::Api {
            status: body.status,
            message: body.error_message.unwrap_or_default(),
        }),
    }
}

// Geocoding API types

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: Option<String>,
    geometry: GeocodeGeometry,
}

#[derive(Debug, Deserialize)]
struct GeocodeGeometry {
    location: GeocodePoint,
}

#[derive(Debug, Deserialize)]
struct GeocodePoint {
    lat: f64,
    lng: f64,
}
