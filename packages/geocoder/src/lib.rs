#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Address geocoding for the map field.
//!
//! Turns a user-typed address into coordinates before a
//! [`Location`](simple_map_models::Location) is stored. Three services are
//! supported, selected by [`GeoService`]:
//!
//! 1. **Nominatim / `OpenStreetMap`** (default): free, no token, 1 req/sec on
//!    the public instance.
//! 2. **Mapbox Geocoding**: requires an access token.
//! 3. **Google Maps Geocoding**: requires an API key.
//!
//! Each service implements [`GeocodingGateway`]. Callers normally go through
//! [`Geocoder`], which bounds every request with a timeout and turns any
//! failure into [`Resolution::Unresolved`] instead of an error.

pub mod google;
pub mod mapbox;
pub mod nominatim;
pub mod resolver;

use std::str::FromStr;

use serde::Serialize;
use simple_map_models::{DEFAULT_ZOOM, GeoService, LatLng, Parts};
use simple_map_settings::Settings;
use thiserror::Error;

pub use google::GoogleGateway;
pub use mapbox::MapboxGateway;
pub use nominatim::NominatimGateway;
pub use resolver::{Geocoder, Resolution};

/// A geocoding result.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedAddress {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// The matched/canonical address returned by the service.
    pub matched_address: Option<String>,
    /// Structured address parts, when the service returned components.
    pub parts: Option<Parts>,
    /// Which service resolved this address.
    pub provider: GeoService,
}

impl GeocodedAddress {
    #[must_use]
    pub const fn lat_lng(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }

    /// A stored-location blob for this result, ready for
    /// [`Location::from_value`](simple_map_models::Location::from_value).
    #[must_use]
    pub fn to_location_value(&self) -> serde_json::Value {
        serde_json::json!({
            "lat": self.latitude,
            "lng": self.longitude,
            "zoom": DEFAULT_ZOOM,
            "address": self.matched_address.as_deref().unwrap_or_default(),
            "parts": self.parts,
        })
    }
}

/// An ISO-3166-1 alpha-2 country code, stored upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CountryCode(String);

impl CountryCode {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower-cased form, as Nominatim and Mapbox expect it.
    #[must_use]
    pub fn to_lowercase(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl std::fmt::Display for CountryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error returned when a country restriction is not two ASCII letters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid ISO-3166-1 alpha-2 country code: {input:?}")]
pub struct InvalidCountryCode {
    /// The rejected input.
    pub input: String,
}

impl FromStr for CountryCode {
    type Err = InvalidCountryCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        if code.len() == 2 && code.bytes().all(|b| b.is_ascii_alphabetic()) {
            Ok(Self(code.to_ascii_uppercase()))
        } else {
            Err(InvalidCountryCode {
                input: s.to_string(),
            })
        }
    }
}

/// An address to geocode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocodeQuery {
    /// Free-form address text.
    pub address: String,
    /// Optional restriction to a single country.
    pub country: Option<CountryCode>,
}

impl GeocodeQuery {
    #[must_use]
    pub fn new(address: impl Into<String>, country: Option<CountryCode>) -> Self {
        Self {
            address: address.into(),
            country,
        }
    }
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit or quota exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// The service rejected the request (bad key, disabled API).
    #[error("Request denied by {service}: {message}")]
    Denied {
        /// The service that rejected the request.
        service: GeoService,
        /// The service's explanation.
        message: String,
    },

    /// The selected service needs a token and none is configured.
    #[error("{service} geocoding requires a token")]
    MissingToken {
        /// The service missing a token.
        service: GeoService,
    },

    /// A configured endpoint is not a valid URL.
    #[error("Invalid endpoint URL {url}: {message}")]
    InvalidEndpoint {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        message: String,
    },
}

/// A geocoding service.
#[async_trait::async_trait]
pub trait GeocodingGateway: Send + Sync {
    /// Which service this gateway talks to.
    fn service(&self) -> GeoService;

    /// Resolves `query` to its best match, or `None` if the service found
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the request fails or the response cannot
    /// be parsed.
    async fn geocode(&self, query: &GeocodeQuery)
    -> Result<Option<GeocodedAddress>, GeocodeError>;
}

/// Builds the HTTP client shared by the gateways.
///
/// # Errors
///
/// Returns [`GeocodeError::Http`] if the client cannot be built.
pub fn build_client(user_agent: &str) -> Result<reqwest::Client, GeocodeError> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .build()
        .map_err(GeocodeError::Http)
}

/// Creates the gateway for the configured [`GeoService`].
///
/// # Errors
///
/// Returns [`GeocodeError::MissingToken`] if the service needs a token and
/// none is configured, or [`GeocodeError::Http`] if the HTTP client cannot
/// be built.
pub fn gateway_from_settings(
    settings: &Settings,
) -> Result<Box<dyn GeocodingGateway>, GeocodeError> {
    let client = build_client(&settings.user_agent)?;
    let service = settings.geo_service;

    let token = || {
        settings
            .geo_token()
            .map(str::to_string)
            .ok_or(GeocodeError::MissingToken { service })
    };

    log::debug!("Using {service} geocoding");

    Ok(match service {
        GeoService::Nominatim => Box::new(NominatimGateway::new(
            client,
            settings.nominatim_base_url.clone(),
        )),
        GeoService::Mapbox => Box::new(MapboxGateway::new(client, token()?)),
        GeoService::GoogleMaps => Box::new(GoogleGateway::new(client, token()?)),
    })
}

/// Reads a coordinate that services return either as a number or as a
/// numeric string.
fn coordinate(value: &serde_json::Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
        .filter(|v| v.is_finite())
}
