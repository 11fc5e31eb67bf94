//! The geocoding boundary used by the rest of the application.
//!
//! [`Geocoder::resolve`] never fails: timeouts, HTTP errors, quota
//! rejections, malformed responses and empty results all come back as
//! [`Resolution::Unresolved`], so a caller can never store fabricated
//! coordinates.

use std::time::Duration;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use simple_map_models::LatLng;
use simple_map_settings::Settings;

use crate::{
    CountryCode, GeocodeError, GeocodeQuery, GeocodedAddress, GeocodingGateway,
    gateway_from_settings,
};

/// Outcome of resolving an address.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(GeocodedAddress),
    Unresolved,
}

impl Resolution {
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    #[must_use]
    pub const fn lat_lng(&self) -> Option<LatLng> {
        match self {
            Self::Resolved(address) => Some(address.lat_lng()),
            Self::Unresolved => None,
        }
    }

    #[must_use]
    pub const fn address(&self) -> Option<&GeocodedAddress> {
        match self {
            Self::Resolved(address) => Some(address),
            Self::Unresolved => None,
        }
    }
}

/// Serializes as `{"lat": .., "lng": ..}`, with empty strings for both
/// when unresolved.
impl Serialize for Resolution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            Self::Resolved(address) => {
                map.serialize_entry("lat", &address.latitude)?;
                map.serialize_entry("lng", &address.longitude)?;
            }
            Self::Unresolved => {
                map.serialize_entry("lat", "")?;
                map.serialize_entry("lng", "")?;
            }
        }
        map.end()
    }
}

/// Resolves addresses through a [`GeocodingGateway`] with a bounded wait.
pub struct Geocoder {
    gateway: Box<dyn GeocodingGateway>,
    timeout: Duration,
}

impl std::fmt::Debug for Geocoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Geocoder")
            .field("service", &self.gateway.service())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Geocoder {
    #[must_use]
    pub fn new(gateway: Box<dyn GeocodingGateway>, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }

    /// Creates a geocoder for the configured service and timeout.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the configured service cannot be used
    /// (missing token, HTTP client setup failure).
    pub fn from_settings(settings: &Settings) -> Result<Self, GeocodeError> {
        Ok(Self::new(
            gateway_from_settings(settings)?,
            settings.geocode_timeout(),
        ))
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolves `address`, optionally restricted to `country`.
    ///
    /// A blank address resolves to [`Resolution::Unresolved`] without a
    /// request being made.
    pub async fn resolve(&self, address: &str, country: Option<CountryCode>) -> Resolution {
        let address = address.trim();
        if address.is_empty() {
            log::debug!("Skipping geocode of blank address");
            return Resolution::Unresolved;
        }

        let query = GeocodeQuery::new(address, country);
        let service = self.gateway.service();

        match tokio::time::timeout(self.timeout, self.gateway.geocode(&query)).await {
            Ok(Ok(Some(result))) => {
                log::debug!(
                    "{service} resolved {address:?} to {}",
                    result.lat_lng()
                );
                Resolution::Resolved(result)
            }
            Ok(Ok(None)) => {
                log::info!("{service} found no match for {address:?}");
                Resolution::Unresolved
            }
            Ok(Err(e)) => {
                log::warn!("{service} geocoding failed for {address:?}: {e}");
                Resolution::Unresolved
            }
            Err(_) => {
                log::warn!(
                    "{service} geocoding timed out after {}ms for {address:?}",
                    self.timeout.as_millis()
                );
                Resolution::Unresolved
            }
        }
    }
}
