#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Core types for the map location field.
//!
//! A [`Location`] is the value stored against a content entry: coordinates,
//! zoom, a free-text display address and the structured [`AddressParts`]
//! it owns. Stored blobs may carry address parts in either the current or
//! the legacy (Google address component) shape; see [`parts`] for how the
//! two are told apart.

pub mod location;
pub mod parts;
pub mod providers;

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use location::{Attribute, DEFAULT_ADDRESS_JOINER, DEFAULT_ZOOM, Location, LocationIdentity};
pub use parts::{AddressParts, LegacyParts, PartName, Parts, PartsAccess, is_legacy};
pub use providers::{GeoService, MapTiles, TileFamily};

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude in decimal degrees (-90 to 90).
    pub lat: f64,
    /// Longitude in decimal degrees (-180 to 180).
    pub lng: f64,
}

impl LatLng {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl std::fmt::Display for LatLng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

/// Error returned when a `"lat,lng"` string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidLatLngError {
    /// The rejected input.
    pub input: String,
}

impl std::fmt::Display for InvalidLatLngError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid coordinate pair '{}': expected LAT,LNG", self.input)
    }
}

impl std::error::Error for InvalidLatLngError {}

impl FromStr for LatLng {
    type Err = InvalidLatLngError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || InvalidLatLngError {
            input: s.to_string(),
        };
        let (lat, lng) = s.split_once(',').ok_or_else(err)?;
        let lat = lat.trim().parse::<f64>().map_err(|_| err())?;
        let lng = lng.trim().parse::<f64>().map_err(|_| err())?;
        if !lat.is_finite() || !lng.is_finite() {
            return Err(err());
        }
        Ok(Self::new(lat, lng))
    }
}

/// Unit a computed distance is expressed in.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum DistanceUnit {
    /// Kilometers.
    #[default]
    #[serde(rename = "km")]
    #[strum(serialize = "km")]
    Kilometers,
    /// Statute miles.
    #[serde(rename = "mi")]
    #[strum(serialize = "mi")]
    Miles,
    /// Meters.
    #[serde(rename = "m")]
    #[strum(serialize = "m")]
    Meters,
    /// Nautical miles.
    #[serde(rename = "nmi")]
    #[strum(serialize = "nmi")]
    NauticalMiles,
}

impl DistanceUnit {
    /// Earth's mean radius expressed in this unit.
    #[must_use]
    pub const fn earth_radius(self) -> f64 {
        match self {
            Self::Kilometers => 6371.0,
            Self::Miles => 3959.0,
            Self::Meters => 6_371_000.0,
            Self::NauticalMiles => 3440.065,
        }
    }
}

/// Something that can measure how far a point is from the configured
/// reference point.
///
/// Returns `None` when no reference point is available.
pub trait DistanceSource {
    fn distance_from_reference(&self, point: LatLng) -> Option<f64>;
}

/// A [`DistanceSource`] with no reference point. Every distance is absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReference;

impl DistanceSource for NoReference {
    fn distance_from_reference(&self, _point: LatLng) -> Option<f64> {
        None
    }
}

/// Field-level validation messages keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    /// Records a message against `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if at least one message is recorded for `field`.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Messages recorded for `field`, empty if none.
    #[must_use]
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[], Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// A value that was constructed alongside any validation errors found in
/// its input. The value is always present, even when `errors` is not empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated<T> {
    /// The (possibly partial) constructed value.
    pub value: T,
    /// Field-level errors found while constructing `value`.
    pub errors: ValidationErrors,
}

impl<T> Validated<T> {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Discards the errors and returns the value.
    #[must_use]
    pub fn into_value(self) -> T {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lat_lng_pair() {
        let point: LatLng = "51.5, -0.12".parse().unwrap();
        assert!((point.lat - 51.5).abs() < f64::EPSILON);
        assert!((point.lng - -0.12).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_malformed_lat_lng_pair() {
        assert!("51.5".parse::<LatLng>().is_err());
        assert!("north,west".parse::<LatLng>().is_err());
        assert!("NaN,0".parse::<LatLng>().is_err());
    }

    #[test]
    fn distance_unit_round_trips_through_strum() {
        for unit in [
            DistanceUnit::Kilometers,
            DistanceUnit::Miles,
            DistanceUnit::Meters,
            DistanceUnit::NauticalMiles,
        ] {
            assert_eq!(unit.as_ref().parse::<DistanceUnit>().unwrap(), unit);
        }
    }

    #[test]
    fn validation_errors_collect_per_field() {
        let mut errors = ValidationErrors::default();
        errors.add("lat", "Lat must be no greater than 90.");
        errors.add("lat", "another");
        assert!(errors.has("lat"));
        assert!(!errors.has("lng"));
        assert_eq!(errors.get("lat").len(), 2);
        assert!(errors.get("zoom").is_empty());
    }
}
