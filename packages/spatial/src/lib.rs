#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Great-circle distance for map locations.
//!
//! Distances use the haversine formula on a sphere of Earth's mean radius.
//! The [`DistanceCalculator`] carries the site-wide reference ("home")
//! point and the unit distances are reported in. It is built once from
//! configuration and passed to whatever needs it; nothing here reads
//! global state.

use simple_map_models::{DistanceSource, DistanceUnit, LatLng};
use thiserror::Error;

/// Errors from distance calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SpatialError {
    /// No reference point is configured.
    #[error("No reference point configured")]
    NoReferencePoint,
}

/// Great-circle distance between two points, expressed in `unit`.
///
/// The haversine intermediate is clamped to `[0, 1]` before the square root
/// and inverse sine, so rounding near antipodal points (or on out-of-range
/// coordinates) cannot produce `NaN`.
#[must_use]
pub fn haversine(a: LatLng, b: LatLng, unit: DistanceUnit) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);
    let central_angle = 2.0 * h.sqrt().asin();

    unit.earth_radius() * central_angle
}

/// Computes distances between points and from a configured reference
/// point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceCalculator {
    reference: Option<LatLng>,
    unit: DistanceUnit,
}

impl Default for DistanceCalculator {
    fn default() -> Self {
        Self::new(None, DistanceUnit::default())
    }
}

impl DistanceCalculator {
    #[must_use]
    pub const fn new(reference: Option<LatLng>, unit: DistanceUnit) -> Self {
        Self { reference, unit }
    }

    #[must_use]
    pub const fn reference(&self) -> Option<LatLng> {
        self.reference
    }

    #[must_use]
    pub const fn unit(&self) -> DistanceUnit {
        self.unit
    }

    /// Returns a copy measuring from `reference` instead.
    #[must_use]
    pub const fn with_reference(mut self, reference: LatLng) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Distance between `a` and `b` in this calculator's unit.
    #[must_use]
    pub fn distance(&self, a: LatLng, b: LatLng) -> f64 {
        haversine(a, b, self.unit)
    }

    /// Distance from the reference point to `point`.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::NoReferencePoint`] if no reference point is
    /// configured. A `(0, 0)` fallback is never used.
    pub fn distance_from_reference(&self, point: LatLng) -> Result<f64, SpatialError> {
        let reference = self.reference.ok_or(SpatialError::NoReferencePoint)?;
        Ok(self.distance(reference, point))
    }
}

impl DistanceSource for DistanceCalculator {
    fn distance_from_reference(&self, point: LatLng) -> Option<f64> {
        match Self::distance_from_reference(self, point) {
            Ok(distance) => Some(distance),
            Err(e) => {
                log::trace!("Omitting distance for {point}: {e}");
                None
            }
        }
    }
}
