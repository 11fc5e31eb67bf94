#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Site-wide map settings.
//!
//! Settings are read once at startup from an optional TOML file and then
//! overridden by `SIMPLE_MAP_*` environment variables. The resulting
//! [`Settings`] value is read-only and is handed to each component that
//! needs it (distance calculator, map builders, geocoder).
//!
//! ```toml
//! map_tiles = "mapbox-streets"
//! map_token = "pk.abc"
//! geo_service = "nominatim"
//! distance_unit = "mi"
//! home = { lat = 51.5074, lng = -0.1278 }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use simple_map_models::{DistanceUnit, GeoService, LatLng, MapTiles};
use simple_map_spatial::DistanceCalculator;
use thiserror::Error;

/// Public Nominatim search endpoint.
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";

/// Default geocoding timeout in milliseconds.
pub const DEFAULT_GEOCODE_TIMEOUT_MS: u64 = 5000;

/// Errors from loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Settings file could not be read.
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file is not valid TOML or has the wrong shape.
    #[error("Invalid settings file: {0}")]
    Toml(#[from] toml::de::Error),

    /// An environment override could not be parsed.
    #[error("Invalid value for {var}: {reason}")]
    InvalidEnvVar {
        /// The variable name.
        var: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A setting is outside its allowed range.
    #[error("Invalid setting {field}: {reason}")]
    InvalidValue {
        /// The setting name.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// What a static map builder needs from settings: the tile set and the
/// credentials for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticMapConfig {
    pub tiles: MapTiles,
    /// Provider token, present only when `tiles` needs one.
    pub token: Option<String>,
    /// Self-hosted renderer for the open tile sets.
    pub endpoint: Option<String>,
}

/// Site-wide map configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Tile set used for static and interactive maps.
    pub map_tiles: MapTiles,
    /// Access token for tile sets that need one (Mapbox, Google, HERE).
    pub map_token: Option<String>,
    /// Geocoding service used to resolve addresses.
    pub geo_service: GeoService,
    /// Access token for the geocoding service.
    pub geo_token: Option<String>,
    /// Reference point distances are measured from.
    pub home: Option<LatLng>,
    /// Unit distances are reported in.
    pub distance_unit: DistanceUnit,
    /// Self-hosted static map renderer used for the open tile sets.
    pub static_endpoint: Option<String>,
    /// Upper bound on a single geocoding request.
    pub geocode_timeout_ms: u64,
    /// Nominatim search endpoint.
    pub nominatim_base_url: String,
    /// User agent sent to geocoding services.
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            map_tiles: MapTiles::default(),
            map_token: None,
            geo_service: GeoService::default(),
            geo_token: None,
            home: None,
            distance_unit: DistanceUnit::default(),
            static_endpoint: None,
            geocode_timeout_ms: DEFAULT_GEOCODE_TIMEOUT_MS,
            nominatim_base_url: DEFAULT_NOMINATIM_URL.to_string(),
            user_agent: concat!("simple-map/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Settings {
    /// Parses settings from a TOML document. Missing keys take their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if the document is malformed or a value is
    /// out of range.
    pub fn from_toml_str(s: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::de::from_str(s)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path)?;
        log::debug!("Loaded settings from {}", path.display());
        Self::from_toml_str(&contents)
    }

    /// Applies `SIMPLE_MAP_*` overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if an override cannot be parsed.
    pub fn with_env_overrides(self) -> Result<Self, SettingsError> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Applies `SIMPLE_MAP_*` overrides read through `lookup`.
    ///
    /// | Variable                        | Setting              |
    /// |---------------------------------|----------------------|
    /// | `SIMPLE_MAP_TILES`              | `map_tiles`          |
    /// | `SIMPLE_MAP_TOKEN`              | `map_token`          |
    /// | `SIMPLE_MAP_GEO_SERVICE`        | `geo_service`        |
    /// | `SIMPLE_MAP_GEO_TOKEN`          | `geo_token`          |
    /// | `SIMPLE_MAP_HOME` (`LAT,LNG`)   | `home`               |
    /// | `SIMPLE_MAP_DISTANCE_UNIT`      | `distance_unit`      |
    /// | `SIMPLE_MAP_STATIC_ENDPOINT`    | `static_endpoint`    |
    /// | `SIMPLE_MAP_GEOCODE_TIMEOUT_MS` | `geocode_timeout_ms` |
    /// | `SIMPLE_MAP_NOMINATIM_URL`      | `nominatim_base_url` |
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidEnvVar`] if an override cannot be
    /// parsed.
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(raw) = get("SIMPLE_MAP_TILES") {
            self.map_tiles = parse_var("SIMPLE_MAP_TILES", &raw)?;
        }
        if let Some(raw) = get("SIMPLE_MAP_TOKEN") {
            self.map_token = Some(raw);
        }
        if let Some(raw) = get("SIMPLE_MAP_GEO_SERVICE") {
            self.geo_service = parse_var("SIMPLE_MAP_GEO_SERVICE", &raw)?;
        }
        if let Some(raw) = get("SIMPLE_MAP_GEO_TOKEN") {
            self.geo_token = Some(raw);
        }
        if let Some(raw) = get("SIMPLE_MAP_HOME") {
            self.home = Some(parse_var("SIMPLE_MAP_HOME", &raw)?);
        }
        if let Some(raw) = get("SIMPLE_MAP_DISTANCE_UNIT") {
            self.distance_unit = parse_var("SIMPLE_MAP_DISTANCE_UNIT", &raw)?;
        }
        if let Some(raw) = get("SIMPLE_MAP_STATIC_ENDPOINT") {
            self.static_endpoint = Some(raw);
        }
        if let Some(raw) = get("SIMPLE_MAP_GEOCODE_TIMEOUT_MS") {
            self.geocode_timeout_ms = parse_var("SIMPLE_MAP_GEOCODE_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = get("SIMPLE_MAP_NOMINATIM_URL") {
            self.nominatim_base_url = raw;
        }

        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if let Some(home) = self.home {
            if !(-90.0..=90.0).contains(&home.lat) || !(-180.0..=180.0).contains(&home.lng) {
                return Err(SettingsError::InvalidValue {
                    field: "home",
                    reason: format!("{home} is outside the valid coordinate range"),
                });
            }
        }
        if self.geocode_timeout_ms == 0 {
            return Err(SettingsError::InvalidValue {
                field: "geocode_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Token for the configured tile set, or `None` if the tile set needs
    /// no token or none is configured.
    #[must_use]
    pub fn map_token(&self) -> Option<&str> {
        if !self.map_tiles.requires_token() {
            return None;
        }
        non_blank(self.map_token.as_deref())
    }

    /// Token for the configured geocoding service, if set.
    #[must_use]
    pub fn geo_token(&self) -> Option<&str> {
        non_blank(self.geo_token.as_deref())
    }

    /// Static renderer endpoint for the open tile sets, if set.
    #[must_use]
    pub fn static_endpoint(&self) -> Option<&str> {
        non_blank(self.static_endpoint.as_deref())
    }

    #[must_use]
    pub const fn geocode_timeout(&self) -> Duration {
        Duration::from_millis(self.geocode_timeout_ms)
    }

    /// Tile set and credentials for building static map URLs.
    #[must_use]
    pub fn static_map_config(&self) -> StaticMapConfig {
        StaticMapConfig {
            tiles: self.map_tiles,
            token: self.map_token().map(str::to_string),
            endpoint: self.static_endpoint().map(str::to_string),
        }
    }

    /// A distance calculator measuring from the configured home point.
    #[must_use]
    pub const fn distance_calculator(&self) -> DistanceCalculator {
        DistanceCalculator::new(self.home, self.distance_unit)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_var<T>(var: &str, raw: &str) -> Result<T, SettingsError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| SettingsError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Option<String> + 'a {
        move |key: &str| map.get(key).map(|v| (*v).to_string())
    }

    #[test]
    fn empty_document_uses_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.map_tiles, MapTiles::Wikimedia);
        assert_eq!(settings.geo_service, GeoService::Nominatim);
        assert_eq!(settings.nominatim_base_url, DEFAULT_NOMINATIM_URL);
        assert!(settings.distance_calculator().reference().is_none());
    }

    #[test]
    fn parses_full_document() {
        let settings = Settings::from_toml_str(
            r#"
            map_tiles = "mapbox-streets"
            map_token = "pk.test"
            geo_service = "google-maps"
            geo_token = "g-key"
            distance_unit = "mi"
            static_endpoint = "https://example.test/static"
            geocode_timeout_ms = 1500
            home = { lat = 51.5074, lng = -0.1278 }
            "#,
        )
        .unwrap();
        assert_eq!(settings.map_tiles, MapTiles::MapboxStreets);
        assert_eq!(settings.map_token(), Some("pk.test"));
        assert_eq!(settings.geo_service, GeoService::GoogleMaps);
        assert_eq!(settings.geo_token(), Some("g-key"));
        assert_eq!(settings.geocode_timeout(), Duration::from_millis(1500));
        let calc = settings.distance_calculator();
        assert_eq!(calc.reference(), Some(LatLng::new(51.5074, -0.1278)));
        assert_eq!(calc.unit(), DistanceUnit::Miles);
    }

    #[test]
    fn rejects_unknown_tiles() {
        let result = Settings::from_toml_str(r#"map_tiles = "bing""#);
        assert!(matches!(result, Err(SettingsError::Toml(_))), "{result:?}");
    }

    #[test]
    fn rejects_home_out_of_range() {
        let result = Settings::from_toml_str("home = { lat = 91.0, lng = 0.0 }");
        assert!(
            matches!(result, Err(SettingsError::InvalidValue { field: "home", .. })),
            "{result:?}"
        );
    }

    #[test]
    fn map_token_only_for_tiles_that_need_one() {
        let settings = Settings {
            map_token: Some("pk.test".to_string()),
            ..Settings::default()
        };
        assert_eq!(settings.map_token(), None);

        let settings = Settings {
            map_tiles: MapTiles::GoogleRoadmap,
            map_token: Some("   ".to_string()),
            ..Settings::default()
        };
        assert_eq!(settings.map_token(), None);
    }

    #[test]
    fn static_map_config_drops_unneeded_token() {
        let settings = Settings::from_toml_str(
            r#"
            map_tiles = "carto-positron"
            map_token = "pk.unused"
            static_endpoint = "https://static.example.test/render"
            "#,
        )
        .unwrap();
        let config = settings.static_map_config();
        assert_eq!(config.tiles, MapTiles::CartoPositron);
        assert_eq!(config.token, None);
        assert_eq!(
            config.endpoint.as_deref(),
            Some("https://static.example.test/render")
        );
    }

    #[test]
    fn env_overrides_apply() {
        let mut env = HashMap::new();
        env.insert("SIMPLE_MAP_TILES", "here-night");
        env.insert("SIMPLE_MAP_TOKEN", "here-key");
        env.insert("SIMPLE_MAP_HOME", "40.7128,-74.0060");
        env.insert("SIMPLE_MAP_DISTANCE_UNIT", "nmi");
        env.insert("SIMPLE_MAP_GEOCODE_TIMEOUT_MS", "250");
        env.insert("SIMPLE_MAP_GEO_SERVICE", "");

        let settings = Settings::default()
            .apply_env(lookup_from_map(&env))
            .unwrap();
        assert_eq!(settings.map_tiles, MapTiles::HereNight);
        assert_eq!(settings.map_token(), Some("here-key"));
        assert_eq!(settings.home, Some(LatLng::new(40.7128, -74.0060)));
        assert_eq!(settings.distance_unit, DistanceUnit::NauticalMiles);
        assert_eq!(settings.geocode_timeout_ms, 250);
        assert_eq!(settings.geo_service, GeoService::Nominatim);
    }

    #[test]
    fn invalid_env_override_names_the_variable() {
        let mut env = HashMap::new();
        env.insert("SIMPLE_MAP_GEOCODE_TIMEOUT_MS", "soon");
        let result = Settings::default().apply_env(lookup_from_map(&env));
        assert!(
            matches!(result, Err(SettingsError::InvalidEnvVar { ref var, .. }) if var == "SIMPLE_MAP_GEOCODE_TIMEOUT_MS"),
            "{result:?}"
        );
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut env = HashMap::new();
        env.insert("SIMPLE_MAP_GEOCODE_TIMEOUT_MS", "0");
        let result = Settings::default().apply_env(lookup_from_map(&env));
        assert!(matches!(result, Err(SettingsError::InvalidValue { .. })));
    }
}
