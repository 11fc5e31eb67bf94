//! Map tile sets and geocoding services a site can be configured with.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// The provider a [`MapTiles`] set is served by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TileFamily {
    Wikimedia,
    #[serde(rename = "openstreetmap")]
    #[strum(serialize = "openstreetmap")]
    OpenStreetMap,
    Carto,
    Mapbox,
    Google,
    Here,
}

impl TileFamily {
    /// Whether tiles from this provider need an access token.
    #[must_use]
    pub const fn requires_token(self) -> bool {
        matches!(self, Self::Mapbox | Self::Google | Self::Here)
    }
}

/// A tile set used for static and interactive maps.
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
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum MapTiles {
    #[default]
    Wikimedia,
    #[serde(rename = "openstreetmap")]
    #[strum(serialize = "openstreetmap")]
    OpenStreetMap,
    CartoVoyager,
    CartoPositron,
    CartoDarkMatter,
    MapboxOutdoors,
    MapboxStreets,
    MapboxLight,
    MapboxDark,
    GoogleRoadmap,
    GoogleTerrain,
    GoogleHybrid,
    HereDay,
    HereNight,
    HereTerrain,
    HereSatellite,
}

impl MapTiles {
    #[must_use]
    pub const fn family(self) -> TileFamily {
        match self {
            Self::Wikimedia => TileFamily::Wikimedia,
            Self::OpenStreetMap => TileFamily::OpenStreetMap,
            Self::CartoVoyager | Self::CartoPositron | Self::CartoDarkMatter => TileFamily::Carto,
            Self::MapboxOutdoors | Self::MapboxStreets | Self::MapboxLight | Self::MapboxDark => {
                TileFamily::Mapbox
            }
            Self::GoogleRoadmap | Self::GoogleTerrain | Self::GoogleHybrid => TileFamily::Google,
            Self::HereDay | Self::HereNight | Self::HereTerrain | Self::HereSatellite => {
                TileFamily::Here
            }
        }
    }

    /// The provider's own identifier for this style (Mapbox style id,
    /// Google map type, Carto basemap, HERE style).
    #[must_use]
    pub const fn style(self) -> &'static str {
        match self {
            Self::Wikimedia => "osm-intl",
            Self::OpenStreetMap => "standard",
            Self::CartoVoyager => "voyager",
            Self::CartoPositron => "light_all",
            Self::CartoDarkMatter => "dark_all",
            Self::MapboxOutdoors => "outdoors-v12",
            Self::MapboxStreets => "streets-v12",
            Self::MapboxLight => "light-v11",
            Self::MapboxDark => "dark-v11",
            Self::GoogleRoadmap => "roadmap",
            Self::GoogleTerrain => "terrain",
            Self::GoogleHybrid => "hybrid",
            Self::HereDay => "explore.day",
            Self::HereNight => "explore.night",
            Self::HereTerrain => "topo.day",
            Self::HereSatellite => "explore.satellite.day",
        }
    }

    #[must_use]
    pub const fn requires_token(self) -> bool {
        self.family().requires_token()
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Wikimedia,
            Self::OpenStreetMap,
            Self::CartoVoyager,
            Self::CartoPositron,
            Self::CartoDarkMatter,
            Self::MapboxOutdoors,
            Self::MapboxStreets,
            Self::MapboxLight,
            Self::MapboxDark,
            Self::GoogleRoadmap,
            Self::GoogleTerrain,
            Self::GoogleHybrid,
            Self::HereDay,
            Self::HereNight,
            Self::HereTerrain,
            Self::HereSatellite,
        ]
    }
}

/// Geocoding service used to turn addresses into coordinates.
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
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum GeoService {
    /// Nominatim / `OpenStreetMap`. No token needed.
    #[default]
    Nominatim,
    /// Mapbox Geocoding API.
    Mapbox,
    /// Google Maps Geocoding API.
    GoogleMaps,
}

impl GeoService {
    #[must_use]
    pub const fn requires_token(self) -> bool {
        !matches!(self, Self::Nominatim)
    }
}
