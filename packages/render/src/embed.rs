//! Interactive map embeds.
//!
//! [`MapEmbedBuilder`] produces a [`MapEmbed`] descriptor that a front-end
//! map library reads to draw the map. [`MapEmbed::to_markup`] renders it as
//! a `<div>` carrying the descriptor in a `data-simplemap` attribute.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use simple_map_models::{LatLng, Location, MapTiles, TileFamily};
use simple_map_settings::{Settings, StaticMapConfig};

use crate::{Marker, MarkerStyle, RenderError};

/// Which interactions the embedded map allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedControls {
    pub scroll_wheel_zoom: bool,
    pub zoom_control: bool,
    pub dragging: bool,
}

impl Default for EmbedControls {
    fn default() -> Self {
        Self {
            scroll_wheel_zoom: false,
            zoom_control: true,
            dragging: true,
        }
    }
}

/// Options for an interactive map embed.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedOptions {
    /// Element id. Derived from the map contents when unset.
    pub id: Option<String>,
    /// CSS width.
    pub width: String,
    /// CSS height.
    pub height: String,
    /// Tile set to use instead of the configured one.
    pub tiles: Option<MapTiles>,
    pub controls: EmbedControls,
    /// Markers to draw. Defaults to a single marker on the center.
    pub markers: Vec<Marker>,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            id: None,
            width: "100%".to_string(),
            height: "400px".to_string(),
            tiles: None,
            controls: EmbedControls::default(),
            markers: vec![Marker::default()],
        }
    }
}

/// A marker with its position resolved against the map center.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedMarker {
    pub position: LatLng,
    #[serde(flatten)]
    pub style: MarkerStyle,
}

/// Descriptor for an interactive map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapEmbed {
    pub id: String,
    pub family: TileFamily,
    pub tiles: MapTiles,
    /// Leaflet-style tile URL template. `None` for Google, which draws its
    /// own tiles through the Maps JavaScript API.
    pub tile_url: Option<String>,
    pub style: &'static str,
    pub attribution: &'static str,
    pub center: LatLng,
    pub zoom: u32,
    pub markers: Vec<EmbedMarker>,
    pub controls: EmbedControls,
    /// Provider token, present only for tile sets that need one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip)]
    pub width: String,
    #[serde(skip)]
    pub height: String,
}

impl MapEmbed {
    /// Renders the embed as an HTML element.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Serialize`] if the descriptor cannot be
    /// serialized.
    pub fn to_markup(&self) -> Result<String, RenderError> {
        let descriptor = serde_json::to_string(self)?;
        Ok(format!(
            r#"<div id="{id}" class="simplemap" style="width:{width};height:{height}" data-simplemap="{data}"></div>"#,
            id = escape_attribute(&self.id),
            width = escape_attribute(&self.width),
            height = escape_attribute(&self.height),
            data = escape_attribute(&descriptor),
        ))
    }
}

/// Builds interactive map descriptors for the configured tile set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapEmbedBuilder {
    config: StaticMapConfig,
}

impl MapEmbedBuilder {
    #[must_use]
    pub const fn new(config: StaticMapConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.static_map_config())
    }

    /// Builds an embed centered on `center`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::MissingToken`] if the tile set needs a token
    /// and none is configured.
    pub fn build(
        &self,
        center: LatLng,
        zoom: u32,
        options: &EmbedOptions,
    ) -> Result<MapEmbed, RenderError> {
        let tiles = options.tiles.unwrap_or(self.config.tiles);
        let family = tiles.family();

        let token = if family.requires_token() {
            Some(
                self.config
                    .token
                    .clone()
                    .ok_or(RenderError::MissingToken { tiles })?,
            )
        } else {
            None
        };

        let id = options
            .id
            .clone()
            .unwrap_or_else(|| default_id(center, zoom, tiles));

        let markers = options
            .markers
            .iter()
            .map(|marker| EmbedMarker {
                position: marker.position_or(center),
                style: marker.style.sanitized(),
            })
            .collect();

        Ok(MapEmbed {
            id,
            family,
            tiles,
            tile_url: tile_url(tiles),
            style: tiles.style(),
            attribution: attribution(family),
            center,
            zoom,
            markers,
            controls: options.controls,
            token,
            width: options.width.clone(),
            height: options.height.clone(),
        })
    }

    /// Builds an embed centered on a location at its own zoom.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::EmptyLocation`] if the location has no
    /// coordinates, otherwise as [`Self::build`].
    pub fn for_location(
        &self,
        location: &Location,
        options: &EmbedOptions,
    ) -> Result<MapEmbed, RenderError> {
        if location.is_empty() {
            return Err(RenderError::EmptyLocation);
        }
        let center = location.coordinates().ok_or(RenderError::EmptyLocation)?;
        self.build(center, location.zoom_or_default(), options)
    }
}

/// `map-` followed by the first 8 hex digits of a SHA-256 over the center,
/// zoom and tile set.
fn default_id(center: LatLng, zoom: u32, tiles: MapTiles) -> String {
    let digest = Sha256::digest(format!("{center}|{zoom}|{tiles}").as_bytes());
    let hex = hex::encode(digest);
    format!("map-{}", &hex[..8])
}

fn tile_url(tiles: MapTiles) -> Option<String> {
    let style = tiles.style();
    match tiles.family() {
        TileFamily::Wikimedia => Some(format!(
            "https://maps.wikimedia.org/{style}/{{z}}/{{x}}/{{y}}{{r}}.png"
        )),
        TileFamily::OpenStreetMap => {
            Some("https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string())
        }
        TileFamily::Carto => Some(format!(
            "https://{{s}}.basemaps.cartocdn.com/{style}/{{z}}/{{x}}/{{y}}{{r}}.png"
        )),
        TileFamily::Mapbox => Some(format!(
            "https://api.mapbox.com/styles/v1/mapbox/{style}/tiles/{{z}}/{{x}}/{{y}}?access_token={{accessToken}}"
        )),
        TileFamily::Here => Some(format!(
            "https://maps.hereapi.com/v3/base/mc/{{z}}/{{x}}/{{y}}/png?style={style}&apiKey={{apiKey}}"
        )),
        TileFamily::Google => None,
    }
}

const fn attribution(family: TileFamily) -> &'static str {
    match family {
        TileFamily::Wikimedia => {
            "Wikimedia maps | Map data &copy; OpenStreetMap contributors"
        }
        TileFamily::OpenStreetMap => "&copy; OpenStreetMap contributors",
        TileFamily::Carto => "&copy; OpenStreetMap contributors &copy; CARTO",
        TileFamily::Mapbox => "&copy; Mapbox &copy; OpenStreetMap contributors",
        TileFamily::Google => "Map data &copy; Google",
        TileFamily::Here => "&copy; HERE",
    }
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const LONDON: LatLng = LatLng::new(51.5, -0.12);

    fn builder(tiles: MapTiles, token: Option<&str>) -> MapEmbedBuilder {
        MapEmbedBuilder::new(StaticMapConfig {
            tiles,
            token: token.map(str::to_string),
            endpoint: None,
        })
    }

    #[test]
    fn open_tiles_descriptor() {
        let embed = builder(MapTiles::Wikimedia, None)
            .build(LONDON, 15, &EmbedOptions::default())
            .unwrap();

        assert_eq!(embed.family, TileFamily::Wikimedia);
        assert_eq!(
            embed.tile_url.as_deref(),
            Some("https://maps.wikimedia.org/osm-intl/{z}/{x}/{y}{r}.png")
        );
        assert_eq!(embed.token, None);
        assert_eq!(embed.markers.len(), 1);
        assert_eq!(embed.markers[0].position, LONDON);

        let value = serde_json::to_value(&embed).unwrap();
        assert_eq!(value["center"], json!({"lat": 51.5, "lng": -0.12}));
        assert_eq!(value["tiles"], json!("wikimedia"));
        assert_eq!(value["tileUrl"], json!(embed.tile_url));
        assert_eq!(
            value["controls"],
            json!({"scrollWheelZoom": false, "zoomControl": true, "dragging": true})
        );
        assert_eq!(value["markers"][0]["color"], json!("ff0000"));
        assert!(value.get("token").is_none());
        assert!(value.get("width").is_none());
    }

    #[test]
    fn token_families_carry_the_token() {
        let embed = builder(MapTiles::MapboxOutdoors, Some("pk.test"))
            .build(LONDON, 12, &EmbedOptions::default())
            .unwrap();
        assert_eq!(embed.token.as_deref(), Some("pk.test"));
        assert_eq!(embed.style, "outdoors-v12");

        let result = builder(MapTiles::HereDay, None).build(LONDON, 12, &EmbedOptions::default());
        assert!(matches!(
            result,
            Err(RenderError::MissingToken {
                tiles: MapTiles::HereDay
            })
        ));

        let google = builder(MapTiles::GoogleTerrain, Some("g-key"))
            .build(LONDON, 12, &EmbedOptions::default())
            .unwrap();
        assert_eq!(google.tile_url, None);
    }

    #[test]
    fn default_id_is_deterministic() {
        let b = builder(MapTiles::CartoVoyager, None);
        let first = b.build(LONDON, 15, &EmbedOptions::default()).unwrap();
        let second = b.build(LONDON, 15, &EmbedOptions::default()).unwrap();
        assert_eq!(first.id, second.id);
        assert!(first.id.starts_with("map-"));
        assert_eq!(first.id.len(), "map-".len() + 8);
        assert!(first.id[4..].chars().all(|c| c.is_ascii_hexdigit()));

        let other = b.build(LONDON, 14, &EmbedOptions::default()).unwrap();
        assert_ne!(first.id, other.id);

        let named = EmbedOptions {
            id: Some("store-map".to_string()),
            ..EmbedOptions::default()
        };
        assert_eq!(b.build(LONDON, 15, &named).unwrap().id, "store-map");
    }

    #[test]
    fn markup_escapes_descriptor() {
        let options = EmbedOptions {
            id: Some("a\"b".to_string()),
            ..EmbedOptions::default()
        };
        let markup = builder(MapTiles::OpenStreetMap, None)
            .build(LONDON, 15, &options)
            .unwrap()
            .to_markup()
            .unwrap();

        assert!(markup.starts_with(r#"<div id="a&quot;b" class="simplemap" style="width:100%;height:400px" data-simplemap="{"#));
        assert!(markup.ends_with(r#"}"></div>"#));
        assert!(markup.contains("&quot;zoom&quot;:15"));
        assert!(!markup.contains(r#""zoom""#));
    }

    #[test]
    fn empty_location_has_no_embed() {
        let b = builder(MapTiles::Wikimedia, None);
        let empty = Location::from_value(&json!({"lat": "", "lng": ""}), &simple_map_models::NoReference)
            .into_value();
        assert!(matches!(
            b.for_location(&empty, &EmbedOptions::default()),
            Err(RenderError::EmptyLocation)
        ));

        let london = Location::from_value(&json!({"lat": 51.5, "lng": -0.12}), &simple_map_models::NoReference)
            .into_value();
        let embed = b.for_location(&london, &EmbedOptions::default()).unwrap();
        assert_eq!(embed.zoom, simple_map_models::DEFAULT_ZOOM);
    }
}
