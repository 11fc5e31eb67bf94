//! Static map image URLs.
//!
//! | Family                   | Endpoint                                 |
//! |--------------------------|------------------------------------------|
//! | Google                   | Maps Static API                          |
//! | Mapbox                   | Static Images API                        |
//! | HERE                     | Map Image API v3                         |
//! | Wikimedia, OSM, Carto    | Self-hosted renderer (`static_endpoint`) |
//!
//! URLs are built deterministically: the same center, zoom, options and
//! configuration always give byte-identical output.

use reqwest::Url;
use simple_map_models::{LatLng, Location, MapTiles, TileFamily};
use simple_map_settings::{Settings, StaticMapConfig};

use crate::{Marker, RenderError};

/// Default image width in CSS pixels.
pub const DEFAULT_WIDTH: u32 = 640;

/// Default image height in CSS pixels.
pub const DEFAULT_HEIGHT: u32 = 320;

const GOOGLE_STATIC_URL: &str = "https://maps.googleapis.com/maps/api/staticmap";
const MAPBOX_STATIC_URL: &str = "https://api.mapbox.com/styles/v1/mapbox";
const HERE_STATIC_URL: &str = "https://image.maps.hereapi.com/mia/v3/base/mc";

/// Pixel density of the requested image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Scale {
    #[default]
    One,
    /// Retina.
    Two,
}

impl Scale {
    #[must_use]
    pub const fn factor(self) -> u32 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }

    #[must_use]
    pub const fn from_factor(factor: u32) -> Option<Self> {
        match factor {
            1 => Some(Self::One),
            2 => Some(Self::Two),
            _ => None,
        }
    }
}

/// Options for a single static map image.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticMapOptions {
    pub scale: Scale,
    pub width: u32,
    pub height: u32,
    /// Markers to draw. Defaults to a single marker on the center.
    pub markers: Vec<Marker>,
    /// Tile set to use instead of the configured one.
    pub tiles: Option<MapTiles>,
}

impl Default for StaticMapOptions {
    fn default() -> Self {
        Self {
            scale: Scale::One,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            markers: vec![Marker::default()],
            tiles: None,
        }
    }
}

impl StaticMapOptions {
    #[must_use]
    pub fn with_scale(mut self, scale: Scale) -> Self {
        self.scale = scale;
        self
    }
}

/// A built static map image request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticMapRequest {
    pub url: String,
    pub tiles: MapTiles,
    pub width: u32,
    pub height: u32,
    pub scale: Scale,
}

impl std::fmt::Display for StaticMapRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}

/// Builds provider-specific static map URLs for the configured tile set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticMapRequestBuilder {
    config: StaticMapConfig,
}

impl StaticMapRequestBuilder {
    #[must_use]
    pub const fn new(config: StaticMapConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.static_map_config())
    }

    /// Builds the image URL for a map centered on `center`.
    ///
    /// # Errors
    ///
    /// * [`RenderError::InvalidSize`] if the width or height is zero
    /// * [`RenderError::MissingToken`] if the tile set needs a token and
    ///   none is configured
    /// * [`RenderError::MissingStaticEndpoint`] if an open tile set is used
    ///   without a static renderer endpoint
    pub fn build(
        &self,
        center: LatLng,
        zoom: u32,
        options: &StaticMapOptions,
    ) -> Result<StaticMapRequest, RenderError> {
        if options.width == 0 || options.height == 0 {
            return Err(RenderError::InvalidSize {
                width: options.width,
                height: options.height,
            });
        }

        let tiles = options.tiles.unwrap_or(self.config.tiles);
        let url = match tiles.family() {
            TileFamily::Google => self.google_url(tiles, center, zoom, options)?,
            TileFamily::Mapbox => self.mapbox_url(tiles, center, zoom, options)?,
            TileFamily::Here => self.here_url(tiles, center, zoom, options)?,
            TileFamily::Wikimedia | TileFamily::OpenStreetMap | TileFamily::Carto => {
                self.open_url(tiles, center, zoom, options)?
            }
        };

        log::trace!("Built {tiles} static map for {center} at zoom {zoom}");

        Ok(StaticMapRequest {
            url: url.into(),
            tiles,
            width: options.width,
            height: options.height,
            scale: options.scale,
        })
    }

    /// Builds a `srcset` attribute value pairing the 1x and 2x images:
    /// `"{url1} 1x, {url2} 2x"`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] under the same conditions as
    /// [`Self::build`].
    pub fn src_set(
        &self,
        center: LatLng,
        zoom: u32,
        options: &StaticMapOptions,
    ) -> Result<String, RenderError> {
        let one = self.build(center, zoom, &options.clone().with_scale(Scale::One))?;
        let two = self.build(center, zoom, &options.clone().with_scale(Scale::Two))?;
        Ok(format!("{one} 1x, {two} 2x"))
    }

    /// Builds the image URL centered on a location at its own zoom.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::EmptyLocation`] if the location has no
    /// coordinates, otherwise as [`Self::build`].
    pub fn for_location(
        &self,
        location: &Location,
        options: &StaticMapOptions,
    ) -> Result<StaticMapRequest, RenderError> {
        let center = location_center(location)?;
        self.build(center, location.zoom_or_default(), options)
    }

    /// Builds a `srcset` value for a location.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::EmptyLocation`] if the location has no
    /// coordinates, otherwise as [`Self::build`].
    pub fn src_set_for_location(
        &self,
        location: &Location,
        options: &StaticMapOptions,
    ) -> Result<String, RenderError> {
        let center = location_center(location)?;
        self.src_set(center, location.zoom_or_default(), options)
    }

    fn token(&self, tiles: MapTiles) -> Result<&str, RenderError> {
        self.config
            .token
            .as_deref()
            .ok_or(RenderError::MissingToken { tiles })
    }

    fn google_url(
        &self,
        tiles: MapTiles,
        center: LatLng,
        zoom: u32,
        options: &StaticMapOptions,
    ) -> Result<Url, RenderError> {
        let key = self.token(tiles)?;
        let mut url = parse_url(GOOGLE_STATIC_URL)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("center", &center.to_string())
                .append_pair("zoom", &zoom.to_string())
                .append_pair("size", &format!("{}x{}", options.width, options.height))
                .append_pair("scale", &options.scale.factor().to_string())
                .append_pair("maptype", tiles.style());
            for marker in &options.markers {
                query.append_pair("markers", &google_marker(marker, center));
            }
            query.append_pair("key", key);
        }
        Ok(url)
    }

    fn mapbox_url(
        &self,
        tiles: MapTiles,
        center: LatLng,
        zoom: u32,
        options: &StaticMapOptions,
    ) -> Result<Url, RenderError> {
        let token = self.token(tiles)?;

        let overlays = options
            .markers
            .iter()
            .map(|marker| mapbox_marker(marker, center))
            .collect::<Vec<_>>()
            .join(",");
        let overlays = if overlays.is_empty() {
            overlays
        } else {
            format!("{overlays}/")
        };
        let retina = if options.scale == Scale::Two { "@2x" } else { "" };

        let mut url = parse_url(&format!(
            "{MAPBOX_STATIC_URL}/{style}/static/{overlays}{lng},{lat},{zoom}/{w}x{h}{retina}",
            style = tiles.style(),
            lng = center.lng,
            lat = center.lat,
            w = options.width,
            h = options.height,
        ))?;
        url.query_pairs_mut().append_pair("access_token", token);
        Ok(url)
    }

    fn here_url(
        &self,
        tiles: MapTiles,
        center: LatLng,
        zoom: u32,
        options: &StaticMapOptions,
    ) -> Result<Url, RenderError> {
        let api_key = self.token(tiles)?;
        let ppi = match options.scale {
            Scale::One => "100",
            Scale::Two => "200",
        };

        let mut url = parse_url(&format!(
            "{HERE_STATIC_URL}/center:{lat},{lng};zoom={zoom}/{w}x{h}/png",
            lat = center.lat,
            lng = center.lng,
            w = options.width,
            h = options.height,
        ))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("apiKey", api_key)
                .append_pair("style", tiles.style())
                .append_pair("ppi", ppi);
            for marker in &options.markers {
                query.append_pair("overlay", &here_marker(marker, center));
            }
        }
        Ok(url)
    }

    fn open_url(
        &self,
        tiles: MapTiles,
        center: LatLng,
        zoom: u32,
        options: &StaticMapOptions,
    ) -> Result<Url, RenderError> {
        let endpoint = self
            .config
            .endpoint
            .as_deref()
            .ok_or(RenderError::MissingStaticEndpoint { tiles })?;

        let mut url = parse_url(endpoint)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("center", &center.to_string())
                .append_pair("zoom", &zoom.to_string())
                .append_pair("size", &format!("{}x{}", options.width, options.height))
                .append_pair("scale", &options.scale.factor().to_string())
                .append_pair("tiles", tiles.as_ref());
            for marker in &options.markers {
                query.append_pair("markers", &open_marker(marker, center));
            }
        }
        Ok(url)
    }
}

fn location_center(location: &Location) -> Result<LatLng, RenderError> {
    if location.is_empty() {
        return Err(RenderError::EmptyLocation);
    }
    location.coordinates().ok_or(RenderError::EmptyLocation)
}

fn parse_url(raw: &str) -> Result<Url, RenderError> {
    Url::parse(raw).map_err(|e| RenderError::InvalidUrl {
        url: raw.to_string(),
        message: e.to_string(),
    })
}

/// `color:0xff0000|label:A|51.5,-0.12`
fn google_marker(marker: &Marker, center: LatLng) -> String {
    let mut param = format!("color:0x{}", marker.style.color());
    if let Some(label) = marker.style.label() {
        param.push_str(&format!("|label:{}", label.to_ascii_uppercase()));
    }
    param.push_str(&format!("|{}", marker.position_or(center)));
    param
}

/// `pin-s-a+ff0000(-0.12,51.5)`
fn mapbox_marker(marker: &Marker, center: LatLng) -> String {
    let position = marker.position_or(center);
    let label = marker
        .style
        .label()
        .map(|l| format!("-{}", l.to_ascii_lowercase()))
        .unwrap_or_default();
    format!(
        "pin-s{label}+{color}({lng},{lat})",
        color = marker.style.color(),
        lng = position.lng,
        lat = position.lat,
    )
}

/// `point:51.5,-0.12;color=#ff0000;label=A`
fn here_marker(marker: &Marker, center: LatLng) -> String {
    let mut param = format!(
        "point:{};color=#{}",
        marker.position_or(center),
        marker.style.color()
    );
    if let Some(label) = marker.style.label() {
        param.push_str(&format!(";label={label}"));
    }
    param
}

/// `51.5,-0.12,ff0000[,A]`
fn open_marker(marker: &Marker, center: LatLng) -> String {
    let mut param = format!("{},{}", marker.position_or(center), marker.style.color());
    if let Some(label) = marker.style.label() {
        param.push(',');
        param.push(label);
    }
    param
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use simple_map_models::NoReference;

    use super::*;
    use crate::MarkerStyle;

    const LONDON: LatLng = LatLng::new(51.5, -0.12);

    fn builder(tiles: MapTiles, token: Option<&str>, endpoint: Option<&str>) -> StaticMapRequestBuilder {
        StaticMapRequestBuilder::new(StaticMapConfig {
            tiles,
            token: token.map(str::to_string),
            endpoint: endpoint.map(str::to_string),
        })
    }

    #[test]
    fn google_url() {
        let request = builder(MapTiles::GoogleRoadmap, Some("g-key"), None)
            .build(LONDON, 15, &StaticMapOptions::default())
            .unwrap();
        assert_eq!(
            request.url,
            "https://maps.googleapis.com/maps/api/staticmap?center=51.5%2C-0.12&zoom=15&size=640x320&scale=1&maptype=roadmap&markers=color%3A0xff0000%7C51.5%2C-0.12&key=g-key"
        );
        assert_eq!(request.tiles, MapTiles::GoogleRoadmap);
        assert_eq!((request.width, request.height), (DEFAULT_WIDTH, DEFAULT_HEIGHT));
    }

    #[test]
    fn google_marker_with_label() {
        let marker = Marker {
            position: Some(LatLng::new(48.85, 2.35)),
            style: MarkerStyle::new("#0000FF", Some('p')),
        };
        assert_eq!(google_marker(&marker, LONDON), "color:0x0000ff|label:P|48.85,2.35");
    }

    #[test]
    fn invalid_marker_color_never_reaches_the_url() {
        let marker = Marker {
            position: None,
            style: MarkerStyle {
                color: "ff/../x".to_string(),
                label: None,
            },
        };
        assert_eq!(mapbox_marker(&marker, LONDON), "pin-s+ff0000(-0.12,51.5)");
        assert_eq!(google_marker(&marker, LONDON), "color:0xff0000|51.5,-0.12");
    }

    #[test]
    fn mapbox_url() {
        let b = builder(MapTiles::MapboxStreets, Some("pk.test"), None);
        let request = b.build(LONDON, 15, &StaticMapOptions::default()).unwrap();
        assert_eq!(
            request.url,
            "https://api.mapbox.com/styles/v1/mapbox/streets-v12/static/pin-s+ff0000(-0.12,51.5)/-0.12,51.5,15/640x320?access_token=pk.test"
        );

        let options = StaticMapOptions {
            scale: Scale::Two,
            markers: vec![],
            ..StaticMapOptions::default()
        };
        let request = b.build(LONDON, 12, &options).unwrap();
        assert_eq!(
            request.url,
            "https://api.mapbox.com/styles/v1/mapbox/streets-v12/static/-0.12,51.5,12/640x320@2x?access_token=pk.test"
        );
    }

    #[test]
    fn here_url() {
        let options = StaticMapOptions {
            markers: vec![],
            ..StaticMapOptions::default()
        };
        let request = builder(MapTiles::HereNight, Some("here-key"), None)
            .build(LONDON, 10, &options)
            .unwrap();
        assert_eq!(
            request.url,
            "https://image.maps.hereapi.com/mia/v3/base/mc/center:51.5,-0.12;zoom=10/640x320/png?apiKey=here-key&style=explore.night&ppi=100"
        );
    }

    #[test]
    fn open_tiles_use_static_endpoint() {
        let request = builder(
            MapTiles::CartoPositron,
            None,
            Some("https://static.example.test/render"),
        )
        .build(LONDON, 15, &StaticMapOptions::default().with_scale(Scale::Two))
        .unwrap();
        assert_eq!(
            request.url,
            "https://static.example.test/render?center=51.5%2C-0.12&zoom=15&size=640x320&scale=2&tiles=carto-positron&markers=51.5%2C-0.12%2Cff0000"
        );
    }

    #[test]
    fn missing_credentials_are_configuration_errors() {
        let result = builder(MapTiles::MapboxDark, None, None).build(
            LONDON,
            15,
            &StaticMapOptions::default(),
        );
        assert!(matches!(
            result,
            Err(RenderError::MissingToken {
                tiles: MapTiles::MapboxDark
            })
        ));

        let result = builder(MapTiles::Wikimedia, None, None).build(
            LONDON,
            15,
            &StaticMapOptions::default(),
        );
        assert!(matches!(
            result,
            Err(RenderError::MissingStaticEndpoint { .. })
        ));
    }

    #[test]
    fn tiles_option_overrides_configuration() {
        let b = builder(MapTiles::GoogleRoadmap, Some("g-key"), None);
        let options = StaticMapOptions {
            tiles: Some(MapTiles::GoogleHybrid),
            ..StaticMapOptions::default()
        };
        let request = b.build(LONDON, 15, &options).unwrap();
        assert_eq!(request.tiles, MapTiles::GoogleHybrid);
        assert!(request.url.contains("maptype=hybrid"));
    }

    #[test]
    fn zero_size_is_rejected() {
        let options = StaticMapOptions {
            width: 0,
            ..StaticMapOptions::default()
        };
        let result = builder(MapTiles::GoogleRoadmap, Some("k"), None).build(LONDON, 15, &options);
        assert!(matches!(
            result,
            Err(RenderError::InvalidSize { width: 0, height: 320 })
        ));
    }

    #[test]
    fn src_set_pairs_scales() {
        let b = builder(MapTiles::GoogleTerrain, Some("g-key"), None);
        let options = StaticMapOptions::default();
        let src_set = b.src_set(LONDON, 15, &options).unwrap();

        let one = b.build(LONDON, 15, &options.clone().with_scale(Scale::One)).unwrap();
        let two = b.build(LONDON, 15, &options.with_scale(Scale::Two)).unwrap();
        assert_eq!(src_set, format!("{} 1x, {} 2x", one.url, two.url));
        assert_eq!(one.url.replace("scale=1", "scale=2"), two.url);
    }

    #[test]
    fn builds_for_location() {
        let b = builder(MapTiles::GoogleRoadmap, Some("g-key"), None);
        let location = Location::from_value(
            &json!({"lat": 51.5, "lng": -0.12, "zoom": 9}),
            &NoReference,
        )
        .into_value();
        let request = b.for_location(&location, &StaticMapOptions::default()).unwrap();
        assert!(request.url.contains("zoom=9"));
        assert!(b.src_set_for_location(&location, &StaticMapOptions::default()).is_ok());

        let empty = Location::from_value(&json!({}), &NoReference).into_value();
        assert!(matches!(
            b.for_location(&empty, &StaticMapOptions::default()),
            Err(RenderError::EmptyLocation)
        ));
    }

    #[test]
    fn output_is_deterministic() {
        let b = builder(MapTiles::HereDay, Some("here-key"), None);
        let options = StaticMapOptions::default();
        assert_eq!(
            b.build(LONDON, 15, &options).unwrap(),
            b.build(LONDON, 15, &options).unwrap()
        );
    }
}
