#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Map output for a location: static image URLs and interactive embeds.
//!
//! Both builders are pure. They take a center, a zoom level and options,
//! and combine them with the site's tile set and credentials from
//! [`StaticMapConfig`] into a provider-specific URL or a serializable embed
//! descriptor. Nothing here performs I/O.

pub mod embed;
pub mod static_map;

use serde::{Deserialize, Serialize};
use simple_map_models::{LatLng, MapTiles};
use thiserror::Error;

pub use embed::{EmbedControls, EmbedOptions, MapEmbed, MapEmbedBuilder};
pub use simple_map_settings::StaticMapConfig;
pub use static_map::{
    DEFAULT_HEIGHT, DEFAULT_WIDTH, Scale, StaticMapOptions, StaticMapRequest,
    StaticMapRequestBuilder,
};

/// Default marker color (hex RGB, no leading `#`).
pub const DEFAULT_MARKER_COLOR: &str = "ff0000";

/// Errors from building map output.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The tile set needs an access token and none is configured.
    #[error("{tiles} maps require an access token")]
    MissingToken {
        /// The tile set missing a token.
        tiles: MapTiles,
    },

    /// An open tile set was requested but no static renderer endpoint is
    /// configured.
    #[error("No static map endpoint configured for {tiles}")]
    MissingStaticEndpoint {
        /// The requested tile set.
        tiles: MapTiles,
    },

    /// The location has no coordinates to center on.
    #[error("Location has no coordinates")]
    EmptyLocation,

    /// Image width or height is zero.
    #[error("Invalid map size {width}x{height}")]
    InvalidSize {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },

    /// A configured endpoint is not a valid URL.
    #[error("Invalid URL {url}: {message}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        message: String,
    },

    /// The embed descriptor could not be serialized.
    #[error("Failed to serialize map embed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// How a marker is drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerStyle {
    /// Hex RGB color without a leading `#`.
    pub color: String,
    /// Single-character label drawn on the marker.
    pub label: Option<char>,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            color: DEFAULT_MARKER_COLOR.to_string(),
            label: None,
        }
    }
}

impl MarkerStyle {
    /// Normalizes `color` to lowercase hex without `#`. Anything that is not
    /// a 3 or 6 digit hex color falls back to [`DEFAULT_MARKER_COLOR`].
    #[must_use]
    pub fn new(color: &str, label: Option<char>) -> Self {
        let color = color.trim().trim_start_matches('#').to_ascii_lowercase();
        let color = if is_hex_color(&color) {
            color
        } else {
            log::debug!("Ignoring invalid marker color {color:?}");
            DEFAULT_MARKER_COLOR.to_string()
        };

        Self {
            color,
            label: label.filter(char::is_ascii_alphanumeric),
        }
    }

    /// The color to draw with. The fields are public, so this re-checks
    /// them before they reach a URL.
    #[must_use]
    pub fn color(&self) -> &str {
        if is_hex_color(&self.color) {
            &self.color
        } else {
            DEFAULT_MARKER_COLOR
        }
    }

    #[must_use]
    pub fn label(&self) -> Option<char> {
        self.label.filter(char::is_ascii_alphanumeric)
    }

    /// A copy with both fields checked.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        Self {
            color: self.color().to_string(),
            label: self.label(),
        }
    }
}

fn is_hex_color(color: &str) -> bool {
    matches!(color.len(), 3 | 6) && color.chars().all(|c| c.is_ascii_hexdigit())
}

/// A marker on a map. A marker without a position sits on the map center.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub position: Option<LatLng>,
    pub style: MarkerStyle,
}

impl Marker {
    /// A default-styled marker at `position`.
    #[must_use]
    pub fn at(position: LatLng) -> Self {
        Self {
            position: Some(position),
            style: MarkerStyle::default(),
        }
    }

    #[must_use]
    pub fn position_or(&self, center: LatLng) -> LatLng {
        self.position.unwrap_or(center)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_style_normalizes_input() {
        let style = MarkerStyle::new(" #00AAFF ", Some('A'));
        assert_eq!(style.color, "00aaff");
        assert_eq!(style.label, Some('A'));

        let style = MarkerStyle::new("00aaff", Some('?'));
        assert_eq!(style.label, None);

        assert_eq!(MarkerStyle::new("#F0A", None).color, "f0a");
    }

    #[test]
    fn marker_style_rejects_non_hex_colors() {
        for color in ["red", "ff/../x", "12345", "ff00zz", ""] {
            assert_eq!(MarkerStyle::new(color, None).color, DEFAULT_MARKER_COLOR, "{color}");
        }

        let style = MarkerStyle {
            color: "ff/../x".to_string(),
            label: Some('/'),
        };
        assert_eq!(style.color(), DEFAULT_MARKER_COLOR);
        assert_eq!(style.label(), None);
        assert_eq!(style.sanitized(), MarkerStyle::default());
    }

    #[test]
    fn marker_defaults_to_center() {
        let center = LatLng::new(51.5, -0.12);
        assert_eq!(Marker::default().position_or(center), center);

        let elsewhere = LatLng::new(48.85, 2.35);
        assert_eq!(Marker::at(elsewhere).position_or(center), elsewhere);
    }
}
