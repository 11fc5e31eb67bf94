#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line access to the map field tooling.
//!
//! ```text
//! simple_map geocode "1 Infinite Loop, Cupertino" [--country US] [--location]
//! simple_map static-map --lat 51.5 --lng -0.12 [--zoom 15] [--scale 2] [--srcset]
//! simple_map embed --lat 51.5 --lng -0.12 [--zoom 15] [--markup]
//! simple_map distance --from 51.5,-0.12 [--to 48.85,2.35]
//! simple_map address '{"parts": {...}}' [--exclude city]... [--joiner ", "]
//! simple_map tiles
//! ```
//!
//! Settings come from `--config <path>` (TOML) when given, then from
//! `SIMPLE_MAP_*` environment variables.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use simple_map_geocoder::{CountryCode, Geocoder};
use simple_map_models::{DEFAULT_ADDRESS_JOINER, DEFAULT_ZOOM, LatLng, Location, MapTiles};
use simple_map_render::{
    DEFAULT_HEIGHT, DEFAULT_WIDTH, EmbedOptions, MapEmbedBuilder, Scale, StaticMapOptions,
    StaticMapRequestBuilder,
};
use simple_map_settings::{Settings, SettingsError};

#[derive(Parser)]
#[command(
    name = "simple_map",
    about = "Geocode addresses, measure distances and build map output"
)]
struct Cli {
    /// TOML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve an address to coordinates
    Geocode {
        /// Address to resolve
        address: String,
        /// Restrict results to an ISO-3166-1 alpha-2 country
        #[arg(long)]
        country: Option<CountryCode>,
        /// Print a full location blob instead of `{lat, lng}`
        #[arg(long)]
        location: bool,
    },
    /// Build a static map image URL
    StaticMap {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        #[arg(long, default_value_t = DEFAULT_ZOOM)]
        zoom: u32,
        #[arg(long, default_value_t = DEFAULT_WIDTH)]
        width: u32,
        #[arg(long, default_value_t = DEFAULT_HEIGHT)]
        height: u32,
        /// Pixel density (1 or 2)
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=2))]
        scale: u32,
        /// Tile set to use instead of the configured one
        #[arg(long, value_parser = parse_tiles)]
        tiles: Option<MapTiles>,
        /// Print a `srcset` value with 1x and 2x images
        #[arg(long)]
        srcset: bool,
    },
    /// Build an interactive map embed
    Embed {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        #[arg(long, default_value_t = DEFAULT_ZOOM)]
        zoom: u32,
        /// Element id
        #[arg(long)]
        id: Option<String>,
        /// Tile set to use instead of the configured one
        #[arg(long, value_parser = parse_tiles)]
        tiles: Option<MapTiles>,
        /// Print HTML markup instead of the JSON descriptor
        #[arg(long)]
        markup: bool,
    },
    /// Great-circle distance between two points
    Distance {
        /// Start point as LAT,LNG
        #[arg(long, allow_hyphen_values = true)]
        from: LatLng,
        /// End point as LAT,LNG. Defaults to the configured home point
        #[arg(long, allow_hyphen_values = true)]
        to: Option<LatLng>,
    },
    /// Format the address of a stored location blob
    Address {
        /// Location JSON
        json: String,
        /// Part to leave out (repeatable)
        #[arg(long)]
        exclude: Vec<String>,
        /// Separator between address segments
        #[arg(long, default_value = DEFAULT_ADDRESS_JOINER)]
        joiner: String,
    },
    /// List the available tile sets
    Tiles,
}

fn parse_tiles(s: &str) -> Result<MapTiles, String> {
    s.parse::<MapTiles>()
        .map_err(|_| format!("unknown tile set '{s}'; run `simple_map tiles` for the list"))
}

fn load_settings(path: Option<&Path>) -> Result<Settings, SettingsError> {
    let settings = match path {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    settings.with_env_overrides()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Geocode {
            address,
            country,
            location,
        } => {
            let geocoder = Geocoder::from_settings(&settings)?;
            let resolution = geocoder.resolve(&address, country).await;

            if !resolution.is_resolved() {
                log::info!("Could not resolve {address:?}");
            }

            let output = match resolution.address() {
                Some(result) if location => {
                    let calculator = settings.distance_calculator();
                    let location =
                        Location::from_value(&result.to_location_value(), &calculator).into_value();
                    serde_json::to_string_pretty(&location)?
                }
                _ => serde_json::to_string_pretty(&resolution)?,
            };
            println!("{output}");
        }
        Commands::StaticMap {
            lat,
            lng,
            zoom,
            width,
            height,
            scale,
            tiles,
            srcset,
        } => {
            let builder = StaticMapRequestBuilder::from_settings(&settings);
            let options = StaticMapOptions {
                scale: Scale::from_factor(scale).unwrap_or_default(),
                width,
                height,
                tiles,
                ..StaticMapOptions::default()
            };
            let center = LatLng::new(lat, lng);

            if srcset {
                println!("{}", builder.src_set(center, zoom, &options)?);
            } else {
                println!("{}", builder.build(center, zoom, &options)?);
            }
        }
        Commands::Embed {
            lat,
            lng,
            zoom,
            id,
            tiles,
            markup,
        } => {
            let options = EmbedOptions {
                id,
                tiles,
                ..EmbedOptions::default()
            };
            let embed = MapEmbedBuilder::from_settings(&settings).build(
                LatLng::new(lat, lng),
                zoom,
                &options,
            )?;

            if markup {
                println!("{}", embed.to_markup()?);
            } else {
                println!("{}", serde_json::to_string_pretty(&embed)?);
            }
        }
        Commands::Distance { from, to } => {
            let calculator = settings.distance_calculator();
            let distance = match to {
                Some(to) => calculator.distance(from, to),
                None => calculator.distance_from_reference(from)?,
            };
            println!("{distance:.3} {}", calculator.unit());
        }
        Commands::Address {
            json,
            exclude,
            joiner,
        } => {
            let calculator = settings.distance_calculator();
            let validated = Location::from_json_str(&json, &calculator);
            for (field, messages) in validated.errors.iter() {
                for message in messages {
                    log::warn!("{field}: {message}");
                }
            }

            let exclude: Vec<&str> = exclude.iter().map(String::as_str).collect();
            println!("{}", validated.value.format_address(&exclude, &joiner));
        }
        Commands::Tiles => {
            println!("{:<20} {:<14} TOKEN", "NAME", "PROVIDER");
            for tiles in MapTiles::all() {
                let token = if tiles.requires_token() { "yes" } else { "no" };
                println!("{:<20} {:<14} {token}", tiles.as_ref(), tiles.family().as_ref());
            }
        }
    }

    Ok(())
}
