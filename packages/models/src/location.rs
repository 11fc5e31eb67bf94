//! The location value stored by a map field.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::parts::{AddressParts, PartName, PartsAccess, is_legacy_key, scalar_text};
use crate::{DistanceSource, LatLng, Validated, ValidationErrors};

/// Zoom level used when the input does not mention one.
pub const DEFAULT_ZOOM: u32 = 15;

/// Joiner used by templates that render the address over several lines.
pub const DEFAULT_ADDRESS_JOINER: &str = "<br/>";

/// Input keys that identify the stored row. They are assigned by storage
/// and never read from construction input.
const IDENTITY_KEYS: &[&str] = &["id", "ownerId", "ownerSiteId", "fieldId"];

/// Storage identity of a location.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationIdentity {
    pub id: Option<i64>,
    pub owner_id: Option<i64>,
    pub owner_site_id: Option<i64>,
    pub field_id: Option<i64>,
}

/// A geographic location attached to a content entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    identity: LocationIdentity,
    /// Latitude, unset when the input had none.
    pub lat: Option<f64>,
    /// Longitude, unset when the input had none.
    pub lng: Option<f64>,
    /// Zoom level. `None` only when the input explicitly blanked it.
    pub zoom: Option<u32>,
    /// Free-text display address.
    pub address: String,
    /// Structured address parts owned by this location.
    pub parts: AddressParts,
    distance: Option<f64>,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            identity: LocationIdentity::default(),
            lat: None,
            lng: None,
            zoom: Some(DEFAULT_ZOOM),
            address: String::new(),
            parts: AddressParts::default(),
            distance: None,
        }
    }
}

/// A value read through [`Location::get`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Attribute<'a> {
    Text(&'a str),
    Float(f64),
    Integer(i64),
    Null,
}

impl Serialize for Attribute<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(s) => serializer.serialize_str(s),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::Integer(i) => serializer.serialize_i64(*i),
            Self::Null => serializer.serialize_none(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Own {
    Id,
    OwnerId,
    OwnerSiteId,
    FieldId,
    Lat,
    Lng,
    Zoom,
    Address,
    Distance,
}

#[derive(Debug, Clone, Copy)]
enum Resolver {
    Part(PartName),
    Own(Own),
}

/// Attribute names readable through [`Location::get`]. Address parts are
/// resolved before the location's own fields.
const ATTRIBUTES: &[(&str, Resolver)] = &[
    ("number", Resolver::Part(PartName::Number)),
    ("street", Resolver::Part(PartName::Street)),
    ("streetAddress", Resolver::Part(PartName::Street)),
    ("city", Resolver::Part(PartName::City)),
    ("county", Resolver::Part(PartName::County)),
    ("state", Resolver::Part(PartName::State)),
    ("postcode", Resolver::Part(PartName::Postcode)),
    ("country", Resolver::Part(PartName::Country)),
    ("id", Resolver::Own(Own::Id)),
    ("ownerId", Resolver::Own(Own::OwnerId)),
    ("ownerSiteId", Resolver::Own(Own::OwnerSiteId)),
    ("fieldId", Resolver::Own(Own::FieldId)),
    ("lat", Resolver::Own(Own::Lat)),
    ("lng", Resolver::Own(Own::Lng)),
    ("zoom", Resolver::Own(Own::Zoom)),
    ("address", Resolver::Own(Own::Address)),
    ("distance", Resolver::Own(Own::Distance)),
];

impl Location {
    /// Builds a location from a raw stored or submitted blob.
    ///
    /// Identity keys in `raw` are ignored. Invalid coordinates or zoom are
    /// reported in the returned errors rather than failing construction.
    /// The distance from the reference point is computed through
    /// `distances` and is absent when it cannot be computed.
    #[must_use]
    pub fn from_value(raw: &Value, distances: &dyn DistanceSource) -> Validated<Self> {
        let empty = Map::new();
        let input = raw.as_object().unwrap_or(&empty);

        if IDENTITY_KEYS.iter().any(|key| input.contains_key(*key)) {
            log::debug!("Discarding identity keys from location input");
        }

        let mut errors = ValidationErrors::default();
        let lat = read_coordinate(input.get("lat"), "lat", "Lat", 90, &mut errors);
        let lng = read_coordinate(input.get("lng"), "lng", "Lng", 180, &mut errors);
        let zoom = read_zoom(input.get("zoom"), &mut errors);
        let address = input.get("address").map(scalar_text).unwrap_or_default();
        let parts = AddressParts::from_value(input.get("parts"));

        let mut location = Self {
            identity: LocationIdentity::default(),
            lat,
            lng,
            zoom,
            address,
            parts,
            distance: None,
        };
        location.distance = location
            .coordinates()
            .and_then(|point| distances.distance_from_reference(point));

        Validated {
            value: location,
            errors,
        }
    }

    /// Builds a location from a JSON string. Undecodable input is treated
    /// as an empty blob.
    #[must_use]
    pub fn from_json_str(raw: &str, distances: &dyn DistanceSource) -> Validated<Self> {
        let value = serde_json::from_str(raw).unwrap_or_else(|e| {
            log::debug!("Treating undecodable location input as empty: {e}");
            Value::Null
        });
        Self::from_value(&value, distances)
    }

    /// Attaches the storage identity.
    #[must_use]
    pub const fn with_identity(mut self, identity: LocationIdentity) -> Self {
        self.identity = identity;
        self
    }

    #[must_use]
    pub const fn identity(&self) -> LocationIdentity {
        self.identity
    }

    /// Distance from the reference point, computed at construction.
    #[must_use]
    pub const fn distance(&self) -> Option<f64> {
        self.distance
    }

    /// The coordinate pair, if both latitude and longitude are set.
    #[must_use]
    pub fn coordinates(&self) -> Option<LatLng> {
        Some(LatLng::new(self.lat?, self.lng?))
    }

    /// Zoom level, falling back to [`DEFAULT_ZOOM`].
    #[must_use]
    pub fn zoom_or_default(&self) -> u32 {
        self.zoom.unwrap_or(DEFAULT_ZOOM)
    }

    /// Returns `true` when neither coordinate carries a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        is_unset(self.lat) && is_unset(self.lng)
    }

    /// Formats the address parts for display.
    ///
    /// Segments are, in order: number and street on one segment, city,
    /// county, state, postcode, country. Parts named in `exclude` (aliases
    /// such as `address` for the street are accepted) are left out, empty
    /// segments are dropped and the rest are joined with `joiner`.
    #[must_use]
    pub fn format_address(&self, exclude: &[&str], joiner: &str) -> String {
        let excluded: Vec<PartName> = exclude
            .iter()
            .filter_map(|name| PartName::from_key(name))
            .collect();
        let part = |name: PartName| {
            if excluded.contains(&name) {
                ""
            } else {
                self.parts.part(name)
            }
        };

        let street_line = [part(PartName::Number), part(PartName::Street)]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let mut segments = vec![street_line.as_str()];
        segments.extend(
            [
                PartName::City,
                PartName::County,
                PartName::State,
                PartName::Postcode,
                PartName::Country,
            ]
            .into_iter()
            .map(part),
        );

        segments
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(joiner)
    }

    /// Reads an attribute by name.
    ///
    /// Address part names are forwarded to the owned parts. Legacy address
    /// keys read the raw legacy value when the parts were stored in the
    /// legacy shape and [`Attribute::Null`] otherwise. Remaining names are
    /// the location's own fields; `address` is the display address. Returns
    /// `None` for names this type does not know.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Attribute<'_>> {
        let resolver = ATTRIBUTES
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, resolver)| *resolver);

        match resolver {
            Some(Resolver::Part(part)) => Some(Attribute::Text(self.parts.part(part))),
            Some(Resolver::Own(own)) => Some(self.own(own)),
            None if is_legacy_key(name) => Some(
                self.parts
                    .legacy_value(name)
                    .map_or(Attribute::Null, Attribute::Text),
            ),
            None => None,
        }
    }

    fn own(&self, field: Own) -> Attribute<'_> {
        let int = |v: Option<i64>| v.map_or(Attribute::Null, Attribute::Integer);
        let float = |v: Option<f64>| v.map_or(Attribute::Null, Attribute::Float);

        match field {
            Own::Id => int(self.identity.id),
            Own::OwnerId => int(self.identity.owner_id),
            Own::OwnerSiteId => int(self.identity.owner_site_id),
            Own::FieldId => int(self.identity.field_id),
            Own::Lat => float(self.lat),
            Own::Lng => float(self.lng),
            Own::Zoom => int(self.zoom.map(i64::from)),
            Own::Address => Attribute::Text(&self.address),
            Own::Distance => float(self.distance),
        }
    }
}

/// Serializes own fields, the nested `parts` object, and every address
/// part flattened to the top level.
impl Serialize for Location {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", &self.identity.id)?;
        map.serialize_entry("ownerId", &self.identity.owner_id)?;
        map.serialize_entry("ownerSiteId", &self.identity.owner_site_id)?;
        map.serialize_entry("fieldId", &self.identity.field_id)?;
        map.serialize_entry("lat", &self.lat)?;
        map.serialize_entry("lng", &self.lng)?;
        map.serialize_entry("zoom", &self.zoom)?;
        map.serialize_entry("address", &self.address)?;
        map.serialize_entry("parts", &self.parts)?;
        map.serialize_entry("distance", &self.distance)?;
        for name in PartName::ALL {
            map.serialize_entry(name.as_ref(), self.parts.part(*name))?;
        }
        map.end()
    }
}

#[allow(clippy::float_cmp)]
fn is_unset(value: Option<f64>) -> bool {
    value.is_none_or(|v| v == 0.0)
}

enum Numeric {
    Unset,
    Value(f64),
    Invalid,
}

fn read_numeric(value: Option<&Value>) -> Numeric {
    let parsed = match value {
        None | Some(Value::Null) => return Numeric::Unset,
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if s.trim().is_empty() => return Numeric::Unset,
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    match parsed {
        Some(v) if v.is_finite() => Numeric::Value(v),
        _ => Numeric::Invalid,
    }
}

fn read_coordinate(
    value: Option<&Value>,
    field: &str,
    label: &str,
    limit: i32,
    errors: &mut ValidationErrors,
) -> Option<f64> {
    match read_numeric(value) {
        Numeric::Unset => None,
        Numeric::Invalid => {
            errors.add(field, format!("{label} must be a number."));
            None
        }
        Numeric::Value(v) => {
            let bound = f64::from(limit);
            if v < -bound {
                errors.add(field, format!("{label} must be no less than -{limit}."));
            } else if v > bound {
                errors.add(field, format!("{label} must be no greater than {limit}."));
            }
            Some(v)
        }
    }
}

fn read_zoom(value: Option<&Value>, errors: &mut ValidationErrors) -> Option<u32> {
    let Some(value) = value else {
        return Some(DEFAULT_ZOOM);
    };

    match read_numeric(Some(value)) {
        Numeric::Unset => {
            errors.add("zoom", "Zoom cannot be blank.");
            None
        }
        Numeric::Value(v) if v < 0.0 => {
            errors.add("zoom", "Zoom must be no less than 0.");
            None
        }
        #[allow(
            clippy::float_cmp,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        Numeric::Value(v) if v.fract() == 0.0 && v <= f64::from(u32::MAX) => Some(v as u32),
        #[allow(clippy::float_cmp)]
        Numeric::Value(v) if v.fract() == 0.0 => {
            errors.add("zoom", format!("Zoom must be no greater than {}.", u32::MAX));
            None
        }
        Numeric::Value(_) | Numeric::Invalid => {
            errors.add("zoom", "Zoom must be an integer.");
            None
        }
    }
}
