//! Structured address parts and the legacy-shape compatibility layer.
//!
//! Address parts are persisted as a JSON object in one of two shapes:
//!
//! - **current**: `number`, `address`, `city`, `county`, `state`,
//!   `postcode`, `country`
//! - **legacy**: Google address component keys such as `street_number`,
//!   `route`, `locality` and `administrative_area_level_1`, optionally with
//!   `_short` siblings
//!
//! [`is_legacy`] classifies a raw blob and [`AddressParts::from_value`]
//! decodes it into the matching variant. Both variants expose the same
//! [`PartsAccess`] capability so nothing downstream needs to know which
//! shape was stored.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use strum_macros::{AsRefStr, Display};

/// Keys written by the legacy schema. Each may also appear with a `_short`
/// suffix.
pub const LEGACY_KEYS: &[&str] = &[
    "street_number",
    "route",
    "locality",
    "postal_town",
    "administrative_area_level_1",
    "administrative_area_level_2",
    "postal_code",
    "country",
];

/// Legacy keys that also exist in the current shape. Their presence alone
/// says nothing about which shape a blob is in.
const SHARED_KEYS: &[&str] = &["country"];

/// A named address segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display)]
#[strum(serialize_all = "camelCase")]
pub enum PartName {
    Number,
    Street,
    City,
    County,
    State,
    Postcode,
    Country,
}

impl PartName {
    /// All parts in display order.
    pub const ALL: &[Self] = &[
        Self::Number,
        Self::Street,
        Self::City,
        Self::County,
        Self::State,
        Self::Postcode,
        Self::Country,
    ];

    /// Resolves a part name, accepting the `address` and `streetAddress`
    /// aliases for [`PartName::Street`].
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "number" => Some(Self::Number),
            "street" | "address" | "streetAddress" => Some(Self::Street),
            "city" => Some(Self::City),
            "county" => Some(Self::County),
            "state" => Some(Self::State),
            "postcode" => Some(Self::Postcode),
            "country" => Some(Self::Country),
            _ => None,
        }
    }
}

/// Read access to address segments, shared by both stored shapes.
pub trait PartsAccess {
    /// The value of `name`, or `""` if the segment is empty.
    fn part(&self, name: PartName) -> &str;
}

/// Address parts in the current shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Parts {
    pub number: String,
    #[serde(rename = "address")]
    pub street: String,
    pub city: String,
    pub county: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
}

impl Parts {
    /// Reads the current shape from a decoded object.
    ///
    /// Besides the canonical keys this accepts the address keys geocoding
    /// providers return (`house_number`, `road`, `town`, `village`), so a
    /// provider's address block can be stored as-is.
    #[must_use]
    pub fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            number: first_text(map, &["number", "house_number", "housenumber"]),
            street: first_text(map, &["address", "street", "road"]),
            city: first_text(map, &["city", "town", "village"]),
            county: first_text(map, &["county"]),
            state: first_text(map, &["state"]),
            postcode: first_text(map, &["postcode"]),
            country: first_text(map, &["country"]),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        PartName::ALL.iter().all(|name| self.part(*name).is_empty())
    }
}

impl PartsAccess for Parts {
    fn part(&self, name: PartName) -> &str {
        match name {
            PartName::Number => &self.number,
            PartName::Street => &self.street,
            PartName::City => &self.city,
            PartName::County => &self.county,
            PartName::State => &self.state,
            PartName::Postcode => &self.postcode,
            PartName::Country => &self.country,
        }
    }
}

/// Address parts decoded from the legacy shape.
///
/// The legacy keys are translated onto the current field names; the raw
/// legacy values stay readable through [`LegacyParts::legacy_value`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyParts {
    parts: Parts,
    raw: BTreeMap<String, String>,
}

impl LegacyParts {
    #[must_use]
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let raw: BTreeMap<String, String> = map
            .iter()
            .filter(|(key, _)| is_legacy_key(key))
            .map(|(key, value)| (key.clone(), scalar_text(value)))
            .filter(|(_, value)| !value.is_empty())
            .collect();

        let get = |key: &str| raw.get(key).cloned().unwrap_or_default();

        let city = Some(get("postal_town"))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| get("locality"));

        let parts = Parts {
            number: get("street_number"),
            street: get("route"),
            city,
            county: get("administrative_area_level_2"),
            state: get("administrative_area_level_1"),
            postcode: get("postal_code"),
            country: get("country"),
        };

        Self { parts, raw }
    }

    /// The translated, current-shape view of these parts.
    #[must_use]
    pub const fn parts(&self) -> &Parts {
        &self.parts
    }

    /// The raw value stored under a legacy key, if the blob had one.
    #[must_use]
    pub fn legacy_value(&self, key: &str) -> Option<&str> {
        self.raw.get(key).map(String::as_str)
    }
}

/// Serializes the translated parts followed by the raw legacy keys, so the
/// blob still classifies as legacy when it is read back.
impl Serialize for LegacyParts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let current = [
            ("number", PartName::Number),
            ("address", PartName::Street),
            ("city", PartName::City),
            ("county", PartName::County),
            ("state", PartName::State),
            ("postcode", PartName::Postcode),
            ("country", PartName::Country),
        ];
        let extra = self
            .raw
            .iter()
            .filter(|(key, _)| !current.iter().any(|(name, _)| *name == key.as_str()));

        let mut map = serializer.serialize_map(None)?;
        for (key, part) in current {
            map.serialize_entry(key, self.parts.part(part))?;
        }
        for (key, value) in extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl PartsAccess for LegacyParts {
    fn part(&self, name: PartName) -> &str {
        self.parts.part(name)
    }
}

/// Address parts owned by a location, in whichever shape they were stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AddressParts {
    Current(Parts),
    Legacy(LegacyParts),
}

impl Default for AddressParts {
    fn default() -> Self {
        Self::Current(Parts::default())
    }
}

impl AddressParts {
    /// Decodes address parts from a raw stored value.
    ///
    /// `None`, `null` and anything that is not an object (after decoding a
    /// JSON string) produce empty parts. This never fails.
    #[must_use]
    pub fn from_value(raw: Option<&Value>) -> Self {
        match raw {
            Some(Value::Object(map)) => Self::from_map(map),
            Some(Value::String(s)) => Self::from_json_str(s),
            Some(Value::Null) | None => Self::default(),
            Some(other) => {
                log::debug!("Ignoring address parts of unexpected type: {other}");
                Self::default()
            }
        }
    }

    /// Decodes address parts from a JSON-encoded string.
    #[must_use]
    pub fn from_json_str(s: &str) -> Self {
        if s.trim().is_empty() {
            return Self::default();
        }

        match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => Self::from_map(&map),
            Ok(other) => {
                log::debug!("Ignoring address parts of unexpected type: {other}");
                Self::default()
            }
            Err(e) => {
                log::debug!("Ignoring undecodable address parts: {e}");
                Self::default()
            }
        }
    }

    fn from_map(map: &Map<String, Value>) -> Self {
        if map_is_legacy(map) {
            Self::Legacy(LegacyParts::from_map(map))
        } else {
            Self::Current(Parts::from_map(map))
        }
    }

    /// Reads a part by name, returning `""` for empty or unknown parts.
    #[must_use]
    pub fn get(&self, name: &str) -> &str {
        PartName::from_key(name).map_or("", |part| self.part(part))
    }

    /// The raw value of a legacy key. Always `None` for current-shape parts.
    #[must_use]
    pub fn legacy_value(&self, key: &str) -> Option<&str> {
        match self {
            Self::Current(_) => None,
            Self::Legacy(legacy) => legacy.legacy_value(key),
        }
    }

    #[must_use]
    pub const fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy(_))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Current(parts) => parts.is_empty(),
            Self::Legacy(legacy) => legacy.parts.is_empty(),
        }
    }
}

impl PartsAccess for AddressParts {
    fn part(&self, name: PartName) -> &str {
        match self {
            Self::Current(parts) => parts.part(name),
            Self::Legacy(legacy) => legacy.part(name),
        }
    }
}

impl<'de> Deserialize<'de> for AddressParts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(Some(&value)))
    }
}

/// Returns `true` if `raw` is an address blob in the legacy shape.
///
/// Only a legacy key that the current shape does not also use counts as a
/// marker; blobs without one are treated as current shape. Never fails.
#[must_use]
pub fn is_legacy(raw: &Value) -> bool {
    raw.as_object().is_some_and(map_is_legacy)
}

fn map_is_legacy(map: &Map<String, Value>) -> bool {
    map.keys().any(|key| is_decisive_legacy_key(key))
}

/// Returns `true` for legacy keys, including their `_short` variants.
#[must_use]
pub fn is_legacy_key(key: &str) -> bool {
    let base = key.strip_suffix("_short").unwrap_or(key);
    LEGACY_KEYS.contains(&base)
}

fn is_decisive_legacy_key(key: &str) -> bool {
    is_legacy_key(key) && !SHARED_KEYS.contains(&key)
}

fn first_text(map: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .map(scalar_text)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

/// Renders a stored scalar as display text. Strings are kept verbatim and
/// non-scalars become `""`.
pub(crate) fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn stored_strings_are_kept_verbatim() {
        let parts = AddressParts::from_value(Some(&json!({
            "city": "  London  ",
            "postcode": 12345
        })));
        assert_eq!(parts.get("city"), "  London  ");
        assert_eq!(parts.get("postcode"), "12345");

        let legacy = AddressParts::from_value(Some(&json!({"route": " Baker Street "})));
        assert!(legacy.is_legacy());
        assert_eq!(legacy.get("street"), " Baker Street ");
    }

    #[test]
    fn detects_legacy_shape() {
        assert!(is_legacy(&json!({"route": "Downing St", "locality": "London"})));
        assert!(is_legacy(&json!({"postal_code_short": "SW1A"})));
    }

    #[test]
    fn shared_key_alone_is_not_legacy() {
        assert!(!is_legacy(&json!({"country": "UK"})));
        assert!(!is_legacy(&json!({"city": "London", "country": "UK"})));
    }

    #[test]
    fn non_objects_are_not_legacy() {
        assert!(!is_legacy(&json!(null)));
        assert!(!is_legacy(&json!("route")));
        assert!(!is_legacy(&json!(["route", "locality"])));
        assert!(!is_legacy(&json!(42)));
    }

    #[test]
    fn decodes_current_shape() {
        let parts = AddressParts::from_value(Some(&json!({
            "number": "10",
            "address": "Downing Street",
            "city": "London",
            "postcode": "SW1A 2AA",
            "country": "UK"
        })));
        assert!(!parts.is_legacy());
        assert_eq!(parts.get("number"), "10");
        assert_eq!(parts.get("street"), "Downing Street");
        assert_eq!(parts.get("address"), "Downing Street");
        assert_eq!(parts.get("streetAddress"), "Downing Street");
        assert_eq!(parts.get("county"), "");
    }

    #[test]
    fn translates_legacy_keys() {
        let parts = AddressParts::from_value(Some(&json!({
            "street_number": "10",
            "route": "Downing Street",
            "postal_town": "London",
            "locality": "Westminster",
            "administrative_area_level_2": "Greater London",
            "administrative_area_level_1": "England",
            "postal_code": "SW1A 2AA",
            "country": "United Kingdom",
            "country_short": "GB"
        })));
        assert!(parts.is_legacy());
        assert_eq!(parts.part(PartName::Number), "10");
        assert_eq!(parts.part(PartName::Street), "Downing Street");
        assert_eq!(parts.part(PartName::City), "London");
        assert_eq!(parts.part(PartName::County), "Greater London");
        assert_eq!(parts.part(PartName::State), "England");
        assert_eq!(parts.part(PartName::Postcode), "SW1A 2AA");
        assert_eq!(parts.part(PartName::Country), "United Kingdom");
        assert_eq!(parts.legacy_value("country_short"), Some("GB"));
        assert_eq!(parts.legacy_value("locality"), Some("Westminster"));
    }

    #[test]
    fn legacy_city_falls_back_to_locality() {
        let parts = AddressParts::from_value(Some(&json!({"locality": "Bristol"})));
        assert_eq!(parts.part(PartName::City), "Bristol");
    }

    #[test]
    fn decodes_json_encoded_string() {
        let raw = json!(r#"{"city":"London","country":"UK"}"#);
        let parts = AddressParts::from_value(Some(&raw));
        assert_eq!(parts.get("city"), "London");
        assert_eq!(parts.get("country"), "UK");
    }

    #[test]
    fn malformed_input_yields_empty_parts() {
        for raw in [
            json!("{not json"),
            json!("[1, 2, 3]"),
            json!(17),
            json!(true),
            json!(null),
        ] {
            let parts = AddressParts::from_value(Some(&raw));
            for name in PartName::ALL {
                assert_eq!(parts.part(*name), "", "{raw} -> {name}");
            }
        }
        assert!(AddressParts::from_value(None).is_empty());
    }

    #[test]
    fn unknown_part_reads_as_empty() {
        let parts = AddressParts::from_value(Some(&json!({"city": "Leeds"})));
        assert_eq!(parts.get("planet"), "");
    }

    #[test]
    fn numeric_values_are_read_as_text() {
        let parts = AddressParts::from_value(Some(&json!({"number": 221, "postcode": null})));
        assert_eq!(parts.get("number"), "221");
        assert_eq!(parts.get("postcode"), "");
    }

    #[test]
    fn accepts_provider_address_keys() {
        let parts = AddressParts::from_value(Some(&json!({
            "house_number": "1600",
            "road": "Amphitheatre Parkway",
            "town": "Mountain View",
            "state": "California"
        })));
        assert_eq!(parts.get("number"), "1600");
        assert_eq!(parts.get("street"), "Amphitheatre Parkway");
        assert_eq!(parts.get("city"), "Mountain View");
    }

    #[test]
    fn legacy_parts_survive_reserialization() {
        let raw = json!({"route": "High St", "locality": "Oxford", "country": "UK"});
        let parts = AddressParts::from_value(Some(&raw));
        let reserialized = serde_json::to_value(&parts).unwrap();
        let again = AddressParts::from_value(Some(&reserialized));
        assert_eq!(parts, again);
    }

    #[test]
    fn deserializes_through_serde() {
        let parts: AddressParts = serde_json::from_str(r#"{"city":"York"}"#).unwrap();
        assert_eq!(parts.get("city"), "York");
        let parts: AddressParts = serde_json::from_str("null").unwrap();
        assert!(parts.is_empty());
    }
}
