//! Google Maps Geocoding API client.
//!
//! Google reports most failures in a `status` field of a `200 OK` body, so
//! the status is checked before results are read.
//!
//! See <https://developers.google.com/maps/documentation/geocoding/requests-geocoding>

use serde_json::{Map, Value};
use simple_map_models::parts::LEGACY_KEYS;
use simple_map_models::{GeoService, LegacyParts, Parts};

use crate::{GeocodeError, GeocodeQuery, GeocodedAddress, GeocodingGateway, coordinate};

const BASE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Geocodes addresses with the Google Maps Geocoding API.
#[derive(Debug, Clone)]
pub struct GoogleGateway {
    client: reqwest::Client,
    api_key: String,
}

impl GoogleGateway {
    #[must_use]
    pub const fn new(client: reqwest::Client, api_key: String) -> Self {
        Self { client, api_key }
    }
}

#[async_trait::async_trait]
impl GeocodingGateway for GoogleGateway {
    fn service(&self) -> GeoService {
        GeoService::GoogleMaps
    }

    async fn geocode(
        &self,
        query: &GeocodeQuery,
    ) -> Result<Option<GeocodedAddress>, GeocodeError> {
        let mut params = vec![
            ("address", query.address.clone()),
            ("key", self.api_key.clone()),
        ];
        if let Some(country) = &query.country {
            params.push(("components", format!("country:{country}")));
        }

        let resp = self.client.get(BASE_URL).query(&params).send().await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }

        let body: Value = resp.error_for_status()?.json().await?;
        parse_response(&body)
    }
}

/// Parses a Google geocoding response.
fn parse_response(body: &Value) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let status = body["status"].as_str().ok_or_else(|| GeocodeError::Parse {
        message: "Google response has no status".to_string(),
    })?;

    match status {
        "OK" => {}
        "ZERO_RESULTS" => return Ok(None),
        "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => return Err(GeocodeError::RateLimited),
        "REQUEST_DENIED" | "INVALID_REQUEST" => {
            return Err(GeocodeError::Denied {
                service: GeoService::GoogleMaps,
                message: body["error_message"]
                    .as_str()
                    .unwrap_or(status)
                    .to_string(),
            });
        }
        other => {
            return Err(GeocodeError::Parse {
                message: format!("Unexpected Google status {other}"),
            });
        }
    }

    let Some(first) = body["results"].as_array().and_then(|r| r.first()) else {
        return Ok(None);
    };

    let location = &first["geometry"]["location"];
    let (Some(lat), Some(lng)) = (coordinate(&location["lat"]), coordinate(&location["lng"])) else {
        return Err(GeocodeError::Parse {
            message: "Missing geometry.location in Google response".to_string(),
        });
    };

    let parts = first["address_components"]
        .as_array()
        .map(|components| parse_components(components))
        .filter(|parts| !parts.is_empty());

    Ok(Some(GeocodedAddress {
        latitude: lat,
        longitude: lng,
        matched_address: first["formatted_address"].as_str().map(String::from),
        parts,
        provider: GeoService::GoogleMaps,
    }))
}

/// Google's address components use the same type names as the legacy
/// stored shape, so they are collected into that shape and translated.
fn parse_components(components: &[Value]) -> Parts {
    let mut legacy = Map::new();

    for component in components {
        let types = component["types"].as_array().into_iter().flatten();
        for kind in types.filter_map(Value::as_str) {
            if !LEGACY_KEYS.contains(&kind) || legacy.contains_key(kind) {
                continue;
            }
            legacy.insert(kind.to_string(), component["long_name"].clone());
            legacy.insert(format!("{kind}_short"), component["short_name"].clone());
        }
    }

    LegacyParts::from_map(&legacy).parts().clone()
}
