//! Nominatim / `OpenStreetMap` geocoder client.
//!
//! The public instance allows **1 request per second**; point
//! `nominatim_base_url` at a self-hosted instance for anything heavier.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use simple_map_models::{GeoService, Parts};

use crate::{GeocodeError, GeocodeQuery, GeocodedAddress, GeocodingGateway, coordinate};

/// Geocodes free-form addresses against a Nominatim search endpoint.
#[derive(Debug, Clone)]
pub struct NominatimGateway {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimGateway {
    #[must_use]
    pub const fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[async_trait::async_trait]
impl GeocodingGateway for NominatimGateway {
    fn service(&self) -> GeoService {
        GeoService::Nominatim
    }

    async fn geocode(
        &self,
        query: &GeocodeQuery,
    ) -> Result<Option<GeocodedAddress>, GeocodeError> {
        let mut params = vec![
            ("q", query.address.clone()),
            ("format", "jsonv2".to_string()),
            ("addressdetails", "1".to_string()),
            ("limit", "1".to_string()),
        ];
        if let Some(country) = &query.country {
            params.push(("countrycodes", country.to_lowercase()));
        }

        let resp = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }

        let body: serde_json::Value = resp.error_for_status()?.json().await?;
        parse_response(&body)
    }
}

/// Parses Nominatim JSON response.
fn parse_response(body: &serde_json::Value) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let lat = coordinate(&first["lat"]).ok_or_else(|| GeocodeError::Parse {
        message: "Missing lat in Nominatim response".to_string(),
    })?;

    let lon = coordinate(&first["lon"]).ok_or_else(|| GeocodeError::Parse {
        message: "Missing lon in Nominatim response".to_string(),
    })?;

    let parts = first["address"]
        .as_object()
        .map(Parts::from_map)
        .filter(|parts| !parts.is_empty());

    Ok(Some(GeocodedAddress {
        latitude: lat,
        longitude: lon,
        matched_address: first["display_name"].as_str().map(String::from),
        parts,
        provider: GeoService::Nominatim,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nominatim_result() {
        let body = serde_json::json!([{
            "lat": "51.5073219",
            "lon": "-0.1276474",
            "display_name": "London, Greater London, England, United Kingdom",
            "address": {
                "city": "London",
                "state_district": "Greater London",
                "state": "England",
                "country": "United Kingdom",
                "country_code": "gb"
            }
        }]);
        let result = parse_response(&body).unwrap().unwrap();
        assert!((result.latitude - 51.507_321_9).abs() < 1e-6);
        assert!((result.longitude - -0.127_647_4).abs() < 1e-6);
        assert_eq!(result.provider, GeoService::Nominatim);

        let parts = result.parts.unwrap();
        assert_eq!(parts.city, "London");
        assert_eq!(parts.state, "England");
        assert_eq!(parts.country, "United Kingdom");
        assert_eq!(parts.street, "");
    }

    #[test]
    fn reads_house_number_and_road() {
        let body = serde_json::json!([{
            "lat": "37.3318",
            "lon": "-122.0312",
            "address": {
                "house_number": "1",
                "road": "Infinite Loop",
                "town": "Cupertino",
                "postcode": "95014"
            }
        }]);
        let parts = parse_response(&body).unwrap().unwrap().parts.unwrap();
        assert_eq!(parts.number, "1");
        assert_eq!(parts.street, "Infinite Loop");
        assert_eq!(parts.city, "Cupertino");
        assert_eq!(parts.postcode, "95014");
    }

    #[test]
    fn parses_nominatim_empty() {
        let body = serde_json::json!([]);
        assert!(parse_response(&body).unwrap().is_none());
    }

    #[test]
    fn rejects_malformed_response() {
        let body = serde_json::json!({"error": "Unable to geocode"});
        assert!(matches!(
            parse_response(&body),
            Err(GeocodeError::Parse { .. })
        ));

        let body = serde_json::json!([{"lat": "51.5"}]);
        assert!(parse_response(&body).is_err());
    }
}
