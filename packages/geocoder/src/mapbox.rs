//! Mapbox Geocoding API client.
//!
//! See <https://docs.mapbox.com/api/search/geocoding-v5/>

use simple_map_models::{GeoService, Parts};

use crate::{GeocodeError, GeocodeQuery, GeocodedAddress, GeocodingGateway, coordinate};

const BASE_URL: &str = "https://api.mapbox.com/geocoding/v5/mapbox.places/";

/// Geocodes addresses with the Mapbox places endpoint.
#[derive(Debug, Clone)]
pub struct MapboxGateway {
    client: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl MapboxGateway {
    #[must_use]
    pub fn new(client: reqwest::Client, access_token: String) -> Self {
        Self {
            client,
            access_token,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Request URL for `query`. The address is percent-encoded as a path
    /// segment.
    fn request_url(&self, query: &GeocodeQuery) -> Result<reqwest::Url, GeocodeError> {
        let invalid = |message: String| GeocodeError::InvalidEndpoint {
            url: self.base_url.clone(),
            message,
        };

        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("cannot be a base URL".to_string()))?
            .pop_if_empty()
            .push(&format!("{}.json", query.address));

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("access_token", &self.access_token);
            pairs.append_pair("limit", "1");
            if let Some(country) = &query.country {
                pairs.append_pair("country", &country.to_lowercase());
            }
        }

        Ok(url)
    }
}

#[async_trait::async_trait]
impl GeocodingGateway for MapboxGateway {
    fn service(&self) -> GeoService {
        GeoService::Mapbox
    }

    async fn geocode(
        &self,
        query: &GeocodeQuery,
    ) -> Result<Option<GeocodedAddress>, GeocodeError> {
        let resp = self.client.get(self.request_url(query)?).send().await?;

        match resp.status() {
            reqwest::StatusCode::TOO_MANY_REQUESTS => return Err(GeocodeError::RateLimited),
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                let body: serde_json::Value = resp.json().await.unwrap_or_default();
                return Err(GeocodeError::Denied {
                    service: GeoService::Mapbox,
                    message: body["message"].as_str().unwrap_or("unauthorized").to_string(),
                });
            }
            _ => {}
        }

        let body: serde_json::Value = resp.error_for_status()?.json().await?;
        parse_response(&body)
    }
}

/// Parses a Mapbox `FeatureCollection` response.
fn parse_response(body: &serde_json::Value) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let features = body["features"]
        .as_array()
        .ok_or_else(|| GeocodeError::Parse {
            message: "Mapbox response has no features array".to_string(),
        })?;

    let Some(first) = features.first() else {
        return Ok(None);
    };

    // `center` is [lng, lat]
    let (lng, lat) = match first["center"].as_array().map(Vec::as_slice) {
        Some([lng, lat]) => (coordinate(lng), coordinate(lat)),
        _ => (None, None),
    };
    let (Some(lat), Some(lng)) = (lat, lng) else {
        return Err(GeocodeError::Parse {
            message: "Missing center in Mapbox response".to_string(),
        });
    };

    let parts = parse_parts(first);

    Ok(Some(GeocodedAddress {
        latitude: lat,
        longitude: lng,
        matched_address: first["place_name"].as_str().map(String::from),
        parts: Some(parts).filter(|p| !p.is_empty()),
        provider: GeoService::Mapbox,
    }))
}

/// Builds address parts from a feature and its `context` hierarchy.
fn parse_parts(feature: &serde_json::Value) -> Parts {
    let text = |value: &serde_json::Value| value.as_str().unwrap_or_default().to_string();

    let mut parts = Parts::default();
    if feature["place_type"]
        .as_array()
        .is_some_and(|types| types.iter().any(|t| t == "address"))
    {
        parts.number = text(&feature["address"]);
        parts.street = text(&feature["text"]);
    }

    for entry in feature["context"].as_array().into_iter().flatten() {
        let id = entry["id"].as_str().unwrap_or_default();
        let kind = id.split('.').next().unwrap_or_default();
        let slot = match kind {
            "place" | "locality" => &mut parts.city,
            "district" => &mut parts.county,
            "region" => &mut parts.state,
            "postcode" => &mut parts.postcode,
            "country" => &mut parts.country,
            _ => continue,
        };
        if slot.is_empty() {
            *slot = text(&entry["text"]);
        }
    }

    parts
}
