//! Geocoding against the Zippopotam.us API (`GET {base}/us/{zip}`).
//!
//! Unknown ZIPs come back as `{}` with a 404, so the status code is not an
//! error on its own; only transport failures and unparseable bodies are.

use async_trait::async_trait;
use serde::Deserialize;
use wreq::Client;

use crate::error::GeocodeError;
use crate::location::Geocoder;
use crate::types::LocationRecord;

pub const DEFAULT_GEOCODER_URL: &str = "https://api.zippopotam.us";

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    #[serde(default)]
    places: Option<Vec<Place>>,
}

#[derive(Debug, Deserialize)]
struct Place {
    latitude: String,
    longitude: String,
    #[serde(rename = "place name", default)]
    place_name: String,
    #[serde(rename = "state abbreviation", default)]
    state_abbreviation: String,
}

pub struct ZippopotamGeocoder {
    http_client: Client,
    base_url: String,
}

impl ZippopotamGeocoder {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GeocodeError> {
        Ok(Self::with_client(crate::http::build_client()?, base_url))
    }

    /// Reuse an existing HTTP client (e.g. the one the schedule source uses).
    pub fn with_client(http_client: Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url_for(&self, zip: &str) -> String {
        format!("{}/us/{}", self.base_url, zip)
    }
}

#[async_trait]
impl Geocoder for ZippopotamGeocoder {
    async fn lookup(&self, zip: &str) -> Result<Option<LocationRecord>, GeocodeError> {
        let url = self.url_for(zip);
        tracing::debug!(%url, "geocoding ZIP");

        let response = self.http_client.get(url.as_str()).send().await?;
        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(zip, status = status.as_u16(), bytes = body.len(), "geocoder response");
        parse_places(zip, &body)
    }
}

/// Build a record from the first place entry of a geocoder body.
fn parse_places(zip: &str, body: &str) -> Result<Option<LocationRecord>, GeocodeError> {
    let parsed: PlacesResponse =
        serde_json::from_str(body).map_err(|source| GeocodeError::Deserialize {
            zip: zip.to_string(),
            source,
        })?;

    let Some(place) = parsed.places.and_then(|places| places.into_iter().next()) else {
        return Ok(None);
    };

    let coordinate = |value: &str| {
        value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| GeocodeError::InvalidCoordinate {
                zip: zip.to_string(),
                value: value.to_string(),
            })
    };

    Ok(Some(LocationRecord {
        lat: coordinate(&place.latitude)?,
        lon: coordinate(&place.longitude)?,
        city: place.place_name,
        state: place.state_abbreviation,
    }))
}
