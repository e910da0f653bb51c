//! Resolution of free-text locations against an external geocoding provider.
use std::time::Duration;

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::{de::DeserializeOwned, Deserialize};

use crate::{http, Coordinates, Error, PlaceRecord};

/// An external provider of coordinates and places.
#[async_trait]
pub trait GeocodingClient: Send + Sync {
    /// Returns the coordinates of `location`, if the provider knows it
    async fn resolve_coordinates(&self, location: &str) -> Result<Option<Coordinates>, Error>;

    /// Returns places matching `query`, biased towards `near` when given
    async fn search_places(
        &self,
        query: &str,
        near: Option<Coordinates>,
    ) -> Result<Vec<PlaceRecord>, Error>;

    /// Whether this client talks to an actual provider
    fn is_configured(&self) -> bool {
        true
    }
}

/// A [`GeocodingClient`] that knows nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeocoding;

#[async_trait]
impl GeocodingClient for NoGeocoding {
    async fn resolve_coordinates(&self, _: &str) -> Result<Option<Coordinates>, Error> {
        Ok(None)
    }

    async fn search_places(
        &self,
        _: &str,
        _: Option<Coordinates>,
    ) -> Result<Vec<PlaceRecord>, Error> {
        Ok(vec![])
    }

    fn is_configured(&self) -> bool {
        false
    }
}

pub static GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
pub static PLACES_URL: &str = "https://maps.googleapis.com/maps/api/place/textsearch/json";

/// Configuration of [`GooglePlaces`]
#[derive(Debug, Clone)]
pub struct GooglePlacesConfig {
    pub api_key: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub geocode_url: String,
    pub places_url: String,
    /// radius in meters used to bias place searches around a location
    pub radius_m: u32,
}

impl GooglePlacesConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            timeout: Duration::from_secs(10),
            max_retries: 2,
            geocode_url: GEOCODE_URL.to_string(),
            places_url: PLACES_URL.to_string(),
            radius_m: 50_000,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

#[derive(Debug, Deserialize)]
struct Response<T> {
    status: String,
    #[serde(default = "Vec::new")]
    results: Vec<T>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    name: String,
    #[serde(default)]
    formatted_address: String,
    geometry: Geometry,
    #[serde(default)]
    types: Vec<String>,
}

/// Returns the results of a Google Maps API response.
/// `ZERO_RESULTS` is an empty response; any status other than `OK` is an error.
fn results<T: DeserializeOwned>(data: &[u8]) -> Result<Vec<T>, Error> {
    let response: Response<T> = serde_json::from_slice(data)?;
    match response.status.as_str() {
        "OK" => Ok(response.results),
        "ZERO_RESULTS" => Ok(vec![]),
        status => Err(Error::ExternalServiceUnavailable(format!(
            "{status}: {}",
            response.error_message.unwrap_or_default()
        ))),
    }
}

fn to_coordinates(location: LatLng) -> Coordinates {
    Coordinates::new(location.lat, location.lng)
}

fn parse_geocode(data: &[u8]) -> Result<Option<Coordinates>, Error> {
    Ok(results::<GeocodeResult>(data)?
        .into_iter()
        .next()
        .map(|result| to_coordinates(result.geometry.location)))
}

fn parse_places(data: &[u8]) -> Result<Vec<PlaceRecord>, Error> {
    Ok(results::<PlaceResult>(data)?
        .into_iter()
        .map(|place| PlaceRecord {
            name: place.name,
            formatted_address: place.formatted_address,
            coordinates: to_coordinates(place.geometry.location),
            types: place.types,
        })
        .collect())
}

fn to_url(base: &str, params: &[(&str, String)]) -> Result<reqwest::Url, Error> {
    reqwest::Url::parse_with_params(base, params)
        .map_err(|e| Error::ExternalServiceUnavailable(e.to_string()))
}

/// A [`GeocodingClient`] backed by the Google Geocoding and Places (text search) APIs.
/// Requests time out after [`GooglePlacesConfig::timeout`] and transient failures are retried.
pub struct GooglePlaces {
    config: GooglePlacesConfig,
    client: ClientWithMiddleware,
}

impl GooglePlaces {
    pub fn new(config: GooglePlacesConfig) -> Result<Self, Error> {
        let client = http::client(config.timeout, config.max_retries)?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl GeocodingClient for GooglePlaces {
    async fn resolve_coordinates(&self, location: &str) -> Result<Option<Coordinates>, Error> {
        log::debug!("geocode({location})");
        let url = to_url(
            &self.config.geocode_url,
            &[
                ("address", location.to_string()),
                ("key", self.config.api_key.clone()),
            ],
        )?;
        parse_geocode(&http::get(&self.client, url).await?)
    }

    async fn search_places(
        &self,
        query: &str,
        near: Option<Coordinates>,
    ) -> Result<Vec<PlaceRecord>, Error> {
        log::debug!("search_places({query}, {near:?})");
        let mut params = vec![
            ("query", query.to_string()),
            ("key", self.config.api_key.clone()),
        ];
        if let Some(near) = near {
            params.push(("location", format!("{},{}", near.lat, near.lng)));
            params.push(("radius", self.config.radius_m.to_string()));
        }
        let url = to_url(&self.config.places_url, &params)?;
        parse_places(&http::get(&self.client, url).await?)
    }
}
