use serde::{Deserialize, Serialize};

use crate::classify;
use crate::RawRecord;

/// A geo-point, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// An airport as returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Airport {
    /// The IATA code (e.g. `JFK`). Empty for places from the geocoder without a code.
    pub iata_code: String,
    pub name: String,
    pub city: String,
    pub country: String,
    pub coordinates: Coordinates,
    /// Distance in km to the searched location. Only set by proximity searches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    pub is_international: bool,
}

impl From<&RawRecord> for Airport {
    fn from(record: &RawRecord) -> Self {
        Self {
            iata_code: record.iata.clone().unwrap_or_default(),
            name: record.name.clone(),
            city: record.city.clone(),
            country: record.country.clone(),
            coordinates: record.coordinates(),
            distance: None,
            is_international: classify::is_international(record),
        }
    }
}

/// The location a proximity search was centered on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchLocation {
    pub name: String,
    pub coordinates: Coordinates,
}

/// Result of a proximity search. `airports` is sorted by ascending distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub airports: Vec<Airport>,
    pub search_location: SearchLocation,
}

/// A place returned by a [`crate::GeocodingClient`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub name: String,
    pub formatted_address: String,
    pub coordinates: Coordinates,
    pub types: Vec<String>,
}

/// Returns `"{name} ({iata}) - {city}, {country}"`
pub fn format_airport_display(airport: &Airport) -> String {
    format!(
        "{} ({}) - {}, {}",
        airport.name, airport.iata_code, airport.city, airport.country
    )
}

/// Returns [`format_airport_display`] followed by `" - {distance}km away"`
/// (rounded to the nearest km) when the distance is known.
pub fn format_airport_with_distance(airport: &Airport) -> String {
    let display = format_airport_display(airport);
    match airport.distance {
        Some(distance) => format!("{display} - {}km away", distance.round()),
        None => display,
    }
}
