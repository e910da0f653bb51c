use std::{
    collections::HashSet,
    sync::{Arc, LazyLock},
};

use regex::Regex;

use crate::classify::classify_name;
use crate::repository::sort_by_distance;
use crate::{
    distance, Airport, AirportRepository, Coordinates, Error, GeocodingClient, NoGeocoding,
    PlaceRecord, SearchLocation, SearchResult,
};

/// Below this number of results, a query is complemented by the geocoder
const MIN_QUERY_RESULTS: usize = 5;

static IATA_IN_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([A-Z]{3})\)").expect("a valid regex"));

/// Converts a place from the geocoder into an [`Airport`].
/// The IATA code is taken from the name (e.g. `"Heathrow (LHR)"`), the city from the first
/// and the country from the last segment of the address.
pub fn place_to_airport(place: &PlaceRecord) -> Airport {
    let iata_code = IATA_IN_NAME
        .captures(&place.name)
        .map(|captures| captures[1].to_string())
        .unwrap_or_default();
    let mut segments = place.formatted_address.split(',').map(str::trim);
    let city = segments.next().unwrap_or_default().to_string();
    let country = segments
        .next_back()
        .map(str::to_string)
        .unwrap_or_else(|| city.clone());

    Airport {
        iata_code,
        name: place.name.clone(),
        city,
        country,
        coordinates: place.coordinates,
        distance: None,
        is_international: classify_name(&place.name),
    }
}

/// Answers airport queries from an [`AirportRepository`], complemented by a
/// [`GeocodingClient`] when the repository cannot answer.
#[derive(Clone)]
pub struct Resolver {
    repository: Arc<AirportRepository>,
    geocoder: Arc<dyn GeocodingClient>,
}

impl Resolver {
    pub fn new(repository: Arc<AirportRepository>, geocoder: Arc<dyn GeocodingClient>) -> Self {
        Self {
            repository,
            geocoder,
        }
    }

    /// A [`Resolver`] that only uses `repository`
    pub fn without_geocoding(repository: Arc<AirportRepository>) -> Self {
        Self::new(repository, Arc::new(NoGeocoding))
    }

    pub fn repository(&self) -> &AirportRepository {
        &self.repository
    }

    /// Returns the airport with IATA `code`. Only the repository is used for this.
    pub async fn get_airport_by_iata_code(&self, code: &str) -> Option<Airport> {
        self.repository.get_by_iata_code(code).await
    }

    /// Whether `code` is the IATA code of a known airport. Never fails.
    pub async fn validate_iata_code(&self, code: &str) -> bool {
        self.repository.validate_iata_code(code).await
    }

    async fn places(&self, query: &str, near: Option<Coordinates>) -> Vec<Airport> {
        if !self.geocoder.is_configured() {
            return vec![];
        }
        match self.geocoder.search_places(query, near).await {
            Ok(places) => places.iter().map(place_to_airport).collect(),
            Err(e) => {
                log::warn!("search_places({query}) failed: {e}");
                vec![]
            }
        }
    }

    /// Returns the airports near `location_name`, closest first. See [`AirportRepository::search_near_location`].
    ///
    /// When `coordinates` is `None`, they are first resolved by the geocoder.
    /// When the repository finds no airport, places named "{location_name} airports" are
    /// searched with the geocoder instead.
    /// # Error
    /// Errors with [`Error::CoordinatesUnavailable`] when neither the repository nor
    /// the geocoder can locate `location_name`.
    pub async fn search_airports_near_location(
        &self,
        location_name: &str,
        coordinates: Option<Coordinates>,
        max_distance_km: f64,
        max_results: usize,
    ) -> Result<SearchResult, Error> {
        let coordinates = match coordinates {
            Some(coordinates) => Some(coordinates),
            None if self.geocoder.is_configured() => self
                .geocoder
                .resolve_coordinates(location_name)
                .await
                .unwrap_or_else(|e| {
                    log::warn!("resolve_coordinates({location_name}) failed: {e}");
                    None
                }),
            None => None,
        };

        let primary = self
            .repository
            .search_near_location(location_name, coordinates, max_distance_km, max_results)
            .await;
        let primary = match primary {
            Ok(result) if !result.airports.is_empty() => return Ok(result),
            Ok(result) => {
                log::debug!("no airports near {location_name} in the dataset");
                Ok(result)
            }
            Err(e) => {
                log::debug!("{e}");
                Err(e)
            }
        };

        let mut airports = self
            .places(&format!("{location_name} airports"), coordinates)
            .await;
        if let Some(center) = coordinates {
            for airport in airports.iter_mut() {
                airport.distance = Some(distance(center, airport.coordinates));
            }
            // the geocoder's radius is a bias, not a bound
            airports.retain(|a| a.distance.is_some_and(|d| d <= max_distance_km));
            sort_by_distance(&mut airports);
        }
        airports.truncate(max_results);

        let center = coordinates.or_else(|| airports.first().map(|a| a.coordinates));
        match (primary, center) {
            (_, Some(center)) if !airports.is_empty() => Ok(SearchResult {
                airports,
                search_location: SearchLocation {
                    name: location_name.to_string(),
                    coordinates: center,
                },
            }),
            (Ok(result), _) => Ok(result),
            (Err(_), _) => Err(Error::CoordinatesUnavailable(location_name.to_string())),
        }
    }

    /// Returns airports matching `query`, best match first. When the repository has few matches,
    /// places from the geocoder whose IATA code is not yet present are appended.
    pub async fn search_airports_by_query(&self, query: &str) -> Vec<Airport> {
        let mut airports = self.repository.search_by_query(query).await;
        if airports.len() >= MIN_QUERY_RESULTS || !self.geocoder.is_configured() {
            return airports;
        }

        let external = self.places(query, None).await;
        let mut seen = airports
            .iter()
            .map(|a| a.iata_code.clone())
            .collect::<HashSet<_>>();
        airports.extend(
            external
                .into_iter()
                .filter(|airport| seen.insert(airport.iata_code.clone())),
        );
        airports.truncate(self.repository.config().max_query_results);
        airports
    }
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    fn place(name: &str, address: &str, lat: f64, lng: f64) -> PlaceRecord {
        PlaceRecord {
            name: name.to_string(),
            formatted_address: address.to_string(),
            coordinates: Coordinates::new(lat, lng),
            types: vec!["airport".to_string()],
        }
    }

    #[derive(Default)]
    struct Scripted {
        coordinates: Option<Coordinates>,
        places: Vec<PlaceRecord>,
        fail: bool,
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl GeocodingClient for Scripted {
        async fn resolve_coordinates(&self, location: &str) -> Result<Option<Coordinates>, Error> {
            self.queries.lock().unwrap().push(location.to_string());
            if self.fail {
                return Err(Error::ExternalServiceUnavailable("down".to_string()));
            }
            Ok(self.coordinates)
        }

        async fn search_places(
            &self,
            query: &str,
            _: Option<Coordinates>,
        ) -> Result<Vec<PlaceRecord>, Error> {
            self.queries.lock().unwrap().push(query.to_string());
            if self.fail {
                return Err(Error::ExternalServiceUnavailable("down".to_string()));
            }
            Ok(self.places.clone())
        }
    }

    fn resolver(geocoder: Scripted) -> (Resolver, Arc<Scripted>) {
        let geocoder = Arc::new(geocoder);
        let repository = Arc::new(AirportRepository::embedded());
        (Resolver::new(repository, geocoder.clone()), geocoder)
    }

    #[test]
    fn place_conversion() {
        let airport = place_to_airport(&place(
            "Heathrow International Airport (LHR)",
            "London, Hounslow TW6, United Kingdom",
            51.47,
            -0.45,
        ));
        assert_eq!(airport.iata_code, "LHR");
        assert_eq!(airport.city, "London");
        assert_eq!(airport.country, "United Kingdom");
        assert!(airport.is_international);

        let airport = place_to_airport(&place(
            "Van Nuys Municipal Airport (VNY)",
            "Van Nuys, CA 91406, USA",
            34.21,
            -118.49,
        ));
        assert_eq!(airport.iata_code, "VNY");
        assert_eq!(airport.country, "USA");
        assert!(!airport.is_international);

        let airport = place_to_airport(&place("Recife International Airport", "Recife", 0.0, 0.0));
        assert_eq!(airport.iata_code, "");
        assert_eq!(airport.city, "Recife");
        assert_eq!(airport.country, "Recife");
        assert!(airport.is_international);
    }

    #[tokio::test]
    async fn geocoder_resolves_coordinates() {
        let (resolver, geocoder) = resolver(Scripted {
            coordinates: Some(Coordinates::new(40.7128, -74.0060)),
            ..Default::default()
        });
        let result = resolver
            .search_airports_near_location("Big Apple", None, 50.0, 5)
            .await
            .unwrap();
        let codes = result
            .airports
            .iter()
            .map(|a| a.iata_code.as_str())
            .collect::<Vec<_>>();
        assert_eq!(codes, vec!["LGA", "JFK"]);
        assert_eq!(*geocoder.queries.lock().unwrap(), vec!["Big Apple"]);
    }

    #[tokio::test]
    async fn falls_back_to_places() {
        let (resolver, geocoder) = resolver(Scripted {
            coordinates: Some(Coordinates::new(-8.05, -34.9)),
            places: vec![
                place("Far Airport (FAR)", "Far, Brazil", -8.5, -34.9),
                place(
                    "Recife International Airport (REC)",
                    "Recife, PE, Brazil",
                    -8.126,
                    -34.923,
                ),
            ],
            ..Default::default()
        });
        let result = resolver
            .search_airports_near_location("Recife", None, 200.0, 5)
            .await
            .unwrap();
        assert_eq!(result.airports[0].iata_code, "REC");
        assert_eq!(result.airports[0].country, "Brazil");
        assert!(result.airports[0].distance.unwrap() < 10.0);
        assert_eq!(result.airports[1].iata_code, "FAR");
        assert_eq!(
            *geocoder.queries.lock().unwrap(),
            vec!["Recife", "Recife airports"]
        );
    }

    #[tokio::test]
    async fn places_beyond_max_distance_are_dropped() {
        let (resolver, _) = resolver(Scripted {
            places: vec![
                place("Distant Airport (DST)", "Distant, Pacific", 10.0, -140.0),
                place("Close Airport (CLS)", "Close, Pacific", 0.2, -140.0),
            ],
            ..Default::default()
        });
        // middle of the Pacific: nothing in the dataset
        let result = resolver
            .search_airports_near_location("Nowhere", Some(Coordinates::new(0.0, -140.0)), 50.0, 5)
            .await
            .unwrap();
        assert_eq!(result.airports.len(), 1);
        assert_eq!(result.airports[0].iata_code, "CLS");
        assert!(result.airports[0].distance.unwrap() <= 50.0);

        let result = resolver
            .search_airports_near_location("Nowhere", Some(Coordinates::new(0.0, -140.0)), 10.0, 5)
            .await
            .unwrap();
        assert!(result.airports.is_empty());
    }

    #[tokio::test]
    async fn no_coordinates_anywhere() {
        let (resolver, _) = resolver(Scripted::default());
        let result = resolver
            .search_airports_near_location("Atlantis", None, 200.0, 5)
            .await;
        assert!(matches!(result, Err(Error::CoordinatesUnavailable(name)) if name == "Atlantis"));
    }

    #[tokio::test]
    async fn failing_geocoder_is_not_fatal() {
        let (resolver, _) = resolver(Scripted {
            fail: true,
            ..Default::default()
        });
        // the repository resolves the city by itself
        let result = resolver
            .search_airports_near_location("London", None, 50.0, 5)
            .await
            .unwrap();
        assert_eq!(result.airports[0].iata_code, "LHR");

        let result = resolver
            .search_airports_near_location("Atlantis", None, 200.0, 5)
            .await;
        assert!(matches!(result, Err(Error::CoordinatesUnavailable(_))));

        assert_eq!(resolver.search_airports_by_query("LHR").await.len(), 1);
    }

    #[tokio::test]
    async fn empty_result_without_geocoder() {
        let resolver = Resolver::without_geocoding(Arc::new(AirportRepository::embedded()));
        // middle of the Pacific
        let result = resolver
            .search_airports_near_location("Nowhere", Some(Coordinates::new(0.0, -140.0)), 200.0, 5)
            .await
            .unwrap();
        assert!(result.airports.is_empty());
    }

    #[tokio::test]
    async fn query_is_complemented_and_deduplicated() {
        let (resolver, _) = resolver(Scripted {
            places: vec![
                place("Heathrow Airport (LHR)", "London, United Kingdom", 51.47, -0.45),
                place("London City Airport (LCY)", "London, United Kingdom", 51.50, 0.05),
                place("Some Airstrip", "London, United Kingdom", 51.6, 0.1),
                place("Another Airstrip", "London, United Kingdom", 51.7, 0.2),
            ],
            ..Default::default()
        });
        let result = resolver.search_airports_by_query("London").await;
        let codes = result
            .iter()
            .map(|a| a.iata_code.as_str())
            .collect::<Vec<_>>();
        // LHR from the dataset first, a single place without code
        assert_eq!(codes, vec!["LHR", "LCY", ""]);
        assert_eq!(result[0].name, "London Heathrow Airport");
    }

    #[tokio::test]
    async fn query_with_enough_results_skips_geocoder() {
        let (resolver, geocoder) = resolver(Scripted::default());
        // every embedded airport is an "airport"
        let result = resolver.search_airports_by_query("airport").await;
        assert!(result.len() >= MIN_QUERY_RESULTS);
        assert!(geocoder.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn iata_lookup_never_uses_geocoder() {
        let (resolver, geocoder) = resolver(Scripted::default());
        assert_eq!(
            resolver.get_airport_by_iata_code("lax").await.unwrap().city,
            "Los Angeles"
        );
        assert!(resolver.get_airport_by_iata_code("XXX").await.is_none());
        assert!(resolver.validate_iata_code("JFK").await);
        assert!(!resolver.validate_iata_code("JFKX").await);
        assert!(geocoder.queries.lock().unwrap().is_empty());
    }
}
