use std::{collections::HashSet, error::Error, sync::Arc};

use airports::{
    distance, format_airport_with_distance, Airport, AirportRepository, Coordinates, Resolver,
    DEFAULT_MAX_DISTANCE_KM, DEFAULT_MAX_RESULTS,
};

static AIRPORTS: &str = include_str!("airports.dat");

const NEW_YORK: Coordinates = Coordinates {
    lat: 40.7128,
    lng: -74.0060,
};
const LOS_ANGELES: Coordinates = Coordinates {
    lat: 34.0522,
    lng: -118.2437,
};

fn resolver() -> Resolver {
    Resolver::without_geocoding(Arc::new(AirportRepository::from_static(AIRPORTS)))
}

fn codes(airports: &[Airport]) -> Vec<&str> {
    airports.iter().map(|a| a.iata_code.as_str()).collect()
}

#[tokio::test]
async fn dataset_drops_invalid_rows() {
    let repository = AirportRepository::from_static(AIRPORTS);
    // 26 lines, of which a heliport, a station, a bad latitude, null coordinates and junk
    assert_eq!(repository.len().await, 21);
}

#[tokio::test]
async fn jfk() -> Result<(), Box<dyn Error>> {
    let airport = resolver()
        .get_airport_by_iata_code("JFK")
        .await
        .ok_or("JFK not found")?;
    assert_eq!(airport.city, "New York");
    assert!(airport.country.contains("United States"));
    assert!(airport.is_international);
    assert_eq!(airport.distance, None);
    Ok(())
}

/// every code in the dataset is found, case-insensitively
#[tokio::test]
async fn lookup_every_code() {
    let resolver = resolver();
    let dataset = resolver.repository().ensure_loaded().await.clone();
    for record in dataset.records() {
        let code = record.iata.as_deref().unwrap();
        let airport = resolver
            .get_airport_by_iata_code(&code.to_ascii_lowercase())
            .await
            .unwrap();
        assert_eq!(airport.iata_code, code);
        assert!(resolver.validate_iata_code(code).await);
    }
    assert!(resolver.get_airport_by_iata_code("QQQ").await.is_none());
}

#[tokio::test]
async fn validate() {
    let resolver = resolver();
    let invalid = [
        "",
        "J",
        "JF",
        "JFKK",
        "John F Kennedy",
        "QQQ",
        "ZYP",
        "JRB",
        " JFK ",
        "JFK\n",
        " JFK",
    ];
    for code in invalid {
        assert!(!resolver.validate_iata_code(code).await, "{code}");
    }
    assert!(resolver.validate_iata_code("lga").await);
}

#[tokio::test]
async fn near_new_york() -> Result<(), Box<dyn Error>> {
    let result = resolver()
        .search_airports_near_location("New York", Some(NEW_YORK), 50.0, DEFAULT_MAX_RESULTS)
        .await?;
    let found = codes(&result.airports);
    assert_eq!(found, vec!["LGA", "EWR", "TEB", "JFK", "HPN"]);
    assert!(result
        .airports
        .iter()
        .all(|a| a.distance.unwrap() <= 50.0));
    assert!(result
        .airports
        .windows(2)
        .all(|w| w[0].distance <= w[1].distance));
    assert_eq!(result.search_location.coordinates, NEW_YORK);
    Ok(())
}

/// without coordinates, the location is resolved from the cities of the dataset
#[tokio::test]
async fn near_city_name() -> Result<(), Box<dyn Error>> {
    let result = resolver()
        .search_airports_near_location("new york", None, 30.0, DEFAULT_MAX_RESULTS)
        .await?;
    // centered on JFK, the first airport of New York
    assert_eq!(result.airports[0].iata_code, "JFK");
    assert_eq!(result.airports[0].distance, Some(0.0));
    Ok(())
}

/// at most 3 international and 2 domestic airports, not backfilled
#[tokio::test]
async fn near_los_angeles() -> Result<(), Box<dyn Error>> {
    let result = resolver()
        .search_airports_near_location(
            "Los Angeles",
            Some(LOS_ANGELES),
            DEFAULT_MAX_DISTANCE_KM,
            DEFAULT_MAX_RESULTS,
        )
        .await?;
    assert_eq!(result.airports.len(), 5);
    let international = result
        .airports
        .iter()
        .filter(|a| a.is_international)
        .map(|a| a.iata_code.as_str())
        .collect::<HashSet<_>>();
    let domestic = result
        .airports
        .iter()
        .filter(|a| !a.is_international)
        .map(|a| a.iata_code.as_str())
        .collect::<HashSet<_>>();
    assert_eq!(international, HashSet::from(["LAX", "ONT", "PSP"]));
    assert_eq!(domestic, HashSet::from(["BUR", "LGB"]));
    // Edwards is a military base
    assert!(!codes(&result.airports).contains(&"EDW"));

    let result = resolver()
        .search_airports_near_location("Los Angeles", Some(LOS_ANGELES), 25.0, 5)
        .await?;
    assert_eq!(codes(&result.airports), vec!["LAX", "BUR"]);
    Ok(())
}

#[tokio::test]
async fn near_unknown() {
    let result = resolver()
        .search_airports_near_location("Atlantis", None, 200.0, 5)
        .await;
    let error = result.unwrap_err();
    assert!(error.to_string().contains("Atlantis"));
}

#[tokio::test]
async fn query_los_angeles() {
    let result = resolver().search_airports_by_query("Los Angeles").await;
    assert_eq!(result[0].iata_code, "LAX");
}

#[tokio::test]
async fn query_exact_code_ranks_first() {
    let resolver = resolver();
    for code in ["LGA", "lgb", "CDG"] {
        let result = resolver.search_airports_by_query(code).await;
        assert_eq!(result[0].iata_code, code.to_ascii_uppercase());
    }
}

#[tokio::test]
async fn query_folds_diacritics() {
    let resolver = resolver();
    assert_eq!(
        codes(&resolver.search_airports_by_query("malaga").await),
        vec!["AGP"]
    );
    assert_eq!(
        codes(&resolver.search_airports_by_query("Sao Paulo").await),
        vec!["GRU"]
    );
}

#[tokio::test]
async fn query_excludes_military_bases() {
    let resolver = resolver();
    assert!(resolver.search_airports_by_query("Edwards").await.is_empty());
    assert!(resolver.search_airports_by_query("WRI").await.is_empty());
}

#[tokio::test]
async fn query_country() {
    let result = resolver().search_airports_by_query("United Kingdom").await;
    // "united" also matches the United States, with a lower score
    assert_eq!(
        codes(&result[..2]).into_iter().collect::<HashSet<_>>(),
        HashSet::from(["LHR", "LGW"])
    );
    assert!(result[2..].iter().all(|a| a.country == "United States"));
}

#[test]
fn distance_properties() {
    let points = [NEW_YORK, LOS_ANGELES, Coordinates::new(-33.9, 151.2)];
    for a in points {
        assert_eq!(distance(a, a), 0.0);
        for b in points {
            assert!((distance(a, b) - distance(b, a)).abs() < 1e-9);
            assert!(distance(a, b) >= 0.0);
        }
    }
}

#[tokio::test]
async fn formatting() {
    let result = resolver()
        .search_airports_near_location("New York", Some(NEW_YORK), 15.0, 5)
        .await
        .unwrap();
    assert_eq!(
        format_airport_with_distance(&result.airports[0]),
        "La Guardia Airport (LGA) - New York, United States - 13km away"
    );
}

#[tokio::test]
async fn embedded_dataset() {
    let resolver = Resolver::without_geocoding(Arc::new(AirportRepository::embedded()));
    let result = resolver
        .search_airports_near_location("New York", Some(NEW_YORK), 50.0, 5)
        .await
        .unwrap();
    assert_eq!(codes(&result.airports), vec!["LGA", "JFK"]);
    assert_eq!(resolver.search_airports_by_query("Los Angeles").await[0].iata_code, "LAX");
}
