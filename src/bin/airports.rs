use std::{error::Error, sync::Arc, time::Duration};

use clap::{Parser, Subcommand};
use simple_logger::SimpleLogger;

use airports::*;

const ABOUT: &'static str = r#"Resolves airports by IATA code, by proximity to a location, or by free text.
Airports are loaded from the OpenFlights dataset (cached to disk), or from an embedded list
of major airports when offline. If `google_api_key` is provided, Google's geocoding API is used
to locate places and to complement searches.
"#;

#[derive(Subcommand, Debug)]
enum Command {
    /// Prints the airport with a given IATA code
    Code { iata: String },
    /// Prints the airports near a location
    Near {
        /// The location (e.g. "New York")
        name: String,
        #[arg(long, allow_hyphen_values = true, requires = "lng")]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lng: Option<f64>,
        /// Maximum distance in km
        #[arg(long, default_value_t = DEFAULT_MAX_DISTANCE_KM)]
        max_distance: f64,
        #[arg(long, default_value_t = DEFAULT_MAX_RESULTS)]
        max_results: usize,
    },
    /// Prints the airports matching a free-text query
    Query { text: String },
    /// Exits with an error if the IATA code is not a known airport
    Validate { iata: String },
}

#[derive(Parser, Debug)]
#[command(author, version, about = ABOUT)]
struct Cli {
    #[command(subcommand)]
    command: Command,
    /// URL of the flat dataset of airports
    #[arg(long, default_value = DEFAULT_DATASET_URL)]
    dataset_url: String,
    /// URL of a proxy returning airports as JSON, tried before the dataset
    #[arg(long)]
    proxy_url: Option<String>,
    /// Where the downloaded dataset is cached
    #[arg(long, default_value = "database/airports.dat")]
    cache: String,
    /// Do not cache the downloaded dataset
    #[arg(long)]
    no_cache: bool,
    /// Only use the embedded list of major airports
    #[arg(long)]
    offline: bool,
    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,
    /// The key to Google's geocoding and places APIs
    #[arg(long, env = "GOOGLE_MAPS_API_KEY")]
    google_api_key: Option<String>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .unwrap();

    let cli = Cli::parse();

    let config = RepositoryConfig::default()
        .with_dataset_url(cli.dataset_url)
        .with_proxy_url(cli.proxy_url)
        .with_cache_path((!cli.no_cache).then_some(cli.cache))
        .with_request_timeout(Duration::from_secs(cli.timeout));
    let source = if cli.offline {
        DatasetSource::Embedded
    } else {
        DatasetSource::Remote
    };
    let repository = Arc::new(AirportRepository::new(source, config));

    let resolver = match cli.google_api_key {
        Some(api_key) => {
            let geocoder = GooglePlaces::new(
                GooglePlacesConfig::new(api_key).with_timeout(Duration::from_secs(cli.timeout)),
            )?;
            Resolver::new(repository, Arc::new(geocoder))
        }
        None => Resolver::without_geocoding(repository),
    };

    match cli.command {
        Command::Code { iata } => match resolver.get_airport_by_iata_code(&iata).await {
            Some(airport) => println!("{}", format_airport_display(&airport)),
            None => return Err(format!("{iata} is not a known airport").into()),
        },
        Command::Near {
            name,
            lat,
            lng,
            max_distance,
            max_results,
        } => {
            let coordinates = lat.zip(lng).map(|(lat, lng)| Coordinates::new(lat, lng));
            let result = resolver
                .search_airports_near_location(&name, coordinates, max_distance, max_results)
                .await?;
            println!(
                "Airports near {} ({:.4}, {:.4}):",
                result.search_location.name,
                result.search_location.coordinates.lat,
                result.search_location.coordinates.lng
            );
            for airport in result.airports {
                println!("{}", format_airport_with_distance(&airport));
            }
        }
        Command::Query { text } => {
            for airport in resolver.search_airports_by_query(&text).await {
                println!("{}", format_airport_display(&airport));
            }
        }
        Command::Validate { iata } => {
            if !resolver.validate_iata_code(&iata).await {
                return Err(format!("{iata} is not a valid IATA code").into());
            }
            println!("{iata} is valid");
        }
    }
    Ok(())
}
