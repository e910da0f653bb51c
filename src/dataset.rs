//! Loading of the airport dataset: fetching it from the network (or a local cache),
//! parsing the flat `airports-extended.dat` format, and indexing it.
use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::fs::{self, BlobStorageProvider, CacheAction, LocalDisk};
use crate::text::normalize;
use crate::{http, Airport, Coordinates, Error, RepositoryConfig};

/// The OpenFlights dataset of airports, train stations and ferry terminals
pub static DEFAULT_DATASET_URL: &str =
    "https://raw.githubusercontent.com/jpatokal/openflights/master/data/airports-extended.dat";

// a minimal dataset of major airports, used when no other source is available
static FALLBACK: &str = include_str!("./fallback.dat");

const FIELDS: usize = 14;

/// A row of the airport dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub id: u32,
    pub name: String,
    pub city: String,
    pub country: String,
    /// 3-letter IATA code (e.g. `JFK`)
    pub iata: Option<String>,
    /// 4-letter ICAO code (e.g. `KJFK`)
    pub icao: Option<String>,
    pub lat: f64,
    pub lng: f64,
    /// in feet
    pub altitude: Option<f64>,
    /// hours offset from UTC
    pub timezone_offset: Option<f64>,
    pub dst: String,
    /// tz database name (e.g. `America/New_York`)
    pub tz: Option<String>,
    #[serde(rename = "type")]
    pub type_: String,
    pub source: String,
}

impl RawRecord {
    /// A record with only a name, used to classify free-text place names
    pub fn named(name: &str) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            city: String::new(),
            country: String::new(),
            iata: None,
            icao: None,
            lat: 0.0,
            lng: 0.0,
            altitude: None,
            timezone_offset: None,
            dst: String::new(),
            tz: None,
            type_: "airport".to_string(),
            source: String::new(),
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lng)
    }

    /// Whether this record is an airport with a valid IATA code and known coordinates
    pub fn is_valid(&self) -> bool {
        self.type_ == "airport"
            && self.iata.as_deref().is_some_and(is_iata_code)
            && self.lat != 0.0
            && self.lng != 0.0
    }
}

impl From<Airport> for RawRecord {
    fn from(airport: Airport) -> Self {
        Self {
            city: airport.city,
            country: airport.country,
            iata: (!airport.iata_code.is_empty()).then_some(airport.iata_code),
            lat: airport.coordinates.lat,
            lng: airport.coordinates.lng,
            source: "proxy".to_string(),
            ..Self::named(&airport.name)
        }
    }
}

/// Whether `code` is 3 uppercase ASCII letters
pub(crate) fn is_iata_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase())
}

fn optional(field: &str) -> Option<String> {
    (!field.is_empty() && field != "\\N").then(|| field.to_string())
}

fn optional_number(field: &str) -> Option<f64> {
    field.parse().ok()
}

fn to_record(row: &csv::StringRecord) -> Option<RawRecord> {
    if row.len() != FIELDS {
        return None;
    }
    Some(RawRecord {
        id: row[0].trim().parse().ok()?,
        name: row[1].to_string(),
        city: row[2].to_string(),
        country: row[3].to_string(),
        iata: optional(&row[4]),
        icao: optional(&row[5]),
        lat: row[6].trim().parse().ok()?,
        lng: row[7].trim().parse().ok()?,
        altitude: optional_number(&row[8]),
        timezone_offset: optional_number(&row[9]),
        dst: row[10].to_string(),
        tz: optional(&row[11]),
        type_: row[12].to_string(),
        source: row[13].to_string(),
    })
}

/// Parses a flat, comma-delimited dataset with 14 (optionally double-quoted) fields per line
/// and returns the valid airports ([`RawRecord::is_valid`]).
/// Malformed lines and non-airports are skipped.
pub fn parse(data: &str) -> Vec<RawRecord> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data.as_bytes());

    let mut skipped = 0;
    let records = rdr
        .records()
        .filter_map(|row| {
            let record = row.ok().as_ref().and_then(to_record);
            if record.is_none() {
                skipped += 1;
            }
            record
        })
        .filter(RawRecord::is_valid)
        .collect::<Vec<_>>();
    if skipped > 0 {
        log::debug!("{skipped} malformed lines skipped");
    }
    records
}

/// An immutable, indexed set of airports
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<RawRecord>,
    by_iata: HashMap<String, usize>,
    by_city: HashMap<String, Vec<usize>>,
}

impl Dataset {
    /// Indexes `records` by IATA code and by normalized city name.
    /// On duplicated IATA codes, the last record wins.
    pub fn new(records: Vec<RawRecord>) -> Self {
        let mut by_iata = HashMap::with_capacity(records.len());
        let mut by_city: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, record) in records.iter().enumerate() {
            if let Some(iata) = &record.iata {
                by_iata.insert(iata.clone(), i);
            }
            by_city.entry(normalize(&record.city)).or_default().push(i);
        }
        Self {
            records,
            by_iata,
            by_city,
        }
    }

    /// The dataset compiled into this crate (~a dozen major airports)
    pub fn embedded() -> Self {
        Self::new(parse(FALLBACK))
    }

    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the record with IATA `code` (exact match). `O(1)`.
    pub fn get(&self, code: &str) -> Option<&RawRecord> {
        self.by_iata.get(code).map(|i| &self.records[*i])
    }

    /// Returns the records whose city is `city` (compared after [`normalize`]).
    pub fn in_city(&self, city: &str) -> impl Iterator<Item = &RawRecord> {
        self.by_city
            .get(&normalize(city))
            .into_iter()
            .flatten()
            .map(|i| &self.records[*i])
    }
}

/// Where a repository gets its airports from
#[derive(Debug, Clone)]
pub enum DatasetSource {
    /// The proxy (when configured), then the dataset URL, then the embedded dataset
    Remote,
    /// The given flat dataset
    Static(Arc<str>),
    /// Only the embedded dataset
    Embedded,
}

async fn fetch_proxy(url: &str, config: &RepositoryConfig) -> Result<Vec<RawRecord>, Error> {
    let url = reqwest::Url::parse(url).map_err(|e| Error::DatasetUnavailable(e.to_string()))?;
    let data = download(config, url).await?;
    let airports: Vec<Airport> = serde_json::from_slice(&data)?;
    Ok(airports
        .into_iter()
        .map(RawRecord::from)
        .filter(RawRecord::is_valid)
        .collect())
}

async fn download(config: &RepositoryConfig, url: reqwest::Url) -> Result<Vec<u8>, Error> {
    let client = http::client(config.request_timeout, config.max_retries)?;
    http::get(&client, url).await
}

async fn fetch_dataset(config: &RepositoryConfig) -> Result<Vec<RawRecord>, Error> {
    let url = reqwest::Url::parse(&config.dataset_url)
        .map_err(|e| Error::DatasetUnavailable(e.to_string()))?;
    let Some(path) = &config.cache_path else {
        let data = download(config, url).await?;
        return Ok(parse(&String::from_utf8_lossy(&data)));
    };

    let data = fs::cached(
        path,
        download(config, url.clone()),
        &LocalDisk,
        config.cache_action,
    )
    .await?;
    let records = parse(&String::from_utf8_lossy(&data));
    if !records.is_empty() {
        return Ok(records);
    }

    log::warn!("{path} contains no airports - refetching");
    let data = download(config, url).await?;
    let records = parse(&String::from_utf8_lossy(&data));
    if !records.is_empty() && config.cache_action == CacheAction::ReadFetchWrite {
        LocalDisk.put(path, data).await?;
        log::info!("{path} - cache write");
    }
    Ok(records)
}

async fn load_remote(config: &RepositoryConfig) -> Dataset {
    if let Some(url) = &config.proxy_url {
        match fetch_proxy(url, config).await {
            Ok(records) if !records.is_empty() => {
                log::info!("{} airports loaded from proxy {url}", records.len());
                return Dataset::new(records);
            }
            Ok(_) => log::warn!("proxy {url} returned no airports"),
            Err(e) => log::warn!("proxy {url} unavailable: {e}"),
        }
    }

    match fetch_dataset(config).await {
        Ok(records) if !records.is_empty() => {
            log::info!(
                "{} airports loaded from {}",
                records.len(),
                config.dataset_url
            );
            return Dataset::new(records);
        }
        Ok(_) => log::warn!("{} contains no airports", config.dataset_url),
        Err(e) => log::warn!("{} unavailable: {e}", config.dataset_url),
    }

    log::warn!("using embedded airport dataset");
    Dataset::embedded()
}

/// Loads a [`Dataset`] from `source`. Never fails: when every network source
/// is unavailable, the embedded dataset is used.
pub(crate) async fn load(source: &DatasetSource, config: &RepositoryConfig) -> Dataset {
    match source {
        DatasetSource::Remote => load_remote(config).await,
        DatasetSource::Static(data) => {
            let dataset = Dataset::new(parse(data));
            log::info!("{} airports loaded", dataset.len());
            dataset
        }
        DatasetSource::Embedded => Dataset::embedded(),
    }
}
