use std::{sync::Arc, time::Duration};

use tokio::sync::OnceCell;

use crate::classify::is_military_base;
use crate::dataset::{self, is_iata_code};
use crate::fs::CacheAction;
use crate::text::normalize;
use crate::{
    distance, Airport, Coordinates, Dataset, DatasetSource, Error, RawRecord, SearchLocation,
    SearchResult, DEFAULT_DATASET_URL,
};

/// How many airports of each class a proximity search returns.
/// A class with fewer candidates is not backfilled from the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NearbyPolicy {
    pub international: usize,
    pub domestic: usize,
}

impl Default for NearbyPolicy {
    fn default() -> Self {
        Self {
            international: 3,
            domestic: 2,
        }
    }
}

/// Configuration of an [`AirportRepository`]
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// URL of the flat dataset
    pub dataset_url: String,
    /// URL of a proxy returning airports as JSON, tried before `dataset_url`
    pub proxy_url: Option<String>,
    /// Where the downloaded dataset is cached on disk. `None` disables caching.
    pub cache_path: Option<String>,
    pub cache_action: CacheAction,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub policy: NearbyPolicy,
    pub max_query_results: usize,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            dataset_url: DEFAULT_DATASET_URL.to_string(),
            proxy_url: None,
            cache_path: Some("database/airports.dat".to_string()),
            cache_action: CacheAction::ReadFetchWrite,
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            policy: NearbyPolicy::default(),
            max_query_results: 20,
        }
    }
}

impl RepositoryConfig {
    pub fn with_dataset_url(mut self, url: impl Into<String>) -> Self {
        self.dataset_url = url.into();
        self
    }

    pub fn with_proxy_url(mut self, url: Option<String>) -> Self {
        self.proxy_url = url;
        self
    }

    pub fn with_cache_path(mut self, path: Option<String>) -> Self {
        self.cache_path = path;
        self
    }

    pub fn with_cache_action(mut self, action: CacheAction) -> Self {
        self.cache_action = action;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_policy(mut self, policy: NearbyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_query_results(mut self, max_query_results: usize) -> Self {
        self.max_query_results = max_query_results;
        self
    }
}

/// Read-only query engine over a dataset of airports.
/// The dataset is loaded on first use, once, even when first used by concurrent callers.
#[derive(Debug)]
pub struct AirportRepository {
    source: DatasetSource,
    config: RepositoryConfig,
    dataset: OnceCell<Arc<Dataset>>,
    #[cfg(test)]
    loads: std::sync::atomic::AtomicUsize,
}

impl AirportRepository {
    pub fn new(source: DatasetSource, config: RepositoryConfig) -> Self {
        Self {
            source,
            config,
            dataset: OnceCell::new(),
            #[cfg(test)]
            loads: Default::default(),
        }
    }

    /// A repository over the flat dataset `data`
    pub fn from_static(data: impl Into<Arc<str>>) -> Self {
        Self::new(DatasetSource::Static(data.into()), RepositoryConfig::default())
    }

    /// A repository over the embedded dataset of major airports
    pub fn embedded() -> Self {
        Self::new(DatasetSource::Embedded, RepositoryConfig::default())
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Returns the dataset, loading it if this is the first call.
    pub async fn ensure_loaded(&self) -> &Arc<Dataset> {
        self.dataset
            .get_or_init(|| async {
                #[cfg(test)]
                self.loads.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Arc::new(dataset::load(&self.source, &self.config).await)
            })
            .await
    }

    /// Number of airports in the dataset
    pub async fn len(&self) -> usize {
        self.ensure_loaded().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.ensure_loaded().await.is_empty()
    }

    /// Returns the airport with IATA `code` (case-insensitive).
    pub async fn get_by_iata_code(&self, code: &str) -> Option<Airport> {
        let dataset = self.ensure_loaded().await;
        dataset
            .get(&code.trim().to_ascii_uppercase())
            .map(Airport::from)
    }

    /// Whether `code` is the IATA code of a known airport. Never fails.
    /// Unlike [`Self::get_by_iata_code`], surrounding whitespace makes `code` invalid.
    pub async fn validate_iata_code(&self, code: &str) -> bool {
        code.chars().count() == 3 && self.get_by_iata_code(code).await.is_some()
    }

    /// Returns the airports within `max_distance_km` of `location_name`, closest first:
    /// the closest [`NearbyPolicy::international`] international and
    /// [`NearbyPolicy::domestic`] domestic airports, at most `max_results` in total.
    /// When `coordinates` is `None`, the location is resolved by city name.
    /// # Error
    /// Errors with [`Error::CoordinatesUnavailable`] if `coordinates` is `None` and no airport's
    /// city matches `location_name`.
    pub async fn search_near_location(
        &self,
        location_name: &str,
        coordinates: Option<Coordinates>,
        max_distance_km: f64,
        max_results: usize,
    ) -> Result<SearchResult, Error> {
        let dataset = self.ensure_loaded().await;
        let coordinates = coordinates
            .or_else(|| {
                dataset
                    .in_city(location_name)
                    .next()
                    .map(|record| record.coordinates())
            })
            .ok_or_else(|| Error::CoordinatesUnavailable(location_name.to_string()))?;

        Ok(SearchResult {
            airports: near(
                dataset,
                coordinates,
                max_distance_km,
                max_results,
                self.config.policy,
            ),
            search_location: SearchLocation {
                name: location_name.to_string(),
                coordinates,
            },
        })
    }

    /// Returns up to [`RepositoryConfig::max_query_results`] airports matching `query`,
    /// best match first.
    pub async fn search_by_query(&self, query: &str) -> Vec<Airport> {
        let dataset = self.ensure_loaded().await;
        by_query(dataset, query, self.config.max_query_results)
    }
}

pub(crate) fn sort_by_distance(airports: &mut [Airport]) {
    airports.sort_by(|a, b| {
        a.distance
            .unwrap_or(0.0)
            .total_cmp(&b.distance.unwrap_or(0.0))
    });
}

fn near(
    dataset: &Dataset,
    center: Coordinates,
    max_distance_km: f64,
    max_results: usize,
    policy: NearbyPolicy,
) -> Vec<Airport> {
    let (mut international, mut domestic): (Vec<_>, Vec<_>) = dataset
        .records()
        .iter()
        .filter(|record| record.iata.is_some() && !is_military_base(&record.name))
        .filter_map(|record| {
            let distance = distance(center, record.coordinates());
            (distance <= max_distance_km).then(|| Airport {
                distance: Some(distance),
                ..Airport::from(record)
            })
        })
        .partition(|airport| airport.is_international);

    sort_by_distance(&mut international);
    international.truncate(policy.international);
    sort_by_distance(&mut domestic);
    domestic.truncate(policy.domestic);

    let mut airports = international;
    airports.extend(domestic);
    sort_by_distance(&mut airports);
    airports.truncate(max_results);
    airports
}

fn score(record: &RawRecord, query: &str, code: &str, words: &[&str]) -> u32 {
    let name = normalize(&record.name);
    let city = normalize(&record.city);
    let country = normalize(&record.country);

    let mut score = 0;
    if record.iata.as_deref() == Some(code) {
        score += 100;
    }
    if name.contains(query) {
        score += 50;
    }
    if city.contains(query) {
        score += 30;
    }
    if country.contains(query) {
        score += 10;
    }
    for word in words {
        if name.contains(word) {
            score += 5;
        }
        if city.contains(word) {
            score += 3;
        }
        if country.contains(word) {
            score += 1;
        }
    }
    score
}

fn by_query(dataset: &Dataset, query: &str, max_results: usize) -> Vec<Airport> {
    let normalized = normalize(query);
    if normalized.is_empty() {
        return vec![];
    }
    let code = query.trim().to_ascii_uppercase();
    let code = if is_iata_code(&code) { code } else { String::new() };
    let words = normalized
        .split(' ')
        .filter(|word| word.chars().count() > 2)
        .collect::<Vec<_>>();

    let mut scored = dataset
        .records()
        .iter()
        .filter(|record| !is_military_base(&record.name))
        .filter_map(|record| {
            let score = score(record, &normalized, &code, &words);
            (score > 0).then_some((score, record))
        })
        .collect::<Vec<_>>();
    // stable: ties keep the dataset's order
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    scored
        .into_iter()
        .take(max_results)
        .map(|(_, record)| Airport::from(record))
        .collect()
}
