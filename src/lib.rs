#[forbid(unsafe_code)]
mod classify;
mod dataset;
mod error;
pub(crate) mod fs;
mod geocoding;
mod http;
mod model;
mod repository;
mod resolver;
pub mod text;

pub use classify::{classify_name, is_international, is_military_base};
pub use dataset::{parse, Dataset, DatasetSource, RawRecord, DEFAULT_DATASET_URL};
pub use error::Error;
pub use fs::{BlobStorageProvider, CacheAction, LocalDisk};
pub use geocoding::*;
pub use model::*;
pub use repository::*;
pub use resolver::*;

/// Default radius of a proximity search, in km
pub const DEFAULT_MAX_DISTANCE_KM: f64 = 200.0;
/// Default number of airports returned by a proximity search
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Returns the great-circle distance between two geo-points in km
/// (haversine formula on a sphere of radius 6371 km).
pub fn distance(from: Coordinates, to: Coordinates) -> f64 {
    let from = geoutils::Location::new(from.lat, from.lng);
    let to = geoutils::Location::new(to.lat, to.lng);
    from.haversine_distance_to(&to).meters() / 1000.0
}
