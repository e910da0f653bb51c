/// Errors of this crate
#[derive(Debug)]
pub enum Error {
    /// The airport dataset could not be fetched or parsed from a source.
    /// Recovered by the loader, which moves to the next source.
    DatasetUnavailable(String),
    /// No coordinates could be resolved for the named location
    CoordinatesUnavailable(String),
    /// The geocoding provider is not configured or failed
    ExternalServiceUnavailable(String),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DatasetUnavailable(e) => write!(f, "airport dataset unavailable: {e}"),
            Self::CoordinatesUnavailable(location) => {
                write!(f, "could not resolve coordinates for {location}")
            }
            Self::ExternalServiceUnavailable(e) => {
                write!(f, "geocoding service unavailable: {e}")
            }
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::DatasetUnavailable(error.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Self::ExternalServiceUnavailable(error.to_string())
    }
}

impl From<reqwest_middleware::Error> for Error {
    fn from(error: reqwest_middleware::Error) -> Self {
        Self::ExternalServiceUnavailable(error.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::ExternalServiceUnavailable(error.to_string())
    }
}
