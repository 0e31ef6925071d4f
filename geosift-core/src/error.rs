//! Error types for geosift-core.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for geosift operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Latitude or longitude outside the valid range.
    #[error("invalid coordinate: ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    /// Search or merge radius must be a positive, finite number.
    #[error("invalid radius: {0} km")]
    InvalidRadius(f64),

    /// Criteria specify neither a center coordinate nor an address.
    #[error("search criteria need a center coordinate or an address")]
    MissingCenter,

    /// Date range with `from` after `to`.
    #[error("invalid date range: {from} is after {to}")]
    InvalidDateRange {
        from: chrono::NaiveDate,
        to: chrono::NaiveDate,
    },

    /// A record is missing required GPS data or failed validation.
    #[error("GPS data error: {0}")]
    GpsData(String),

    /// I/O failure reading a file or persisting state.
    #[error("file operation error: {0}")]
    FileOperation(String),

    /// Address resolution or reverse geocoding failed.
    #[error("geocoding error: {0}")]
    Geocoding(#[from] GeocodingError),
}

/// Errors from the geocoder boundary.
#[derive(Error, Debug)]
pub enum GeocodingError {
    /// The service returned no match for the query.
    #[error("no location found for {0:?}")]
    NoMatch(String),

    /// Network or service failure.
    #[error("geocoder service error: {0}")]
    Service(String),

    /// The request exceeded the bounded timeout.
    #[error("geocoder timed out after {0} s")]
    Timeout(u64),

    /// Retries exhausted without a successful response.
    #[error("geocoder gave up after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}
