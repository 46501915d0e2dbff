/// Error types shared across the client
///
/// Each layer has its own enum so callers can match on what actually failed:
/// - `StorageError` for the SQLite-backed stores
/// - `ApiError` for the HTTP story API (see `remote::messages` for the user-facing text)
/// - `LocationError` for place-name resolution
/// - `PhotoError` for preparing an upload
///
/// `ClientError` wraps all of them for the aggregators and the binary.

use thiserror::Error;

/// Failures from the local database (favorites, preferences, session)
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("could not prepare data directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not determine a data directory for the database")]
    NoDataDir,

    #[error("database lock poisoned")]
    Poisoned,
}

/// Failures talking to the story API
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request never got a response (DNS, refused, TLS, timeout)
    #[error("connection failed: {0}")]
    Connection(String),

    /// Server answered with a non-success status
    #[error("HTTP {status}")]
    Status { status: u16, message: Option<String> },

    /// Server answered 2xx with `error: true` in the body
    #[error("{0}")]
    Rejected(String),

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("could not build request: {0}")]
    Request(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            ApiError::Status {
                status: status.as_u16(),
                message: None,
            }
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if err.is_builder() {
            ApiError::Request(err.to_string())
        } else {
            ApiError::Connection(err.to_string())
        }
    }
}

/// Failures turning coordinates into a place name
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LocationError {
    #[error("coordinates out of range: {lat},{lon}")]
    OutOfBounds { lat: f64, lon: f64 },

    #[error("no place found for {0}")]
    NotFound(String),

    #[error("geocoder unavailable: {0}")]
    Geocoder(String),

    #[error("current location unavailable")]
    Unavailable,
}

/// Failures preparing a photo for upload
#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("could not read photo: {0}")]
    Read(#[from] std::io::Error),

    #[error("invalid image: {0}")]
    Decode(String),

    #[error("could not encode JPEG: {0}")]
    Encode(String),

    #[error("photo task failed: {0}")]
    Join(String),
}

/// Top-level error used by the aggregators and the binary
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error(transparent)]
    Photo(#[from] PhotoError),

    #[error("{0}")]
    Validation(String),

    #[error("Session not found")]
    NoSession,
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
