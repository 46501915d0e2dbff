/// Configuration for the client
///
/// Loads configuration from environment variables (and a `.env` file, if
/// present) with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::error::StorageError;
use crate::feed::DEFAULT_PAGE_SIZE;
use crate::state::Database;

pub const DEFAULT_BASE_URL: &str = "https://story-api.dicoding.dev/v1/";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Story API root, e.g. https://story-api.dicoding.dev/v1/
    pub base_url: String,
    /// SQLite file for favorites and preferences
    pub db_path: PathBuf,
    /// Where compressed uploads are written before sending
    pub cache_dir: PathBuf,
    pub page_size: u32,
    pub http_timeout: Duration,
}

impl Config {
    /// Load configuration from `.env` and environment variables
    pub fn from_env() -> Result<Self, StorageError> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup (the environment, or a map in tests)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StorageError> {
        let db_path = match lookup("STORY_DB_PATH") {
            Some(path) => PathBuf::from(path),
            None => Database::default_path()?,
        };

        let cache_dir = match lookup("STORY_CACHE_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => default_cache_dir()?,
        };

        Ok(Config {
            base_url: lookup("STORY_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            db_path,
            cache_dir,
            page_size: parse_or("STORY_PAGE_SIZE", lookup("STORY_PAGE_SIZE"), DEFAULT_PAGE_SIZE),
            http_timeout: Duration::from_secs(parse_or(
                "STORY_HTTP_TIMEOUT_SECS",
                lookup("STORY_HTTP_TIMEOUT_SECS"),
                DEFAULT_TIMEOUT_SECS,
            )),
        })
    }
}

/// ~/.cache/story-client on Linux
fn default_cache_dir() -> Result<PathBuf, StorageError> {
    let mut path = dirs::cache_dir()
        .or_else(dirs::home_dir)
        .ok_or(StorageError::NoDataDir)?;
    path.push("story-client");
    Ok(path)
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> T
where
    T: std::str::FromStr + Copy + PartialOrd + From<u8>,
{
    match value {
        None => default,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(parsed) if parsed > T::from(0) => parsed,
            _ => {
                warn!(key, value = %raw, "Invalid value, using default");
                default
            }
        },
    }
}
