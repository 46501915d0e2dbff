//! The story API as a trait
//!
//! Everything above the transport (paginator, aggregators, notifier) talks to
//! `dyn StoryApi`, so tests can swap in an in-memory fake.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::model::{ApiMessage, LoginRequest, RegisterRequest, Session, Story};

/// Query for one page of `GET stories`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoryQuery {
    /// 1-based page number
    pub page: u32,
    pub size: u32,
    /// Only return geo-tagged stories (`location=1`)
    pub with_location: bool,
}

impl StoryQuery {
    pub fn page(page: u32, size: u32) -> Self {
        Self {
            page,
            size,
            with_location: false,
        }
    }

    pub fn with_location(mut self, with_location: bool) -> Self {
        self.with_location = with_location;
        self
    }
}

/// A prepared story upload. The photo is already compressed JPEG bytes.
#[derive(Clone)]
pub struct StoryUpload {
    pub description: String,
    pub photo: Vec<u8>,
    pub file_name: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl std::fmt::Debug for StoryUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoryUpload")
            .field("description", &self.description)
            .field("photo_bytes", &self.photo.len())
            .field("file_name", &self.file_name)
            .field("lat", &self.lat)
            .field("lon", &self.lon)
            .finish()
    }
}

#[async_trait]
pub trait StoryApi: Send + Sync {
    async fn register(&self, request: &RegisterRequest) -> Result<ApiMessage, ApiError>;

    /// Returns the session carried by a successful login
    async fn login(&self, request: &LoginRequest) -> Result<Session, ApiError>;

    async fn list_stories(&self, query: StoryQuery) -> Result<Vec<Story>, ApiError>;

    async fn story_detail(&self, id: &str) -> Result<Story, ApiError>;

    async fn add_story(&self, upload: StoryUpload) -> Result<ApiMessage, ApiError>;
}
