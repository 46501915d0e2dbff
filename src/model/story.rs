/// Stories and everything derived from them
///
/// `Story` mirrors the server payload exactly (camelCase JSON). `FavoriteRecord`
/// is the denormalized local copy kept in the favorites table, and `StoryItem`
/// is what the view layer renders: a story plus its resolved place name.

use serde::{Deserialize, Serialize};

/// A story as returned by the API. Never mutated after it is fetched.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    /// Server-assigned, globally unique id (e.g. "story-FvU4u0Vp2S3PMsFg")
    pub id: String,
    /// Author display name
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    /// ISO-8601 UTC timestamp, kept as the server formatted it
    pub created_at: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

impl Story {
    /// Both coordinates, if the story is geo-tagged
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// Plain `{error, message}` envelope (register, add story)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ApiMessage {
    pub error: bool,
    pub message: String,
}

/// `GET stories` response body
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StoryListResponse {
    pub error: bool,
    pub message: String,
    #[serde(default)]
    pub list_story: Vec<Story>,
}

/// `GET stories/{id}` response body
#[derive(Deserialize, Debug, Clone)]
pub struct StoryDetailResponse {
    pub error: bool,
    pub message: String,
    pub story: Option<Story>,
}

/// A locally persisted favorite: a copy of the story plus when it was liked.
/// Lives independently of the remote story.
#[derive(Debug, Clone, PartialEq)]
pub struct FavoriteRecord {
    pub story_id: String,
    pub name: String,
    pub description: String,
    pub photo_url: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub created_at: String,
    /// Milliseconds since the Unix epoch; newest first when listed
    pub liked_at: i64,
}

impl FavoriteRecord {
    /// Copy a story's fields into a favorite stamped with `liked_at`
    pub fn from_story(story: &Story, liked_at: i64) -> Self {
        Self {
            story_id: story.id.clone(),
            name: story.name.clone(),
            description: story.description.clone(),
            photo_url: story.photo_url.clone(),
            lat: story.lat,
            lon: story.lon,
            created_at: story.created_at.clone(),
            liked_at,
        }
    }

    pub fn to_story(&self) -> Story {
        Story {
            id: self.story_id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            photo_url: self.photo_url.clone(),
            created_at: self.created_at.clone(),
            lat: self.lat,
            lon: self.lon,
        }
    }

    /// Favorites are rendered like feed entries, without a place name
    pub fn to_item(&self) -> StoryItem {
        StoryItem::new(self.to_story())
    }
}

/// A story ready for display
#[derive(Debug, Clone, PartialEq)]
pub struct StoryItem {
    pub story: Story,
    /// Filled in asynchronously once the coordinates are resolved
    pub location_name: Option<String>,
}

impl StoryItem {
    pub fn new(story: Story) -> Self {
        Self {
            story,
            location_name: None,
        }
    }
}
