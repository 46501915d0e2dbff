/// Data model shared between the API layer, the local stores and the view state
///
/// - `story.rs`: stories as the server sends them, plus locally favorited copies
/// - `auth.rs`: login/register payloads and the persisted session

pub mod auth;
pub mod story;

pub use auth::{LoginRequest, LoginResponse, RegisterRequest, Session};
pub use story::{ApiMessage, FavoriteRecord, Story, StoryItem};
