/// View-state aggregators
///
/// These own the state the UI renders and are its only entry points:
/// - `story.rs`: feed, detail, map, favorites, add-story draft
/// - `auth.rs`: login/register forms and the session lifecycle

pub mod auth;
pub mod story;

pub use auth::{AuthAggregator, AuthState};
pub use story::{FeedRequest, FeedView, StoryAggregator, StoryDraft, StoryState};
