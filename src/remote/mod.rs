/// Story API access
///
/// - `api.rs`: the `StoryApi` trait and request types
/// - `http.rs`: the reqwest-backed implementation with bearer-token injection
/// - `messages.rs`: per-endpoint user-facing error text

pub mod api;
pub mod http;
pub mod messages;

pub use api::{StoryApi, StoryQuery, StoryUpload};
pub use http::HttpStoryApi;
pub use messages::{user_message, Endpoint};
