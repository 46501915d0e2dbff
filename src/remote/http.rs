//! reqwest implementation of `StoryApi`
//!
//! Every request carries `Authorization: Bearer <token>` when the session
//! store holds a token. Non-2xx responses become `ApiError::Status` with the
//! server's `message` when the body has one; 2xx bodies with `error: true`
//! become `ApiError::Rejected`.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::api::{StoryApi, StoryQuery, StoryUpload};
use crate::error::ApiError;
use crate::model::story::{StoryDetailResponse, StoryListResponse};
use crate::model::{ApiMessage, LoginRequest, LoginResponse, RegisterRequest, Session, Story};
use crate::state::SessionStore;

pub struct HttpStoryApi {
    client: Client,
    base_url: String,
    session: SessionStore,
}

impl HttpStoryApi {
    pub fn new(base_url: &str, timeout: Duration, session: SessionStore) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Request(format!("Failed to create HTTP client: {e}")))?;

        info!(base_url = %base_url, "Story API client initialized");

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// `base_url` plus `segments`, each percent-encoded as a single path segment
    fn segment_url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| ApiError::Request(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Request(format!("base URL cannot take a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Attach the bearer token from the current session, if any
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, endpoint: &str, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.authorize(request).send().await.map_err(|e| {
            warn!(endpoint, error = %e, "Request failed");
            ApiError::from(e)
        })?;

        let status = response.status();
        debug!(endpoint, status = status.as_u16(), "API response");

        if !status.is_success() {
            let message = error_message(response).await;
            warn!(endpoint, status = status.as_u16(), message = ?message, "API returned error status");
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Best-effort extraction of `message` from an error body
async fn error_message(response: Response) -> Option<String> {
    let body = response.text().await.ok()?;
    serde_json::from_str::<ApiMessage>(&body)
        .ok()
        .map(|m| m.message)
}

fn accept(message: ApiMessage) -> Result<ApiMessage, ApiError> {
    if message.error {
        Err(ApiError::Rejected(message.message))
    } else {
        Ok(message)
    }
}

#[async_trait]
impl StoryApi for HttpStoryApi {
    async fn register(&self, request: &RegisterRequest) -> Result<ApiMessage, ApiError> {
        let body: ApiMessage = self
            .send("register", self.client.post(self.url("register")).json(request))
            .await?;
        accept(body)
    }

    async fn login(&self, request: &LoginRequest) -> Result<Session, ApiError> {
        let body: LoginResponse = self
            .send("login", self.client.post(self.url("login")).json(request))
            .await?;

        match body.login_result {
            Some(session) if !body.error => Ok(session),
            _ => Err(ApiError::Rejected(body.message)),
        }
    }

    async fn list_stories(&self, query: StoryQuery) -> Result<Vec<Story>, ApiError> {
        let mut params = vec![("page", query.page), ("size", query.size)];
        if query.with_location {
            params.push(("location", 1));
        }

        let body: StoryListResponse = self
            .send("stories", self.client.get(self.url("stories")).query(&params))
            .await?;

        if body.error {
            return Err(ApiError::Rejected(body.message));
        }
        debug!(page = query.page, count = body.list_story.len(), "Stories page fetched");
        Ok(body.list_story)
    }

    async fn story_detail(&self, id: &str) -> Result<Story, ApiError> {
        let url = self.segment_url(&["stories", id])?;
        let body: StoryDetailResponse = self.send("story_detail", self.client.get(url)).await?;

        match body.story {
            Some(story) if !body.error => Ok(story),
            _ => Err(ApiError::Rejected(body.message)),
        }
    }

    async fn add_story(&self, upload: StoryUpload) -> Result<ApiMessage, ApiError> {
        let photo = Part::bytes(upload.photo)
            .file_name(upload.file_name)
            .mime_str("image/jpeg")
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let mut form = Form::new()
            .text("description", upload.description)
            .part("photo", photo);
        if let Some(lat) = upload.lat {
            form = form.text("lat", lat.to_string());
        }
        if let Some(lon) = upload.lon {
            form = form.text("lon", lon.to_string());
        }

        let body: ApiMessage = self
            .send("add_story", self.client.post(self.url("stories")).multipart(form))
            .await?;
        accept(body)
    }
}

impl std::fmt::Debug for HttpStoryApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStoryApi")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Database, Preferences};

    fn api(base_url: &str) -> HttpStoryApi {
        let session = SessionStore::new(Preferences::new(Database::open_in_memory().unwrap())).unwrap();
        HttpStoryApi::new(base_url, Duration::from_secs(5), session).unwrap()
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let api = api("https://story-api.dicoding.dev/v1/");
        assert_eq!(api.url("stories"), "https://story-api.dicoding.dev/v1/stories");
    }

    #[test]
    fn test_story_id_stays_one_path_segment() {
        let api = api("https://story-api.dicoding.dev/v1/");

        let url = api.segment_url(&["stories", "story-FvU4u0Vp2S3PMsFg"]).unwrap();
        assert_eq!(url.as_str(), "https://story-api.dicoding.dev/v1/stories/story-FvU4u0Vp2S3PMsFg");

        let url = api.segment_url(&["stories", "a/b?c#d"]).unwrap();
        assert_eq!(url.path(), "/v1/stories/a%2Fb%3Fc%23d");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_accept_rejects_error_body() {
        let rejected = accept(ApiMessage {
            error: true,
            message: "\"email\" must be a valid email".into(),
        });
        assert!(matches!(rejected, Err(ApiError::Rejected(m)) if m.contains("valid email")));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connection_error() {
        // Port 9 (discard) on localhost is not expected to accept HTTP
        let api = api("http://127.0.0.1:9/v1/");
        let err = api.list_stories(StoryQuery::page(1, 10)).await.unwrap_err();
        assert!(matches!(err, ApiError::Connection(_)), "got {:?}", err);
    }
}
