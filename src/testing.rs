//! In-memory fakes for the platform and network seams, shared by unit tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use crate::error::{ApiError, LocationError};
use crate::location::{cache_key, Address, Geocoder, LocationProvider};
use crate::model::{ApiMessage, LoginRequest, RegisterRequest, Session, Story};
use crate::notify::{NotificationPresenter, StoryNotification};
use crate::remote::{StoryApi, StoryQuery, StoryUpload};

/// Story number `i`; every third story (i % 3 == 2) has no coordinates
pub fn story(i: usize) -> Story {
    let geotagged = i % 3 != 2;
    Story {
        id: format!("story-{}", i),
        name: format!("User {}", i),
        description: format!("Story number {}", i),
        photo_url: Some(format!("https://story-api.dicoding.dev/images/stories/{}.jpg", i)),
        created_at: "2022-01-08T06:34:18.598Z".to_string(),
        lat: geotagged.then(|| -6.2 + i as f64 * 0.01),
        lon: geotagged.then_some(106.8),
    }
}

/// Write a small PNG to `dir/name`
pub fn write_png(dir: &Path, name: &str) -> PathBuf {
    let img = image::RgbImage::from_fn(64, 48, |x, y| image::Rgb([x as u8, y as u8, 128]));
    let path = dir.join(name);
    img.save(&path).unwrap();
    path
}

#[derive(Default)]
pub struct FakeApi {
    stories: Vec<Story>,
    calls: Mutex<HashMap<&'static str, usize>>,
    queries: Mutex<Vec<StoryQuery>>,
    uploads: Mutex<Vec<StoryUpload>>,
    failures: Mutex<HashMap<&'static str, ApiError>>,
    held: Mutex<HashMap<u32, Arc<Notify>>>,
}

impl FakeApi {
    pub fn with_stories(count: usize) -> Self {
        Self {
            stories: (0..count).map(story).collect(),
            ..Default::default()
        }
    }

    /// Make the next call to `op` fail with `err`
    pub fn fail_next(&self, op: &'static str, err: ApiError) {
        self.failures.lock().unwrap().insert(op, err);
    }

    pub fn fail_next_list(&self, status: u16) {
        self.fail_next("list_stories", ApiError::Status { status, message: None });
    }

    /// Block the next request for `page` until the returned handle is notified
    pub fn hold_page(&self, page: u32) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.held.lock().unwrap().insert(page, notify.clone());
        notify
    }

    pub async fn wait_until_requested(&self, page: u32) {
        while !self.requested_pages().contains(&page) {
            tokio::task::yield_now().await;
        }
    }

    pub fn requested_pages(&self) -> Vec<u32> {
        self.queries.lock().unwrap().iter().map(|q| q.page).collect()
    }

    pub fn last_query(&self) -> Option<StoryQuery> {
        self.queries.lock().unwrap().last().copied()
    }

    pub fn last_upload(&self) -> Option<StoryUpload> {
        self.uploads.lock().unwrap().last().cloned()
    }

    pub fn list_calls(&self) -> usize {
        self.calls_to("list_stories")
    }

    pub fn add_calls(&self) -> usize {
        self.calls_to("add_story")
    }

    pub fn calls_to(&self, op: &str) -> usize {
        self.calls.lock().unwrap().get(op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    fn enter(&self, op: &'static str) -> Result<(), ApiError> {
        *self.calls.lock().unwrap().entry(op).or_default() += 1;
        match self.failures.lock().unwrap().remove(op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StoryApi for FakeApi {
    async fn register(&self, _request: &RegisterRequest) -> Result<ApiMessage, ApiError> {
        self.enter("register")?;
        Ok(ApiMessage {
            error: false,
            message: "User Created".to_string(),
        })
    }

    async fn login(&self, request: &LoginRequest) -> Result<Session, ApiError> {
        self.enter("login")?;
        Ok(Session {
            user_id: "user-1".to_string(),
            name: request.email.split('@').next().unwrap_or_default().to_string(),
            token: "token-123".to_string(),
        })
    }

    async fn list_stories(&self, query: StoryQuery) -> Result<Vec<Story>, ApiError> {
        self.queries.lock().unwrap().push(query);
        let held = self.held.lock().unwrap().remove(&query.page);
        if let Some(notify) = held {
            notify.notified().await;
        }
        self.enter("list_stories")?;

        let matching: Vec<&Story> = self
            .stories
            .iter()
            .filter(|s| !query.with_location || s.coordinates().is_some())
            .collect();
        let start = ((query.page.max(1) - 1) * query.size) as usize;
        Ok(matching
            .into_iter()
            .skip(start)
            .take(query.size as usize)
            .cloned()
            .collect())
    }

    async fn story_detail(&self, id: &str) -> Result<Story, ApiError> {
        self.enter("story_detail")?;
        self.stories
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(ApiError::Status {
                status: 404,
                message: Some("Story not found".to_string()),
            })
    }

    async fn add_story(&self, upload: StoryUpload) -> Result<ApiMessage, ApiError> {
        self.enter("add_story")?;
        self.uploads.lock().unwrap().push(upload);
        Ok(ApiMessage {
            error: false,
            message: "Story created successfully".to_string(),
        })
    }
}

/// Geocoder that answers every coordinate with the same place
pub struct FakeGeocoder {
    name: String,
    calls: AtomicUsize,
    offline: AtomicBool,
    empty: AtomicBool,
    delays: Mutex<HashMap<String, Duration>>,
}

impl FakeGeocoder {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: AtomicUsize::new(0),
            offline: AtomicBool::new(false),
            empty: AtomicBool::new(false),
            delays: Mutex::new(HashMap::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Fail with an I/O error
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Return no candidates
    pub fn set_empty(&self, empty: bool) {
        self.empty.store(empty, Ordering::SeqCst);
    }

    pub fn delay_for(&self, lat: f64, lon: f64, delay: Duration) {
        self.delays.lock().unwrap().insert(cache_key(lat, lon), delay);
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn reverse(&self, lat: f64, lon: f64) -> std::io::Result<Vec<Address>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.delays.lock().unwrap().get(&cache_key(lat, lon)).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(std::io::Error::new(std::io::ErrorKind::Other, "grpc failed"));
        }
        if self.empty.load(Ordering::SeqCst) {
            return Ok(Vec::new());
        }
        Ok(vec![Address {
            locality: Some(self.name.clone()),
            ..Default::default()
        }])
    }
}

pub struct FakeLocationProvider {
    position: Option<(f64, f64)>,
}

impl FakeLocationProvider {
    pub fn at(lat: f64, lon: f64) -> Self {
        Self {
            position: Some((lat, lon)),
        }
    }

    pub fn unavailable() -> Self {
        Self { position: None }
    }
}

#[async_trait]
impl LocationProvider for FakeLocationProvider {
    async fn current_location(&self) -> Result<(f64, f64), LocationError> {
        self.position.ok_or(LocationError::Unavailable)
    }
}

#[derive(Default)]
pub struct FakePresenter {
    shown: Mutex<Vec<StoryNotification>>,
}

impl FakePresenter {
    pub fn shown(&self) -> Vec<StoryNotification> {
        self.shown.lock().unwrap().clone()
    }
}

impl NotificationPresenter for FakePresenter {
    fn show(&self, notification: &StoryNotification) {
        self.shown.lock().unwrap().push(notification.clone());
    }
}
