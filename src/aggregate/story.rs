//! Story view state: feed, detail, map, favorites and the new-story draft
//!
//! `StoryAggregator` owns a `StoryState` published on a watch channel. The UI
//! subscribes and renders; the only way to change the state is through the
//! aggregator's methods (and the location tasks it spawns itself).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{LocationError, StorageError};
use crate::feed::{FeedLoad, FeedPaginator, FeedSnapshot};
use crate::location::{LocationProvider, LocationResolver};
use crate::model::{ApiMessage, FavoriteRecord, Story, StoryItem};
use crate::photo;
use crate::remote::{user_message, Endpoint, StoryApi, StoryQuery, StoryUpload};
use crate::state::{FavoriteFlag, FavoriteStore, ViewState};

pub const DESCRIPTION_REQUIRED: &str = "Deskripsi tidak boleh kosong";
pub const PHOTO_REQUIRED: &str = "Pilih gambar terlebih dahulu";

/// The story being composed on the add-story screen
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoryDraft {
    pub description: String,
    /// Local file picked from the camera or gallery
    pub photo: Option<PathBuf>,
    /// Attach `lat`/`lon` to the upload
    pub use_location: bool,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl StoryDraft {
    /// Coordinates to send, only when location is switched on and known
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.use_location, self.lat, self.lon) {
            (true, Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// The loaded feed as rendered
#[derive(Debug, Clone, PartialEq)]
pub struct FeedView {
    /// Feed generation these items belong to
    pub generation: u64,
    pub items: Vec<StoryItem>,
    /// No more pages to load
    pub complete: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoryState {
    pub draft: StoryDraft,
    pub feed: ViewState<FeedView>,
    pub detail: ViewState<StoryItem>,
    /// Place-name lookup for the detail view
    pub detail_location: ViewState<String>,
    pub add_story: ViewState<ApiMessage>,
    pub map: ViewState<Vec<Story>>,
}

/// Which part of the feed to load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedRequest {
    Refresh,
    NextPage,
}

#[derive(Clone)]
pub struct StoryAggregator {
    inner: Arc<Inner>,
}

struct Inner {
    api: Arc<dyn StoryApi>,
    feed: FeedPaginator,
    favorites: FavoriteStore,
    resolver: Arc<LocationResolver>,
    state: Arc<watch::Sender<StoryState>>,
    /// Where compressed uploads are written; `None` keeps them in memory only
    upload_dir: Option<PathBuf>,
    map_page_size: u32,
    location_tasks: Mutex<JoinSet<()>>,
    /// Bumped by every `load_detail`; only the latest call may write `detail`
    detail_request: AtomicU64,
}

impl StoryAggregator {
    pub fn new(
        api: Arc<dyn StoryApi>,
        feed: FeedPaginator,
        favorites: FavoriteStore,
        resolver: Arc<LocationResolver>,
        upload_dir: Option<PathBuf>,
    ) -> Self {
        let (state, _rx) = watch::channel(StoryState::default());
        let map_page_size = feed.config().page_size;
        Self {
            inner: Arc::new(Inner {
                api,
                feed,
                favorites,
                resolver,
                state: Arc::new(state),
                upload_dir,
                map_page_size,
                location_tasks: Mutex::new(JoinSet::new()),
                detail_request: AtomicU64::new(0),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<StoryState> {
        self.inner.state.subscribe()
    }

    /// Copy of the current state
    pub fn state(&self) -> StoryState {
        self.inner.state.borrow().clone()
    }

    fn update(&self, f: impl FnOnce(&mut StoryState)) {
        self.inner.state.send_modify(f);
    }

    fn location_tasks(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.inner.location_tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ========== Draft ==========

    pub fn set_description(&self, description: &str) {
        self.update(|s| s.draft.description = description.to_string());
    }

    pub fn set_photo(&self, photo: Option<PathBuf>) {
        self.update(|s| s.draft.photo = photo);
    }

    pub fn set_location(&self, lat: f64, lon: f64) {
        self.update(|s| {
            s.draft.lat = Some(lat);
            s.draft.lon = Some(lon);
        });
    }

    /// Turning location off forgets the coordinates
    pub fn set_use_location(&self, use_location: bool) {
        self.update(|s| {
            s.draft.use_location = use_location;
            if !use_location {
                s.draft.lat = None;
                s.draft.lon = None;
            }
        });
    }

    /// Ask the device for its position and put it in the draft
    pub async fn fill_current_location(&self, provider: &dyn LocationProvider) -> Result<(f64, f64), LocationError> {
        let (lat, lon) = provider.current_location().await?;
        self.set_location(lat, lon);
        Ok((lat, lon))
    }

    pub fn clear_draft(&self) {
        self.update(|s| {
            s.draft.description.clear();
            s.draft.photo = None;
        });
    }

    // ========== Add story ==========

    /// Submit the current draft
    pub async fn submit_draft(&self) {
        let draft = self.state().draft;
        self.submit_story(&draft.description, draft.photo.as_deref(), draft.coordinates())
            .await;
    }

    /// Validate, compress and upload a story. The outcome lands in `add_story`;
    /// on success the draft is cleared.
    pub async fn submit_story(&self, description: &str, photo: Option<&Path>, coordinates: Option<(f64, f64)>) {
        if description.is_empty() {
            self.update(|s| s.add_story = ViewState::Error(DESCRIPTION_REQUIRED.to_string()));
            return;
        }
        let Some(photo_path) = photo else {
            self.update(|s| s.add_story = ViewState::Error(PHOTO_REQUIRED.to_string()));
            return;
        };

        self.update(|s| s.add_story = ViewState::Loading);

        let compressed = match photo::prepare_upload(photo_path.to_path_buf(), self.inner.upload_dir.clone()).await {
            Ok(compressed) => compressed,
            Err(e) => {
                warn!(error = %e, "Photo preparation failed");
                self.update(|s| s.add_story = ViewState::Error(e.to_string()));
                return;
            }
        };

        let upload = StoryUpload {
            description: description.to_string(),
            file_name: compressed.file_name(),
            photo: compressed.data,
            lat: coordinates.map(|(lat, _)| lat),
            lon: coordinates.map(|(_, lon)| lon),
        };

        match self.inner.api.add_story(upload).await {
            Ok(response) => {
                info!("Story uploaded");
                self.update(|s| {
                    s.add_story = ViewState::Success(response);
                    s.draft.description.clear();
                    s.draft.photo = None;
                });
            }
            Err(e) => {
                warn!(error = %e, "Story upload failed");
                let message = user_message(&e, Endpoint::AddStory);
                self.update(|s| s.add_story = ViewState::Error(message));
            }
        }
    }

    // ========== Favorites ==========

    /// Add or remove a favorite depending on its current membership
    pub fn toggle_favorite(&self, story: &Story, currently_favorited: bool) -> Result<(), StorageError> {
        if currently_favorited {
            self.inner.favorites.remove(story)
        } else {
            self.inner.favorites.add(story)
        }
    }

    pub fn is_favorite(&self, story_id: &str) -> FavoriteFlag {
        self.inner.favorites.is_favorite(story_id)
    }

    pub fn favorites(&self) -> watch::Receiver<Vec<FavoriteRecord>> {
        self.inner.favorites.list()
    }

    /// Favorites as renderable items, most recently liked first
    pub fn favorite_items(&self) -> Vec<StoryItem> {
        self.inner
            .favorites
            .snapshot()
            .iter()
            .map(FavoriteRecord::to_item)
            .collect()
    }

    // ========== Feed ==========

    /// Load the first page again or the next one. Place names are resolved in
    /// the background and merged into `feed` as they arrive.
    pub async fn load_feed(&self, request: FeedRequest) {
        self.update(|s| s.feed = ViewState::Loading);

        let result = match request {
            FeedRequest::Refresh => self.inner.feed.refresh().await,
            FeedRequest::NextPage => self.inner.feed.load_next().await,
        };

        match result {
            Ok(FeedLoad::Loaded { page, snapshot }) => {
                self.publish_feed(&snapshot);
                self.resolve_feed_locations(snapshot.generation, page.stories);
            }
            Ok(FeedLoad::Exhausted(snapshot)) => self.publish_feed(&snapshot),
            Ok(FeedLoad::Stale) => debug!("Stale feed load ignored"),
            Err(e) => {
                warn!(error = %e, "Feed load failed");
                let message = user_message(&e, Endpoint::Stories);
                self.update(|s| s.feed = ViewState::Error(message));
            }
        }
    }

    fn publish_feed(&self, snapshot: &FeedSnapshot) {
        let resolver = &self.inner.resolver;
        let items = snapshot
            .stories
            .iter()
            .map(|story| StoryItem {
                location_name: story
                    .coordinates()
                    .and_then(|(lat, lon)| resolver.cached(lat, lon)),
                story: story.clone(),
            })
            .collect();

        let view = FeedView {
            generation: snapshot.generation,
            items,
            complete: snapshot.is_complete(),
        };
        self.update(|s| s.feed = ViewState::Success(view));
    }

    /// One independent task per geo-tagged story. Failures are dropped per item.
    fn resolve_feed_locations(&self, generation: u64, stories: Vec<Story>) {
        let mut tasks = self.location_tasks();
        // Drop lookups that already finished
        while tasks.try_join_next().is_some() {}

        for story in stories {
            let Some((lat, lon)) = story.coordinates() else {
                continue;
            };
            if self.inner.resolver.cached(lat, lon).is_some() {
                continue;
            }

            let resolver = self.inner.resolver.clone();
            let state = self.inner.state.clone();
            tasks.spawn(async move {
                match resolver.resolve(lat, lon).await {
                    Ok(name) => merge_location(&state, generation, &story.id, name),
                    Err(e) => debug!(story_id = %story.id, error = %e, "Feed location skipped"),
                }
            });
        }
    }

    /// Wait until every background location lookup has finished
    pub async fn settle(&self) {
        // Joined outside the lock so new feed loads can keep spawning
        let mut tasks = std::mem::take(&mut *self.location_tasks());
        while tasks.join_next().await.is_some() {}
    }

    /// Resolve a single coordinate, e.g. for a story card entering view
    pub async fn resolve_location(&self, lat: f64, lon: f64) -> Result<String, LocationError> {
        self.inner.resolver.resolve(lat, lon).await
    }

    // ========== Detail ==========

    /// Load one story, then its place name. A newer call supersedes this one:
    /// results that arrive after it are dropped.
    pub async fn load_detail(&self, story_id: &str) {
        let request = self.inner.detail_request.fetch_add(1, Ordering::SeqCst) + 1;
        self.update(|s| {
            s.detail = ViewState::Loading;
            s.detail_location = ViewState::Idle;
        });

        let story = match self.inner.api.story_detail(story_id).await {
            Ok(story) => story,
            Err(e) => {
                warn!(story_id, error = %e, "Story detail failed");
                let message = user_message(&e, Endpoint::StoryDetail);
                self.update_detail(request, |s| s.detail = ViewState::Error(message));
                return;
            }
        };

        let coordinates = story.coordinates();
        self.update_detail(request, |s| s.detail = ViewState::Success(StoryItem::new(story)));

        let Some((lat, lon)) = coordinates else {
            return;
        };

        self.update_detail(request, |s| s.detail_location = ViewState::Loading);
        let resolved = self.inner.resolver.resolve(lat, lon).await;
        self.update_detail(request, |s| match resolved {
            Ok(name) => {
                if let Some(item) = s.detail.data_mut() {
                    item.location_name = Some(name.clone());
                }
                s.detail_location = ViewState::Success(name);
            }
            Err(e) => s.detail_location = ViewState::Error(e.to_string()),
        });
    }

    /// Apply `f` only while `request` is still the latest `load_detail`
    fn update_detail(&self, request: u64, f: impl FnOnce(&mut StoryState)) {
        let applied = self.inner.state.send_if_modified(|s| {
            if self.inner.detail_request.load(Ordering::SeqCst) != request {
                return false;
            }
            f(s);
            true
        });
        if !applied {
            debug!(request, "Superseded detail result dropped");
        }
    }

    // ========== Map ==========

    /// Geo-tagged stories for the map markers
    pub async fn load_for_map(&self) {
        self.update(|s| s.map = ViewState::Loading);

        let query = StoryQuery::page(1, self.inner.map_page_size).with_location(true);
        match self.inner.api.list_stories(query).await {
            Ok(stories) => {
                debug!(count = stories.len(), "Map stories loaded");
                self.update(|s| s.map = ViewState::Success(stories));
            }
            Err(e) => {
                let message = user_message(&e, Endpoint::Stories);
                self.update(|s| s.map = ViewState::Error(message));
            }
        }
    }
}

/// Write a resolved name into the feed entry for `story_id`. No-op when the
/// feed moved on to another generation or no longer shows the story.
fn merge_location(state: &watch::Sender<StoryState>, generation: u64, story_id: &str, name: String) {
    state.send_if_modified(|s| {
        let Some(view) = s.feed.data_mut() else {
            return false;
        };
        if view.generation != generation {
            return false;
        }

        let mut changed = false;
        for item in view.items.iter_mut().filter(|item| item.story.id == story_id) {
            item.location_name = Some(name.clone());
            changed = true;
        }
        changed
    });
}

impl std::fmt::Debug for StoryAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoryAggregator")
            .field("feed", &self.inner.feed)
            .field("favorites", &self.inner.favorites)
            .finish()
    }
}
