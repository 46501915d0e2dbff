//! Cursor-based incremental loading of the story feed
//!
//! Pages are numbered from 1. A loaded page knows its neighbours:
//! `prev_key` is `None` on page 1, `next_key` is `None` once a page comes back
//! empty (end of feed). A failed load leaves the cursor where it was, so the
//! same page can be retried.
//!
//! Every `refresh` starts a new generation. A response that was requested in an
//! older generation is dropped when it arrives, which keeps an in-flight
//! "next page" from leaking into a freshly refreshed feed.

use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::model::Story;
use crate::remote::{StoryApi, StoryQuery};

/// Default number of stories per page
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// One loaded page plus its cursor
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPage {
    pub page: u32,
    pub stories: Vec<Story>,
    pub prev_key: Option<u32>,
    pub next_key: Option<u32>,
}

/// Fetch a single page and compute its cursor
pub async fn load_page(api: &dyn StoryApi, query: StoryQuery) -> Result<FeedPage, ApiError> {
    let stories = api.list_stories(query).await?;

    let page = query.page;
    let prev_key = if page == 1 { None } else { Some(page - 1) };
    let next_key = if stories.is_empty() { None } else { Some(page + 1) };

    Ok(FeedPage {
        page,
        stories,
        prev_key,
        next_key,
    })
}

/// The page to reload so that the item at `anchor` (an index into the
/// concatenation of `pages`) stays in view.
pub fn refresh_key(pages: &[FeedPage], anchor: usize) -> Option<u32> {
    let mut offset = 0;
    let mut closest = None;
    for page in pages {
        closest = Some(page);
        offset += page.stories.len();
        if anchor < offset {
            break;
        }
    }

    closest.and_then(|page| {
        page.prev_key
            .map(|prev| prev + 1)
            .or_else(|| page.next_key.map(|next| next - 1))
    })
}

/// Feed contents at a point in time
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSnapshot {
    pub generation: u64,
    pub stories: Vec<Story>,
    pub next_key: Option<u32>,
}

impl FeedSnapshot {
    /// True once a page has come back empty
    pub fn is_complete(&self) -> bool {
        self.next_key.is_none()
    }
}

/// Outcome of a load request
#[derive(Debug, Clone, PartialEq)]
pub enum FeedLoad {
    /// A page was applied to the feed
    Loaded { page: FeedPage, snapshot: FeedSnapshot },
    /// The feed already ended; nothing was requested
    Exhausted(FeedSnapshot),
    /// A refresh happened while this request was in flight; its response was dropped
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedConfig {
    pub page_size: u32,
    /// Only geo-tagged stories
    pub with_location: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            with_location: false,
        }
    }
}

#[derive(Debug)]
struct FeedState {
    generation: u64,
    pages: Vec<FeedPage>,
    /// Next page to request; `None` once the feed is complete
    next: Option<u32>,
}

impl FeedState {
    fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            generation: self.generation,
            stories: self.pages.iter().flat_map(|p| p.stories.iter().cloned()).collect(),
            next_key: self.next,
        }
    }
}

pub struct FeedPaginator {
    api: Arc<dyn StoryApi>,
    config: FeedConfig,
    state: Mutex<FeedState>,
}

impl FeedPaginator {
    pub fn new(api: Arc<dyn StoryApi>, config: FeedConfig) -> Self {
        Self {
            api,
            config,
            state: Mutex::new(FeedState {
                generation: 0,
                pages: Vec::new(),
                next: Some(1),
            }),
        }
    }

    pub fn config(&self) -> FeedConfig {
        self.config
    }

    fn state(&self) -> MutexGuard<'_, FeedState> {
        // The state is only ever replaced wholesale, a poisoned guard is still consistent
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Drop everything loaded so far and fetch page 1 in a new generation
    pub async fn refresh(&self) -> Result<FeedLoad, ApiError> {
        let generation = {
            let mut state = self.state();
            state.generation += 1;
            state.pages.clear();
            state.next = Some(1);
            state.generation
        };
        info!(generation, "Feed refresh");
        self.fetch(generation, 1).await
    }

    /// Fetch the page after the last one loaded
    pub async fn load_next(&self) -> Result<FeedLoad, ApiError> {
        let (generation, page) = {
            let state = self.state();
            match state.next {
                Some(page) => (state.generation, page),
                None => return Ok(FeedLoad::Exhausted(state.snapshot())),
            }
        };
        self.fetch(generation, page).await
    }

    async fn fetch(&self, generation: u64, page: u32) -> Result<FeedLoad, ApiError> {
        let query = StoryQuery::page(page, self.config.page_size).with_location(self.config.with_location);
        let result = load_page(self.api.as_ref(), query).await;

        let mut state = self.state();
        if state.generation != generation {
            debug!(page, generation, current = state.generation, "Discarding stale feed response");
            return Ok(FeedLoad::Stale);
        }

        let loaded = result?;
        debug!(page, count = loaded.stories.len(), next = ?loaded.next_key, "Feed page loaded");

        // Pages stay sorted by number; the last response for a page wins
        match state.pages.binary_search_by_key(&loaded.page, |p| p.page) {
            Ok(index) => state.pages[index] = loaded.clone(),
            Err(index) => state.pages.insert(index, loaded.clone()),
        }
        // The cursor follows the furthest page, whatever order responses arrive in
        state.next = state.pages.last().and_then(|p| p.next_key);

        Ok(FeedLoad::Loaded {
            page: loaded,
            snapshot: state.snapshot(),
        })
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.state().snapshot()
    }

    pub fn generation(&self) -> u64 {
        self.state().generation
    }

    pub fn pages(&self) -> Vec<FeedPage> {
        self.state().pages.clone()
    }
}

impl std::fmt::Debug for FeedPaginator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedPaginator")
            .field("config", &self.config)
            .field("state", &*self.state())
            .finish()
    }
}
