/// New-story notifications
///
/// `StoryNotifier::check_latest` looks at the newest story in the feed and
/// hands it to the platform presenter unless it was already announced. The id
/// of the last announced story is kept in preferences, so restarts don't
/// repeat an alert.

use std::sync::Arc;
use tracing::{debug, info};

use crate::error::ClientError;
use crate::model::Story;
use crate::remote::{StoryApi, StoryQuery};
use crate::state::Preferences;

const PREVIEW_CHARS: usize = 50;
const CHECK_PAGE_SIZE: u32 = 10;

/// What the platform shows for a new story
#[derive(Debug, Clone, PartialEq)]
pub struct StoryNotification {
    /// Opened when the notification is tapped
    pub story_id: String,
    pub title: String,
    /// First 50 characters of the description
    pub preview: String,
    /// Full description for the expanded view
    pub body: String,
}

impl StoryNotification {
    pub fn for_story(story: &Story) -> Self {
        Self {
            story_id: story.id.clone(),
            title: format!("{} mengupload story baru", story.name),
            preview: story.description.chars().take(PREVIEW_CHARS).collect(),
            body: story.description.clone(),
        }
    }
}

/// Platform notification display
pub trait NotificationPresenter: Send + Sync {
    fn show(&self, notification: &StoryNotification);
}

pub struct StoryNotifier {
    api: Arc<dyn StoryApi>,
    prefs: Preferences,
    presenter: Arc<dyn NotificationPresenter>,
}

impl StoryNotifier {
    pub fn new(api: Arc<dyn StoryApi>, prefs: Preferences, presenter: Arc<dyn NotificationPresenter>) -> Self {
        Self { api, prefs, presenter }
    }

    /// Announce the newest story if it hasn't been announced yet.
    /// Returns the story that was shown, if any.
    pub async fn check_latest(&self) -> Result<Option<Story>, ClientError> {
        let stories = self.api.list_stories(StoryQuery::page(1, CHECK_PAGE_SIZE)).await?;

        let Some(latest) = stories.into_iter().next() else {
            debug!("No stories to announce");
            return Ok(None);
        };

        if self.prefs.last_notified_story_id()?.as_deref() == Some(latest.id.as_str()) {
            debug!(story_id = %latest.id, "Latest story already announced");
            return Ok(None);
        }

        self.presenter.show(&StoryNotification::for_story(&latest));
        self.prefs.set_last_notified_story_id(&latest.id)?;
        info!(story_id = %latest.id, "New story announced");

        Ok(Some(latest))
    }
}
