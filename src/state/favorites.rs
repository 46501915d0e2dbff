use chrono::Utc;
use rusqlite::{params, Connection, Row};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

use super::database::Database;
use crate::error::StorageError;
use crate::model::{FavoriteRecord, Story};

/// Locally favorited stories.
///
/// The `story_favorite` table is the single source of truth. After every
/// mutation the full list is re-read inside the same lock and published on a
/// watch channel, so every observer sees the change as soon as the call returns.
#[derive(Clone)]
pub struct FavoriteStore {
    db: Database,
    tx: Arc<watch::Sender<Vec<FavoriteRecord>>>,
}

impl FavoriteStore {
    pub fn new(db: Database) -> Result<Self, StorageError> {
        let initial = db.with_conn(|conn| query_all(conn))?;
        debug!(count = initial.len(), "Favorites loaded");
        let (tx, _rx) = watch::channel(initial);
        Ok(Self {
            db,
            tx: Arc::new(tx),
        })
    }

    /// Favorite a story. An existing record for the same id is replaced and
    /// re-stamped with the current time.
    pub fn add(&self, story: &Story) -> Result<(), StorageError> {
        let record = FavoriteRecord::from_story(story, Utc::now().timestamp_millis());

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO story_favorite
                    (story_id, name, description, photo_url, lat, lon, created_at, liked_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.story_id,
                    record.name,
                    record.description,
                    record.photo_url,
                    record.lat,
                    record.lon,
                    record.created_at,
                    record.liked_at,
                ],
            )?;
            self.publish(conn)
        })?;

        info!(story_id = %story.id, "Story favorited");
        Ok(())
    }

    /// Un-favorite a story by its id
    pub fn remove(&self, story: &Story) -> Result<(), StorageError> {
        self.remove_id(&story.id)
    }

    pub fn remove_id(&self, story_id: &str) -> Result<(), StorageError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM story_favorite WHERE story_id = ?1",
                params![story_id],
            )?;
            self.publish(conn)
        })?;

        info!(story_id = %story_id, "Story unfavorited");
        Ok(())
    }

    /// Re-read the table and publish it. Must run under the connection lock
    /// so publishes happen in the same order as the writes.
    fn publish(&self, conn: &Connection) -> rusqlite::Result<()> {
        let list = query_all(conn)?;
        self.tx.send_replace(list);
        Ok(())
    }

    /// Point-in-time membership check straight from the table
    pub fn contains(&self, story_id: &str) -> Result<bool, StorageError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM story_favorite WHERE story_id = ?1)",
                params![story_id],
                |row| row.get(0),
            )
        })
    }

    /// Live list of favorites, most recently liked first
    pub fn list(&self) -> watch::Receiver<Vec<FavoriteRecord>> {
        self.tx.subscribe()
    }

    /// Current favorites without subscribing
    pub fn snapshot(&self) -> Vec<FavoriteRecord> {
        self.tx.borrow().clone()
    }

    /// Live membership flag for one story
    pub fn is_favorite(&self, story_id: &str) -> FavoriteFlag {
        FavoriteFlag {
            story_id: story_id.to_string(),
            rx: self.tx.subscribe(),
        }
    }
}

impl std::fmt::Debug for FavoriteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FavoriteStore")
            .field("db", &self.db)
            .field("count", &self.tx.borrow().len())
            .finish()
    }
}

/// Observes whether a single story is favorited
#[derive(Debug, Clone)]
pub struct FavoriteFlag {
    story_id: String,
    rx: watch::Receiver<Vec<FavoriteRecord>>,
}

impl FavoriteFlag {
    pub fn story_id(&self) -> &str {
        &self.story_id
    }

    /// Current value
    pub fn get(&self) -> bool {
        self.rx.borrow().iter().any(|r| r.story_id == self.story_id)
    }

    /// Wait for the next favorites change and return the new value.
    /// Errors once the store has been dropped.
    pub async fn changed(&mut self) -> Result<bool, watch::error::RecvError> {
        self.rx.changed().await?;
        Ok(self.get())
    }
}

fn query_all(conn: &Connection) -> rusqlite::Result<Vec<FavoriteRecord>> {
    // rowid breaks ties between records liked within the same millisecond;
    // REPLACE assigns a fresh rowid, so re-liking moves a story to the top
    let mut stmt = conn.prepare(
        "SELECT story_id, name, description, photo_url, lat, lon, created_at, liked_at
         FROM story_favorite
         ORDER BY liked_at DESC, rowid DESC",
    )?;

    let rows = stmt.query_map([], row_to_record)?;

    let mut records = Vec::new();
    for record in rows {
        records.push(record?);
    }

    Ok(records)
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<FavoriteRecord> {
    Ok(FavoriteRecord {
        story_id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        photo_url: row.get(3)?,
        lat: row.get(4)?,
        lon: row.get(5)?,
        created_at: row.get(6)?,
        liked_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story(id: &str) -> Story {
        Story {
            id: id.to_string(),
            name: "Dimas".into(),
            description: format!("story {}", id),
            photo_url: Some(format!("https://example.com/{}.jpg", id)),
            created_at: "2022-01-08T06:34:18.598Z".into(),
            lat: Some(-6.2),
            lon: Some(106.8),
        }
    }

    fn store() -> FavoriteStore {
        FavoriteStore::new(Database::open_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn test_add_then_remove_flips_membership() {
        let store = store();
        let flag = store.is_favorite("story-1");
        assert!(!flag.get());

        store.add(&story("story-1")).unwrap();
        assert!(flag.get());
        assert!(store.contains("story-1").unwrap());

        store.remove(&story("story-1")).unwrap();
        assert!(!flag.get());
        assert!(!store.contains("story-1").unwrap());
    }

    #[test]
    fn test_add_twice_keeps_one_record() {
        let store = store();
        store.add(&story("story-1")).unwrap();
        store.add(&story("story-1")).unwrap();

        let list = store.snapshot();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].story_id, "story-1");
    }

    #[test]
    fn test_list_is_most_recent_first() {
        let store = store();
        store.add(&story("a")).unwrap();
        store.add(&story("b")).unwrap();
        store.add(&story("c")).unwrap();
        // Re-liking moves it back to the top
        store.add(&story("a")).unwrap();

        let ids: Vec<String> = store.snapshot().into_iter().map(|r| r.story_id).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_favorites_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favorites.db");

        let store = FavoriteStore::new(Database::open(&path).unwrap()).unwrap();
        store.add(&story("story-1")).unwrap();
        drop(store);

        let reopened = FavoriteStore::new(Database::open(&path).unwrap()).unwrap();
        let list = reopened.snapshot();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].to_story(), story("story-1"));
    }

    #[test]
    fn test_concurrent_adds_publish_the_table() {
        for round in 0..50 {
            let store = store();
            let writers: Vec<_> = (0..4)
                .map(|t| {
                    let store = store.clone();
                    std::thread::spawn(move || {
                        for i in 0..5 {
                            store.add(&story(&format!("story-{}-{}", t, i))).unwrap();
                        }
                    })
                })
                .collect();
            for writer in writers {
                writer.join().unwrap();
            }

            let in_table = store.db.with_conn(|conn| query_all(conn)).unwrap();
            assert_eq!(in_table.len(), 20);
            assert_eq!(store.snapshot(), in_table, "round {}", round);
        }
    }

    #[tokio::test]
    async fn test_observers_see_mutations() {
        let store = store();
        let mut list = store.list();
        let mut flag = store.is_favorite("story-2");

        store.add(&story("story-2")).unwrap();

        list.changed().await.unwrap();
        assert_eq!(list.borrow().len(), 1);
        assert!(flag.changed().await.unwrap());

        store.remove_id("story-2").unwrap();
        assert!(!flag.changed().await.unwrap());
    }
}
