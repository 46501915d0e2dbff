/// Preference-style key-value store on top of the `preferences` table
///
/// Values are plain strings. `edit` applies several writes in one transaction,
/// which is how the session is saved all-or-nothing.

use rusqlite::{params, OptionalExtension};

use super::database::Database;
use crate::error::StorageError;

/// Key for the id of the last story a notification was shown for
const LAST_NOTIFIED_STORY_ID: &str = "last_notified_story_id";

/// One pending change inside an `edit` batch
#[derive(Debug, Clone)]
pub enum PrefChange<'a> {
    Set(&'a str, &'a str),
    Remove(&'a str),
}

#[derive(Debug, Clone)]
pub struct Preferences {
    db: Database,
}

impl Preferences {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
        })
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.edit(&[PrefChange::Set(key, value)])
    }

    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.edit(&[PrefChange::Remove(key)])
    }

    /// Apply a batch of changes atomically
    pub fn edit(&self, changes: &[PrefChange<'_>]) -> Result<(), StorageError> {
        self.db.with_conn(|conn| {
            let tx = conn.transaction()?;
            for change in changes {
                match change {
                    PrefChange::Set(key, value) => {
                        tx.execute(
                            "INSERT OR REPLACE INTO preferences (key, value) VALUES (?1, ?2)",
                            params![key, value],
                        )?;
                    }
                    PrefChange::Remove(key) => {
                        tx.execute("DELETE FROM preferences WHERE key = ?1", params![key])?;
                    }
                }
            }
            tx.commit()
        })
    }

    /// Read several keys under one lock so the snapshot is consistent
    pub fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StorageError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT value FROM preferences WHERE key = ?1")?;
            let values = keys
                .iter()
                .map(|key| stmt.query_row(params![key], |row| row.get(0)).optional())
                .collect::<rusqlite::Result<Vec<Option<String>>>>();
            values
        })
    }

    pub fn last_notified_story_id(&self) -> Result<Option<String>, StorageError> {
        self.get(LAST_NOTIFIED_STORY_ID)
    }

    pub fn set_last_notified_story_id(&self, story_id: &str) -> Result<(), StorageError> {
        self.set(LAST_NOTIFIED_STORY_ID, story_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefs() -> Preferences {
        Preferences::new(Database::open_in_memory().unwrap())
    }

    #[test]
    fn test_set_get_remove() {
        let prefs = prefs();
        assert_eq!(prefs.get("theme").unwrap(), None);

        prefs.set("theme", "dark").unwrap();
        prefs.set("theme", "light").unwrap();
        assert_eq!(prefs.get("theme").unwrap().as_deref(), Some("light"));

        prefs.remove("theme").unwrap();
        assert_eq!(prefs.get("theme").unwrap(), None);
    }

    #[test]
    fn test_edit_batch_and_get_many() {
        let prefs = prefs();
        prefs
            .edit(&[PrefChange::Set("a", "1"), PrefChange::Set("b", "2")])
            .unwrap();

        let values = prefs.get_many(&["a", "b", "c"]).unwrap();
        assert_eq!(values, vec![Some("1".to_string()), Some("2".to_string()), None]);
    }

    #[test]
    fn test_last_notified_marker() {
        let prefs = prefs();
        assert_eq!(prefs.last_notified_story_id().unwrap(), None);
        prefs.set_last_notified_story_id("story-9").unwrap();
        assert_eq!(prefs.last_notified_story_id().unwrap().as_deref(), Some("story-9"));
    }
}
