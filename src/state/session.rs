/// Persisted login session, observable through a watch channel
///
/// The three session fields are stored as separate preferences and written in
/// one batch. A session is only reported when all three are present.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use super::preferences::{PrefChange, Preferences};
use crate::error::StorageError;
use crate::model::Session;

const TOKEN_KEY: &str = "token";
const NAME_KEY: &str = "name";
const USER_ID_KEY: &str = "user_id";

/// Auth gate state derived from the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplashState {
    Unauthenticated,
    Authenticated,
}

#[derive(Clone)]
pub struct SessionStore {
    prefs: Preferences,
    tx: Arc<watch::Sender<Option<Session>>>,
}

impl SessionStore {
    /// Load whatever session is persisted and start publishing it
    pub fn new(prefs: Preferences) -> Result<Self, StorageError> {
        let initial = Self::read(&prefs)?;
        let (tx, _rx) = watch::channel(initial);
        Ok(Self {
            prefs,
            tx: Arc::new(tx),
        })
    }

    fn read(prefs: &Preferences) -> Result<Option<Session>, StorageError> {
        let values = prefs.get_many(&[TOKEN_KEY, NAME_KEY, USER_ID_KEY])?;
        match values.as_slice() {
            [Some(token), Some(name), Some(user_id)] => Ok(Some(Session {
                user_id: user_id.clone(),
                name: name.clone(),
                token: token.clone(),
            })),
            _ => Ok(None),
        }
    }

    pub fn save(&self, session: &Session) -> Result<(), StorageError> {
        self.prefs.edit(&[
            PrefChange::Set(TOKEN_KEY, &session.token),
            PrefChange::Set(NAME_KEY, &session.name),
            PrefChange::Set(USER_ID_KEY, &session.user_id),
        ])?;
        info!(user_id = %session.user_id, "Session saved");
        self.tx.send_replace(Some(session.clone()));
        Ok(())
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.prefs.edit(&[
            PrefChange::Remove(TOKEN_KEY),
            PrefChange::Remove(NAME_KEY),
            PrefChange::Remove(USER_ID_KEY),
        ])?;
        info!("Session cleared");
        self.tx.send_replace(None);
        Ok(())
    }

    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    /// Bearer token for outgoing requests, if logged in with a non-empty token
    pub fn token(&self) -> Option<String> {
        self.tx
            .borrow()
            .as_ref()
            .map(|s| s.token.clone())
            .filter(|t| !t.is_empty())
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }

    pub fn splash_state(&self) -> SplashState {
        match self.tx.borrow().as_ref() {
            Some(_) => SplashState::Authenticated,
            None => SplashState::Unauthenticated,
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("session", &*self.tx.borrow())
            .finish()
    }
}
