//! Login/register form state and the session lifecycle

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::StorageError;
use crate::model::{ApiMessage, LoginRequest, RegisterRequest, Session};
use crate::remote::{user_message, Endpoint, StoryApi};
use crate::state::{SessionStore, SplashState, ViewState};

// Accounts are limited to gmail addresses
static GMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9+_.-]+@gmail\.com$").expect("hardcoded gmail regex is invalid")
});

const MIN_NAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 8;

pub fn is_valid_gmail(input: &str) -> bool {
    GMAIL_REGEX.is_match(input)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_visible: bool,

    pub name_error: Option<String>,
    pub email_error: Option<String>,
    pub password_error: Option<String>,

    pub auth: ViewState<Session>,
    pub register: ViewState<ApiMessage>,
}

#[derive(Clone)]
pub struct AuthAggregator {
    api: Arc<dyn StoryApi>,
    session: SessionStore,
    state: Arc<watch::Sender<AuthState>>,
}

impl AuthAggregator {
    pub fn new(api: Arc<dyn StoryApi>, session: SessionStore) -> Self {
        let (state, _rx) = watch::channel(AuthState::default());
        Self {
            api,
            session,
            state: Arc::new(state),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    fn update(&self, f: impl FnOnce(&mut AuthState)) {
        self.state.send_modify(f);
    }

    /// Whether the app should open on the login screen or the feed
    pub fn splash_state(&self) -> SplashState {
        self.session.splash_state()
    }

    pub fn session(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }

    // ========== Form ==========

    pub fn on_name_change(&self, name: &str) {
        let error = (!name.is_empty() && name.chars().count() < MIN_NAME_LEN)
            .then(|| "Nama minimal 3 digit".to_string());
        self.update(|s| {
            s.name = name.to_string();
            s.name_error = error;
        });
    }

    pub fn on_email_change(&self, email: &str) {
        let error = (!email.is_empty() && !is_valid_gmail(email)).then(|| "Email tidak valid".to_string());
        self.update(|s| {
            s.email = email.to_string();
            s.email_error = error;
        });
    }

    pub fn on_password_change(&self, password: &str) {
        let error = (!password.is_empty() && password.chars().count() < MIN_PASSWORD_LEN)
            .then(|| "Password minimal 8 karakter".to_string());
        self.update(|s| {
            s.password = password.to_string();
            s.password_error = error;
        });
    }

    pub fn toggle_password_visibility(&self) {
        self.update(|s| s.password_visible = !s.password_visible);
    }

    pub fn clear_form(&self) {
        self.update(|s| {
            s.name.clear();
            s.email.clear();
            s.password.clear();
        });
    }

    // ========== Session ==========

    /// Log in with the email and password in the form. A successful login is
    /// persisted before it is reported.
    pub async fn login(&self) {
        self.update(|s| s.auth = ViewState::Loading);

        let request = {
            let s = self.state.borrow();
            LoginRequest {
                email: s.email.clone(),
                password: s.password.clone(),
            }
        };

        let session = match self.api.login(&request).await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Login failed");
                let message = user_message(&e, Endpoint::Login);
                self.update(|s| s.auth = ViewState::Error(message));
                return;
            }
        };

        match self.session.save(&session) {
            Ok(()) => {
                info!(user_id = %session.user_id, "Logged in");
                self.update(|s| s.auth = ViewState::Success(session));
            }
            Err(e) => self.update(|s| s.auth = ViewState::Error(e.to_string())),
        }
    }

    pub async fn register(&self) {
        self.update(|s| s.register = ViewState::Loading);

        let request = {
            let s = self.state.borrow();
            RegisterRequest {
                name: s.name.clone(),
                email: s.email.clone(),
                password: s.password.clone(),
            }
        };

        match self.api.register(&request).await {
            Ok(response) => {
                info!("Account registered");
                self.update(|s| s.register = ViewState::Success(response));
            }
            Err(e) => {
                warn!(error = %e, "Register failed");
                let message = user_message(&e, Endpoint::Register);
                self.update(|s| s.register = ViewState::Error(message));
            }
        }
    }

    /// Show the stored session on the profile screen
    pub fn load_profile(&self) {
        let auth = match self.session.current() {
            Some(session) => ViewState::Success(session),
            None => ViewState::Error("Session not found".to_string()),
        };
        self.update(|s| s.auth = auth);
    }

    pub fn logout(&self) -> Result<(), StorageError> {
        self.session.clear()?;
        self.update(|s| s.auth = ViewState::Idle);
        Ok(())
    }
}

impl std::fmt::Debug for AuthAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthAggregator")
            .field("session", &self.session)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::state::{Database, Preferences};
    use crate::testing::FakeApi;

    fn fixture() -> (Arc<FakeApi>, SessionStore, AuthAggregator) {
        let api = Arc::new(FakeApi::with_stories(0));
        let session = SessionStore::new(Preferences::new(Database::open_in_memory().unwrap())).unwrap();
        let auth = AuthAggregator::new(api.clone(), session.clone());
        (api, session, auth)
    }

    #[test]
    fn test_field_validation() {
        let (_, _, auth) = fixture();

        auth.on_name_change("Al");
        auth.on_email_change("someone@yahoo.com");
        auth.on_password_change("short");
        let state = auth.state();
        assert_eq!(state.name_error.as_deref(), Some("Nama minimal 3 digit"));
        assert_eq!(state.email_error.as_deref(), Some("Email tidak valid"));
        assert_eq!(state.password_error.as_deref(), Some("Password minimal 8 karakter"));

        auth.on_name_change("Alya");
        auth.on_email_change("alya.p+story@gmail.com");
        auth.on_password_change("longenough");
        let state = auth.state();
        assert_eq!(state.name_error, None);
        assert_eq!(state.email_error, None);
        assert_eq!(state.password_error, None);

        // Empty fields carry no error
        auth.on_email_change("");
        assert_eq!(auth.state().email_error, None);
    }

    #[tokio::test]
    async fn test_login_saves_session() {
        let (_, session, auth) = fixture();
        assert_eq!(auth.splash_state(), SplashState::Unauthenticated);

        auth.on_email_change("alya@gmail.com");
        auth.on_password_change("password123");
        auth.login().await;

        let state = auth.state();
        let logged_in = state.auth.data().unwrap();
        assert_eq!(logged_in.name, "alya");
        assert_eq!(session.current().as_ref(), Some(logged_in));
        assert_eq!(auth.splash_state(), SplashState::Authenticated);
    }

    #[tokio::test]
    async fn test_login_error_messages() {
        let (api, session, auth) = fixture();

        api.fail_next("login", ApiError::Status { status: 401, message: None });
        auth.login().await;
        assert_eq!(auth.state().auth, ViewState::Error("Email atau password tidak valid".into()));

        api.fail_next("login", ApiError::Connection("offline".into()));
        auth.login().await;
        assert_eq!(auth.state().auth, ViewState::Error("Tidak ada koneksi internet".into()));

        assert_eq!(session.current(), None);
    }

    #[tokio::test]
    async fn test_register_outcomes() {
        let (api, _, auth) = fixture();
        auth.on_name_change("Alya");
        auth.on_email_change("alya@gmail.com");
        auth.on_password_change("password123");

        auth.register().await;
        assert!(matches!(auth.state().register, ViewState::Success(ref m) if m.message == "User Created"));

        api.fail_next("register", ApiError::Status { status: 400, message: None });
        auth.register().await;
        assert_eq!(auth.state().register, ViewState::Error("Email sudah terdaftar, coba lagi".into()));

        api.fail_next("register", ApiError::Rejected("\"password\" length must be at least 8".into()));
        auth.register().await;
        assert_eq!(
            auth.state().register,
            ViewState::Error("\"password\" length must be at least 8".into())
        );
    }

    #[tokio::test]
    async fn test_profile_and_logout() {
        let (_, _, auth) = fixture();
        auth.load_profile();
        assert_eq!(auth.state().auth, ViewState::Error("Session not found".into()));

        auth.on_email_change("alya@gmail.com");
        auth.login().await;
        auth.load_profile();
        assert!(auth.state().auth.data().is_some());

        let mut session = auth.session();
        auth.logout().unwrap();
        session.changed().await.unwrap();
        assert!(session.borrow().is_none());
        assert_eq!(auth.state().auth, ViewState::Idle);
        assert_eq!(auth.splash_state(), SplashState::Unauthenticated);
    }

    #[test]
    fn test_clear_form_and_visibility() {
        let (_, _, auth) = fixture();
        auth.on_name_change("Alya");
        auth.on_email_change("alya@gmail.com");
        auth.toggle_password_visibility();
        auth.clear_form();

        let state = auth.state();
        assert!(state.name.is_empty() && state.email.is_empty() && state.password.is_empty());
        assert!(state.password_visible);
    }
}
