/// Local state management module
///
/// This module handles all state that lives on the device:
/// - The SQLite connection and schema (database.rs)
/// - Key-value preferences (preferences.rs)
/// - The login session (session.rs)
/// - Favorited stories (favorites.rs)
/// - The view-state wrapper every async result is surfaced through (view.rs)

pub mod database;
pub mod favorites;
pub mod preferences;
pub mod session;
pub mod view;

pub use database::Database;
pub use favorites::{FavoriteFlag, FavoriteStore};
pub use preferences::Preferences;
pub use session::{SessionStore, SplashState};
pub use view::ViewState;
