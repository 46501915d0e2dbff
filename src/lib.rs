//! Client core for the story-sharing service
//!
//! Everything except rendering: the story API client, the local session and
//! favorites stores, feed pagination, place-name resolution, photo preparation
//! and the view-state aggregators the UI observes.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod feed;
pub mod format;
pub mod location;
pub mod model;
pub mod notify;
pub mod photo;
pub mod remote;
pub mod state;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{ClientError, Result};
