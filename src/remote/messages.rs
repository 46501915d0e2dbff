//! User-facing text for API failures, per endpoint
//!
//! The strings are what the app shows to users and are kept verbatim.

use crate::error::ApiError;

/// Which call failed; each maps HTTP statuses differently
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Login,
    Register,
    AddStory,
    Stories,
    StoryDetail,
}

impl Endpoint {
    fn status_message(self, status: u16) -> String {
        let mapped = match (self, status) {
            (Endpoint::Login, 401) => Some("Email atau password tidak valid"),
            (Endpoint::Login | Endpoint::Register, 500) => Some("Server error, coba lagi nanti"),
            (Endpoint::Register, 400) => Some("Email sudah terdaftar, coba lagi"),
            (Endpoint::AddStory, 400) => Some("Bad Request - Cek parameter"),
            (Endpoint::AddStory, 401) => Some("Unauthorized - Token expired"),
            (Endpoint::AddStory, 413) => Some("File terlalu besar (max 1MB)"),
            (Endpoint::AddStory, 415) => Some("File type tidak support"),
            (Endpoint::AddStory, 500) => Some("Server error"),
            _ => None,
        };

        match mapped {
            Some(message) => message.to_string(),
            None => match self {
                Endpoint::Login | Endpoint::Register => format!("Terjadi kesalahan ({})", status),
                _ => format!("Error ({})", status),
            },
        }
    }

    fn connection_message(self) -> &'static str {
        match self {
            Endpoint::Login | Endpoint::Register => "Tidak ada koneksi internet",
            _ => "No internet connection",
        }
    }

    fn fallback_message(self) -> &'static str {
        match self {
            Endpoint::Login => "Email dan Password tidak tepat",
            Endpoint::Register => "Register Gagal",
            Endpoint::AddStory => "Failed to add story",
            Endpoint::Stories | Endpoint::StoryDetail => "Terjadi Kesalahan",
        }
    }
}

/// The message to show for `err` raised by `endpoint`
pub fn user_message(err: &ApiError, endpoint: Endpoint) -> String {
    match err {
        ApiError::Status { status, .. } => endpoint.status_message(*status),
        ApiError::Connection(_) => endpoint.connection_message().to_string(),
        ApiError::Rejected(message) if !message.is_empty() => message.clone(),
        ApiError::Rejected(_) | ApiError::Decode(_) | ApiError::Request(_) => {
            endpoint.fallback_message().to_string()
        }
    }
}
