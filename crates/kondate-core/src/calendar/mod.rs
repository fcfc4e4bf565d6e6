//! Calendar insertion: the sink trait, its adapters, and the submitter.
//!
//! ```text
//! EventDescriptor[] --submit(sink, credential)--> sink.insert_all_day_event (one at a time)
//!                                                      |
//!                                                      +--> SubmitReport | PlanError::SubmissionFailed
//! ```

mod google;
mod recording;
mod submit;

pub use google::GoogleCalendar;
pub use recording::RecordingCalendar;
pub use submit::{SubmitReport, submit};

use async_trait::async_trait;
use thiserror::Error;

use crate::plan::EventDescriptor;

/// Errors from a single calendar insertion.
#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("calendar API returned error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("failed to parse calendar response: {0}")]
    Parse(String),
}

/// An authenticated caller: identity key plus opaque bearer token.
///
/// The token is never inspected beyond presence.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub user: String,
    access_token: String,
}

impl Credential {
    pub fn new(user: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            access_token: access_token.into(),
        }
    }

    /// Build a credential only when a non-blank token is present.
    pub fn from_parts(user: Option<String>, access_token: Option<String>) -> Option<Self> {
        let token = access_token.filter(|t| !t.trim().is_empty())?;
        Some(Self::new(user.unwrap_or_default(), token))
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("user", &self.user)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Destination for all-day events.
#[async_trait]
pub trait CalendarSink: Send + Sync {
    /// Insert one all-day event; returns the inserted event's identifier.
    async fn insert_all_day_event(
        &self,
        credential: &Credential,
        event: &EventDescriptor,
    ) -> Result<String, CalendarError>;
}
