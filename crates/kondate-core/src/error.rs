//! Errors surfaced by one generation/submission cycle.

use chrono::NaiveDate;
use thiserror::Error;

use crate::calendar::CalendarError;
use crate::model::ModelError;

/// Failure of a generation or calendar-registration cycle.
///
/// Each variant renders as one sentence suitable for showing to the user.
/// None of them is retried automatically.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("plans cover 1 to 7 days, got {0}")]
    InvalidDuration(u8),

    /// Some day of the plan would fall past the last representable date.
    #[error("a {days}-day plan starting {start} runs past the end of the calendar")]
    DateOutOfRange { start: NaiveDate, days: usize },

    /// Calendar submission attempted without a signed-in identity.
    #[error("sign-in required: no calendar credential was provided")]
    MissingCredential,

    /// The generation call itself failed.
    #[error("meal plan generation failed: {0}")]
    ModelInvocationFailed(#[from] ModelError),

    /// The model replied, but no usable day content could be recovered.
    /// `raw` holds the fence-stripped reply for manual inspection.
    #[error("could not read the generated plan: {reason}")]
    MalformedOutput { reason: String, raw: String },

    /// A calendar insertion failed. Events before it stay inserted; the
    /// ones after it were never sent.
    #[error("calendar registration failed after {inserted_count} event(s) were added: {source}")]
    SubmissionFailed {
        inserted_count: usize,
        #[source]
        source: CalendarError,
    },
}

impl PlanError {
    /// Raw model text preserved by [`PlanError::MalformedOutput`].
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            Self::MalformedOutput { raw, .. } => Some(raw),
            _ => None,
        }
    }
}
