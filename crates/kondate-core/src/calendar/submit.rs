//! Sequential, fail-fast submission of events.

use serde::Serialize;

use super::{CalendarSink, Credential};
use crate::error::PlanError;
use crate::plan::EventDescriptor;

/// Result of a fully successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReport {
    pub inserted_count: usize,
    /// Identifiers returned by the calendar, in submission order.
    pub event_ids: Vec<String>,
}

/// Insert `events` one at a time, in order.
///
/// Stops at the first failing insertion and returns
/// [`PlanError::SubmissionFailed`] with the number of events already
/// inserted. Those events are not rolled back and the remaining events are
/// never sent. Without a credential nothing is attempted and the result is
/// [`PlanError::MissingCredential`].
pub async fn submit(
    sink: &dyn CalendarSink,
    credential: Option<&Credential>,
    events: &[EventDescriptor],
) -> Result<SubmitReport, PlanError> {
    let credential = credential.ok_or(PlanError::MissingCredential)?;

    let mut report = SubmitReport::default();
    for (i, event) in events.iter().enumerate() {
        match sink.insert_all_day_event(credential, event).await {
            Ok(id) => {
                tracing::debug!(index = i, date = %event.date, id = %id, "event inserted");
                report.inserted_count += 1;
                report.event_ids.push(id);
            }
            Err(e) => {
                tracing::warn!(
                    index = i,
                    date = %event.date,
                    inserted = report.inserted_count,
                    skipped = events.len() - i - 1,
                    error = %e,
                    "calendar insertion failed; aborting remaining events"
                );
                return Err(PlanError::SubmissionFailed {
                    inserted_count: report.inserted_count,
                    source: e,
                });
            }
        }
    }

    tracing::info!(count = report.inserted_count, "calendar events inserted");
    Ok(report)
}
