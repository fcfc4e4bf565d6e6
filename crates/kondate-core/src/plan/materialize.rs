//! Event materialization: day entries to all-day calendar events.

use std::sync::LazyLock;

use chrono::{Days, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::settings::DEFAULT_CALENDAR_ID;

/// Prefix on every event title so plan events are recognizable.
pub const TITLE_PREFIX: &str = "[plan]";

/// Title used when no menu heading is found.
pub const UNTITLED: &str = "(untitled)";

/// Menu heading (`[menu]`, `[menu name]`, `【メニュー】`, `【メニュー名】`)
/// followed by the dish name, either on the same line or the next one.
static MENU_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\[\s*menu(?:\s+name)?\s*\]|【メニュー(?:名)?】)[ \t]*\r?\n?[ \t]*(\S[^\r\n]*)")
        .expect("menu title pattern is valid")
});

/// One all-day event ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDescriptor {
    /// Serialized as `YYYY-MM-DD`.
    pub date: NaiveDate,
    pub title: String,
    /// The full day entry, verbatim.
    pub description: String,
    pub calendar_id: String,
}

/// Extract the event title from a day entry.
pub fn extract_title(day: &str) -> String {
    match MENU_TITLE
        .captures(day)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|t| !t.is_empty())
    {
        Some(name) => format!("{TITLE_PREFIX} {name}"),
        None => format!("{TITLE_PREFIX} {UNTITLED}"),
    }
}

/// Assign consecutive dates from `start` to `days`, in order.
///
/// Event `i` falls on `start + i` calendar days. A blank `calendar_id`
/// targets the primary calendar. Fails with
/// [`PlanError::DateOutOfRange`] if any date would overflow the calendar,
/// so a plan is never silently shortened.
pub fn materialize_events(
    days: &[String],
    start: NaiveDate,
    calendar_id: &str,
) -> Result<Vec<EventDescriptor>, PlanError> {
    let calendar_id = if calendar_id.trim().is_empty() {
        DEFAULT_CALENDAR_ID
    } else {
        calendar_id
    };

    days.iter()
        .enumerate()
        .map(|(i, day)| {
            let date = start
                .checked_add_days(Days::new(i as u64))
                .ok_or(PlanError::DateOutOfRange {
                    start,
                    days: days.len(),
                })?;
            Ok(EventDescriptor {
                date,
                title: extract_title(day),
                description: day.clone(),
                calendar_id: calendar_id.to_string(),
            })
        })
        .collect()
}
