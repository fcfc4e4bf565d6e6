//! Google Calendar v3 sink.

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{CalendarError, CalendarSink, Credential};
use crate::plan::EventDescriptor;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

/// Inserts all-day events through the Calendar REST API.
#[derive(Debug)]
pub struct GoogleCalendar {
    base_url: String,
    client: reqwest::Client,
}

impl Default for GoogleCalendar {
    fn default() -> Self {
        Self::new()
    }
}

impl GoogleCalendar {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the client at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        )
    }
}

#[derive(Debug, Serialize)]
struct EventBody<'a> {
    summary: &'a str,
    description: &'a str,
    start: EventDate,
    end: EventDate,
}

#[derive(Debug, Serialize)]
struct EventDate {
    date: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct InsertedEvent {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorResponse {
    error: GoogleApiError,
}

#[derive(Debug, Deserialize)]
struct GoogleApiError {
    message: String,
}

/// All-day events end on the following (exclusive) date.
fn event_body(event: &EventDescriptor) -> EventBody<'_> {
    let end = event
        .date
        .checked_add_days(Days::new(1))
        .unwrap_or(event.date);
    EventBody {
        summary: &event.title,
        description: &event.description,
        start: EventDate { date: event.date },
        end: EventDate { date: end },
    }
}

fn parse_response(status: u16, body: &str) -> Result<String, CalendarError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<GoogleErrorResponse>(body)
            .map(|r| r.error.message)
            .unwrap_or_else(|_| body.to_string());
        return Err(CalendarError::Api { status, message });
    }
    serde_json::from_str::<InsertedEvent>(body)
        .map(|e| e.id)
        .map_err(|e| CalendarError::Parse(e.to_string()))
}

#[async_trait]
impl CalendarSink for GoogleCalendar {
    async fn insert_all_day_event(
        &self,
        credential: &Credential,
        event: &EventDescriptor,
    ) -> Result<String, CalendarError> {
        let response = self
            .client
            .post(self.events_url(&event.calendar_id))
            .bearer_auth(credential.access_token())
            .json(&event_body(event))
            .send()
            .await
            .map_err(|e| CalendarError::RequestFailed(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| CalendarError::RequestFailed(e.to_string()))?;

        parse_response(status, &body)
    }
}
