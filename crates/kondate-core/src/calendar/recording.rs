//! In-memory calendar sink for tests and dry runs.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{CalendarError, CalendarSink, Credential};
use crate::plan::EventDescriptor;

/// Records every insertion; optionally fails at a given attempt index.
#[derive(Debug, Default)]
pub struct RecordingCalendar {
    fail_at: Option<usize>,
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    attempts: usize,
    inserted: Vec<EventDescriptor>,
}

impl RecordingCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the insertion attempt with 0-based index `index`.
    pub fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            state: Mutex::default(),
        }
    }

    /// Events inserted successfully, in order.
    pub fn inserted(&self) -> Vec<EventDescriptor> {
        self.state
            .lock()
            .map(|s| s.inserted.clone())
            .unwrap_or_default()
    }

    /// Number of insertion attempts, successful or not.
    pub fn attempts(&self) -> usize {
        self.state.lock().map(|s| s.attempts).unwrap_or_default()
    }
}

#[async_trait]
impl CalendarSink for RecordingCalendar {
    async fn insert_all_day_event(
        &self,
        _credential: &Credential,
        event: &EventDescriptor,
    ) -> Result<String, CalendarError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| CalendarError::RequestFailed(e.to_string()))?;
        let index = state.attempts;
        state.attempts += 1;

        if self.fail_at == Some(index) {
            return Err(CalendarError::Api {
                status: 500,
                message: format!("simulated failure on event {index}"),
            });
        }

        state.inserted.push(event.clone());
        Ok(format!("evt-{index}"))
    }
}
