//! Normalization of raw model output into a fixed-shape plan.
//!
//! The model is asked for `{"days": [...], "shoppingList": "..."}` but
//! nothing guarantees it. [`normalize`] strips code fences, parses, repairs
//! a collapsed `days` array, drops blank entries, and truncates to the
//! requested duration. It never pads: a short plan is returned as-is and
//! the caller compares its length against the request.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::split::split_collapsed;
use crate::error::PlanError;

/// A plan ready for display and calendar materialization.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedPlan {
    /// Day entries in order; none is blank. At most the requested count.
    pub days: Vec<String>,
    /// The model's shopping list, or empty if it gave none.
    #[serde(default)]
    pub shopping_list: String,
}

impl NormalizedPlan {
    /// How many requested days the model failed to produce.
    pub fn shortfall(&self, requested: u8) -> usize {
        usize::from(requested).saturating_sub(self.days.len())
    }
}

/// Remove Markdown code-fence markers and surrounding whitespace.
pub fn clean_response(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// Normalize `raw` model output into at most `duration_days` day entries.
///
/// Fails with [`PlanError::MalformedOutput`] when the text is not JSON,
/// has no `days` array, or contains no non-blank day entry. The cleaned
/// text travels with the error so it can be shown to the user.
pub fn normalize(raw: &str, duration_days: u8) -> Result<NormalizedPlan, PlanError> {
    let cleaned = clean_response(raw);

    let parsed: Value = match serde_json::from_str(&cleaned) {
        Ok(v) => v,
        Err(e) => {
            return Err(PlanError::MalformedOutput {
                reason: format!("response is not valid JSON: {e}"),
                raw: cleaned,
            });
        }
    };

    let Some(entries) = parsed.get("days").and_then(Value::as_array) else {
        return Err(PlanError::MalformedOutput {
            reason: "response has no \"days\" array".to_string(),
            raw: cleaned,
        });
    };

    let mut days: Vec<String> = entries
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();

    // Collapse repair.
    if entries.len() == 1 && duration_days > 1 {
        if let Some(repair) = days.first().and_then(|d| split_collapsed(d)) {
            tracing::info!(
                separator = repair.separator,
                segments = repair.segments.len(),
                "split collapsed day entry"
            );
            days = repair.segments;
        }
    }

    days.retain(|d| !d.trim().is_empty());

    if days.is_empty() {
        return Err(PlanError::MalformedOutput {
            reason: "response contains no non-empty day entries".to_string(),
            raw: cleaned,
        });
    }

    let limit = usize::from(duration_days);
    if days.len() > limit {
        tracing::debug!(
            produced = days.len(),
            requested = limit,
            "truncating surplus day entries"
        );
        days.truncate(limit);
    }

    let shopping_list = match parsed.get("shoppingList") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::String(_)) | Some(Value::Null) | None => String::new(),
        Some(other) => {
            tracing::warn!(kind = %json_kind(other), "ignoring non-string shoppingList");
            String::new()
        }
    };

    Ok(NormalizedPlan {
        days,
        shopping_list,
    })
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
