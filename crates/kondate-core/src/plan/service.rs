//! One generation/registration cycle, end to end.
//!
//! Strictly sequential: prompt, model call, normalize; then materialize
//! and submit events one at a time. Nothing here retries.

use chrono::NaiveDate;

use super::materialize::materialize_events;
use super::normalize::{NormalizedPlan, normalize};
use super::prompt::{GenerationRequest, build_prompt};
use crate::calendar::{CalendarSink, Credential, SubmitReport, submit};
use crate::error::PlanError;
use crate::model::PlanModel;

/// Build the prompt for `request`, call the model, and normalize the reply.
///
/// A plan with fewer days than requested is returned as-is; compare
/// [`NormalizedPlan::shortfall`] against the request to detect it.
pub async fn generate_plan(
    model: &dyn PlanModel,
    request: &GenerationRequest,
) -> Result<NormalizedPlan, PlanError> {
    let prompt = build_prompt(request);
    let requested = request.duration_days();

    tracing::info!(
        provider = model.provider_name(),
        model = model.model_name(),
        days = requested,
        "requesting meal plan"
    );
    let raw = model.generate(&prompt).await?;
    tracing::debug!(bytes = raw.len(), "model replied");

    let plan = normalize(&raw, requested)?;
    let shortfall = plan.shortfall(requested);
    if shortfall > 0 {
        tracing::warn!(
            requested,
            produced = plan.days.len(),
            "model produced fewer days than requested"
        );
    }
    Ok(plan)
}

/// Materialize `days` from `start` onto `calendar_id` and submit them.
///
/// See [`submit`] for the fail-fast policy.
pub async fn register_plan(
    sink: &dyn CalendarSink,
    credential: Option<&Credential>,
    days: &[String],
    start: NaiveDate,
    calendar_id: &str,
) -> Result<SubmitReport, PlanError> {
    if credential.is_none() {
        return Err(PlanError::MissingCredential);
    }
    let events = materialize_events(days, start, calendar_id)?;
    tracing::info!(events = events.len(), %start, calendar_id, "registering plan");
    submit(sink, credential, &events).await
}
