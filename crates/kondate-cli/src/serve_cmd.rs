use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use kondate_core::PlanError;
use kondate_core::calendar::{CalendarSink, Credential, GoogleCalendar};
use kondate_core::model::{PlanModel, create_model};
use kondate_core::plan::{
    EventDescriptor, GenerationRequest, generate_plan, materialize_events, register_plan,
};
use kondate_core::settings::{
    FileSettingsStore, SettingsError, SettingsRecord, SettingsStore, load_settings, save_settings,
};

use crate::config::KondateConfig;

/// Header carrying the caller's identity key.
pub const USER_HEADER: &str = "x-kondate-user";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
    raw: Option<String>,
    details: Option<String>,
    inserted_count: Option<usize>,
}

impl AppError {
    fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
            raw: None,
            details: None,
            inserted_count: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}

impl From<PlanError> for AppError {
    fn from(err: PlanError) -> Self {
        let message = err.to_string();
        match err {
            PlanError::InvalidDuration(_) | PlanError::DateOutOfRange { .. } => {
                Self::bad_request(message)
            }
            PlanError::MissingCredential => Self::unauthorized(message),
            PlanError::ModelInvocationFailed(_) => Self::new(StatusCode::BAD_GATEWAY, message),
            PlanError::MalformedOutput { raw, .. } => Self {
                raw: Some(raw),
                ..Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
            },
            PlanError::SubmissionFailed {
                inserted_count,
                source,
            } => Self {
                details: Some(source.to_string()),
                inserted_count: Some(inserted_count),
                ..Self::internal("failed to register the plan on the calendar")
            },
        }
    }
}

impl From<SettingsError> for AppError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::Invalid(_) | SettingsError::InvalidIdentity(_) => {
                Self::bad_request(err.to_string())
            }
            SettingsError::Io { .. } => Self::internal(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let mut body = serde_json::json!({ "error": self.message });
        if let Some(raw) = self.raw {
            body["raw"] = raw.into();
        }
        if let Some(details) = self.details {
            body["details"] = details.into();
        }
        if let Some(count) = self.inserted_count {
            body["insertedCount"] = count.into();
        }
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    pub days: i64,
    #[serde(default)]
    pub request: String,
    pub start_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    pub days: Vec<String>,
    pub shopping_list: String,
    pub shortfall: usize,
    pub events: Vec<EventDescriptor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarRequest {
    pub days: Vec<String>,
    pub start_date: NaiveDate,
    pub calendar_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarResponse {
    pub success: bool,
    pub count: usize,
    pub event_ids: Vec<String>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Shared handles for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<dyn PlanModel>,
    pub calendar: Arc<dyn CalendarSink>,
    pub settings: Arc<dyn SettingsStore>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/plan", post(create_plan))
        .route("/api/calendar", post(register_calendar))
        .route("/api/settings", get(get_settings).post(put_settings))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(cfg: &KondateConfig, bind: &str, port: u16) -> Result<()> {
    let state = AppState {
        model: Arc::from(create_model(&cfg.model)?),
        calendar: Arc::new(GoogleCalendar::new()),
        settings: Arc::new(FileSettingsStore::new(&cfg.settings_dir)),
    };
    let app = build_router(state);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("kondate serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("kondate serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

fn user_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn bearer_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
}

/// Identity for the settings routes, which need both the user header and
/// a bearer token.
fn require_user(headers: &HeaderMap) -> Result<String, AppError> {
    let credential = Credential::from_parts(user_from(headers), bearer_from(headers))
        .filter(|c| !c.user.is_empty())
        .ok_or_else(|| AppError::unauthorized("sign-in required"))?;
    Ok(credential.user)
}

async fn settings_for(
    store: &dyn SettingsStore,
    user: Option<&str>,
) -> Result<SettingsRecord, AppError> {
    match user {
        Some(user) => Ok(load_settings(store, user).await?),
        None => Ok(SettingsRecord::default()),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn create_plan(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<PlanRequest>,
) -> Result<Json<PlanResponse>, AppError> {
    let days = u8::try_from(body.days).map_err(|_| {
        AppError::bad_request(format!("plans cover 1 to 7 days, got {}", body.days))
    })?;
    let user = user_from(&headers);
    let settings = settings_for(state.settings.as_ref(), user.as_deref()).await?;
    let calendar_id = settings.calendar_id.clone();

    let request = GenerationRequest::new(days, settings, body.request)?;
    let plan = generate_plan(state.model.as_ref(), &request).await?;

    let start = body
        .start_date
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let events = materialize_events(&plan.days, start, &calendar_id)?;
    let shortfall = plan.shortfall(days);

    Ok(Json(PlanResponse {
        days: plan.days,
        shopping_list: plan.shopping_list,
        shortfall,
        events,
    }))
}

async fn register_calendar(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CalendarRequest>,
) -> Result<Json<CalendarResponse>, AppError> {
    let user = user_from(&headers);
    let credential = Credential::from_parts(user.clone(), bearer_from(&headers));

    let calendar_id = match body.calendar_id.filter(|c| !c.trim().is_empty()) {
        Some(id) => id,
        None => {
            settings_for(state.settings.as_ref(), user.as_deref())
                .await?
                .calendar_id
        }
    };

    let report = register_plan(
        state.calendar.as_ref(),
        credential.as_ref(),
        &body.days,
        body.start_date,
        &calendar_id,
    )
    .await?;

    Ok(Json(CalendarResponse {
        success: true,
        count: report.inserted_count,
        event_ids: report.event_ids,
    }))
}

async fn get_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = require_user(&headers)?;
    let record = load_settings(state.settings.as_ref(), &user).await?;
    Ok(Json(record.to_value()?))
}

async fn put_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = require_user(&headers)?;
    let record = save_settings(state.settings.as_ref(), &user, body).await?;
    tracing::info!(user = %user, "settings saved");
    Ok(Json(record.to_value()?))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use kondate_core::calendar::RecordingCalendar;
    use kondate_core::model::FakeModel;

    // -----------------------------------------------------------------------
    // Fixtures
    // -----------------------------------------------------------------------

    struct Harness {
        state: AppState,
        calendar: Arc<RecordingCalendar>,
        _dir: TempDir,
    }

    fn harness_with(model: FakeModel, calendar: RecordingCalendar) -> Harness {
        let dir = TempDir::new().unwrap();
        let calendar = Arc::new(calendar);
        let state = AppState {
            model: Arc::new(model),
            calendar: calendar.clone(),
            settings: Arc::new(FileSettingsStore::new(dir.path())),
        };
        Harness {
            state,
            calendar,
            _dir: dir,
        }
    }

    fn harness() -> Harness {
        harness_with(FakeModel::default(), RecordingCalendar::new())
    }

    // -----------------------------------------------------------------------
    // HTTP helpers
    // -----------------------------------------------------------------------

    async fn send(
        state: &AppState,
        method: &str,
        uri: &str,
        headers: &[(&str, &str)],
        body: Option<serde_json::Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        build_router(state.clone()).oneshot(request).await.unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    // -----------------------------------------------------------------------
    // /api/plan
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn plan_returns_days_and_events() {
        let h = harness();
        let resp = send(
            &h.state,
            "POST",
            "/api/plan",
            &[],
            Some(json!({"days": 3, "request": "more fish", "startDate": "2024-01-30"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["days"].as_array().unwrap().len(), 3);
        assert_eq!(json["shortfall"], 0);
        assert!(json["shoppingList"].as_str().unwrap().contains("chicken thigh"));

        let events = json["events"].as_array().unwrap();
        assert_eq!(events[0]["date"], "2024-01-30");
        assert_eq!(events[2]["date"], "2024-02-01");
        assert_eq!(events[0]["title"], "[plan] Simmered chicken and daikon");
        assert_eq!(events[0]["calendarId"], "primary");
    }

    #[tokio::test]
    async fn plan_uses_stored_calendar_id() {
        let h = harness();
        save_settings(
            h.state.settings.as_ref(),
            "mama@example.com",
            json!({"calendarId": "meals"}),
        )
        .await
        .unwrap();

        let resp = send(
            &h.state,
            "POST",
            "/api/plan",
            &[(USER_HEADER, "mama@example.com")],
            Some(json!({"days": 1, "startDate": "2024-05-01"})),
        )
        .await;
        let json = body_json(resp).await;
        assert_eq!(json["events"][0]["calendarId"], "meals");
    }

    #[tokio::test]
    async fn plan_rejects_start_date_past_calendar_end() {
        let h = harness();
        let resp = send(
            &h.state,
            "POST",
            "/api/plan",
            &[],
            Some(json!({"days": 3, "startDate": "+262142-12-30"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn plan_rejects_bad_duration() {
        let h = harness();
        for days in [0, 8, -1, 300] {
            let resp = send(&h.state, "POST", "/api/plan", &[], Some(json!({"days": days}))).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "days = {days}");
        }
    }

    #[tokio::test]
    async fn plan_malformed_output_returns_raw() {
        let h = harness_with(
            FakeModel::with_response("```json\nnot json at all\n```"),
            RecordingCalendar::new(),
        );
        let resp = send(&h.state, "POST", "/api/plan", &[], Some(json!({"days": 2}))).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(resp).await;
        assert_eq!(json["raw"], "not json at all");
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn plan_model_failure_is_bad_gateway() {
        let h = harness_with(FakeModel::failing("quota exceeded"), RecordingCalendar::new());
        let resp = send(&h.state, "POST", "/api/plan", &[], Some(json!({"days": 2}))).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let json = body_json(resp).await;
        assert!(json["error"].as_str().unwrap().contains("quota exceeded"));
    }

    // -----------------------------------------------------------------------
    // /api/calendar
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn calendar_requires_bearer_token() {
        let h = harness();
        let resp = send(
            &h.state,
            "POST",
            "/api/calendar",
            &[(USER_HEADER, "mama@example.com")],
            Some(json!({"days": ["[menu]\nCurry"], "startDate": "2024-01-01"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(h.calendar.attempts(), 0);
    }

    #[tokio::test]
    async fn calendar_inserts_all_days() {
        let h = harness();
        let resp = send(
            &h.state,
            "POST",
            "/api/calendar",
            &[
                (USER_HEADER, "mama@example.com"),
                ("authorization", "Bearer token-123"),
            ],
            Some(json!({
                "days": ["[menu]\nCurry", "[menu]\nFish"],
                "startDate": "2024-02-28",
                "calendarId": "family"
            })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["count"], 2);

        let inserted = h.calendar.inserted();
        assert_eq!(inserted[1].date.to_string(), "2024-02-29");
        assert!(inserted.iter().all(|e| e.calendar_id == "family"));
    }

    #[tokio::test]
    async fn calendar_failure_reports_inserted_count() {
        let h = harness_with(FakeModel::default(), RecordingCalendar::failing_at(1));
        let resp = send(
            &h.state,
            "POST",
            "/api/calendar",
            &[("authorization", "Bearer t")],
            Some(json!({
                "days": ["[menu]\nA", "[menu]\nB", "[menu]\nC"],
                "startDate": "2024-01-01"
            })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        assert_eq!(json["insertedCount"], 1);
        assert!(json["details"].is_string());
        assert_eq!(h.calendar.attempts(), 2);
    }

    // -----------------------------------------------------------------------
    // /api/settings
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn settings_require_identity() {
        let h = harness();
        let resp = send(&h.state, "GET", "/api/settings", &[], None).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let resp = send(&h.state, "POST", "/api/settings", &[], Some(json!({}))).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn settings_require_bearer_token() {
        let h = harness();
        let header_only = [(USER_HEADER, "papa@example.com")];
        let resp = send(&h.state, "GET", "/api/settings", &header_only, None).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = send(
            &h.state,
            "POST",
            "/api/settings",
            &header_only,
            Some(json!({"adults": 5})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let stored = load_settings(h.state.settings.as_ref(), "papa@example.com")
            .await
            .unwrap();
        assert_eq!(stored.adults, 2);

        let token_only = [("authorization", "Bearer tok")];
        let resp = send(&h.state, "GET", "/api/settings", &token_only, None).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn settings_default_then_saved() {
        let h = harness();
        let who = [(USER_HEADER, "papa@example.com"), ("authorization", "Bearer tok")];

        let resp = send(&h.state, "GET", "/api/settings", &who, None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["adults"], 2);
        assert_eq!(json["calendarId"], "primary");

        let resp = send(
            &h.state,
            "POST",
            "/api/settings",
            &who,
            Some(json!({"adults": 3, "dislikes": "celery", "cookingMode": "manual"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send(&h.state, "GET", "/api/settings", &who, None).await;
        let json = body_json(resp).await;
        assert_eq!(json["adults"], 3);
        assert_eq!(json["dislikes"], "celery");
        assert_eq!(json["cookingMode"], "manual");
    }

    #[tokio::test]
    async fn settings_reject_invalid_payload() {
        let h = harness();
        let who = [(USER_HEADER, "papa@example.com"), ("authorization", "Bearer tok")];
        let resp = send(
            &h.state,
            "POST",
            "/api/settings",
            &who,
            Some(json!({"cookingMode": "microwave"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = send(&h.state, "GET", "/api/settings", &who, None).await;
        let json = body_json(resp).await;
        assert_eq!(json["cookingMode"], "official");
    }
}
