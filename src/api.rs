use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::auth::{self, LoginError, LoginRequest, UserProfile};
use crate::config::Settings;
use crate::dashboard::{self, DemoDashboard, NarrativeDashboard};
use crate::pipeline::{MarketPipeline, PipelineError, SnapshotView};

pub const PROVENANCE_HEADER: &str = "X-Snapshot-Provenance";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: MarketPipeline,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(pipeline: MarketPipeline, settings: Settings) -> Self {
        Self {
            pipeline,
            settings: Arc::new(settings),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/snapshot/{source_id}", get(get_snapshot))
        .route("/snapshot/{source_id}/refresh", post(refresh_snapshot))
        .route("/dashboard", get(get_dashboard))
        .route("/dashboard/demo", get(get_demo))
        .route("/login", post(login))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

enum ApiError {
    Pipeline(PipelineError),
    /// A dashboard needs a source the pipeline was not built with.
    Misconfigured(PipelineError),
    Login(LoginError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::Pipeline(e @ PipelineError::UnknownSource(_)) => {
                (StatusCode::NOT_FOUND, e.to_string())
            }
            ApiError::Misconfigured(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::Login(e) => (StatusCode::UNAUTHORIZED, e.to_string()),
        };
        (status, Json(json!({ "error": msg }))).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        ApiError::Pipeline(e)
    }
}

/// 200 with a payload, 503 in the no-data state. The provenance header is
/// always set so degraded data is never mistaken for live.
fn snapshot_response(view: SnapshotView) -> Response {
    let status = if view.is_no_data() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    let label = view.provenance_label();
    let mut resp = (status, Json(view)).into_response();
    resp.headers_mut()
        .insert(PROVENANCE_HEADER, HeaderValue::from_static(label));
    resp
}

async fn get_snapshot(
    State(state): State<AppState>,
    Path(source_id): Path<String>,
) -> Result<Response, ApiError> {
    let view = state.pipeline.get_snapshot(&source_id).await?;
    Ok(snapshot_response(view))
}

async fn refresh_snapshot(
    State(state): State<AppState>,
    Path(source_id): Path<String>,
) -> Result<Response, ApiError> {
    let view = state.pipeline.refresh(&source_id).await?;
    Ok(snapshot_response(view))
}

async fn get_dashboard(State(state): State<AppState>) -> Result<Json<NarrativeDashboard>, ApiError> {
    let s = &state.settings;
    let d = dashboard::build_dashboard(
        &state.pipeline,
        &s.market_data.pulse_layout(),
        s.signal.high_confidence_threshold,
    )
    .await
    .map_err(ApiError::Misconfigured)?;
    Ok(Json(d))
}

async fn get_demo(State(state): State<AppState>) -> Result<Json<DemoDashboard>, ApiError> {
    let d = dashboard::build_demo(&state.pipeline, &state.settings.market_data.silver_symbol)
        .await
        .map_err(ApiError::Misconfigured)?;
    Ok(Json(d))
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    auth::login(&body, &state.settings.login.email_suffix)
        .map(Json)
        .map_err(|e| {
            tracing::info!(target: "auth", reason = %e, "login rejected");
            ApiError::Login(e)
        })
}
