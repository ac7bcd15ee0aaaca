use crate::core::card::cache::{etag_matches, CachedImage};
use crate::core::wakatime::{prepare_chart_data, project_cards};
use crate::domain::model::{ChartData, ContributionFormat, PresenceSnapshot, ProjectData};
use crate::domain::ports::PresenceSource;
use crate::server::error::error_body;
use crate::server::AppState;
use crate::utils::error::Result;
use axum::extract::{Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, ETAG, IF_NONE_MATCH, PRAGMA};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Instant;

static START_TIME: LazyLock<Instant> = LazyLock::new(Instant::now);

/// Touches the uptime clock so it starts with the router, not the first probe.
pub(super) fn start_clock() {
    LazyLock::force(&START_TIME);
}

fn image_response(headers: &HeaderMap, image: &CachedImage, cache_control: String) -> Response {
    let if_none_match = headers.get(IF_NONE_MATCH).and_then(|v| v.to_str().ok());
    if etag_matches(if_none_match, &image.etag) {
        return (
            StatusCode::NOT_MODIFIED,
            [(ETAG, image.etag.clone()), (CACHE_CONTROL, cache_control)],
        )
            .into_response();
    }

    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, "image/png".to_string()),
            (ETAG, image.etag.clone()),
            (CACHE_CONTROL, cache_control),
        ],
        image.bytes.as_ref().clone(),
    )
        .into_response()
}

pub async fn embed(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    let image = state.cards.embed().await?;
    Ok(image_response(&headers, &image, state.cards.cache_control()))
}

pub async fn avatar(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match state.cards.avatar().await {
        Ok(image) => image_response(&headers, &image, state.cards.cache_control()),
        Err(e) => {
            tracing::error!("Avatar proxy failed: {}", e);
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load avatar image")
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GithubParams {
    #[serde(default)]
    pub format: ContributionFormat,
}

pub async fn github(
    State(state): State<AppState>,
    Query(params): Query<GithubParams>,
) -> Result<Response> {
    let calendar = state.contributions.calendar(params.format).await?;
    Ok((
        [(CACHE_CONTROL, state.contributions.cache_control())],
        Json(calendar),
    )
        .into_response())
}

pub async fn presence(State(state): State<AppState>) -> Result<Json<PresenceSnapshot>> {
    Ok(Json(state.presence.snapshot().await?))
}

pub async fn wakatime(State(state): State<AppState>) -> Json<Option<ChartData>> {
    let stats = state.wakatime.fetch_stats_optional().await;
    Json(stats.map(|s| prepare_chart_data(&s.data.languages)))
}

pub async fn projects(State(state): State<AppState>) -> Json<Vec<ProjectData>> {
    let stats = state.wakatime.fetch_stats_optional().await;
    Json(project_cards(&state.config.profile.projects, stats.as_ref()))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime: u64,
    presence_cached: bool,
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let body = HealthResponse {
        status: "up",
        version: env!("CARGO_PKG_VERSION"),
        uptime: START_TIME.elapsed().as_secs(),
        presence_cached: state.presence.store().current().is_some(),
    };

    (
        [
            (CACHE_CONTROL, "no-store, no-cache, must-revalidate"),
            (PRAGMA, "no-cache"),
        ],
        Json(body),
    )
}
