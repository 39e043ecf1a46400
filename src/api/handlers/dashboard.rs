use crate::api::schemas::{error_response, ApiError, AppState, SeriesQuery};
use crate::core::dashboard::{parse_plot_bound, CurrentView, SeriesRequest, SeriesView};
use crate::domain::ports::Storage;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
};
use chrono::{NaiveDateTime, Utc};
use tracing::{debug, instrument};

const DASHBOARD_PAGE: &str = include_str!("../../../assets/dashboard.html");

/// The page, with refresh intervals from `[dashboard]` filled in.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let dashboard = &state.config.dashboard;
    Html(
        DASHBOARD_PAGE
            .replace("__STATION_NAME__", &html_escape(&state.config.location.name))
            .replace("__GAUGES_MS__", &(dashboard.gauges_refresh_seconds * 1000).to_string())
            .replace("__SERIES_MS__", &(dashboard.series_refresh_seconds * 1000).to_string()),
    )
}

fn html_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[instrument(skip(state))]
pub async fn current(State(state): State<AppState>) -> Result<Json<CurrentView>, ApiError> {
    let view = state.dashboard.current(Utc::now()).await?;
    Ok(Json(view))
}

fn bound(raw: Option<&str>, name: &str) -> Result<Option<NaiveDateTime>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => parse_plot_bound(raw).map(Some).ok_or_else(|| {
            error_response(
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                format!("'{}' is not a date-time: {}", name, raw),
            )
        }),
    }
}

/// Chart data for `[start, end]` (local time), defaulting to yesterday through tomorrow.
#[instrument(skip(state))]
pub async fn series(
    State(state): State<AppState>,
    Query(query): Query<SeriesQuery>,
) -> Result<Json<SeriesView>, ApiError> {
    let request = SeriesRequest {
        start: bound(query.start.as_deref(), "start")?,
        end: bound(query.end.as_deref(), "end")?,
    };
    let view = state.dashboard.series(Utc::now(), &request).await?;
    debug!(
        "Series {} .. {}: {} observed, {} predicted",
        view.window.start,
        view.window.end,
        view.observed.len(),
        view.predicted.len()
    );
    Ok(Json(view))
}

pub async fn radar(State(state): State<AppState>) -> Result<Response, ApiError> {
    let path = &state.config.storage.radar_file;
    if !state.storage.exists(path).await {
        return Err(error_response(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "no radar image has been downloaded yet",
        ));
    }
    let bytes = state.storage.read_file(path).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "image/gif"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        bytes,
    )
        .into_response())
}
