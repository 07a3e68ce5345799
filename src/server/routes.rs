use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::AppError;
use super::state::AppState;
use crate::news::{NewsPage, DEFAULT_PAGE_SIZE};
use crate::waitlist::JoinOutcome;

const REPORT_DOWNLOAD_NAME: &str = "SentinelAI_Sample_Report.pdf";

pub async fn root_handler() -> Json<Value> {
    Json(json!({ "message": "SentinelAI Backend is running" }))
}

pub async fn hello_handler() -> Json<Value> {
    Json(json!({ "message": "Hello from the backend API!" }))
}

/// Liveness plus a quick look at waitlist, report and feed health.
pub async fn status_handler(State(state): State<AppState>) -> Json<Value> {
    let has_report = tokio::fs::try_exists(state.report_path())
        .await
        .unwrap_or(false);
    let snapshot = state.news.last_snapshot().await;

    Json(json!({
        "backend": "running",
        "waitlist_count": state.waitlist.count().await,
        "has_report": has_report,
        "news": {
            "cached_items": snapshot.as_ref().map_or(0, |s| s.items.len()),
            "feeds_configured": state.news.feed_count(),
            "feed_failures_total": state.news.failures_total(),
            "last_refresh": snapshot.as_ref().map(|s| s.report.summary()),
        },
    }))
}

#[derive(Debug, Deserialize)]
pub struct NewsQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size", alias = "limit")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE as i64
}

/// Feeds that fail simply contribute no items; only a malformed query
/// string is an error.
pub async fn news_handler(
    State(state): State<AppState>,
    query: Result<Query<NewsQuery>, QueryRejection>,
) -> Result<Json<NewsPage>, AppError> {
    let Query(query) = query?;
    Ok(Json(state.news.page(query.page, query.page_size).await))
}

#[derive(Debug, Deserialize)]
pub struct WaitlistRequest {
    pub email: String,
}

pub async fn waitlist_handler(
    State(state): State<AppState>,
    payload: Result<Json<WaitlistRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(payload) = payload?;
    let body = match state.waitlist.join(&payload.email).await? {
        JoinOutcome::AlreadyListed => json!({
            "status": "exists",
            "message": "You're already on the list.",
        }),
        JoinOutcome::Added => json!({
            "status": "ok",
            "message": "Thanks! You're on the early access list.",
        }),
    };
    Ok(Json(body))
}

pub async fn report_handler(State(state): State<AppState>) -> Result<Response, AppError> {
    let path = state.report_path();
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "Sample report missing");
            return Err(AppError::ReportNotFound);
        }
        Err(e) => return Err(AppError::Internal(e.to_string())),
    };

    let disposition = format!("attachment; filename=\"{REPORT_DOWNLOAD_NAME}\"");
    Ok((
        [
            (CONTENT_TYPE, "application/pdf".to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
