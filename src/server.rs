//! Routes of the report front end: HTML pages, their JSON twins and the `/go` search box.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::models::*;
use crate::report::Reporter;
use crate::view::*;

// --- App State ---

struct AppState {
    reporter: Reporter,
}

type SharedState = Arc<AppState>;

#[derive(Deserialize, Debug)]
struct GoParams {
    #[serde(default)]
    query: String,
}

pub fn router(reporter: Reporter) -> Router {
    let state = Arc::new(AppState { reporter });

    Router::new()
        .route("/", get(show_index))
        .route("/go", get(go))
        .route("/report/:area/:id", get(report_page))
        .route("/associates/:object/for/:subject/:id", get(associates_page))
        .route("/lost/:scope/:scope_id/:subject/:id", get(lost_page))
        .route("/api/short/:area/:id", get(short_json))
        .route("/api/full/:area/:id", get(full_json))
        .route("/api/associates/:object/for/:subject/:id", get(associates_json))
        .route("/api/lost/:scope/:scope_id/:subject/:id", get(lost_json))
        .route("/api/object/:subject/:id", get(object_json))
        .route("/api/object/:subject/:id/:suffix", get(object_suffix_json))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}

// --- Pages ---

async fn show_index() -> Response {
    render(&IndexTemplate {
        query: String::new(),
    })
}

async fn go(State(state): State<SharedState>, Query(params): Query<GoParams>) -> Response {
    let query = params.query.trim();
    if let Some((area, id)) = parse_zkill_link(query) {
        return Redirect::to(&report_path(area, id)).into_response();
    }
    if query.is_empty() {
        return Redirect::to("/").into_response();
    }

    info!("Looking up: {}", query);
    match state.reporter.search(&[query.to_string()]).await {
        Ok(ids) => match ids.first_subject() {
            Some((area, id)) => Redirect::to(&report_path(area, id)).into_response(),
            None => {
                debug!("No match for {}", query);
                render_with(
                    StatusCode::NOT_FOUND,
                    &ErrorTemplate {
                        message: format!("Nothing found for \"{}\"", query),
                    },
                )
            }
        },
        Err(e) => PageError(e).into_response(),
    }
}

async fn report_page(
    State(state): State<SharedState>,
    Path((area, id)): Path<(Area, EntityId)>,
) -> Result<Response, PageError> {
    let report = state.reporter.full_report(area, id).await?;
    Ok(render(&ReportTemplate::from_report(&report)))
}

async fn associates_page(
    State(state): State<SharedState>,
    Path((object, subject, id)): Path<(Area, Area, EntityId)>,
) -> Result<Response, PageError> {
    let report = state.reporter.associates_report(object, subject, id).await?;
    Ok(render(&AssociatesTemplate::from_report(&report)))
}

async fn lost_page(
    State(state): State<SharedState>,
    Path((scope, scope_id, subject, id)): Path<(LostScope, EntityId, Area, EntityId)>,
) -> Result<Response, PageError> {
    let report = state
        .reporter
        .lost_report(scope, scope_id, subject, id)
        .await?;
    Ok(render(&LostTemplate::from_report(&report)))
}

// --- JSON ---

async fn short_json(
    State(state): State<SharedState>,
    Path((area, id)): Path<(Area, EntityId)>,
) -> Result<Json<ShortReport>, ApiError> {
    Ok(Json(state.reporter.short_report(area, id).await?))
}

async fn full_json(
    State(state): State<SharedState>,
    Path((area, id)): Path<(Area, EntityId)>,
) -> Result<Json<FullReport>, ApiError> {
    Ok(Json(state.reporter.full_report(area, id).await?))
}

async fn associates_json(
    State(state): State<SharedState>,
    Path((object, subject, id)): Path<(Area, Area, EntityId)>,
) -> Result<Json<AssociatesReport>, ApiError> {
    Ok(Json(
        state.reporter.associates_report(object, subject, id).await?,
    ))
}

async fn lost_json(
    State(state): State<SharedState>,
    Path((scope, scope_id, subject, id)): Path<(LostScope, EntityId, Area, EntityId)>,
) -> Result<Json<LostReport>, ApiError> {
    Ok(Json(
        state
            .reporter
            .lost_report(scope, scope_id, subject, id)
            .await?,
    ))
}

/// Segments forwarded into a game-data URL: `[a-z0-9_]+`.
fn is_path_word(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

async fn object_json(
    State(state): State<SharedState>,
    Path((subject, id)): Path<(String, EntityId)>,
) -> Result<Response, ApiError> {
    if !is_path_word(&subject) {
        return Ok(StatusCode::NOT_FOUND.into_response());
    }
    let object: Value = state.reporter.object(&subject, id, None).await?;
    Ok(Json(object).into_response())
}

async fn object_suffix_json(
    State(state): State<SharedState>,
    Path((subject, id, suffix)): Path<(String, EntityId, String)>,
) -> Result<Response, ApiError> {
    if !is_path_word(&subject) || !is_path_word(&suffix) {
        return Ok(StatusCode::NOT_FOUND.into_response());
    }
    let object: Value = state.reporter.object(&subject, id, Some(&suffix)).await?;
    Ok(Json(object).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_words() {
        assert!(is_path_word("characters"));
        assert!(is_path_word("corporation_history"));
        assert!(is_path_word("v4"));
        assert!(!is_path_word(""));
        assert!(!is_path_word("Characters"));
        assert!(!is_path_word("../names"));
        assert!(!is_path_word("a b"));
    }
}
