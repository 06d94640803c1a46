use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use chrono::Utc;

use crate::auth;
use crate::error::ApiError;
use crate::metrics::COMMENTS_POSTED;
use crate::models::{Comment, CommentRequest};
use crate::rate_limit::{self, ActionKind};
use crate::state::AppState;
use crate::validate;

pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    if state.db.listing(id).await?.is_none() {
        return Err(ApiError::NotFound("listing not found".into()));
    }
    Ok(Json(state.db.comments(id).await?))
}

pub async fn post_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<CommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let agent = auth::require_agent(&state.db, &headers).await?;
    if state.db.listing(id).await?.is_none() {
        return Err(ApiError::NotFound("listing not found".into()));
    }

    let now = Utc::now();
    if !rate_limit::allow(&state.db, agent.id, ActionKind::Comment, state.ceilings.comment, now)
        .await?
    {
        return Err(ApiError::Throttled(format!(
            "rate limit exceeded, max {} comments per hour",
            state.ceilings.comment
        )));
    }

    let body = req.body.trim();
    validate::comment_body(body)?;

    let comment = state.db.insert_comment(id, &agent, body, now).await?;
    rate_limit::record(&state.db, agent.id, ActionKind::Comment, now).await?;
    COMMENTS_POSTED.inc();

    Ok((StatusCode::CREATED, Json(comment)))
}
