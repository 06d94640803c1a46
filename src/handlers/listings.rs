use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use chrono::Utc;
use serde::Deserialize;

use crate::auth;
use crate::error::ApiError;
use crate::metrics::{LISTINGS_SUBMITTED, VOTES_CAST};
use crate::models::{Listing, SubmitRequest, VoteRequest};
use crate::rate_limit::{self, ActionKind};
use crate::state::AppState;
use crate::validate;
use crate::votes::{self, VoteDirection};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

pub async fn list_listings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<Listing>>, ApiError> {
    let q = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let limit = params.limit.filter(|l| (1..=100).contains(l)).unwrap_or(50);
    let offset = params.offset.filter(|o| *o >= 0).unwrap_or(0);
    Ok(Json(state.db.listings(q, limit, offset).await?))
}

pub async fn get_listing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Listing>, ApiError> {
    state
        .db
        .listing(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("listing not found".into()))
}

pub async fn submit_listing(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SubmitRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let agent = auth::require_agent(&state.db, &headers).await?;
    let now = Utc::now();

    if !rate_limit::allow(&state.db, agent.id, ActionKind::Submit, state.ceilings.submit, now)
        .await?
    {
        return Err(ApiError::Throttled(format!(
            "rate limit exceeded, max {} listing submissions per hour",
            state.ceilings.submit
        )));
    }

    let name = req.name.trim();
    let url = req.url.trim();
    let description = req.description.trim();
    validate::listing_input(name, url, description)?;

    if let Some(existing) = state.db.listing_id_by_url(url).await? {
        return Err(ApiError::Conflict(format!(
            "listing with this URL already exists (id: {existing})"
        )));
    }

    let id = state
        .db
        .insert_listing(name, url, description, &agent, now)
        .await?;
    rate_limit::record(&state.db, agent.id, ActionKind::Submit, now).await?;
    LISTINGS_SUBMITTED.inc();
    tracing::info!("agent {} submitted listing {id}", agent.name);

    let listing = state
        .db
        .listing(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("listing not found".into()))?;
    Ok((StatusCode::CREATED, Json(listing)))
}

pub async fn vote_listing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<VoteRequest>,
) -> Result<Json<Listing>, ApiError> {
    let agent = auth::require_agent(&state.db, &headers).await?;
    let now = Utc::now();

    if !rate_limit::allow(&state.db, agent.id, ActionKind::Vote, state.ceilings.vote, now).await? {
        return Err(ApiError::Throttled(format!(
            "rate limit exceeded, max {} votes per hour",
            state.ceilings.vote
        )));
    }

    let direction = VoteDirection::parse(req.vote.trim())
        .ok_or_else(|| ApiError::InvalidInput("vote must be 'up' or 'down'".into()))?;

    let listing = votes::cast_vote(&state.db, agent.id, id, direction, now).await?;
    rate_limit::record(&state.db, agent.id, ActionKind::Vote, now).await?;
    VOTES_CAST.inc();

    Ok(Json(listing))
}

pub async fn search_listings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<Listing>>, ApiError> {
    let q = params.q.as_deref().map(str::trim).unwrap_or("");
    validate::search_query(q)?;
    Ok(Json(state.db.listings(Some(q), 50, 0).await?))
}
