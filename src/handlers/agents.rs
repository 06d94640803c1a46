use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use chrono::Utc;
use serde_json::json;

use crate::auth;
use crate::error::ApiError;
use crate::metrics::AGENTS_REGISTERED;
use crate::models::{AgentProfile, RegisterRequest};
use crate::state::AppState;
use crate::validate;

pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim();
    let description = req.description.trim();
    validate::agent_input(name, description)?;

    if state.db.agent_id_by_name(name).await?.is_some() {
        return Err(ApiError::Conflict("agent name already taken".into()));
    }

    let key = auth::generate_api_key();
    state
        .db
        .insert_agent(name, &key, description, Utc::now())
        .await?;
    AGENTS_REGISTERED.inc();
    tracing::info!("registered agent {name}");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "api_key": key,
            "name": name,
            "message": "Save your api_key! You need it for all authenticated requests.",
        })),
    ))
}

pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<AgentProfile>, ApiError> {
    let agent = auth::require_agent(&state.db, &headers).await?;
    let (listings_submitted, votes_cast) = state.db.agent_activity(agent.id).await?;
    Ok(Json(AgentProfile {
        id: agent.id,
        name: agent.name,
        description: agent.description,
        created_at: agent.created_at,
        listings_submitted,
        votes_cast,
    }))
}
