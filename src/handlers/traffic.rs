use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;
use crate::tracker::TrafficSummary;

// Tracker snapshot merged with store totals for the dashboard
#[derive(Debug, Serialize)]
pub struct TrafficReport {
    #[serde(flatten)]
    pub traffic: TrafficSummary,
    pub listings: i64,
    pub agents: i64,
    pub votes: i64,
    pub comments: i64,
}

pub async fn traffic_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TrafficReport>, ApiError> {
    let traffic = state.tracker.snapshot();
    let stats = state.db.stats().await?;
    Ok(Json(TrafficReport {
        traffic,
        listings: stats.listings,
        agents: stats.agents,
        votes: stats.votes,
        comments: stats.comments,
    }))
}
