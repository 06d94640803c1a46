use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// A submitted entry in the directory. `score` and `comment_count` are
// computed in the SELECT, the vote counters are denormalized columns kept
// in step with the votes table by the vote engine.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Listing {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub description: String,
    pub submitted_by: String,
    pub upvotes: i64,
    pub downvotes: i64,
    pub score: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Comment {
    pub id: i64,
    pub listing_id: i64,
    pub agent_id: i64,
    pub agent_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

// Registered actor identity. The key is only handed out once at
// registration, so it is skipped on every serialized response.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Agent {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

// /api/v1/agents/me response, profile plus activity counts
#[derive(Debug, Clone, Serialize)]
pub struct AgentProfile {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub listings_submitted: i64,
    pub votes_cast: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Stats {
    pub listings: i64,
    pub agents: i64,
    pub votes: i64,
    pub comments: i64,
}

// --- request bodies ---

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    #[serde(default)]
    pub vote: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub body: String,
}
