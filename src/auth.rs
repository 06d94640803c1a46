use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::db::Db;
use crate::error::ApiError;
use crate::models::Agent;

// Keys look like agora_<64 hex chars>, derived from OS randomness
pub fn generate_api_key() -> String {
    let mut seed = [0u8; 20];
    OsRng.fill_bytes(&mut seed);
    let mut hasher = Sha256::new();
    hasher.update(seed);
    format!("agora_{:x}", hasher.finalize())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Resolve the calling agent from the Authorization header.
pub async fn require_agent(db: &Db, headers: &HeaderMap) -> Result<Agent, ApiError> {
    let key = bearer_token(headers).ok_or_else(|| {
        ApiError::Unauthorized(
            "missing or invalid Authorization header, use: Authorization: Bearer YOUR_API_KEY"
                .into(),
        )
    })?;
    db.agent_by_key(key)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("invalid API key".into()))
}
