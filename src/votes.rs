use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::Db;
use crate::error::ApiError;
use crate::models::Listing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "up" => Some(VoteDirection::Up),
            "down" => Some(VoteDirection::Down),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VoteDirection::Up => "up",
            VoteDirection::Down => "down",
        }
    }
}

// What a cast does to the stored vote row, decided once per transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VoteDecision {
    Insert,
    Retract,
    Flip,
}

fn decide(existing: Option<VoteDirection>, requested: VoteDirection) -> VoteDecision {
    match existing {
        None => VoteDecision::Insert,
        Some(prev) if prev == requested => VoteDecision::Retract,
        Some(_) => VoteDecision::Flip,
    }
}

// Net change to the listing's (upvotes, downvotes) counters. The single
// source of counter arithmetic, applied as one UPDATE.
fn counter_deltas(decision: VoteDecision, requested: VoteDirection) -> (i64, i64) {
    match (decision, requested) {
        (VoteDecision::Insert, VoteDirection::Up) => (1, 0),
        (VoteDecision::Insert, VoteDirection::Down) => (0, 1),
        (VoteDecision::Retract, VoteDirection::Up) => (-1, 0),
        (VoteDecision::Retract, VoteDirection::Down) => (0, -1),
        (VoteDecision::Flip, VoteDirection::Up) => (1, -1),
        (VoteDecision::Flip, VoteDirection::Down) => (-1, 1),
    }
}

/// One live vote per (voter, listing), toggle semantics: repeating a
/// direction retracts the vote, the opposite direction flips it.
///
/// The existence check, self-vote check, row mutation, and counter update
/// all run inside one transaction. Precondition failures return before any
/// write; a dropped transaction rolls back, so counters and vote rows never
/// drift apart.
pub async fn cast_vote(
    db: &Db,
    voter_id: i64,
    listing_id: i64,
    requested: VoteDirection,
    now: DateTime<Utc>,
) -> Result<Listing, ApiError> {
    let mut tx = db.pool().begin().await?;

    let owner: Option<i64> = sqlx::query_scalar("SELECT submitted_by_id FROM listings WHERE id = ?")
        .bind(listing_id)
        .fetch_optional(&mut *tx)
        .await?;
    let owner = owner.ok_or_else(|| ApiError::NotFound("listing not found".into()))?;
    if owner == voter_id {
        return Err(ApiError::Forbidden(
            "you cannot vote on your own listing".into(),
        ));
    }

    let existing: Option<String> =
        sqlx::query_scalar("SELECT direction FROM votes WHERE agent_id = ? AND listing_id = ?")
            .bind(voter_id)
            .bind(listing_id)
            .fetch_optional(&mut *tx)
            .await?;
    let existing = existing.as_deref().and_then(VoteDirection::parse);

    let decision = decide(existing, requested);
    match decision {
        VoteDecision::Insert => {
            sqlx::query(
                "INSERT INTO votes (agent_id, listing_id, direction, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(voter_id)
            .bind(listing_id)
            .bind(requested.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        VoteDecision::Retract => {
            sqlx::query("DELETE FROM votes WHERE agent_id = ? AND listing_id = ?")
                .bind(voter_id)
                .bind(listing_id)
                .execute(&mut *tx)
                .await?;
        }
        VoteDecision::Flip => {
            sqlx::query(
                "UPDATE votes SET direction = ?, created_at = ? WHERE agent_id = ? AND listing_id = ?",
            )
            .bind(requested.as_str())
            .bind(now)
            .bind(voter_id)
            .bind(listing_id)
            .execute(&mut *tx)
            .await?;
        }
    }

    let (up, down) = counter_deltas(decision, requested);
    sqlx::query("UPDATE listings SET upvotes = upvotes + ?, downvotes = downvotes + ? WHERE id = ?")
        .bind(up)
        .bind(down)
        .bind(listing_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    db.listing(listing_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("listing not found".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
    }

    async fn vote_row(db: &Db, voter: i64, listing: i64) -> Option<String> {
        sqlx::query_scalar("SELECT direction FROM votes WHERE agent_id = ? AND listing_id = ?")
            .bind(voter)
            .bind(listing)
            .fetch_optional(db.pool())
            .await
            .unwrap()
    }

    // submitter owns a listing, voter is someone else
    async fn setup() -> (Db, i64, i64, i64) {
        let db = Db::open_in_memory().await.unwrap();
        let now = clock();
        let submitter_id = db
            .insert_agent("submitter", "agora_key_submitter", "", now)
            .await
            .unwrap();
        let voter_id = db
            .insert_agent("voter", "agora_key_voter", "", now)
            .await
            .unwrap();
        let submitter = db
            .agent_by_key("agora_key_submitter")
            .await
            .unwrap()
            .unwrap();
        let listing_id = db
            .insert_listing("Tool", "https://example.com/tool", "", &submitter, now)
            .await
            .unwrap();
        (db, submitter_id, voter_id, listing_id)
    }

    #[tokio::test]
    async fn first_vote_inserts_and_counts() {
        let (db, _, voter, listing) = setup().await;

        let l = cast_vote(&db, voter, listing, VoteDirection::Up, clock())
            .await
            .unwrap();
        assert_eq!((l.upvotes, l.downvotes, l.score), (1, 0, 1));
        assert_eq!(vote_row(&db, voter, listing).await.as_deref(), Some("up"));
    }

    #[tokio::test]
    async fn same_direction_twice_toggles_off() {
        let (db, _, voter, listing) = setup().await;

        cast_vote(&db, voter, listing, VoteDirection::Up, clock())
            .await
            .unwrap();
        let l = cast_vote(&db, voter, listing, VoteDirection::Up, clock())
            .await
            .unwrap();

        assert_eq!((l.upvotes, l.downvotes, l.score), (0, 0, 0));
        assert_eq!(vote_row(&db, voter, listing).await, None);
    }

    #[tokio::test]
    async fn opposite_direction_flips_and_moves_score_by_two() {
        let (db, _, voter, listing) = setup().await;

        cast_vote(&db, voter, listing, VoteDirection::Up, clock())
            .await
            .unwrap();
        let l = cast_vote(&db, voter, listing, VoteDirection::Down, clock())
            .await
            .unwrap();

        assert_eq!((l.upvotes, l.downvotes, l.score), (0, 1, -1));
        assert_eq!(vote_row(&db, voter, listing).await.as_deref(), Some("down"));
    }

    #[tokio::test]
    async fn up_toggle_down_scenario() {
        let (db, _, voter, listing) = setup().await;

        let l = cast_vote(&db, voter, listing, VoteDirection::Up, clock())
            .await
            .unwrap();
        assert_eq!(l.score, 1);

        let l = cast_vote(&db, voter, listing, VoteDirection::Up, clock())
            .await
            .unwrap();
        assert_eq!(l.score, 0);
        assert_eq!(vote_row(&db, voter, listing).await, None);

        let l = cast_vote(&db, voter, listing, VoteDirection::Down, clock())
            .await
            .unwrap();
        assert_eq!(l.score, -1);
        assert_eq!(vote_row(&db, voter, listing).await.as_deref(), Some("down"));
    }

    #[tokio::test]
    async fn self_vote_is_forbidden_regardless_of_direction() {
        let (db, submitter, _, listing) = setup().await;

        for dir in [VoteDirection::Up, VoteDirection::Down] {
            let err = cast_vote(&db, submitter, listing, dir, clock())
                .await
                .unwrap_err();
            assert!(matches!(err, ApiError::Forbidden(_)));
        }
        // nothing was written
        assert_eq!(vote_row(&db, submitter, listing).await, None);
        let l = db.listing(listing).await.unwrap().unwrap();
        assert_eq!((l.upvotes, l.downvotes), (0, 0));
    }

    #[tokio::test]
    async fn missing_listing_is_not_found() {
        let (db, _, voter, _) = setup().await;

        let err = cast_vote(&db, voter, 9999, VoteDirection::Up, clock())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn votes_from_different_agents_accumulate() {
        let (db, _, voter, listing) = setup().await;
        let other = db
            .insert_agent("other", "agora_key_other", "", clock())
            .await
            .unwrap();

        cast_vote(&db, voter, listing, VoteDirection::Up, clock())
            .await
            .unwrap();
        let l = cast_vote(&db, other, listing, VoteDirection::Up, clock())
            .await
            .unwrap();

        assert_eq!((l.upvotes, l.score), (2, 2));
    }

    #[test]
    fn decision_table() {
        assert_eq!(decide(None, VoteDirection::Up), VoteDecision::Insert);
        assert_eq!(
            decide(Some(VoteDirection::Up), VoteDirection::Up),
            VoteDecision::Retract
        );
        assert_eq!(
            decide(Some(VoteDirection::Down), VoteDirection::Up),
            VoteDecision::Flip
        );
    }

    #[test]
    fn deltas_sum_to_zero_only_on_flip_pairs() {
        // insert/retract move one counter, flip moves both
        assert_eq!(counter_deltas(VoteDecision::Insert, VoteDirection::Down), (0, 1));
        assert_eq!(counter_deltas(VoteDecision::Retract, VoteDirection::Up), (-1, 0));
        assert_eq!(counter_deltas(VoteDecision::Flip, VoteDirection::Up), (1, -1));
        assert_eq!(counter_deltas(VoteDecision::Flip, VoteDirection::Down), (-1, 1));
    }
}
