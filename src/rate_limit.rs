use chrono::{DateTime, Duration, Utc};

use crate::db::Db;

// Sliding-window limiter over persisted events. `allow` is read-only and
// always filters by age itself, so the background sweep is pure
// housekeeping. Check-then-record is intentionally not transactional: a
// simultaneous burst can overshoot the ceiling by a little, the limit is
// soft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Submit,
    Vote,
    Comment,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Submit => "submit",
            ActionKind::Vote => "vote",
            ActionKind::Comment => "comment",
        }
    }
}

/// Allowed iff fewer than `ceiling` events of this kind by this agent fall
/// within the trailing hour. Does not record the attempt.
pub async fn allow(
    db: &Db,
    agent_id: i64,
    kind: ActionKind,
    ceiling: i64,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let cutoff = now - Duration::hours(1);
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM rate_limit_events WHERE agent_id = ? AND action = ? AND created_at > ?",
    )
    .bind(agent_id)
    .bind(kind.as_str())
    .bind(cutoff)
    .fetch_one(db.pool())
    .await?;
    Ok(count < ceiling)
}

/// Append one event for a performed action.
pub async fn record(
    db: &Db,
    agent_id: i64,
    kind: ActionKind,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO rate_limit_events (agent_id, action, created_at) VALUES (?, ?, ?)")
        .bind(agent_id)
        .bind(kind.as_str())
        .bind(now)
        .execute(db.pool())
        .await?;
    Ok(())
}

// Events older than two hours are past any window's reach
pub async fn sweep_expired(db: &Db, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
    let cutoff = now - Duration::hours(2);
    let res = sqlx::query("DELETE FROM rate_limit_events WHERE created_at < ?")
        .bind(cutoff)
        .execute(db.pool())
        .await?;
    Ok(res.rows_affected())
}

// Background housekeeping loop, spawned from main
pub async fn sweeper(db: Db, period: std::time::Duration) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        match sweep_expired(&db, Utc::now()).await {
            Ok(0) => {}
            Ok(n) => tracing::debug!("pruned {n} expired rate-limit events"),
            Err(e) => tracing::warn!("rate-limit sweep failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
    }

    async fn setup() -> (Db, i64) {
        let db = Db::open_in_memory().await.unwrap();
        let agent = db
            .insert_agent("limited", "agora_key_limited", "", clock())
            .await
            .unwrap();
        (db, agent)
    }

    #[tokio::test]
    async fn blocks_exactly_at_the_ceiling() {
        let (db, agent) = setup().await;
        let now = clock();

        for i in 0..29 {
            record(&db, agent, ActionKind::Vote, now - Duration::minutes(i))
                .await
                .unwrap();
        }
        assert!(allow(&db, agent, ActionKind::Vote, 30, now).await.unwrap());

        record(&db, agent, ActionKind::Vote, now).await.unwrap();
        assert!(!allow(&db, agent, ActionKind::Vote, 30, now).await.unwrap());
    }

    #[tokio::test]
    async fn events_outside_the_trailing_hour_do_not_count() {
        let (db, agent) = setup().await;
        let now = clock();

        for i in 0..30 {
            record(
                &db,
                agent,
                ActionKind::Vote,
                now - Duration::minutes(61 + i),
            )
            .await
            .unwrap();
        }
        assert!(allow(&db, agent, ActionKind::Vote, 30, now).await.unwrap());
    }

    #[tokio::test]
    async fn kinds_are_limited_independently() {
        let (db, agent) = setup().await;
        let now = clock();

        for _ in 0..3 {
            record(&db, agent, ActionKind::Submit, now).await.unwrap();
        }
        assert!(!allow(&db, agent, ActionKind::Submit, 3, now).await.unwrap());
        assert!(allow(&db, agent, ActionKind::Comment, 10, now).await.unwrap());
    }

    #[tokio::test]
    async fn agents_are_limited_independently() {
        let (db, agent) = setup().await;
        let other = db
            .insert_agent("other", "agora_key_other", "", clock())
            .await
            .unwrap();
        let now = clock();

        for _ in 0..3 {
            record(&db, agent, ActionKind::Submit, now).await.unwrap();
        }
        assert!(allow(&db, other, ActionKind::Submit, 3, now).await.unwrap());
    }

    #[tokio::test]
    async fn sweep_drops_only_expired_events_and_never_changes_allow() {
        let (db, agent) = setup().await;
        let now = clock();

        record(&db, agent, ActionKind::Vote, now - Duration::hours(3))
            .await
            .unwrap();
        record(&db, agent, ActionKind::Vote, now - Duration::minutes(30))
            .await
            .unwrap();

        let before = allow(&db, agent, ActionKind::Vote, 2, now).await.unwrap();
        let pruned = sweep_expired(&db, now).await.unwrap();
        let after = allow(&db, agent, ActionKind::Vote, 2, now).await.unwrap();

        assert_eq!(pruned, 1);
        assert_eq!(before, after);

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rate_limit_events")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(remaining, 1);
    }
}
