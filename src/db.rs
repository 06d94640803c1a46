use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::time::Duration;

use crate::models::{Agent, Comment, Listing, Stats};

// Schema is created statement by statement at startup, CREATE IF NOT EXISTS
// keeps restarts idempotent. Timestamps are always bound by the caller so
// test code can supply its own clock.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS agents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        api_key TEXT NOT NULL UNIQUE,
        description TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS listings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        url TEXT NOT NULL UNIQUE,
        description TEXT NOT NULL DEFAULT '',
        submitted_by TEXT NOT NULL DEFAULT 'anonymous',
        submitted_by_id INTEGER NOT NULL DEFAULT 0,
        upvotes INTEGER NOT NULL DEFAULT 0,
        downvotes INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS votes (
        agent_id INTEGER NOT NULL,
        listing_id INTEGER NOT NULL,
        direction TEXT NOT NULL CHECK (direction IN ('up', 'down')),
        created_at TEXT NOT NULL,
        PRIMARY KEY (agent_id, listing_id),
        FOREIGN KEY (agent_id) REFERENCES agents(id),
        FOREIGN KEY (listing_id) REFERENCES listings(id)
    )",
    "CREATE TABLE IF NOT EXISTS comments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        listing_id INTEGER NOT NULL,
        agent_id INTEGER NOT NULL,
        agent_name TEXT NOT NULL,
        body TEXT NOT NULL,
        created_at TEXT NOT NULL,
        FOREIGN KEY (listing_id) REFERENCES listings(id),
        FOREIGN KEY (agent_id) REFERENCES agents(id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_comments_listing ON comments(listing_id, created_at)",
    "CREATE TABLE IF NOT EXISTS rate_limit_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        agent_id INTEGER NOT NULL,
        action TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_rate_limit_lookup ON rate_limit_events(agent_id, action, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_listings_score ON listings((upvotes - downvotes))",
];

const LISTING_COLS: &str = "id, name, url, description, submitted_by, upvotes, downvotes, \
     upvotes - downvotes AS score, \
     (SELECT COUNT(*) FROM comments WHERE comments.listing_id = listings.id) AS comment_count, \
     created_at";

#[derive(Clone)]
pub struct Db {
    pool: Pool<Sqlite>,
}

impl Db {
    pub async fn open(path: &str) -> Result<Self, sqlx::Error> {
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{path}"))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        // SQLite permits only limited write concurrency, a single pooled
        // connection avoids "database is locked" under concurrent handlers
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    #[cfg(test)]
    pub async fn open_in_memory() -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    async fn init_schema(&self) -> Result<(), sqlx::Error> {
        for stmt in SCHEMA {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }

    // First boot gets a handful of entries so the front page is never blank
    pub async fn seed_if_empty(&self, now: DateTime<Utc>) -> Result<(), sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM listings")
            .fetch_one(&self.pool)
            .await?;
        if count > 0 {
            return Ok(());
        }
        let seeds = [
            (
                "Agora",
                "https://github.com/agora-dev/agora",
                "Self-hosted community directory where agents list, rank, and discuss tools.",
            ),
            (
                "crates.io",
                "https://crates.io",
                "The Rust community package registry.",
            ),
            (
                "Hacker News",
                "https://news.ycombinator.com",
                "Social news for people building things.",
            ),
        ];
        for (name, url, desc) in seeds {
            sqlx::query(
                "INSERT INTO listings (name, url, description, submitted_by, upvotes, created_at) \
                 VALUES (?, ?, ?, 'agora', 1, ?)",
            )
            .bind(name)
            .bind(url)
            .bind(desc)
            .bind(now)
            .execute(&self.pool)
            .await?;
        }
        tracing::info!("seeded {} starter listings", seeds.len());
        Ok(())
    }

    // --- listings ---

    pub async fn listings(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Listing>, sqlx::Error> {
        match search {
            Some(q) => {
                let like = format!("%{q}%");
                let sql = format!(
                    "SELECT {LISTING_COLS} FROM listings \
                     WHERE name LIKE ? OR description LIKE ? \
                     ORDER BY score DESC, created_at DESC LIMIT ? OFFSET ?"
                );
                sqlx::query_as::<_, Listing>(&sql)
                    .bind(&like)
                    .bind(&like)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                let sql = format!(
                    "SELECT {LISTING_COLS} FROM listings \
                     ORDER BY score DESC, created_at DESC LIMIT ? OFFSET ?"
                );
                sqlx::query_as::<_, Listing>(&sql)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await
            }
        }
    }

    pub async fn listing(&self, id: i64) -> Result<Option<Listing>, sqlx::Error> {
        let sql = format!("SELECT {LISTING_COLS} FROM listings WHERE id = ?");
        sqlx::query_as::<_, Listing>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn listing_count(&self, search: Option<&str>) -> Result<i64, sqlx::Error> {
        match search {
            Some(q) => {
                let like = format!("%{q}%");
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM listings WHERE name LIKE ? OR description LIKE ?",
                )
                .bind(&like)
                .bind(&like)
                .fetch_one(&self.pool)
                .await
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM listings")
                    .fetch_one(&self.pool)
                    .await
            }
        }
    }

    pub async fn listing_id_by_url(&self, url: &str) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar("SELECT id FROM listings WHERE LOWER(url) = LOWER(?)")
            .bind(url)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn insert_listing(
        &self,
        name: &str,
        url: &str,
        description: &str,
        submitter: &Agent,
        now: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let res = sqlx::query(
            "INSERT INTO listings (name, url, description, submitted_by, submitted_by_id, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(name)
        .bind(url)
        .bind(description)
        .bind(&submitter.name)
        .bind(submitter.id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(res.last_insert_rowid())
    }

    // --- comments ---

    pub async fn comments(&self, listing_id: i64) -> Result<Vec<Comment>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            "SELECT id, listing_id, agent_id, agent_name, body, created_at \
             FROM comments WHERE listing_id = ? ORDER BY created_at ASC",
        )
        .bind(listing_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn insert_comment(
        &self,
        listing_id: i64,
        author: &Agent,
        body: &str,
        now: DateTime<Utc>,
    ) -> Result<Comment, sqlx::Error> {
        let res = sqlx::query(
            "INSERT INTO comments (listing_id, agent_id, agent_name, body, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(listing_id)
        .bind(author.id)
        .bind(&author.name)
        .bind(body)
        .bind(now)
        .execute(&self.pool)
        .await?;
        sqlx::query_as::<_, Comment>(
            "SELECT id, listing_id, agent_id, agent_name, body, created_at \
             FROM comments WHERE id = ?",
        )
        .bind(res.last_insert_rowid())
        .fetch_one(&self.pool)
        .await
    }

    // --- agents ---

    pub async fn agent_by_key(&self, api_key: &str) -> Result<Option<Agent>, sqlx::Error> {
        sqlx::query_as::<_, Agent>(
            "SELECT id, name, api_key, description, created_at FROM agents WHERE api_key = ?",
        )
        .bind(api_key)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn agent_id_by_name(&self, name: &str) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar("SELECT id FROM agents WHERE LOWER(name) = LOWER(?)")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn insert_agent(
        &self,
        name: &str,
        api_key: &str,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let res = sqlx::query(
            "INSERT INTO agents (name, api_key, description, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(name)
        .bind(api_key)
        .bind(description)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(res.last_insert_rowid())
    }

    // (listings submitted, votes cast) for the profile endpoint
    pub async fn agent_activity(&self, agent_id: i64) -> Result<(i64, i64), sqlx::Error> {
        let submitted: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM listings WHERE submitted_by_id = ?")
                .bind(agent_id)
                .fetch_one(&self.pool)
                .await?;
        let votes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE agent_id = ?")
            .bind(agent_id)
            .fetch_one(&self.pool)
            .await?;
        Ok((submitted, votes))
    }

    pub async fn stats(&self) -> Result<Stats, sqlx::Error> {
        let listings: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM listings")
            .fetch_one(&self.pool)
            .await?;
        let agents: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM agents")
            .fetch_one(&self.pool)
            .await?;
        let votes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM votes")
            .fetch_one(&self.pool)
            .await?;
        let comments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
            .fetch_one(&self.pool)
            .await?;
        Ok(Stats {
            listings,
            agents,
            votes,
            comments,
        })
    }
}
