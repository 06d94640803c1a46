mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod metrics;
mod models;
mod rate_limit;
mod state;
mod tracker;
mod validate;
mod votes;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::Args;
use crate::db::Db;
use crate::state::AppState;
use crate::tracker::TrafficTracker;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("agora=info")),
        )
        .init();

    let db = match Db::open(&args.database).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("failed to open database {}: {e}", args.database);
            std::process::exit(1);
        }
    };
    if let Err(e) = db.seed_if_empty(Utc::now()).await {
        tracing::warn!("seeding starter listings failed: {e}");
    }

    let state = Arc::new(AppState::new(
        db.clone(),
        TrafficTracker::new(Utc::now()),
        &args,
    ));

    // background housekeeping for expired rate-limit events
    let sweep_db = db.clone();
    let sweep_period = Duration::from_secs(args.sweep_interval * 60);
    tokio::spawn(async move {
        rate_limit::sweeper(sweep_db, sweep_period).await;
    });

    let api = Router::new()
        .route("/agents/register", post(handlers::register_handler))
        .route("/agents/me", get(handlers::me_handler))
        .route(
            "/listings",
            get(handlers::list_listings).post(handlers::submit_listing),
        )
        .route("/listings/{id}", get(handlers::get_listing))
        .route("/listings/{id}/vote", post(handlers::vote_listing))
        .route(
            "/listings/{id}/comments",
            get(handlers::list_comments).post(handlers::post_comment),
        )
        .route("/search", get(handlers::search_listings))
        .route("/traffic", get(handlers::traffic_handler))
        .layer(middleware::from_fn(handlers::cors));

    let app = Router::new()
        .route("/", get(handlers::home_page))
        .route("/listing/{id}", get(handlers::listing_page))
        .route("/submit", get(handlers::submit_page))
        .route("/skill.md", get(handlers::skill_doc))
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .nest("/api/v1", api)
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            handlers::track_requests,
        ))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();

    tracing::info!("agora running on http://localhost:{}", args.port);
    tracing::info!("database: {}", args.database);
    tracing::info!(
        "rate ceilings per hour: {} submissions, {} votes, {} comments",
        args.submit_limit,
        args.vote_limit,
        args.comment_limit
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
