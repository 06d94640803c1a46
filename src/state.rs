use crate::config::Args;
use crate::db::Db;
use crate::tracker::TrafficTracker;

// Per-action ceilings, events per rolling hour
#[derive(Debug, Clone, Copy)]
pub struct RateCeilings {
    pub submit: i64,
    pub vote: i64,
    pub comment: i64,
}

// app's shared state
pub struct AppState {
    pub db: Db,
    pub tracker: TrafficTracker,
    pub ceilings: RateCeilings,
}

impl AppState {
    pub fn new(db: Db, tracker: TrafficTracker, args: &Args) -> Self {
        Self {
            db,
            tracker,
            ceilings: RateCeilings {
                submit: args.submit_limit,
                vote: args.vote_limit,
                comment: args.comment_limit,
            },
        }
    }
}
