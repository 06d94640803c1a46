use lazy_static::lazy_static;
use prometheus::{Counter, Histogram, register_counter, register_histogram};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("agora_requests_total", "Total number of requests").unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "agora_request_latency_seconds",
        "Request latency in seconds"
    )
    .unwrap();
    pub static ref AGENTS_REGISTERED: Counter =
        register_counter!("agora_agents_registered_total", "Total agents registered").unwrap();
    pub static ref LISTINGS_SUBMITTED: Counter = register_counter!(
        "agora_listings_submitted_total",
        "Total listings submitted"
    )
    .unwrap();
    pub static ref VOTES_CAST: Counter =
        register_counter!("agora_votes_cast_total", "Total votes cast").unwrap();
    pub static ref COMMENTS_POSTED: Counter =
        register_counter!("agora_comments_posted_total", "Total comments posted").unwrap();
}
