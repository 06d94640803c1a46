use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

const TOP_ENDPOINTS: usize = 10;

/// Process-wide request accounting. One instance lives in `AppState`;
/// every inbound request passes through `record` before routing.
///
/// All fields move together under one lock: the hourly/daily counters are
/// only meaningful relative to their stored window boundaries, so partial
/// reads are never allowed. Nothing in the critical section blocks.
pub struct TrafficTracker {
    inner: Mutex<TrackerState>,
}

struct TrackerState {
    total: u64,
    today: u64,
    hourly: u64,
    last_hour: DateTime<Utc>,
    last_day: DateTime<Utc>,
    endpoints: HashMap<String, u64>,
    seen_today: HashSet<String>,
    unique_today: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndpointHit {
    pub path: String,
    pub count: u64,
}

/// Owned copy of the counters, safe to hold after the lock is released.
#[derive(Debug, Clone, Serialize)]
pub struct TrafficSummary {
    pub requests_total: u64,
    pub requests_today: u64,
    pub requests_this_hour: u64,
    pub unique_visitors_today: u64,
    pub top_endpoints: Vec<EndpointHit>,
}

fn hour_floor(t: DateTime<Utc>) -> DateTime<Utc> {
    t.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}

fn day_floor(t: DateTime<Utc>) -> DateTime<Utc> {
    hour_floor(t).with_hour(0).unwrap_or(t)
}

// /api/v1/listings/123/vote and /api/v1/listings/456/vote should aggregate
// under one key, otherwise the endpoint map grows per entity
fn normalize_path(path: &str) -> String {
    if !path.starts_with("/api/") {
        return path.to_string();
    }
    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() <= 4 {
        return path.to_string();
    }
    parts
        .iter()
        .map(|p| {
            if !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()) {
                "*"
            } else {
                p
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

impl TrafficTracker {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            inner: Mutex::new(TrackerState {
                total: 0,
                today: 0,
                hourly: 0,
                last_hour: hour_floor(now),
                last_day: day_floor(now),
                endpoints: HashMap::new(),
                seen_today: HashSet::new(),
                unique_today: 0,
            }),
        }
    }

    /// Count one request. Windows that `now` has moved past are reset first;
    /// any number of skipped hours or days collapses into a single reset.
    pub fn record(&self, path: &str, visitor: &str, now: DateTime<Utc>) {
        let mut s = self.inner.lock().unwrap();

        let this_hour = hour_floor(now);
        if this_hour > s.last_hour {
            s.hourly = 0;
            s.last_hour = this_hour;
        }

        let this_day = day_floor(now);
        if this_day > s.last_day {
            s.today = 0;
            s.unique_today = 0;
            s.seen_today.clear();
            s.last_day = this_day;
        }

        s.total += 1;
        s.today += 1;
        s.hourly += 1;

        let key = normalize_path(path);
        *s.endpoints.entry(key).or_insert(0) += 1;

        if s.seen_today.insert(visitor.to_string()) {
            s.unique_today += 1;
        }
    }

    /// Copy out the counters and the ten busiest endpoints, count descending,
    /// ties broken by path so the order is stable across calls.
    pub fn snapshot(&self) -> TrafficSummary {
        let s = self.inner.lock().unwrap();

        let mut top: Vec<EndpointHit> = s
            .endpoints
            .iter()
            .map(|(path, count)| EndpointHit {
                path: path.clone(),
                count: *count,
            })
            .collect();
        top.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.path.cmp(&b.path)));
        top.truncate(TOP_ENDPOINTS);

        TrafficSummary {
            requests_total: s.total,
            requests_today: s.today,
            requests_this_hour: s.hourly,
            unique_visitors_today: s.unique_today,
            top_endpoints: top,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, min, 0).unwrap()
    }

    #[test]
    fn hourly_never_exceeds_today_never_exceeds_total() {
        let tracker = TrafficTracker::new(at(14, 9, 0));
        let stamps = [
            at(14, 9, 5),
            at(14, 9, 50),
            at(14, 10, 1),
            at(14, 23, 59),
            at(15, 0, 1),
            at(15, 3, 30),
            at(17, 8, 0),
        ];
        for (i, now) in stamps.iter().enumerate() {
            tracker.record("/", &format!("10.0.0.{i}"), *now);
            let s = tracker.snapshot();
            assert!(s.requests_this_hour <= s.requests_today);
            assert!(s.requests_today <= s.requests_total);
        }
    }

    #[test]
    fn hour_rollover_resets_only_hourly() {
        let tracker = TrafficTracker::new(at(14, 9, 0));
        tracker.record("/", "a", at(14, 9, 10));
        tracker.record("/", "a", at(14, 9, 40));
        tracker.record("/", "a", at(14, 10, 5));

        let s = tracker.snapshot();
        assert_eq!(s.requests_this_hour, 1);
        assert_eq!(s.requests_today, 3);
        assert_eq!(s.requests_total, 3);
    }

    #[test]
    fn day_rollover_resets_daily_counters_but_not_lifetime_state() {
        let tracker = TrafficTracker::new(at(14, 22, 0));
        tracker.record("/submit", "a", at(14, 22, 30));
        tracker.record("/submit", "b", at(14, 23, 30));
        tracker.record("/submit", "a", at(15, 0, 10));

        let s = tracker.snapshot();
        assert_eq!(s.requests_today, 1);
        assert_eq!(s.unique_visitors_today, 1);
        assert_eq!(s.requests_total, 3);
        // the endpoint map is lifetime, it survives the day boundary
        assert_eq!(s.top_endpoints[0].count, 3);
    }

    #[test]
    fn idle_gap_spanning_many_hours_resets_once() {
        let tracker = TrafficTracker::new(at(14, 2, 0));
        tracker.record("/", "a", at(14, 2, 15));
        // process sat idle for five hours
        tracker.record("/", "a", at(14, 7, 45));

        let s = tracker.snapshot();
        assert_eq!(s.requests_this_hour, 1);
        assert_eq!(s.requests_today, 2);
    }

    #[test]
    fn repeat_visitors_counted_once_per_day() {
        let tracker = TrafficTracker::new(at(14, 9, 0));
        tracker.record("/", "203.0.113.7", at(14, 9, 1));
        tracker.record("/", "203.0.113.7", at(14, 9, 2));
        tracker.record("/", "203.0.113.9", at(14, 9, 3));

        assert_eq!(tracker.snapshot().unique_visitors_today, 2);
    }

    #[test]
    fn numeric_segments_collapse_in_deep_api_paths() {
        assert_eq!(
            normalize_path("/api/v1/listings/123/vote"),
            "/api/v1/listings/*/vote"
        );
        assert_eq!(normalize_path("/api/v1/listings/456"), "/api/v1/listings/*");
        // shallow API paths and web paths stay as-is
        assert_eq!(normalize_path("/api/v1/listings"), "/api/v1/listings");
        assert_eq!(normalize_path("/listing/123"), "/listing/123");
    }

    #[test]
    fn normalized_paths_share_one_endpoint_bucket() {
        let tracker = TrafficTracker::new(at(14, 9, 0));
        tracker.record("/api/v1/listings/1/vote", "a", at(14, 9, 1));
        tracker.record("/api/v1/listings/2/vote", "a", at(14, 9, 2));

        let s = tracker.snapshot();
        assert_eq!(s.top_endpoints.len(), 1);
        assert_eq!(s.top_endpoints[0].path, "/api/v1/listings/*/vote");
        assert_eq!(s.top_endpoints[0].count, 2);
    }

    #[test]
    fn snapshot_caps_endpoints_at_ten_sorted_by_count() {
        let tracker = TrafficTracker::new(at(14, 9, 0));
        for i in 0..12u64 {
            let path = format!("/p{i}");
            for _ in 0..=i {
                tracker.record(&path, "a", at(14, 9, 1));
            }
        }

        let top = tracker.snapshot().top_endpoints;
        assert_eq!(top.len(), 10);
        assert_eq!(top[0].path, "/p11");
        assert_eq!(top[0].count, 12);
        for pair in top.windows(2) {
            assert!(pair[0].count >= pair[1].count);
        }
    }

    #[test]
    fn tied_counts_order_by_path() {
        let tracker = TrafficTracker::new(at(14, 9, 0));
        tracker.record("/b", "a", at(14, 9, 1));
        tracker.record("/a", "a", at(14, 9, 1));

        let top = tracker.snapshot().top_endpoints;
        assert_eq!(top[0].path, "/a");
        assert_eq!(top[1].path, "/b");
    }
}
