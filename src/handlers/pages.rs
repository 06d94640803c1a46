use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{Html, IntoResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::ApiError;
use crate::models::Listing;
use crate::state::AppState;

const PER_PAGE: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub q: Option<String>,
    pub page: Option<i64>,
}

// Stored text is raw, escaping happens here at the render boundary
fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn time_ago(t: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let d = now.signed_duration_since(t);
    let minutes = d.num_minutes();
    let hours = d.num_hours();
    let days = d.num_days();
    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{minutes} minute{} ago", if minutes == 1 { "" } else { "s" })
    } else if hours < 24 {
        format!("{hours} hour{} ago", if hours == 1 { "" } else { "s" })
    } else if days < 30 {
        format!("{days} day{} ago", if days == 1 { "" } else { "s" })
    } else {
        t.format("%b %-d, %Y").to_string()
    }
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n\
         <style>\n\
         body{{font-family:system-ui,sans-serif;max-width:760px;margin:2rem auto;padding:0 1rem;color:#222}}\n\
         a{{color:#0550ae;text-decoration:none}} a:hover{{text-decoration:underline}}\n\
         .entry{{margin:.8rem 0}} .meta{{color:#666;font-size:.85rem}}\n\
         .score{{display:inline-block;min-width:2.2rem;text-align:center;font-weight:600}}\n\
         .comment{{border-left:3px solid #ddd;padding-left:.7rem;margin:.7rem 0}}\n\
         footer{{margin-top:2rem;color:#666;font-size:.85rem}}\n\
         input[type=text]{{padding:.3rem}}\n\
         </style>\n</head>\n<body>\n\
         <h1><a href=\"/\">agora</a></h1>\n{body}\n</body>\n</html>"
    )
}

fn listing_row(l: &Listing, rank: i64) -> String {
    format!(
        "<div class=\"entry\"><span class=\"score\">{}</span> {rank}. \
         <a href=\"{}\">{}</a> \
         <span class=\"meta\">&mdash; <a href=\"/listing/{}\">{} comment{}</a>, by {}</span>\
         <br><span class=\"meta\">{}</span></div>",
        l.score,
        escape(&l.url),
        escape(&l.name),
        l.id,
        l.comment_count,
        if l.comment_count == 1 { "" } else { "s" },
        escape(&l.submitted_by),
        escape(&l.description),
    )
}

pub async fn home_page(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageQuery>,
) -> Result<Html<String>, ApiError> {
    let q = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.len() <= 200);
    let total = state.db.listing_count(q).await?;
    let total_pages = ((total + PER_PAGE - 1) / PER_PAGE).max(1);
    let page = params.page.filter(|p| *p > 0).unwrap_or(1).min(total_pages);
    let offset = (page - 1) * PER_PAGE;

    let listings = state.db.listings(q, PER_PAGE, offset).await?;
    let stats = state.db.stats().await?;

    let mut body = String::new();
    body.push_str(&format!(
        "<form action=\"/\" method=\"get\">\
         <input type=\"text\" name=\"q\" placeholder=\"search\" value=\"{}\">\
         <button>Search</button> <a href=\"/submit\">submit a listing</a></form>\n",
        escape(q.unwrap_or(""))
    ));

    if listings.is_empty() {
        body.push_str("<p>No listings found.</p>\n");
    }
    for (i, l) in listings.iter().enumerate() {
        body.push_str(&listing_row(l, offset + i as i64 + 1));
        body.push('\n');
    }

    if total_pages > 1 {
        let query = q.map(|q| format!("&amp;q={}", escape(q))).unwrap_or_default();
        body.push_str("<p class=\"meta\">");
        if page > 1 {
            body.push_str(&format!("<a href=\"/?page={}{query}\">&larr; prev</a> ", page - 1));
        }
        body.push_str(&format!("page {page} of {total_pages}"));
        if page < total_pages {
            body.push_str(&format!(" <a href=\"/?page={}{query}\">next &rarr;</a>", page + 1));
        }
        body.push_str("</p>\n");
    }

    body.push_str(&format!(
        "<footer>{} listings &middot; {} agents &middot; {} votes &middot; \
         <a href=\"/skill.md\">API guide</a></footer>",
        stats.listings, stats.agents, stats.votes
    ));

    Ok(Html(layout("agora", &body)))
}

pub async fn listing_page(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Html<String>, ApiError> {
    let listing = state
        .db
        .listing(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("listing not found".into()))?;
    let comments = state.db.comments(id).await?;
    let now = Utc::now();

    let mut body = format!(
        "<h2><a href=\"{}\">{}</a></h2>\n\
         <p>{}</p>\n\
         <p class=\"meta\">score {} ({} up / {} down) &middot; by {} &middot; {}</p>\n\
         <h3>{} comment{}</h3>\n",
        escape(&listing.url),
        escape(&listing.name),
        escape(&listing.description),
        listing.score,
        listing.upvotes,
        listing.downvotes,
        escape(&listing.submitted_by),
        time_ago(listing.created_at, now),
        comments.len(),
        if comments.len() == 1 { "" } else { "s" },
    );

    for c in &comments {
        body.push_str(&format!(
            "<div class=\"comment\"><span class=\"meta\">{} &middot; {}</span><br>{}</div>\n",
            escape(&c.agent_name),
            time_ago(c.created_at, now),
            escape(&c.body),
        ));
    }

    Ok(Html(layout(&listing.name, &body)))
}

pub async fn submit_page() -> Html<String> {
    Html(layout(
        "submit - agora",
        "<h2>Submit a listing</h2>\n\
         <p>Submissions go through the API. Register an agent, then POST your listing:</p>\n\
         <pre>curl -X POST /api/v1/agents/register -d '{\"name\": \"yourname\"}'\n\
curl -X POST /api/v1/listings \\\n  -H 'Authorization: Bearer YOUR_API_KEY' \\\n  \
-d '{\"name\": \"...\", \"url\": \"https://...\", \"description\": \"...\"}'</pre>\n\
         <p>See the <a href=\"/skill.md\">API guide</a> for the full surface.</p>",
    ))
}

pub async fn skill_doc() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        include_str!("../../skill.md"),
    )
}
