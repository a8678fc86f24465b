//! Structural checks run on response bodies after a probe succeeds.
//!
//! Each check records its own sub-outcomes and hands back whatever the next
//! probe in a chain needs (district ids, a created post id, ...).

use serde_json::Value;
use tracing::debug;

use crate::helpers::{id_text, json_type_name, missing_keys};
use crate::models::{HttpResponse, Outcome};
use crate::runner::Recorder;

pub const INVALID_JSON: &str = "Invalid JSON response";

pub const FEED_STRUCTURE: &str = "Feed Response Structure";
pub const POST_FIELDS: &str = "Post Required Fields";
pub const DISTRICTS_STRUCTURE: &str = "Districts Response Structure";
pub const AUTH_STRUCTURE: &str = "Google Sign-In Response Structure";
pub const CREATE_POST_STRUCTURE: &str = "Create Post Response Structure";

/// Parse the body, recording `check` as failed when it isn't JSON.
pub fn parse_json(rec: &mut impl Recorder, check: &str, resp: &HttpResponse) -> Option<Value> {
    match resp.json() {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(check, error = %err, "response body is not JSON");
            rec.record_outcome(Outcome::fail(check, INVALID_JSON));
            None
        }
    }
}

/// Record a required-fields check over one JSON object.
fn required_fields(
    rec: &mut impl Recorder,
    name: &str,
    item: &Value,
    required: &[&str],
    ok_message: String,
) {
    let missing = missing_keys(item, required);
    if missing.is_empty() {
        rec.record_outcome(Outcome::pass(name, ok_message));
    } else {
        rec.record_outcome(Outcome::fail(
            name,
            format!("Missing fields: {}", missing.join(", ")),
        ));
    }
}

fn show_sample(rec: &mut impl Recorder, label: &str, item: &Value) {
    let pretty = serde_json::to_string_pretty(item).unwrap_or_else(|_| item.to_string());
    rec.detail(&format!("{label}:\n{pretty}"));
}

/// Feeds come back either as a bare array or wrapped in `{"posts": [...]}`.
/// Returns the posts when the shape is recognised.
pub fn feed_structure(
    rec: &mut impl Recorder,
    resp: &HttpResponse,
    required: &[&str],
    sample: bool,
) -> Option<Vec<Value>> {
    let data = parse_json(rec, FEED_STRUCTURE, resp)?;

    let posts = match data {
        Value::Array(posts) => {
            rec.record_outcome(Outcome::pass(FEED_STRUCTURE, "Response is direct array"));
            posts
        }
        Value::Object(mut map) if map.get("posts").is_some_and(Value::is_array) => {
            let posts = match map.remove("posts") {
                Some(Value::Array(posts)) => posts,
                _ => Vec::new(),
            };
            rec.record_outcome(Outcome::pass(
                FEED_STRUCTURE,
                "Response wrapped in 'posts' object",
            ));
            posts
        }
        other => {
            rec.record_outcome(Outcome::fail(
                FEED_STRUCTURE,
                format!("Unexpected structure: {}", json_type_name(&other)),
            ));
            return None;
        }
    };

    if let Some(post) = posts.first() {
        if sample {
            show_sample(rec, "Sample Post Structure", post);
        }
        required_fields(
            rec,
            POST_FIELDS,
            post,
            required,
            "All required fields present".to_string(),
        );
    }

    Some(posts)
}

/// Districts are a non-empty list of identifiers usable as `?district=`.
pub fn districts_structure(rec: &mut impl Recorder, resp: &HttpResponse) -> Vec<String> {
    let Some(data) = parse_json(rec, DISTRICTS_STRUCTURE, resp) else {
        return Vec::new();
    };

    match data.as_array() {
        Some(items) => {
            rec.record_outcome(Outcome::new(
                DISTRICTS_STRUCTURE,
                !items.is_empty(),
                format!("Response is a list: true | Districts: {}", items.len()),
            ));
            items.iter().filter_map(id_text).collect()
        }
        None => {
            rec.record_outcome(Outcome::fail(
                DISTRICTS_STRUCTURE,
                "Response is a list: false | Districts: N/A",
            ));
            Vec::new()
        }
    }
}

/// Clubs come back as a list; the first club must carry `required`.
/// `label` distinguishes repeated checks, e.g. one per district.
pub fn clubs_structure(
    rec: &mut impl Recorder,
    resp: &HttpResponse,
    required: &[&str],
    label: Option<&str>,
    sample: bool,
) -> Option<Vec<Value>> {
    let suffix = label.map(|l| format!(" ({l})")).unwrap_or_default();
    let structure = format!("Clubs Response Structure{suffix}");
    let data = parse_json(rec, &structure, resp)?;

    let Value::Array(clubs) = data else {
        rec.record_outcome(Outcome::fail(
            structure,
            "Response is a list: false | Clubs: N/A",
        ));
        return None;
    };
    rec.record_outcome(Outcome::pass(
        structure,
        format!("Response is a list: true | Clubs: {}", clubs.len()),
    ));

    if let Some(club) = clubs.first() {
        if sample {
            show_sample(rec, "Sample Club", club);
        }
        required_fields(
            rec,
            &format!("Club Structure{suffix}"),
            club,
            required,
            format!("Found {} club(s)", clubs.len()),
        );
    }

    Some(clubs)
}

/// A successful sign-in returns the user's profile.
pub fn auth_profile(rec: &mut impl Recorder, resp: &HttpResponse) -> bool {
    let Some(data) = parse_json(rec, AUTH_STRUCTURE, resp) else {
        return false;
    };
    let missing = missing_keys(&data, &["uid", "email"]);
    let passed = missing.is_empty();
    let message = if passed {
        "Contains user profile data: true".to_string()
    } else {
        format!("Contains user profile data: false | Missing fields: {}", missing.join(", "))
    };
    rec.record_outcome(Outcome::new(AUTH_STRUCTURE, passed, message));
    passed
}

/// Pull the new post's id out of a create-post response. The first usable
/// value of `postId` then `id` wins.
pub fn created_post_id(rec: &mut impl Recorder, resp: &HttpResponse) -> Option<String> {
    let data = parse_json(rec, CREATE_POST_STRUCTURE, resp)?;
    let id = ["postId", "id"]
        .iter()
        .find_map(|key| data.get(*key).and_then(id_text));

    match &id {
        Some(id) => rec.record_outcome(Outcome::pass(
            CREATE_POST_STRUCTURE,
            format!("Response contains post ID: {id}"),
        )),
        None => rec.record_outcome(Outcome::fail(
            CREATE_POST_STRUCTURE,
            "Response contains no postId or id",
        )),
    }
    id
}

const CORS_HEADERS: [&str; 3] = [
    "Access-Control-Allow-Origin",
    "Access-Control-Allow-Methods",
    "Access-Control-Allow-Headers",
];

/// CORS is considered enabled when `Access-Control-Allow-Origin` is present.
pub fn cors(rec: &mut impl Recorder, name: &str, resp: &HttpResponse, list_headers: bool) -> bool {
    let enabled = resp.header(CORS_HEADERS[0]).is_some();
    rec.record_outcome(Outcome::new(
        name,
        enabled,
        if enabled { "CORS enabled" } else { "CORS disabled" },
    ));

    if list_headers {
        let present: Vec<String> = CORS_HEADERS
            .iter()
            .filter_map(|h| resp.header(h).map(|v| format!("  {h}: {v}")))
            .collect();
        if !present.is_empty() {
            rec.detail(&format!("CORS Headers:\n{}", present.join("\n")));
        }
    }
    enabled
}

/// JSON content type, unless the endpoint refused us anyway.
pub fn content_type(rec: &mut impl Recorder, resp: &HttpResponse) -> bool {
    let content_type = resp.header("Content-Type").unwrap_or_default();
    let passed = content_type.contains("application/json") || matches!(resp.status, 401 | 404);
    rec.record_outcome(Outcome::new(
        "Content-Type Header",
        passed,
        format!("Content-Type: {content_type}"),
    ));
    passed
}
