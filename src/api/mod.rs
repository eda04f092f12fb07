// Passthrough operations on the Xiaoyuzhou API
// Payloads are returned as raw JSON; no schema is applied

mod podcast;
mod profile;
mod search;

pub use podcast::{get_episode, get_podcast, list_episodes, EpisodeListRequest, EpisodeOrder};
pub use profile::{get_user_profile, get_user_stats};
pub use search::{search, SearchKind, SearchRequest};

use serde_json::Value;

use crate::error::{ApiError, Result};

/// Reject empty identifiers before any token lookup or request
fn require_non_empty(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation(format!("{} cannot be empty", name)));
    }
    Ok(())
}

/// Unwrap the `data` field of a `{"data": ...}` envelope
fn into_data(mut body: Value) -> Value {
    match body.get_mut("data") {
        Some(data) => data.take(),
        None => body,
    }
}
