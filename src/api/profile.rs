use serde_json::Value;

use super::{into_data, require_non_empty};
use crate::error::Result;
use crate::http_client::XyzHttpClient;

/// User profile by uid
pub async fn get_user_profile(client: &XyzHttpClient, uid: &str) -> Result<Value> {
    require_non_empty("uid", uid)?;
    tracing::debug!(uid, "Fetching user profile");
    let body = client.get_json("/v1/profile/get", &[("uid", uid)]).await?;
    Ok(into_data(body))
}

/// Follower/following/subscription counts by uid
pub async fn get_user_stats(client: &XyzHttpClient, uid: &str) -> Result<Value> {
    require_non_empty("uid", uid)?;
    tracing::debug!(uid, "Fetching user stats");
    let body = client.get_json("/v1/user-stats/get", &[("uid", uid)]).await?;
    Ok(into_data(body))
}
