use serde::Serialize;
use serde_json::Value;

use super::{into_data, require_non_empty};
use crate::error::Result;
use crate::http_client::XyzHttpClient;

/// Episode list ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeOrder {
    Asc,
    Desc,
}

/// Body of `POST /v1/episode/list`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeListRequest {
    pub pid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<EpisodeOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Opaque pagination key from a previous response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_more_key: Option<Value>,
}

impl EpisodeListRequest {
    pub fn new(pid: impl Into<String>) -> Self {
        Self {
            pid: pid.into(),
            order: None,
            limit: None,
            load_more_key: None,
        }
    }
}

/// Podcast details by pid
pub async fn get_podcast(client: &XyzHttpClient, pid: &str) -> Result<Value> {
    require_non_empty("pid", pid)?;
    tracing::debug!(pid, "Fetching podcast details");
    let body = client.get_json("/v1/podcast/get", &[("pid", pid)]).await?;
    Ok(into_data(body))
}

/// One page of a podcast's episodes (whole response, including pagination keys)
pub async fn list_episodes(client: &XyzHttpClient, request: &EpisodeListRequest) -> Result<Value> {
    require_non_empty("pid", &request.pid)?;
    tracing::debug!(pid = %request.pid, "Listing podcast episodes");
    client.post_json("/v1/episode/list", request).await
}

/// Episode details by eid
pub async fn get_episode(client: &XyzHttpClient, eid: &str) -> Result<Value> {
    require_non_empty("eid", eid)?;
    tracing::debug!(eid, "Fetching episode details");
    let body = client.get_json("/v1/episode/get", &[("eid", eid)]).await?;
    Ok(into_data(body))
}
