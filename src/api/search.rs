use serde::Serialize;
use serde_json::Value;

use super::require_non_empty;
use crate::error::Result;
use crate::http_client::XyzHttpClient;

/// What to search for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SearchKind {
    Podcast,
    Episode,
    User,
}

/// Body of `POST /v1/search/create`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub keyword: String,
    #[serde(rename = "type")]
    pub kind: SearchKind,
    /// Restrict episode search to one podcast
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<String>,
    /// Opaque pagination key from a previous response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_more_key: Option<Value>,
}

impl SearchRequest {
    pub fn new(kind: SearchKind, keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            kind,
            pid: None,
            load_more_key: None,
        }
    }
}

/// Run a search; returns the whole body (`data`, `highlightWord`, `loadMoreKey`)
pub async fn search(client: &XyzHttpClient, request: &SearchRequest) -> Result<Value> {
    require_non_empty("keyword", &request.keyword)?;
    tracing::debug!(kind = ?request.kind, keyword = %request.keyword, "Searching");
    client.post_json("/v1/search/create", request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support;
    use mockito::Matcher;
    use serde_json::json;

    #[test]
    fn test_search_request_serialization() {
        let mut request = SearchRequest::new(SearchKind::Episode, "rust");
        request.pid = Some("p1".to_string());
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"keyword": "rust", "type": "EPISODE", "pid": "p1"})
        );
    }

    #[tokio::test]
    async fn test_search_passthrough() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/search/create")
            .match_body(Matcher::PartialJson(json!({"type": "PODCAST"})))
            .with_status(200)
            .with_body(r#"{"data":[{"pid":"p1"}],"loadMoreKey":{"loadMoreKey":10,"searchId":"s"}}"#)
            .create_async()
            .await;

        let client = test_support::client(server.url());
        let result = search(&client, &SearchRequest::new(SearchKind::Podcast, "tech"))
            .await
            .unwrap();
        assert_eq!(result["data"][0]["pid"], "p1");
        assert_eq!(result["loadMoreKey"]["searchId"], "s");
    }
}
