// Token refresh logic

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Client;

use super::types::{RefreshTokenResponse, TokenPair};
use crate::headers::{self, REFRESH_TOKEN_HEADER};

/// Exchanges a refresh token for a new token pair
#[async_trait]
pub trait RefreshTransport: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair>;
}

/// Refresh over `POST /app_auth_tokens.refresh`
pub struct HttpRefreshTransport {
    client: Client,
    base_url: String,
}

impl HttpRefreshTransport {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn refresh_url(&self) -> String {
        format!("{}/app_auth_tokens.refresh", self.base_url)
    }
}

#[async_trait]
impl RefreshTransport for HttpRefreshTransport {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        tracing::info!("Refreshing Xiaoyuzhou access token...");

        let mut request_headers = headers::app_headers();
        request_headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded; charset=utf-8"),
        );
        request_headers.insert(
            REFRESH_TOKEN_HEADER,
            HeaderValue::from_str(refresh_token)
                .context("Refresh token is not a valid header value")?,
        );

        let response = self
            .client
            .post(self.refresh_url())
            .headers(request_headers)
            .send()
            .await
            .context("Failed to send token refresh request")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(
                "Token refresh failed: status={}, body={}",
                status,
                error_text
            );
            anyhow::bail!("Token refresh failed: {} - {}", status, error_text);
        }

        let data: RefreshTokenResponse = response
            .json()
            .await
            .context("Failed to parse token refresh response")?;

        if !data.success {
            anyhow::bail!("Token refresh response reported success=false");
        }
        if data.access_token.is_empty() || data.refresh_token.is_empty() {
            anyhow::bail!("Token refresh response does not contain both tokens");
        }

        tracing::info!("Token refreshed via app_auth_tokens.refresh");

        Ok(TokenPair {
            access_token: data.access_token,
            refresh_token: data.refresh_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(server: &mockito::ServerGuard) -> HttpRefreshTransport {
        HttpRefreshTransport::new(Client::new(), server.url())
    }

    #[tokio::test]
    async fn test_refresh_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/app_auth_tokens.refresh")
            .match_header(REFRESH_TOKEN_HEADER, "R1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"success":true,"x-jike-access-token":"A2","x-jike-refresh-token":"R2"}"#,
            )
            .create_async()
            .await;

        let pair = transport(&server).refresh("R1").await.unwrap();
        assert_eq!(
            pair,
            TokenPair {
                access_token: "A2".to_string(),
                refresh_token: "R2".to_string(),
            }
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_rejected_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/app_auth_tokens.refresh")
            .with_status(401)
            .with_body("expired")
            .create_async()
            .await;

        let err = transport(&server).refresh("R1").await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_refresh_success_false() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/app_auth_tokens.refresh")
            .with_status(200)
            .with_body(r#"{"success":false}"#)
            .create_async()
            .await;

        assert!(transport(&server).refresh("R1").await.is_err());
    }

    #[tokio::test]
    async fn test_refresh_empty_tokens() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/app_auth_tokens.refresh")
            .with_status(200)
            .with_body(r#"{"success":true,"x-jike-access-token":"A2","x-jike-refresh-token":""}"#)
            .create_async()
            .await;

        assert!(transport(&server).refresh("R1").await.is_err());
    }
}
