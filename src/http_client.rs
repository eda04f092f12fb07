use anyhow::{Context, Result};
use reqwest::{Client, Method, Request, Response};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::TokenManager;
use crate::error::ApiError;
use crate::headers;

/// HTTP client for the Xiaoyuzhou API
///
/// Every request obtains its access token from the `TokenManager` right
/// before it is built; if that fails no request is sent.
pub struct XyzHttpClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// Process-wide token manager
    token_manager: Arc<TokenManager>,

    /// API root, without trailing slash
    base_url: String,

    /// Value of the device id header
    device_id: String,

    /// Maximum number of retries
    max_retries: u32,

    /// Base delay for exponential backoff (milliseconds)
    base_delay_ms: u64,
}

impl XyzHttpClient {
    /// Create a new HTTP client
    pub fn new(
        token_manager: Arc<TokenManager>,
        base_url: impl Into<String>,
        device_id: impl Into<String>,
        connect_timeout: u64,
        request_timeout: u64,
        max_retries: u32,
    ) -> Result<Self> {
        let client = build_client(connect_timeout, request_timeout)?;

        Ok(Self {
            client,
            token_manager,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            device_id: device_id.into(),
            max_retries,
            base_delay_ms: 500,
        })
    }

    /// Override the backoff base delay
    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    pub fn token_manager(&self) -> &Arc<TokenManager> {
        &self.token_manager
    }

    /// Build an authenticated request for `path`
    async fn authorized_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<Request, ApiError> {
        let access_token = self.token_manager.get_valid_access_token().await?;
        let request_headers =
            headers::api_headers(&access_token, &self.device_id, chrono::Local::now())?;

        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .headers(request_headers);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        builder
            .build()
            .context("Failed to build request")
            .map_err(ApiError::from)
    }

    /// Authenticated GET returning the parsed JSON body
    pub async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, ApiError> {
        let request = self
            .authorized_request::<()>(Method::GET, path, query, None)
            .await?;
        let response = self.request_with_retry(request).await?;
        read_json(response).await
    }

    /// Authenticated POST of a JSON body returning the parsed JSON body
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Value, ApiError> {
        let request = self
            .authorized_request(Method::POST, path, &[], Some(body))
            .await?;
        let response = self.request_with_retry(request).await?;
        read_json(response).await
    }

    /// Execute a request with retry logic
    /// - 429 / 5xx: exponential backoff
    /// - connection errors: exponential backoff
    pub async fn request_with_retry(&self, request: Request) -> Result<Response, ApiError> {
        let mut attempt = 0;

        let method = request.method().clone();
        let url = request.url().clone();
        tracing::debug!(
            method = %method,
            url = %url,
            "Sending HTTP request"
        );

        loop {
            let req = request.try_clone().ok_or_else(|| {
                ApiError::Internal(anyhow::anyhow!("Request body is not cloneable"))
            })?;

            match self.client.execute(req).await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        tracing::debug!(status = %status, "Request successful");
                        return Ok(response);
                    }

                    let retryable = status.as_u16() == 429 || status.is_server_error();
                    if retryable && attempt < self.max_retries {
                        let delay = self.calculate_backoff_delay(attempt);
                        tracing::warn!(
                            "Received {}, retrying after {}ms (attempt {}/{})",
                            status,
                            delay,
                            attempt + 1,
                            self.max_retries
                        );
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                        attempt += 1;
                        continue;
                    }

                    let error_text = response.text().await.unwrap_or_default();
                    tracing::error!(
                        status = status.as_u16(),
                        url = %url,
                        response_body = %error_text,
                        attempt = attempt + 1,
                        "HTTP request failed with error response"
                    );
                    return Err(ApiError::Upstream {
                        status: status.as_u16(),
                        message: error_text,
                    });
                }

                Err(e) => {
                    let error_kind = if e.is_timeout() {
                        "timeout"
                    } else if e.is_connect() {
                        "connection_failed"
                    } else if e.is_request() {
                        "request_error"
                    } else {
                        "unknown"
                    };

                    if attempt < self.max_retries {
                        let delay = self.calculate_backoff_delay(attempt);
                        tracing::warn!(
                            error_kind = error_kind,
                            error = %e,
                            url = %url,
                            "Request failed, retrying after {}ms (attempt {}/{})",
                            delay,
                            attempt + 1,
                            self.max_retries
                        );
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                        attempt += 1;
                        continue;
                    }

                    tracing::error!(
                        error_kind = error_kind,
                        error = %e,
                        url = %url,
                        total_attempts = attempt + 1,
                        "HTTP request failed after all retries"
                    );
                    return Err(ApiError::Internal(anyhow::anyhow!(
                        "HTTP request failed: {} (kind: {})",
                        e,
                        error_kind
                    )));
                }
            }
        }
    }

    /// Calculate exponential backoff delay
    fn calculate_backoff_delay(&self, attempt: u32) -> u64 {
        // base_delay * 2^attempt plus up to 10% jitter
        let delay = self.base_delay_ms * 2_u64.pow(attempt);
        let jitter = (delay as f64 * 0.1 * rand::random::<f64>()) as u64;
        delay + jitter
    }
}

/// reqwest client with the default transport timeouts
pub fn build_client(connect_timeout: u64, request_timeout: u64) -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout))
        .timeout(Duration::from_secs(request_timeout))
        .build()
        .context("Failed to create HTTP client")
}

async fn read_json(response: Response) -> Result<Value, ApiError> {
    let body = response
        .text()
        .await
        .context("Failed to read response body")?;
    let value: Value = serde_json::from_str(&body)
        .with_context(|| format!("Failed to parse response JSON: {}", body))?;
    Ok(value)
}
