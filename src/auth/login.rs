// SMS login against the Xiaoyuzhou auth endpoints

use anyhow::{Context, Result};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Client;

use super::types::{Credential, SendCodeRequest, SmsLoginRequest, SmsLoginResponse};
use crate::headers::{self, ACCESS_TOKEN_HEADER, REFRESH_TOKEN_HEADER};

/// Client for the phone + SMS code login exchange
pub struct LoginClient {
    client: Client,
    base_url: String,
}

impl LoginClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn json_headers() -> reqwest::header::HeaderMap {
        let mut request_headers = headers::app_headers();
        request_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        request_headers
    }

    /// Ask the platform to text a verification code to the phone
    pub async fn send_code(&self, area_code: &str, phone_number: &str) -> Result<()> {
        tracing::debug!("Requesting verification code");

        let response = self
            .client
            .post(format!("{}/v1/auth/sendCode", self.base_url))
            .headers(Self::json_headers())
            .json(&SendCodeRequest {
                mobile_phone_number: phone_number,
                area_code,
            })
            .send()
            .await
            .context("Failed to send verification code request")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Verification code request failed: {} - {}", status, error_text);
        }

        tracing::debug!("Verification code request accepted");
        Ok(())
    }

    /// Exchange phone number and code for a complete credential
    pub async fn login_with_code(
        &self,
        area_code: &str,
        phone_number: &str,
        code: &str,
    ) -> Result<Credential> {
        tracing::debug!("Logging in with verification code");

        let response = self
            .client
            .post(format!("{}/v1/auth/loginOrSignUpWithSMS", self.base_url))
            .headers(Self::json_headers())
            .json(&SmsLoginRequest {
                area_code,
                verify_code: code,
                mobile_phone_number: phone_number,
            })
            .send()
            .await
            .context("Failed to send login request")?;

        let status = response.status();

        // Tokens are returned in headers, identity in the body
        let header_str = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        let access_token = header_str(ACCESS_TOKEN_HEADER);
        let refresh_token = header_str(REFRESH_TOKEN_HEADER);

        let body = response
            .text()
            .await
            .context("Failed to read login response body")?;

        if !status.is_success() {
            anyhow::bail!("Login failed: {} - {}", status, body);
        }

        let data: SmsLoginResponse =
            serde_json::from_str(&body).context("Failed to parse login response")?;

        if access_token.is_empty() || refresh_token.is_empty() {
            anyhow::bail!("Login succeeded but tokens are missing from response headers");
        }
        if data.data.user.uid.is_empty() {
            anyhow::bail!("Login succeeded but uid is missing from response body");
        }

        tracing::info!(uid = %data.data.user.uid, "Login successful");

        Ok(Credential::minted(
            access_token,
            refresh_token,
            data.data.user.uid,
            data.data.user.nickname,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_send_code() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/auth/sendCode")
            .match_body(Matcher::Json(serde_json::json!({
                "mobilePhoneNumber": "13800000000",
                "areaCode": "+86"
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = LoginClient::new(Client::new(), server.url());
        client.send_code("+86", "13800000000").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_code_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/auth/sendCode")
            .with_status(400)
            .with_body("bad phone")
            .create_async()
            .await;

        let client = LoginClient::new(Client::new(), server.url());
        let err = client.send_code("+86", "1").await.unwrap_err();
        assert!(err.to_string().contains("bad phone"));
    }

    #[tokio::test]
    async fn test_login_with_code() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/auth/loginOrSignUpWithSMS")
            .match_body(Matcher::PartialJson(serde_json::json!({"verifyCode": "1234"})))
            .with_status(200)
            .with_header(ACCESS_TOKEN_HEADER, "A1")
            .with_header(REFRESH_TOKEN_HEADER, "R1")
            .with_body(r#"{"data":{"user":{"uid":"u-1","nickname":"listener"}}}"#)
            .create_async()
            .await;

        let client = LoginClient::new(Client::new(), server.url());
        let cred = client
            .login_with_code("+86", "13800000000", "1234")
            .await
            .unwrap();

        assert_eq!(cred.access_token, "A1");
        assert_eq!(cred.refresh_token, "R1");
        assert_eq!(cred.uid, "u-1");
        assert_eq!(cred.nickname, "listener");
        assert!(cred.last_refreshed_at > 0);
        assert!(cred.source_path.is_none());
    }

    #[tokio::test]
    async fn test_login_without_token_headers() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/auth/loginOrSignUpWithSMS")
            .with_status(200)
            .with_body(r#"{"data":{"user":{"uid":"u-1","nickname":"listener"}}}"#)
            .create_async()
            .await;

        let client = LoginClient::new(Client::new(), server.url());
        assert!(client
            .login_with_code("+86", "13800000000", "1234")
            .await
            .is_err());
    }
}
