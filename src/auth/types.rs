// Authentication types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One authenticated session: the token pair plus identity metadata
///
/// Serialized layout matches the on-disk `token.json` file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(default)]
    pub access_token: String,

    #[serde(default)]
    pub refresh_token: String,

    /// Subject id of the logged-in user
    #[serde(default)]
    pub uid: String,

    /// Display name of the logged-in user
    #[serde(default)]
    pub nickname: String,

    /// Seconds since epoch of the last successful login or refresh (0 = unset)
    #[serde(
        rename = "last_updated_timestamp",
        default,
        skip_serializing_if = "is_zero"
    )]
    pub last_refreshed_at: i64,

    /// Where this credential was loaded from or last saved to
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

impl Credential {
    /// Build a complete credential minted just now
    pub fn minted(
        access_token: String,
        refresh_token: String,
        uid: String,
        nickname: String,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            uid,
            nickname,
            last_refreshed_at: chrono::Utc::now().timestamp(),
            source_path: None,
        }
    }

    /// No tokens at all (unauthenticated)
    pub fn is_empty(&self) -> bool {
        self.access_token.is_empty() && self.refresh_token.is_empty()
    }

    /// Both tokens present
    pub fn is_complete(&self) -> bool {
        !self.access_token.is_empty() && !self.refresh_token.is_empty()
    }

    /// Equality over the persisted fields only (ignores `source_path`)
    pub fn same_contents(&self, other: &Credential) -> bool {
        self.access_token == other.access_token
            && self.refresh_token == other.refresh_token
            && self.uid == other.uid
            && self.nickname == other.nickname
            && self.last_refreshed_at == other.last_refreshed_at
    }
}

/// First eight characters of a token, for logs and status output
pub fn token_prefix(token: &str) -> &str {
    match token.char_indices().nth(8) {
        Some((end, _)) => &token[..end],
        None => token,
    }
}

/// Token pair returned by a refresh exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Refresh endpoint response
#[derive(Deserialize)]
pub struct RefreshTokenResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(rename = "x-jike-access-token", default)]
    pub access_token: String,
    #[serde(rename = "x-jike-refresh-token", default)]
    pub refresh_token: String,
}

/// sendCode request body
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCodeRequest<'a> {
    pub mobile_phone_number: &'a str,
    pub area_code: &'a str,
}

/// loginOrSignUpWithSMS request body
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsLoginRequest<'a> {
    pub area_code: &'a str,
    pub verify_code: &'a str,
    pub mobile_phone_number: &'a str,
}

/// loginOrSignUpWithSMS response body (tokens travel in headers)
#[derive(Deserialize, Default)]
pub struct SmsLoginResponse {
    #[serde(default)]
    pub data: SmsLoginData,
}

#[derive(Deserialize, Default)]
pub struct SmsLoginData {
    #[serde(default)]
    pub user: SmsLoginUser,
}

#[derive(Deserialize, Default)]
pub struct SmsLoginUser {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub nickname: String,
}
