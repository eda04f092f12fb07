// Static iOS client header set sent with every request

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};

pub const ACCESS_TOKEN_HEADER: &str = "x-jike-access-token";
pub const REFRESH_TOKEN_HEADER: &str = "x-jike-refresh-token";
pub const DEVICE_ID_HEADER: &str = "x-jike-device-id";

pub const CLIENT_USER_AGENT: &str = "Xiaoyuzhou/2.57.1 (build:1576; iOS 17.4.1)";

/// Device id sent when none is configured
pub const DEFAULT_DEVICE_ID: &str = "81ADBFD6-6921-482B-9AB9-A29E7CC7BB55";

const APP_HEADERS: &[(&str, &str)] = &[
    ("market", "AppStore"),
    ("app-buildno", "1576"),
    ("os", "ios"),
    ("manufacturer", "Apple"),
    ("bundleid", "app.podcast.cosmos"),
    ("abtest-info", r#"{"old_user_discovery_feed":"enable"}"#),
    ("model", "iPhone14,2"),
    ("app-permissions", "4"),
    ("app-version", "2.57.1"),
    ("wificonnected", "true"),
    ("os-version", "17.4.1"),
    ("x-custom-xiaoyuzhou-app-dev", ""),
];

/// Headers shared by auth and API endpoints
pub fn app_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("zh-Hant-HK;q=1.0, zh-Hans-CN;q=0.9"),
    );
    for &(name, value) in APP_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    headers
}

/// Headers for an authenticated API call
pub fn api_headers(access_token: &str, device_id: &str, now: DateTime<Local>) -> Result<HeaderMap> {
    let mut headers = app_headers();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("zh-Hans-CN;q=1.0"));
    headers.insert(
        ACCESS_TOKEN_HEADER,
        HeaderValue::from_str(access_token).context("Access token is not a valid header value")?,
    );
    headers.insert(
        DEVICE_ID_HEADER,
        HeaderValue::from_str(device_id).context("Device id is not a valid header value")?,
    );
    headers.insert(
        "local-time",
        HeaderValue::from_str(&now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
            .context("Invalid Local-Time header")?,
    );
    headers.insert("timezone", HeaderValue::from_static("Asia/Shanghai"));
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_headers() {
        let headers = app_headers();
        assert_eq!(headers.get(USER_AGENT).unwrap(), CLIENT_USER_AGENT);
        assert_eq!(headers.get("bundleid").unwrap(), "app.podcast.cosmos");
        assert!(headers.get(ACCESS_TOKEN_HEADER).is_none());
    }

    #[test]
    fn test_api_headers_carry_token() {
        let headers = api_headers("token-123", DEFAULT_DEVICE_ID, Local::now()).unwrap();
        assert_eq!(headers.get(ACCESS_TOKEN_HEADER).unwrap(), "token-123");
        assert_eq!(headers.get(DEVICE_ID_HEADER).unwrap(), DEFAULT_DEVICE_ID);
        assert_eq!(headers.get("timezone").unwrap(), "Asia/Shanghai");
        assert!(headers.get("local-time").is_some());
    }

    #[test]
    fn test_api_headers_reject_bad_token() {
        assert!(api_headers("bad\ntoken", DEFAULT_DEVICE_ID, Local::now()).is_err());
    }
}
