use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::sync::Arc;

use podcast_bridge::api::{self, EpisodeListRequest, SearchRequest};
use podcast_bridge::auth::{self, HttpRefreshTransport, LoginClient, TokenManager};
use podcast_bridge::config::{Command, Config};
use podcast_bridge::error::{ApiError, AuthError};
use podcast_bridge::http_client::{self, XyzHttpClient};
use podcast_bridge::login_flow;

#[tokio::main]
async fn main() -> Result<()> {
    let (config, command) = Config::load()?;
    config.validate()?;

    // Logs go to stderr so stdout carries only JSON output
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::debug!(
        token_path = %config.token_path.display(),
        api_base_url = %config.api_base_url,
        "Configuration loaded"
    );

    let http = http_client::build_client(config.http_connect_timeout, config.http_request_timeout)?;
    let transport = Arc::new(HttpRefreshTransport::new(
        http.clone(),
        config.api_base_url.clone(),
    ));
    let token_manager = Arc::new(TokenManager::new(transport));

    if command == Command::Init {
        let login = LoginClient::new(http, config.api_base_url.clone());
        return login_flow::run_interactive_login(&login, &token_manager, &config.token_path)
            .await;
    }

    load_credential(&token_manager, &config).await?;

    let client = XyzHttpClient::new(
        token_manager.clone(),
        config.api_base_url.clone(),
        config.device_id.clone(),
        config.http_connect_timeout,
        config.http_request_timeout,
        config.http_max_retries,
    )?;

    match run_command(&client, command).await {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(e) => {
            tracing::error!("❌ {}", e);
            if e.requires_reauth() {
                eprintln!("Authentication required. Run 'podcast-bridge init' to log in again.");
            }
            Err(e.into())
        }
    }
}

/// Load the stored credential, aborting with a login hint when there is none
async fn load_credential(token_manager: &TokenManager, config: &Config) -> Result<()> {
    match token_manager.load_from(&config.token_path).await {
        Ok(()) => Ok(()),
        Err(e @ AuthError::NotFound(_)) => {
            tracing::error!("❌ {}", e);
            eprintln!("Error: credential not found. Run 'podcast-bridge init' to log in first.");
            Err(e).context("Startup failed: no credential")
        }
        Err(e @ AuthError::Corrupt { .. }) => {
            tracing::error!("❌ {}", e);
            eprintln!(
                "Error: credential file {} is unusable. Run 'podcast-bridge init' again.",
                config.token_path.display()
            );
            Err(e).context("Startup failed: corrupt credential")
        }
        Err(e) => Err(e).context("Startup failed: cannot read credential"),
    }
}

async fn run_command(client: &XyzHttpClient, command: Command) -> Result<Value, ApiError> {
    match command {
        Command::Init => unreachable!("init is handled before the credential is loaded"),
        Command::Status => {
            let credential = client.token_manager().current().await;
            Ok(json!({
                "uid": credential.uid,
                "nickname": credential.nickname,
                "last_updated_timestamp": credential.last_refreshed_at,
                "token_path": credential.source_path.map(|p| p.display().to_string()),
                "access_token": redact(&credential.access_token),
            }))
        }
        Command::Refresh => {
            let token = client.token_manager().refresh().await?;
            Ok(json!({ "refreshed": true, "access_token": redact(&token) }))
        }
        Command::Podcast { pid } => api::get_podcast(client, &pid).await,
        Command::Episodes {
            pid,
            order,
            limit,
            load_more_key,
        } => {
            let request = EpisodeListRequest {
                order: order.map(Into::into),
                limit,
                load_more_key: parse_key(load_more_key.as_deref())?,
                ..EpisodeListRequest::new(pid)
            };
            api::list_episodes(client, &request).await
        }
        Command::Episode { eid } => api::get_episode(client, &eid).await,
        Command::Profile { uid } => api::get_user_profile(client, &uid).await,
        Command::Stats { uid } => api::get_user_stats(client, &uid).await,
        Command::Search {
            kind,
            keyword,
            pid,
            load_more_key,
        } => {
            let request = SearchRequest {
                pid,
                load_more_key: parse_key(load_more_key.as_deref())?,
                ..SearchRequest::new(kind.into(), keyword)
            };
            api::search(client, &request).await
        }
    }
}

fn parse_key(raw: Option<&str>) -> Result<Option<Value>, ApiError> {
    raw.map(|s| {
        serde_json::from_str(s)
            .map_err(|e| ApiError::Validation(format!("load-more-key is not valid JSON: {}", e)))
    })
    .transpose()
}

fn redact(token: &str) -> String {
    format!("{}...", auth::token_prefix(token))
}
