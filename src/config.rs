use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::api::{EpisodeOrder, SearchKind};
use crate::auth;
use crate::headers::DEFAULT_DEVICE_ID;

pub const DEFAULT_API_BASE_URL: &str = "https://api.xiaoyuzhoufm.com";

/// Podcast Bridge - authenticated access to the Xiaoyuzhou FM API
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path of the credential file
    #[arg(short = 't', long, env = "XYZ_TOKEN_PATH", global = true)]
    pub token_path: Option<String>,

    /// API base URL
    #[arg(long, env = "XYZ_API_BASE_URL", default_value = DEFAULT_API_BASE_URL, global = true)]
    pub api_base_url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Device id sent with API requests
    #[arg(long, env = "XYZ_DEVICE_ID", default_value = DEFAULT_DEVICE_ID, global = true)]
    pub device_id: String,

    /// HTTP connect timeout in seconds
    #[arg(long, env = "HTTP_CONNECT_TIMEOUT", default_value = "10", global = true)]
    pub http_connect_timeout: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "30", global = true)]
    pub http_timeout: u64,

    /// HTTP max retries for 429/5xx responses
    #[arg(long, env = "HTTP_MAX_RETRIES", default_value = "2", global = true)]
    pub http_retries: u32,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Log in with phone number + SMS code and save the credential
    Init,
    /// Show the loaded credential (tokens redacted)
    Status,
    /// Force a token refresh now
    Refresh,
    /// Podcast details
    Podcast { pid: String },
    /// List a podcast's episodes
    Episodes {
        pid: String,
        #[arg(long, value_enum)]
        order: Option<OrderArg>,
        #[arg(long)]
        limit: Option<u32>,
        /// Pagination key (JSON) from a previous page
        #[arg(long)]
        load_more_key: Option<String>,
    },
    /// Episode details
    Episode { eid: String },
    /// User profile
    Profile { uid: String },
    /// User follower/subscription stats
    Stats { uid: String },
    /// Search podcasts, episodes or users
    Search {
        #[arg(value_enum)]
        kind: KindArg,
        keyword: String,
        /// Restrict episode search to one podcast
        #[arg(long)]
        pid: Option<String>,
        /// Pagination key (JSON) from a previous page
        #[arg(long)]
        load_more_key: Option<String>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq)]
pub enum OrderArg {
    Asc,
    Desc,
}

impl From<OrderArg> for EpisodeOrder {
    fn from(value: OrderArg) -> Self {
        match value {
            OrderArg::Asc => EpisodeOrder::Asc,
            OrderArg::Desc => EpisodeOrder::Desc,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq)]
pub enum KindArg {
    Podcast,
    Episode,
    User,
}

impl From<KindArg> for SearchKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Podcast => SearchKind::Podcast,
            KindArg::Episode => SearchKind::Episode,
            KindArg::User => SearchKind::User,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    // Credential storage
    pub token_path: PathBuf,

    // Upstream
    pub api_base_url: String,
    pub device_id: String,

    // HTTP client
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,
    pub http_max_retries: u32,

    // Logging
    pub log_level: String,
}

impl Config {
    /// Load configuration with priority: CLI > ENV (.env included) > defaults
    pub fn load() -> Result<(Self, Command)> {
        dotenvy::dotenv().ok();
        let args = CliArgs::parse();
        let command = args.command.clone();
        Ok((Self::from_args(args)?, command))
    }

    fn from_args(args: CliArgs) -> Result<Self> {
        let token_path = match args.token_path {
            Some(path) => expand_tilde(&path),
            None => auth::default_token_path()
                .context("Cannot determine home directory (set XYZ_TOKEN_PATH)")?,
        };

        Ok(Config {
            token_path,
            api_base_url: args.api_base_url,
            device_id: args.device_id,
            http_connect_timeout: args.http_connect_timeout,
            http_request_timeout: args.http_timeout,
            http_max_retries: args.http_retries,
            log_level: args.log_level,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            anyhow::bail!(
                "XYZ_API_BASE_URL must be an http(s) URL: {}",
                self.api_base_url
            );
        }
        if self.device_id.trim().is_empty() {
            anyhow::bail!("XYZ_DEVICE_ID must not be empty");
        }
        if self.http_connect_timeout == 0 {
            anyhow::bail!("HTTP_CONNECT_TIMEOUT must be greater than zero");
        }
        if self.http_request_timeout == 0 {
            anyhow::bail!("HTTP_REQUEST_TIMEOUT must be greater than zero");
        }
        Ok(())
    }
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
