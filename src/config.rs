//! Command-line and environment configuration.

use clap::Parser;
use std::{
    path::PathBuf,
    time::Duration,
};
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:4000/graphql";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("endpoint must use http or https, got `{0}`")]
    UnsupportedScheme(String),
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("could not expand log directory `{path}`: {reason}")]
    LogDir { path: String, reason: String },
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// GraphQL endpoint of the casino backend.
    #[arg(long, env = "GOMBOC_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: Url,

    /// Sent as `Authorization: Bearer <token>` when set.
    #[arg(long, env = "GOMBOC_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    #[arg(long, env = "GOMBOC_REQUEST_TIMEOUT_SECS", default_value_t = 10)]
    pub request_timeout_secs: u64,

    /// How long notifications stay on screen.
    #[arg(long, env = "GOMBOC_TOAST_SECS", default_value_t = 5)]
    pub toast_secs: u64,

    #[arg(long, env = "GOMBOC_LOG_DIR", default_value = "~/.gomboc/logs")]
    pub log_dir: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub endpoint: Url,
    pub auth_token: Option<String>,
    pub request_timeout: Duration,
    pub toast_ttl: Duration,
    pub log_dir: PathBuf,
}

impl AppConfig {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        if !matches!(args.endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(args.endpoint.scheme().to_string()));
        }
        if args.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroDuration("request timeout"));
        }
        if args.toast_secs == 0 {
            return Err(ConfigError::ZeroDuration("toast duration"));
        }
        let log_dir = shellexpand::full(&args.log_dir)
            .map_err(|err| ConfigError::LogDir {
                path: args.log_dir.clone(),
                reason: err.to_string(),
            })?
            .into_owned();
        Ok(Self {
            endpoint: args.endpoint,
            auth_token: args.auth_token.filter(|token| !token.trim().is_empty()),
            request_timeout: Duration::from_secs(args.request_timeout_secs),
            toast_ttl: Duration::from_secs(args.toast_secs),
            log_dir: PathBuf::from(log_dir),
        })
    }
}
