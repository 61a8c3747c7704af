//! Application configuration module

use crate::domain::Source;
use anyhow::{anyhow, Context};
use std::env;
use std::time::Duration;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:8000/";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_base_url: Url,
    pub connect_timeout: Duration,
    pub user_agent: String,
    pub log_format: LogFormat,
    pub default_source: Source,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup
    pub fn from_vars<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = lookup("SKYTRACE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_base_url = Url::parse(&raw_url)
            .with_context(|| format!("SKYTRACE_API_URL is not a valid URL: {raw_url}"))?;

        let connect_timeout =
            Duration::from_secs(env_u64(&lookup, "SKYTRACE_CONNECT_TIMEOUT_SECS", 10));

        let user_agent = lookup("SKYTRACE_USER_AGENT")
            .unwrap_or_else(|| format!("skytrace/{}", env!("CARGO_PKG_VERSION")));

        let log_format = match lookup("SKYTRACE_LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => return Err(anyhow!("unsupported SKYTRACE_LOG_FORMAT: {other}")),
        };

        let default_source = match lookup("SKYTRACE_SOURCE") {
            Some(raw) => raw.parse::<Source>().map_err(|e| anyhow!(e))?,
            None => Source::default(),
        };

        Ok(Self {
            api_base_url,
            connect_timeout,
            user_agent,
            log_format,
            default_source,
        })
    }
}

fn env_u64<F>(lookup: &F, key: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
