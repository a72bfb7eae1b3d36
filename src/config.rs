use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use strum_macros::{Display, EnumString};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Where leaderboard metrics are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MetricsBackend {
    CloudWatch,
    /// Process memory, lost on restart
    Memory,
}

/// Runtime settings, read from the environment (and `.env` when present)
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub webhook_public_key: String,
    pub namespace_prefix: String,
    pub pinned_channel_name: String,
    pub presence_interval: Duration,
    pub presence_points: i64,
    pub call_timeout: Duration,
    pub metrics_backend: MetricsBackend,
    /// Bot token for the pinned message protocol; unset disables it
    pub discord_bot_token: Option<String>,
    /// `host` or `host:port` of the server to sample; unset disables sampling
    pub minecraft_server_host: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars().collect())
    }

    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(&vars, key);

        let bind_addr = get("BIND_ADDR")
            .unwrap_or("0.0.0.0:8080")
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                key: "BIND_ADDR",
                message: e.to_string(),
            })?;

        let webhook_public_key = get("DISCORD_WEBHOOK_PUBKEY")
            .ok_or(ConfigError::Missing("DISCORD_WEBHOOK_PUBKEY"))?
            .to_string();

        Ok(Self {
            bind_addr,
            webhook_public_key,
            namespace_prefix: get("LEADERBOARD_NAMESPACE_PREFIX")
                .unwrap_or_default()
                .to_string(),
            pinned_channel_name: get("PINNED_CHANNEL_NAME")
                .unwrap_or("leaderboard")
                .to_string(),
            presence_interval: Duration::from_secs(parse_value(
                "PRESENCE_INTERVAL_SECS",
                get("PRESENCE_INTERVAL_SECS"),
                60,
            )?),
            presence_points: parse_value("PRESENCE_POINTS", get("PRESENCE_POINTS"), 1)?,
            call_timeout: Duration::from_secs(parse_value(
                "CALL_TIMEOUT_SECS",
                get("CALL_TIMEOUT_SECS"),
                30,
            )?),
            metrics_backend: parse_value(
                "METRICS_BACKEND",
                get("METRICS_BACKEND"),
                MetricsBackend::CloudWatch,
            )?,
            discord_bot_token: get("DISCORD_BOT_TOKEN").map(str::to_string),
            minecraft_server_host: get("MINECRAFT_SERVER_HOST").map(str::to_string),
        })
    }
}

fn lookup<'a>(vars: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_value<T>(key: &'static str, value: Option<&str>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: e.to_string(),
        }),
    }
}
