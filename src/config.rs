use clap::{Args, Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub database: DatabaseConfig,

    #[command(flatten)]
    pub apns: ApnsConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,

    #[command(flatten)]
    pub server: ServerConfig,
}

#[derive(Clone, Debug, Args)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[arg(long = "database-url", env = "PUSHKEEPER_DATABASE_URL")]
    pub url: String,

    /// Maximum number of pooled connections
    #[arg(long, env = "PUSHKEEPER_DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub max_connections: u32,

    /// Minimum number of idle connections kept open
    #[arg(long, env = "PUSHKEEPER_DB_MIN_CONNECTIONS", default_value_t = 1)]
    pub min_connections: u32,

    /// How long to wait for a pooled connection before giving up
    #[arg(long, env = "PUSHKEEPER_DB_ACQUIRE_TIMEOUT_SECS", default_value_t = 5)]
    pub acquire_timeout_secs: u64,

    #[arg(long, env = "PUSHKEEPER_DB_IDLE_TIMEOUT_SECS", default_value_t = 600)]
    pub idle_timeout_secs: u64,

    #[arg(long, env = "PUSHKEEPER_DB_MAX_LIFETIME_SECS", default_value_t = 1800)]
    pub max_lifetime_secs: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ApnsEnvironment {
    #[default]
    Sandbox,
    Production,
}

impl ApnsEnvironment {
    #[must_use]
    pub const fn host(self) -> &'static str {
        match self {
            Self::Sandbox => "https://api.sandbox.push.apple.com",
            Self::Production => "https://api.push.apple.com",
        }
    }
}

#[derive(Clone, Debug, Args)]
pub struct ApnsConfig {
    /// Which APNs gateway to talk to
    #[arg(long = "apns-environment", env = "PUSHKEEPER_APNS_ENVIRONMENT", value_enum, default_value_t = ApnsEnvironment::Sandbox)]
    pub environment: ApnsEnvironment,

    /// Bundle identifier of the receiving app (apns-topic)
    #[arg(long = "apns-topic", env = "PUSHKEEPER_APNS_TOPIC")]
    pub topic: String,

    /// Apple developer team identifier
    #[arg(long = "apns-team-id", env = "PUSHKEEPER_APNS_TEAM_ID")]
    pub team_id: String,

    /// Identifier of the provider signing key
    #[arg(long = "apns-key-id", env = "PUSHKEEPER_APNS_KEY_ID")]
    pub key_id: String,

    /// Path to the PKCS#8 (.p8) provider signing key
    #[arg(long = "apns-signing-key-path", env = "PUSHKEEPER_APNS_SIGNING_KEY_PATH")]
    pub signing_key_path: PathBuf,

    /// Timeout for a single send request
    #[arg(long = "apns-request-timeout-secs", env = "PUSHKEEPER_APNS_REQUEST_TIMEOUT_SECS", default_value_t = 10)]
    pub request_timeout_secs: u64,

    /// Capacity of the failed-notification broadcast channel
    #[arg(long = "apns-failure-channel-capacity", env = "PUSHKEEPER_APNS_FAILURE_CHANNEL_CAPACITY", default_value_t = 256)]
    pub failure_channel_capacity: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Default, Args)]
pub struct TelemetryConfig {
    /// Log output format
    #[arg(long, env = "PUSHKEEPER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// OTLP collector endpoint; exporting is disabled when unset
    #[arg(long, env = "PUSHKEEPER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// How long to wait for background workers on shutdown
    #[arg(long, env = "PUSHKEEPER_SHUTDOWN_TIMEOUT_SECS", default_value_t = 10)]
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { shutdown_timeout_secs: 10 }
    }
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}
