use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// State backend configuration
    pub state: StateConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,

    /// Dedup, suppression and retention windows
    pub idempotency: IdempotencyConfig,

    /// Correlation lookbacks
    pub correlation: CorrelationConfig,

    /// Notification configuration
    pub notifications: NotificationConfig,

    /// Organizations seeded into the directory
    #[serde(default)]
    pub organizations: Vec<OrganizationSeed>,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path = std::env::var("CONFIG_PATH")
            .unwrap_or_else(|_| "config/signalroot.toml".to_string());
        Self::load_from(&config_path)
    }

    /// Load the embedded defaults, then `path` if present, then the environment
    pub fn load_from(path: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .add_source(config::File::with_name(path).required(false))
            // Override with environment variables (prefix: SIGNALROOT_)
            .add_source(
                config::Environment::with_prefix("SIGNALROOT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Embedded defaults only, no file or environment overlay
    pub fn embedded_defaults() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StateConfig {
    /// State backend type
    #[serde(default)]
    pub backend: StateBackend,

    /// Path for the embedded database (sled)
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StateBackend {
    #[default]
    Memory,
    Sled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Service name
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyConfig {
    /// Repeated webhooks for the same alert identity are dropped inside this window
    #[serde(default = "default_dedup_window")]
    pub dedup_window_secs: u64,

    /// Notifications for the same incident are withheld inside this window
    #[serde(default = "default_notification_window")]
    pub notification_window_secs: u64,

    /// Sweeper evicts webhook records and notification marks older than this
    #[serde(default = "default_retention")]
    pub retention_secs: u64,

    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    #[serde(default = "default_true")]
    pub sweeper_enabled: bool,

    #[serde(default)]
    pub link_retention: LinkRetentionConfig,
}

impl IdempotencyConfig {
    pub fn dedup_window(&self) -> Duration {
        secs(self.dedup_window_secs)
    }

    pub fn notification_window(&self) -> Duration {
        secs(self.notification_window_secs)
    }

    pub fn retention(&self) -> Duration {
        secs(self.retention_secs)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            dedup_window_secs: default_dedup_window(),
            notification_window_secs: default_notification_window(),
            retention_secs: default_retention(),
            sweep_interval_secs: default_sweep_interval(),
            sweeper_enabled: true,
            link_retention: LinkRetentionConfig::default(),
        }
    }
}

/// How long alert-to-incident links live
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LinkRetentionConfig {
    #[serde(default)]
    pub policy: LinkRetentionPolicy,

    /// Only read when `policy = "expire"`
    #[serde(default = "default_link_ttl")]
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LinkRetentionPolicy {
    #[default]
    Permanent,
    Expire,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationConfig {
    /// How far back to look for a deploy on the same service
    #[serde(default = "default_deploy_lookback")]
    pub deploy_lookback_secs: u64,

    /// How far back to look for a similar incident
    #[serde(default = "default_similar_lookback")]
    pub similar_incident_lookback_secs: u64,
}

impl CorrelationConfig {
    pub fn deploy_lookback(&self) -> Duration {
        secs(self.deploy_lookback_secs)
    }

    pub fn similar_incident_lookback(&self) -> Duration {
        secs(self.similar_incident_lookback_secs)
    }
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            deploy_lookback_secs: default_deploy_lookback(),
            similar_incident_lookback_secs: default_similar_lookback(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Emit a structured log line per notification
    #[serde(default = "default_true")]
    pub log_enabled: bool,

    /// Enable webhook notifications
    #[serde(default)]
    pub webhook_enabled: bool,

    /// Webhook URL receiving incident notifications
    pub webhook_url: Option<String>,

    /// Webhook timeout (seconds)
    #[serde(default = "default_webhook_timeout")]
    pub webhook_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrganizationSeed {
    pub key: String,
    pub name: String,
}

fn secs(value: u64) -> Duration {
    Duration::seconds(i64::try_from(value).unwrap_or(i64::MAX / 1000))
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "signalroot".to_string()
}

fn default_true() -> bool {
    true
}

fn default_dedup_window() -> u64 {
    1800 // 30 minutes
}

fn default_notification_window() -> u64 {
    3600 // 60 minutes
}

fn default_retention() -> u64 {
    7200 // 2 hours
}

fn default_sweep_interval() -> u64 {
    300
}

fn default_link_ttl() -> u64 {
    86400
}

fn default_deploy_lookback() -> u64 {
    3600
}

fn default_similar_lookback() -> u64 {
    604800 // 7 days
}

fn default_webhook_timeout() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        assert_eq!(default_http_port(), 8080);
        assert_eq!(default_dedup_window(), 1800);
        assert_eq!(default_notification_window(), 3600);
        assert_eq!(default_retention(), 7200);
        assert!(default_true());
    }

    #[test]
    fn test_embedded_defaults_parse() {
        let config = Config::embedded_defaults().unwrap();
        assert_eq!(config.state.backend, StateBackend::Memory);
        assert_eq!(config.idempotency.dedup_window(), Duration::minutes(30));
        assert_eq!(
            config.idempotency.notification_window(),
            Duration::minutes(60)
        );
        assert_eq!(config.idempotency.retention(), Duration::hours(2));
        assert_eq!(
            config.idempotency.link_retention.policy,
            LinkRetentionPolicy::Permanent
        );
        assert!(config
            .organizations
            .iter()
            .any(|org| org.key == "acme-corp"));
    }

    #[test]
    fn test_sweep_interval_never_zero() {
        let config = IdempotencyConfig {
            sweep_interval_secs: 0,
            ..IdempotencyConfig::default()
        };
        assert_eq!(config.sweep_interval(), std::time::Duration::from_secs(1));
    }
}
