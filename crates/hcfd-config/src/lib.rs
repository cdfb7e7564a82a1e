use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// LINE Messaging API push endpoint
pub const LINE_PUSH_ENDPOINT: &str = "https://api.line.me/v2/bot/message/push";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub base_url: String,
    pub rainfall_dataset: String,
    pub hazard_dataset: String,
    /// Usually supplied through `CWB_AUTH_KEY`
    pub auth_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://opendata.cwb.gov.tw/opendataapi".to_string(),
            rainfall_dataset: "O-A0002-001".to_string(),
            hazard_dataset: "W-C0033-001".to_string(),
            auth_key: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RainfallConfig {
    pub targets: Vec<String>,
    pub ten_minute_mm: f64,
    pub hourly_mm: f64,
}

impl Default for RainfallConfig {
    fn default() -> Self {
        Self {
            targets: vec!["新竹市".to_string()],
            ten_minute_mm: 6.0,
            hourly_mm: 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardConfig {
    /// Empty means every region
    pub targets: Vec<String>,
}

impl Default for HazardConfig {
    fn default() -> Self {
        Self {
            targets: vec!["新竹市".to_string(), "新竹縣".to_string()],
        }
    }
}

/// What to do when the seen-token check cannot reach the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupFailurePolicy {
    /// Treat the token as unseen and dispatch
    #[default]
    FailOpen,
    /// Skip dispatch and leave the token unrecorded
    FailClosed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_secs: u64,
    pub timezone: String,
    pub dedup_failure_policy: DedupFailurePolicy,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            timezone: "Asia/Taipei".to_string(),
            dedup_failure_policy: DedupFailurePolicy::FailOpen,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayKind {
    #[default]
    Line,
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub kind: GatewayKind,
    pub endpoint: String,
    /// Usually supplied through `LINE_CHANNEL_TOKEN`
    pub channel_token: Option<String>,
    pub timeout_secs: u64,
    pub dispatch_concurrency: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            kind: GatewayKind::Line,
            endpoint: LINE_PUSH_ENDPOINT.to_string(),
            channel_token: None,
            timeout_secs: 10,
            dispatch_concurrency: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Mysql,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// Usually supplied through `DATABASE_URL`
    pub url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Mysql,
            url: None,
            max_connections: 4,
            acquire_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub feed: FeedConfig,
    pub rainfall: RainfallConfig,
    pub hazard: HazardConfig,
    pub poll: PollConfig,
    pub gateway: GatewayConfig,
    pub store: StoreConfig,
    pub log: LogConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl AppConfig {
    /// Load configuration from HCFD_CONFIG path (TOML) if present, apply
    /// environment overrides, then validate
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("HCFD_CONFIG").unwrap_or_else(|_| "hcfd.toml".to_string());
        let mut cfg = if Path::new(&path).exists() {
            Self::from_path(&path)?
        } else {
            AppConfig::default()
        };
        cfg.apply_overrides(|key| std::env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str::<AppConfig>(s)?)
    }

    /// Secrets come from the environment when set there
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("CWB_AUTH_KEY") {
            self.feed.auth_key = Some(key);
        }
        if let Some(token) = lookup("LINE_CHANNEL_TOKEN") {
            self.gateway.channel_token = Some(token);
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.store.url = Some(url);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feed.auth_key.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::Missing("feed.auth_key (CWB_AUTH_KEY)"));
        }
        if self.gateway.kind == GatewayKind::Line
            && self.gateway.channel_token.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigError::Missing("gateway.channel_token (LINE_CHANNEL_TOKEN)"));
        }
        if self.store.kind == StoreKind::Mysql
            && self.store.url.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigError::Missing("store.url (DATABASE_URL)"));
        }
        if self.poll.interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "poll.interval_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.store.max_connections == 0 {
            return Err(ConfigError::Invalid {
                field: "store.max_connections",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.rainfall.ten_minute_mm < 0.0 || self.rainfall.hourly_mm < 0.0 {
            return Err(ConfigError::Invalid {
                field: "rainfall thresholds",
                reason: "must not be negative".to_string(),
            });
        }
        self.timezone()?;
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.poll
            .timezone
            .parse::<Tz>()
            .map_err(|e| ConfigError::Invalid {
                field: "poll.timezone",
                reason: e.to_string(),
            })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll.interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        }
    }

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.poll.interval_secs, 60);
        assert_eq!(cfg.poll.timezone, "Asia/Taipei");
        assert_eq!(cfg.poll.dedup_failure_policy, DedupFailurePolicy::FailOpen);
        assert_eq!(cfg.rainfall.targets, vec!["新竹市"]);
        assert_eq!(cfg.hazard.targets, vec!["新竹市", "新竹縣"]);
        assert_eq!(cfg.feed.rainfall_dataset, "O-A0002-001");
        assert_eq!(cfg.gateway.endpoint, LINE_PUSH_ENDPOINT);
        assert_eq!(cfg.gateway.dispatch_concurrency, 1);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [rainfall]
            targets = ["新竹縣"]
            hourly_mm = 20.0

            [poll]
            dedup_failure_policy = "fail_closed"

            [gateway]
            kind = "log"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.rainfall.targets, vec!["新竹縣"]);
        assert_eq!(cfg.rainfall.hourly_mm, 20.0);
        assert_eq!(cfg.rainfall.ten_minute_mm, 6.0);
        assert_eq!(cfg.poll.dedup_failure_policy, DedupFailurePolicy::FailClosed);
        assert_eq!(cfg.poll.interval_secs, 60);
        assert_eq!(cfg.gateway.kind, GatewayKind::Log);
    }

    #[test]
    fn test_env_overrides_secrets() {
        let mut cfg = AppConfig::default();
        cfg.apply_overrides(env(&[
            ("CWB_AUTH_KEY", "CWB-1234"),
            ("LINE_CHANNEL_TOKEN", "line-token"),
            ("DATABASE_URL", "mysql://hcfd@localhost/hcfd"),
        ]));

        assert_eq!(cfg.feed.auth_key.as_deref(), Some("CWB-1234"));
        assert_eq!(cfg.gateway.channel_token.as_deref(), Some("line-token"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_missing_credentials_are_rejected() {
        let cfg = AppConfig::default();
        assert!(matches!(cfg.validate(), Err(ConfigError::Missing(_))));

        let mut cfg = AppConfig::default();
        cfg.apply_overrides(env(&[("CWB_AUTH_KEY", "CWB-1234")]));
        cfg.store.kind = StoreKind::Memory;
        match cfg.validate() {
            Err(ConfigError::Missing(what)) => assert!(what.contains("LINE_CHANNEL_TOKEN")),
            other => panic!("expected missing channel token, got {:?}", other),
        }

        cfg.gateway.kind = GatewayKind::Log;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut cfg = AppConfig::default();
        cfg.apply_overrides(env(&[("CWB_AUTH_KEY", "k"), ("LINE_CHANNEL_TOKEN", "t")]));
        cfg.store.kind = StoreKind::Memory;
        assert!(cfg.validate().is_ok());

        cfg.poll.timezone = "Mars/Olympus".to_string();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { field: "poll.timezone", .. })
        ));

        cfg.poll.timezone = "Asia/Taipei".to_string();
        cfg.poll.interval_secs = 0;
        assert!(cfg.validate().is_err());

        cfg.poll.interval_secs = 60;
        cfg.store.max_connections = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { field: "store.max_connections", .. })
        ));

        cfg.store.max_connections = 4;
        cfg.rainfall.hourly_mm = -1.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[poll]\ninterval_secs = 120\ntimezone = \"Asia/Taipei\"\n\n[hazard]\ntargets = []"
        )
        .unwrap();

        let cfg = AppConfig::from_path(file.path()).unwrap();
        assert_eq!(cfg.poll_interval(), Duration::from_secs(120));
        assert!(cfg.hazard.targets.is_empty());
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(
            AppConfig::from_toml_str("[poll\ninterval_secs = 1"),
            Err(ConfigError::Toml(_))
        ));
    }
}
