//! Configuration loading.
//!
//! Settings come from an optional TOML file and are then overridden by
//! environment variables. A missing file means defaults; a file that exists
//! but cannot be read or parsed is an error.
//!
//! # config.toml Format
//!
//! ```toml
//! log_level = "info"
//!
//! [aws]
//! profile = "default"
//! region = "us-east-1"
//!
//! [log_groups.solo]
//! server-side = ["/ecs/api", "/aws/lambda/worker"]
//! client-side = ["/web/frontend"]
//!
//! [query]
//! timeout_secs = 300
//! min_poll_interval_ms = 250
//! max_poll_interval_ms = 5000
//! ```

#![warn(clippy::all, rust_2018_idioms)]

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::data_plane::cloudwatch_logs::query::DEFAULT_PAYLOAD_FIELD;
use super::data_plane::cloudwatch_logs::{LogGroup, QuerySettings, SchemaSettings};

/// Profile that environment-provided log groups are filed under
pub const DEFAULT_LOG_GROUP_PROFILE: &str = "solo";
pub const SERVER_SIDE_CATEGORY: &str = "server-side";
pub const CLIENT_SIDE_CATEGORY: &str = "client-side";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: String,
    pub aws: AwsSettings,
    pub log_groups: LogGroupCatalog,
    pub query: QueryConfig,
    pub schema: SchemaConfig,
    pub mcp: McpConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            aws: AwsSettings::default(),
            log_groups: LogGroupCatalog::default(),
            query: QueryConfig::default(),
            schema: SchemaConfig::default(),
            mcp: McpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsSettings {
    pub profile: String,
    pub region: String,
}

impl Default for AwsSettings {
    fn default() -> Self {
        Self {
            profile: "default".to_string(),
            region: "us-east-1".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub timeout_secs: u64,
    pub min_poll_interval_ms: u64,
    pub max_poll_interval_ms: u64,
    pub default_window_hours: i64,
    pub payload_field: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            min_poll_interval_ms: 250,
            max_poll_interval_ms: 5000,
            default_window_hours: 24,
            payload_field: DEFAULT_PAYLOAD_FIELD.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub sample_limit: u32,
    pub window_hours: i64,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            sample_limit: 20,
            window_hours: 24,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct McpConfig {
    pub protocol_version: String,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            protocol_version: "2024-11-05".to_string(),
        }
    }
}

/// Static table of log group names: profile -> category -> names.
///
/// Only a lookup table; nothing here is checked against AWS.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogGroupCatalog(BTreeMap<String, BTreeMap<String, Vec<String>>>);

impl LogGroupCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the names stored under `profile`/`category`
    pub fn set(&mut self, profile: &str, category: &str, names: Vec<String>) {
        self.0
            .entry(profile.to_string())
            .or_default()
            .insert(category.to_string(), names);
    }

    /// Names under `profile`/`category`, empty when absent
    pub fn names(&self, profile: &str, category: &str) -> &[String] {
        self.0
            .get(profile)
            .and_then(|categories| categories.get(category))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every configured log group with its category label
    pub fn log_groups(&self) -> Vec<LogGroup> {
        self.0
            .values()
            .flat_map(|categories| categories.iter())
            .flat_map(|(category, names)| {
                names.iter().map(move |name| LogGroup {
                    name: name.clone(),
                    category: category.clone(),
                })
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|categories| categories.values().all(Vec::is_empty))
    }
}

/// Split a comma-separated list, dropping blanks
pub fn parse_name_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

impl AppConfig {
    /// Default location: `<config dir>/awswatch/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "", "awswatch")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from `path` (or the default location), then apply the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).or_else(Self::default_path);
        let mut config = match path {
            Some(path) => Self::load_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML file; a missing file yields defaults
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(profile) = non_empty("AWS_PROFILE") {
            self.aws.profile = profile;
        }
        if let Some(region) = non_empty("AWS_REGION") {
            self.aws.region = region;
        }
        if let Some(level) = non_empty("LOG_LEVEL") {
            self.log_level = level.to_lowercase();
        }
        if let Some(names) = non_empty("SERVER_SIDE_LOG_GROUPS") {
            self.log_groups.set(
                DEFAULT_LOG_GROUP_PROFILE,
                SERVER_SIDE_CATEGORY,
                parse_name_list(&names),
            );
        }
        if let Some(names) = non_empty("CLIENT_SIDE_LOG_GROUPS") {
            self.log_groups.set(
                DEFAULT_LOG_GROUP_PROFILE,
                CLIENT_SIDE_CATEGORY,
                parse_name_list(&names),
            );
        }
    }

    /// Executor settings. Poll intervals are clamped to at least 1ms with the
    /// ceiling no lower than the first delay; a window that is not a positive,
    /// representable number of hours is rejected.
    pub fn query_settings(&self) -> Result<QuerySettings> {
        let min = Duration::from_millis(self.query.min_poll_interval_ms.max(1));
        Ok(QuerySettings {
            timeout: Duration::from_secs(self.query.timeout_secs),
            min_poll_interval: min,
            max_poll_interval: Duration::from_millis(self.query.max_poll_interval_ms).max(min),
            default_window: window_hours("query.default_window_hours", self.query.default_window_hours)?,
            payload_field: self.query.payload_field.clone(),
        })
    }

    pub fn schema_settings(&self) -> Result<SchemaSettings> {
        Ok(SchemaSettings {
            sample_limit: self.schema.sample_limit,
            window: window_hours("schema.window_hours", self.schema.window_hours)?,
        })
    }
}

fn window_hours(key: &str, hours: i64) -> Result<chrono::Duration> {
    chrono::Duration::try_hours(hours)
        .filter(|_| hours > 0)
        .with_context(|| format!("{key} must be a positive number of hours, got {hours}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_file(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_toml_file_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
log_level = "debug"

[aws]
profile = "prod"

[log_groups.solo]
server-side = ["/ecs/api", "/aws/lambda/worker"]

[query]
timeout_secs = 30
"#,
        )
        .unwrap();

        let config = AppConfig::load_file(&path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.aws.profile, "prod");
        assert_eq!(config.aws.region, "us-east-1");
        assert_eq!(
            config.log_groups.names("solo", "server-side"),
            &["/ecs/api".to_string(), "/aws/lambda/worker".to_string()]
        );
        assert_eq!(config.query.timeout_secs, 30);
        assert_eq!(config.query.min_poll_interval_ms, 250);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[aws\nprofile = ").unwrap();
        assert!(AppConfig::load_file(&path).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("AWS_PROFILE", "staging"),
            ("LOG_LEVEL", "DEBUG"),
            ("SERVER_SIDE_LOG_GROUPS", "/ecs/api, ,/ecs/worker"),
            ("CLIENT_SIDE_LOG_GROUPS", ""),
        ]);
        let mut config = AppConfig::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.aws.profile, "staging");
        assert_eq!(config.log_level, "debug");
        assert_eq!(
            config.log_groups.names(DEFAULT_LOG_GROUP_PROFILE, SERVER_SIDE_CATEGORY),
            &["/ecs/api".to_string(), "/ecs/worker".to_string()]
        );
        assert!(config
            .log_groups
            .names(DEFAULT_LOG_GROUP_PROFILE, CLIENT_SIDE_CATEGORY)
            .is_empty());
    }

    #[test]
    fn test_catalog_lists_groups_with_categories() {
        let mut catalog = LogGroupCatalog::new();
        assert!(catalog.is_empty());
        catalog.set("solo", "server-side", vec!["/ecs/api".to_string()]);
        catalog.set("solo", "client-side", vec!["/web/app".to_string()]);

        let groups = catalog.log_groups();
        assert_eq!(
            groups,
            vec![
                LogGroup {
                    name: "/web/app".to_string(),
                    category: "client-side".to_string()
                },
                LogGroup {
                    name: "/ecs/api".to_string(),
                    category: "server-side".to_string()
                },
            ]
        );
        let json = serde_json::to_value(&catalog).unwrap();
        assert_eq!(json["solo"]["server-side"][0], "/ecs/api");
    }

    #[test]
    fn test_query_settings_clamp_intervals() {
        let mut config = AppConfig::default();
        config.query.min_poll_interval_ms = 0;
        config.query.max_poll_interval_ms = 0;
        let settings = config.query_settings().unwrap();
        assert_eq!(settings.min_poll_interval, Duration::from_millis(1));
        assert_eq!(settings.max_poll_interval, Duration::from_millis(1));
        assert_eq!(settings.payload_field, "@message");
    }

    #[test]
    fn test_out_of_range_windows_are_rejected() {
        let mut config = AppConfig::default();
        config.query.default_window_hours = i64::MAX;
        let err = config.query_settings().unwrap_err();
        assert!(err.to_string().contains("query.default_window_hours"));

        config.query.default_window_hours = 0;
        assert!(config.query_settings().is_err());

        config.query.default_window_hours = 6;
        assert_eq!(
            config.query_settings().unwrap().default_window,
            chrono::Duration::hours(6)
        );

        config.schema.window_hours = -1;
        let err = config.schema_settings().unwrap_err();
        assert!(err.to_string().contains("schema.window_hours"));
    }

    #[test]
    fn test_huge_timeout_is_kept() {
        let mut config = AppConfig::default();
        config.query.timeout_secs = u64::MAX;
        let settings = config.query_settings().unwrap();
        assert_eq!(settings.timeout, Duration::from_secs(u64::MAX));
    }
}
