//! Startup configuration: feed endpoint plus display lookups.
//!
//! Loaded once from TOML; a missing file yields [`MonitorConfig::default`].

use crate::error::ConfigError;
use crate::record::IgnoreSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "MESHMON_CONFIG";
pub const DEFAULT_COLOR: &str = "white";
const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 1883;
const DEFAULT_TOPIC: &str = "msh/#";
const DEFAULT_KEEP_ALIVE_SECS: u64 = 60;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub feed: FeedConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub host: String,
    pub port: u16,
    pub topic: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tls: bool,
    /// PEM bundle trusted instead of the platform roots, for brokers with
    /// self-signed certificates.
    pub ca_file: Option<PathBuf>,
    pub client_id: Option<String>,
    pub keep_alive_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            topic: DEFAULT_TOPIC.to_string(),
            username: None,
            password: None,
            tls: false,
            ca_file: None,
            client_id: None,
            keep_alive_secs: DEFAULT_KEEP_ALIVE_SECS,
        }
    }
}

impl FeedConfig {
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub ignore_fields: IgnoreSet,
    /// Node identity -> display name.
    pub aliases: BTreeMap<String, String>,
    /// Display name -> color token.
    pub colors: BTreeMap<String, String>,
}

impl DisplayConfig {
    pub fn display_name<'a>(&'a self, node: &'a str) -> &'a str {
        self.aliases.get(node).map(String::as_str).unwrap_or(node)
    }

    pub fn color_for(&self, display_name: &str) -> &str {
        self.colors
            .get(display_name)
            .map(String::as_str)
            .unwrap_or(DEFAULT_COLOR)
    }

    pub fn is_ignored(&self, field: &str) -> bool {
        self.ignore_fields.contains(field)
    }
}

pub fn load_config(path: &Path) -> Result<MonitorConfig, ConfigError> {
    if !path.exists() {
        return Ok(MonitorConfig::default());
    }
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn resolve_config_path(explicit: Option<PathBuf>) -> PathBuf {
    resolve_config_path_with(explicit, |key| std::env::var(key).ok())
}

pub fn resolve_config_path_with<F>(explicit: Option<PathBuf>, env: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = explicit {
        return path;
    }
    let non_empty = |key: &str| env(key).filter(|value| !value.trim().is_empty());
    if let Some(value) = non_empty(CONFIG_ENV) {
        return PathBuf::from(value);
    }
    if let Some(value) = non_empty("XDG_CONFIG_HOME") {
        return PathBuf::from(value).join("meshmon").join("config.toml");
    }
    if let Some(value) = non_empty("HOME") {
        return PathBuf::from(value)
            .join(".config")
            .join("meshmon")
            .join("config.toml");
    }
    PathBuf::from("meshmon.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = load_config(&dir.path().join("absent.toml")).expect("load");
        assert_eq!(config, MonitorConfig::default());
        assert_eq!(config.feed.endpoint(), "localhost:1883");
    }

    #[test]
    fn partial_file_merges_with_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[feed]
host = "mqtt.example.org"
tls = true
ca_file = "/etc/meshmon/broker-ca.pem"

[display]
ignore_fields = ["id", "timestamp"]

[display.aliases]
"!a1b2c3d4" = "Base"

[display.colors]
Base = "cyan"
"#,
        )
        .expect("write config");

        let config = load_config(&path).expect("load");
        assert_eq!(config.feed.host, "mqtt.example.org");
        assert_eq!(config.feed.port, 1883);
        assert_eq!(config.feed.topic, "msh/#");
        assert!(config.feed.tls);
        assert_eq!(
            config.feed.ca_file.as_deref(),
            Some(Path::new("/etc/meshmon/broker-ca.pem"))
        );
        assert!(config.display.is_ignored("timestamp"));
        assert_eq!(config.display.display_name("!a1b2c3d4"), "Base");
        assert_eq!(config.display.display_name("!ffff"), "!ffff");
        assert_eq!(config.display.color_for("Base"), "cyan");
        assert_eq!(config.display.color_for("Other"), DEFAULT_COLOR);
    }

    #[test]
    fn invalid_file_reports_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[feed]\nport = \"not a port\"\n").expect("write config");

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn config_path_resolution_order() {
        let explicit = resolve_config_path_with(
            Some(PathBuf::from("/etc/meshmon.toml")),
            env_of(&[(CONFIG_ENV, "/tmp/other.toml")]),
        );
        assert_eq!(explicit, PathBuf::from("/etc/meshmon.toml"));

        let from_env = resolve_config_path_with(
            None,
            env_of(&[(CONFIG_ENV, "/tmp/other.toml"), ("HOME", "/home/op")]),
        );
        assert_eq!(from_env, PathBuf::from("/tmp/other.toml"));

        let xdg = resolve_config_path_with(
            None,
            env_of(&[("XDG_CONFIG_HOME", "/cfg"), ("HOME", "/home/op")]),
        );
        assert_eq!(xdg, PathBuf::from("/cfg/meshmon/config.toml"));

        let home = resolve_config_path_with(None, env_of(&[("HOME", "/home/op")]));
        assert_eq!(home, PathBuf::from("/home/op/.config/meshmon/config.toml"));

        let fallback = resolve_config_path_with(None, env_of(&[(CONFIG_ENV, "  ")]));
        assert_eq!(fallback, PathBuf::from("meshmon.toml"));
    }
}
