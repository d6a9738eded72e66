use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::Context;

pub const SETTINGS_FILE: &str = "wizard.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub database_url: String,
    /// Form schema TOML; the built-in crop-yield schema when unset.
    pub schema_path: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".into(),
            database_url: "sqlite://./data/wizard.db".into(),
            schema_path: None,
            request_timeout_secs: 30,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Command-line values; each one set wins over file and environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub server_url: Option<String>,
    pub database_url: Option<String>,
    pub schema_path: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

pub fn read_settings_file(path: &Path) -> anyhow::Result<Option<HashMap<String, toml::Value>>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
    let file_cfg = toml::from_str::<HashMap<String, toml::Value>>(&raw)
        .with_context(|| format!("failed to parse settings file '{}'", path.display()))?;
    Ok(Some(file_cfg))
}

fn file_string(file_cfg: &HashMap<String, toml::Value>, key: &str) -> Option<String> {
    match file_cfg.get(key)? {
        toml::Value::String(value) => Some(value.clone()),
        toml::Value::Integer(value) => Some(value.to_string()),
        _ => None,
    }
}

fn parse_timeout(raw: &str) -> Option<u64> {
    match raw.trim().parse::<u64>() {
        Ok(secs) => Some(secs),
        Err(error) => {
            tracing::warn!(value = raw, %error, "ignoring invalid request timeout");
            None
        }
    }
}

/// Layers defaults, the settings file, `APP__*` environment variables, and
/// command-line overrides, in that order.
pub fn resolve_settings(
    file_cfg: Option<&HashMap<String, toml::Value>>,
    env: impl Fn(&str) -> Option<String>,
    overrides: Overrides,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(file_cfg) = file_cfg {
        if let Some(v) = file_string(file_cfg, "server_url") {
            settings.server_url = v;
        }
        if let Some(v) = file_string(file_cfg, "database_url") {
            settings.database_url = v;
        }
        if let Some(v) = file_string(file_cfg, "schema_path") {
            settings.schema_path = Some(v);
        }
        if let Some(v) =
            file_string(file_cfg, "request_timeout_secs").and_then(|v| parse_timeout(&v))
        {
            settings.request_timeout_secs = v;
        }
    }

    if let Some(v) = env("APP__SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = env("APP__SCHEMA_PATH") {
        settings.schema_path = Some(v);
    }
    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS").and_then(|v| parse_timeout(&v)) {
        settings.request_timeout_secs = v;
    }

    if let Some(v) = overrides.server_url {
        settings.server_url = v;
    }
    if let Some(v) = overrides.database_url {
        settings.database_url = v;
    }
    if let Some(v) = overrides.schema_path {
        settings.schema_path = Some(v);
    }
    if let Some(v) = overrides.request_timeout_secs {
        settings.request_timeout_secs = v;
    }

    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
