use std::{collections::HashMap, fs, path::Path};

use anyhow::Context;
use serde::Deserialize;

pub const SETTINGS_FILE: &str = "server.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub bind_addr: String,
    pub model_path: String,
    pub encodings_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".into(),
            model_path: "crates/server/assets/model.json".into(),
            encodings_path: "crates/server/assets/categorical_encodings.json".into(),
        }
    }
}

pub fn load_settings() -> Settings {
    let file_cfg = match read_settings_file(Path::new(SETTINGS_FILE)) {
        Ok(file_cfg) => file_cfg,
        Err(error) => {
            tracing::warn!(%error, "ignoring unreadable settings file");
            None
        }
    };
    resolve_settings(file_cfg.as_ref(), |key| std::env::var(key).ok())
}

/// Reads the flat `key = "value"` settings file; a missing file is not an error.
pub fn read_settings_file(path: &Path) -> anyhow::Result<Option<HashMap<String, String>>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
    let file_cfg = toml::from_str::<HashMap<String, String>>(&raw)
        .with_context(|| format!("failed to parse settings file '{}'", path.display()))?;
    Ok(Some(file_cfg))
}

/// Layers defaults, then file values, then environment overrides.
pub fn resolve_settings(
    file_cfg: Option<&HashMap<String, String>>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(file_cfg) = file_cfg {
        if let Some(v) = file_cfg.get("bind_addr") {
            settings.bind_addr = v.clone();
        }
        if let Some(v) = file_cfg.get("model_path") {
            settings.model_path = v.clone();
        }
        if let Some(v) = file_cfg.get("encodings_path") {
            settings.encodings_path = v.clone();
        }
    }

    if let Some(port) = env("PORT") {
        match port.trim().parse::<u16>() {
            Ok(port) => settings.bind_addr = format!("0.0.0.0:{port}"),
            Err(error) => tracing::warn!(%port, %error, "ignoring invalid PORT"),
        }
    }
    if let Some(v) = env("SERVER_BIND") {
        settings.bind_addr = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.bind_addr = v;
    }

    if let Some(v) = env("APP__MODEL_PATH") {
        settings.model_path = v;
    }
    if let Some(v) = env("APP__ENCODINGS_PATH") {
        settings.encodings_path = v;
    }

    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
