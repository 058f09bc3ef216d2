use std::{fs, path::Path, path::PathBuf, time::Duration};

use client_core::WorkflowOptions;
use serde::Deserialize;
use tracing::warn;

pub const SETTINGS_FILE: &str = "webtemplate.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub model: Option<String>,
    /// `None` omits the field from conversion requests.
    pub max_tokens: Option<u32>,
    pub toast_ms: u64,
    pub download_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".into(),
            model: None,
            max_tokens: Some(6000),
            toast_ms: 2200,
            download_dir: PathBuf::from("./downloads"),
        }
    }
}

impl Settings {
    pub fn workflow_options(&self) -> WorkflowOptions {
        WorkflowOptions {
            max_tokens: self.max_tokens,
            toast_duration: Duration::from_millis(self.toast_ms),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    toast_ms: Option<u64>,
    download_dir: Option<String>,
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the optional settings file, then environment overrides.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => apply_file_settings(&mut settings, file_cfg),
            Err(err) => warn!(path = %path.display(), error = %err, "ignoring unreadable settings file"),
        }
    }

    if let Some(v) = env("WT_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = env("APP__MODEL") {
        settings.model = non_blank(v);
    }

    if let Some(v) = env("APP__MAX_TOKENS") {
        match v.trim().parse::<u32>() {
            Ok(parsed) => settings.max_tokens = max_tokens(parsed),
            Err(_) => warn!(value = %v, "ignoring invalid APP__MAX_TOKENS"),
        }
    }

    if let Some(v) = env("APP__TOAST_MS") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.toast_ms = parsed;
        }
    }

    if let Some(v) = env("APP__DOWNLOAD_DIR") {
        settings.download_dir = PathBuf::from(v);
    }

    settings
}

fn apply_file_settings(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.model {
        settings.model = non_blank(v);
    }
    if let Some(v) = file_cfg.max_tokens {
        settings.max_tokens = max_tokens(v);
    }
    if let Some(v) = file_cfg.toast_ms {
        settings.toast_ms = v;
    }
    if let Some(v) = file_cfg.download_dir {
        settings.download_dir = PathBuf::from(v);
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// Zero disables the field entirely.
fn max_tokens(value: u32) -> Option<u32> {
    (value > 0).then_some(value)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
