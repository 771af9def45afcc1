use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;
use shared::domain::RightPanelTool;

pub const DEFAULT_CONFIG_FILE: &str = "docnav.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// How long navigation waits for a section's view to render.
    pub view_ready_timeout_ms: u64,
    pub action_log_max_entries: usize,
    pub undo_max_entries: usize,
    pub event_channel_capacity: usize,
    pub default_tool: RightPanelTool,
    pub narrow_screen: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            view_ready_timeout_ms: 5_000,
            action_log_max_entries: 500,
            undo_max_entries: 100,
            event_channel_capacity: 256,
            default_tool: RightPanelTool::None,
            narrow_screen: false,
        }
    }
}

impl Settings {
    pub fn view_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.view_ready_timeout_ms)
    }
}

/// Defaults, then `docnav.toml` in the working directory, then environment overrides.
pub fn load_settings() -> Settings {
    let settings = match fs::read_to_string(DEFAULT_CONFIG_FILE) {
        Ok(raw) => toml::from_str::<Settings>(&raw).unwrap_or_else(|err| {
            tracing::warn!(file = DEFAULT_CONFIG_FILE, %err, "config: ignoring invalid file");
            Settings::default()
        }),
        Err(_) => Settings::default(),
    };
    apply_env_overrides(settings, |key| std::env::var(key).ok())
}

/// Loads an explicit config file; unlike [`load_settings`], a bad file is an error.
pub fn load_settings_from(path: &Path) -> anyhow::Result<Settings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file '{}'", path.display()))?;
    let settings = toml::from_str::<Settings>(&raw)
        .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
    Ok(apply_env_overrides(settings, |key| std::env::var(key).ok()))
}

fn env_value(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(&format!("APP__{name}")).or_else(|| lookup(&format!("DOCNAV__{name}")))
}

pub(crate) fn apply_env_overrides(
    mut settings: Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Settings {
    if let Some(v) = env_value(&lookup, "VIEW_READY_TIMEOUT_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.view_ready_timeout_ms = parsed;
        }
    }
    if let Some(v) = env_value(&lookup, "ACTION_LOG_MAX_ENTRIES") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.action_log_max_entries = parsed;
        }
    }
    if let Some(v) = env_value(&lookup, "UNDO_MAX_ENTRIES") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.undo_max_entries = parsed;
        }
    }
    if let Some(v) = env_value(&lookup, "EVENT_CHANNEL_CAPACITY") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.event_channel_capacity = parsed.max(1);
        }
    }
    if let Some(v) = env_value(&lookup, "NARROW_SCREEN") {
        settings.narrow_screen = matches!(v.as_str(), "1" | "true" | "yes");
    }
    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
