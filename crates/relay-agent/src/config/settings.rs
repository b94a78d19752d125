//! Runtime settings loader.
//!
//! Loads an optional YAML settings file, then applies `RELAY_*` environment
//! overrides on top. Every field has a default so the agent starts with an
//! empty configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::jobs::MonitorConfig;

const DEFAULT_SETTINGS_FILE: &str = "relay.yaml";

/// Top-level settings tree.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Messaging channel credentials and endpoints.
    pub line: LineSettings,
    /// External job backend endpoints.
    pub backends: BackendSettings,
    /// Monitor, router and query-path budgets.
    pub monitor: MonitorSettings,
    /// Materialized media storage and its public URL.
    pub media: MediaSettings,
    /// HTTP surface.
    pub gateway: GatewaySettings,
}

/// LINE channel configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LineSettings {
    /// Messaging API base URL; empty means the public endpoint.
    pub api_base: String,
    /// Channel access token for push/reply calls.
    pub channel_access_token: String,
    /// Shared secret the webhook requires in its header, when set.
    pub webhook_secret: Option<String>,
}

impl Default for LineSettings {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            channel_access_token: String::new(),
            webhook_secret: None,
        }
    }
}

/// Backend endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// ComfyUI-compatible renderer base URL.
    pub comfyui_url: String,
    /// Path of the workflow JSON template submitted per render.
    pub workflow_template: PathBuf,
    /// Workflow node that receives the script text.
    pub script_node_id: String,
    /// Speech service URL substituted into the workflow template.
    pub speech_api_url: String,
    /// Transcription service base URL.
    pub transcriber_url: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            comfyui_url: "http://localhost:8188".to_string(),
            workflow_template: PathBuf::from("assets/workflow.json"),
            script_node_id: "12".to_string(),
            speech_api_url: "http://localhost:8001/tts_url".to_string(),
            transcriber_url: "http://localhost:8893".to_string(),
        }
    }
}

/// Monitor timing budgets, in whole seconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Grace period before the first probe.
    pub initial_delay_secs: u64,
    /// Sleep between monitor polls.
    pub poll_interval_secs: u64,
    /// Poll budget before a monitor gives up.
    pub max_attempts: u32,
    /// Per-probe timeout inside the router.
    pub probe_timeout_secs: u64,
    /// Extra re-probes of the synchronous query path.
    pub smart_wait_probes: u32,
    /// Sleep between smart-wait re-probes.
    pub smart_wait_interval_secs: u64,
    /// Materializer fetch retries.
    pub materialize_retries: u32,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            initial_delay_secs: 5,
            poll_interval_secs: 1,
            max_attempts: 120,
            probe_timeout_secs: 10,
            smart_wait_probes: 5,
            smart_wait_interval_secs: 1,
            materialize_retries: 2,
        }
    }
}

impl MonitorSettings {
    /// Convert to the core's config; budgets are clamped there.
    pub fn to_config(&self) -> MonitorConfig {
        MonitorConfig {
            initial_delay: Duration::from_secs(self.initial_delay_secs),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            max_attempts: self.max_attempts,
            probe_timeout: Duration::from_secs(self.probe_timeout_secs),
            smart_wait_probes: self.smart_wait_probes,
            smart_wait_interval: Duration::from_secs(self.smart_wait_interval_secs),
            materialize_retries: self.materialize_retries,
        }
        .normalized()
    }
}

/// Materialized media storage.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MediaSettings {
    /// Directory the materializer writes video files into.
    pub dir: PathBuf,
    /// Public base URL under which `/files/{name}` is reachable.
    pub public_base_url: String,
    /// Still image sent as the video preview; defaults to a file below the
    /// public media endpoint.
    pub preview_image_url: Option<String>,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./media"),
            public_base_url: "http://localhost:8080".to_string(),
            preview_image_url: None,
        }
    }
}

impl MediaSettings {
    /// Preview image URL, derived from the public base when not configured.
    pub fn resolved_preview_image_url(&self) -> String {
        match &self.preview_image_url {
            Some(url) if !url.trim().is_empty() => url.clone(),
            _ => format!(
                "{}/files/preview.png",
                self.public_base_url.trim_end_matches('/')
            ),
        }
    }
}

/// HTTP surface configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// Bind address, e.g. `0.0.0.0:8080`.
    pub bind: String,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Load settings from `path` (or `relay.yaml` when present), then apply
/// `RELAY_*` environment overrides.
pub fn load_runtime_settings(path: Option<&Path>) -> RuntimeSettings {
    let mut settings = match path {
        Some(path) => read_settings_file(path),
        None => {
            let default_path = Path::new(DEFAULT_SETTINGS_FILE);
            if default_path.exists() {
                read_settings_file(default_path)
            } else {
                RuntimeSettings::default()
            }
        }
    };
    apply_env_overrides(&mut settings);
    settings
}

fn read_settings_file(path: &Path) -> RuntimeSettings {
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_yaml::from_str(&content) {
            Ok(settings) => settings,
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %error,
                    "settings file is not valid YAML; using defaults"
                );
                RuntimeSettings::default()
            }
        },
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "settings file could not be read; using defaults"
            );
            RuntimeSettings::default()
        }
    }
}

fn apply_env_overrides(settings: &mut RuntimeSettings) {
    override_string("RELAY_LINE_API_BASE", &mut settings.line.api_base);
    override_string(
        "RELAY_LINE_ACCESS_TOKEN",
        &mut settings.line.channel_access_token,
    );
    if let Ok(secret) = std::env::var("RELAY_LINE_WEBHOOK_SECRET")
        && !secret.is_empty()
    {
        settings.line.webhook_secret = Some(secret);
    }

    override_string("RELAY_COMFYUI_URL", &mut settings.backends.comfyui_url);
    override_path(
        "RELAY_WORKFLOW_TEMPLATE",
        &mut settings.backends.workflow_template,
    );
    override_string("RELAY_SPEECH_API_URL", &mut settings.backends.speech_api_url);
    override_string(
        "RELAY_TRANSCRIBER_URL",
        &mut settings.backends.transcriber_url,
    );

    override_path("RELAY_MEDIA_DIR", &mut settings.media.dir);
    override_string(
        "RELAY_PUBLIC_BASE_URL",
        &mut settings.media.public_base_url,
    );
    override_string("RELAY_BIND", &mut settings.gateway.bind);
}

fn override_string(name: &str, target: &mut String) {
    if let Ok(value) = std::env::var(name)
        && !value.is_empty()
    {
        *target = value;
    }
}

fn override_path(name: &str, target: &mut PathBuf) {
    if let Ok(value) = std::env::var(name)
        && !value.is_empty()
    {
        *target = PathBuf::from(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_reference_budgets() {
        let settings = RuntimeSettings::default();
        assert_eq!(settings.monitor.initial_delay_secs, 5);
        assert_eq!(settings.monitor.poll_interval_secs, 1);
        assert_eq!(settings.monitor.max_attempts, 120);
        assert_eq!(settings.monitor.probe_timeout_secs, 10);
        assert_eq!(settings.monitor.smart_wait_probes, 5);
    }

    #[test]
    fn partial_yaml_keeps_defaults_for_missing_sections() {
        let settings: RuntimeSettings = serde_yaml::from_str(
            "monitor:\n  max_attempts: 10\nbackends:\n  comfyui_url: http://render:8188\n",
        )
        .expect("settings should parse");
        assert_eq!(settings.monitor.max_attempts, 10);
        assert_eq!(settings.monitor.initial_delay_secs, 5);
        assert_eq!(settings.backends.comfyui_url, "http://render:8188");
        assert_eq!(settings.gateway.bind, "0.0.0.0:8080");
    }

    #[test]
    fn monitor_config_clamps_zero_budgets() {
        let config = MonitorSettings {
            poll_interval_secs: 0,
            max_attempts: 0,
            ..MonitorSettings::default()
        }
        .to_config();
        assert!(config.poll_interval >= Duration::from_millis(10));
        assert_eq!(config.max_attempts, 1);
    }

    #[test]
    fn preview_url_defaults_below_the_public_base() {
        let media = MediaSettings {
            public_base_url: "https://bot.example.com/".to_string(),
            ..MediaSettings::default()
        };
        assert_eq!(
            media.resolved_preview_image_url(),
            "https://bot.example.com/files/preview.png"
        );
    }
}
