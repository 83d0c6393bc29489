//! Bridge configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use voxa_common::{DispatchError, DEFAULT_WEBUI_API_URL, DEFAULT_WEBUI_BASE_URL};

use crate::dispatch::guessed::PayloadShape;
use crate::playwright::Browser;

/// Bridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// HTTP listen address
    pub listen: String,

    /// Gradio web-ui backend, target of the guessed-endpoint and UI strategies
    pub webui_base_url: String,

    /// Direct web-ui API server
    pub direct_api_url: String,

    /// Refuse to dispatch when the web-ui backend does not answer
    pub preflight_check: bool,

    /// Answer with manual instructions when every other strategy failed
    pub manual_fallback: bool,

    pub timeouts: TimeoutConfig,

    pub guessed: GuessedEndpointConfig,

    pub automation: AutomationConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8001".to_string(),
            webui_base_url: DEFAULT_WEBUI_BASE_URL.to_string(),
            direct_api_url: DEFAULT_WEBUI_API_URL.to_string(),
            preflight_check: false,
            manual_fallback: true,
            timeouts: TimeoutConfig::default(),
            guessed: GuessedEndpointConfig::default(),
            automation: AutomationConfig::default(),
        }
    }
}

/// Per-strategy timeouts, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub direct_api_secs: u64,
    pub guessed_endpoint_secs: u64,
    pub automation_ready_secs: u64,
    pub automation_step_secs: u64,
    pub preflight_secs: u64,
    pub status_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            direct_api_secs: 10,
            guessed_endpoint_secs: 5,
            automation_ready_secs: 10,
            automation_step_secs: 5,
            preflight_secs: 5,
            status_secs: 5,
        }
    }
}

impl TimeoutConfig {
    pub fn direct_api(&self) -> Duration {
        Duration::from_secs(self.direct_api_secs)
    }

    pub fn guessed_endpoint(&self) -> Duration {
        Duration::from_secs(self.guessed_endpoint_secs)
    }

    pub fn automation_ready(&self) -> Duration {
        Duration::from_secs(self.automation_ready_secs)
    }

    pub fn automation_step(&self) -> Duration {
        Duration::from_secs(self.automation_step_secs)
    }

    pub fn preflight(&self) -> Duration {
        Duration::from_secs(self.preflight_secs)
    }

    pub fn status(&self) -> Duration {
        Duration::from_secs(self.status_secs)
    }

    fn all(&self) -> [(&'static str, u64); 6] {
        [
            ("direct_api_secs", self.direct_api_secs),
            ("guessed_endpoint_secs", self.guessed_endpoint_secs),
            ("automation_ready_secs", self.automation_ready_secs),
            ("automation_step_secs", self.automation_step_secs),
            ("preflight_secs", self.preflight_secs),
            ("status_secs", self.status_secs),
        ]
    }
}

/// Candidate endpoints and payload shapes probed on the web-ui backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuessedEndpointConfig {
    pub enabled: bool,
    pub endpoints: Vec<String>,
    pub payload_shapes: Vec<PayloadShape>,
}

impl Default for GuessedEndpointConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoints: vec![
                "/api/predict".to_string(),
                "/run/predict".to_string(),
                "/api/v1/predict".to_string(),
            ],
            payload_shapes: PayloadShape::ALL.to_vec(),
        }
    }
}

/// Browser automation of the web-ui page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    pub enabled: bool,

    /// Node.js binary used to host Playwright
    pub node_binary: String,

    pub browser: Browser,

    pub headless: bool,

    /// Instruction input candidates, first match wins
    pub input_selectors: Vec<String>,

    /// Submit control candidates, first match wins
    pub submit_selectors: Vec<String>,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            node_binary: "node".to_string(),
            browser: Browser::Chromium,
            headless: true,
            input_selectors: vec![
                "textarea".to_string(),
                "input[type='text']".to_string(),
                "[data-testid='instruction-input']".to_string(),
                ".gradio-textbox textarea".to_string(),
            ],
            submit_selectors: vec![
                "button[type='submit']".to_string(),
                "button:has-text('Start')".to_string(),
                "button:has-text('Run')".to_string(),
                ".gradio-button".to_string(),
            ],
        }
    }
}

impl BridgeConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `VOXA_*` environment overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("VOXA_BRIDGE_ADDR") {
            self.listen = v;
        }
        if let Some(v) = non_empty("VOXA_WEBUI_URL") {
            self.webui_base_url = v;
        }
        if let Some(v) = non_empty("VOXA_WEBUI_API_URL") {
            self.direct_api_url = v;
        }
        if let Some(v) = non_empty("VOXA_NODE_BINARY") {
            self.automation.node_binary = v;
        }
    }

    /// Reject configurations no dispatch could run with
    pub fn validate(&self) -> voxa_common::Result<()> {
        check_url("webui_base_url", &self.webui_base_url)?;
        check_url("direct_api_url", &self.direct_api_url)?;

        if let Some((name, _)) = self.timeouts.all().into_iter().find(|(_, secs)| *secs == 0) {
            return Err(DispatchError::Configuration(format!(
                "timeouts.{} must be greater than zero",
                name
            )));
        }

        if self.guessed.enabled {
            if self.guessed.endpoints.is_empty() || self.guessed.payload_shapes.is_empty() {
                return Err(DispatchError::Configuration(
                    "guessed endpoints and payload shapes must not be empty".to_string(),
                ));
            }
            if let Some(bad) = self.guessed.endpoints.iter().find(|e| !e.starts_with('/')) {
                return Err(DispatchError::Configuration(format!(
                    "guessed endpoint {:?} must start with '/'",
                    bad
                )));
            }
        }

        if self.automation.enabled
            && (self.automation.input_selectors.is_empty()
                || self.automation.submit_selectors.is_empty())
        {
            return Err(DispatchError::Configuration(
                "automation selectors must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn check_url(field: &str, value: &str) -> voxa_common::Result<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| DispatchError::Configuration(format!("{} {:?}: {}", field, value, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(DispatchError::Configuration(format!(
            "{} must use http or https, got {}",
            field, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = BridgeConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.guessed.endpoints.len(), 3);
        assert_eq!(cfg.guessed.payload_shapes.len(), 4);
        assert_eq!(cfg.timeouts.direct_api(), Duration::from_secs(10));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg: BridgeConfig = toml::from_str(
            r#"
webui_base_url = "http://127.0.0.1:9000"

[timeouts]
direct_api_secs = 3

[automation]
enabled = false
"#,
        )
        .unwrap();

        assert_eq!(cfg.webui_base_url, "http://127.0.0.1:9000");
        assert_eq!(cfg.direct_api_url, DEFAULT_WEBUI_API_URL);
        assert_eq!(cfg.timeouts.direct_api_secs, 3);
        assert_eq!(cfg.timeouts.guessed_endpoint_secs, 5);
        assert!(!cfg.automation.enabled);
        assert_eq!(cfg.automation.input_selectors[0], "textarea");
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = BridgeConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, BridgeConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/voxa-bridge.toml");
        let mut cfg = BridgeConfig::default();
        cfg.preflight_check = true;
        cfg.guessed.payload_shapes = vec![PayloadShape::Query];

        cfg.save(&path).unwrap();
        assert_eq!(BridgeConfig::load(&path).unwrap(), cfg);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("VOXA_WEBUI_URL", "http://webui:7788"),
            ("VOXA_WEBUI_API_URL", ""),
        ]
        .into_iter()
        .collect();

        let mut cfg = BridgeConfig::default();
        cfg.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.webui_base_url, "http://webui:7788");
        assert_eq!(cfg.direct_api_url, DEFAULT_WEBUI_API_URL);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = BridgeConfig::default();
        cfg.direct_api_url = "localhost:7789".to_string();
        assert!(cfg.validate().unwrap_err().is_configuration());

        let mut cfg = BridgeConfig::default();
        cfg.timeouts.preflight_secs = 0;
        assert_eq!(
            cfg.validate().unwrap_err(),
            DispatchError::Configuration("timeouts.preflight_secs must be greater than zero".into())
        );

        let mut cfg = BridgeConfig::default();
        cfg.guessed.endpoints = vec!["api/predict".to_string()];
        assert!(cfg.validate().is_err());

        let mut cfg = BridgeConfig::default();
        cfg.guessed.enabled = false;
        cfg.guessed.endpoints.clear();
        cfg.validate().unwrap();
    }
}
