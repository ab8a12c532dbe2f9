use crate::error::{ProxyError, Result};
use crate::providers::{UpstreamPreset, DEFAULT_PRESET};
use crate::translate::{Translator, DEFAULT_UPSTREAM_MODEL, UPSTREAM_HARD_CAP};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_preset")]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default = "default_max_tokens_cap")]
    pub max_tokens_cap: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            upstream: UpstreamConfig::default(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            name: default_preset(),
            base_url: None,
            api_key_env: None,
            model: None,
            max_tokens_cap: default_max_tokens_cap(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_port() -> u16 {
    8787
}

fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}

fn default_max_tokens_cap() -> u64 {
    UPSTREAM_HARD_CAP
}

fn default_timeout_secs() -> u64 {
    300
}

impl ProxyConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProxyError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Search standard locations for a config file.
    /// Priority: CLI arg > CWD > XDG config > home dir > built-in defaults
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load(path);
        }

        for candidate in &config_search_paths() {
            if candidate.exists() {
                tracing::info!(path = %candidate.display(), "Loading config");
                return Self::load(candidate);
            }
        }

        tracing::info!("No config file found, using built-in defaults");
        Ok(Self::default())
    }

    fn preset(&self) -> Option<&'static UpstreamPreset> {
        UpstreamPreset::from_name(&self.upstream.name)
    }

    /// Resolve the effective base URL (config override or preset default)
    pub fn effective_base_url(&self) -> Result<String> {
        if let Some(ref url) = self.upstream.base_url {
            return Ok(url.clone());
        }

        self.preset()
            .map(|p| p.base_url.to_string())
            .ok_or_else(|| {
                ProxyError::config(format!(
                    "Unknown upstream '{}' and no base_url configured. Known upstreams: {}",
                    self.upstream.name,
                    UpstreamPreset::known_names()
                ))
            })
    }

    /// Name of the environment variable that holds the upstream credential.
    pub fn api_key_env(&self) -> String {
        self.upstream
            .api_key_env
            .clone()
            .or_else(|| self.preset().map(|p| p.default_api_key_env.to_string()))
            .unwrap_or_else(|| "API_KEY".to_string())
    }

    /// Destination model id sent upstream.
    pub fn effective_model(&self) -> String {
        self.upstream
            .model
            .clone()
            .or_else(|| self.preset().map(|p| p.model.to_string()))
            .unwrap_or_else(|| DEFAULT_UPSTREAM_MODEL.to_string())
    }

    /// Resolve the API key. Called per request so a missing key is a request failure.
    pub fn resolve_api_key(&self) -> Result<String> {
        let env_var = self.api_key_env();
        match std::env::var(&env_var) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ProxyError::missing_credential(env_var)),
        }
    }

    /// The translator configured with this deployment's model and token cap.
    pub fn translator(&self) -> Translator {
        Translator::new(self.effective_model(), self.upstream.max_tokens_cap)
    }
}

pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // CWD
    paths.push(PathBuf::from("kimi-proxy.toml"));

    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        paths.push(PathBuf::from(xdg).join("kimi-proxy").join("config.toml"));
    }

    if let Some(home) = home_dir() {
        paths.push(home.join(".config").join("kimi-proxy").join("config.toml"));
        paths.push(home.join(".kimi-proxy.toml"));
    }

    paths
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}
