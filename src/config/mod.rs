// Configuration management
use crate::error::{CardsError, Result};
use crate::models::TokenRequest;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_tenant_id")]
    pub tenant_id: String,
    #[serde(default)]
    pub client_id: String,
    /// Application id of the backend API; selects the token audience
    #[serde(default)]
    pub api_client_id: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    /// Replace sign-in with a fixed development session (debug builds only)
    #[serde(default)]
    pub bypass: bool,
    /// Upper bound for waiting on another caller's redirect processing
    #[serde(default = "default_redirect_wait_ms")]
    pub redirect_wait_ms: u64,
}

fn default_tenant_id() -> String {
    "common".to_string()
}

fn default_redirect_uri() -> String {
    "http://localhost:5173/".to_string()
}

fn default_redirect_wait_ms() -> u64 {
    3000
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            tenant_id: default_tenant_id(),
            client_id: String::new(),
            api_client_id: String::new(),
            redirect_uri: default_redirect_uri(),
            bypass: false,
            redirect_wait_ms: default_redirect_wait_ms(),
        }
    }
}

impl AuthConfig {
    pub fn authority(&self) -> String {
        format!("https://login.microsoftonline.com/{}", self.tenant_id)
    }

    pub fn token_request(&self) -> TokenRequest {
        if self.api_client_id.is_empty() {
            TokenRequest::new(["openid", "profile"])
        } else {
            TokenRequest::new([format!("api://{}/access_as_user", self.api_client_id)])
        }
    }

    pub fn redirect_wait(&self) -> Duration {
        Duration::from_millis(self.redirect_wait_ms)
    }

    /// Bypass is honoured only outside release builds
    pub fn bypass_enabled(&self) -> bool {
        if self.bypass && !cfg!(debug_assertions) {
            tracing::warn!("Auth bypass requested in a release build; ignoring");
            return false;
        }
        self.bypass
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiConfig {
    #[serde(default)]
    pub base_url: String,
}

impl Config {
    /// Get the config directory path
    ///
    /// Priority:
    /// 1. XDG_CONFIG_HOME/flashcards (if env var is set)
    /// 2. ~/.config/flashcards (if ~/.config exists)
    /// 3. Platform default
    pub fn config_dir() -> Result<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(xdg_config).join("flashcards"));
        }

        #[cfg(unix)]
        {
            if let Some(home_dir) = dirs::home_dir() {
                let xdg_config = home_dir.join(".config");
                if xdg_config.exists() {
                    return Ok(xdg_config.join("flashcards"));
                }
            }
        }

        dirs::config_dir()
            .map(|dir| dir.join("flashcards"))
            .ok_or_else(|| CardsError::ConfigError("Could not determine config directory".to_string()))
    }

    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, environment variables, and defaults
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_file_path()?)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("Config file not found at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        tracing::debug!("Loading config from: {}", path.display());
        let contents = fs::read_to_string(path)
            .map_err(|e| CardsError::ConfigError(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&contents)
            .map_err(|e| CardsError::ConfigError(format!("Failed to parse config file: {}", e)))
    }

    /// Override values from `FLASHCARDS_*` variables
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let overrides: [(&str, &mut String); 5] = [
            ("FLASHCARDS_TENANT_ID", &mut self.auth.tenant_id),
            ("FLASHCARDS_CLIENT_ID", &mut self.auth.client_id),
            ("FLASHCARDS_API_CLIENT_ID", &mut self.auth.api_client_id),
            ("FLASHCARDS_REDIRECT_URI", &mut self.auth.redirect_uri),
            ("FLASHCARDS_API_BASE_URL", &mut self.api.base_url),
        ];
        for (key, slot) in overrides {
            if let Some(value) = lookup(key) {
                tracing::debug!("Using {} from environment", key);
                *slot = value;
            }
        }

        if let Some(bypass) = lookup("FLASHCARDS_AUTH_BYPASS") {
            self.auth.bypass = bypass == "true";
        }
    }

    /// Create a sample config file with comments
    pub fn create_sample(path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                CardsError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        // Don't overwrite existing config
        if path.exists() {
            return Err(CardsError::ConfigError(format!(
                "Config file already exists at: {}",
                path.display()
            )));
        }

        let sample_config = r#"# Flashcards configuration
# Values can be overridden with FLASHCARDS_TENANT_ID, FLASHCARDS_CLIENT_ID,
# FLASHCARDS_API_CLIENT_ID, FLASHCARDS_REDIRECT_URI, FLASHCARDS_AUTH_BYPASS
# and FLASHCARDS_API_BASE_URL.

[auth]
# Directory tenant ("common" accepts any work or personal account)
tenant_id = "common"

# Application (client) id registered with the identity provider (required)
client_id = ""

# Application id of the backend API; tokens are requested for
# api://<api_client_id>/access_as_user
api_client_id = ""

# Where the identity provider sends the browser back to
redirect_uri = "http://localhost:5173/"

# Development only: use a fixed fake session instead of signing in
bypass = false

# How long to wait for another in-flight redirect to be processed (ms)
redirect_wait_ms = 3000

[api]
# Base URL of the flashcard backend
base_url = ""
"#;

        fs::write(path, sample_config)
            .map_err(|e| CardsError::ConfigError(format!("Failed to write sample config: {}", e)))?;

        tracing::info!("Created sample config at: {}", path.display());
        Ok(())
    }

    /// Validate that sign-in can actually be attempted
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.is_empty() {
            return Err(CardsError::InvalidConfig(
                "API base URL not configured. Set api.base_url or FLASHCARDS_API_BASE_URL".to_string(),
            ));
        }
        if !self.auth.bypass_enabled() && self.auth.client_id.is_empty() {
            return Err(CardsError::InvalidConfig(
                "Client id not configured. Set auth.client_id or FLASHCARDS_CLIENT_ID".to_string(),
            ));
        }
        Ok(())
    }
}
