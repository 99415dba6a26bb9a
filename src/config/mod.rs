//! Configuration (layered: defaults < TOML file < environment < CLI flags).

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{BridgeError, Result};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MAX_STEPS: usize = 8;
pub const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:3002", "http://localhost:5173"];
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant that converts colours to \
hex codes. When the user mentions a colour, call the color_to_hex tool and answer with the \
colour name and its hex code.";

/// Environment variables checked for the API key, in priority order.
const API_KEY_VARS: &[&str] = &["STREAMBRIDGE_API_KEY", "GEMINI_API_KEY", "OPENAI_API_KEY"];

/// Runtime configuration for the bridge server.
#[derive(Clone, PartialEq)]
pub struct BridgeConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub system_prompt: String,
    pub max_steps: usize,
}

impl fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("cors_origins", &self.cors_origins)
            .field("max_steps", &self.max_steps)
            .finish()
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

/// Keys accepted in the TOML config file. Everything is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    cors_origins: Option<Vec<String>>,
    system_prompt: Option<String>,
    max_steps: Option<usize>,
}

impl BridgeConfig {
    /// Defaults, then `config_file` (if given), then `.env` and the process
    /// environment. CLI overrides are applied by the caller afterwards.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::default();
        if let Some(path) = config_file {
            config.merge_file(path)?;
        }
        config.apply_env()?;
        Ok(config)
    }

    /// Overlay values from a TOML file.
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        self.merge_toml(&text)
            .map_err(|e| BridgeError::Configuration(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), "loaded config file");
        Ok(())
    }

    fn merge_toml(&mut self, text: &str) -> std::result::Result<(), toml::de::Error> {
        let file: FileConfig = toml::from_str(text)?;
        if let Some(v) = file.api_key {
            self.api_key = Some(v);
        }
        if let Some(v) = file.base_url {
            self.base_url = v;
        }
        if let Some(v) = file.model {
            self.model = v;
        }
        if let Some(v) = file.host {
            self.host = v;
        }
        if let Some(v) = file.port {
            self.port = v;
        }
        if let Some(v) = file.cors_origins {
            self.cors_origins = v;
        }
        if let Some(v) = file.system_prompt {
            self.system_prompt = v;
        }
        if let Some(v) = file.max_steps {
            self.max_steps = v;
        }
        Ok(())
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary variable lookup.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = API_KEY_VARS.iter().find_map(|var| lookup(*var)) {
            self.api_key = Some(key);
        }
        if let Some(v) = lookup("STREAMBRIDGE_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = lookup("STREAMBRIDGE_MODEL") {
            self.model = v;
        }
        if let Some(v) = lookup("HOST") {
            self.host = v;
        }
        if let Some(v) = lookup("PORT") {
            self.port = v
                .trim()
                .parse()
                .map_err(|_| BridgeError::Configuration(format!("PORT is not a valid port: {v}")))?;
        }
        if let Some(v) = lookup("STREAMBRIDGE_CORS_ORIGINS") {
            self.cors_origins = split_list(&v);
        }
        if let Some(v) = lookup("STREAMBRIDGE_SYSTEM_PROMPT") {
            self.system_prompt = v;
        }
        if let Some(v) = lookup("STREAMBRIDGE_MAX_STEPS") {
            self.max_steps = v.trim().parse().map_err(|_| {
                BridgeError::Configuration(format!("STREAMBRIDGE_MAX_STEPS is not a number: {v}"))
            })?;
        }
        Ok(())
    }

    /// `host:port` to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// True when any origin may call the server.
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
