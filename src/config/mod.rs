use crate::global;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_LLM_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_EMAIL_ENDPOINT: &str = "https://api.resend.com/emails";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub email: EmailConfig,
    pub rate_limit: RateLimitConfig,
    pub upstream: UpstreamConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum accepted JSON body size. Transcripts can be long.
    pub body_limit_bytes: usize,
    /// Key the rate limiter on `X-Forwarded-For` instead of the peer address.
    pub trust_proxy: bool,
    /// Directory served for paths not matched by the API.
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub api_key: Option<String>,
    pub from: Option<String>,
    pub api_endpoint: String,
    /// Escape the summary before inserting it into the HTML body.
    pub escape_html: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub window_seconds: u64,
    pub max_requests: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            body_limit_bytes: 5 * 1024 * 1024,
            trust_proxy: false,
            static_dir: None,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_endpoint: DEFAULT_LLM_ENDPOINT.to_string(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            from: None,
            api_endpoint: DEFAULT_EMAIL_ENDPOINT.to_string(),
            escape_html: false,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_seconds: 60,
            max_requests: 20,
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
        }
    }
}

impl EmailConfig {
    /// Email sending needs both a provider key and a sender address.
    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some() && self.from.is_some()
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Config {
    /// Loads defaults, then the TOML file (explicit path or the default
    /// location if it exists), then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::config_path().filter(|p| p.exists()) {
                Some(default_path) => Self::from_file(&default_path)?,
                None => {
                    info!("No config file found, using defaults and environment");
                    Self::default()
                }
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.warn_missing();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Applies environment overrides through `lookup`. Empty values count as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(host) = get("HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("PORT") {
            self.server.port = parse_value("PORT", &port)?;
        }
        if let Some(limit) = get("BODY_LIMIT_BYTES") {
            self.server.body_limit_bytes = parse_value("BODY_LIMIT_BYTES", &limit)?;
        }
        if let Some(trust) = get("TRUST_PROXY") {
            self.server.trust_proxy = parse_bool("TRUST_PROXY", &trust)?;
        }
        if let Some(dir) = get("STATIC_DIR") {
            self.server.static_dir = Some(PathBuf::from(dir));
        }

        if let Some(key) = get("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = get("OPENAI_MODEL") {
            self.llm.model = model;
        }
        if let Some(endpoint) = get("OPENAI_API_ENDPOINT") {
            self.llm.api_endpoint = endpoint;
        }

        if let Some(key) = get("RESEND_API_KEY") {
            self.email.api_key = Some(key);
        }
        if let Some(from) = get("EMAIL_FROM") {
            self.email.from = Some(from);
        }
        if let Some(endpoint) = get("RESEND_API_ENDPOINT") {
            self.email.api_endpoint = endpoint;
        }
        if let Some(escape) = get("EMAIL_ESCAPE_HTML") {
            self.email.escape_html = parse_bool("EMAIL_ESCAPE_HTML", &escape)?;
        }

        if let Some(window) = get("RATE_LIMIT_WINDOW_SECONDS") {
            self.rate_limit.window_seconds = parse_value("RATE_LIMIT_WINDOW_SECONDS", &window)?;
        }
        if let Some(max) = get("RATE_LIMIT_MAX_REQUESTS") {
            self.rate_limit.max_requests = parse_value("RATE_LIMIT_MAX_REQUESTS", &max)?;
        }

        if let Some(timeout) = get("UPSTREAM_TIMEOUT_SECONDS") {
            self.upstream.timeout_seconds = parse_value("UPSTREAM_TIMEOUT_SECONDS", &timeout)?;
        }

        Ok(())
    }

    fn warn_missing(&self) {
        if self.llm.api_key.is_none() {
            warn!("OPENAI_API_KEY is not set; /api/summarize will fail until it is configured");
        }
        if self.email.api_key.is_none() {
            warn!("RESEND_API_KEY is not set; email sending is disabled");
        } else if self.email.from.is_none() {
            warn!("EMAIL_FROM is not set; email sending is disabled");
        }
    }

    fn config_path() -> Option<PathBuf> {
        global::config_file().ok()
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse()
        .map_err(|e| anyhow!("Invalid value for {}: {:?} ({})", key, value, e))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow!("Invalid value for {}: {:?} (expected a boolean)", key, value)),
    }
}
