//! Gateway configuration
//!
//! Configuration is loaded from a TOML file. Secrets (LLM API key, JWT signing
//! secret) are never stored in the file; the file names the environment
//! variables that hold them and they are resolved at runtime.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use url::Url;

/// Main gateway configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerSection,
    pub llm: LlmSection,
    pub workers: WorkersSection,
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub auth: AuthSection,
}

/// HTTP/WebSocket listener settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// LLM section shared by the classifier and the general responder
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmSection {
    /// Provider name ("groq", "openai", or any OpenAI-compatible label)
    pub provider: String,
    /// Chat-completions base URL; defaults per provider when omitted
    pub base_url: Option<String>,
    /// Model identifier
    pub model: String,
    /// Environment variable containing the API key
    pub api_key_env: String,
    /// Sampling temperature (default: 0.0 for deterministic classification)
    #[serde(default)]
    pub temperature: f32,
    /// Optional max tokens for general answers
    pub max_tokens: Option<u32>,
    /// Request JSON-schema structured output from the classifier
    #[serde(default)]
    pub structured_output: bool,
    /// System prompt for the general responder
    #[serde(default = "default_general_system_prompt")]
    pub general_system_prompt: String,
}

fn default_general_system_prompt() -> String {
    "I am a QA Agent specialized in API testing. I can help you by providing a Newman test \
     report for any given Swagger file. You can also provide a CSV file containing request \
     body data, and I will use that to test your API against the provided Swagger \
     specification. Additionally, I can generate test data in CSV format to assist with \
     testing various APIs. Feel free to ask me for help with testing APIs or generating \
     test data!"
        .to_string()
}

impl LlmSection {
    /// Resolve the chat-completions base URL for the configured provider
    pub fn resolved_base_url(&self) -> String {
        if let Some(url) = &self.base_url {
            return url.trim_end_matches('/').to_string();
        }
        match self.provider.as_str() {
            "groq" => "https://api.groq.com/openai/v1".to_string(),
            _ => "https://api.openai.com/v1".to_string(),
        }
    }
}

/// Remote worker services
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkersSection {
    /// GUI-testing worker HTTP endpoint (POST)
    pub gui_url: String,
    /// API-testing worker WebSocket endpoint
    pub api_url: String,
    /// GUI worker request timeout in seconds (default: 300)
    #[serde(default = "default_gui_timeout")]
    pub gui_timeout_secs: u64,
    /// Per-receive timeout on the API worker socket (default: 60)
    #[serde(default = "default_api_receive_timeout")]
    pub api_receive_timeout_secs: u64,
    /// Keepalive ping interval on the API worker socket (default: 30)
    #[serde(default = "default_api_ping_interval")]
    pub api_ping_interval_secs: u64,
    /// Pong deadline after a keepalive ping (default: 20)
    #[serde(default = "default_api_ping_timeout")]
    pub api_ping_timeout_secs: u64,
}

fn default_gui_timeout() -> u64 {
    300
}

fn default_api_receive_timeout() -> u64 {
    60
}

fn default_api_ping_interval() -> u64 {
    30
}

fn default_api_ping_timeout() -> u64 {
    20
}

/// User database settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseSection {
    /// sqlx connection URL (default: sqlite://agentqa.db)
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_database_url() -> String {
    "sqlite://agentqa.db".to_string()
}

fn default_max_connections() -> u32 {
    4
}

/// Token issuance and password hashing settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthSection {
    /// Environment variable containing the JWT signing secret
    #[serde(default = "default_jwt_secret_env")]
    pub jwt_secret_env: String,
    /// Access token lifetime in minutes (default: 30)
    #[serde(default = "default_token_ttl")]
    pub token_ttl_minutes: i64,
    /// bcrypt work factor (default: 12)
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            jwt_secret_env: default_jwt_secret_env(),
            token_ttl_minutes: default_token_ttl(),
            bcrypt_cost: default_bcrypt_cost(),
        }
    }
}

fn default_jwt_secret_env() -> String {
    "AGENTQA_JWT_SECRET".to_string()
}

fn default_token_ttl() -> i64 {
    30
}

fn default_bcrypt_cost() -> u32 {
    12
}

/// Upper bound for every worker timeout and keepalive setting (one day)
pub const MAX_WORKER_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Upper bound for access token lifetime (one year)
pub const MAX_TOKEN_TTL_MINUTES: i64 = 365 * 24 * 60;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Invalid worker URL '{url}': {reason}")]
    InvalidWorkerUrl { url: String, reason: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl GatewayConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: GatewayConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_worker_url(&self.workers.gui_url, &["http", "https"])?;
        validate_worker_url(&self.workers.api_url, &["ws", "wss"])?;

        for (name, value) in [
            ("gui_timeout_secs", self.workers.gui_timeout_secs),
            ("api_receive_timeout_secs", self.workers.api_receive_timeout_secs),
            ("api_ping_interval_secs", self.workers.api_ping_interval_secs),
            ("api_ping_timeout_secs", self.workers.api_ping_timeout_secs),
        ] {
            if value == 0 || value > MAX_WORKER_TIMEOUT_SECS {
                return Err(ConfigError::InvalidConfig(format!(
                    "workers.{name} must be between 1 and {MAX_WORKER_TIMEOUT_SECS}, got {value}"
                )));
            }
        }
        if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&self.auth.token_ttl_minutes) {
            return Err(ConfigError::InvalidConfig(format!(
                "auth.token_ttl_minutes must be between 1 and {MAX_TOKEN_TTL_MINUTES}, got {}",
                self.auth.token_ttl_minutes
            )));
        }
        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(ConfigError::InvalidConfig(format!(
                "auth.bcrypt_cost must be between 4 and 31, got {}",
                self.auth.bcrypt_cost
            )));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "llm.model must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    fn get_env_var_required(env_var_name: &str) -> Result<String, ConfigError> {
        std::env::var(env_var_name)
            .map_err(|_| ConfigError::EnvVarNotFound(env_var_name.to_string()))
    }

    /// Get LLM API key from environment variable
    pub fn get_llm_api_key(&self) -> Result<String, ConfigError> {
        Self::get_env_var_required(&self.llm.api_key_env)
    }

    /// Get JWT signing secret from environment variable
    pub fn get_jwt_secret(&self) -> Result<String, ConfigError> {
        let secret = Self::get_env_var_required(&self.auth.jwt_secret_env)?;
        if secret.is_empty() {
            return Err(ConfigError::InvalidConfig(format!(
                "{} must not be empty",
                self.auth.jwt_secret_env
            )));
        }
        Ok(secret)
    }

    /// Create a test configuration for unit testing
    #[cfg(test)]
    pub fn test_config() -> Self {
        let toml_content = r#"
[llm]
provider = "groq"
model = "llama-3.2-90b-vision-preview"
api_key_env = "GROQ_API_KEY"

[workers]
gui_url = "http://localhost:9001/run_tests"
api_url = "ws://localhost:9002/ws"
"#;
        toml::from_str(toml_content).expect("Test config should parse")
    }
}

fn validate_worker_url(raw: &str, schemes: &[&str]) -> Result<(), ConfigError> {
    let parsed = Url::parse(raw).map_err(|e| ConfigError::InvalidWorkerUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if !schemes.contains(&parsed.scheme()) {
        return Err(ConfigError::InvalidWorkerUrl {
            url: raw.to_string(),
            reason: format!("scheme must be one of {}", schemes.join(", ")),
        });
    }

    Ok(())
}
