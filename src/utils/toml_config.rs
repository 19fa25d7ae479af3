//! TOML-based configuration for the research server
//!
//! This module provides declarative configuration for providers, models and the
//! research graph via a TOML file (`ares.toml`). Secrets are never stored in the
//! file itself; provider entries name the environment variable that holds them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure loaded from ares.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Named LLM provider configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Named model configurations that reference providers
    #[serde(default)]
    pub models: HashMap<String, ModelConfig>,

    /// Research graph configuration
    pub research: ResearchConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

// ============= Provider Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
    },
    OpenAI {
        /// Environment variable containing API key
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
    },
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

// ============= Model Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Reference to a provider name defined in [providers]
    pub provider: String,

    /// Model name/identifier to use with the provider
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_model_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_model_max_tokens() -> u32 {
    1024
}

// ============= Research Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Model used to split the request into sub-questions
    pub decomposer_model: String,

    /// Model used by every question pipeline's answer stage
    pub answer_model: String,

    /// Model used to compose the final streamed reply
    pub synthesizer_model: String,

    /// Upper bound on concurrently running question pipelines (0 = unbounded)
    #[serde(default = "default_max_parallel_questions")]
    pub max_parallel_questions: usize,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub web_search: WebSearchConfig,
}

fn default_max_parallel_questions() -> usize {
    8
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory of `.md` / `.txt` documents indexed at startup
    #[serde(default = "default_documents_dir")]
    pub documents_dir: PathBuf,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum BM25 score for a passage to count as a hit
    #[serde(default = "default_min_score")]
    pub min_score: f32,
}

fn default_true() -> bool {
    true
}

fn default_documents_dir() -> PathBuf {
    PathBuf::from("./data/knowledge")
}

fn default_top_k() -> usize {
    3
}

fn default_min_score() -> f32 {
    0.5
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            documents_dir: default_documents_dir(),
            top_k: default_top_k(),
            min_score: default_min_score(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_num_results")]
    pub num_results: usize,
}

fn default_num_results() -> usize {
    5
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            num_results: default_num_results(),
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),

    #[error("Provider '{0}' referenced by model '{1}' does not exist")]
    MissingProvider(String, String),

    #[error("Model '{0}' referenced by research.{1} does not exist")]
    MissingModel(String, String),
}

impl AppConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file without validating it
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for internal consistency and env var availability
    pub fn validate(&self) -> Result<(), ConfigError> {
        for provider in self.providers.values() {
            if let ProviderConfig::OpenAI { api_key_env, .. } = provider {
                self.validate_env_var(api_key_env)?;
            }
        }

        for (model_name, model_config) in &self.models {
            if !self.providers.contains_key(&model_config.provider) {
                return Err(ConfigError::MissingProvider(
                    model_config.provider.clone(),
                    model_name.clone(),
                ));
            }
            if !(0.0..=2.0).contains(&model_config.temperature) {
                return Err(ConfigError::ValidationError(format!(
                    "Model '{}' has temperature {} outside 0.0..=2.0",
                    model_name, model_config.temperature
                )));
            }
        }

        for (role, model) in self.research.model_roles() {
            if !self.models.contains_key(model) {
                return Err(ConfigError::MissingModel(model.to_string(), role.to_string()));
            }
        }

        if self.research.retrieval.enabled && self.research.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "research.retrieval.top_k must be at least 1".to_string(),
            ));
        }

        if self.research.web_search.enabled && self.research.web_search.num_results == 0 {
            return Err(ConfigError::ValidationError(
                "research.web_search.num_results must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_env_var(&self, name: &str) -> Result<(), ConfigError> {
        std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))?;
        Ok(())
    }

    /// Get provider by name
    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    /// Get model by name
    pub fn get_model(&self, name: &str) -> Option<&ModelConfig> {
        self.models.get(name)
    }

    /// Socket address string the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl ResearchConfig {
    /// `(field name, model name)` pairs for every model the graph uses
    pub fn model_roles(&self) -> [(&'static str, &str); 3] {
        [
            ("decomposer_model", self.decomposer_model.as_str()),
            ("answer_model", self.answer_model.as_str()),
            ("synthesizer_model", self.synthesizer_model.as_str()),
        ]
    }
}

/// Starter configuration written by `ares-research init`
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# ares-research configuration

[server]
host = "127.0.0.1"
port = 3000
log_level = "info"
# "pretty" or "json"
log_format = "pretty"

[providers.ollama-local]
type = "ollama"
base_url = "http://localhost:11434"

# [providers.openai]
# type = "openai"
# api_key_env = "OPENAI_API_KEY"

[models.decomposer]
provider = "ollama-local"
model = "llama3.2"
temperature = 0.0
max_tokens = 512

[models.answer]
provider = "ollama-local"
model = "llama3.2"
temperature = 0.3
max_tokens = 1024

[models.synthesizer]
provider = "ollama-local"
model = "llama3.2"
temperature = 0.5
max_tokens = 2048

[research]
decomposer_model = "decomposer"
answer_model = "answer"
synthesizer_model = "synthesizer"
max_parallel_questions = 8

[research.retrieval]
enabled = true
documents_dir = "./data/knowledge"
top_k = 3
min_score = 0.5

[research.web_search]
enabled = true
num_results = 5
"#;
