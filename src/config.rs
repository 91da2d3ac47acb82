use serde::Deserialize;
use std::env;
use std::fs;

use crate::error::{GatewayError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    pub server: ServerConfig,
    pub openai: OpenAiConfig,
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub stream: StreamConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub endpoint: String,
    /// Model-name prefixes routed to this provider
    #[serde(default = "default_openai_prefixes")]
    pub model_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OllamaConfig {
    pub endpoint: String,
    #[serde(default = "default_ollama_prefixes")]
    pub model_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// Ceiling on buffered un-delimited text per request, in bytes
    #[serde(default = "default_buffer_ceiling")]
    pub buffer_ceiling_bytes: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

fn default_openai_prefixes() -> Vec<String> {
    vec!["gpt-".to_string(), "o1".to_string(), "o3".to_string()]
}

fn default_ollama_prefixes() -> Vec<String> {
    vec!["llama".to_string(), "qwen".to_string(), "mistral".to_string()]
}

fn default_buffer_ceiling() -> usize {
    1024 * 1024
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_retry_max_delay_ms() -> u64 {
    10_000
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_ceiling_bytes: default_buffer_ceiling(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl ProxyConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let listen_addr =
            env::var("GATEWAY_LISTEN_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

        let api_key = env::var("OPENAI_API_KEY")
            .map_err(|_| GatewayError::ConfigError("OPENAI_API_KEY not set".to_string()))?;

        let openai_endpoint =
            env::var("OPENAI_ENDPOINT").unwrap_or_else(|_| "https://api.openai.com".to_string());

        let ollama_endpoint =
            env::var("OLLAMA_ENDPOINT").unwrap_or_else(|_| "http://127.0.0.1:11434".to_string());

        Ok(ProxyConfig {
            server: ServerConfig { listen_addr },
            openai: OpenAiConfig {
                api_key,
                endpoint: openai_endpoint,
                model_prefixes: default_openai_prefixes(),
            },
            ollama: OllamaConfig {
                endpoint: ollama_endpoint,
                model_prefixes: default_ollama_prefixes(),
            },
            stream: StreamConfig::default(),
        })
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| GatewayError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let mut config: ProxyConfig = toml::from_str(&contents)
            .map_err(|e| GatewayError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        // Allow environment variables to override file config
        if let Ok(api_key) = env::var("OPENAI_API_KEY") {
            config.openai.api_key = api_key;
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.listen_addr.is_empty() {
            return Err(GatewayError::ConfigError(
                "Listen address is empty".to_string(),
            ));
        }

        if self.openai.endpoint.is_empty() || self.ollama.endpoint.is_empty() {
            return Err(GatewayError::ConfigError("Endpoint is empty".to_string()));
        }

        if self.stream.buffer_ceiling_bytes == 0 {
            return Err(GatewayError::ConfigError(
                "Buffer ceiling must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
