use crate::adapters::command::DEFAULT_SEND_COMMAND;
use crate::core::dispatch::{DEFAULT_BATCH_WORKERS, DEFAULT_SEND_TIMEOUT};
use crate::core::pool::{DEFAULT_QUEUE_DEPTH, POOL_CEILING};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{DispatchError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_range, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const MAX_SEND_TIMEOUT_SECONDS: u64 = 300;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub server: ServerConfig,
    pub dispatch: DispatchConfig,
    pub gateway: GatewayConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub pool_size: usize,
    pub default_batch_workers: usize,
    pub queue_depth: usize,
    pub send_timeout_seconds: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            pool_size: POOL_CEILING,
            default_batch_workers: DEFAULT_BATCH_WORKERS,
            queue_depth: DEFAULT_QUEUE_DEPTH,
            send_timeout_seconds: DEFAULT_SEND_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub command: String,
    pub args: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_SEND_COMMAND.to_string(),
            args: vec!["-n".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub verbose: bool,
    pub json: bool,
    pub monitor: bool,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed)?)
    }

    /// 替換環境變數 (例如 ${SMS_PORT})，找不到的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| DispatchError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("server.host", &self.server.host)?;
        validate_positive_number("server.port", self.server.port as usize, 1)?;

        validate_range("dispatch.pool_size", self.dispatch.pool_size, 1, POOL_CEILING)?;
        validate_range(
            "dispatch.default_batch_workers",
            self.dispatch.default_batch_workers,
            1,
            POOL_CEILING,
        )?;
        validate_range(
            "dispatch.send_timeout_seconds",
            self.dispatch.send_timeout_seconds,
            1,
            MAX_SEND_TIMEOUT_SECONDS,
        )?;

        validate_non_empty_string("gateway.command", &self.gateway.command)?;

        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    fn pool_size(&self) -> usize {
        self.dispatch.pool_size
    }

    fn default_batch_workers(&self) -> usize {
        self.dispatch.default_batch_workers
    }

    fn queue_depth(&self) -> usize {
        self.dispatch.queue_depth
    }

    fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch.send_timeout_seconds)
    }

    fn send_command(&self) -> &str {
        &self.gateway.command
    }

    fn send_args(&self) -> &[String] {
        &self.gateway.args
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
