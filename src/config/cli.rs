use crate::config::toml_config::TomlConfig;
use crate::utils::error::Result;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Parser)]
#[command(name = "sms-dispatch")]
#[command(about = "HTTP service that dispatches SMS through a bounded worker pool")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(short, long)]
    pub port: Option<u16>,

    /// Concurrent sends allowed across the whole service (max 10)
    #[arg(long)]
    pub pool_size: Option<usize>,

    /// Workers used by batch requests that don't specify max_workers
    #[arg(long)]
    pub batch_workers: Option<usize>,

    /// Async sends allowed to wait for a worker before new ones are rejected
    #[arg(long)]
    pub queue_depth: Option<usize>,

    /// Per-send timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Command used to send one SMS
    #[arg(long)]
    pub command: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[arg(long, help = "Report process memory and CPU on /health")]
    pub monitor: bool,
}

impl CliConfig {
    /// 載入設定檔（若有指定）並套用命令列覆蓋
    pub fn load(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut TomlConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(pool_size) = self.pool_size {
            config.dispatch.pool_size = pool_size;
        }
        if let Some(workers) = self.batch_workers {
            config.dispatch.default_batch_workers = workers;
        }
        if let Some(depth) = self.queue_depth {
            config.dispatch.queue_depth = depth;
        }
        if let Some(timeout) = self.timeout {
            config.dispatch.send_timeout_seconds = timeout;
        }
        if let Some(command) = &self.command {
            config.gateway.command = command.clone();
        }
        config.logging.verbose |= self.verbose;
        config.logging.json |= self.json_logs;
        config.logging.monitor |= self.monitor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::ConfigProvider;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_flags_override_file_values() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[server]\nport = 7000\n[dispatch]\npool_size = 3\nqueue_depth = 7\n")
            .unwrap();

        let cli = CliConfig::parse_from([
            "sms-dispatch",
            "--config",
            temp_file.path().to_str().unwrap(),
            "--pool-size",
            "6",
            "--timeout",
            "12",
            "--verbose",
        ]);
        let config = cli.load().unwrap();

        assert_eq!(config.server.port, 7000);
        assert_eq!(config.pool_size(), 6);
        assert_eq!(config.queue_depth(), 7);
        assert_eq!(config.send_timeout().as_secs(), 12);
        assert!(config.logging.verbose);
    }

    #[test]
    fn test_missing_config_file_is_io_error() {
        let cli = CliConfig {
            config: Some(PathBuf::from("/nonexistent/sms-dispatch.toml")),
            ..Default::default()
        };
        assert!(matches!(
            cli.load(),
            Err(crate::utils::error::DispatchError::IoError(_))
        ));
    }
}
