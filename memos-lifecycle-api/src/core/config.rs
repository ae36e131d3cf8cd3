use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use memos_lifecycle::config::{
    Credentials, DEFAULT_API_URL, DEFAULT_USER_ID, SECRET_ENV_VAR, default_env_file,
};
use memos_lifecycle::{MemosConfig, WriterConfig};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub memos: MemosSettings,
    pub capture: CaptureSettings,
    pub writer: WriterSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MemosSettings {
    pub api_url: String,
    pub user_id: String,
    pub timeout_ms: u64,
    pub retries: u32,
    pub add_retries: u32,
    pub backoff_ms: u64,
    /// Fallback file for the service secret; `~/.openclaw/.env` when unset
    #[serde(default)]
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CaptureSettings {
    pub throttle_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WriterSettings {
    pub workers: usize,
    pub queue_depth: usize,
    pub shutdown_grace_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct LoggingConfig {
    pub json: bool,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Self::defaults()?
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("MEMOS_LIFECYCLE").separator("__"))
            .set_override_option("memos.api_url", env::var("MEMOS_API_URL").ok())?
            .set_override_option("memos.user_id", env::var("MEMOS_USER_ID").ok())?
            .build()?;

        s.try_deserialize()
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let writer = WriterConfig::default();
        Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8765)?
            .set_default("memos.api_url", DEFAULT_API_URL)?
            .set_default("memos.user_id", DEFAULT_USER_ID)?
            .set_default("memos.timeout_ms", 5000)?
            .set_default("memos.retries", 2)?
            .set_default("memos.add_retries", 1)?
            .set_default("memos.backoff_ms", 100)?
            .set_default("capture.throttle_secs", 600)?
            .set_default("writer.workers", writer.workers as u64)?
            .set_default("writer.queue_depth", writer.queue_depth as u64)?
            .set_default("writer.shutdown_grace_secs", 5)?
            .set_default("logging.json", false)
    }

    /// Client configuration, with credentials resolved from the environment
    /// or the configured env file.
    pub fn memos_config(&self) -> MemosConfig {
        let env_file = self.memos.env_file.clone().or_else(default_env_file);
        let credentials =
            Credentials::resolve_from(env::var(SECRET_ENV_VAR).ok(), env_file.as_deref());

        MemosConfig::default()
            .with_api_url(self.memos.api_url.clone())
            .with_user_id(self.memos.user_id.clone())
            .with_credentials(credentials)
            .with_request_timeout(Duration::from_millis(self.memos.timeout_ms))
            .with_retries(self.memos.retries)
            .with_add_retries(self.memos.add_retries)
            .with_backoff_step(Duration::from_millis(self.memos.backoff_ms))
            .with_writer(WriterConfig {
                workers: self.writer.workers,
                queue_depth: self.writer.queue_depth,
            })
    }

    pub fn throttle_window(&self) -> Duration {
        Duration::from_secs(self.capture.throttle_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.writer.shutdown_grace_secs)
    }
}
