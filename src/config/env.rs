use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub directories: DirectoryConfig,
    pub logging: LoggingConfig,
    pub timezone: String,
    pub blocking: BlockingConfig,
    pub web: WebContentConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub logs_dir: String,
    pub data_dir: String,
    pub db_filename: String,
    pub rules_filename: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone)]
pub struct BlockingConfig {
    pub redirect_url: String,
    pub watch_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct WebContentConfig {
    pub user_agent: String,
    pub fetch_timeout: Option<Duration>,
    pub content_max_length: usize,
    pub snippet_length: usize,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub batch_size: usize,
    pub batch_interval: Duration,
}

pub const DEFAULT_REDIRECT_URL: &str = "https://www.google.com/search?q=website+blocked";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

impl Default for WebContentConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            fetch_timeout: None,
            content_max_length: 2_000,
            snippet_length: 200,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            batch_interval: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
