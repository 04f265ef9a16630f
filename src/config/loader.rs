use std::{env, time::Duration};

use super::env::{
    AppConfig, BlockingConfig, ConfigError, DirectoryConfig, LoggingConfig, PipelineConfig,
    WebContentConfig, DEFAULT_REDIRECT_URL, DEFAULT_USER_AGENT,
};

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_env()
}

impl AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let directories = DirectoryConfig {
            logs_dir: env::var("LOGS_DIR").unwrap_or_else(|_| "logs".to_string()),
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            db_filename: env::var("DB_FILENAME").unwrap_or_else(|_| "linkguard.db".to_string()),
            rules_filename: env::var("RULES_FILENAME")
                .unwrap_or_else(|_| "rules.json".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        let timezone = env::var("REPORT_TIMEZONE").unwrap_or_else(|_| "UTC".to_string());

        let blocking = BlockingConfig {
            redirect_url: env::var("BLOCK_REDIRECT_URL")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_REDIRECT_URL.to_string()),
            watch_interval: Duration::from_millis(parse_or("RULES_WATCH_INTERVAL", 2_000u64)),
        };

        let web = WebContentConfig {
            user_agent: env::var("FETCH_USER_AGENT")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            fetch_timeout: env::var("FETCH_TIMEOUT")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
            content_max_length: parse_or("WEBPAGE_CONTENT_MAX_LENGTH", 2_000usize),
            snippet_length: parse_or("SNIPPET_LENGTH", 200usize),
        };

        let pipeline = PipelineConfig {
            batch_size: parse_or("PIPELINE_BATCH_SIZE", 10usize),
            batch_interval: Duration::from_millis(parse_or("PIPELINE_BATCH_INTERVAL", 100u64)),
        };
        if pipeline.batch_size == 0 {
            return Err(ConfigError::Invalid {
                key: "PIPELINE_BATCH_SIZE",
                reason: "batch size must be at least 1".to_string(),
            });
        }

        Ok(Self {
            directories,
            logging,
            timezone,
            blocking,
            web,
            pipeline,
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
        .unwrap_or(default)
}
