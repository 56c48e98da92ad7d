use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Chat with your documents from the terminal", long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Base URL of the document-chat API
    #[arg(long, env = "DOCCHAT_BASE_URL")]
    pub base_url: Option<String>,

    /// Log in as this user on startup
    #[arg(short, long, env = "DOCCHAT_USERNAME")]
    pub username: Option<String>,

    /// Password for --username
    #[arg(long, env = "DOCCHAT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub ingestion: IngestionConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub summary_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestionConfig {
    pub poll_interval_ms: u64,
    pub max_attempts: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    /// `compact` or `json`.
    pub format: String,
}

impl LogConfig {
    pub fn json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn summary_timeout(&self) -> Duration {
        Duration::from_secs(self.summary_timeout_secs)
    }
}

impl IngestionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8000".to_string(),
                request_timeout_secs: 30,
                summary_timeout_secs: 60,
            },
            ingestion: IngestionConfig {
                poll_interval_ms: 1000,
                max_attempts: 60,
            },
            log: LogConfig {
                format: "compact".to_string(),
            },
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Self::load_from_cli(&cli)
    }

    /// Layering: defaults < config file < `DOCCHAT_` env < CLI flags.
    pub fn load_from_cli(cli: &Cli) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder()
            .set_default("api.base_url", "http://localhost:8000")?
            .set_default("api.request_timeout_secs", 30)?
            .set_default("api.summary_timeout_secs", 60)?
            .set_default("ingestion.poll_interval_ms", 1000)?
            .set_default("ingestion.max_attempts", 60)?
            .set_default("log.format", "compact")?;

        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path).required(true)),
            None => builder.add_source(File::with_name("docchat").required(false)),
        };

        // E.g. DOCCHAT_API__BASE_URL=http://api:8000
        builder = builder.add_source(
            Environment::with_prefix("DOCCHAT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(url) = &cli.base_url {
            builder = builder.set_override("api.base_url", url.as_str())?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "api.base_url cannot be empty".to_string(),
            ));
        }
        if self.ingestion.max_attempts == 0 {
            return Err(config::ConfigError::Message(
                "ingestion.max_attempts must be at least 1".to_string(),
            ));
        }
        if !matches!(self.log.format.to_ascii_lowercase().as_str(), "compact" | "json") {
            return Err(config::ConfigError::Message(format!(
                "log.format must be 'compact' or 'json', got '{}'",
                self.log.format
            )));
        }
        Ok(())
    }
}
