// src/config/pipeline.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

pub const ENV_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/pipeline.toml";

fn default_sources() -> Vec<String> {
    vec![
        "https://forecast.weather.gov/xml/current_obs/KJFK.xml".to_string(),
        "https://www.floatrates.com/daily/usd.xml".to_string(),
    ]
}
fn default_content_dir() -> PathBuf {
    PathBuf::from("downloads")
}
fn default_handoff_dir() -> PathBuf {
    PathBuf::from("downloads/.handoff")
}
fn default_weather_document() -> String {
    crate::parse::WEATHER_DOCUMENT.to_string()
}
fn default_currency_document() -> String {
    crate::parse::CURRENCY_DOCUMENT.to_string()
}
fn default_fetch_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    concat!("weather-fx-pipeline/", env!("CARGO_PKG_VERSION")).to_string()
}
fn default_retries() -> u32 {
    2
}
fn default_retry_delay_secs() -> u64 {
    300
}
fn default_interval_secs() -> u64 {
    3600
}
fn default_database_url() -> String {
    "ENV".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,
    #[serde(default = "default_content_dir")]
    pub content_dir: PathBuf,
    #[serde(default = "default_handoff_dir")]
    pub handoff_dir: PathBuf,
    #[serde(default = "default_weather_document")]
    pub weather_document: String,
    #[serde(default = "default_currency_document")]
    pub currency_document: String,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Extra attempts per failed stage.
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// "ENV" means: read from DATABASE_URL
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// "ENV" means: read from SLACK_WEBHOOK_URL (unset → notifications only logged)
    #[serde(default)]
    pub slack_webhook_url: Option<String>,
    #[serde(default)]
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            content_dir: default_content_dir(),
            handoff_dir: default_handoff_dir(),
            weather_document: default_weather_document(),
            currency_document: default_currency_document(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            user_agent: default_user_agent(),
            retries: default_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            interval_secs: default_interval_secs(),
            database_url: default_database_url(),
            slack_webhook_url: None,
            metrics_addr: None,
        }
    }
}

impl PipelineConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config from {}", path.display()))?;
        Self::from_toml_str(&data)
    }

    pub fn from_toml_str(data: &str) -> Result<Self> {
        let cfg: PipelineConfig = toml::from_str(data).context("parsing pipeline config")?;
        Ok(cfg.sanitized())
    }

    /// Resolution order:
    /// 1) $PIPELINE_CONFIG_PATH (must exist)
    /// 2) config/pipeline.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from_file(&pb);
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from_file(&default_p);
        }
        Ok(Self::default())
    }

    fn sanitized(mut self) -> Self {
        if self.fetch_timeout_secs == 0 {
            self.fetch_timeout_secs = default_fetch_timeout_secs();
        }
        if self.interval_secs == 0 {
            self.interval_secs = default_interval_secs();
        }
        if self.sources.is_empty() {
            self.sources = default_sources();
        }
        if self.user_agent.trim().is_empty() {
            self.user_agent = default_user_agent();
        }
        self
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn document_names(&self) -> crate::parse::DocumentNames {
        crate::parse::DocumentNames {
            weather: self.weather_document.clone(),
            currency: self.currency_document.clone(),
        }
    }

    /// Resolve the database url, following the "ENV" convention.
    pub fn resolve_database_url(&self) -> Result<String> {
        if self.database_url.trim().eq_ignore_ascii_case("env") {
            env::var("DATABASE_URL").map_err(|_| anyhow!("Missing DATABASE_URL env var"))
        } else {
            Ok(self.database_url.clone())
        }
    }

    /// `None` when no webhook is configured (or "ENV" and the variable is unset).
    pub fn resolve_slack_webhook(&self) -> Option<String> {
        let raw = self.slack_webhook_url.as_deref()?.trim();
        if raw.eq_ignore_ascii_case("env") {
            env::var("SLACK_WEBHOOK_URL").ok().filter(|s| !s.is_empty())
        } else if raw.is_empty() {
            None
        } else {
            Some(raw.to_string())
        }
    }
}
