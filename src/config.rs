use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub scraper: ScraperConfig,
    pub pipeline: PipelineConfig,
    pub registry: RegistryConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub chrome_path: Option<String>,
    pub headless: bool,
    pub user_agent: String,
    pub navigation_timeout_secs: u64,
    pub requests_per_minute: u32,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub batch_size: usize,
    pub item_timeout_secs: u64,
    pub job_deadline_secs: u64,
    pub target_manufacturer: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Extra manufacturer profiles appended after the built-in ones.
    pub profiles_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
    /// When set, logs are also written to a daily rolling file here.
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub endpoint: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_upload_bytes: 5 * 1024 * 1024,
        }
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36".to_string(),
            navigation_timeout_secs: 30,
            requests_per_minute: 60,
            max_retries: 3,
            retry_base_delay_ms: 1000,
            retry_max_delay_ms: 5000,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            item_timeout_secs: 120,
            job_deadline_secs: 1800,
            target_manufacturer: Some("Abdos".to_string()),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "labchem_enricher=info,tower_http=info".to_string(),
            directory: None,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "/metrics".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Add environment-specific config
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add local config (ignored by git)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with prefix "LABCHEM_"
            .add_source(Environment::with_prefix("LABCHEM").separator("__"))
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        // Add Chrome path from environment if not set
        if config.scraper.chrome_path.is_none() {
            config.scraper.chrome_path = env::var("CHROME_PATH").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate server configuration
        if self.server.port == 0 {
            return Err(ConfigError::Message("Server port must be greater than 0".into()));
        }

        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::Message(
                "Server max_upload_bytes must be greater than 0".into(),
            ));
        }

        // Validate scraper configuration
        if self.scraper.requests_per_minute == 0 {
            return Err(ConfigError::Message(
                "Scraper requests_per_minute must be greater than 0".into(),
            ));
        }

        if self.scraper.navigation_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "Scraper navigation_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.scraper.retry_base_delay_ms > self.scraper.retry_max_delay_ms {
            return Err(ConfigError::Message(
                "Scraper retry_base_delay_ms cannot exceed retry_max_delay_ms".into(),
            ));
        }

        // Validate pipeline configuration
        if self.pipeline.batch_size == 0 {
            return Err(ConfigError::Message("Pipeline batch_size must be greater than 0".into()));
        }

        if self.pipeline.item_timeout_secs == 0 || self.pipeline.job_deadline_secs == 0 {
            return Err(ConfigError::Message("Pipeline timeouts must be greater than 0".into()));
        }

        // Validate metrics configuration
        if !self.metrics.endpoint.starts_with('/') {
            return Err(ConfigError::Message("Metrics endpoint must start with '/'".into()));
        }

        Ok(())
    }
}
