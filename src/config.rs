use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for the NEXUS service
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NexusConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Logging and counters
    pub observability: ObservabilityConfig,
    /// Which traveler store backs the service
    pub store: StoreConfig,
    /// Database settings (used by the sqlite store)
    pub database: Option<DatabaseConfig>,
    /// Labor timer settings
    pub labor: LaborConfig,
    /// Approval workflow settings
    pub approvals: ApprovalConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `0.0.0.0:8000`
    pub listen: String,
    /// Maximum accepted request body in bytes
    pub body_limit_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level or full env-filter directive
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable output
    pub json_logs: bool,
    /// Log counters on shutdown
    pub metrics_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// SQLite URL, e.g. `sqlite://nexus.db`
    pub url: String,
    /// Pool size
    pub max_connections: u32,
    /// Apply pending migrations when the pool opens
    pub auto_migrate: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LaborConfig {
    /// Retries when a labor write races another traveler edit
    pub write_retries: u32,
    /// Default window for "my entries"
    pub my_entries_days: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ApprovalConfig {
    /// Let an approver resolve a request they filed themselves
    pub allow_self_resolve: bool,
}

impl Default for NexusConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                listen: "127.0.0.1:8000".to_string(),
                body_limit_bytes: 1024 * 1024,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                json_logs: false,
                metrics_enabled: true,
            },
            store: StoreConfig {
                backend: StoreBackend::Memory,
            },
            database: Some(DatabaseConfig {
                url: "sqlite://nexus.db".to_string(),
                max_connections: 5,
                auto_migrate: true,
            }),
            labor: LaborConfig {
                write_retries: 3,
                my_entries_days: 7,
            },
            approvals: ApprovalConfig {
                allow_self_resolve: false,
            },
        }
    }
}

impl NexusConfig {
    /// Layered load, later sources win:
    /// 1. Default values
    /// 2. Configuration files (nexus.toml, .nexus-rc)
    /// 3. Environment variables (prefixed with NEXUS_, sections split by `__`)
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if Path::new("nexus.toml").exists() {
            builder = builder.add_source(File::with_name("nexus"));
        }

        if Path::new(".nexus-rc").exists() {
            builder = builder.add_source(File::new(".nexus-rc", config::FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("NEXUS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Write the configuration as TOML
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Pull `.env` into the process environment when present
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Loaded once on first access
static CONFIG: std::sync::LazyLock<Result<NexusConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = NexusConfig::load_env_file();
        NexusConfig::load()
    });

/// Process-wide configuration
pub fn config() -> Result<&'static NexusConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Force the load at startup so a bad file fails fast
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}
