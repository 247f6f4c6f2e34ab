//! Global configuration.
//!
//! Loaded once from `mutaties.toml` in the working directory. If the file doesn't exist,
//! defaults are used. A few settings can be overridden with environment variables,
//! which is handy when running tests or several workers on the same machine.
use once_cell::sync::OnceCell;
use std::env::var;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use std::fs::read_to_string;
use thiserror::Error;
use tracing::info;

use crate::queue::Backoff;

static CONFIG: OnceCell<Config> = OnceCell::new();

#[derive(Error, Debug)]
pub enum Error {
    #[error("config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("config file not found")]
    Io(#[from] std::io::Error),

    #[error("config not found")]
    NoConfig,
}

/// Global configuration.
#[derive(Debug, Clone)]
pub struct Config {
    path: Option<PathBuf>,
    pub general: General,
    pub database: Database,
    pub sync: SyncPorts,
    pub wait: Wait,
    pub websim: Websim,
}

#[derive(Debug, Clone)]
pub struct General {
    pub tty: bool,
    pub log_queries: bool,
    pub header_max_size: usize,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: Option<String>,
    pub name: String,
    pub user: String,
    pub pool_size: usize,
    pub idle_timeout: Duration,
    pub checkout_timeout: Duration,
}

/// Where the background sync pings go.
#[derive(Debug, Clone)]
pub struct SyncPorts {
    pub host: String,
    /// Every queue listens on its own port, offset from this one.
    pub base_port: u16,
}

/// How long producers wait for the worker.
#[derive(Debug, Clone)]
pub struct Wait {
    pub interval: Duration,
    pub budget: Duration,
}

#[derive(Debug, Clone)]
pub struct Websim {
    pub mail_port: u16,
    pub bondspas_port: u16,
    pub mail_delay: Duration,
}

impl Database {
    pub fn database_url(&self) -> String {
        if let Some(url) = &self.url {
            url.clone()
        } else {
            format!("postgresql://{}@localhost/{}", self.user, self.name)
        }
    }

    fn from_config_file(&mut self, file: &DatabaseConfig) {
        if let Some(url) = &file.url {
            self.url = Some(url.clone());
        }

        if let Some(name) = &file.name {
            self.name = name.clone();
        }

        if let Some(user) = &file.user {
            self.user = user.clone();
        }

        self.pool_size = file.pool_size;
        self.idle_timeout = Duration::from_secs(file.idle_timeout);
        self.checkout_timeout = Duration::from_secs(file.checkout_timeout);
    }
}

impl Default for Database {
    fn default() -> Self {
        let url = var("MUTATIES_DATABASE_URL").ok();

        let user = match var("MUTATIES_DATABASE_USER") {
            Ok(user) => user,
            Err(_) => var("USER").unwrap_or("postgres".into()),
        };

        let name = match var("MUTATIES_DATABASE") {
            Ok(database) => database,
            Err(_) => user.clone(),
        };

        Self {
            url,
            user,
            name,
            pool_size: 10,
            idle_timeout: Duration::from_secs(3600),
            checkout_timeout: Duration::from_secs(5),
        }
    }
}

impl Default for General {
    fn default() -> Self {
        Self {
            tty: std::io::stderr().is_terminal(),
            log_queries: var("MUTATIES_LOG_QUERIES").is_ok(),
            header_max_size: 16 * 1024, // 16KB
        }
    }
}

impl Default for SyncPorts {
    fn default() -> Self {
        let base_port = var("MUTATIES_SYNC_BASE_PORT")
            .ok()
            .and_then(|port| port.parse().ok())
            .unwrap_or(3000);

        Self {
            host: "127.0.0.1".into(),
            base_port,
        }
    }
}

impl Default for Wait {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(200),
            budget: Duration::from_millis(3000),
        }
    }
}

impl Wait {
    /// Backoff schedule used by producers waiting on the worker.
    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.interval, self.budget)
    }
}

impl Default for Websim {
    fn default() -> Self {
        Self {
            mail_port: 8123,
            bondspas_port: 8124,
            mail_delay: Duration::from_secs(3),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: None,
            general: General::default(),
            database: Database::default(),
            sync: SyncPorts::default(),
            wait: Wait::default(),
            websim: Websim::default(),
        }
    }
}

impl Config {
    /// Load configuration from the first config file found in the working directory.
    pub fn load() -> Result<Config, Error> {
        for name in ["mutaties.toml", "Mutaties.toml"] {
            let path = PathBuf::from(name);
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        Err(Error::NoConfig)
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Config, Error> {
        let config_file = ConfigFile::load(path.as_ref())?;
        let mut config = Config::default();

        config.path = Some(path.as_ref().to_path_buf());
        config.general.log_queries = config_file.general.log_queries;
        config.general.header_max_size = config_file.general.header_max_size;
        config
            .database
            .from_config_file(&config_file.database.unwrap_or_default());

        if let Some(sync) = config_file.sync {
            if let Some(host) = sync.host {
                config.sync.host = host;
            }
            if let Some(base_port) = sync.base_port {
                config.sync.base_port = base_port;
            }
        }

        if let Some(wait) = config_file.wait {
            config.wait.interval = Duration::from_millis(wait.interval_ms);
            config.wait.budget = Duration::from_millis(wait.budget_ms);
        }

        if let Some(websim) = config_file.websim {
            config.websim.mail_port = websim.mail_port;
            config.websim.bondspas_port = websim.bondspas_port;
            config.websim.mail_delay = Duration::from_millis(websim.mail_delay_ms);
        }

        config.env_overrides(|name| var(name).ok());

        Ok(config)
    }

    // Environment wins over the file, so several workers can share one config.
    fn env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("MUTATIES_DATABASE_URL") {
            self.database.url = Some(url);
        }

        if let Some(user) = lookup("MUTATIES_DATABASE_USER") {
            self.database.user = user;
        }

        if let Some(name) = lookup("MUTATIES_DATABASE") {
            self.database.name = name;
        }

        if let Some(port) = lookup("MUTATIES_SYNC_BASE_PORT").and_then(|port| port.parse().ok()) {
            self.sync.base_port = port;
        }
    }

    pub fn get() -> &'static Config {
        get_config()
    }

    /// Path of the file this configuration was loaded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Print where the configuration came from.
    pub fn log_info(&self) {
        match self.path() {
            Some(path) => info!("Configuration loaded from \"{}\"", path.display()),
            None => info!("Configuration file missing, using defaults"),
        }
    }
}

pub fn get_config() -> &'static Config {
    CONFIG.get_or_init(|| Config::load().unwrap_or_default())
}

#[derive(Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    general: GeneralConfig,
    database: Option<DatabaseConfig>,
    sync: Option<SyncConfig>,
    wait: Option<WaitConfig>,
    websim: Option<WebsimConfig>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<ConfigFile, Error> {
        let file = read_to_string(path)?;
        let config: Self = toml::from_str(&file)?;

        Ok(config)
    }
}

#[derive(Serialize, Deserialize)]
struct GeneralConfig {
    #[serde(default)]
    log_queries: bool,
    #[serde(default = "GeneralConfig::default_header_max_size")]
    header_max_size: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_queries: false,
            header_max_size: Self::default_header_max_size(),
        }
    }
}

impl GeneralConfig {
    fn default_header_max_size() -> usize {
        16 * 1024
    }
}

#[derive(Serialize, Deserialize)]
struct DatabaseConfig {
    url: Option<String>,
    name: Option<String>,
    user: Option<String>,
    #[serde(default = "DatabaseConfig::default_pool_size")]
    pool_size: usize,
    #[serde(default = "DatabaseConfig::default_idle_timeout")]
    idle_timeout: u64,
    #[serde(default = "DatabaseConfig::default_checkout_timeout")]
    checkout_timeout: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            name: None,
            user: None,
            pool_size: Self::default_pool_size(),
            idle_timeout: Self::default_idle_timeout(),
            checkout_timeout: Self::default_checkout_timeout(),
        }
    }
}

impl DatabaseConfig {
    fn default_pool_size() -> usize {
        10
    }

    fn default_idle_timeout() -> u64 {
        3600
    }

    fn default_checkout_timeout() -> u64 {
        5
    }
}

#[derive(Serialize, Deserialize)]
struct SyncConfig {
    host: Option<String>,
    base_port: Option<u16>,
}

#[derive(Serialize, Deserialize)]
struct WaitConfig {
    #[serde(default = "WaitConfig::default_interval_ms")]
    interval_ms: u64,
    #[serde(default = "WaitConfig::default_budget_ms")]
    budget_ms: u64,
}

impl WaitConfig {
    fn default_interval_ms() -> u64 {
        200
    }

    fn default_budget_ms() -> u64 {
        3000
    }
}

#[derive(Serialize, Deserialize)]
struct WebsimConfig {
    #[serde(default = "WebsimConfig::default_mail_port")]
    mail_port: u16,
    #[serde(default = "WebsimConfig::default_bondspas_port")]
    bondspas_port: u16,
    #[serde(default = "WebsimConfig::default_mail_delay_ms")]
    mail_delay_ms: u64,
}

impl WebsimConfig {
    fn default_mail_port() -> u16 {
        8123
    }

    fn default_bondspas_port() -> u16 {
        8124
    }

    fn default_mail_delay_ms() -> u64 {
        3000
    }
}
