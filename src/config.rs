use anyhow::{bail, Context};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory served at `/`
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    /// Ceiling for a whole upload request body
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

/// Either `url` or the host/user/password/name quartet must be set.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub upload_dir: String,
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_static_dir() -> String {
    "html".to_string()
}

fn default_max_upload_bytes() -> usize {
    32 << 20
}

fn default_max_connections() -> u32 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: None,
            user: None,
            password: None,
            name: None,
            max_connections: default_max_connections(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    /// Missing required settings are a startup failure.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_overrides(|key| env::var(key).ok());
        config.validate()?;
        config.ensure_directories()?;
        Ok(config)
    }

    fn load_from_file() -> anyhow::Result<Self> {
        let config_paths = ["config.toml", "conf.ini", "data/config.toml"];

        for path in config_paths {
            if Path::new(path).exists() {
                let content = fs::read_to_string(path)?;
                let config: Config = toml::from_str(&content)
                    .with_context(|| format!("invalid config file {}", path))?;
                tracing::info!("Loaded configuration from {}", path);
                return Ok(config);
            }
        }

        tracing::info!("No configuration file found, using environment only");
        Ok(Config::default())
    }

    /// Apply overrides from a variable lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("SERVER_HOST") {
            self.server.host = val;
        }
        if let Some(val) = lookup("SERVER_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Some(val) = lookup("STATIC_DIR") {
            self.server.static_dir = val;
        }
        if let Some(val) = lookup("MAX_UPLOAD_BYTES") {
            if let Ok(bytes) = val.parse() {
                self.server.max_upload_bytes = bytes;
            }
        }

        if let Some(val) = lookup("DATABASE_URL") {
            self.database.url = Some(val);
        }
        if let Some(val) = lookup("DB_HOST") {
            self.database.host = Some(val);
        }
        if let Some(val) = lookup("DB_USER") {
            self.database.user = Some(val);
        }
        if let Some(val) = lookup("DB_PASS") {
            self.database.password = Some(val);
        }
        if let Some(val) = lookup("DB_NAME") {
            self.database.name = Some(val);
        }
        if let Some(val) = lookup("DB_MAX_CONNECTIONS") {
            if let Ok(n) = val.parse() {
                self.database.max_connections = n;
            }
        }

        if let Some(val) = lookup("UPLOAD_DIR") {
            self.storage.upload_dir = val;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.storage.upload_dir.trim().is_empty() {
            bail!("UPLOAD_DIR is not set");
        }
        self.database.url()?;
        if self.database.max_connections == 0 {
            bail!("database max_connections must be at least 1");
        }
        Ok(())
    }

    fn ensure_directories(&self) -> anyhow::Result<()> {
        fs::create_dir_all(&self.storage.upload_dir)
            .with_context(|| format!("cannot create upload dir {}", self.storage.upload_dir))?;
        Ok(())
    }
}

impl DatabaseConfig {
    /// Connection URL, either given directly or assembled as a MySQL URL
    pub fn url(&self) -> anyhow::Result<String> {
        if let Some(url) = self.url.as_deref().filter(|u| !u.trim().is_empty()) {
            return Ok(url.to_string());
        }

        let host = required(&self.host, "DB_HOST")?;
        let user = required(&self.user, "DB_USER")?;
        let name = required(&self.name, "DB_NAME")?;
        let password = self
            .password
            .as_deref()
            .context("DB_PASS is not set")?;

        Ok(format!(
            "mysql://{}:{}@{}/{}",
            urlencoding::encode(user),
            urlencoding::encode(password),
            host,
            name
        ))
    }
}

fn required<'a>(value: &'a Option<String>, key: &str) -> anyhow::Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => bail!("{} is not set", key),
    }
}
