use crate::core::{AdapterError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Properties that must be present for a connection config to be valid.
pub const REQUIRED_PROPERTIES: [&str; 4] = ["host", "database", "user", "password"];

pub const DEFAULT_DRIVER: &str = "Vertica";
pub const DEFAULT_PORT: u16 = 5433;

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Deserialize)]
pub struct Settings {
    pub connection: ConnectionSettings,
    #[serde(default)]
    pub adapter: AdapterOptions,
}

impl Settings {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Raw connection properties, as written in a config file.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ConnectionSettings {
    pub host: Option<String>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub driver: Option<String>,
    pub port: Option<u16>,
}

/// Adapter behaviour switches.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AdapterOptions {
    /// Schema looked up in the catalog when a table name is not qualified.
    /// Vertica's default is `public`; the SQLite backend names its schema `main`.
    pub default_schema: String,
    /// Cache column maps per (schema, table) instead of querying the catalog on every write
    pub cache_schema: bool,
    /// Bind UPDATE SET values as placeholders instead of inlining quoted literals
    pub bind_update_values: bool,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        AdapterOptions {
            default_schema: "public".to_string(),
            cache_schema: false,
            bind_update_values: false,
        }
    }
}

/// Validated, immutable connection configuration.
///
/// The DSN is built once at construction and reused for every connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    host: String,
    database: String,
    user: String,
    password: String,
    driver: String,
    port: u16,
    dsn: String,
}

impl ConnectionConfig {
    pub fn new(
        host: impl Into<String>,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        ConnectionSettings {
            host: Some(host.into()),
            database: Some(database.into()),
            user: Some(user.into()),
            password: Some(password.into()),
            ..Default::default()
        }
        .try_into()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn driver(&self) -> &str {
        &self.driver
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The connection descriptor string handed to the driver
    pub fn dsn(&self) -> &str {
        &self.dsn
    }
}

fn build_dsn(driver: &str, host: &str, port: u16, database: &str) -> String {
    format!(
        "Driver={};Servername={};Port={};Database={};",
        driver, host, port, database
    )
}

impl TryFrom<ConnectionSettings> for ConnectionConfig {
    type Error = AdapterError;

    fn try_from(settings: ConnectionSettings) -> Result<Self> {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        let missing: Vec<&str> = REQUIRED_PROPERTIES
            .iter()
            .zip([
                &settings.host,
                &settings.database,
                &settings.user,
                &settings.password,
            ])
            .filter(|(_, value)| !present(*value))
            .map(|(name, _)| *name)
            .collect();

        if !missing.is_empty() {
            return Err(AdapterError::Config(format!(
                "missing required connection properties: {}",
                missing.join(", ")
            )));
        }

        let ConnectionSettings {
            host,
            database,
            user,
            password,
            driver,
            port,
        } = settings;
        let (host, database, user, password) = (
            host.unwrap_or_default(),
            database.unwrap_or_default(),
            user.unwrap_or_default(),
            password.unwrap_or_default(),
        );
        let driver = driver
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| DEFAULT_DRIVER.to_string());
        let port = port.filter(|p| *p != 0).unwrap_or(DEFAULT_PORT);
        let dsn = build_dsn(&driver, &host, port, &database);

        Ok(ConnectionConfig {
            host,
            database,
            user,
            password,
            driver,
            port,
            dsn,
        })
    }
}

/// Loads settings from a TOML file at the given path.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let content = fs::read_to_string(path)?;
    Settings::from_toml_str(&content)
}

/// `<config dir>/vsql/config.toml`, if the platform has a config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("vsql").join("config.toml"))
}
