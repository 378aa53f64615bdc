//! Runtime settings from environment variables (`.env` is loaded by the binary via dotenvy).

use crate::error::ConfigError;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://inventory.db";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Log targets that emit SQL statements at debug level.
pub const SQL_LOG_TARGETS: &[&str] = &[
    "inventory_admin::migration",
    "inventory_admin::service",
    "inventory_admin::report",
];

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub database_url: String,
    pub org_name: String,
    pub app_title: String,
    /// Log every SQL statement at debug level.
    pub sql_logging: bool,
    pub bind_addr: SocketAddr,
    /// JSON config replacing the embedded inventory schema.
    pub config_path: Option<PathBuf>,
    pub max_connections: u32,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; unset and blank values take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind
            .parse()
            .map_err(|e| ConfigError::Load(format!("BIND_ADDR '{}': {}", bind, e)))?;
        let max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(v) => v
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::Load(format!("DB_MAX_CONNECTIONS '{}' is not a positive integer", v)))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Settings {
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            org_name: get("ORG_NAME").unwrap_or_else(|| "Inventory".to_string()),
            app_title: get("APP_TITLE").unwrap_or_else(|| "Admin".to_string()),
            sql_logging: get("SQL_LOGGING").map(|v| parse_flag(&v)).unwrap_or(false),
            bind_addr,
            config_path: get("CONFIG_PATH").map(PathBuf::from),
            max_connections,
        })
    }

    /// Title shown on the admin index.
    pub fn admin_name(&self) -> String {
        format!("{} | {}", self.org_name, self.app_title)
    }

    /// Extra log filter directives; empty unless `SQL_LOGGING` is on.
    pub fn log_directives(&self) -> Vec<String> {
        if !self.sql_logging {
            return Vec::new();
        }
        SQL_LOG_TARGETS.iter().map(|t| format!("{}=debug", t)).collect()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            org_name: "Inventory".to_string(),
            app_title: "Admin".to_string(),
            sql_logging: false,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            config_path: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

fn parse_flag(v: &str) -> bool {
    matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
