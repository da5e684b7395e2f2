//! Database connection configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the MySQL/MariaDB store holding the metadata tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Hostname of the database server.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port of the database server.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database (schema) name.
    #[serde(default = "default_database")]
    pub database: String,

    /// Username for the connection.
    #[serde(default = "default_username")]
    pub username: String,

    /// Password for the connection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable containing the full DATABASE_URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_env: Option<String>,

    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database: default_database(),
            username: default_username(),
            password: None,
            credentials_env: None,
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// Build a MySQL connection string from this configuration.
    pub fn connection_string(&self) -> String {
        if let Some(env_var) = &self.credentials_env {
            if let Ok(url) = std::env::var(env_var) {
                return url;
            }
        }

        match &self.password {
            Some(password) => format!(
                "mysql://{}:{}@{}:{}/{}",
                self.username, password, self.host, self.port, self.database
            ),
            None => format!(
                "mysql://{}@{}:{}/{}",
                self.username, self.host, self.port, self.database
            ),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3306
}

fn default_database() -> String {
    "wordpress".to_string()
}

fn default_username() -> String {
    "root".to_string()
}

fn default_max_connections() -> u32 {
    2
}
