//! Server configuration read from the environment.

use ice_tracker_database::db::DatabaseConfig;

/// Everything the server needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub bind_addr: String,
    /// Port the HTTP listener binds to.
    pub port: u16,
    /// Store connection settings.
    pub database: DatabaseConfig,
}

impl ServerConfig {
    /// Reads `API_HOST`, `API_PORT`, and the database variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    ///
    /// An unparsable `API_PORT` falls back to `8080`.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let bind_addr = lookup("API_HOST")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        let port = lookup("API_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        Self {
            bind_addr,
            port,
            database: DatabaseConfig::from_lookup(&lookup),
        }
    }
}
