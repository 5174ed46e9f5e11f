//! Database connection utilities.

use switchy_database::Database;
use switchy_database_connection::Credentials;

/// Connection settings for the `TimescaleDB` instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Full connection URL. Takes precedence over the individual fields.
    pub url: Option<String>,
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: String,
    /// Login role.
    pub user: String,
    /// Login password.
    pub password: String,
    /// Database name.
    pub database: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: "5432".to_string(),
            user: "ice_tracker".to_string(),
            password: String::new(),
            database: "ice_activities".to_string(),
        }
    }
}

impl DatabaseConfig {
    /// Reads `DATABASE_URL` and the `TIMESCALE_*` variables, falling back
    /// to the defaults for anything unset or empty.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            url: var("DATABASE_URL"),
            host: var("TIMESCALE_HOST").unwrap_or(defaults.host),
            port: var("TIMESCALE_PORT").unwrap_or(defaults.port),
            user: var("TIMESCALE_USER").unwrap_or(defaults.user),
            password: var("TIMESCALE_PASSWORD").unwrap_or(defaults.password),
            database: var("TIMESCALE_DATABASE").unwrap_or(defaults.database),
        }
    }

    /// The connection URL, without query parameters.
    ///
    /// Query parameters (e.g. `?sslmode=disable`) are stripped because the
    /// `Credentials` parser doesn't understand them.
    #[must_use]
    pub fn connection_url(&self) -> String {
        let url = self.url.clone().unwrap_or_else(|| {
            format!(
                "postgres://{}:{}@{}:{}/{}",
                self.user, self.password, self.host, self.port, self.database
            )
        });

        match url.split_once('?') {
            Some((base, _)) => base.to_string(),
            None => url,
        }
    }

    /// `host:port` for log lines, without credentials.
    #[must_use]
    pub fn display_target(&self) -> String {
        self.url.as_ref().map_or_else(
            || format!("{}:{}", self.host, self.port),
            |url| {
                let without_scheme = url.split_once("://").map_or(url.as_str(), |(_, r)| r);
                let host_part = without_scheme
                    .rsplit_once('@')
                    .map_or(without_scheme, |(_, h)| h);
                host_part
                    .split(['/', '?'])
                    .next()
                    .unwrap_or(host_part)
                    .to_string()
            },
        )
    }
}

/// Opens a connection to the database described by `config`.
///
/// Configures a 10-second `statement_timeout` so the server abandons
/// statements the client has already given up on.
///
/// # Errors
///
/// Returns an error if the URL is malformed or the connection fails.
pub async fn connect(
    config: &DatabaseConfig,
) -> Result<Box<dyn Database>, Box<dyn std::error::Error>> {
    let creds = Credentials::from_url(&config.connection_url())?;
    let db = switchy_database_connection::init_postgres_raw_native_tls(creds).await?;

    db.exec_raw("SET statement_timeout = '10s'").await?;

    log::info!("Database connection established: {}", config.display_target());

    Ok(db)
}
