//! Database settings and pool wiring.

use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use thiserror::Error;
use tracing::info;
use url::Url;

/// Shared connection pool alias.
pub type DbPool = DatabaseConnection;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database configuration missing: set DATABASE_URL or DB_HOST")]
    MissingConfig,
    #[error("invalid {key}: {value}")]
    InvalidSetting { key: &'static str, value: String },
    #[error(transparent)]
    Connect(#[from] DbErr),
}

pub type DbResult<T> = Result<T, DbError>;

/// Environment-driven connection settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    pub fn from_env() -> DbResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves settings from `DATABASE_URL`, or from the discrete `DB_*`
    /// variables when no URL is given.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DbResult<Self> {
        let url = match non_empty(lookup("DATABASE_URL")) {
            Some(url) => url,
            None => {
                let host = non_empty(lookup("DB_HOST")).ok_or(DbError::MissingConfig)?;
                let port = match non_empty(lookup("DB_PORT")) {
                    Some(raw) => raw.parse::<u16>().map_err(|_| DbError::InvalidSetting {
                        key: "DB_PORT",
                        value: raw,
                    })?,
                    None => 5432,
                };
                postgres_url(
                    &host,
                    port,
                    &lookup("DB_USER").unwrap_or_default(),
                    &lookup("DB_PASSWORD").unwrap_or_default(),
                    &lookup("DB_NAME").unwrap_or_default(),
                    lookup("DB_SSL").as_deref() == Some("true"),
                )?
            }
        };

        let max_connections = match non_empty(lookup("DB_MAX_CONNECTIONS")) {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(DbError::InvalidSetting {
                    key: "DB_MAX_CONNECTIONS",
                    value: raw,
                })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            url,
            max_connections,
        })
    }

    fn is_in_memory(&self) -> bool {
        self.url.starts_with("sqlite:") && self.url.contains(":memory:")
    }
}

/// Credentials and database name are percent-encoded by `Url`.
fn postgres_url(
    host: &str,
    port: u16,
    user: &str,
    password: &str,
    name: &str,
    ssl: bool,
) -> DbResult<String> {
    let invalid_host = || DbError::InvalidSetting {
        key: "DB_HOST",
        value: host.to_string(),
    };
    let mut url = Url::parse(&format!("postgres://{host}:{port}/")).map_err(|_| invalid_host())?;
    if !user.is_empty() {
        url.set_username(user).map_err(|_| invalid_host())?;
    }
    if !password.is_empty() {
        url.set_password(Some(password)).map_err(|_| invalid_host())?;
    }
    url.set_path(name);
    if ssl {
        url.set_query(Some("sslmode=require"));
    }
    Ok(url.into())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Opens the pool. In-memory SQLite is pinned to one connection so every
/// query sees the same database.
pub async fn connect(settings: &DatabaseSettings) -> DbResult<DbPool> {
    let max_connections = if settings.is_in_memory() {
        1
    } else {
        settings.max_connections
    };
    let mut options = ConnectOptions::new(settings.url.clone());
    options
        .max_connections(max_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    let pool = Database::connect(options).await?;
    info!(backend = ?pool.get_database_backend(), max_connections, "database connected");
    Ok(pool)
}
