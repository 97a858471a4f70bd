//! Database bootstrap: make sure the server is reachable, the target
//! database exists and its schema is current.
//!
//! [`Bootstrapper`] drives the steps in order and stops at the first
//! failure. The Postgres specifics sit behind [`SetupBackend`].

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{ConnectionTrait, DbBackend, Statement};
use tokio::net::TcpStream;
use url::Url;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use super::db::Database;
use crate::config::{DEFAULT_DATABASE_PORT, DEFAULT_SETUP_TIMEOUT_SECS, MAINTENANCE_DATABASE};
use crate::errors::{AppError, AppResult};

static DATABASE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("database name pattern is valid")
});

/// Reject names that could not be used as a quoted Postgres identifier.
pub fn validate_database_name(name: &str) -> AppResult<()> {
    if DATABASE_NAME.is_match(name) {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "Invalid database name '{}': use letters, digits and underscores (max 63)",
            name
        )))
    }
}

/// Server and database the bootstrap works against
#[derive(Debug, Clone, PartialEq)]
pub struct SetupTarget {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub timeout: Duration,
}

impl SetupTarget {
    /// Read host, port and database name from a connection string.
    pub fn from_database_url(database_url: &str) -> AppResult<Self> {
        let url = Url::parse(database_url)
            .map_err(|e| AppError::Configuration(format!("Invalid DATABASE_URL: {}", e)))?;

        let host = url
            .host_str()
            .ok_or_else(|| AppError::Configuration("DATABASE_URL has no host".to_string()))?
            .to_string();
        let database = url.path().trim_start_matches('/').to_string();
        if database.is_empty() {
            return Err(AppError::Configuration(
                "DATABASE_URL has no database name".to_string(),
            ));
        }

        Ok(Self {
            host,
            port: url.port().unwrap_or(DEFAULT_DATABASE_PORT),
            database,
            timeout: Duration::from_secs(DEFAULT_SETUP_TIMEOUT_SECS),
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Steps of the bootstrap against a concrete server.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait SetupBackend: Send + Sync {
    /// Check that the server accepts TCP connections.
    async fn probe(&self, host: &str, port: u16, timeout: Duration) -> AppResult<()>;

    async fn database_exists(&self, name: &str) -> AppResult<bool>;

    async fn create_database(&self, name: &str) -> AppResult<()>;

    /// Apply pending migrations on the named database.
    async fn run_migrations(&self, name: &str) -> AppResult<()>;
}

/// Outcome of a successful bootstrap
#[derive(Debug, Clone, PartialEq)]
pub struct SetupReport {
    pub address: String,
    pub database: String,
    /// `false` when the database already existed
    pub created: bool,
}

pub struct Bootstrapper<B: SetupBackend> {
    backend: B,
    target: SetupTarget,
}

impl<B: SetupBackend> Bootstrapper<B> {
    pub fn new(backend: B, target: SetupTarget) -> Self {
        Self { backend, target }
    }

    /// Probe, create when absent, then migrate.
    pub async fn run(&self) -> AppResult<SetupReport> {
        let target = &self.target;
        validate_database_name(&target.database)?;

        tracing::info!(address = %target.address(), "Checking database server");
        self.backend
            .probe(&target.host, target.port, target.timeout)
            .await?;

        let created = if self.backend.database_exists(&target.database).await? {
            tracing::info!(database = %target.database, "Database already exists");
            false
        } else {
            tracing::info!(database = %target.database, "Creating database");
            self.backend.create_database(&target.database).await?;
            true
        };

        tracing::info!(database = %target.database, "Running migrations");
        self.backend.run_migrations(&target.database).await?;

        Ok(SetupReport {
            address: target.address(),
            database: target.database.clone(),
            created,
        })
    }
}

/// [`SetupBackend`] for a Postgres server reached through `server_url`.
///
/// The URL's credentials are reused; its path is swapped for the
/// maintenance database or the target database as each step needs.
pub struct PostgresBootstrap {
    server_url: Url,
}

impl PostgresBootstrap {
    pub fn new(database_url: &str, target: &SetupTarget) -> AppResult<Self> {
        let mut server_url = Url::parse(database_url)
            .map_err(|e| AppError::Configuration(format!("Invalid DATABASE_URL: {}", e)))?;
        server_url
            .set_host(Some(&target.host))
            .map_err(|e| AppError::Configuration(format!("Invalid database host: {}", e)))?;
        server_url
            .set_port(Some(target.port))
            .map_err(|_| AppError::Configuration("DATABASE_URL cannot carry a port".to_string()))?;

        Ok(Self { server_url })
    }

    fn url_for(&self, database: &str) -> String {
        let mut url = self.server_url.clone();
        url.set_path(&format!("/{}", database));
        url.to_string()
    }

    async fn maintenance(&self) -> AppResult<Database> {
        Database::connect_without_migrations(&self.url_for(MAINTENANCE_DATABASE)).await
    }
}

#[async_trait]
impl SetupBackend for PostgresBootstrap {
    async fn probe(&self, host: &str, port: u16, timeout: Duration) -> AppResult<()> {
        let unreachable = || {
            AppError::ServiceUnavailable(format!(
                "Cannot connect to PostgreSQL at {}:{}",
                host, port
            ))
        };

        match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Database server probe failed");
                Err(unreachable())
            }
            Err(_) => Err(unreachable()),
        }
    }

    async fn database_exists(&self, name: &str) -> AppResult<bool> {
        let db = self.maintenance().await?;
        let row = db
            .connection()
            .query_one(Statement::from_sql_and_values(
                DbBackend::Postgres,
                "SELECT 1 FROM pg_database WHERE datname = $1",
                [name.into()],
            ))
            .await?;
        Ok(row.is_some())
    }

    async fn create_database(&self, name: &str) -> AppResult<()> {
        // Identifiers cannot be bound as parameters
        validate_database_name(name)?;
        let db = self.maintenance().await?;
        db.connection()
            .execute(Statement::from_string(
                DbBackend::Postgres,
                format!("CREATE DATABASE \"{}\"", name),
            ))
            .await?;
        Ok(())
    }

    async fn run_migrations(&self, name: &str) -> AppResult<()> {
        let db = Database::connect_without_migrations(&self.url_for(name)).await?;
        db.run_migrations().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_from_url() {
        let target =
            SetupTarget::from_database_url("postgresql://app:pw@db.internal:6543/insightfinance")
                .unwrap();

        assert_eq!(target.host, "db.internal");
        assert_eq!(target.port, 6543);
        assert_eq!(target.database, "insightfinance");
        assert_eq!(target.address(), "db.internal:6543");
    }

    #[test]
    fn test_target_defaults_port() {
        let target = SetupTarget::from_database_url("postgres://localhost/app").unwrap();
        assert_eq!(target.port, 5432);
    }

    #[test]
    fn test_target_requires_database() {
        assert!(SetupTarget::from_database_url("postgres://localhost:5432/").is_err());
        assert!(SetupTarget::from_database_url("not a url").is_err());
    }

    #[test]
    fn test_database_name_rules() {
        assert!(validate_database_name("insightfinance").is_ok());
        assert!(validate_database_name("_test_01").is_ok());
        assert!(validate_database_name("1db").is_err());
        assert!(validate_database_name("app\"; DROP").is_err());
        assert!(validate_database_name(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_url_for_swaps_database() {
        let target = SetupTarget::from_database_url("postgresql://u:p@localhost:5432/app").unwrap();
        let backend =
            PostgresBootstrap::new("postgresql://u:p@localhost:5432/app", &target).unwrap();

        assert_eq!(backend.url_for("postgres"), "postgresql://u:p@localhost:5432/postgres");
    }

    fn target() -> SetupTarget {
        SetupTarget::from_database_url("postgresql://u:p@localhost:5432/insightfinance").unwrap()
    }

    #[tokio::test]
    async fn test_unreachable_server_stops_bootstrap() {
        let mut backend = MockSetupBackend::new();
        backend
            .expect_probe()
            .times(1)
            .returning(|_, _, _| Err(AppError::ServiceUnavailable("refused".to_string())));
        backend.expect_database_exists().never();
        backend.expect_create_database().never();
        backend.expect_run_migrations().never();

        let result = Bootstrapper::new(backend, target()).run().await;
        assert!(matches!(result, Err(AppError::ServiceUnavailable(_))));
    }

    #[tokio::test]
    async fn test_existing_database_is_only_migrated() {
        let mut backend = MockSetupBackend::new();
        backend.expect_probe().returning(|_, _, _| Ok(()));
        backend
            .expect_database_exists()
            .withf(|name| name == "insightfinance")
            .returning(|_| Ok(true));
        backend.expect_create_database().never();
        backend.expect_run_migrations().times(1).returning(|_| Ok(()));

        let report = Bootstrapper::new(backend, target()).run().await.unwrap();
        assert!(!report.created);
        assert_eq!(report.address, "localhost:5432");
    }

    #[tokio::test]
    async fn test_missing_database_is_created_before_migrating() {
        let mut seq = mockall::Sequence::new();
        let mut backend = MockSetupBackend::new();
        backend
            .expect_probe()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        backend
            .expect_database_exists()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(false));
        backend
            .expect_create_database()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        backend
            .expect_run_migrations()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let report = Bootstrapper::new(backend, target()).run().await.unwrap();
        assert!(report.created);
        assert_eq!(report.database, "insightfinance");
    }

    #[tokio::test]
    async fn test_invalid_name_rejected_before_probe() {
        let mut backend = MockSetupBackend::new();
        backend.expect_probe().never();

        let mut target = target();
        target.database = "bad-name".to_string();
        let result = Bootstrapper::new(backend, target).run().await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
