//! Database Test Utilities
//!
//! A PostgreSQL test container with the remittance schema migrated, plus
//! seeding helpers for the installment and client tables the remittance
//! store reads from.

use std::sync::Arc;
use std::time::Duration;

use domain_remittance::{InstallmentData, PayerData};
use infra_db::{run_migrations, PostgresRemittanceStore};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use testcontainers::{runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

const POSTGRES_TAG: &str = "16-alpine";
const POSTGRES_USER: &str = "test_user";
const POSTGRES_PASSWORD: &str = "test_password";
const POSTGRES_DB: &str = "cobranca_test";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Connection settings for the test database
#[derive(Debug, Clone)]
pub struct TestDatabaseConfig {
    pub user: String,
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
}

impl Default for TestDatabaseConfig {
    fn default() -> Self {
        Self {
            user: POSTGRES_USER.to_string(),
            password: POSTGRES_PASSWORD.to_string(),
            database: POSTGRES_DB.to_string(),
            host: "localhost".to_string(),
            port: 5432,
        }
    }
}

impl TestDatabaseConfig {
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

/// A migrated PostgreSQL container
pub struct TestDatabase {
    _container: ContainerAsync<Postgres>,
    pub config: TestDatabaseConfig,
    pub pool: PgPool,
}

impl TestDatabase {
    /// Starts a container and applies every migration
    ///
    /// # Errors
    ///
    /// Returns an error if the container fails to start or a migration fails
    pub async fn new() -> Result<Self, BoxError> {
        let container = Postgres::default()
            .with_user(POSTGRES_USER)
            .with_password(POSTGRES_PASSWORD)
            .with_db_name(POSTGRES_DB)
            .with_tag(POSTGRES_TAG)
            .start()
            .await?;

        let config = TestDatabaseConfig {
            host: container.get_host().await?.to_string(),
            port: container.get_host_port_ipv4(5432).await?,
            ..TestDatabaseConfig::default()
        };

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&config.connection_url())
            .await?;

        run_migrations(&pool).await?;

        Ok(Self {
            _container: container,
            config,
            pool,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// A store over this database, ready to build service ports from
    pub fn store(&self) -> Arc<PostgresRemittanceStore> {
        Arc::new(PostgresRemittanceStore::new(self.pool.clone()))
    }

    /// Removes all rows while keeping the schema
    pub async fn clear_data(&self) -> Result<(), BoxError> {
        sqlx::query(
            "TRUNCATE TABLE remittance_files, billets, remittances, billet_configurations, \
             installments, clients CASCADE",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Inserts an installment as the invoicing subsystem would
    pub async fn seed_installment(&self, installment: &InstallmentData) -> Result<(), BoxError> {
        sqlx::query(
            "INSERT INTO installments (installment_id, amount, due_date, issue_date) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(installment.installment_id.as_uuid())
        .bind(installment.amount.map(|money| money.amount()))
        .bind(installment.due_date)
        .bind(installment.issue_date)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Inserts a client as the client subsystem would
    pub async fn seed_client(&self, payer: &PayerData) -> Result<(), BoxError> {
        let address = &payer.address;
        sqlx::query(
            "INSERT INTO clients (client_id, tax_id, legal_name, street, number, city, state, zip) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(payer.client_id.as_uuid())
        .bind(&payer.tax_id)
        .bind(&payer.legal_name)
        .bind(&address.street)
        .bind(&address.number)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.zip)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

static SHARED_TEST_DB: OnceCell<Arc<TestDatabase>> = OnceCell::const_new();

/// A single container shared by every test in the binary
///
/// # Panics
///
/// Panics if the database fails to start
pub async fn get_shared_test_database() -> Arc<TestDatabase> {
    SHARED_TEST_DB
        .get_or_init(|| async {
            Arc::new(
                TestDatabase::new()
                    .await
                    .expect("Failed to create shared test database"),
            )
        })
        .await
        .clone()
}

/// A container of its own, for tests that must not see other tests' rows
pub async fn create_isolated_test_database() -> Result<TestDatabase, BoxError> {
    TestDatabase::new().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_connection_url() {
        let config = TestDatabaseConfig::default();
        let url = config.connection_url();

        assert!(url.starts_with("postgres://"));
        assert!(url.contains(POSTGRES_USER));
        assert!(url.ends_with(POSTGRES_DB));
    }
}
