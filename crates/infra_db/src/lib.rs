//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the remittance domain using SQLx.
//!
//! # Architecture
//!
//! - [`repositories`]: SQL per table group, speaking in row types
//! - [`adapters`]: the domain port implementations built on the repositories
//! - [`pool`]: connection pool setup and the embedded migrations
//!
//! Queries are built at runtime with `sqlx::query_as` and `FromRow` rows, so
//! the crate compiles without a live database.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use infra_db::{create_pool_from_url, run_migrations, PostgresRemittanceStore};
//!
//! let pool = create_pool_from_url("postgres://localhost/cobranca").await?;
//! run_migrations(&pool).await?;
//! let store = Arc::new(PostgresRemittanceStore::new(pool));
//! ```

pub mod adapters;
pub mod error;
pub mod pool;
pub mod repositories;

pub use adapters::PostgresRemittanceStore;
pub use error::DatabaseError;
pub use pool::{create_pool, create_pool_from_url, run_migrations, DatabaseConfig, DatabasePool, MIGRATOR};
