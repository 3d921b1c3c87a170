//! Test Utilities Crate
//!
//! Shared test infrastructure for the remittance workspace.
//!
//! # Modules
//!
//! - `fixtures`: Fixed configurations, payers, installments and dates
//! - `builders`: Builders for configurations and titles, and a service harness
//! - `database`: PostgreSQL test container with the schema migrated
//! - `assertions`: CNAB400 structural assertions
//! - `generators`: Property-based and `fake` data generators

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
