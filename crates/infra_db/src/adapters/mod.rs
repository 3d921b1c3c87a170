//! Port adapters over PostgreSQL
//!
//! Adapters implement the domain ports and translate between domain types
//! and repository rows.

pub mod remittance;

pub use remittance::PostgresRemittanceStore;
