//! Repository implementations
//!
//! Each repository owns the SQL for one table group and speaks in row types;
//! translation to domain types happens in [`crate::adapters`]. Multi-row
//! changes run in a single transaction.

pub mod billet;
pub mod collaborator;
pub mod configuration;
pub mod remittance;

pub use billet::{BilletFilter, BilletRepository, BilletRow};
pub use collaborator::{ClientRow, CollaboratorRepository, InstallmentRow};
pub use configuration::{ConfigurationRepository, ConfigurationRow};
pub use remittance::{MemberLink, RemittanceFileRow, RemittanceRepository, RemittanceRow};
