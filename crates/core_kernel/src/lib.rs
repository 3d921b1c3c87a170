//! Core Kernel - Foundational types and utilities for the collection system
//!
//! This crate provides the fundamental building blocks used across the workspace:
//! - Money types with precise decimal arithmetic (BRL collection titles)
//! - Audit stamps and the business timezone
//! - Common identifiers and port abstractions

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod ports;

pub use money::{Money, Currency, MoneyError};
pub use temporal::{AuditStamp, Timezone, TemporalError};
pub use identifiers::{
    ConfigurationId, BilletId, RemittanceId, InstallmentId, ClientId,
};
pub use ports::{
    PortError, DomainPort, OperationMetadata,
    HealthCheckable, HealthCheckResult, AdapterHealth,
};
