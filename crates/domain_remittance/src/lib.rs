//! Remittance Domain - collection titles and CNAB400 bank files
//!
//! This crate turns billets (collection titles) into the fixed-width
//! remittance files banks ingest to register them:
//!
//! - [`BilletConfiguration`]: bank account/contract profile and its terms
//! - [`Billet`]: one title for one invoice installment
//! - [`Remittance`]: the batch aggregate; one bank, one configuration
//! - [`cnab`]: header/detail/trailer encoding, one layout per bank
//! - [`RemittanceService`]: the command surface over the ports
//!
//! # Example
//!
//! ```rust,ignore
//! let service = RemittanceService::new(ports, ServiceSettings::default());
//! let remittance = service.create_remittance(&metadata).await?;
//! service.add_billets(remittance.id(), &billet_ids, &metadata).await?;
//! let file = service.generate_file(remittance.id(), &metadata).await?;
//! assert_eq!(file.line_count, billet_ids.len() + 2);
//! ```

pub mod bank;
pub mod billet;
pub mod cnab;
pub mod collaborators;
pub mod configuration;
pub mod error;
pub mod ports;
pub mod remittance;
pub mod sequence;
pub mod service;

pub use bank::Bank;
pub use billet::{Billet, NewBillet};
pub use cnab::{CodecRegistry, EncodeRequest, RemittanceCodec, RemittanceFile};
pub use collaborators::{EncodableTitle, InstallmentData, PayerAddress, PayerData, TitleData};
pub use configuration::{BilletConfiguration, ConfigurationChanges, NewBilletConfiguration};
pub use error::{ConflictAttribute, Failure, RemittanceError};
pub use ports::{
    BilletPort, BilletQuery, ConfigurationPort, InstallmentPort, PageQuery, PayerPort,
    RemittancePort, SequencePort, StoredFile,
};
pub use remittance::{Remittance, RemittanceHeader};
pub use sequence::SequenceAllocator;
pub use service::{RemittancePorts, RemittanceService, ServiceSettings};
