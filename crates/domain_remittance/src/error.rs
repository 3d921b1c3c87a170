//! Remittance domain errors
//!
//! Every failure of a batch mutation or of file generation is one of these
//! variants. Callers branch on the variant (or on [`RemittanceError::code`])
//! rather than on message text.

use serde::Serialize;
use std::fmt;
use thiserror::Error;
use validator::ValidationErrors;

use core_kernel::{BilletId, PortError, RemittanceId};

/// Which batch attribute a conflicting billet disagrees on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictAttribute {
    Bank,
    Configuration,
    Remittance,
}

impl fmt::Display for ConflictAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConflictAttribute::Bank => "bank",
            ConflictAttribute::Configuration => "configuration",
            ConflictAttribute::Remittance => "remittance",
        };
        f.write_str(name)
    }
}

/// Errors that can occur in the remittance domain
#[derive(Debug, Error)]
pub enum RemittanceError {
    /// A configuration or command field failed its constraints
    #[error("Validation error on {field}: {message}")]
    Validation {
        field: String,
        message: String,
    },

    /// A billet disagrees with the batch's bank, configuration or owner
    #[error("Batch conflict on {attribute}: expected {expected}, found {found}")]
    BatchConflict {
        attribute: ConflictAttribute,
        expected: String,
        found: String,
    },

    /// A billet lacks the installment or payer data needed for encoding
    #[error("Missing data for billet {billet_id}: {field}")]
    MissingData {
        billet_id: BilletId,
        field: &'static str,
    },

    /// No codec is registered for the bank
    #[error("Unsupported bank: {0}")]
    UnsupportedBank(String),

    /// The remittance no longer accepts membership changes
    #[error("Remittance {0} has already been submitted")]
    AlreadySubmitted(RemittanceId),

    /// File generation needs at least one billet
    #[error("Remittance {0} has no billets")]
    EmptyRemittance(RemittanceId),

    /// Entity not found
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: String,
        id: String,
    },

    /// Encoding stopped between two detail records
    #[error("File generation cancelled")]
    Cancelled,

    /// A record layout did not add up to 400 characters
    #[error("{record} record has {width} characters, expected 400")]
    Layout {
        record: &'static str,
        width: usize,
    },

    /// Persistence or collaborator failure
    #[error("Port error: {0}")]
    Port(PortError),
}

/// Structured failure handed to the API boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub code: &'static str,
    pub message: String,
}

impl RemittanceError {
    /// Creates a validation error for a field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        RemittanceError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a not found error
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        RemittanceError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates a batch conflict error
    pub fn conflict(
        attribute: ConflictAttribute,
        expected: impl fmt::Display,
        found: impl fmt::Display,
    ) -> Self {
        RemittanceError::BatchConflict {
            attribute,
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Stable machine-readable code for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            RemittanceError::Validation { .. } => "validation_error",
            RemittanceError::BatchConflict { .. } => "batch_conflict",
            RemittanceError::MissingData { .. } => "missing_data",
            RemittanceError::UnsupportedBank(_) => "unsupported_bank",
            RemittanceError::AlreadySubmitted(_) => "already_submitted",
            RemittanceError::EmptyRemittance(_) => "empty_remittance",
            RemittanceError::NotFound { .. } => "not_found",
            RemittanceError::Cancelled => "cancelled",
            RemittanceError::Layout { .. } => "layout_error",
            RemittanceError::Port(_) => "port_error",
        }
    }

    /// Converts the error into the code + message pair returned to callers
    pub fn to_failure(&self) -> Failure {
        Failure {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

impl From<PortError> for RemittanceError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound { entity_type, id } => RemittanceError::NotFound {
                entity: entity_type,
                id,
            },
            PortError::Validation { message, field } => RemittanceError::Validation {
                field: field.unwrap_or_else(|| "request".to_string()),
                message,
            },
            other => RemittanceError::Port(other),
        }
    }
}

impl From<ValidationErrors> for RemittanceError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<(String, String)> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let reasons = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                (field.to_string(), reasons)
            })
            .collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let field = fields
            .first()
            .map(|(f, _)| f.clone())
            .unwrap_or_else(|| "request".to_string());
        let message = fields
            .iter()
            .map(|(f, reasons)| format!("{f}: {reasons}"))
            .collect::<Vec<_>>()
            .join("; ");

        RemittanceError::Validation { field, message }
    }
}
