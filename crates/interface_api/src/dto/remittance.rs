//! Remittance DTOs

use chrono::{DateTime, Utc};
use core_kernel::{BilletId, ConfigurationId, RemittanceId};
use domain_remittance::Remittance;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Billets to add; the whole set is accepted or none is
#[derive(Debug, Deserialize, Validate)]
pub struct AddBilletsRequest {
    #[validate(length(min = 1, message = "at least one billet id is required"))]
    pub billet_ids: Vec<BilletId>,
}

#[derive(Debug, Serialize)]
pub struct RemittanceResponse {
    pub id: RemittanceId,
    /// Unset while the batch is empty
    pub bank_code: Option<String>,
    pub configuration_id: Option<ConfigurationId>,
    pub is_submitted: bool,
    pub file_name: Option<String>,
    pub billet_ids: Vec<BilletId>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

impl From<Remittance> for RemittanceResponse {
    fn from(remittance: Remittance) -> Self {
        let audit = remittance.audit().clone();
        Self {
            id: remittance.id(),
            bank_code: remittance.bank().map(|bank| bank.code().to_string()),
            configuration_id: remittance.configuration_id(),
            is_submitted: remittance.is_submitted(),
            file_name: remittance.file_name().map(str::to_string),
            billet_ids: remittance.billets().iter().map(|b| b.id).collect(),
            created_at: audit.created_at,
            created_by: audit.created_by,
            updated_at: audit.updated_at,
            updated_by: audit.updated_by,
        }
    }
}
