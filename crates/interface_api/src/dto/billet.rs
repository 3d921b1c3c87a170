//! Billet DTOs

use chrono::{DateTime, Utc};
use core_kernel::{BilletId, ClientId, ConfigurationId, InstallmentId, RemittanceId};
use domain_remittance::{Bank, Billet, BilletQuery, NewBillet, RemittanceError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateBilletRequest {
    pub installment_id: InstallmentId,
    pub configuration_id: ConfigurationId,
    pub client_id: ClientId,
    /// Defaults to the configuration's bank
    pub bank_code: Option<String>,
}

impl TryFrom<CreateBilletRequest> for NewBillet {
    type Error = RemittanceError;

    fn try_from(request: CreateBilletRequest) -> Result<Self, Self::Error> {
        Ok(NewBillet {
            installment_id: request.installment_id,
            configuration_id: request.configuration_id,
            client_id: request.client_id,
            bank: request.bank_code.as_deref().map(str::parse::<Bank>).transpose()?,
        })
    }
}

/// `GET /billets` filters
#[derive(Debug, Default, Deserialize)]
pub struct BilletListParams {
    pub configuration_id: Option<ConfigurationId>,
    pub remittance_id: Option<RemittanceId>,
    #[serde(default)]
    pub unbatched: bool,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl BilletListParams {
    pub fn to_query(self) -> BilletQuery {
        let page = super::PageParams {
            limit: self.limit,
            offset: self.offset,
        }
        .to_page();
        BilletQuery {
            configuration_id: self.configuration_id,
            remittance_id: self.remittance_id,
            unbatched: self.unbatched,
            page,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BilletResponse {
    pub id: BilletId,
    pub installment_id: InstallmentId,
    pub configuration_id: ConfigurationId,
    pub client_id: ClientId,
    pub remittance_id: Option<RemittanceId>,
    pub bank_code: String,
    /// Zero until first included in a generated file
    pub our_number: u64,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

impl From<Billet> for BilletResponse {
    fn from(billet: Billet) -> Self {
        Self {
            id: billet.id,
            installment_id: billet.installment_id,
            configuration_id: billet.configuration_id,
            client_id: billet.client_id,
            remittance_id: billet.remittance_id,
            bank_code: billet.bank.code().to_string(),
            our_number: billet.our_number,
            created_at: billet.audit.created_at,
            created_by: billet.audit.created_by,
            updated_at: billet.audit.updated_at,
            updated_by: billet.audit.updated_by,
        }
    }
}
