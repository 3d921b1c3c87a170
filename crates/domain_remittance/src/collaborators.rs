//! Read-only snapshots of data owned by neighbouring subsystems
//!
//! Amounts and dates belong to the invoice installment, names and addresses
//! to the client record. The remittance core only reads them, through
//! [`crate::ports::InstallmentPort`] and [`crate::ports::PayerPort`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::{BilletId, ClientId, InstallmentId, Money};

use crate::billet::Billet;
use crate::error::RemittanceError;

/// Amount and dates of one invoice installment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentData {
    pub installment_id: InstallmentId,
    pub amount: Option<Money>,
    pub due_date: Option<NaiveDate>,
    pub issue_date: Option<NaiveDate>,
}

/// Structured payer address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayerAddress {
    pub street: String,
    pub number: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

impl PayerAddress {
    /// `street, number - city, state`
    pub fn composed(&self) -> String {
        format!("{}, {} - {}, {}", self.street, self.number, self.city, self.state)
    }

    /// ZIP code with punctuation removed
    pub fn zip_digits(&self) -> String {
        self.zip.chars().filter(|c| c.is_ascii_digit()).collect()
    }
}

/// Identification of the client a billet is charged to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayerData {
    pub client_id: ClientId,
    pub tax_id: String,
    pub legal_name: String,
    pub address: PayerAddress,
}

impl PayerData {
    /// Tax id with punctuation removed
    pub fn tax_id_digits(&self) -> String {
        self.tax_id.chars().filter(|c| c.is_ascii_digit()).collect()
    }
}

/// Everything a detail record needs about one billet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodableTitle {
    pub billet_id: BilletId,
    pub our_number: u64,
    pub amount: Money,
    pub due_date: NaiveDate,
    pub issue_date: NaiveDate,
    pub payer: PayerData,
}

/// A billet joined with its collaborator snapshots, before completeness is
/// checked
#[derive(Debug, Clone, Copy)]
pub struct TitleData<'a> {
    pub billet: &'a Billet,
    pub installment: Option<&'a InstallmentData>,
    pub payer: Option<&'a PayerData>,
}

impl<'a> TitleData<'a> {
    pub fn new(
        billet: &'a Billet,
        installment: Option<&'a InstallmentData>,
        payer: Option<&'a PayerData>,
    ) -> Self {
        Self { billet, installment, payer }
    }

    /// Checks completeness and produces the encodable view
    ///
    /// # Errors
    ///
    /// `RemittanceError::MissingData` naming the first absent field
    pub fn resolve(self) -> Result<EncodableTitle, RemittanceError> {
        let missing = |field| RemittanceError::MissingData {
            billet_id: self.billet.id,
            field,
        };

        let installment = self.installment.ok_or_else(|| missing("installment"))?;
        let amount = installment.amount.ok_or_else(|| missing("amount"))?;
        let due_date = installment.due_date.ok_or_else(|| missing("due_date"))?;
        let issue_date = installment.issue_date.ok_or_else(|| missing("issue_date"))?;
        let payer = self.payer.ok_or_else(|| missing("payer"))?;
        if payer.tax_id_digits().is_empty() {
            return Err(missing("payer_tax_id"));
        }

        Ok(EncodableTitle {
            billet_id: self.billet.id,
            our_number: self.billet.our_number,
            amount,
            due_date,
            issue_date,
            payer: payer.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composed_address() {
        let address = PayerAddress {
            street: "Rua das Flores".to_string(),
            number: "12".to_string(),
            city: "Sao Paulo".to_string(),
            state: "SP".to_string(),
            zip: "01310-100".to_string(),
        };
        assert_eq!(address.composed(), "Rua das Flores, 12 - Sao Paulo, SP");
        assert_eq!(address.zip_digits(), "01310100");
    }

    #[test]
    fn test_tax_id_digits() {
        let payer = PayerData {
            client_id: ClientId::new(),
            tax_id: "12.345.678/0001-99".to_string(),
            legal_name: "Cliente".to_string(),
            address: PayerAddress::default(),
        };
        assert_eq!(payer.tax_id_digits(), "12345678000199");
    }
}
