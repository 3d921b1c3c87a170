//! Billets (collection titles)
//!
//! A billet ties one invoice installment to one configuration and one
//! client. It is created unbatched, joins exactly one remittance, receives
//! its "our number" when the remittance file is generated and is immutable
//! afterwards except for its remittance link.

use serde::{Deserialize, Serialize};

use core_kernel::{AuditStamp, BilletId, ClientId, ConfigurationId, InstallmentId, RemittanceId};

use crate::bank::Bank;
use crate::configuration::{BilletConfiguration, MAX_OUR_NUMBER};
use crate::error::{ConflictAttribute, RemittanceError};

/// Request for creating a billet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBillet {
    pub installment_id: InstallmentId,
    pub configuration_id: ConfigurationId,
    pub client_id: ClientId,
    /// Defaults to the configuration's bank
    #[serde(default)]
    pub bank: Option<Bank>,
}

/// One payable collection title
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Billet {
    pub id: BilletId,
    pub installment_id: InstallmentId,
    pub configuration_id: ConfigurationId,
    pub client_id: ClientId,
    pub remittance_id: Option<RemittanceId>,
    pub bank: Bank,
    /// Zero until allocated
    pub our_number: u64,
    pub audit: AuditStamp,
}

impl Billet {
    /// Creates an unbatched billet under `configuration`
    ///
    /// # Errors
    ///
    /// Returns `RemittanceError::Validation` if the request names another
    /// configuration or a bank other than the configuration's.
    pub fn new(
        request: NewBillet,
        configuration: &BilletConfiguration,
        actor: &str,
    ) -> Result<Self, RemittanceError> {
        if request.configuration_id != configuration.id {
            return Err(RemittanceError::validation(
                "configuration_id",
                format!(
                    "expected {}, got {}",
                    configuration.id, request.configuration_id
                ),
            ));
        }

        let bank = request.bank.unwrap_or(configuration.bank);
        if bank != configuration.bank {
            return Err(RemittanceError::validation(
                "bank",
                format!(
                    "billet bank {} does not match configuration bank {}",
                    bank, configuration.bank
                ),
            ));
        }

        Ok(Self {
            id: BilletId::new_v7(),
            installment_id: request.installment_id,
            configuration_id: configuration.id,
            client_id: request.client_id,
            remittance_id: None,
            bank,
            our_number: 0,
            audit: AuditStamp::created_by(actor),
        })
    }

    pub fn has_our_number(&self) -> bool {
        self.our_number != 0
    }

    pub fn is_batched(&self) -> bool {
        self.remittance_id.is_some()
    }

    /// Records the allocated "our number"; a billet is numbered only once
    pub fn assign_our_number(&mut self, number: u64, actor: &str) -> Result<(), RemittanceError> {
        if self.has_our_number() {
            return Err(RemittanceError::validation(
                "our_number",
                format!("billet {} already numbered {}", self.id, self.our_number),
            ));
        }
        if number == 0 || number > MAX_OUR_NUMBER {
            return Err(RemittanceError::validation(
                "our_number",
                format!("{number} is outside 1..={MAX_OUR_NUMBER}"),
            ));
        }
        self.our_number = number;
        self.audit.touch(actor);
        Ok(())
    }

    /// Links the billet to a remittance
    ///
    /// Re-linking to the same remittance is a no-op.
    pub fn link_to(&mut self, remittance_id: RemittanceId, actor: &str) -> Result<(), RemittanceError> {
        match self.remittance_id {
            Some(current) if current == remittance_id => Ok(()),
            Some(current) => Err(RemittanceError::conflict(
                ConflictAttribute::Remittance,
                current,
                remittance_id,
            )),
            None => {
                self.remittance_id = Some(remittance_id);
                self.audit.touch(actor);
                Ok(())
            }
        }
    }

    pub fn unlink(&mut self, actor: &str) {
        if self.remittance_id.take().is_some() {
            self.audit.touch(actor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::NewBilletConfiguration;
    use rust_decimal_macros::dec;

    fn configuration(bank_code: &str) -> BilletConfiguration {
        BilletConfiguration::create(
            NewBilletConfiguration {
                company_code: "4567".to_string(),
                company_name: "Acme".to_string(),
                company_tax_id: "12345678000199".to_string(),
                wallet_number: if bank_code == "756" { "01" } else { "109" }.to_string(),
                agency_number: "00001".to_string(),
                account_number: "0000001".to_string(),
                account_digit: "0".to_string(),
                bank_code: bank_code.to_string(),
                has_fine: false,
                fine_percentage: None,
                daily_discount: dec!(0),
                daily_interest: dec!(0),
                discount_limit_date: None,
                discount_amount: dec!(0),
                rebate_amount: dec!(0),
                first_message: String::new(),
                second_message: String::new(),
                starting_sequential_number: 1,
                starting_our_number: 1,
            },
            "tester",
        )
        .unwrap()
    }

    fn request(config: &BilletConfiguration, bank: Option<Bank>) -> NewBillet {
        NewBillet {
            installment_id: InstallmentId::new(),
            configuration_id: config.id,
            client_id: ClientId::new(),
            bank,
        }
    }

    #[test]
    fn test_bank_defaults_to_configuration_bank() {
        let config = configuration("756");
        let billet = Billet::new(request(&config, None), &config, "tester").unwrap();
        assert_eq!(billet.bank, Bank::Sicoob);
        assert!(!billet.is_batched());
        assert!(!billet.has_our_number());
    }

    #[test]
    fn test_bank_must_match_configuration() {
        let config = configuration("237");
        let err = Billet::new(request(&config, Some(Bank::Sicoob)), &config, "tester").unwrap_err();
        assert_eq!(err.code(), "validation_error");
    }

    #[test]
    fn test_our_number_is_assigned_once() {
        let config = configuration("237");
        let mut billet = Billet::new(request(&config, None), &config, "tester").unwrap();
        billet.assign_our_number(7, "tester").unwrap();
        assert_eq!(billet.our_number, 7);
        assert!(billet.assign_our_number(8, "tester").is_err());
        assert_eq!(billet.our_number, 7);
    }

    #[test]
    fn test_link_to_other_remittance_conflicts() {
        let config = configuration("237");
        let mut billet = Billet::new(request(&config, None), &config, "tester").unwrap();
        let first = RemittanceId::new();
        billet.link_to(first, "tester").unwrap();
        billet.link_to(first, "tester").unwrap();

        let err = billet.link_to(RemittanceId::new(), "tester").unwrap_err();
        assert!(matches!(
            err,
            RemittanceError::BatchConflict { attribute: ConflictAttribute::Remittance, .. }
        ));

        billet.unlink("tester");
        assert!(!billet.is_batched());
    }
}
