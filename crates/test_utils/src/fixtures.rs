//! Pre-built Test Fixtures
//!
//! Ready-to-use data for configurations, titles and payers. Values are fixed
//! so encoded records can be compared column by column.

use chrono::NaiveDate;
use core_kernel::{ClientId, ConfigurationId, InstallmentId, Money, OperationMetadata};
use domain_remittance::{
    BilletConfiguration, InstallmentData, NewBilletConfiguration, PayerAddress, PayerData,
};
use rust_decimal_macros::dec;
use uuid::Uuid;

/// Bank contract fixtures
pub struct ConfigurationFixtures;

impl ConfigurationFixtures {
    /// A Bradesco contract with a daily discount and no fine
    pub fn bradesco_request() -> NewBilletConfiguration {
        Self::request("237")
    }

    /// A Sicoob contract with the same terms
    pub fn sicoob_request() -> NewBilletConfiguration {
        Self::request("756")
    }

    /// A wallet the layout of `bank_code` accepts
    pub fn wallet(bank_code: &str) -> &'static str {
        match bank_code {
            "756" => "01",
            _ => "109",
        }
    }

    pub fn request(bank_code: &str) -> NewBilletConfiguration {
        NewBilletConfiguration {
            company_code: "4567".to_string(),
            company_name: "Acme Cobrancas Ltda".to_string(),
            company_tax_id: "12345678000199".to_string(),
            wallet_number: Self::wallet(bank_code).to_string(),
            agency_number: "00001".to_string(),
            account_number: "0000001".to_string(),
            account_digit: "0".to_string(),
            bank_code: bank_code.to_string(),
            has_fine: false,
            fine_percentage: None,
            daily_discount: dec!(12.50),
            daily_interest: dec!(0),
            discount_limit_date: None,
            discount_amount: dec!(0),
            rebate_amount: dec!(0),
            first_message: "Nao receber".to_string(),
            second_message: "Apos o vencimento cobrar juros".to_string(),
            starting_sequential_number: 1,
            starting_our_number: 1,
        }
    }

    /// A validated configuration for `bank_code`
    pub fn configuration(bank_code: &str) -> BilletConfiguration {
        BilletConfiguration::create(Self::request(bank_code), MetadataFixtures::ACTOR)
            .expect("fixture configuration is valid")
    }
}

/// Date fixtures around the reference business day
pub struct DateFixtures;

impl DateFixtures {
    /// Day the files are generated on (2025-03-01)
    pub fn business_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    pub fn issue_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 20).unwrap()
    }

    pub fn due_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }
}

/// Payer fixtures
pub struct PayerFixtures;

impl PayerFixtures {
    /// A company payer whose name and city carry accents
    pub fn company(client_id: ClientId) -> PayerData {
        PayerData {
            client_id,
            tax_id: "98.765.432/0001-10".to_string(),
            legal_name: "José da Conceição Comércio".to_string(),
            address: PayerAddress {
                street: "Avenida Paulista".to_string(),
                number: "1000".to_string(),
                city: "São Paulo".to_string(),
                state: "SP".to_string(),
                zip: "01310-100".to_string(),
            },
        }
    }

    /// An individual payer, identified by CPF
    pub fn individual(client_id: ClientId) -> PayerData {
        PayerData {
            client_id,
            tax_id: "123.456.789-09".to_string(),
            legal_name: "Maria Aparecida Silva".to_string(),
            address: PayerAddress {
                street: "Rua das Flores".to_string(),
                number: "12".to_string(),
                city: "Curitiba".to_string(),
                state: "PR".to_string(),
                zip: "80000-000".to_string(),
            },
        }
    }
}

/// Installment fixtures
pub struct InstallmentFixtures;

impl InstallmentFixtures {
    /// R$ 1000.00 due on [`DateFixtures::due_date`]
    pub fn thousand_reais(installment_id: InstallmentId) -> InstallmentData {
        InstallmentData {
            installment_id,
            amount: Some(Money::brl(dec!(1000.00))),
            due_date: Some(DateFixtures::due_date()),
            issue_date: Some(DateFixtures::issue_date()),
        }
    }

    /// An installment the invoicing side has not priced yet
    pub fn without_amount(installment_id: InstallmentId) -> InstallmentData {
        InstallmentData {
            amount: None,
            ..Self::thousand_reais(installment_id)
        }
    }
}

/// Deterministic identifiers for snapshot-style assertions
pub struct IdFixtures;

impl IdFixtures {
    pub fn configuration_id() -> ConfigurationId {
        ConfigurationId::from_uuid(Uuid::from_u128(0x0001))
    }

    pub fn installment_id(n: u128) -> InstallmentId {
        InstallmentId::from_uuid(Uuid::from_u128(0x1000 + n))
    }

    pub fn client_id(n: u128) -> ClientId {
        ClientId::from_uuid(Uuid::from_u128(0x2000 + n))
    }
}

/// Operation metadata fixtures
pub struct MetadataFixtures;

impl MetadataFixtures {
    pub const ACTOR: &'static str = "operator";

    pub fn operator() -> OperationMetadata {
        OperationMetadata::with_correlation_id("test").initiated_by(Self::ACTOR)
    }
}
