//! Test Data Builders
//!
//! Builders that start from the fixtures and let a test override only the
//! fields it cares about.

use chrono::NaiveDate;
use core_kernel::{BilletId, ClientId, InstallmentId, Money, RemittanceId};
use domain_remittance::ports::mock::InMemoryStore;
use domain_remittance::{
    Billet, BilletConfiguration, EncodableTitle, InstallmentData, NewBillet,
    NewBilletConfiguration, PayerData, RemittanceError, RemittancePorts, RemittanceService,
    ServiceSettings,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::fixtures::{
    ConfigurationFixtures, DateFixtures, InstallmentFixtures, MetadataFixtures, PayerFixtures,
};

/// Builder for billet configurations
pub struct ConfigurationBuilder {
    request: NewBilletConfiguration,
}

impl Default for ConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationBuilder {
    /// Bradesco contract from [`ConfigurationFixtures`]
    pub fn new() -> Self {
        Self {
            request: ConfigurationFixtures::bradesco_request(),
        }
    }

    /// Switches the bank, along with a wallet its layout accepts
    pub fn with_bank_code(mut self, bank_code: impl Into<String>) -> Self {
        let bank_code = bank_code.into();
        self.request.wallet_number = ConfigurationFixtures::wallet(&bank_code).to_string();
        self.request.bank_code = bank_code;
        self
    }

    pub fn with_company_name(mut self, name: impl Into<String>) -> Self {
        self.request.company_name = name.into();
        self
    }

    /// Enables the fine with the given percentage
    pub fn with_fine(mut self, percentage: Decimal) -> Self {
        self.request.has_fine = true;
        self.request.fine_percentage = Some(percentage);
        self
    }

    pub fn with_daily_discount(mut self, amount: Decimal) -> Self {
        self.request.daily_discount = amount;
        self
    }

    pub fn with_discount(mut self, amount: Decimal, limit: NaiveDate) -> Self {
        self.request.discount_amount = amount;
        self.request.discount_limit_date = Some(limit);
        self
    }

    pub fn with_first_message(mut self, message: impl Into<String>) -> Self {
        self.request.first_message = message.into();
        self
    }

    pub fn with_starting_sequence(mut self, sequence: u32) -> Self {
        self.request.starting_sequential_number = sequence;
        self
    }

    pub fn with_starting_our_number(mut self, our_number: u64) -> Self {
        self.request.starting_our_number = our_number;
        self
    }

    pub fn build_request(self) -> NewBilletConfiguration {
        self.request
    }

    /// Validates the request into a configuration
    pub fn build(self) -> Result<BilletConfiguration, RemittanceError> {
        BilletConfiguration::create(self.request, MetadataFixtures::ACTOR)
    }
}

/// Builder for titles handed straight to a codec
pub struct TitleBuilder {
    our_number: u64,
    amount: Money,
    due_date: NaiveDate,
    issue_date: NaiveDate,
    payer: PayerData,
}

impl Default for TitleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TitleBuilder {
    /// R$ 1000.00 charged to the fixture company payer
    pub fn new() -> Self {
        Self {
            our_number: 0,
            amount: Money::brl(dec!(1000.00)),
            due_date: DateFixtures::due_date(),
            issue_date: DateFixtures::issue_date(),
            payer: PayerFixtures::company(ClientId::new()),
        }
    }

    pub fn with_our_number(mut self, our_number: u64) -> Self {
        self.our_number = our_number;
        self
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = Money::brl(amount);
        self
    }

    pub fn with_due_date(mut self, date: NaiveDate) -> Self {
        self.due_date = date;
        self
    }

    pub fn with_payer(mut self, payer: PayerData) -> Self {
        self.payer = payer;
        self
    }

    pub fn build(self) -> EncodableTitle {
        EncodableTitle {
            billet_id: BilletId::new(),
            our_number: self.our_number,
            amount: self.amount,
            due_date: self.due_date,
            issue_date: self.issue_date,
            payer: self.payer,
        }
    }
}

/// A service over an in-memory store with helpers that seed the
/// collaborator data billets need
pub struct ServiceHarness {
    pub store: InMemoryStore,
    pub service: RemittanceService,
}

impl Default for ServiceHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceHarness {
    /// Files are dated [`DateFixtures::business_date`]
    pub fn new() -> Self {
        let store = InMemoryStore::new();
        let service = RemittanceService::new(
            RemittancePorts::in_memory(store.clone()),
            ServiceSettings {
                business_date: Some(DateFixtures::business_date()),
                ..Default::default()
            },
        );
        Self { store, service }
    }

    pub async fn configuration(
        &self,
        builder: ConfigurationBuilder,
    ) -> Result<BilletConfiguration, RemittanceError> {
        self.service
            .create_configuration(builder.build_request(), &MetadataFixtures::operator())
            .await
    }

    /// Seeds an installment and payer, then issues a billet for them
    pub async fn billet_with(
        &self,
        configuration: &BilletConfiguration,
        installment: InstallmentData,
        payer: PayerData,
    ) -> Result<Billet, RemittanceError> {
        let request = NewBillet {
            installment_id: installment.installment_id,
            configuration_id: configuration.id,
            client_id: payer.client_id,
            bank: None,
        };
        self.store.insert_installments([installment]).await;
        self.store.insert_payers([payer]).await;
        self.service
            .create_billet(request, &MetadataFixtures::operator())
            .await
    }

    /// A billet for a fresh R$ 1000.00 installment
    pub async fn billet(
        &self,
        configuration: &BilletConfiguration,
    ) -> Result<Billet, RemittanceError> {
        self.billet_with(
            configuration,
            InstallmentFixtures::thousand_reais(InstallmentId::new()),
            PayerFixtures::company(ClientId::new()),
        )
        .await
    }

    /// An open remittance holding `count` fresh billets of `configuration`
    pub async fn batch(
        &self,
        configuration: &BilletConfiguration,
        count: usize,
    ) -> Result<RemittanceId, RemittanceError> {
        let metadata = MetadataFixtures::operator();
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            ids.push(self.billet(configuration).await?.id);
        }
        let remittance = self.service.create_remittance(&metadata).await?;
        self.service
            .add_billets(remittance.id(), &ids, &metadata)
            .await?;
        Ok(remittance.id())
    }
}
