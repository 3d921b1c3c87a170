//! Remittance application service
//!
//! The command surface used by the API: configuration, billet and remittance
//! management plus file generation. Each command loads what it needs through
//! the ports, lets the aggregates validate, and writes the result back. A
//! failed command leaves stored state as it was, with one exception noted on
//! [`RemittanceService::generate_file_with_cancellation`].

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, instrument};

use core_kernel::{
    BilletId, ConfigurationId, HealthCheckResult, OperationMetadata, RemittanceId, Timezone,
};

use crate::billet::{Billet, NewBillet};
use crate::cnab::{CodecRegistry, RemittanceFile};
use crate::collaborators::{EncodableTitle, TitleData};
use crate::configuration::{BilletConfiguration, ConfigurationChanges, NewBilletConfiguration};
use crate::error::RemittanceError;
use crate::ports::{
    BilletPort, BilletQuery, ConfigurationPort, InstallmentPort, PageQuery, PayerPort,
    RemittancePort, SequencePort, StoredFile,
};
use crate::remittance::Remittance;
use crate::sequence::SequenceAllocator;

/// Service-level settings
#[derive(Debug, Clone, Default)]
pub struct ServiceSettings {
    /// Calendar used for the file generation date
    pub timezone: Timezone,
    /// Overrides today's date; used by tests and replays
    pub business_date: Option<NaiveDate>,
}

impl ServiceSettings {
    pub fn with_timezone(timezone: Timezone) -> Self {
        Self {
            timezone,
            business_date: None,
        }
    }

    /// Date written in headers and file names
    pub fn business_date(&self) -> NaiveDate {
        self.business_date.unwrap_or_else(|| self.timezone.today())
    }
}

/// Adapters the service runs against
#[derive(Clone)]
pub struct RemittancePorts {
    pub configurations: Arc<dyn ConfigurationPort>,
    pub billets: Arc<dyn BilletPort>,
    pub remittances: Arc<dyn RemittancePort>,
    pub sequences: Arc<dyn SequencePort>,
    pub installments: Arc<dyn InstallmentPort>,
    pub payers: Arc<dyn PayerPort>,
}

impl RemittancePorts {
    /// Every port backed by one in-memory store
    #[cfg(any(test, feature = "mock"))]
    pub fn in_memory(store: crate::ports::mock::InMemoryStore) -> Self {
        let store = Arc::new(store);
        Self {
            configurations: store.clone(),
            billets: store.clone(),
            remittances: store.clone(),
            sequences: store.clone(),
            installments: store.clone(),
            payers: store,
        }
    }
}

/// Remittance use cases
#[derive(Clone)]
pub struct RemittanceService {
    ports: RemittancePorts,
    codecs: CodecRegistry,
    allocator: SequenceAllocator,
    settings: ServiceSettings,
}

impl RemittanceService {
    /// Creates a service with the default codec registry
    pub fn new(ports: RemittancePorts, settings: ServiceSettings) -> Self {
        Self::with_codecs(ports, CodecRegistry::with_defaults(), settings)
    }

    pub fn with_codecs(ports: RemittancePorts, codecs: CodecRegistry, settings: ServiceSettings) -> Self {
        let allocator = SequenceAllocator::new(ports.sequences.clone());
        Self {
            ports,
            codecs,
            allocator,
            settings,
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    /// Health of every adapter
    pub async fn health(&self) -> Vec<HealthCheckResult> {
        vec![
            self.ports.configurations.health_check().await,
            self.ports.billets.health_check().await,
            self.ports.remittances.health_check().await,
            self.ports.sequences.health_check().await,
            self.ports.installments.health_check().await,
            self.ports.payers.health_check().await,
        ]
    }

    // ------------------------------------------------------------------
    // Configurations
    // ------------------------------------------------------------------

    #[instrument(skip(self, request, metadata), fields(actor = metadata.actor()))]
    pub async fn create_configuration(
        &self,
        request: NewBilletConfiguration,
        metadata: &OperationMetadata,
    ) -> Result<BilletConfiguration, RemittanceError> {
        let configuration = BilletConfiguration::create(request, metadata.actor())?;
        self.ports
            .configurations
            .save_configuration(&configuration, Some(metadata.clone()))
            .await?;
        info!(configuration_id = %configuration.id, bank = %configuration.bank, "configuration created");
        Ok(configuration)
    }

    pub async fn get_configuration(
        &self,
        id: ConfigurationId,
        metadata: &OperationMetadata,
    ) -> Result<BilletConfiguration, RemittanceError> {
        Ok(self
            .ports
            .configurations
            .get_configuration(id, Some(metadata.clone()))
            .await?)
    }

    pub async fn list_configurations(
        &self,
        page: PageQuery,
        metadata: &OperationMetadata,
    ) -> Result<Vec<BilletConfiguration>, RemittanceError> {
        Ok(self
            .ports
            .configurations
            .list_configurations(page, Some(metadata.clone()))
            .await?)
    }

    #[instrument(skip(self, changes, metadata), fields(configuration_id = %id))]
    pub async fn update_configuration(
        &self,
        id: ConfigurationId,
        changes: ConfigurationChanges,
        metadata: &OperationMetadata,
    ) -> Result<BilletConfiguration, RemittanceError> {
        let mut configuration = self.get_configuration(id, metadata).await?;
        configuration.update(changes, metadata.actor())?;
        self.ports
            .configurations
            .save_configuration(&configuration, Some(metadata.clone()))
            .await?;
        Ok(configuration)
    }

    /// Deletes a configuration no billet refers to
    #[instrument(skip(self, metadata), fields(configuration_id = %id))]
    pub async fn delete_configuration(
        &self,
        id: ConfigurationId,
        metadata: &OperationMetadata,
    ) -> Result<(), RemittanceError> {
        let billets = self
            .ports
            .billets
            .count_billets_for_configuration(id, Some(metadata.clone()))
            .await?;
        if billets > 0 {
            return Err(RemittanceError::validation(
                "configuration_id",
                format!("configuration {id} is referenced by {billets} billets"),
            ));
        }
        self.ports
            .configurations
            .delete_configuration(id, Some(metadata.clone()))
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Billets
    // ------------------------------------------------------------------

    #[instrument(skip(self, request, metadata), fields(configuration_id = %request.configuration_id))]
    pub async fn create_billet(
        &self,
        request: NewBillet,
        metadata: &OperationMetadata,
    ) -> Result<Billet, RemittanceError> {
        let configuration = self.get_configuration(request.configuration_id, metadata).await?;
        let billet = Billet::new(request, &configuration, metadata.actor())?;
        self.ports
            .billets
            .save_billet(&billet, Some(metadata.clone()))
            .await?;
        Ok(billet)
    }

    pub async fn get_billet(
        &self,
        id: BilletId,
        metadata: &OperationMetadata,
    ) -> Result<Billet, RemittanceError> {
        Ok(self.ports.billets.get_billet(id, Some(metadata.clone())).await?)
    }

    pub async fn list_billets(
        &self,
        query: BilletQuery,
        metadata: &OperationMetadata,
    ) -> Result<Vec<Billet>, RemittanceError> {
        Ok(self
            .ports
            .billets
            .list_billets(query, Some(metadata.clone()))
            .await?)
    }

    /// Deletes an unbatched billet
    #[instrument(skip(self, metadata), fields(billet_id = %id))]
    pub async fn delete_billet(
        &self,
        id: BilletId,
        metadata: &OperationMetadata,
    ) -> Result<(), RemittanceError> {
        let billet = self.get_billet(id, metadata).await?;
        if let Some(remittance_id) = billet.remittance_id {
            return Err(RemittanceError::validation(
                "billet_id",
                format!("billet {id} belongs to remittance {remittance_id}"),
            ));
        }
        self.ports
            .billets
            .delete_billet(id, Some(metadata.clone()))
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Remittances
    // ------------------------------------------------------------------

    pub async fn create_remittance(
        &self,
        metadata: &OperationMetadata,
    ) -> Result<Remittance, RemittanceError> {
        let remittance = Remittance::new(metadata.actor());
        self.ports
            .remittances
            .save_remittance(&remittance, Some(metadata.clone()))
            .await?;
        Ok(remittance)
    }

    pub async fn get_remittance(
        &self,
        id: RemittanceId,
        metadata: &OperationMetadata,
    ) -> Result<Remittance, RemittanceError> {
        Ok(self
            .ports
            .remittances
            .get_remittance(id, Some(metadata.clone()))
            .await?)
    }

    pub async fn list_remittances(
        &self,
        page: PageQuery,
        metadata: &OperationMetadata,
    ) -> Result<Vec<Remittance>, RemittanceError> {
        Ok(self
            .ports
            .remittances
            .list_remittances(page, Some(metadata.clone()))
            .await?)
    }

    /// Deletes an unsubmitted remittance, releasing its billets
    #[instrument(skip(self, metadata), fields(remittance_id = %id))]
    pub async fn delete_remittance(
        &self,
        id: RemittanceId,
        metadata: &OperationMetadata,
    ) -> Result<(), RemittanceError> {
        let mut remittance = self.get_remittance(id, metadata).await?;
        remittance.release_billets(metadata.actor())?;
        self.ports
            .remittances
            .delete_remittance(id, Some(metadata.clone()))
            .await?;
        Ok(())
    }

    /// Adds billets all-or-nothing
    #[instrument(skip(self, billet_ids, metadata), fields(remittance_id = %id, count = billet_ids.len()))]
    pub async fn add_billets(
        &self,
        id: RemittanceId,
        billet_ids: &[BilletId],
        metadata: &OperationMetadata,
    ) -> Result<Remittance, RemittanceError> {
        let mut remittance = self.get_remittance(id, metadata).await?;
        let billets = self
            .ports
            .billets
            .get_billets(billet_ids, Some(metadata.clone()))
            .await?;
        let added = remittance.add_billets(billets, metadata.actor())?;
        if added > 0 {
            self.ports
                .remittances
                .save_remittance(&remittance, Some(metadata.clone()))
                .await?;
        }
        Ok(remittance)
    }

    pub async fn add_billet(
        &self,
        id: RemittanceId,
        billet_id: BilletId,
        metadata: &OperationMetadata,
    ) -> Result<Remittance, RemittanceError> {
        self.add_billets(id, &[billet_id], metadata).await
    }

    #[instrument(skip(self, metadata), fields(remittance_id = %id, billet_id = %billet_id))]
    pub async fn remove_billet(
        &self,
        id: RemittanceId,
        billet_id: BilletId,
        metadata: &OperationMetadata,
    ) -> Result<Remittance, RemittanceError> {
        let mut remittance = self.get_remittance(id, metadata).await?;
        if remittance.remove_billet(billet_id, metadata.actor())?.is_some() {
            self.ports
                .remittances
                .save_remittance(&remittance, Some(metadata.clone()))
                .await?;
        }
        Ok(remittance)
    }

    #[instrument(skip(self, metadata), fields(remittance_id = %id))]
    pub async fn submit_remittance(
        &self,
        id: RemittanceId,
        metadata: &OperationMetadata,
    ) -> Result<Remittance, RemittanceError> {
        let mut remittance = self.get_remittance(id, metadata).await?;
        remittance.mark_as_submitted(metadata.actor())?;
        self.ports
            .remittances
            .save_remittance(&remittance, Some(metadata.clone()))
            .await?;
        info!(remittance_id = %id, billets = remittance.len(), "remittance submitted");
        Ok(remittance)
    }

    // ------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------

    /// Generates and stores the remittance file
    pub async fn generate_file(
        &self,
        id: RemittanceId,
        metadata: &OperationMetadata,
    ) -> Result<RemittanceFile, RemittanceError> {
        self.generate_file_with_cancellation(id, &AtomicBool::new(false), metadata)
            .await
    }

    /// Generates and stores the remittance file, stopping between detail
    /// records once `cancel` is set
    ///
    /// Missing installment or payer data aborts before any counter moves.
    /// Once encoding starts, "our numbers" are already allocated and stay
    /// with their billets even if the file is cancelled. The file sequence
    /// is taken only after every detail record is built, so a cancelled or
    /// malformed file does not consume one.
    #[instrument(skip(self, cancel, metadata), fields(remittance_id = %id))]
    pub async fn generate_file_with_cancellation(
        &self,
        id: RemittanceId,
        cancel: &AtomicBool,
        metadata: &OperationMetadata,
    ) -> Result<RemittanceFile, RemittanceError> {
        let mut remittance = self.get_remittance(id, metadata).await?;
        let (Some(bank), Some(configuration_id)) = (remittance.bank(), remittance.configuration_id()) else {
            return Err(RemittanceError::EmptyRemittance(id));
        };
        if remittance.is_empty() {
            return Err(RemittanceError::EmptyRemittance(id));
        }

        let codec = self.codecs.codec_for(bank)?;
        let configuration = self.get_configuration(configuration_id, metadata).await?;

        let titles = self.resolve_titles(&remittance, metadata).await?;

        let numbered = self.allocator.number_members(&mut remittance, metadata).await?;
        if !numbered.is_empty() {
            self.ports
                .remittances
                .save_remittance(&remittance, Some(metadata.clone()))
                .await?;
        }
        let numbers: HashMap<BilletId, u64> = remittance
            .billets()
            .iter()
            .map(|b| (b.id, b.our_number))
            .collect();
        let titles: Vec<EncodableTitle> = titles
            .into_iter()
            .map(|mut title| {
                title.our_number = numbers.get(&title.billet_id).copied().unwrap_or(title.our_number);
                title
            })
            .collect();

        let details = codec.detail_records(&configuration, &titles, cancel)?;
        let file_sequence = self
            .allocator
            .next_file_sequence(configuration_id, metadata)
            .await?;
        let file = codec.finish_file(
            &configuration,
            details,
            file_sequence,
            self.settings.business_date(),
        )?;

        self.ports
            .remittances
            .store_file(
                id,
                StoredFile {
                    file_name: file.file_name.clone(),
                    bytes: file.bytes.clone(),
                },
                Some(metadata.clone()),
            )
            .await?;
        remittance.record_file(file.file_name.clone(), metadata.actor());
        self.ports
            .remittances
            .save_remittance(&remittance, Some(metadata.clone()))
            .await?;

        info!(
            remittance_id = %id,
            file_name = %file.file_name,
            file_sequence,
            lines = file.line_count,
            "remittance file generated"
        );
        Ok(file)
    }

    /// Returns the last generated file
    pub async fn download_file(
        &self,
        id: RemittanceId,
        metadata: &OperationMetadata,
    ) -> Result<StoredFile, RemittanceError> {
        self.ports
            .remittances
            .load_file(id, Some(metadata.clone()))
            .await?
            .ok_or_else(|| RemittanceError::not_found("RemittanceFile", id))
    }

    /// Joins every member with its installment and payer, in member order
    async fn resolve_titles(
        &self,
        remittance: &Remittance,
        metadata: &OperationMetadata,
    ) -> Result<Vec<EncodableTitle>, RemittanceError> {
        let installment_ids: Vec<_> = remittance.billets().iter().map(|b| b.installment_id).collect();
        let client_ids: Vec<_> = remittance.billets().iter().map(|b| b.client_id).collect();

        let installments: HashMap<_, _> = self
            .ports
            .installments
            .get_installments(&installment_ids, Some(metadata.clone()))
            .await?
            .into_iter()
            .map(|i| (i.installment_id, i))
            .collect();
        let payers: HashMap<_, _> = self
            .ports
            .payers
            .get_payers(&client_ids, Some(metadata.clone()))
            .await?
            .into_iter()
            .map(|p| (p.client_id, p))
            .collect();

        remittance
            .billets()
            .iter()
            .map(|billet| {
                TitleData::new(
                    billet,
                    installments.get(&billet.installment_id),
                    payers.get(&billet.client_id),
                )
                .resolve()
            })
            .collect()
    }
}

impl std::fmt::Debug for RemittanceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemittanceService")
            .field("codecs", &self.codecs)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
