//! Remittance Domain Ports
//!
//! The application service reaches storage and the neighbouring subsystems
//! only through these traits:
//!
//! - **Owned data**: configurations, billets, remittances and generated
//!   files ([`ConfigurationPort`], [`BilletPort`], [`RemittancePort`])
//! - **Counters**: per-configuration "our number" and file sequence
//!   ([`SequencePort`]); allocation must be serialized per configuration by
//!   the adapter
//! - **Collaborators**: installment amounts/dates and payer identification,
//!   read-only ([`InstallmentPort`], [`PayerPort`])
//!
//! The PostgreSQL adapters live in `infra_db`; the in-memory [`mock`]
//! adapter backs unit tests and demos.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use core_kernel::{
    BilletId, ClientId, ConfigurationId, DomainPort, HealthCheckable, InstallmentId,
    OperationMetadata, PortError, RemittanceId,
};

use crate::billet::Billet;
use crate::collaborators::{InstallmentData, PayerData};
use crate::configuration::BilletConfiguration;
use crate::remittance::Remittance;

/// Pagination for list operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageQuery {
    pub limit: u32,
    pub offset: u32,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self { limit: 50, offset: 0 }
    }
}

/// Filters for listing billets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BilletQuery {
    pub configuration_id: Option<ConfigurationId>,
    pub remittance_id: Option<RemittanceId>,
    /// Only billets not linked to any remittance
    pub unbatched: bool,
    pub page: PageQuery,
}

impl BilletQuery {
    pub fn matches(&self, billet: &Billet) -> bool {
        if let Some(configuration_id) = self.configuration_id {
            if billet.configuration_id != configuration_id {
                return false;
            }
        }
        if let Some(remittance_id) = self.remittance_id {
            if billet.remittance_id != Some(remittance_id) {
                return false;
            }
        }
        !(self.unbatched && billet.is_batched())
    }
}

/// A generated file as stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait ConfigurationPort: DomainPort + HealthCheckable {
    /// Returns `PortError::NotFound` when absent
    async fn get_configuration(
        &self,
        id: ConfigurationId,
        metadata: Option<OperationMetadata>,
    ) -> Result<BilletConfiguration, PortError>;

    async fn list_configurations(
        &self,
        page: PageQuery,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<BilletConfiguration>, PortError>;

    /// Inserts or replaces the configuration; stored counters never move
    /// backwards
    async fn save_configuration(
        &self,
        configuration: &BilletConfiguration,
        metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError>;

    async fn delete_configuration(
        &self,
        id: ConfigurationId,
        metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError>;
}

#[async_trait]
pub trait BilletPort: DomainPort + HealthCheckable {
    async fn get_billet(
        &self,
        id: BilletId,
        metadata: Option<OperationMetadata>,
    ) -> Result<Billet, PortError>;

    /// Returns the billets in the order of `ids`; any missing id is
    /// `PortError::NotFound`
    async fn get_billets(
        &self,
        ids: &[BilletId],
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Billet>, PortError>;

    async fn list_billets(
        &self,
        query: BilletQuery,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Billet>, PortError>;

    /// Number of billets issued under a configuration
    async fn count_billets_for_configuration(
        &self,
        configuration_id: ConfigurationId,
        metadata: Option<OperationMetadata>,
    ) -> Result<u64, PortError>;

    /// Inserts or replaces the billet
    async fn save_billet(
        &self,
        billet: &Billet,
        metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError>;

    async fn delete_billet(
        &self,
        id: BilletId,
        metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError>;
}

#[async_trait]
pub trait RemittancePort: DomainPort + HealthCheckable {
    /// Loads the remittance with its members
    async fn get_remittance(
        &self,
        id: RemittanceId,
        metadata: Option<OperationMetadata>,
    ) -> Result<Remittance, PortError>;

    async fn list_remittances(
        &self,
        page: PageQuery,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Remittance>, PortError>;

    /// Stores the remittance and its membership in one unit: members are
    /// written with their link, position and "our number", former members
    /// that are no longer listed are unlinked
    ///
    /// A member already linked to another remittance, or already holding a
    /// different "our number" than the one being written, means the
    /// remittance was loaded before a concurrent change; the whole save is
    /// refused with `PortError::Conflict`.
    async fn save_remittance(
        &self,
        remittance: &Remittance,
        metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError>;

    /// Deletes the remittance, its stored file and every member link
    async fn delete_remittance(
        &self,
        id: RemittanceId,
        metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError>;

    /// Replaces the generated file of a remittance
    async fn store_file(
        &self,
        id: RemittanceId,
        file: StoredFile,
        metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError>;

    async fn load_file(
        &self,
        id: RemittanceId,
        metadata: Option<OperationMetadata>,
    ) -> Result<Option<StoredFile>, PortError>;
}

/// Per-configuration counters
#[async_trait]
pub trait SequencePort: DomainPort + HealthCheckable {
    /// Hands out `count` consecutive "our numbers" and advances the counter
    /// past them
    async fn next_our_numbers(
        &self,
        configuration_id: ConfigurationId,
        count: u32,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<u64>, PortError>;

    /// Hands out the next file sequence and advances the counter
    async fn next_file_sequence(
        &self,
        configuration_id: ConfigurationId,
        metadata: Option<OperationMetadata>,
    ) -> Result<u32, PortError>;
}

/// Read access to invoice installments
#[async_trait]
pub trait InstallmentPort: DomainPort + HealthCheckable {
    /// Unknown ids are left out of the result
    async fn get_installments(
        &self,
        ids: &[InstallmentId],
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<InstallmentData>, PortError>;
}

/// Read access to client identification and address
#[async_trait]
pub trait PayerPort: DomainPort + HealthCheckable {
    /// Unknown ids are left out of the result
    async fn get_payers(
        &self,
        ids: &[ClientId],
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<PayerData>, PortError>;
}

/// In-memory adapter for every remittance port
///
/// One shared store keeps billets, remittances and counters consistent with
/// each other the way a single database would.
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use core_kernel::HealthCheckResult;

    use crate::configuration::{MAX_FILE_SEQUENCE, MAX_OUR_NUMBER};
    use crate::remittance::RemittanceHeader;

    #[derive(Debug, Default)]
    struct State {
        configurations: BTreeMap<ConfigurationId, BilletConfiguration>,
        billets: BTreeMap<BilletId, Billet>,
        remittances: BTreeMap<RemittanceId, RemittanceHeader>,
        /// Member order within its remittance
        positions: HashMap<BilletId, usize>,
        files: HashMap<RemittanceId, StoredFile>,
        installments: HashMap<InstallmentId, InstallmentData>,
        payers: HashMap<ClientId, PayerData>,
    }

    impl State {
        fn assemble(&self, header: &RemittanceHeader) -> Remittance {
            let mut members: Vec<Billet> = self
                .billets
                .values()
                .filter(|b| b.remittance_id == Some(header.id))
                .cloned()
                .collect();
            members.sort_by_key(|b| self.positions.get(&b.id).copied().unwrap_or(usize::MAX));
            Remittance::restore(header.clone(), members)
        }
    }

    /// In-memory store for configurations, billets, remittances, counters
    /// and collaborator snapshots
    #[derive(Debug, Default, Clone)]
    pub struct InMemoryStore {
        state: Arc<RwLock<State>>,
    }

    fn page<T>(items: impl Iterator<Item = T>, page: PageQuery) -> Vec<T> {
        items
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect()
    }

    impl InMemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Seeds installment snapshots
        pub async fn insert_installments(&self, installments: impl IntoIterator<Item = InstallmentData>) {
            let mut state = self.state.write().await;
            for installment in installments {
                state.installments.insert(installment.installment_id, installment);
            }
        }

        /// Seeds payer snapshots
        pub async fn insert_payers(&self, payers: impl IntoIterator<Item = PayerData>) {
            let mut state = self.state.write().await;
            for payer in payers {
                state.payers.insert(payer.client_id, payer);
            }
        }
    }

    impl DomainPort for InMemoryStore {}

    #[async_trait]
    impl HealthCheckable for InMemoryStore {
        async fn health_check(&self) -> HealthCheckResult {
            let mut result = HealthCheckResult::healthy("in-memory-remittance-store");
            result.message = Some("Mock adapter always healthy".to_string());
            result
        }
    }

    #[async_trait]
    impl ConfigurationPort for InMemoryStore {
        async fn get_configuration(
            &self,
            id: ConfigurationId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<BilletConfiguration, PortError> {
            self.state
                .read()
                .await
                .configurations
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("BilletConfiguration", id))
        }

        async fn list_configurations(
            &self,
            query: PageQuery,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<BilletConfiguration>, PortError> {
            let state = self.state.read().await;
            Ok(page(state.configurations.values().cloned(), query))
        }

        async fn save_configuration(
            &self,
            configuration: &BilletConfiguration,
            _metadata: Option<OperationMetadata>,
        ) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            let mut configuration = configuration.clone();
            if let Some(stored) = state.configurations.get(&configuration.id) {
                configuration.next_file_sequence =
                    configuration.next_file_sequence.max(stored.next_file_sequence);
                configuration.next_our_number =
                    configuration.next_our_number.max(stored.next_our_number);
            }
            state.configurations.insert(configuration.id, configuration);
            Ok(())
        }

        async fn delete_configuration(
            &self,
            id: ConfigurationId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<(), PortError> {
            self.state
                .write()
                .await
                .configurations
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| PortError::not_found("BilletConfiguration", id))
        }
    }

    #[async_trait]
    impl BilletPort for InMemoryStore {
        async fn get_billet(
            &self,
            id: BilletId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Billet, PortError> {
            self.state
                .read()
                .await
                .billets
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Billet", id))
        }

        async fn get_billets(
            &self,
            ids: &[BilletId],
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<Billet>, PortError> {
            let state = self.state.read().await;
            ids.iter()
                .map(|id| {
                    state
                        .billets
                        .get(id)
                        .cloned()
                        .ok_or_else(|| PortError::not_found("Billet", id))
                })
                .collect()
        }

        async fn list_billets(
            &self,
            query: BilletQuery,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<Billet>, PortError> {
            let state = self.state.read().await;
            Ok(page(
                state.billets.values().filter(|b| query.matches(b)).cloned(),
                query.page,
            ))
        }

        async fn count_billets_for_configuration(
            &self,
            configuration_id: ConfigurationId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<u64, PortError> {
            let state = self.state.read().await;
            Ok(state
                .billets
                .values()
                .filter(|b| b.configuration_id == configuration_id)
                .count() as u64)
        }

        async fn save_billet(
            &self,
            billet: &Billet,
            _metadata: Option<OperationMetadata>,
        ) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            if !state.configurations.contains_key(&billet.configuration_id) {
                return Err(PortError::not_found("BilletConfiguration", billet.configuration_id));
            }
            state.billets.insert(billet.id, billet.clone());
            Ok(())
        }

        async fn delete_billet(
            &self,
            id: BilletId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<(), PortError> {
            self.state
                .write()
                .await
                .billets
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| PortError::not_found("Billet", id))
        }
    }

    #[async_trait]
    impl RemittancePort for InMemoryStore {
        async fn get_remittance(
            &self,
            id: RemittanceId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Remittance, PortError> {
            let state = self.state.read().await;
            state
                .remittances
                .get(&id)
                .map(|header| state.assemble(header))
                .ok_or_else(|| PortError::not_found("Remittance", id))
        }

        async fn list_remittances(
            &self,
            query: PageQuery,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<Remittance>, PortError> {
            let state = self.state.read().await;
            Ok(page(
                state.remittances.values().map(|h| state.assemble(h)),
                query,
            ))
        }

        async fn save_remittance(
            &self,
            remittance: &Remittance,
            _metadata: Option<OperationMetadata>,
        ) -> Result<(), PortError> {
            let mut guard = self.state.write().await;
            let state = &mut *guard;
            let id = remittance.id();

            for member in remittance.billets() {
                let stored = state
                    .billets
                    .get(&member.id)
                    .ok_or_else(|| PortError::not_found("Billet", member.id))?;
                if stored.remittance_id.is_some_and(|owner| owner != id) {
                    return Err(PortError::conflict(format!(
                        "billet {} is linked to another remittance",
                        member.id
                    )));
                }
                if stored.has_our_number() && stored.our_number != member.our_number {
                    return Err(PortError::conflict(format!(
                        "billet {} already holds our number {}",
                        member.id, stored.our_number
                    )));
                }
            }

            for billet in state.billets.values_mut() {
                if billet.remittance_id == Some(id) && !remittance.contains(billet.id) {
                    billet.remittance_id = None;
                    state.positions.remove(&billet.id);
                }
            }
            for (position, billet) in remittance.billets().iter().enumerate() {
                state.billets.insert(billet.id, billet.clone());
                state.positions.insert(billet.id, position);
            }
            state.remittances.insert(id, remittance.header());
            Ok(())
        }

        async fn delete_remittance(
            &self,
            id: RemittanceId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            state
                .remittances
                .remove(&id)
                .ok_or_else(|| PortError::not_found("Remittance", id))?;
            state.files.remove(&id);
            let state = &mut *state;
            for billet in state.billets.values_mut() {
                if billet.remittance_id == Some(id) {
                    billet.remittance_id = None;
                    state.positions.remove(&billet.id);
                }
            }
            Ok(())
        }

        async fn store_file(
            &self,
            id: RemittanceId,
            file: StoredFile,
            _metadata: Option<OperationMetadata>,
        ) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            if !state.remittances.contains_key(&id) {
                return Err(PortError::not_found("Remittance", id));
            }
            state.files.insert(id, file);
            Ok(())
        }

        async fn load_file(
            &self,
            id: RemittanceId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Option<StoredFile>, PortError> {
            Ok(self.state.read().await.files.get(&id).cloned())
        }
    }

    #[async_trait]
    impl SequencePort for InMemoryStore {
        async fn next_our_numbers(
            &self,
            configuration_id: ConfigurationId,
            count: u32,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<u64>, PortError> {
            let mut state = self.state.write().await;
            let configuration = state
                .configurations
                .get_mut(&configuration_id)
                .ok_or_else(|| PortError::not_found("BilletConfiguration", configuration_id))?;

            let first = configuration.next_our_number;
            let next = first + u64::from(count);
            if next - 1 > MAX_OUR_NUMBER {
                return Err(PortError::conflict("our number counter exhausted"));
            }
            configuration.next_our_number = next;
            Ok((first..next).collect())
        }

        async fn next_file_sequence(
            &self,
            configuration_id: ConfigurationId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<u32, PortError> {
            let mut state = self.state.write().await;
            let configuration = state
                .configurations
                .get_mut(&configuration_id)
                .ok_or_else(|| PortError::not_found("BilletConfiguration", configuration_id))?;

            let sequence = configuration.next_file_sequence;
            if sequence > MAX_FILE_SEQUENCE {
                return Err(PortError::conflict("file sequence counter exhausted"));
            }
            configuration.next_file_sequence = sequence + 1;
            Ok(sequence)
        }
    }

    #[async_trait]
    impl InstallmentPort for InMemoryStore {
        async fn get_installments(
            &self,
            ids: &[InstallmentId],
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<InstallmentData>, PortError> {
            let state = self.state.read().await;
            Ok(ids
                .iter()
                .filter_map(|id| state.installments.get(id).cloned())
                .collect())
        }
    }

    #[async_trait]
    impl PayerPort for InMemoryStore {
        async fn get_payers(
            &self,
            ids: &[ClientId],
            _metadata: Option<OperationMetadata>,
        ) -> Result<Vec<PayerData>, PortError> {
            let state = self.state.read().await;
            Ok(ids
                .iter()
                .filter_map(|id| state.payers.get(id).cloned())
                .collect())
        }
    }
}
