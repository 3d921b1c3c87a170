//! Sequence allocation
//!
//! Two counters live on each configuration: the "our number" handed to every
//! billet once, and the file sequence written in every remittance header.
//! Both are advanced through [`SequencePort`], whose adapter serializes
//! concurrent allocations for the same configuration.

use std::sync::Arc;

use tracing::debug;

use core_kernel::{BilletId, ConfigurationId, OperationMetadata};

use crate::error::RemittanceError;
use crate::ports::SequencePort;
use crate::remittance::Remittance;

/// Allocates counters for file generation
#[derive(Clone)]
pub struct SequenceAllocator {
    port: Arc<dyn SequencePort>,
}

impl SequenceAllocator {
    pub fn new(port: Arc<dyn SequencePort>) -> Self {
        Self { port }
    }

    /// Numbers every member that has no "our number" yet, in member order
    ///
    /// Members numbered by an earlier generation keep their number. Returns
    /// the ids of the billets numbered now.
    pub async fn number_members(
        &self,
        remittance: &mut Remittance,
        metadata: &OperationMetadata,
    ) -> Result<Vec<BilletId>, RemittanceError> {
        let pending = remittance.unnumbered_count();
        if pending == 0 {
            return Ok(Vec::new());
        }
        let configuration_id = remittance
            .configuration_id()
            .ok_or(RemittanceError::EmptyRemittance(remittance.id()))?;
        let count = u32::try_from(pending)
            .map_err(|_| RemittanceError::validation("billets", "too many billets to number"))?;

        let numbers = self
            .port
            .next_our_numbers(configuration_id, count, Some(metadata.clone()))
            .await?;
        let numbered = remittance.assign_our_numbers(&numbers, metadata.actor())?;
        debug!(
            remittance_id = %remittance.id(),
            first = numbers.first().copied().unwrap_or_default(),
            count,
            "our numbers allocated"
        );
        Ok(numbered)
    }

    /// Takes the configuration's next file sequence
    pub async fn next_file_sequence(
        &self,
        configuration_id: ConfigurationId,
        metadata: &OperationMetadata,
    ) -> Result<u32, RemittanceError> {
        Ok(self
            .port
            .next_file_sequence(configuration_id, Some(metadata.clone()))
            .await?)
    }
}

impl std::fmt::Debug for SequenceAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceAllocator").finish_non_exhaustive()
    }
}
