//! Remittance Aggregate Root
//!
//! A remittance is the batch of billets submitted to a bank in one file. It
//! is the consistency boundary for batch membership.
//!
//! # Invariants
//!
//! - Every member shares the batch's bank
//! - Every member shares the batch's configuration
//! - A multi-billet add is validated as a whole before anything changes
//! - Removing the last member clears bank and configuration
//! - Membership is a set keyed by billet id, kept in insertion order
//! - A submitted batch no longer changes membership

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::{AuditStamp, BilletId, ConfigurationId, RemittanceId};

use crate::bank::Bank;
use crate::billet::Billet;
use crate::error::{ConflictAttribute, RemittanceError};

/// Batch of billets destined for one bank submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Remittance {
    id: RemittanceId,
    bank: Option<Bank>,
    configuration_id: Option<ConfigurationId>,
    billets: Vec<Billet>,
    is_submitted: bool,
    file_name: Option<String>,
    audit: AuditStamp,
}

/// Stored scalar state of a remittance, without its members
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemittanceHeader {
    pub id: RemittanceId,
    pub bank: Option<Bank>,
    pub configuration_id: Option<ConfigurationId>,
    pub is_submitted: bool,
    pub file_name: Option<String>,
    pub audit: AuditStamp,
}

impl Remittance {
    /// Creates an empty batch
    pub fn new(actor: &str) -> Self {
        Self {
            id: RemittanceId::new_v7(),
            bank: None,
            configuration_id: None,
            billets: Vec::new(),
            is_submitted: false,
            file_name: None,
            audit: AuditStamp::created_by(actor),
        }
    }

    /// Rebuilds a batch from stored state
    ///
    /// Members keep the order they are given in, which is the order they
    /// were added; a repeated id keeps its first occurrence.
    pub fn restore(header: RemittanceHeader, billets: Vec<Billet>) -> Self {
        let mut seen = BTreeSet::new();
        let billets = billets.into_iter().filter(|b| seen.insert(b.id)).collect();
        Self {
            id: header.id,
            bank: header.bank,
            configuration_id: header.configuration_id,
            billets,
            is_submitted: header.is_submitted,
            file_name: header.file_name,
            audit: header.audit,
        }
    }

    pub fn id(&self) -> RemittanceId {
        self.id
    }

    pub fn bank(&self) -> Option<Bank> {
        self.bank
    }

    pub fn configuration_id(&self) -> Option<ConfigurationId> {
        self.configuration_id
    }

    /// Members in file order
    pub fn billets(&self) -> &[Billet] {
        &self.billets
    }

    pub fn len(&self) -> usize {
        self.billets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.billets.is_empty()
    }

    pub fn contains(&self, billet_id: BilletId) -> bool {
        self.billets.iter().any(|b| b.id == billet_id)
    }

    pub fn is_submitted(&self) -> bool {
        self.is_submitted
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn audit(&self) -> &AuditStamp {
        &self.audit
    }

    /// Scalar state for persistence
    pub fn header(&self) -> RemittanceHeader {
        RemittanceHeader {
            id: self.id,
            bank: self.bank,
            configuration_id: self.configuration_id,
            is_submitted: self.is_submitted,
            file_name: self.file_name.clone(),
            audit: self.audit.clone(),
        }
    }

    fn ensure_open(&self) -> Result<(), RemittanceError> {
        if self.is_submitted {
            Err(RemittanceError::AlreadySubmitted(self.id))
        } else {
            Ok(())
        }
    }

    /// Adds one billet, adopting its bank and configuration if the batch is
    /// empty. Adding a member again is a no-op.
    ///
    /// Returns whether the membership changed.
    pub fn add_billet(&mut self, billet: Billet, actor: &str) -> Result<bool, RemittanceError> {
        self.add_billets(vec![billet], actor).map(|added| added > 0)
    }

    /// Adds a set of billets all-or-nothing
    ///
    /// The incoming set must agree on one bank and one configuration, and
    /// those must agree with the batch. Nothing changes on error.
    ///
    /// Returns the number of billets that were not members yet.
    pub fn add_billets(&mut self, billets: Vec<Billet>, actor: &str) -> Result<usize, RemittanceError> {
        self.ensure_open()?;
        if billets.is_empty() {
            return Ok(0);
        }

        let banks: BTreeSet<Bank> = billets.iter().map(|b| b.bank).collect();
        let configurations: BTreeSet<ConfigurationId> =
            billets.iter().map(|b| b.configuration_id).collect();

        let incoming_bank = single(ConflictAttribute::Bank, &banks)?;
        let incoming_configuration = single(ConflictAttribute::Configuration, &configurations)?;

        if let Some(bank) = self.bank {
            if bank != incoming_bank {
                return Err(RemittanceError::conflict(ConflictAttribute::Bank, bank, incoming_bank));
            }
        }
        if let Some(configuration_id) = self.configuration_id {
            if configuration_id != incoming_configuration {
                return Err(RemittanceError::conflict(
                    ConflictAttribute::Configuration,
                    configuration_id,
                    incoming_configuration,
                ));
            }
        }
        if let Some(owned) = billets
            .iter()
            .find(|b| b.remittance_id.is_some_and(|r| r != self.id))
        {
            return Err(RemittanceError::conflict(
                ConflictAttribute::Remittance,
                self.id,
                owned.remittance_id.map(|r| r.to_string()).unwrap_or_default(),
            ));
        }

        let mut added = 0;
        for mut billet in billets {
            if self.contains(billet.id) {
                continue;
            }
            billet.link_to(self.id, actor)?;
            self.billets.push(billet);
            added += 1;
        }

        self.bank = Some(incoming_bank);
        self.configuration_id = Some(incoming_configuration);
        if added > 0 {
            self.audit.touch(actor);
        }
        debug!(remittance_id = %self.id, added, members = self.billets.len(), "billets added");
        Ok(added)
    }

    /// Removes a member by id, returning it unlinked
    ///
    /// Removing a non-member is a no-op. Emptying the batch clears its bank
    /// and configuration.
    pub fn remove_billet(
        &mut self,
        billet_id: BilletId,
        actor: &str,
    ) -> Result<Option<Billet>, RemittanceError> {
        self.ensure_open()?;
        let Some(position) = self.billets.iter().position(|b| b.id == billet_id) else {
            return Ok(None);
        };

        let mut removed = self.billets.remove(position);
        removed.unlink(actor);
        if self.billets.is_empty() {
            self.bank = None;
            self.configuration_id = None;
        }
        self.audit.touch(actor);
        debug!(remittance_id = %self.id, %billet_id, members = self.billets.len(), "billet removed");
        Ok(Some(removed))
    }

    /// Assigns allocated "our numbers" to the members that have none, in
    /// member order
    ///
    /// Returns the ids of the billets that were numbered.
    pub fn assign_our_numbers(
        &mut self,
        numbers: &[u64],
        actor: &str,
    ) -> Result<Vec<BilletId>, RemittanceError> {
        let pending: Vec<usize> = self
            .billets
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.has_our_number())
            .map(|(i, _)| i)
            .collect();
        if pending.len() != numbers.len() {
            return Err(RemittanceError::validation(
                "our_number",
                format!("{} billets need numbers, {} allocated", pending.len(), numbers.len()),
            ));
        }

        let mut numbered = Vec::with_capacity(pending.len());
        for (index, number) in pending.into_iter().zip(numbers.iter().copied()) {
            let billet = &mut self.billets[index];
            billet.assign_our_number(number, actor)?;
            numbered.push(billet.id);
        }
        Ok(numbered)
    }

    /// Number of members still waiting for an "our number"
    pub fn unnumbered_count(&self) -> usize {
        self.billets.iter().filter(|b| !b.has_our_number()).count()
    }

    /// Records the name of the generated file
    pub fn record_file(&mut self, file_name: impl Into<String>, actor: &str) {
        self.file_name = Some(file_name.into());
        self.audit.touch(actor);
    }

    /// Closes the batch for membership changes
    pub fn mark_as_submitted(&mut self, actor: &str) -> Result<(), RemittanceError> {
        self.ensure_open()?;
        if self.billets.is_empty() {
            return Err(RemittanceError::EmptyRemittance(self.id));
        }
        self.is_submitted = true;
        self.audit.touch(actor);
        Ok(())
    }

    /// Unlinks every member, leaving an empty batch; used before deletion
    pub fn release_billets(&mut self, actor: &str) -> Result<Vec<Billet>, RemittanceError> {
        self.ensure_open()?;
        let mut released = std::mem::take(&mut self.billets);
        for billet in &mut released {
            billet.unlink(actor);
        }
        self.bank = None;
        self.configuration_id = None;
        Ok(released)
    }
}

/// The single value of a set, or a conflict naming two of its values
fn single<T: Copy + Ord + std::fmt::Display>(
    attribute: ConflictAttribute,
    values: &BTreeSet<T>,
) -> Result<T, RemittanceError> {
    let mut iter = values.iter();
    match (iter.next(), iter.next()) {
        (Some(first), None) => Ok(*first),
        (Some(first), Some(second)) => Err(RemittanceError::conflict(attribute, first, second)),
        (None, _) => Err(RemittanceError::validation("billets", "no billets given")),
    }
}
