//! PostgreSQL Remittance Adapter
//!
//! Implements every remittance port over one connection pool:
//!
//! - [`ConfigurationPort`], [`BilletPort`], [`RemittancePort`] on the owned tables
//! - [`SequencePort`] through row-locked counter updates
//! - [`InstallmentPort`], [`PayerPort`] as read-only queries
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use infra_db::adapters::PostgresRemittanceStore;
//! use domain_remittance::{RemittancePorts, RemittanceService, ServiceSettings};
//!
//! let store = Arc::new(PostgresRemittanceStore::new(pool));
//! let ports = store.ports();
//! let service = RemittanceService::new(ports, ServiceSettings::default());
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{
    AdapterHealth, AuditStamp, BilletId, ClientId, ConfigurationId, DomainPort,
    HealthCheckResult, HealthCheckable, InstallmentId, Money, OperationMetadata, PortError,
    RemittanceId,
};
use domain_remittance::configuration::{MAX_FILE_SEQUENCE, MAX_OUR_NUMBER};
use domain_remittance::{
    Bank, Billet, BilletConfiguration, BilletPort, BilletQuery, ConfigurationPort,
    InstallmentData, InstallmentPort, PageQuery, PayerAddress, PayerData, PayerPort, Remittance,
    RemittanceHeader, RemittancePort, RemittancePorts, SequencePort, StoredFile,
};

use crate::error::DatabaseError;
use crate::repositories::{
    BilletFilter, BilletRepository, BilletRow, ClientRow, CollaboratorRepository,
    ConfigurationRepository, ConfigurationRow, InstallmentRow, MemberLink, RemittanceRepository,
    RemittanceRow,
};

const ADAPTER_ID: &str = "postgres-remittance-store";

/// PostgreSQL-backed implementation of the remittance ports
///
/// # Error Handling
///
/// Repository errors become `PortError`s: missing rows are `NotFound`,
/// constraint violations and exhausted counters are `Conflict`, pool and
/// socket failures are `Connection`/`Timeout`, the rest `Internal`.
#[derive(Debug, Clone)]
pub struct PostgresRemittanceStore {
    configurations: ConfigurationRepository,
    billets: BilletRepository,
    remittances: RemittanceRepository,
    collaborators: CollaboratorRepository,
    pool: PgPool,
}

impl PostgresRemittanceStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            configurations: ConfigurationRepository::new(pool.clone()),
            billets: BilletRepository::new(pool.clone()),
            remittances: RemittanceRepository::new(pool.clone()),
            collaborators: CollaboratorRepository::new(pool.clone()),
            pool,
        }
    }

    /// Wires this store into every port the service needs
    pub fn ports(self: &Arc<Self>) -> RemittancePorts {
        RemittancePorts {
            configurations: self.clone(),
            billets: self.clone(),
            remittances: self.clone(),
            sequences: self.clone(),
            installments: self.clone(),
            payers: self.clone(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl DomainPort for PostgresRemittanceStore {}

#[async_trait]
impl HealthCheckable for PostgresRemittanceStore {
    /// Runs `SELECT 1` against the pool
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(_) => HealthCheckResult {
                adapter_id: ADAPTER_ID.to_string(),
                status: AdapterHealth::Healthy,
                latency_ms,
                message: None,
                checked_at: Utc::now(),
            },
            Err(e) => HealthCheckResult {
                adapter_id: ADAPTER_ID.to_string(),
                status: AdapterHealth::Unhealthy,
                latency_ms,
                message: Some(format!("Database error: {}", e)),
                checked_at: Utc::now(),
            },
        }
    }
}

#[async_trait]
impl ConfigurationPort for PostgresRemittanceStore {
    #[instrument(skip(self, _metadata), fields(configuration_id = %id))]
    async fn get_configuration(
        &self,
        id: ConfigurationId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<BilletConfiguration, PortError> {
        let row = self.configurations.get(id.into()).await?;
        Ok(row_to_configuration(row)?)
    }

    #[instrument(skip(self, _metadata))]
    async fn list_configurations(
        &self,
        page: PageQuery,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<BilletConfiguration>, PortError> {
        let (limit, offset) = page_bounds(page);
        let rows = self.configurations.list(limit, offset).await?;
        Ok(rows
            .into_iter()
            .map(row_to_configuration)
            .collect::<Result<Vec<_>, _>>()?)
    }

    #[instrument(skip(self, configuration, _metadata), fields(configuration_id = %configuration.id))]
    async fn save_configuration(
        &self,
        configuration: &BilletConfiguration,
        _metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError> {
        debug!("Saving billet configuration");
        self.configurations
            .upsert(&configuration_to_row(configuration)?)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, _metadata), fields(configuration_id = %id))]
    async fn delete_configuration(
        &self,
        id: ConfigurationId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError> {
        self.configurations.delete(id.into()).await?;
        Ok(())
    }
}

#[async_trait]
impl BilletPort for PostgresRemittanceStore {
    #[instrument(skip(self, _metadata), fields(billet_id = %id))]
    async fn get_billet(
        &self,
        id: BilletId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Billet, PortError> {
        let row = self.billets.get(id.into()).await?;
        Ok(row_to_billet(row)?)
    }

    #[instrument(skip(self, ids, _metadata), fields(count = ids.len()))]
    async fn get_billets(
        &self,
        ids: &[BilletId],
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Billet>, PortError> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| Uuid::from(*id)).collect();
        let by_id: HashMap<Uuid, BilletRow> = self
            .billets
            .get_many(&uuids)
            .await?
            .into_iter()
            .map(|row| (row.billet_id, row))
            .collect();

        let mut billets = Vec::with_capacity(ids.len());
        for id in ids {
            // Duplicated ids repeat the same billet
            let row = by_id
                .get(id.as_uuid())
                .cloned()
                .ok_or_else(|| PortError::not_found("Billet", id))?;
            billets.push(row_to_billet(row)?);
        }
        Ok(billets)
    }

    #[instrument(skip(self, _metadata))]
    async fn list_billets(
        &self,
        query: BilletQuery,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Billet>, PortError> {
        let (limit, offset) = page_bounds(query.page);
        let filter = BilletFilter {
            configuration_id: query.configuration_id.map(Uuid::from),
            remittance_id: query.remittance_id.map(Uuid::from),
            unbatched: query.unbatched,
            limit,
            offset,
        };
        let rows = self.billets.list(&filter).await?;
        Ok(rows
            .into_iter()
            .map(row_to_billet)
            .collect::<Result<Vec<_>, _>>()?)
    }

    #[instrument(skip(self, _metadata), fields(configuration_id = %configuration_id))]
    async fn count_billets_for_configuration(
        &self,
        configuration_id: ConfigurationId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<u64, PortError> {
        let count = self
            .billets
            .count_for_configuration(configuration_id.into())
            .await?;
        u64::try_from(count).map_err(|_| DatabaseError::corrupt("count", count).into())
    }

    #[instrument(skip(self, billet, _metadata), fields(billet_id = %billet.id))]
    async fn save_billet(
        &self,
        billet: &Billet,
        _metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError> {
        self.billets.upsert(&billet_to_row(billet)?).await?;
        Ok(())
    }

    #[instrument(skip(self, _metadata), fields(billet_id = %id))]
    async fn delete_billet(
        &self,
        id: BilletId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError> {
        self.billets.delete(id.into()).await?;
        Ok(())
    }
}

#[async_trait]
impl RemittancePort for PostgresRemittanceStore {
    #[instrument(skip(self, _metadata), fields(remittance_id = %id))]
    async fn get_remittance(
        &self,
        id: RemittanceId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Remittance, PortError> {
        let row = self.remittances.get(id.into()).await?;
        let members = self.billets.list_for_remittance(id.into()).await?;
        Ok(assemble_remittance(row, members)?)
    }

    #[instrument(skip(self, _metadata))]
    async fn list_remittances(
        &self,
        page: PageQuery,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<Remittance>, PortError> {
        let (limit, offset) = page_bounds(page);
        let rows = self.remittances.list(limit, offset).await?;

        let mut remittances = Vec::with_capacity(rows.len());
        for row in rows {
            let members = self.billets.list_for_remittance(row.remittance_id).await?;
            remittances.push(assemble_remittance(row, members)?);
        }
        Ok(remittances)
    }

    #[instrument(skip(self, remittance, _metadata), fields(remittance_id = %remittance.id(), members = remittance.len()))]
    async fn save_remittance(
        &self,
        remittance: &Remittance,
        _metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError> {
        let row = header_to_row(&remittance.header());
        let members = remittance
            .billets()
            .iter()
            .enumerate()
            .map(|(position, billet)| {
                Ok(MemberLink {
                    billet_id: billet.id.into(),
                    position: i32::try_from(position)
                        .map_err(|_| DatabaseError::corrupt("remittance_position", position))?,
                    our_number: to_i64(billet.our_number, "our_number")?,
                    updated_at: billet.audit.updated_at,
                    updated_by: billet.audit.updated_by.clone(),
                })
            })
            .collect::<Result<Vec<_>, DatabaseError>>()?;

        self.remittances.save(&row, &members).await?;
        Ok(())
    }

    #[instrument(skip(self, _metadata), fields(remittance_id = %id))]
    async fn delete_remittance(
        &self,
        id: RemittanceId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError> {
        self.remittances.delete(id.into()).await?;
        Ok(())
    }

    #[instrument(skip(self, file, _metadata), fields(remittance_id = %id, file_name = %file.file_name))]
    async fn store_file(
        &self,
        id: RemittanceId,
        file: StoredFile,
        _metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError> {
        self.remittances
            .store_file(id.into(), &file.file_name, &file.bytes)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, _metadata), fields(remittance_id = %id))]
    async fn load_file(
        &self,
        id: RemittanceId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Option<StoredFile>, PortError> {
        let row = self.remittances.load_file(id.into()).await?;
        Ok(row.map(|row| StoredFile {
            file_name: row.file_name,
            bytes: row.content,
        }))
    }
}

#[async_trait]
impl SequencePort for PostgresRemittanceStore {
    #[instrument(skip(self, _metadata), fields(configuration_id = %configuration_id))]
    async fn next_our_numbers(
        &self,
        configuration_id: ConfigurationId,
        count: u32,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<u64>, PortError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let max = to_i64(MAX_OUR_NUMBER, "next_our_number")?;
        let first = self
            .configurations
            .allocate_our_numbers(configuration_id.into(), i64::from(count), max)
            .await?;
        let first = from_i64(first, "next_our_number")?;
        Ok((first..first + u64::from(count)).collect())
    }

    #[instrument(skip(self, _metadata), fields(configuration_id = %configuration_id))]
    async fn next_file_sequence(
        &self,
        configuration_id: ConfigurationId,
        _metadata: Option<OperationMetadata>,
    ) -> Result<u32, PortError> {
        let max = to_i32(MAX_FILE_SEQUENCE, "next_file_sequence")?;
        let sequence = self
            .configurations
            .allocate_file_sequence(configuration_id.into(), max)
            .await?;
        u32::try_from(sequence)
            .map_err(|_| DatabaseError::corrupt("next_file_sequence", sequence).into())
    }
}

#[async_trait]
impl InstallmentPort for PostgresRemittanceStore {
    #[instrument(skip(self, ids, _metadata), fields(count = ids.len()))]
    async fn get_installments(
        &self,
        ids: &[InstallmentId],
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<InstallmentData>, PortError> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| Uuid::from(*id)).collect();
        let rows = self.collaborators.installments(&uuids).await?;
        Ok(rows.into_iter().map(row_to_installment).collect())
    }
}

#[async_trait]
impl PayerPort for PostgresRemittanceStore {
    #[instrument(skip(self, ids, _metadata), fields(count = ids.len()))]
    async fn get_payers(
        &self,
        ids: &[ClientId],
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<PayerData>, PortError> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| Uuid::from(*id)).collect();
        let rows = self.collaborators.clients(&uuids).await?;
        Ok(rows.into_iter().map(row_to_payer).collect())
    }
}

// ============================================================================
// Row conversions
// ============================================================================

fn page_bounds(page: PageQuery) -> (i64, i64) {
    (i64::from(page.limit), i64::from(page.offset))
}

fn to_i64(value: u64, column: &str) -> Result<i64, DatabaseError> {
    i64::try_from(value).map_err(|_| DatabaseError::corrupt(column, value))
}

fn from_i64(value: i64, column: &str) -> Result<u64, DatabaseError> {
    u64::try_from(value).map_err(|_| DatabaseError::corrupt(column, value))
}

fn to_i32(value: u32, column: &str) -> Result<i32, DatabaseError> {
    i32::try_from(value).map_err(|_| DatabaseError::corrupt(column, value))
}

fn from_i32(value: i32, column: &str) -> Result<u32, DatabaseError> {
    u32::try_from(value).map_err(|_| DatabaseError::corrupt(column, value))
}

fn parse_bank(code: &str) -> Result<Bank, DatabaseError> {
    Bank::from_code(code).ok_or_else(|| DatabaseError::corrupt("bank_code", code))
}

fn configuration_to_row(config: &BilletConfiguration) -> Result<ConfigurationRow, DatabaseError> {
    Ok(ConfigurationRow {
        configuration_id: config.id.into(),
        company_code: config.company_code.clone(),
        company_name: config.company_name.clone(),
        company_tax_id: config.company_tax_id.clone(),
        wallet_number: config.wallet_number.clone(),
        agency_number: config.agency_number.clone(),
        account_number: config.account_number.clone(),
        account_digit: config.account_digit.clone(),
        bank_code: config.bank_code().to_string(),
        has_fine: config.has_fine,
        fine_percentage: config.fine_percentage,
        daily_discount: config.daily_discount.amount(),
        daily_interest: config.daily_interest.amount(),
        discount_limit_date: config.discount_limit_date,
        discount_amount: config.discount_amount.amount(),
        rebate_amount: config.rebate_amount.amount(),
        first_message: config.first_message.clone(),
        second_message: config.second_message.clone(),
        starting_sequential_number: to_i32(config.starting_sequential_number, "starting_sequential_number")?,
        starting_our_number: to_i64(config.starting_our_number, "starting_our_number")?,
        next_file_sequence: to_i32(config.next_file_sequence, "next_file_sequence")?,
        next_our_number: to_i64(config.next_our_number, "next_our_number")?,
        created_at: config.audit.created_at,
        created_by: config.audit.created_by.clone(),
        updated_at: config.audit.updated_at,
        updated_by: config.audit.updated_by.clone(),
    })
}

fn row_to_configuration(row: ConfigurationRow) -> Result<BilletConfiguration, DatabaseError> {
    Ok(BilletConfiguration {
        id: ConfigurationId::from(row.configuration_id),
        bank: parse_bank(&row.bank_code)?,
        starting_sequential_number: from_i32(row.starting_sequential_number, "starting_sequential_number")?,
        starting_our_number: from_i64(row.starting_our_number, "starting_our_number")?,
        next_file_sequence: from_i32(row.next_file_sequence, "next_file_sequence")?,
        next_our_number: from_i64(row.next_our_number, "next_our_number")?,
        company_code: row.company_code,
        company_name: row.company_name,
        company_tax_id: row.company_tax_id,
        wallet_number: row.wallet_number,
        agency_number: row.agency_number,
        account_number: row.account_number,
        account_digit: row.account_digit,
        has_fine: row.has_fine,
        fine_percentage: row.fine_percentage,
        daily_discount: Money::brl(row.daily_discount),
        daily_interest: Money::brl(row.daily_interest),
        discount_limit_date: row.discount_limit_date,
        discount_amount: Money::brl(row.discount_amount),
        rebate_amount: Money::brl(row.rebate_amount),
        first_message: row.first_message,
        second_message: row.second_message,
        audit: AuditStamp {
            created_at: row.created_at,
            created_by: row.created_by,
            updated_at: row.updated_at,
            updated_by: row.updated_by,
        },
    })
}

fn billet_to_row(billet: &Billet) -> Result<BilletRow, DatabaseError> {
    Ok(BilletRow {
        billet_id: billet.id.into(),
        installment_id: billet.installment_id.into(),
        configuration_id: billet.configuration_id.into(),
        client_id: billet.client_id.into(),
        remittance_id: billet.remittance_id.map(Uuid::from),
        bank_code: billet.bank.code().to_string(),
        our_number: to_i64(billet.our_number, "our_number")?,
        created_at: billet.audit.created_at,
        created_by: billet.audit.created_by.clone(),
        updated_at: billet.audit.updated_at,
        updated_by: billet.audit.updated_by.clone(),
    })
}

fn row_to_billet(row: BilletRow) -> Result<Billet, DatabaseError> {
    Ok(Billet {
        id: BilletId::from(row.billet_id),
        installment_id: InstallmentId::from(row.installment_id),
        configuration_id: ConfigurationId::from(row.configuration_id),
        client_id: ClientId::from(row.client_id),
        remittance_id: row.remittance_id.map(RemittanceId::from),
        bank: parse_bank(&row.bank_code)?,
        our_number: from_i64(row.our_number, "our_number")?,
        audit: AuditStamp {
            created_at: row.created_at,
            created_by: row.created_by,
            updated_at: row.updated_at,
            updated_by: row.updated_by,
        },
    })
}

fn header_to_row(header: &RemittanceHeader) -> RemittanceRow {
    RemittanceRow {
        remittance_id: header.id.into(),
        bank_code: header.bank.map(|bank| bank.code().to_string()),
        configuration_id: header.configuration_id.map(Uuid::from),
        is_submitted: header.is_submitted,
        file_name: header.file_name.clone(),
        created_at: header.audit.created_at,
        created_by: header.audit.created_by.clone(),
        updated_at: header.audit.updated_at,
        updated_by: header.audit.updated_by.clone(),
    }
}

fn assemble_remittance(row: RemittanceRow, members: Vec<BilletRow>) -> Result<Remittance, DatabaseError> {
    let header = RemittanceHeader {
        id: RemittanceId::from(row.remittance_id),
        bank: row.bank_code.as_deref().map(parse_bank).transpose()?,
        configuration_id: row.configuration_id.map(ConfigurationId::from),
        is_submitted: row.is_submitted,
        file_name: row.file_name,
        audit: AuditStamp {
            created_at: row.created_at,
            created_by: row.created_by,
            updated_at: row.updated_at,
            updated_by: row.updated_by,
        },
    };
    let billets = members
        .into_iter()
        .map(row_to_billet)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Remittance::restore(header, billets))
}

fn row_to_installment(row: InstallmentRow) -> InstallmentData {
    InstallmentData {
        installment_id: InstallmentId::from(row.installment_id),
        amount: row.amount.map(Money::brl),
        due_date: row.due_date,
        issue_date: row.issue_date,
    }
}

fn row_to_payer(row: ClientRow) -> PayerData {
    PayerData {
        client_id: ClientId::from(row.client_id),
        tax_id: row.tax_id,
        legal_name: row.legal_name,
        address: PayerAddress {
            street: row.street,
            number: row.number,
            city: row.city,
            state: row.state.trim_end().to_string(),
            zip: row.zip,
        },
    }
}
