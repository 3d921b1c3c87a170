//! Billet configuration repository
//!
//! Stores the bank account profiles and hands out their two counters. Both
//! allocations lock the configuration row, so concurrent generations for the
//! same configuration are serialized.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DatabaseError;

/// Database row for `billet_configurations`
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ConfigurationRow {
    pub configuration_id: Uuid,
    pub company_code: String,
    pub company_name: String,
    pub company_tax_id: String,
    pub wallet_number: String,
    pub agency_number: String,
    pub account_number: String,
    pub account_digit: String,
    pub bank_code: String,
    pub has_fine: bool,
    pub fine_percentage: Option<Decimal>,
    pub daily_discount: Decimal,
    pub daily_interest: Decimal,
    pub discount_limit_date: Option<NaiveDate>,
    pub discount_amount: Decimal,
    pub rebate_amount: Decimal,
    pub first_message: String,
    pub second_message: String,
    pub starting_sequential_number: i32,
    pub starting_our_number: i64,
    pub next_file_sequence: i32,
    pub next_our_number: i64,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

const SELECT_CONFIGURATION: &str = r#"
    SELECT configuration_id, company_code, company_name, company_tax_id,
           wallet_number, agency_number, account_number, account_digit,
           bank_code, has_fine, fine_percentage, daily_discount, daily_interest,
           discount_limit_date, discount_amount, rebate_amount,
           first_message, second_message,
           starting_sequential_number, starting_our_number,
           next_file_sequence, next_our_number,
           created_at, created_by, updated_at, updated_by
    FROM billet_configurations
"#;

/// Repository for billet configurations and their counters
#[derive(Debug, Clone)]
pub struct ConfigurationRepository {
    pool: PgPool,
}

impl ConfigurationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: Uuid) -> Result<ConfigurationRow, DatabaseError> {
        sqlx::query_as::<_, ConfigurationRow>(&format!(
            "{SELECT_CONFIGURATION} WHERE configuration_id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("BilletConfiguration", id))
    }

    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<ConfigurationRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, ConfigurationRow>(&format!(
            "{SELECT_CONFIGURATION} ORDER BY configuration_id LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Inserts or replaces a configuration
    ///
    /// Counters never move backwards: a stale copy cannot undo allocations
    /// made since it was read.
    pub async fn upsert(&self, row: &ConfigurationRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO billet_configurations (
                configuration_id, company_code, company_name, company_tax_id,
                wallet_number, agency_number, account_number, account_digit,
                bank_code, has_fine, fine_percentage, daily_discount, daily_interest,
                discount_limit_date, discount_amount, rebate_amount,
                first_message, second_message,
                starting_sequential_number, starting_our_number,
                next_file_sequence, next_our_number,
                created_at, created_by, updated_at, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26)
            ON CONFLICT (configuration_id) DO UPDATE SET
                company_code = EXCLUDED.company_code,
                company_name = EXCLUDED.company_name,
                company_tax_id = EXCLUDED.company_tax_id,
                wallet_number = EXCLUDED.wallet_number,
                agency_number = EXCLUDED.agency_number,
                account_number = EXCLUDED.account_number,
                account_digit = EXCLUDED.account_digit,
                bank_code = EXCLUDED.bank_code,
                has_fine = EXCLUDED.has_fine,
                fine_percentage = EXCLUDED.fine_percentage,
                daily_discount = EXCLUDED.daily_discount,
                daily_interest = EXCLUDED.daily_interest,
                discount_limit_date = EXCLUDED.discount_limit_date,
                discount_amount = EXCLUDED.discount_amount,
                rebate_amount = EXCLUDED.rebate_amount,
                first_message = EXCLUDED.first_message,
                second_message = EXCLUDED.second_message,
                starting_sequential_number = EXCLUDED.starting_sequential_number,
                starting_our_number = EXCLUDED.starting_our_number,
                next_file_sequence = GREATEST(billet_configurations.next_file_sequence, EXCLUDED.next_file_sequence),
                next_our_number = GREATEST(billet_configurations.next_our_number, EXCLUDED.next_our_number),
                updated_at = EXCLUDED.updated_at,
                updated_by = EXCLUDED.updated_by
            "#,
        )
        .bind(row.configuration_id)
        .bind(&row.company_code)
        .bind(&row.company_name)
        .bind(&row.company_tax_id)
        .bind(&row.wallet_number)
        .bind(&row.agency_number)
        .bind(&row.account_number)
        .bind(&row.account_digit)
        .bind(&row.bank_code)
        .bind(row.has_fine)
        .bind(row.fine_percentage)
        .bind(row.daily_discount)
        .bind(row.daily_interest)
        .bind(row.discount_limit_date)
        .bind(row.discount_amount)
        .bind(row.rebate_amount)
        .bind(&row.first_message)
        .bind(&row.second_message)
        .bind(row.starting_sequential_number)
        .bind(row.starting_our_number)
        .bind(row.next_file_sequence)
        .bind(row.next_our_number)
        .bind(row.created_at)
        .bind(&row.created_by)
        .bind(row.updated_at)
        .bind(&row.updated_by)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM billet_configurations WHERE configuration_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("BilletConfiguration", id));
        }
        Ok(())
    }

    /// Reserves `count` consecutive "our numbers" and returns the first
    ///
    /// # Errors
    ///
    /// `CounterExhausted` when the last reserved number would exceed `max`
    pub async fn allocate_our_numbers(
        &self,
        id: Uuid,
        count: i64,
        max: i64,
    ) -> Result<i64, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let first: i64 = sqlx::query_scalar(
            "SELECT next_our_number FROM billet_configurations WHERE configuration_id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DatabaseError::not_found("BilletConfiguration", id))?;

        let next = first + count;
        if next - 1 > max {
            return Err(DatabaseError::CounterExhausted(format!(
                "our number counter of configuration {} cannot hand out {} more",
                id, count
            )));
        }

        sqlx::query(
            "UPDATE billet_configurations SET next_our_number = $2 WHERE configuration_id = $1",
        )
        .bind(id)
        .bind(next)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(configuration_id = %id, first, count, "Reserved our numbers");
        Ok(first)
    }

    /// Reserves the next file sequence
    pub async fn allocate_file_sequence(&self, id: Uuid, max: i32) -> Result<i32, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let sequence: i32 = sqlx::query_scalar(
            "SELECT next_file_sequence FROM billet_configurations WHERE configuration_id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DatabaseError::not_found("BilletConfiguration", id))?;

        if sequence > max {
            return Err(DatabaseError::CounterExhausted(format!(
                "file sequence counter of configuration {} is exhausted",
                id
            )));
        }

        sqlx::query(
            "UPDATE billet_configurations SET next_file_sequence = $2 WHERE configuration_id = $1",
        )
        .bind(id)
        .bind(sequence + 1)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(configuration_id = %id, sequence, "Reserved file sequence");
        Ok(sequence)
    }
}
