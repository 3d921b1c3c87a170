//! Billet repository

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

/// Database row for `billets`
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct BilletRow {
    pub billet_id: Uuid,
    pub installment_id: Uuid,
    pub configuration_id: Uuid,
    pub client_id: Uuid,
    pub remittance_id: Option<Uuid>,
    pub bank_code: String,
    /// Zero until the billet is first included in a generated file
    pub our_number: i64,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

/// Filter for [`BilletRepository::list`]
#[derive(Debug, Clone, Default)]
pub struct BilletFilter {
    pub configuration_id: Option<Uuid>,
    pub remittance_id: Option<Uuid>,
    pub unbatched: bool,
    pub limit: i64,
    pub offset: i64,
}

const SELECT_BILLET: &str = r#"
    SELECT billet_id, installment_id, configuration_id, client_id, remittance_id,
           bank_code, our_number, created_at, created_by, updated_at, updated_by
    FROM billets
"#;

#[derive(Debug, Clone)]
pub struct BilletRepository {
    pool: PgPool,
}

impl BilletRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: Uuid) -> Result<BilletRow, DatabaseError> {
        sqlx::query_as::<_, BilletRow>(&format!("{SELECT_BILLET} WHERE billet_id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Billet", id))
    }

    /// Rows for the ids that exist, in no particular order
    pub async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<BilletRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, BilletRow>(&format!(
            "{SELECT_BILLET} WHERE billet_id = ANY($1)"
        ))
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list(&self, filter: &BilletFilter) -> Result<Vec<BilletRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, BilletRow>(&format!(
            r#"{SELECT_BILLET}
            WHERE ($1::uuid IS NULL OR configuration_id = $1)
              AND ($2::uuid IS NULL OR remittance_id = $2)
              AND (NOT $3 OR remittance_id IS NULL)
            ORDER BY billet_id
            LIMIT $4 OFFSET $5"#
        ))
        .bind(filter.configuration_id)
        .bind(filter.remittance_id)
        .bind(filter.unbatched)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Members of a remittance in the order they were added
    pub async fn list_for_remittance(&self, remittance_id: Uuid) -> Result<Vec<BilletRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, BilletRow>(&format!(
            "{SELECT_BILLET} WHERE remittance_id = $1 ORDER BY remittance_position, billet_id"
        ))
        .bind(remittance_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn count_for_configuration(&self, configuration_id: Uuid) -> Result<i64, DatabaseError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM billets WHERE configuration_id = $1")
                .bind(configuration_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    pub async fn upsert(&self, row: &BilletRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO billets (
                billet_id, installment_id, configuration_id, client_id, remittance_id,
                bank_code, our_number, created_at, created_by, updated_at, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (billet_id) DO UPDATE SET
                installment_id = EXCLUDED.installment_id,
                configuration_id = EXCLUDED.configuration_id,
                client_id = EXCLUDED.client_id,
                remittance_id = EXCLUDED.remittance_id,
                bank_code = EXCLUDED.bank_code,
                our_number = EXCLUDED.our_number,
                updated_at = EXCLUDED.updated_at,
                updated_by = EXCLUDED.updated_by
            "#,
        )
        .bind(row.billet_id)
        .bind(row.installment_id)
        .bind(row.configuration_id)
        .bind(row.client_id)
        .bind(row.remittance_id)
        .bind(&row.bank_code)
        .bind(row.our_number)
        .bind(row.created_at)
        .bind(&row.created_by)
        .bind(row.updated_at)
        .bind(&row.updated_by)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM billets WHERE billet_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Billet", id));
        }
        Ok(())
    }
}
