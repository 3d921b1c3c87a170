//! Remittance repository
//!
//! Remittance headers, membership links on `billets` and the generated file
//! kept in `remittance_files`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::DatabaseError;

/// Database row for `remittances`
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct RemittanceRow {
    pub remittance_id: Uuid,
    pub bank_code: Option<String>,
    pub configuration_id: Option<Uuid>,
    pub is_submitted: bool,
    pub file_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

/// Membership state written for each member on save
#[derive(Debug, Clone, PartialEq)]
pub struct MemberLink {
    pub billet_id: Uuid,
    /// Zero-based order within the remittance
    pub position: i32,
    pub our_number: i64,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

/// Database row for `remittance_files`
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct RemittanceFileRow {
    pub file_name: String,
    pub content: Vec<u8>,
}

const SELECT_REMITTANCE: &str = r#"
    SELECT remittance_id, bank_code, configuration_id, is_submitted, file_name,
           created_at, created_by, updated_at, updated_by
    FROM remittances
"#;

#[derive(Debug, Clone)]
pub struct RemittanceRepository {
    pool: PgPool,
}

impl RemittanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: Uuid) -> Result<RemittanceRow, DatabaseError> {
        sqlx::query_as::<_, RemittanceRow>(&format!("{SELECT_REMITTANCE} WHERE remittance_id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Remittance", id))
    }

    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<RemittanceRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, RemittanceRow>(&format!(
            "{SELECT_REMITTANCE} ORDER BY remittance_id LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Writes the header and the membership in one transaction
    ///
    /// Billets still linked to the remittance but absent from `members` are
    /// unlinked; every member gets the link, its position and its "our
    /// number". A member linked elsewhere, or holding a different non-zero
    /// "our number", fails the save with `DatabaseError::StaleWrite`.
    pub async fn save(&self, row: &RemittanceRow, members: &[MemberLink]) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO remittances (
                remittance_id, bank_code, configuration_id, is_submitted, file_name,
                created_at, created_by, updated_at, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (remittance_id) DO UPDATE SET
                bank_code = EXCLUDED.bank_code,
                configuration_id = EXCLUDED.configuration_id,
                is_submitted = EXCLUDED.is_submitted,
                file_name = EXCLUDED.file_name,
                updated_at = EXCLUDED.updated_at,
                updated_by = EXCLUDED.updated_by
            "#,
        )
        .bind(row.remittance_id)
        .bind(&row.bank_code)
        .bind(row.configuration_id)
        .bind(row.is_submitted)
        .bind(&row.file_name)
        .bind(row.created_at)
        .bind(&row.created_by)
        .bind(row.updated_at)
        .bind(&row.updated_by)
        .execute(&mut *tx)
        .await?;

        let member_ids: Vec<Uuid> = members.iter().map(|m| m.billet_id).collect();
        let released = sqlx::query(
            r#"
            UPDATE billets
            SET remittance_id = NULL, remittance_position = NULL, updated_at = $3, updated_by = $4
            WHERE remittance_id = $1 AND NOT (billet_id = ANY($2))
            "#,
        )
        .bind(row.remittance_id)
        .bind(&member_ids)
        .bind(row.updated_at)
        .bind(&row.updated_by)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        for member in members {
            let result = sqlx::query(
                r#"
                UPDATE billets
                SET remittance_id = $2, remittance_position = $3, our_number = $4,
                    updated_at = $5, updated_by = $6
                WHERE billet_id = $1
                  AND (remittance_id IS NULL OR remittance_id = $2)
                  AND (our_number = 0 OR our_number = $4)
                "#,
            )
            .bind(member.billet_id)
            .bind(row.remittance_id)
            .bind(member.position)
            .bind(member.our_number)
            .bind(member.updated_at)
            .bind(&member.updated_by)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM billets WHERE billet_id = $1)")
                        .bind(member.billet_id)
                        .fetch_one(&mut *tx)
                        .await?;
                if !exists {
                    return Err(DatabaseError::not_found("Billet", member.billet_id));
                }
                warn!(
                    remittance_id = %row.remittance_id,
                    billet_id = %member.billet_id,
                    "Refused stale membership write"
                );
                return Err(DatabaseError::StaleWrite(format!(
                    "billet {} changed since remittance {} was loaded",
                    member.billet_id, row.remittance_id
                )));
            }
        }

        tx.commit().await?;
        debug!(
            remittance_id = %row.remittance_id,
            members = members.len(),
            released,
            "Saved remittance"
        );
        Ok(())
    }

    /// Unlinks every member and deletes the remittance with its file
    pub async fn delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE billets SET remittance_id = NULL, remittance_position = NULL, updated_at = NOW() WHERE remittance_id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM remittances WHERE remittance_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Remittance", id));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Replaces the stored file of an existing remittance
    pub async fn store_file(&self, id: Uuid, file_name: &str, content: &[u8]) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            INSERT INTO remittance_files (remittance_id, file_name, content, stored_at)
            SELECT $1, $2, $3, NOW()
            WHERE EXISTS (SELECT 1 FROM remittances WHERE remittance_id = $1)
            ON CONFLICT (remittance_id) DO UPDATE SET
                file_name = EXCLUDED.file_name,
                content = EXCLUDED.content,
                stored_at = EXCLUDED.stored_at
            "#,
        )
        .bind(id)
        .bind(file_name)
        .bind(content)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Remittance", id));
        }
        Ok(())
    }

    pub async fn load_file(&self, id: Uuid) -> Result<Option<RemittanceFileRow>, DatabaseError> {
        let row = sqlx::query_as::<_, RemittanceFileRow>(
            "SELECT file_name, content FROM remittance_files WHERE remittance_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
