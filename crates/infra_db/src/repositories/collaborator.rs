//! Read-only queries against the invoicing and client tables

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct InstallmentRow {
    pub installment_id: Uuid,
    pub amount: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    pub issue_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ClientRow {
    pub client_id: Uuid,
    pub tax_id: String,
    pub legal_name: String,
    pub street: String,
    pub number: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

#[derive(Debug, Clone)]
pub struct CollaboratorRepository {
    pool: PgPool,
}

impl CollaboratorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn installments(&self, ids: &[Uuid]) -> Result<Vec<InstallmentRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, InstallmentRow>(
            r#"
            SELECT installment_id, amount, due_date, issue_date
            FROM installments
            WHERE installment_id = ANY($1)
            "#,
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn clients(&self, ids: &[Uuid]) -> Result<Vec<ClientRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, ClientRow>(
            r#"
            SELECT client_id, tax_id, legal_name, street, number, city, state, zip
            FROM clients
            WHERE client_id = ANY($1)
            "#,
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
