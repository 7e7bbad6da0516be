//! Postgres implementation of BatchRepository.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::models::{Batch, BatchStatus};
use crate::ports::{BatchRepository, RepositoryError, RepositoryResult};

/// Postgres-backed batch repository.
#[derive(Clone)]
pub struct PostgresBatchRepository {
    pool: PgPool,
}

impl PostgresBatchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BatchRepository for PostgresBatchRepository {
    async fn insert(&self, batch: &Batch) -> RepositoryResult<Batch> {
        let row = sqlx::query_as::<_, BatchRow>(
            r#"
            INSERT INTO batches (
                id, product_name, quantity, unit, status,
                creation_date, image_url, nft_id, topic_id, sequence_number,
                metadata_cid, farmer_account_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id, product_name, quantity, unit, status,
                creation_date, image_url, nft_id, topic_id, sequence_number,
                metadata_cid, farmer_account_id
            "#,
        )
        .bind(&batch.id)
        .bind(&batch.product_name)
        .bind(batch.quantity)
        .bind(&batch.unit)
        .bind(batch.status.as_str())
        .bind(batch.creation_date)
        .bind(&batch.image_url)
        .bind(&batch.nft_id)
        .bind(&batch.topic_id)
        .bind(&batch.sequence_number)
        .bind(&batch.metadata_cid)
        .bind(&batch.farmer_account_id)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.into_domain()
    }

    async fn find_for_farmer(
        &self,
        batch_id: &str,
        farmer_account_id: &str,
    ) -> RepositoryResult<Option<Batch>> {
        let row = sqlx::query_as::<_, BatchRow>(
            "SELECT * FROM batches WHERE id = $1 AND farmer_account_id = $2",
        )
        .bind(batch_id)
        .bind(farmer_account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.map(|r| r.into_domain()).transpose()
    }

    async fn list_for_farmer(&self, farmer_account_id: &str) -> RepositoryResult<Vec<Batch>> {
        let rows = sqlx::query_as::<_, BatchRow>(
            "SELECT * FROM batches WHERE farmer_account_id = $1 ORDER BY creation_date DESC",
        )
        .bind(farmer_account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        rows.into_iter().map(|r| r.into_domain()).collect()
    }
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct BatchRow {
    id: String,
    product_name: String,
    quantity: i64,
    unit: String,
    status: String,
    creation_date: chrono::DateTime<chrono::Utc>,
    image_url: String,
    nft_id: String,
    topic_id: String,
    sequence_number: Option<bigdecimal::BigDecimal>,
    metadata_cid: String,
    farmer_account_id: String,
}

impl BatchRow {
    fn into_domain(self) -> RepositoryResult<Batch> {
        let status = self
            .status
            .parse::<BatchStatus>()
            .map_err(RepositoryError::Database)?;

        Ok(Batch {
            id: self.id,
            product_name: self.product_name,
            quantity: self.quantity,
            unit: self.unit,
            status,
            creation_date: self.creation_date,
            image_url: self.image_url,
            nft_id: self.nft_id,
            topic_id: self.topic_id,
            sequence_number: self.sequence_number,
            metadata_cid: self.metadata_cid,
            farmer_account_id: self.farmer_account_id,
        })
    }
}
