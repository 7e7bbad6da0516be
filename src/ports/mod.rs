//! Outbound collaborator seams. The orchestrator only sees these traits;
//! concrete adapters live in `adapters`, `ledger` and `ipfs`.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use thiserror::Error;

use crate::db::models::Batch;
use crate::ipfs::UploadError;
use crate::ledger::LedgerError;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("duplicate value for unique constraint {0}")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("database error: {0}")]
    Database(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("row not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                RepositoryError::Conflict(
                    db_err.constraint().unwrap_or("unique constraint").to_string(),
                )
            }
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

/// Durable storage for batch records. Uniqueness of the composite token id
/// is enforced here and surfaces as `RepositoryError::Conflict`.
#[async_trait]
pub trait BatchRepository: Send + Sync {
    async fn insert(&self, batch: &Batch) -> RepositoryResult<Batch>;

    async fn find_for_farmer(
        &self,
        batch_id: &str,
        farmer_account_id: &str,
    ) -> RepositoryResult<Option<Batch>>;

    /// All of a farmer's records, creation time descending.
    async fn list_for_farmer(&self, farmer_account_id: &str) -> RepositoryResult<Vec<Batch>>;
}

/// Append-only distributed log. Submission returns the log-assigned sequence
/// number when the gateway reports one; `None` is not an error.
#[async_trait]
pub trait EventLog: Send + Sync {
    async fn submit_message(
        &self,
        topic_id: &str,
        message: &[u8],
    ) -> Result<Option<BigDecimal>, LedgerError>;
}

/// Mint capability against a pre-provisioned token class. Returns the serial
/// assigned to the newly minted token.
#[async_trait]
pub trait TokenMinter: Send + Sync {
    async fn mint(&self, token_id: &str, metadata: &[u8]) -> Result<String, LedgerError>;
}

/// Content-addressed upload service.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn pin_file(&self, filename: &str, bytes: Vec<u8>) -> Result<String, UploadError>;

    async fn pin_json(
        &self,
        name: &str,
        document: &serde_json::Value,
    ) -> Result<String, UploadError>;
}
