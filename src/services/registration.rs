//! Batch registration orchestration.
//!
//! One registration is a single sequential unit of work: publish the
//! creation event, resolve the image, pin the off-chain metadata, mint the
//! token, persist the record. The ledger event is the source of truth —
//! its submission must complete before anything is minted, and a failure
//! there aborts the whole registration. Image and metadata uploads are
//! best-effort enrichment and degrade to placeholders.

use bigdecimal::BigDecimal;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::models::Batch;
use crate::error::AppError;
use crate::ipfs::{ImageAsset, PLACEHOLDER_METADATA_CID};
use crate::ledger::{LedgerError, ONCHAIN_METADATA_MAX_BYTES};
use crate::ports::{BatchRepository, EventLog, ImageStore, TokenMinter};
use crate::services::listings::ListingCache;

pub const EVENT_TYPE_BATCH_CREATED: &str = "BATCH_CREATED";
pub const METADATA_CREATOR: &str = "AgriTrust Platform";

/// Validated registration input. Construction goes through the handler's
/// validation gate; nothing here has touched an external service yet.
#[derive(Debug, Clone)]
pub struct BatchSubmission {
    pub product_name: String,
    pub quantity: i64,
    pub unit: String,
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Canonical event document appended to the batch topic. Immutable once
/// submitted; the log assigns its sequence number.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreatedEvent {
    pub event_id: Uuid,
    pub event_type: &'static str,
    pub batch_id: String,
    pub timestamp: String,
    pub farmer_account_id: String,
    pub product: ProductSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipfs_cid: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductSnapshot {
    pub name: String,
    pub quantity: i64,
    pub unit: String,
}

impl BatchCreatedEvent {
    pub fn new(
        batch_id: &str,
        created_at: DateTime<Utc>,
        farmer_account_id: &str,
        submission: &BatchSubmission,
        image_cid: Option<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: EVENT_TYPE_BATCH_CREATED,
            batch_id: batch_id.to_string(),
            timestamp: created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            farmer_account_id: farmer_account_id.to_string(),
            product: ProductSnapshot {
                name: submission.product_name.clone(),
                quantity: submission.quantity,
                unit: submission.unit.clone(),
            },
            ipfs_cid: image_cid,
        }
    }
}

pub struct RegistrationService {
    events: Arc<dyn EventLog>,
    minter: Arc<dyn TokenMinter>,
    images: Option<Arc<dyn ImageStore>>,
    repository: Arc<dyn BatchRepository>,
    listings: Arc<ListingCache>,
    topic_id: String,
    token_id: String,
}

impl RegistrationService {
    pub fn new(
        events: Arc<dyn EventLog>,
        minter: Arc<dyn TokenMinter>,
        images: Option<Arc<dyn ImageStore>>,
        repository: Arc<dyn BatchRepository>,
        listings: Arc<ListingCache>,
        topic_id: String,
        token_id: String,
    ) -> Self {
        Self {
            events,
            minter,
            images,
            repository,
            listings,
            topic_id,
            token_id,
        }
    }

    /// Runs one registration end to end and returns the persisted record.
    ///
    /// Ordering: the event submission must have completed before the mint is
    /// attempted. The image upload has no data dependency on the event, so
    /// the two run concurrently and minting waits on both. On any fatal
    /// error nothing is persisted; an event already in the log stays there.
    pub async fn register(
        &self,
        farmer_account_id: &str,
        submission: BatchSubmission,
    ) -> Result<Batch, AppError> {
        let batch_id = Batch::generate_id();
        let created_at = Utc::now();

        let (sequence, asset) = tokio::join!(
            self.publish_creation_event(&batch_id, created_at, farmer_account_id, &submission),
            self.resolve_image(&batch_id, &submission),
        );
        let sequence = sequence?;

        let metadata = self.offchain_metadata(
            &batch_id,
            created_at,
            farmer_account_id,
            &submission,
            sequence.as_ref(),
            &asset,
        );
        let metadata_cid = self.pin_metadata(&batch_id, &metadata).await;

        let serial = self.mint_token(&batch_id, &metadata_cid).await?;
        let nft_id = format!("{}/{}", self.token_id, serial);

        let batch = Batch::new(
            batch_id,
            submission.product_name,
            submission.quantity,
            submission.unit,
            created_at,
            asset.url,
            nft_id,
            self.topic_id.clone(),
            sequence,
            metadata_cid,
            farmer_account_id.to_string(),
        );

        let inserted = self.repository.insert(&batch).await?;
        self.listings.invalidate(farmer_account_id);

        tracing::info!(
            batch_id = %inserted.id,
            nft_id = %inserted.nft_id,
            "batch registered"
        );
        Ok(inserted)
    }

    async fn publish_creation_event(
        &self,
        batch_id: &str,
        created_at: DateTime<Utc>,
        farmer_account_id: &str,
        submission: &BatchSubmission,
    ) -> Result<Option<BigDecimal>, AppError> {
        // The image upload is still in flight at this point, so the event
        // carries no image reference; the off-chain metadata document holds
        // the authoritative link.
        let event =
            BatchCreatedEvent::new(batch_id, created_at, farmer_account_id, submission, None);
        let payload = serde_json::to_vec(&event)
            .map_err(|err| AppError::Internal(format!("unserializable event: {err}")))?;

        let sequence = self
            .events
            .submit_message(&self.topic_id, &payload)
            .await
            .map_err(AppError::LedgerSubmission)?;

        tracing::info!(
            batch_id = %batch_id,
            topic_id = %self.topic_id,
            sequence = ?sequence,
            "batch creation event submitted"
        );
        Ok(sequence)
    }

    async fn resolve_image(&self, batch_id: &str, submission: &BatchSubmission) -> ImageAsset {
        let Some(upload) = &submission.image else {
            return ImageAsset::placeholder(&submission.product_name);
        };
        let Some(store) = &self.images else {
            tracing::warn!(
                batch_id = %batch_id,
                "pinning service not configured, using placeholder image"
            );
            return ImageAsset::placeholder(&submission.product_name);
        };

        match store.pin_file(&upload.filename, upload.bytes.clone()).await {
            Ok(cid) => ImageAsset::pinned(cid),
            Err(err) => {
                tracing::warn!(
                    batch_id = %batch_id,
                    error = %err,
                    "image upload failed, continuing with placeholder"
                );
                ImageAsset::placeholder(&submission.product_name)
            }
        }
    }

    /// Off-chain metadata document for the token, linking the batch, the
    /// ledger coordinates and the image.
    fn offchain_metadata(
        &self,
        batch_id: &str,
        created_at: DateTime<Utc>,
        farmer_account_id: &str,
        submission: &BatchSubmission,
        sequence: Option<&BigDecimal>,
        asset: &ImageAsset,
    ) -> serde_json::Value {
        json!({
            "name": format!("Batch {} - {}", batch_id, submission.product_name),
            "description": format!(
                "AgriTrust registered batch of {}",
                submission.product_name
            ),
            "image": format!("ipfs://{}", asset.cid),
            "creator": METADATA_CREATOR,
            "type": "AgriTrust Batch",
            "properties": {
                "batchId": batch_id,
                "topicId": self.topic_id,
                "initialSequence": sequence.map(ToString::to_string),
                "farmerAccountId": farmer_account_id,
                "productType": submission.product_name,
                "quantity": submission.quantity,
                "unit": submission.unit,
                "creationTimestamp": created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            },
        })
    }

    async fn pin_metadata(&self, batch_id: &str, document: &serde_json::Value) -> String {
        let Some(store) = &self.images else {
            return PLACEHOLDER_METADATA_CID.to_string();
        };

        match store
            .pin_json(&format!("{batch_id}-metadata.json"), document)
            .await
        {
            Ok(cid) => cid,
            Err(err) => {
                tracing::warn!(
                    batch_id = %batch_id,
                    error = %err,
                    "metadata upload failed, continuing with placeholder reference"
                );
                PLACEHOLDER_METADATA_CID.to_string()
            }
        }
    }

    /// Mints the single token for this batch. The on-chain payload is only
    /// the metadata reference, never the document itself.
    async fn mint_token(&self, batch_id: &str, metadata_cid: &str) -> Result<String, AppError> {
        let onchain = format!("ipfs://{metadata_cid}");
        if onchain.len() > ONCHAIN_METADATA_MAX_BYTES {
            return Err(AppError::Mint(LedgerError::MetadataTooLarge {
                size: onchain.len(),
            }));
        }

        let serial = self
            .minter
            .mint(&self.token_id, onchain.as_bytes())
            .await
            .map_err(AppError::Mint)?;

        tracing::info!(
            batch_id = %batch_id,
            token_id = %self.token_id,
            serial = %serial,
            "batch token minted"
        );
        Ok(serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> BatchSubmission {
        BatchSubmission {
            product_name: "Roma Tomatoes".to_string(),
            quantity: 500,
            unit: "KG".to_string(),
            image: None,
        }
    }

    #[test]
    fn event_document_uses_canonical_keys() {
        let created_at = Utc::now();
        let event = BatchCreatedEvent::new(
            "B-1A2B3C4D",
            created_at,
            "0.0.5768282",
            &submission(),
            None,
        );

        let value = serde_json::to_value(&event).expect("serializable");
        assert_eq!(value["eventType"], "BATCH_CREATED");
        assert_eq!(value["batchId"], "B-1A2B3C4D");
        assert_eq!(value["farmerAccountId"], "0.0.5768282");
        assert_eq!(value["product"]["name"], "Roma Tomatoes");
        assert_eq!(value["product"]["quantity"], 500);
        // No image reference on the concurrent path.
        assert!(value.get("ipfsCid").is_none());
    }

    #[test]
    fn event_can_carry_an_image_reference() {
        let event = BatchCreatedEvent::new(
            "B-1A2B3C4D",
            Utc::now(),
            "0.0.5768282",
            &submission(),
            Some("bafybeirealcid".to_string()),
        );

        let value = serde_json::to_value(&event).expect("serializable");
        assert_eq!(value["ipfsCid"], "bafybeirealcid");
    }

    #[test]
    fn event_timestamps_are_iso8601() {
        let created_at = "2026-08-07T10:00:00.123Z"
            .parse::<DateTime<Utc>>()
            .expect("valid timestamp");
        let event =
            BatchCreatedEvent::new("B-1A2B3C4D", created_at, "0.0.5768282", &submission(), None);

        assert_eq!(event.timestamp, "2026-08-07T10:00:00.123Z");
    }
}
