use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle states of a registered batch. This service only ever writes
/// `Registered`; the remaining states are driven by downstream systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum BatchStatus {
    Registered,
    Verifying,
    Certified,
    Listed,
    #[serde(rename = "In Transit")]
    InTransit,
    Sold,
    #[serde(rename = "Needs Attention")]
    NeedsAttention,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Registered => "Registered",
            BatchStatus::Verifying => "Verifying",
            BatchStatus::Certified => "Certified",
            BatchStatus::Listed => "Listed",
            BatchStatus::InTransit => "In Transit",
            BatchStatus::Sold => "Sold",
            BatchStatus::NeedsAttention => "Needs Attention",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Registered" => Ok(BatchStatus::Registered),
            "Verifying" => Ok(BatchStatus::Verifying),
            "Certified" => Ok(BatchStatus::Certified),
            "Listed" => Ok(BatchStatus::Listed),
            "In Transit" => Ok(BatchStatus::InTransit),
            "Sold" => Ok(BatchStatus::Sold),
            "Needs Attention" => Ok(BatchStatus::NeedsAttention),
            other => Err(format!("unknown batch status: {other}")),
        }
    }
}

/// Durable record of one registered batch, joining the product snapshot with
/// the ledger coordinates, the minted token id and the image reference.
///
/// The sequence number is arbitrary precision and crosses the wire as a
/// decimal string; coercing it through a native float would lose digits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit: String,
    pub status: BatchStatus,
    #[schema(value_type = String)]
    pub creation_date: DateTime<Utc>,
    pub image_url: String,
    /// Composite token identifier, `<classId>/<serial>`. Unique across all
    /// records.
    pub nft_id: String,
    pub topic_id: String,
    #[serde(with = "decimal_string")]
    #[schema(value_type = Option<String>)]
    pub sequence_number: Option<BigDecimal>,
    pub metadata_cid: String,
    pub farmer_account_id: String,
}

impl Batch {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        product_name: String,
        quantity: i64,
        unit: String,
        creation_date: DateTime<Utc>,
        image_url: String,
        nft_id: String,
        topic_id: String,
        sequence_number: Option<BigDecimal>,
        metadata_cid: String,
        farmer_account_id: String,
    ) -> Self {
        Self {
            id,
            product_name,
            quantity,
            unit,
            status: BatchStatus::Registered,
            creation_date,
            image_url,
            nft_id,
            topic_id,
            sequence_number,
            metadata_cid,
            farmer_account_id,
        }
    }

    pub fn generate_id() -> String {
        let hex = Uuid::new_v4().simple().to_string();
        format!("B-{}", hex[..8].to_uppercase())
    }
}

/// Serializes an optional arbitrary-precision integer as a decimal string.
pub mod decimal_string {
    use bigdecimal::BigDecimal;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S>(value: &Option<BigDecimal>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(number) => serializer.serialize_some(&number.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<BigDecimal>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|text| BigDecimal::from_str(&text).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_batch(sequence: Option<&str>) -> Batch {
        Batch::new(
            "B-1A2B3C4D".to_string(),
            "Roma Tomatoes".to_string(),
            500,
            "KG".to_string(),
            Utc::now(),
            "/placeholder-roma-tomatoes.jpg".to_string(),
            "0.0.456/7".to_string(),
            "0.0.123".to_string(),
            sequence.map(|s| s.parse().expect("valid decimal")),
            "bafkreimetadata".to_string(),
            "0.0.5768282".to_string(),
        )
    }

    #[test]
    fn new_batch_starts_registered() {
        let batch = sample_batch(Some("42"));
        assert_eq!(batch.status, BatchStatus::Registered);
    }

    #[test]
    fn generated_ids_have_batch_prefix() {
        let id = Batch::generate_id();
        assert!(id.starts_with("B-"));
        assert_eq!(id.len(), 10);
        assert!(id[2..].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn status_round_trips_through_display() {
        for status in [
            BatchStatus::Registered,
            BatchStatus::Verifying,
            BatchStatus::Certified,
            BatchStatus::Listed,
            BatchStatus::InTransit,
            BatchStatus::Sold,
            BatchStatus::NeedsAttention,
        ] {
            assert_eq!(status.as_str().parse::<BatchStatus>(), Ok(status));
        }
    }

    #[test]
    fn sequence_serializes_as_decimal_string() {
        // 2^53 + 1: representable as a decimal string, not as an f64.
        let batch = sample_batch(Some("9007199254740993"));
        let json = serde_json::to_value(&batch).expect("serializable");

        assert_eq!(json["sequenceNumber"], "9007199254740993");
        assert_eq!(json["status"], "Registered");

        let parsed: Batch = serde_json::from_value(json).expect("deserializable");
        assert_eq!(parsed.sequence_number, batch.sequence_number);
        assert_eq!(parsed.creation_date, batch.creation_date);
    }

    #[test]
    fn null_sequence_survives_round_trip() {
        let batch = sample_batch(None);
        let json = serde_json::to_value(&batch).expect("serializable");
        assert!(json["sequenceNumber"].is_null());

        let parsed: Batch = serde_json::from_value(json).expect("deserializable");
        assert_eq!(parsed.sequence_number, None);
    }
}
