use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bigdecimal::BigDecimal;
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::ports::{EventLog, TokenMinter};

type HmacSha256 = Hmac<Sha256>;

pub const TESTNET_GATEWAY_URL: &str = "https://gateway.testnet.agritrust.network";
pub const MAINNET_GATEWAY_URL: &str = "https://gateway.agritrust.network";

/// The on-chain token metadata holds only the off-chain reference; the
/// network rejects anything larger.
pub const ONCHAIN_METADATA_MAX_BYTES: usize = 100;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("gateway request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("gateway rejected the submission ({status}): {message}")]
    Gateway { status: String, message: String },
    #[error("invalid response from gateway: {0}")]
    InvalidResponse(String),
    #[error("gateway circuit breaker is open")]
    CircuitOpen,
    #[error("on-chain metadata is {size} bytes, limit is {ONCHAIN_METADATA_MAX_BYTES}")]
    MetadataTooLarge { size: usize },
}

/// Platform-held signing identity. All outbound ledger submissions are made
/// by the platform operator, never by an end-user credential.
#[derive(Clone)]
pub struct OperatorCredentials {
    account_id: String,
    private_key: String,
}

impl OperatorCredentials {
    pub fn new(account_id: String, private_key: String) -> Self {
        Self {
            account_id,
            private_key,
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }
}

impl std::fmt::Debug for OperatorCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorCredentials")
            .field("account_id", &self.account_id)
            .field("private_key", &"****")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct SubmitMessageResponse {
    sequence_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MintResponse {
    serials: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CreateTopicResponse {
    topic_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateTokenResponse {
    token_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct GatewayErrorBody {
    status: Option<String>,
    message: Option<String>,
}

/// HTTP client for the ledger REST gateway: topic message submission, NFT
/// minting and one-off provisioning. Requests are signed with an
/// HMAC-SHA256 digest of the body under the operator key.
#[derive(Clone)]
pub struct LedgerClient {
    client: Client,
    base_url: String,
    operator: OperatorCredentials,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl LedgerClient {
    pub fn new(base_url: String, operator: OperatorCredentials) -> Self {
        Self::with_circuit_breaker(base_url, operator, 3, 60)
    }

    pub fn with_circuit_breaker(
        base_url: String,
        operator: OperatorCredentials,
        failure_threshold: u32,
        reset_timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(
            Duration::from_secs(reset_timeout_secs),
            Duration::from_secs(reset_timeout_secs * 2),
        );
        let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        LedgerClient {
            client,
            base_url,
            operator,
            circuit_breaker,
        }
    }

    /// Returns the current state of the circuit breaker
    pub fn circuit_state(&self) -> String {
        if self.circuit_breaker.is_call_permitted() {
            "closed".to_string()
        } else {
            "open".to_string()
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn sign(&self, payload: &[u8]) -> Result<String, LedgerError> {
        let mut mac = HmacSha256::new_from_slice(self.operator.private_key.as_bytes())
            .map_err(|err| LedgerError::InvalidResponse(format!("operator key unusable: {err}")))?;
        mac.update(payload);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    async fn post_signed<T>(&self, path: &str, body: serde_json::Value) -> Result<T, LedgerError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let payload = serde_json::to_vec(&body)
            .map_err(|err| LedgerError::InvalidResponse(format!("unserializable request: {err}")))?;
        let signature = self.sign(&payload)?;
        let account_id = self.operator.account_id.clone();
        let client = self.client.clone();

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client
                    .post(&url)
                    .header("content-type", "application/json")
                    .header("x-operator-account", account_id)
                    .header("x-operator-signature", signature)
                    .body(payload)
                    .send()
                    .await?;

                let status = response.status();
                if !status.is_success() {
                    let error_body = response
                        .json::<GatewayErrorBody>()
                        .await
                        .unwrap_or_default();
                    return Err(LedgerError::Gateway {
                        status: error_body
                            .status
                            .unwrap_or_else(|| status.as_u16().to_string()),
                        message: error_body
                            .message
                            .unwrap_or_else(|| "gateway returned an error".to_string()),
                    });
                }

                let parsed = response.json::<T>().await?;
                Ok(parsed)
            })
            .await;

        match result {
            Ok(parsed) => Ok(parsed),
            Err(FailsafeError::Rejected) => Err(LedgerError::CircuitOpen),
            Err(FailsafeError::Inner(err)) => Err(err),
        }
    }

    /// Submits an opaque message to the topic. The gateway answers with the
    /// log-assigned sequence number; a null sequence is passed through, not
    /// treated as a failure.
    pub async fn submit_topic_message(
        &self,
        topic_id: &str,
        message: &[u8],
    ) -> Result<Option<BigDecimal>, LedgerError> {
        let response: SubmitMessageResponse = self
            .post_signed(
                &format!("/topics/{}/messages", topic_id),
                json!({ "message": BASE64.encode(message) }),
            )
            .await?;

        response
            .sequence_number
            .map(|raw| {
                BigDecimal::from_str(&raw).map_err(|_| {
                    LedgerError::InvalidResponse(format!("unparseable sequence number: {raw}"))
                })
            })
            .transpose()
    }

    /// Mints exactly one serial against the token class. The metadata bytes
    /// must fit the on-chain ceiling; oversized payloads are rejected locally
    /// before anything is signed.
    pub async fn mint_nft(&self, token_id: &str, metadata: &[u8]) -> Result<String, LedgerError> {
        if metadata.len() > ONCHAIN_METADATA_MAX_BYTES {
            return Err(LedgerError::MetadataTooLarge {
                size: metadata.len(),
            });
        }

        let response: MintResponse = self
            .post_signed(
                &format!("/tokens/{}/mint", token_id),
                json!({ "metadata": [BASE64.encode(metadata)] }),
            )
            .await?;

        response
            .serials
            .into_iter()
            .next()
            .ok_or_else(|| LedgerError::InvalidResponse("mint returned no serials".to_string()))
    }

    /// Provisions a new event topic. One-off operator action, used by the
    /// `provision topic` subcommand.
    pub async fn create_topic(&self, memo: &str) -> Result<String, LedgerError> {
        let response: CreateTopicResponse = self
            .post_signed("/topics", json!({ "memo": memo }))
            .await?;
        Ok(response.topic_id)
    }

    /// Provisions the NFT token class the batches are minted under.
    pub async fn create_nft_token(
        &self,
        name: &str,
        symbol: &str,
        memo: &str,
    ) -> Result<String, LedgerError> {
        let response: CreateTokenResponse = self
            .post_signed(
                "/tokens",
                json!({
                    "name": name,
                    "symbol": symbol,
                    "memo": memo,
                    "token_type": "NON_FUNGIBLE_UNIQUE",
                    "supply_type": "INFINITE",
                }),
            )
            .await?;
        Ok(response.token_id)
    }
}

#[async_trait]
impl EventLog for LedgerClient {
    async fn submit_message(
        &self,
        topic_id: &str,
        message: &[u8],
    ) -> Result<Option<BigDecimal>, LedgerError> {
        self.submit_topic_message(topic_id, message).await
    }
}

#[async_trait]
impl TokenMinter for LedgerClient {
    async fn mint(&self, token_id: &str, metadata: &[u8]) -> Result<String, LedgerError> {
        self.mint_nft(token_id, metadata).await
    }
}
