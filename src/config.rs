use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::str::FromStr;

use crate::ledger::{MAINNET_GATEWAY_URL, TESTNET_GATEWAY_URL};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum LedgerNetwork {
    Testnet,
    Mainnet,
}

impl LedgerNetwork {
    pub fn default_gateway_url(self) -> &'static str {
        match self {
            LedgerNetwork::Testnet => TESTNET_GATEWAY_URL,
            LedgerNetwork::Mainnet => MAINNET_GATEWAY_URL,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LedgerNetwork::Testnet => "testnet",
            LedgerNetwork::Mainnet => "mainnet",
        }
    }
}

impl FromStr for LedgerNetwork {
    type Err = std::convert::Infallible;

    // Anything that is not explicitly mainnet runs against testnet.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.eq_ignore_ascii_case("mainnet") {
            Ok(LedgerNetwork::Mainnet)
        } else {
            Ok(LedgerNetwork::Testnet)
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub ledger_network: LedgerNetwork,
    pub ledger_gateway_url: String,
    pub operator_account_id: String,
    pub operator_private_key: String,
    pub batch_topic_id: String,
    pub batch_token_id: String,
    /// Pinning credentials are optional; without them image uploads degrade
    /// to the placeholder path instead of failing registrations.
    pub pinning_api_url: Option<String>,
    pub pinning_api_token: Option<String>,
    pub cors_allowed_origins: Option<String>,
    pub log_request_body: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        let ledger_network = env::var("LEDGER_NETWORK")
            .unwrap_or_else(|_| "testnet".to_string())
            .parse::<LedgerNetwork>()
            .unwrap_or(LedgerNetwork::Testnet);
        let ledger_gateway_url = env::var("LEDGER_GATEWAY_URL")
            .unwrap_or_else(|_| ledger_network.default_gateway_url().to_string());

        Ok(Config {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            database_url: env::var("DATABASE_URL")?,
            ledger_network,
            ledger_gateway_url,
            operator_account_id: env::var("OPERATOR_ACCOUNT_ID")?,
            operator_private_key: env::var("OPERATOR_PRIVATE_KEY")?,
            batch_topic_id: env::var("BATCH_TOPIC_ID")?,
            batch_token_id: env::var("BATCH_TOKEN_ID")?,
            pinning_api_url: env::var("PINNING_API_URL").ok(),
            pinning_api_token: env::var("PINNING_API_TOKEN").ok(),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS").ok(),
            log_request_body: env::var("LOG_REQUEST_BODY")
                .map(|raw| raw == "true")
                .unwrap_or(false),
        })
    }

    pub fn pinning_configured(&self) -> bool {
        self.pinning_api_url.is_some() && self.pinning_api_token.is_some()
    }
}
