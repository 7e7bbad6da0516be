mod client;

pub use client::{
    LedgerClient, LedgerError, OperatorCredentials, MAINNET_GATEWAY_URL,
    ONCHAIN_METADATA_MAX_BYTES, TESTNET_GATEWAY_URL,
};
