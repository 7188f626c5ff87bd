use crate::domain::payment::{PaymentMethodKind, PaymentState};
use thiserror::Error;

/// Failures reported by a [`GatewayClient`](crate::domain::ports::GatewayClient).
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("gateway answered {status} for {url}")]
    Status { status: u16, url: String },
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
    #[error("refusing to send credentials to {0}")]
    UntrustedUrl(String),
}

#[derive(Error, Debug)]
pub enum PayhookError {
    #[error("webhook public key does not match the configured key")]
    Security,
    #[error("invalid webhook payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),
    #[error("no status mapper supports payment method {0}")]
    NoMapperFound(PaymentMethodKind),
    #[error("status mapper {mapper} overlaps with {existing} on payment method {kind}")]
    MapperConflict {
        mapper: &'static str,
        existing: &'static str,
        kind: PaymentMethodKind,
    },
    #[error("payment {payment_id} ({kind}) in state {state} cannot be mapped to an order status")]
    UnmappableState {
        payment_id: String,
        kind: PaymentMethodKind,
        state: PaymentState,
    },
    #[error("gateway request failed: {0}")]
    RemoteFetch(#[from] GatewayError),
    #[error("{resource} {id} carries no payment reference")]
    DataIntegrity { resource: String, id: String },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("Repository error: {0}")]
    Repository(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),
}

pub type Result<T> = std::result::Result<T, PayhookError>;
