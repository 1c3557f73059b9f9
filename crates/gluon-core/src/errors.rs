//! Error types for the Gluon toolkit

use thiserror::Error;

/// Top-level error returned by every Gluon operation
#[derive(Debug, Error)]
pub enum Error {
    #[error("Upstream unavailable: {0}")]
    Upstream(#[from] NodeError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] TxError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Ledger gateway failures (node unreachable, bad responses, missing boxes)
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Node unreachable at {url}")]
    Unreachable { url: String },

    #[error("Node returned error: {message}")]
    ApiError { message: String },

    #[error("Feature requires extraIndex: {feature}")]
    ExtraIndexRequired { feature: &'static str },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Box not found: {box_id}")]
    BoxNotFound { box_id: String },
}

/// Protocol-level errors raised while decoding state or quoting
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Protocol state unavailable: {reason}")]
    StateUnavailable { reason: String },

    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    #[error("Invalid epoch request: {requested} days exceeds the {max}-day window")]
    InvalidEpochRequest { requested: usize, max: usize },

    #[error("Failed to parse box data: {message}")]
    BoxParseError { message: String },
}

/// A token whose inputs do not cover the planned outputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenShortfall {
    pub token_id: String,
    pub missing: i64,
}

/// Transaction assembly errors
#[derive(Debug, Error)]
pub enum TxError {
    #[error("No UTXOs provided")]
    NoUtxos,

    #[error("Insufficient funds: missing {erg_missing} nanoERG, tokens {tokens_missing:?}")]
    InsufficientFunds {
        erg_missing: i64,
        tokens_missing: Vec<TokenShortfall>,
    },

    #[error("Failed to build transaction: {message}")]
    BuildFailed { message: String },
}

/// Result type alias for Gluon operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Stable machine-readable code for integrators
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Upstream(_) => "upstream_unavailable",
            Self::Protocol(e) => e.error_code(),
            Self::Transaction(e) => e.error_code(),
            Self::Config(_) => "configuration_error",
        }
    }
}

impl ProtocolError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::StateUnavailable { .. } => "state_unavailable",
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::InvalidEpochRequest { .. } => "invalid_epoch_request",
            Self::BoxParseError { .. } => "box_parse_error",
        }
    }
}

impl TxError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoUtxos => "no_utxos",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::BuildFailed { .. } => "build_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_codes() {
        let err = ProtocolError::InvalidEpochRequest {
            requested: 15,
            max: 14,
        };
        assert_eq!(err.error_code(), "invalid_epoch_request");
        assert_eq!(
            err.to_string(),
            "Invalid epoch request: 15 days exceeds the 14-day window"
        );

        let err: Error = ProtocolError::InvalidAmount {
            message: "test".into(),
        }
        .into();
        assert_eq!(err.error_code(), "invalid_amount");
    }

    #[test]
    fn test_upstream_and_funds_codes() {
        let err: Error = NodeError::BoxNotFound {
            box_id: "abc".into(),
        }
        .into();
        assert_eq!(err.error_code(), "upstream_unavailable");

        let err: Error = TxError::InsufficientFunds {
            erg_missing: 60,
            tokens_missing: vec![],
        }
        .into();
        assert_eq!(err.error_code(), "insufficient_funds");
        assert!(err.to_string().contains("missing 60 nanoERG"));
    }
}
