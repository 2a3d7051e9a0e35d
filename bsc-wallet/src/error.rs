//! Error types for wallet operations.
//!
//! Every failure is terminal for the call that produced it. Remote node
//! failures keep the underlying [`NodeError`] as their source so callers can
//! decide on their own retry policy.

use crate::node::NodeError;
use crate::transfer::Stage;

/// Result type alias for wallet operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the wallet client.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The mnemonic phrase was rejected (unknown word, checksum, word count).
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    /// A derivation path segment could not be parsed.
    #[error("invalid path segment '{0}'")]
    InvalidPathSegment(String),

    /// BIP-32 master or child key derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// The node endpoint could not be reached at construction time.
    #[error("failed to connect to '{url}': {source}")]
    Connection {
        /// The endpoint URL.
        url: String,
        /// The underlying node failure.
        #[source]
        source: NodeError,
    },

    /// Balance lookup failed.
    #[error("failed to get balance: {0}")]
    BalanceQuery(#[source] NodeError),

    /// Gas price lookup for a fee estimate failed.
    #[error("failed to estimate transfer fee: {0}")]
    FeeEstimation(#[source] NodeError),

    /// Pending nonce lookup failed.
    #[error("failed to get nonce: {0}")]
    NonceQuery(#[source] NodeError),

    /// Gas price lookup for a transfer failed.
    #[error("failed to get gas price: {0}")]
    GasPriceQuery(#[source] NodeError),

    /// Chain id lookup failed.
    #[error("failed to get chain ID: {0}")]
    ChainIdQuery(#[source] NodeError),

    /// The transaction could not be signed.
    #[error("failed to sign transaction: {0}")]
    Signing(String),

    /// The node rejected or failed to receive the signed transaction.
    #[error("failed to send transaction: {0}")]
    Broadcast(#[source] NodeError),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// An amount could not be converted.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

impl Error {
    /// Create a configuration error with a message.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid path segment error.
    #[must_use]
    pub fn invalid_segment(segment: impl Into<String>) -> Self {
        Self::InvalidPathSegment(segment.into())
    }

    /// The transfer stage that produced this error, if any.
    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            Self::NonceQuery(_) => Some(Stage::Nonce),
            Self::GasPriceQuery(_) => Some(Stage::GasPrice),
            Self::ChainIdQuery(_) => Some(Stage::ChainId),
            Self::Signing(_) => Some(Stage::Sign),
            Self::Broadcast(_) => Some(Stage::Broadcast),
            _ => None,
        }
    }

    /// Returns `true` if the error came back from the remote node.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::BalanceQuery(_)
                | Self::FeeEstimation(_)
                | Self::NonceQuery(_)
                | Self::GasPriceQuery(_)
                | Self::ChainIdQuery(_)
                | Self::Broadcast(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_segment_display() {
        let err = Error::invalid_segment("abc");
        assert_eq!(err.to_string(), "invalid path segment 'abc'");
    }

    #[test]
    fn test_stage_mapping() {
        let node = || NodeError::new("eth_call", "boom");
        assert_eq!(Error::NonceQuery(node()).stage(), Some(Stage::Nonce));
        assert_eq!(Error::GasPriceQuery(node()).stage(), Some(Stage::GasPrice));
        assert_eq!(Error::ChainIdQuery(node()).stage(), Some(Stage::ChainId));
        assert_eq!(Error::Signing("bad key".into()).stage(), Some(Stage::Sign));
        assert_eq!(Error::Broadcast(node()).stage(), Some(Stage::Broadcast));
        assert_eq!(Error::BalanceQuery(node()).stage(), None);
    }

    #[test]
    fn test_remote_errors_keep_source() {
        use std::error::Error as _;

        let err = Error::BalanceQuery(NodeError::new("eth_getBalance", "connection refused"));
        assert!(err.is_remote());
        let source = err.source().map(ToString::to_string);
        assert_eq!(
            source.as_deref(),
            Some("eth_getBalance: connection refused")
        );
        assert!(!Error::config("missing").is_remote());
    }
}
