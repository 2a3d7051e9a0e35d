//! Remote node interface.
//!
//! [`NodeClient`] is the narrow surface the wallet needs from a JSON-RPC
//! node. [`RpcNode`] implements it over an alloy HTTP provider; tests and
//! custom transports can supply their own implementation.

use std::fmt;
use std::sync::Arc;

use alloy::network::Ethereum;
use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use async_trait::async_trait;
use tracing::debug;

/// A failed remote call, tagged with the RPC method that failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{method}: {message}")]
pub struct NodeError {
    /// JSON-RPC method name.
    pub method: &'static str,
    /// Transport or node error message.
    pub message: String,
}

impl NodeError {
    /// Create a node error for `method`.
    #[must_use]
    pub fn new(method: &'static str, message: impl fmt::Display) -> Self {
        Self {
            method,
            message: message.to_string(),
        }
    }
}

/// Request/response operations consumed from a remote node.
///
/// Each call is a single round trip with no retry.
#[async_trait]
pub trait NodeClient: Send + Sync + fmt::Debug {
    /// Balance of `address` at the latest block, in base units.
    async fn balance_at(&self, address: Address) -> Result<U256, NodeError>;

    /// Suggested legacy gas price, in base units.
    async fn suggest_gas_price(&self) -> Result<u128, NodeError>;

    /// Next nonce for `address`, counting pending transactions.
    async fn pending_nonce_at(&self, address: Address) -> Result<u64, NodeError>;

    /// Chain id reported by the node.
    async fn chain_id(&self) -> Result<u64, NodeError>;

    /// Broadcast a signed, encoded transaction.
    async fn send_raw_transaction(&self, encoded: &[u8]) -> Result<(), NodeError>;
}

#[async_trait]
impl<T: NodeClient + ?Sized> NodeClient for Arc<T> {
    async fn balance_at(&self, address: Address) -> Result<U256, NodeError> {
        (**self).balance_at(address).await
    }

    async fn suggest_gas_price(&self) -> Result<u128, NodeError> {
        (**self).suggest_gas_price().await
    }

    async fn pending_nonce_at(&self, address: Address) -> Result<u64, NodeError> {
        (**self).pending_nonce_at(address).await
    }

    async fn chain_id(&self) -> Result<u64, NodeError> {
        (**self).chain_id().await
    }

    async fn send_raw_transaction(&self, encoded: &[u8]) -> Result<(), NodeError> {
        (**self).send_raw_transaction(encoded).await
    }
}

/// [`NodeClient`] over an alloy HTTP provider.
#[derive(Clone)]
pub struct RpcNode {
    provider: DynProvider<Ethereum>,
    url: String,
}

impl fmt::Debug for RpcNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcNode")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl RpcNode {
    /// Build a provider for `url`.
    ///
    /// HTTP transports are connectionless, so this only validates the URL;
    /// reachability is checked by the first request.
    ///
    /// # Errors
    ///
    /// Returns a [`NodeError`] if the URL cannot be used as a transport.
    pub async fn connect(url: &str) -> Result<Self, NodeError> {
        let provider = ProviderBuilder::new()
            .connect(url)
            .await
            .map_err(|e| NodeError::new("connect", e))?
            .erased();

        debug!(url, "RPC provider created");
        Ok(Self {
            provider,
            url: url.to_owned(),
        })
    }

    /// The endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The underlying alloy provider.
    #[must_use]
    pub const fn provider(&self) -> &DynProvider<Ethereum> {
        &self.provider
    }
}

#[async_trait]
impl NodeClient for RpcNode {
    async fn balance_at(&self, address: Address) -> Result<U256, NodeError> {
        self.provider
            .get_balance(address)
            .await
            .map_err(|e| NodeError::new("eth_getBalance", e))
    }

    async fn suggest_gas_price(&self) -> Result<u128, NodeError> {
        self.provider
            .get_gas_price()
            .await
            .map_err(|e| NodeError::new("eth_gasPrice", e))
    }

    async fn pending_nonce_at(&self, address: Address) -> Result<u64, NodeError> {
        self.provider
            .get_transaction_count(address)
            .pending()
            .await
            .map_err(|e| NodeError::new("eth_getTransactionCount", e))
    }

    async fn chain_id(&self) -> Result<u64, NodeError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| NodeError::new("eth_chainId", e))
    }

    async fn send_raw_transaction(&self, encoded: &[u8]) -> Result<(), NodeError> {
        let pending = self
            .provider
            .send_raw_transaction(encoded)
            .await
            .map_err(|e| NodeError::new("eth_sendRawTransaction", e))?;
        debug!(tx_hash = %pending.tx_hash(), "raw transaction accepted by node");
        Ok(())
    }
}

/// In-memory node used by unit tests.
#[cfg(test)]
pub(crate) mod mock {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    const REFUSED: &str = "connection refused";

    /// Answers from fixed values; a `None` field fails that method.
    ///
    /// Accepted broadcasts bump the pending nonce like a real mempool would.
    #[derive(Debug, Default)]
    pub(crate) struct MockNode {
        pub(crate) balance: Option<U256>,
        pub(crate) gas_price: Option<u128>,
        pub(crate) nonce: Option<AtomicU64>,
        pub(crate) chain_id: Option<u64>,
        pub(crate) accept_broadcast: bool,
        pub(crate) calls: Mutex<Vec<&'static str>>,
        pub(crate) broadcasts: Mutex<Vec<Vec<u8>>>,
    }

    impl MockNode {
        pub(crate) fn healthy() -> Self {
            Self {
                balance: Some(U256::from(5_000_000_000_000_000_000u128)),
                gas_price: Some(3_000_000_000),
                nonce: Some(AtomicU64::new(7)),
                chain_id: Some(97),
                accept_broadcast: true,
                ..Self::default()
            }
        }

        pub(crate) fn unreachable() -> Self {
            Self::default()
        }

        pub(crate) fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        pub(crate) fn broadcasts(&self) -> Vec<Vec<u8>> {
            self.broadcasts.lock().unwrap().clone()
        }

        fn record(&self, method: &'static str) {
            self.calls.lock().unwrap().push(method);
        }
    }

    fn answer<T>(method: &'static str, value: Option<T>) -> Result<T, NodeError> {
        value.ok_or_else(|| NodeError::new(method, REFUSED))
    }

    #[async_trait]
    impl NodeClient for MockNode {
        async fn balance_at(&self, _address: Address) -> Result<U256, NodeError> {
            self.record("eth_getBalance");
            answer("eth_getBalance", self.balance)
        }

        async fn suggest_gas_price(&self) -> Result<u128, NodeError> {
            self.record("eth_gasPrice");
            answer("eth_gasPrice", self.gas_price)
        }

        async fn pending_nonce_at(&self, _address: Address) -> Result<u64, NodeError> {
            self.record("eth_getTransactionCount");
            answer(
                "eth_getTransactionCount",
                self.nonce.as_ref().map(|n| n.load(Ordering::SeqCst)),
            )
        }

        async fn chain_id(&self) -> Result<u64, NodeError> {
            self.record("eth_chainId");
            answer("eth_chainId", self.chain_id)
        }

        async fn send_raw_transaction(&self, encoded: &[u8]) -> Result<(), NodeError> {
            self.record("eth_sendRawTransaction");
            if !self.accept_broadcast {
                return Err(NodeError::new("eth_sendRawTransaction", "nonce too low"));
            }
            self.broadcasts.lock().unwrap().push(encoded.to_vec());
            if let Some(nonce) = &self.nonce {
                nonce.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_error_display() {
        let err = NodeError::new("eth_gasPrice", "timeout");
        assert_eq!(err.to_string(), "eth_gasPrice: timeout");
        assert_eq!(err.method, "eth_gasPrice");
    }

    #[tokio::test]
    async fn test_connect_accepts_http_url() {
        let node = RpcNode::connect("http://127.0.0.1:1").await.unwrap();
        assert_eq!(node.url(), "http://127.0.0.1:1");
        assert!(format!("{node:?}").contains("127.0.0.1:1"));
    }

    #[tokio::test]
    async fn test_connect_accepts_network_urls() {
        for network in crate::Network::ALL {
            let node = RpcNode::connect(network.url()).await.unwrap();
            assert_eq!(node.url(), network.url());
        }
    }

    #[tokio::test]
    async fn test_unreachable_node_fails_per_method() {
        let node = RpcNode::connect("http://127.0.0.1:1").await.unwrap();
        let err = node.chain_id().await.unwrap_err();
        assert_eq!(err.method, "eth_chainId");
        let err = node.pending_nonce_at(Address::ZERO).await.unwrap_err();
        assert_eq!(err.method, "eth_getTransactionCount");
    }
}
