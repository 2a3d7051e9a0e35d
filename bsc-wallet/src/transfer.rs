//! Native-currency transfer as an explicit pipeline of named stages.
//!
//! ```text
//! Nonce ─▶ GasPrice ─▶ ChainId ─▶ build ─▶ Sign ─▶ Broadcast ─▶ TxHash
//! ```
//!
//! Each remote stage is one round trip with its own error kind. The first
//! failure stops the pipeline, so nothing is broadcast after a failed query.

use std::fmt;

use alloy::consensus::{SignableTransaction, Signed, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, B256, Bytes, TxKind, U256};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::hd::Identity;
use crate::node::NodeClient;

/// Gas consumed by a plain value transfer.
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// A named step of the transfer pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Pending nonce lookup.
    Nonce,
    /// Suggested gas price lookup.
    GasPrice,
    /// Chain id lookup.
    ChainId,
    /// Local EIP-155 signing.
    Sign,
    /// Raw transaction broadcast.
    Broadcast,
}

impl Stage {
    /// Stage name for logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Nonce => "nonce",
            Self::GasPrice => "gas_price",
            Self::ChainId => "chain_id",
            Self::Sign => "sign",
            Self::Broadcast => "broadcast",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Keccak-256 digest of a signed transaction's encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash(pub B256);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<TxHash> for B256 {
    fn from(hash: TxHash) -> Self {
        hash.0
    }
}

/// Chain state gathered by the query stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferQuote {
    /// Sender's next nonce.
    pub nonce: u64,
    /// Gas price in base units.
    pub gas_price: u128,
    /// Chain id the signature is bound to.
    pub chain_id: u64,
}

/// A signed transaction ready for broadcast.
#[derive(Debug, Clone)]
pub struct SignedTransfer {
    envelope: TxEnvelope,
    encoded: Vec<u8>,
}

impl SignedTransfer {
    /// Transaction id.
    #[must_use]
    pub fn hash(&self) -> TxHash {
        TxHash(*self.envelope.tx_hash())
    }

    /// Raw bytes sent to the node.
    #[must_use]
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    /// The signed legacy transaction.
    #[must_use]
    pub fn legacy(&self) -> Option<&Signed<TxLegacy>> {
        self.envelope.as_legacy()
    }
}

/// Build an unsigned legacy value transfer with no calldata.
#[must_use]
pub fn build_legacy_transfer(to: Address, value: U256, quote: TransferQuote) -> TxLegacy {
    TxLegacy {
        chain_id: Some(quote.chain_id),
        nonce: quote.nonce,
        gas_price: quote.gas_price,
        gas_limit: TRANSFER_GAS_LIMIT,
        to: TxKind::Call(to),
        value,
        input: Bytes::new(),
    }
}

/// Sign `tx` with `identity`'s key over its EIP-155 signing hash.
///
/// ECDSA nonces follow RFC 6979, so equal inputs give equal output.
///
/// # Errors
///
/// Returns [`Error::Signing`] if the signer rejects the transaction.
pub fn sign_transfer(identity: &Identity, mut tx: TxLegacy) -> Result<SignedTransfer> {
    let signature = identity
        .signer()
        .sign_transaction_sync(&mut tx)
        .map_err(|e| Error::Signing(e.to_string()))?;

    let envelope = TxEnvelope::from(tx.into_signed(signature));
    let encoded = envelope.encoded_2718();
    Ok(SignedTransfer { envelope, encoded })
}

/// Runs the transfer stages against a node on behalf of one identity.
#[derive(Debug)]
pub struct TransferPipeline<'a> {
    node: &'a dyn NodeClient,
    identity: &'a Identity,
}

impl<'a> TransferPipeline<'a> {
    /// Create a pipeline.
    #[must_use]
    pub const fn new(node: &'a dyn NodeClient, identity: &'a Identity) -> Self {
        Self { node, identity }
    }

    /// Stage 1: the sender's pending nonce.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NonceQuery`] on node failure.
    pub async fn fetch_nonce(&self) -> Result<u64> {
        let nonce = self
            .node
            .pending_nonce_at(self.identity.address())
            .await
            .map_err(Error::NonceQuery)?;
        debug!(stage = %Stage::Nonce, nonce, "transfer stage complete");
        Ok(nonce)
    }

    /// Stage 2: the suggested gas price.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GasPriceQuery`] on node failure.
    pub async fn fetch_gas_price(&self) -> Result<u128> {
        let gas_price = self
            .node
            .suggest_gas_price()
            .await
            .map_err(Error::GasPriceQuery)?;
        debug!(stage = %Stage::GasPrice, gas_price, "transfer stage complete");
        Ok(gas_price)
    }

    /// Stage 3: the chain id to bind the signature to.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChainIdQuery`] on node failure.
    pub async fn fetch_chain_id(&self) -> Result<u64> {
        let chain_id = self.node.chain_id().await.map_err(Error::ChainIdQuery)?;
        debug!(stage = %Stage::ChainId, chain_id, "transfer stage complete");
        Ok(chain_id)
    }

    /// Stages 1 to 3 in order.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing stage.
    pub async fn quote(&self) -> Result<TransferQuote> {
        let nonce = self.fetch_nonce().await?;
        let gas_price = self.fetch_gas_price().await?;
        let chain_id = self.fetch_chain_id().await?;
        Ok(TransferQuote {
            nonce,
            gas_price,
            chain_id,
        })
    }

    /// Stage 5: sign a built transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Signing`] if signing fails.
    pub fn sign(&self, tx: TxLegacy) -> Result<SignedTransfer> {
        let signed = sign_transfer(self.identity, tx)?;
        debug!(stage = %Stage::Sign, tx_hash = %signed.hash(), "transfer stage complete");
        Ok(signed)
    }

    /// Stage 6: broadcast a signed transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Broadcast`] if the node rejects it.
    pub async fn broadcast(&self, signed: &SignedTransfer) -> Result<TxHash> {
        self.node
            .send_raw_transaction(signed.encoded())
            .await
            .map_err(Error::Broadcast)?;
        Ok(signed.hash())
    }

    /// Run every stage and return the broadcast transaction's id.
    ///
    /// # Errors
    ///
    /// Returns the stage-specific error of the first failing stage.
    pub async fn run(&self, to: Address, value: U256) -> Result<TxHash> {
        let quote = self.quote().await?;
        let tx = build_legacy_transfer(to, value, quote);
        let signed = self.sign(tx)?;
        let hash = self.broadcast(&signed).await?;

        info!(
            from = %self.identity.address(),
            to = %to,
            value = %value,
            nonce = quote.nonce,
            chain_id = quote.chain_id,
            tx_hash = %hash,
            "transfer broadcast",
        );
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, keccak256};

    use super::*;
    use crate::hd::derive;
    use crate::node::mock::MockNode;
    use crate::path::DEFAULT_PATH;

    const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
    const RECIPIENT: Address = address!("0x000000000000000000000000000000000000dead");

    fn identity() -> Identity {
        derive(TEST_MNEMONIC, DEFAULT_PATH).unwrap()
    }

    fn quote() -> TransferQuote {
        TransferQuote {
            nonce: 3,
            gas_price: 5_000_000_000,
            chain_id: 97,
        }
    }

    fn signed(identity: &Identity, quote: TransferQuote) -> SignedTransfer {
        sign_transfer(identity, build_legacy_transfer(RECIPIENT, U256::from(1u8), quote)).unwrap()
    }

    #[test]
    fn test_build_legacy_transfer() {
        let tx = build_legacy_transfer(RECIPIENT, U256::from(42u8), quote());
        assert_eq!(tx.gas_limit, TRANSFER_GAS_LIMIT);
        assert_eq!(tx.chain_id, Some(97));
        assert_eq!(tx.nonce, 3);
        assert_eq!(tx.gas_price, 5_000_000_000);
        assert_eq!(tx.to, TxKind::Call(RECIPIENT));
        assert!(tx.input.is_empty());
    }

    #[test]
    fn test_signing_is_deterministic() {
        let identity = identity();
        let a = signed(&identity, quote());
        let b = signed(&identity, quote());
        assert_eq!(a.encoded(), b.encoded());
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn test_hash_is_keccak_of_encoding() {
        let signed = signed(&identity(), quote());
        assert_eq!(signed.hash().0, keccak256(signed.encoded()));
        assert!(signed.hash().to_string().starts_with("0x"));
        assert_eq!(signed.hash().to_string().len(), 66);
    }

    #[test]
    fn test_signature_recovers_sender() {
        let identity = identity();
        let signed = signed(&identity, quote());
        let legacy = signed.legacy().unwrap();
        let sender = legacy
            .signature()
            .recover_address_from_prehash(&legacy.tx().signature_hash())
            .unwrap();
        assert_eq!(sender, identity.address());
        assert_eq!(legacy.tx().chain_id, Some(97));
    }

    #[test]
    fn test_chain_id_changes_signature() {
        let identity = identity();
        let mainnet = TransferQuote {
            chain_id: 56,
            ..quote()
        };
        assert_ne!(signed(&identity, quote()).hash(), signed(&identity, mainnet).hash());
    }

    #[test]
    fn test_signed_transfer_keeps_fields() {
        let signed = signed(&identity(), quote());
        let tx = signed.legacy().unwrap().tx();
        assert_eq!(tx.nonce, 3);
        assert_eq!(tx.value, U256::from(1u8));
        assert_eq!(tx.gas_limit, TRANSFER_GAS_LIMIT);
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Nonce.to_string(), "nonce");
        assert_eq!(Stage::GasPrice.name(), "gas_price");
        assert_eq!(Stage::Broadcast.to_string(), "broadcast");
    }

    #[tokio::test]
    async fn test_run_executes_stages_in_order() {
        let node = MockNode::healthy();
        let identity = identity();
        let pipeline = TransferPipeline::new(&node, &identity);

        let hash = pipeline.run(RECIPIENT, U256::from(1000u32)).await.unwrap();

        assert_eq!(
            node.calls(),
            vec![
                "eth_getTransactionCount",
                "eth_gasPrice",
                "eth_chainId",
                "eth_sendRawTransaction",
            ]
        );
        let sent = node.broadcasts();
        assert_eq!(sent.len(), 1);
        assert_eq!(hash.0, keccak256(&sent[0]));
    }

    #[tokio::test]
    async fn test_quote_collects_chain_state() {
        let node = MockNode::healthy();
        let identity = identity();
        let quote = TransferPipeline::new(&node, &identity).quote().await.unwrap();
        assert_eq!(
            quote,
            TransferQuote {
                nonce: 7,
                gas_price: 3_000_000_000,
                chain_id: 97,
            }
        );
    }

    #[tokio::test]
    async fn test_each_stage_has_its_own_error() {
        let identity = identity();

        let node = MockNode {
            gas_price: None,
            ..MockNode::healthy()
        };
        let err = TransferPipeline::new(&node, &identity)
            .run(RECIPIENT, U256::from(1u8))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::GasPriceQuery(_)));
        assert_eq!(err.stage(), Some(Stage::GasPrice));
        assert!(node.broadcasts().is_empty());

        let node = MockNode {
            chain_id: None,
            ..MockNode::healthy()
        };
        let err = TransferPipeline::new(&node, &identity)
            .run(RECIPIENT, U256::from(1u8))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ChainIdQuery(_)));
        assert!(node.broadcasts().is_empty());

        let node = MockNode {
            accept_broadcast: false,
            ..MockNode::healthy()
        };
        let err = TransferPipeline::new(&node, &identity)
            .run(RECIPIENT, U256::from(1u8))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Broadcast(_)));
        assert_eq!(err.stage(), Some(Stage::Broadcast));
    }

    #[tokio::test]
    async fn test_unreachable_node_fails_at_nonce() {
        let node = MockNode::unreachable();
        let identity = identity();
        let err = TransferPipeline::new(&node, &identity)
            .run(RECIPIENT, U256::from(1u8))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NonceQuery(_)));
        assert_eq!(node.calls(), vec!["eth_getTransactionCount"]);
        assert!(node.broadcasts().is_empty());
    }
}
