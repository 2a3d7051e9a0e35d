//! Wallet session: a derived identity bound to one remote node.
//!
//! # Examples
//!
//! ```rust,ignore
//! use bsc_wallet::{Network, Wallet};
//!
//! let wallet = Wallet::builder()
//!     .mnemonic("abandon abandon abandon ...")
//!     .path("m/44'/60'/0'/0/0")
//!     .network(Network::Testnet1S1)
//!     .build()
//!     .await?;
//!
//! let balance = wallet.balance().await?;
//! let fee = wallet.estimate_transfer_fee().await?;
//! let tx = wallet.transfer(recipient, amount).await?;
//! ```

use std::fmt;

use alloy::primitives::{Address, U256};
use tracing::info;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::hd::{self, Identity};
use crate::network::Network;
use crate::node::{NodeClient, RpcNode};
use crate::path::{DEFAULT_PATH, DerivationPath};
use crate::transfer::{TRANSFER_GAS_LIMIT, TransferPipeline, TxHash};

/// Environment variable holding the mnemonic phrase.
pub const ENV_MNEMONIC: &str = "BSC_WALLET_MNEMONIC";
/// Environment variable holding the derivation path.
pub const ENV_PATH: &str = "BSC_WALLET_PATH";
/// Environment variable holding the BIP-39 passphrase.
pub const ENV_PASSPHRASE: &str = "BSC_WALLET_PASSPHRASE";
/// Environment variable naming a [`Network`].
pub const ENV_NETWORK: &str = "BSC_WALLET_NETWORK";
/// Environment variable holding an explicit RPC URL; wins over the network.
pub const ENV_RPC_URL: &str = "BSC_WALLET_RPC_URL";

/// Where the session's node lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// One of the fixed public endpoints.
    Network(Network),
    /// Any JSON-RPC URL.
    Url(String),
}

impl Endpoint {
    /// The JSON-RPC URL.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Network(network) => network.url(),
            Self::Url(url) => url,
        }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::Network(Network::default())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(network) => write!(f, "{network} ({})", network.url()),
            Self::Url(url) => f.write_str(url),
        }
    }
}

/// Builder for [`Wallet`].
///
/// Created by [`Wallet::builder`] or [`WalletBuilder::from_env`].
#[derive(Default)]
pub struct WalletBuilder {
    /// BIP-39 mnemonic phrase.
    mnemonic: Option<Zeroizing<String>>,
    /// BIP-39 passphrase, empty by default.
    passphrase: Option<Zeroizing<String>>,
    /// Derivation path text, [`DEFAULT_PATH`] by default.
    path: Option<String>,
    /// Already derived identity; wins over the mnemonic.
    identity: Option<Identity>,
    /// Node endpoint, mainnet by default.
    endpoint: Endpoint,
}

impl fmt::Debug for WalletBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletBuilder")
            .field("has_mnemonic", &self.mnemonic.is_some())
            .field("path", &self.path)
            .field("identity", &self.identity)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl WalletBuilder {
    /// Read configuration from `BSC_WALLET_*` environment variables.
    ///
    /// `BSC_WALLET_MNEMONIC` is required. `BSC_WALLET_RPC_URL` overrides
    /// `BSC_WALLET_NETWORK`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the mnemonic is missing or the network
    /// name is unknown.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mnemonic = lookup(ENV_MNEMONIC)
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| Error::config(format!("{ENV_MNEMONIC} is not set")))?;

        let mut builder = Self::default().mnemonic(mnemonic);

        if let Some(path) = lookup(ENV_PATH) {
            builder = builder.path(path);
        }
        if let Some(passphrase) = lookup(ENV_PASSPHRASE) {
            builder = builder.passphrase(passphrase);
        }
        if let Some(network) = lookup(ENV_NETWORK) {
            builder = builder.network(network.parse()?);
        }
        if let Some(url) = lookup(ENV_RPC_URL) {
            builder = builder.rpc_url(url);
        }

        Ok(builder)
    }

    /// Set the BIP-39 mnemonic phrase.
    #[must_use]
    pub fn mnemonic(mut self, mnemonic: impl Into<String>) -> Self {
        self.mnemonic = Some(Zeroizing::new(mnemonic.into()));
        self
    }

    /// Set the BIP-39 passphrase (optional "25th word").
    #[must_use]
    pub fn passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(Zeroizing::new(passphrase.into()));
        self
    }

    /// Set the derivation path, e.g. `m/44'/60'/0'/0/0`.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Use an already derived identity instead of a mnemonic.
    #[must_use]
    pub fn identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Connect to one of the named public endpoints.
    #[must_use]
    pub fn network(mut self, network: Network) -> Self {
        self.endpoint = Endpoint::Network(network);
        self
    }

    /// Connect to an explicit JSON-RPC URL.
    #[must_use]
    pub fn rpc_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Endpoint::Url(url.into());
        self
    }

    /// The configured endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Derive the identity this builder describes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if neither an identity nor a mnemonic is
    /// set, otherwise any error of [`hd::derive_at`].
    pub fn derive_identity(&self) -> Result<Identity> {
        if let Some(identity) = &self.identity {
            return Ok(identity.clone());
        }

        let mnemonic = self
            .mnemonic
            .as_ref()
            .ok_or_else(|| Error::config("either mnemonic or identity is required"))?;
        let path: DerivationPath = self.path.as_deref().unwrap_or(DEFAULT_PATH).parse()?;
        let passphrase = self.passphrase.as_ref().map_or("", |p| p.as_str());

        hd::derive_at(mnemonic, passphrase, &path)
    }

    /// Derive the identity, connect to the endpoint and probe it.
    ///
    /// # Errors
    ///
    /// Returns derivation errors, or [`Error::Connection`] if the endpoint
    /// cannot be reached.
    pub async fn build(self) -> Result<Wallet> {
        let identity = self.derive_identity()?;
        let url = self.endpoint.url().to_owned();
        let node = RpcNode::connect(&url)
            .await
            .map_err(|source| Error::Connection {
                url: url.clone(),
                source,
            })?;

        Wallet::connect(identity, self.endpoint, Box::new(node)).await
    }

    /// Like [`build`](Self::build) but with a caller-supplied node client.
    ///
    /// # Errors
    ///
    /// See [`build`](Self::build).
    pub async fn build_with_client(self, node: Box<dyn NodeClient>) -> Result<Wallet> {
        let identity = self.derive_identity()?;
        Wallet::connect(identity, self.endpoint, node).await
    }
}

/// A wallet session: one identity, one exclusively owned node client.
///
/// Every operation is an independent round trip with no caching or retry.
/// Concurrent [`transfer`](Self::transfer) calls may read the same pending
/// nonce; callers that need ordering must serialize them.
pub struct Wallet {
    identity: Identity,
    endpoint: Endpoint,
    node: Box<dyn NodeClient>,
    connected_chain_id: u64,
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.identity.address())
            .field("endpoint", &self.endpoint)
            .field("chain_id", &self.connected_chain_id)
            .finish_non_exhaustive()
    }
}

impl Wallet {
    /// Create a builder for constructing a [`Wallet`].
    #[must_use]
    pub fn builder() -> WalletBuilder {
        WalletBuilder::default()
    }

    /// Derive from `mnemonic` at `path` and connect to `network`.
    ///
    /// # Errors
    ///
    /// See [`WalletBuilder::build`].
    pub async fn from_mnemonic(network: Network, mnemonic: &str, path: &str) -> Result<Self> {
        Self::builder()
            .mnemonic(mnemonic)
            .path(path)
            .network(network)
            .build()
            .await
    }

    /// Bind `identity` to `node`, probing the node once with a chain id
    /// request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the probe fails.
    pub async fn connect(
        identity: Identity,
        endpoint: Endpoint,
        node: Box<dyn NodeClient>,
    ) -> Result<Self> {
        let connected_chain_id = node.chain_id().await.map_err(|source| Error::Connection {
            url: endpoint.url().to_owned(),
            source,
        })?;

        info!(
            address = %identity.address(),
            endpoint = %endpoint,
            chain_id = connected_chain_id,
            "BSC wallet initialized",
        );

        Ok(Self {
            identity,
            endpoint,
            node,
            connected_chain_id,
        })
    }

    /// The session identity.
    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The wallet's address.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.identity.address()
    }

    /// EIP-55 checksummed address string.
    #[must_use]
    pub fn address_string(&self) -> String {
        self.identity.address_string()
    }

    /// The endpoint this session talks to.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Chain id reported when the session connected.
    #[must_use]
    pub const fn connected_chain_id(&self) -> u64 {
        self.connected_chain_id
    }

    /// Balance of the wallet's address in base units.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BalanceQuery`] on node failure.
    pub async fn balance(&self) -> Result<U256> {
        self.balance_of(self.address()).await
    }

    /// Balance of any address in base units.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BalanceQuery`] on node failure.
    pub async fn balance_of(&self, address: Address) -> Result<U256> {
        self.node
            .balance_at(address)
            .await
            .map_err(Error::BalanceQuery)
    }

    /// Fee of a plain transfer at the suggested gas price, in base units.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FeeEstimation`] on node failure.
    pub async fn estimate_transfer_fee(&self) -> Result<U256> {
        let gas_price = self
            .node
            .suggest_gas_price()
            .await
            .map_err(Error::FeeEstimation)?;
        Ok(U256::from(gas_price) * U256::from(TRANSFER_GAS_LIMIT))
    }

    /// Send `amount` base units to `to` and return the transaction id.
    ///
    /// Not idempotent: repeating the call broadcasts a second transaction
    /// with the next nonce.
    ///
    /// # Errors
    ///
    /// Returns the error kind of the first failing stage:
    /// [`Error::NonceQuery`], [`Error::GasPriceQuery`], [`Error::ChainIdQuery`],
    /// [`Error::Signing`] or [`Error::Broadcast`].
    pub async fn transfer(&self, to: Address, amount: U256) -> Result<TxHash> {
        self.pipeline().run(to, amount).await
    }

    /// The staged transfer pipeline for this session.
    #[must_use]
    pub fn pipeline(&self) -> TransferPipeline<'_> {
        TransferPipeline::new(self.node.as_ref(), &self.identity)
    }
}
