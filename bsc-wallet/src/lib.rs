#![cfg_attr(docsrs, feature(doc_cfg))]
//! A minimal HD wallet client for BNB Smart Chain.
//!
//! Derives a secp256k1 key pair from a BIP-39 mnemonic along a BIP-32 path
//! and uses it to query balances, estimate fees and send native-currency
//! transfers through a JSON-RPC node.
//!
//! ```text
//! Wallet (identity + node client)
//!   ├── builder()               → WalletBuilder → build()
//!   ├── balance()               → eth_getBalance
//!   ├── estimate_transfer_fee() → eth_gasPrice × 21000
//!   └── transfer()              → nonce → gas price → chain id → sign → broadcast
//! ```
//!
//! Key derivation is usable on its own through [`derive`]; amounts convert
//! with the helpers in [`units`].

pub mod encoding;
pub mod error;
pub mod hd;
pub mod network;
pub mod node;
pub mod path;
pub mod transfer;
pub mod units;
pub mod wallet;

pub use alloy::primitives::{Address, U256};
pub use error::{Error, Result};
pub use hd::{Identity, derive, derive_with_passphrase};
pub use network::Network;
pub use node::{NodeClient, NodeError, RpcNode};
pub use path::{DEFAULT_PATH, DerivationPath, PathSegment};
pub use transfer::{Stage, TRANSFER_GAS_LIMIT, TransferPipeline, TxHash};
pub use wallet::{Endpoint, Wallet, WalletBuilder};
