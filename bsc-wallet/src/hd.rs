//! Hierarchical deterministic key derivation.
//!
//! Turns a BIP-39 mnemonic and a derivation path into an [`Identity`]:
//!
//! ```text
//! mnemonic ──BIP-39──▶ seed ──BIP-32──▶ master XPrv
//!     ──child per segment──▶ leaf XPrv ──▶ signing key ──▶ public key ──▶ address
//! ```
//!
//! Mnemonic handling uses [`kobe`]; the child walk uses [`bip32`] one segment
//! at a time so every step's failure can be reported.

use std::fmt;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use bip32::XPrv;
use k256::ecdsa::{SigningKey, VerifyingKey};
use tracing::debug;
use zeroize::Zeroizing;

use crate::encoding::{address_of, public_key_to_hex};
use crate::error::{Error, Result};
use crate::path::DerivationPath;

/// A derived key pair and its account address.
///
/// Immutable once built. The private key is zeroized on drop and redacted from
/// [`Debug`] output.
#[derive(Clone)]
pub struct Identity {
    signing_key: SigningKey,
    private_key_hex: Zeroizing<String>,
    public_key_hex: String,
    address: Address,
    path: Option<DerivationPath>,
}

impl Identity {
    /// Build an identity from a raw secp256k1 signing key.
    #[must_use]
    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = *signing_key.verifying_key();
        Self {
            private_key_hex: Zeroizing::new(alloy::primitives::hex::encode(
                signing_key.to_bytes(),
            )),
            public_key_hex: public_key_to_hex(&verifying_key),
            address: address_of(&verifying_key),
            signing_key,
            path: None,
        }
    }

    /// Build an identity from a hex private key, with or without `0x`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyDerivation`] if the key is not a valid scalar.
    pub fn from_private_key_hex(key: &str) -> Result<Self> {
        let key = key.strip_prefix("0x").unwrap_or(key);
        let bytes = Zeroizing::new(
            alloy::primitives::hex::decode(key)
                .map_err(|e| Error::KeyDerivation(format!("invalid private key hex: {e}")))?,
        );
        let signing_key = SigningKey::from_slice(&bytes)
            .map_err(|e| Error::KeyDerivation(format!("invalid private key: {e}")))?;
        Ok(Self::from_signing_key(signing_key))
    }

    /// Hex private key without prefix.
    ///
    /// **Security Warning**: Handle this value carefully.
    #[must_use]
    pub fn private_key_hex(&self) -> &str {
        &self.private_key_hex
    }

    /// Hex uncompressed public key with the `04` prefix stripped.
    #[must_use]
    pub fn public_key_hex(&self) -> &str {
        &self.public_key_hex
    }

    /// The account address.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// EIP-55 checksummed address string.
    #[must_use]
    pub fn address_string(&self) -> String {
        self.address.to_checksum(None)
    }

    /// The public key.
    #[must_use]
    pub fn verifying_key(&self) -> &VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// The path this identity was derived at, if it came from a mnemonic.
    #[must_use]
    pub const fn path(&self) -> Option<&DerivationPath> {
        self.path.as_ref()
    }

    /// A local alloy signer for this identity's key.
    #[must_use]
    pub fn signer(&self) -> PrivateKeySigner {
        PrivateKeySigner::from_signing_key(self.signing_key.clone())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("address", &self.address)
            .field("public_key", &self.public_key_hex)
            .field("path", &self.path.as_ref().map(ToString::to_string))
            .finish_non_exhaustive()
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.private_key_hex == other.private_key_hex && self.path == other.path
    }
}

impl Eq for Identity {}

/// Derive an identity from a mnemonic with an empty passphrase.
///
/// # Errors
///
/// - [`Error::InvalidPathSegment`] if `path` is malformed
/// - [`Error::InvalidMnemonic`] if the phrase is rejected
/// - [`Error::KeyDerivation`] if a BIP-32 step fails
pub fn derive(mnemonic: &str, path: &str) -> Result<Identity> {
    derive_with_passphrase(mnemonic, "", path)
}

/// Derive an identity from a mnemonic and BIP-39 passphrase.
///
/// The path is parsed before the seed is computed, so a malformed path never
/// yields a partial identity.
///
/// # Errors
///
/// See [`derive`].
pub fn derive_with_passphrase(mnemonic: &str, passphrase: &str, path: &str) -> Result<Identity> {
    let path: DerivationPath = path.parse()?;
    derive_at(mnemonic, passphrase, &path)
}

/// Derive an identity at an already parsed path.
///
/// # Errors
///
/// See [`derive`].
pub fn derive_at(mnemonic: &str, passphrase: &str, path: &DerivationPath) -> Result<Identity> {
    let wallet = kobe::Wallet::from_mnemonic(mnemonic, Some(passphrase))
        .map_err(|e| Error::InvalidMnemonic(e.to_string()))?;

    let leaf = derive_key(wallet.seed(), path)?;
    let mut identity = Identity::from_signing_key(leaf.private_key().clone());
    identity.path = Some(path.clone());

    debug!(path = %path, address = %identity.address, "derived identity");
    Ok(identity)
}

/// Walk from the master key of `seed` down `path`, one child per segment.
///
/// # Errors
///
/// Returns [`Error::KeyDerivation`] for an unsupported seed length or a
/// failed child step.
pub fn derive_key(seed: &[u8], path: &DerivationPath) -> Result<XPrv> {
    let master = XPrv::new(seed)
        .map_err(|e| Error::KeyDerivation(format!("failed to create master key: {e}")))?;

    path.segments().iter().try_fold(master, |parent, segment| {
        let child = segment.child_number()?;
        parent
            .derive_child(child)
            .map_err(|e| Error::KeyDerivation(format!("failed to derive key at {segment}: {e}")))
    })
}
