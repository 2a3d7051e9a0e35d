//! Public key and address encoding for secp256k1 keys.

use alloy::primitives::{Address, hex, keccak256};
use k256::ecdsa::VerifyingKey;

/// Length of the uncompressed point without its `0x04` format byte.
const RAW_PUBLIC_KEY_LEN: usize = 64;

/// Uncompressed SEC1 point bytes with the leading format byte removed.
fn raw_public_key(public_key: &VerifyingKey) -> [u8; RAW_PUBLIC_KEY_LEN] {
    let point = public_key.to_encoded_point(false);
    let mut raw = [0u8; RAW_PUBLIC_KEY_LEN];
    raw.copy_from_slice(&point.as_bytes()[1..]);
    raw
}

/// Hex encoding of the uncompressed public key without the `04` prefix.
#[must_use]
pub fn public_key_to_hex(public_key: &VerifyingKey) -> String {
    hex::encode(raw_public_key(public_key))
}

/// The 20-byte account address: last 20 bytes of `keccak256(x || y)`.
#[must_use]
pub fn address_of(public_key: &VerifyingKey) -> Address {
    let hash = keccak256(raw_public_key(public_key));
    Address::from_slice(&hash[12..])
}

/// EIP-55 checksummed, `0x`-prefixed address string for a public key.
#[must_use]
pub fn address_from_public_key(public_key: &VerifyingKey) -> String {
    address_of(public_key).to_checksum(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;

    // Private key 1 maps to the curve generator point.
    fn generator_key() -> VerifyingKey {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        *SigningKey::from_slice(&bytes).unwrap().verifying_key()
    }

    #[test]
    fn test_public_key_hex_strips_prefix() {
        let hex = public_key_to_hex(&generator_key());
        assert_eq!(hex.len(), 128);
        assert_eq!(
            hex,
            "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798\
             483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8"
        );
    }

    #[test]
    fn test_address_from_public_key() {
        let key = generator_key();
        let address = address_from_public_key(&key);
        assert_eq!(address, "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf");
        assert_eq!(address.len(), 42);
        assert!(address.starts_with("0x"));
    }

    #[test]
    fn test_address_is_deterministic() {
        let key = generator_key();
        assert_eq!(address_of(&key), address_of(&key));
        assert_eq!(
            address_from_public_key(&key),
            address_of(&key).to_checksum(None)
        );
    }
}
