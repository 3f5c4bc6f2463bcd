//! Address encoders, one per [`AddressType`].
//!
//! Every encoder takes a 33-byte compressed secp256k1 public key and fails with
//! [`Error::InvalidPublicKey`] for anything else.
//!
//! Spark addresses use the Spark SDK encoding: bech32m over the protobuf message
//! `SparkAddress { bytes identity_public_key = 1; }`, i.e. `0x0a 0x21 || pubkey`. On mainnet
//! this always yields a 65 character string starting with `sp1pgss`.
//! [`SparkAddressFormat::LegacyHash`] is a separate, incompatible scheme kept for wallets
//! created by older builds of the web app; it is never used unless selected explicitly.

use crate::error::{Error, Result};
use crate::types::{AddressType, Network};
use bech32::primitives::decode::CheckedHrpstring;
use bech32::{Bech32m, Hrp};
use bitcoin::address::NetworkUnchecked;
use bitcoin::key::CompressedPublicKey;
use bitcoin::secp256k1::{Secp256k1, Verification};
use bitcoin::Address;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length of a compressed public key.
pub const COMPRESSED_KEY_LEN: usize = 33;

/// Protobuf tag of field 1 with wire type 2 (length-delimited).
const SPARK_IDENTITY_FIELD_TAG: u8 = 0x0a;

/// Prefix of [`SparkAddressFormat::LegacyHash`] addresses.
const LEGACY_SPARK_PREFIX: &str = "sp1p";
/// Number of hex digest characters kept by [`SparkAddressFormat::LegacyHash`].
const LEGACY_SPARK_HEX_LEN: usize = 62;

/// Which of the two known Spark address schemes a wallet uses.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SparkAddressFormat {
    /// bech32m over the identity public key, as produced by the Spark SDK.
    #[default]
    Sdk,
    /// `sp1p` followed by the first 62 hex characters of `SHA-256(mnemonic)`.
    ///
    /// Not derived from any key: it cannot receive Spark transfers and exists only so that
    /// wallets created with this scheme can still be recognised.
    LegacyHash,
}

/// Parse a compressed public key, rejecting uncompressed keys and points off the curve.
pub fn compressed_key(public_key: &[u8]) -> Result<CompressedPublicKey> {
    if public_key.len() != COMPRESSED_KEY_LEN {
        return Err(Error::InvalidPublicKey(format!(
            "expected {} bytes, got {}",
            COMPRESSED_KEY_LEN,
            public_key.len()
        )));
    }
    CompressedPublicKey::from_slice(public_key).map_err(|e| Error::InvalidPublicKey(e.to_string()))
}

/// Legacy P2PKH: Base58Check of `HASH160(pubkey)`.
pub fn p2pkh(public_key: &[u8], network: Network) -> Result<String> {
    let key = compressed_key(public_key)?;
    Ok(Address::p2pkh(key.pubkey_hash(), network.to_bitcoin_network()).to_string())
}

/// Native SegWit P2WPKH: bech32, witness version 0.
pub fn p2wpkh(public_key: &[u8], network: Network) -> Result<String> {
    let key = compressed_key(public_key)?;
    Ok(Address::p2wpkh(&key, network.to_bitcoin_network()).to_string())
}

/// Nested SegWit: the P2WPKH script wrapped in a P2SH output.
pub fn p2sh_p2wpkh(public_key: &[u8], network: Network) -> Result<String> {
    let key = compressed_key(public_key)?;
    Ok(Address::p2shwpkh(&key, network.to_bitcoin_network()).to_string())
}

/// Taproot P2TR: BIP-341 key-path output key (no script tree), bech32m, witness version 1.
pub fn p2tr<C: Verification>(
    secp: &Secp256k1<C>,
    public_key: &[u8],
    network: Network,
) -> Result<String> {
    let key = compressed_key(public_key)?;
    let (internal_key, _parity) = key.0.x_only_public_key();
    Ok(Address::p2tr(secp, internal_key, None, network.to_bitcoin_network()).to_string())
}

/// Spark SDK address of an identity public key.
pub fn spark(public_key: &[u8], network: Network) -> Result<String> {
    let key = compressed_key(public_key)?;

    let mut payload = Vec::with_capacity(2 + COMPRESSED_KEY_LEN);
    payload.push(SPARK_IDENTITY_FIELD_TAG);
    payload.push(COMPRESSED_KEY_LEN as u8);
    payload.extend_from_slice(&key.to_bytes());

    let hrp = spark_hrp(network)?;
    bech32::encode::<Bech32m>(hrp, &payload)
        .map_err(|e| Error::Other(format!("Failed to encode Spark address: {}", e)))
}

/// The [`SparkAddressFormat::LegacyHash`] address of a mnemonic phrase.
pub fn legacy_spark_address(mnemonic_phrase: &str) -> String {
    let digest = hex::encode(Sha256::digest(mnemonic_phrase.as_bytes()));
    format!("{}{}", LEGACY_SPARK_PREFIX, &digest[..LEGACY_SPARK_HEX_LEN])
}

/// Encode `public_key` as an address of the given type.
///
/// Spark addresses are always produced in the SDK format here; the legacy scheme depends on
/// the mnemonic rather than on a key and is handled by the caller.
pub fn encode<C: Verification>(
    secp: &Secp256k1<C>,
    address_type: AddressType,
    public_key: &[u8],
    network: Network,
) -> Result<String> {
    match address_type {
        AddressType::Legacy => p2pkh(public_key, network),
        AddressType::NativeSegwit => p2wpkh(public_key, network),
        AddressType::NestedSegwit => p2sh_p2wpkh(public_key, network),
        AddressType::Taproot => p2tr(secp, public_key, network),
        AddressType::Spark => spark(public_key, network),
    }
}

/// Decode a Spark SDK address into its identity public key.
pub fn decode_spark(address: &str, network: Network) -> Result<CompressedPublicKey> {
    let invalid = |reason: String| Error::InvalidAddress(format!("{address}: {reason}"));

    let checked = CheckedHrpstring::new::<Bech32m>(address).map_err(|e| invalid(e.to_string()))?;
    if checked.hrp() != spark_hrp(network)? {
        return Err(invalid(format!("not a Spark address on {network}")));
    }

    let payload: Vec<u8> = checked.byte_iter().collect();
    match payload.as_slice() {
        [SPARK_IDENTITY_FIELD_TAG, len, key @ ..]
            if *len as usize == COMPRESSED_KEY_LEN && key.len() == COMPRESSED_KEY_LEN =>
        {
            CompressedPublicKey::from_slice(key).map_err(|e| invalid(e.to_string()))
        }
        _ => Err(invalid("unexpected Spark payload".to_string())),
    }
}

/// Whether `address` has the shape of a [`SparkAddressFormat::LegacyHash`] address.
pub fn is_legacy_spark_address(address: &str) -> bool {
    address.strip_prefix(LEGACY_SPARK_PREFIX).is_some_and(|digest| {
        digest.len() == LEGACY_SPARK_HEX_LEN
            && digest.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    })
}

/// Determine which address type produced `address` on `network`, by decoding it.
///
/// P2SH outputs are reported as [`AddressType::NestedSegwit`], the only P2SH form the wallet
/// derives. Legacy-scheme Spark addresses carry no network and are accepted everywhere.
/// Returns `None` for strings that are not a supported address on this network.
pub fn classify(address: &str, network: Network) -> Option<AddressType> {
    if decode_spark(address, network).is_ok() || is_legacy_spark_address(address) {
        return Some(AddressType::Spark);
    }

    let unchecked: Address<NetworkUnchecked> = address.parse().ok()?;
    let checked = unchecked.require_network(network.to_bitcoin_network()).ok()?;
    match checked.address_type()? {
        bitcoin::AddressType::P2pkh => Some(AddressType::Legacy),
        bitcoin::AddressType::P2sh => Some(AddressType::NestedSegwit),
        bitcoin::AddressType::P2wpkh => Some(AddressType::NativeSegwit),
        bitcoin::AddressType::P2tr => Some(AddressType::Taproot),
        _ => None,
    }
}

/// Whether `address` is a well-formed address of `address_type` on `network`.
pub fn is_valid_for(address_type: AddressType, address: &str, network: Network) -> bool {
    classify(address, network) == Some(address_type)
}

fn spark_hrp(network: Network) -> Result<Hrp> {
    Hrp::parse(network.spark_hrp())
        .map_err(|e| Error::Other(format!("Invalid Spark HRP: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// BIP-84 test vector key for m/84'/0'/0'/0/0 of the `abandon ... about` mnemonic.
    const BIP84_KEY: &str = "0330d54fd0dd420a6e5f8d3624f5f3482cae350f79d5f0753bf5beef9c2d91af3c";
    /// BIP-86 internal key for m/86'/0'/0'/0/0 of the same mnemonic (x-only, even parity).
    const BIP86_KEY: &str = "02cc8a4bc64d897bddc5fbc2f670f7a8ba0b386779106cf1223c6fc5d7cd6fc115";

    fn key(hex_key: &str) -> Vec<u8> {
        hex::decode(hex_key).unwrap()
    }

    #[test]
    fn test_p2wpkh_vector() {
        assert_eq!(
            p2wpkh(&key(BIP84_KEY), Network::Bitcoin).unwrap(),
            "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu"
        );
        assert!(p2wpkh(&key(BIP84_KEY), Network::Testnet).unwrap().starts_with("tb1q"));
        assert!(p2wpkh(&key(BIP84_KEY), Network::Regtest).unwrap().starts_with("bcrt1q"));
    }

    #[test]
    fn test_p2tr_vector() {
        let secp = Secp256k1::verification_only();
        assert_eq!(
            p2tr(&secp, &key(BIP86_KEY), Network::Bitcoin).unwrap(),
            "bc1p5cyxnuxmeuwuvkwfem96lqzszd02n6xdcjrs20cac6yqjjwudpxqkedrcr"
        );
    }

    #[test]
    fn test_base58_prefixes() {
        let legacy = p2pkh(&key(BIP84_KEY), Network::Bitcoin).unwrap();
        let nested = p2sh_p2wpkh(&key(BIP84_KEY), Network::Bitcoin).unwrap();
        assert!(legacy.starts_with('1'));
        assert!(nested.starts_with('3'));
        assert!(matches!(
            p2pkh(&key(BIP84_KEY), Network::Testnet).unwrap().chars().next(),
            Some('m') | Some('n')
        ));
        assert!(p2sh_p2wpkh(&key(BIP84_KEY), Network::Testnet).unwrap().starts_with('2'));
    }

    #[test]
    fn test_spark_sdk_shape() {
        let address = spark(&key(BIP84_KEY), Network::Bitcoin).unwrap();
        assert_eq!(address.len(), 65);
        assert!(address.starts_with("sp1pgss"), "{address}");
        assert_eq!(
            decode_spark(&address, Network::Bitcoin).unwrap().to_bytes().to_vec(),
            key(BIP84_KEY)
        );

        let regtest = spark(&key(BIP84_KEY), Network::Regtest).unwrap();
        assert!(regtest.starts_with("sprt1pgss"), "{regtest}");
        assert!(decode_spark(&regtest, Network::Bitcoin).is_err());
    }

    #[test]
    fn test_legacy_spark_scheme_is_distinct() {
        let phrase = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
        let legacy = legacy_spark_address(phrase);
        assert_eq!(legacy.len(), 66);
        assert!(is_legacy_spark_address(&legacy));
        assert_eq!(legacy, legacy_spark_address(phrase));
        assert!(decode_spark(&legacy, Network::Bitcoin).is_err());

        let sdk = spark(&key(BIP84_KEY), Network::Bitcoin).unwrap();
        assert!(!is_legacy_spark_address(&sdk));
    }

    #[test]
    fn test_rejects_invalid_public_keys() {
        let secp = Secp256k1::verification_only();
        let mut uncompressed = vec![0x04];
        uncompressed.extend_from_slice(&[0x11; 64]);
        let mut off_curve = vec![0x02];
        off_curve.extend_from_slice(&[0xff; 32]);
        let mut bad_prefix = key(BIP84_KEY);
        bad_prefix[0] = 0x05;

        for bad in [vec![], key(BIP84_KEY)[..32].to_vec(), uncompressed, off_curve, bad_prefix] {
            for address_type in AddressType::ALL {
                let err = encode(&secp, address_type, &bad, Network::Bitcoin).unwrap_err();
                assert!(matches!(err, Error::InvalidPublicKey(_)), "{address_type}: {err:?}");
            }
        }
    }

    #[test]
    fn test_classify_each_type() {
        let secp = Secp256k1::verification_only();
        for address_type in AddressType::ALL {
            let address = encode(&secp, address_type, &key(BIP84_KEY), Network::Bitcoin).unwrap();
            assert_eq!(classify(&address, Network::Bitcoin), Some(address_type), "{address}");
            assert!(is_valid_for(address_type, &address, Network::Bitcoin));
            assert_eq!(classify(&address, Network::Testnet), None, "{address}");
        }
    }

    #[test]
    fn test_classify_rejects_garbage() {
        assert_eq!(classify("", Network::Bitcoin), None);
        assert_eq!(classify("hello world", Network::Bitcoin), None);
        assert_eq!(classify("bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyv", Network::Bitcoin), None);
    }
}
