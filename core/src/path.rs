//! BIP-32 derivation paths used by the wallet.
//!
//! # Key hierarchy
//!
//! ```text
//! m/44'/coin'/account'/change/index ─── Legacy (P2PKH)
//! m/49'/coin'/account'/change/index ─── Nested SegWit (P2SH-P2WPKH)
//! m/84'/coin'/account'/change/index ─── Native SegWit (P2WPKH)
//! m/86'/coin'/account'/change/index ─── Taproot (P2TR)
//! m/8797555'/account'/0' ────────────── Spark identity key
//! ```
//!
//! `coin` is `0` on mainnet and `1` on every test network. The Spark identity key has no
//! change or address-index level: there is exactly one Spark address per account.

use crate::error::{Error, Result};
use crate::types::{AddressType, Network};
use bitcoin::bip32::ChildNumber;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// BIP-44 purpose (P2PKH).
pub const PURPOSE_LEGACY: u32 = 44;
/// BIP-49 purpose (P2SH-P2WPKH).
pub const PURPOSE_NESTED_SEGWIT: u32 = 49;
/// BIP-84 purpose (P2WPKH).
pub const PURPOSE_NATIVE_SEGWIT: u32 = 84;
/// BIP-86 purpose (P2TR).
pub const PURPOSE_TAPROOT: u32 = 86;
/// Spark purpose, used by the Spark SDK for all of its keys.
pub const PURPOSE_SPARK: u32 = 8797555;

/// Spark key type index of the identity key (`m/8797555'/account'/0'`).
const SPARK_IDENTITY_KEY_TYPE: ChildNumber = ChildNumber::Hardened { index: 0 };

/// Receive chain (`change = 0`).
pub const RECEIVE_CHAIN: u32 = 0;
/// Change chain (`change = 1`).
pub const CHANGE_CHAIN: u32 = 1;

/// An ordered sequence of child numbers, rendered as `m/purpose'/coin'/...`.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct DerivationPath(Vec<ChildNumber>);

impl DerivationPath {
    /// The empty path, addressing the master key.
    pub fn master() -> Self {
        Self(Vec::new())
    }

    /// Returns a new path with `child` appended.
    pub fn child(&self, child: ChildNumber) -> Self {
        let mut children = self.0.clone();
        children.push(child);
        Self(children)
    }

    /// Returns a new path with every element of `suffix` appended.
    pub fn extend(&self, suffix: &[ChildNumber]) -> Self {
        let mut children = self.0.clone();
        children.extend_from_slice(suffix);
        Self(children)
    }

    pub fn children(&self) -> &[ChildNumber] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The purpose field, if the first segment is hardened.
    pub fn purpose(&self) -> Option<u32> {
        match self.0.first() {
            Some(ChildNumber::Hardened { index }) => Some(*index),
            _ => None,
        }
    }
}

impl From<Vec<ChildNumber>> for DerivationPath {
    fn from(children: Vec<ChildNumber>) -> Self {
        Self(children)
    }
}

impl AsRef<[ChildNumber]> for DerivationPath {
    fn as_ref(&self) -> &[ChildNumber] {
        &self.0
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m")?;
        for child in &self.0 {
            match child {
                ChildNumber::Hardened { index } => write!(f, "/{index}'")?,
                ChildNumber::Normal { index } => write!(f, "/{index}")?,
            }
        }
        Ok(())
    }
}

impl fmt::Debug for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DerivationPath({self})")
    }
}

impl FromStr for DerivationPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut segments = s.trim().split('/');
        match segments.next() {
            Some("m") | Some("M") => {}
            _ => {
                return Err(Error::InvalidPath(format!("{s:?} must start with \"m\"")));
            }
        }

        let children = segments
            .map(|segment| parse_segment(s, segment))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self(children))
    }
}

impl Serialize for DerivationPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DerivationPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

fn parse_segment(path: &str, segment: &str) -> Result<ChildNumber> {
    let (digits, hardened) = match segment.strip_suffix(['\'', 'h', 'H']) {
        Some(digits) => (digits, true),
        None => (segment, false),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidPath(format!(
            "{path:?}: segment {segment:?} is not an index"
        )));
    }

    // Only digits remain, so a parse failure means the value does not fit in u32.
    let index: u32 = digits.parse().map_err(|_| {
        Error::DerivationOverflow(format!("{path:?}: segment {segment:?} exceeds u32"))
    })?;

    child_number(index, hardened)
}

/// Creates a [`ChildNumber`] from an index and hardened flag.
///
/// Fails with [`Error::DerivationOverflow`] if `index >= 2^31`.
pub fn child_number(index: u32, hardened: bool) -> Result<ChildNumber> {
    if hardened {
        ChildNumber::from_hardened_idx(index)
    } else {
        ChildNumber::from_normal_idx(index)
    }
    .map_err(|_| Error::DerivationOverflow(format!("child index {index} is not below 2^31")))
}

/// The account-level path of an address type: `m/purpose'/coin'/account'`, or
/// `m/8797555'/account'` for Spark.
pub fn account_path(
    address_type: AddressType,
    network: Network,
    account: u32,
) -> Result<DerivationPath> {
    let purpose = child_number(address_type.purpose(), true)?;
    let account = child_number(account, true)?;

    let children = match address_type {
        AddressType::Spark => vec![purpose, account],
        _ => vec![purpose, child_number(network.coin_type(), true)?, account],
    };
    Ok(DerivationPath(children))
}

/// The segments below [`account_path`] that address a single key.
///
/// Bitcoin types use the non-hardened `change/index` pair. Spark only has the identity key, so
/// anything other than `change = 0, index = 0` is rejected.
pub fn address_suffix(
    address_type: AddressType,
    change: u32,
    index: u32,
) -> Result<Vec<ChildNumber>> {
    match address_type {
        AddressType::Spark if change == RECEIVE_CHAIN && index == 0 => {
            Ok(vec![SPARK_IDENTITY_KEY_TYPE])
        }
        AddressType::Spark => Err(Error::InvalidPath(format!(
            "Spark identity keys have no change/index level (got {change}/{index})"
        ))),
        _ => Ok(vec![child_number(change, false)?, child_number(index, false)?]),
    }
}

/// Full path of the key for an address type at the given coordinates.
pub fn address_path(
    address_type: AddressType,
    network: Network,
    account: u32,
    change: u32,
    index: u32,
) -> Result<DerivationPath> {
    let suffix = address_suffix(address_type, change, index)?;
    Ok(account_path(address_type, network, account)?.extend(&suffix))
}

/// The canonical path an account uses for each type: change 0, index 0.
pub fn default_path(
    address_type: AddressType,
    network: Network,
    account: u32,
) -> Result<DerivationPath> {
    address_path(address_type, network, account, RECEIVE_CHAIN, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let path: DerivationPath = "m/84'/0'/0'/0/5".parse().unwrap();
        assert_eq!(path.len(), 5);
        assert_eq!(path.purpose(), Some(84));
        assert_eq!(path.children()[4], ChildNumber::Normal { index: 5 });
        assert_eq!(path.to_string(), "m/84'/0'/0'/0/5");
    }

    #[test]
    fn test_alternative_hardened_markers() {
        let a: DerivationPath = "m/86h/0H/0'".parse().unwrap();
        let b: DerivationPath = "m/86'/0'/0'".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_master_path() {
        let path: DerivationPath = "m".parse().unwrap();
        assert!(path.is_empty());
        assert_eq!(path, DerivationPath::master());
        assert_eq!(path.to_string(), "m");
    }

    #[test]
    fn test_malformed_paths() {
        for bad in ["", "84'/0'", "m/", "m//0", "m/abc", "m/1''", "m/-1", "x/0", "m/0/ 1"] {
            let err = bad.parse::<DerivationPath>().unwrap_err();
            assert!(matches!(err, Error::InvalidPath(_)), "{bad}: {err:?}");
        }
    }

    #[test]
    fn test_out_of_range_indices() {
        for bad in ["m/2147483648", "m/2147483648'", "m/0/99999999999"] {
            let err = bad.parse::<DerivationPath>().unwrap_err();
            assert!(matches!(err, Error::DerivationOverflow(_)), "{bad}: {err:?}");
        }
        assert!("m/2147483647'".parse::<DerivationPath>().is_ok());
    }

    #[test]
    fn test_canonical_paths() {
        let expected = [
            (AddressType::Legacy, "m/44'/0'/0'/0/0"),
            (AddressType::NestedSegwit, "m/49'/0'/0'/0/0"),
            (AddressType::NativeSegwit, "m/84'/0'/0'/0/0"),
            (AddressType::Taproot, "m/86'/0'/0'/0/0"),
            (AddressType::Spark, "m/8797555'/0'/0'"),
        ];
        for (address_type, path) in expected {
            assert_eq!(
                default_path(address_type, Network::Bitcoin, 0).unwrap().to_string(),
                path
            );
        }
    }

    #[test]
    fn test_testnet_coin_type() {
        let path = address_path(AddressType::Taproot, Network::Testnet, 2, 1, 7).unwrap();
        assert_eq!(path.to_string(), "m/86'/1'/2'/1/7");
    }

    #[test]
    fn test_spark_has_no_index_level() {
        assert!(address_path(AddressType::Spark, Network::Bitcoin, 0, 0, 1).is_err());
        assert!(address_path(AddressType::Spark, Network::Bitcoin, 0, 1, 0).is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let path: DerivationPath = "m/49'/1'/0'/0/3".parse().unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"m/49'/1'/0'/0/3\"");
        let back: DerivationPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }
}
