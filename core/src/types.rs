//! Shared types for the Spark Wallet SDK.

use crate::path::DerivationPath;
use bitcoin::secp256k1::{PublicKey, SecretKey};
use serde::{Deserialize, Serialize};

/// Bitcoin network type.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Bitcoin mainnet.
    #[default]
    Bitcoin,
    /// Bitcoin testnet.
    Testnet,
    /// Bitcoin regtest (local development).
    Regtest,
    /// Mutinynet (signet).
    Mutinynet,
}

impl Network {
    /// Convert to bitcoin crate's Network type.
    pub fn to_bitcoin_network(self) -> bitcoin::Network {
        match self {
            Network::Bitcoin => bitcoin::Network::Bitcoin,
            Network::Testnet => bitcoin::Network::Testnet,
            Network::Regtest => bitcoin::Network::Regtest,
            Network::Mutinynet => bitcoin::Network::Signet,
        }
    }

    /// BIP-44 coin type: `0` on mainnet, `1` on every test network.
    pub fn coin_type(self) -> u32 {
        match self {
            Network::Bitcoin => 0,
            _ => 1,
        }
    }

    /// Human-readable prefix of Spark addresses on this network.
    pub fn spark_hrp(self) -> &'static str {
        match self {
            Network::Bitcoin => "sp",
            Network::Testnet => "spt",
            Network::Regtest => "sprt",
            Network::Mutinynet => "sps",
        }
    }
}

impl std::str::FromStr for Network {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bitcoin" | "mainnet" => Ok(Network::Bitcoin),
            "testnet" | "testnet3" => Ok(Network::Testnet),
            "regtest" => Ok(Network::Regtest),
            "mutinynet" | "signet" => Ok(Network::Mutinynet),
            _ => Err(crate::error::Error::Parse(format!(
                "Unknown network: {}",
                s
            ))),
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Bitcoin => write!(f, "bitcoin"),
            Network::Testnet => write!(f, "testnet"),
            Network::Regtest => write!(f, "regtest"),
            Network::Mutinynet => write!(f, "mutinynet"),
        }
    }
}

/// Address encodings supported by the wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AddressType {
    /// P2PKH, `1...` on mainnet.
    Legacy,
    /// P2WPKH, `bc1q...` on mainnet.
    NativeSegwit,
    /// P2SH-P2WPKH, `3...` on mainnet.
    NestedSegwit,
    /// P2TR key-path spend, `bc1p...` on mainnet.
    Taproot,
    /// Spark identity address, `sp1...` on mainnet.
    Spark,
}

impl AddressType {
    /// Every supported type, in the order accounts list them.
    pub const ALL: [AddressType; 5] = [
        AddressType::Legacy,
        AddressType::NativeSegwit,
        AddressType::NestedSegwit,
        AddressType::Taproot,
        AddressType::Spark,
    ];

    /// The BIP-43 purpose field of this type's derivation paths.
    pub fn purpose(self) -> u32 {
        match self {
            AddressType::Legacy => crate::path::PURPOSE_LEGACY,
            AddressType::NestedSegwit => crate::path::PURPOSE_NESTED_SEGWIT,
            AddressType::NativeSegwit => crate::path::PURPOSE_NATIVE_SEGWIT,
            AddressType::Taproot => crate::path::PURPOSE_TAPROOT,
            AddressType::Spark => crate::path::PURPOSE_SPARK,
        }
    }

    /// Whether the address is a Bitcoin on-chain address (as opposed to Spark).
    pub fn is_bitcoin(self) -> bool {
        !matches!(self, AddressType::Spark)
    }
}

impl std::str::FromStr for AddressType {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "legacy" | "p2pkh" => Ok(AddressType::Legacy),
            "nativesegwit" | "segwit" | "p2wpkh" => Ok(AddressType::NativeSegwit),
            "nestedsegwit" | "p2shp2wpkh" => Ok(AddressType::NestedSegwit),
            "taproot" | "p2tr" => Ok(AddressType::Taproot),
            "spark" => Ok(AddressType::Spark),
            _ => Err(crate::error::Error::Parse(format!(
                "Unknown address type: {}",
                s
            ))),
        }
    }
}

impl std::fmt::Display for AddressType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressType::Legacy => write!(f, "legacy"),
            AddressType::NativeSegwit => write!(f, "nativeSegwit"),
            AddressType::NestedSegwit => write!(f, "nestedSegwit"),
            AddressType::Taproot => write!(f, "taproot"),
            AddressType::Spark => write!(f, "spark"),
        }
    }
}

/// A secret key and its compressed public key.
///
/// Every derivation produces its own key pair; nothing is shared between paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
    /// Wallet Import Format encoding of `secret_key` for the derivation network.
    pub wif: String,
}

/// One address together with the path and key pair it was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedAddress {
    pub address_type: AddressType,
    pub path: DerivationPath,
    pub address: String,
    pub key_pair: KeyPair,
}

/// One address and key pair per [`AddressType`] for a single account index.
///
/// Accounts are derived state: they are recomputed from the mnemonic on demand and never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub index: u32,
    pub network: Network,
    pub legacy: DerivedAddress,
    pub native_segwit: DerivedAddress,
    pub nested_segwit: DerivedAddress,
    pub taproot: DerivedAddress,
    pub spark: DerivedAddress,
}

impl Account {
    /// The derived address of the given type.
    pub fn get(&self, address_type: AddressType) -> &DerivedAddress {
        match address_type {
            AddressType::Legacy => &self.legacy,
            AddressType::NativeSegwit => &self.native_segwit,
            AddressType::NestedSegwit => &self.nested_segwit,
            AddressType::Taproot => &self.taproot,
            AddressType::Spark => &self.spark,
        }
    }

    /// All five derived addresses in [`AddressType::ALL`] order.
    pub fn addresses(&self) -> impl Iterator<Item = &DerivedAddress> {
        AddressType::ALL.into_iter().map(move |t| self.get(t))
    }

    /// Find which of this account's addresses equals `address`.
    pub fn find(&self, address: &str) -> Option<&DerivedAddress> {
        self.addresses().find(|derived| derived.address == address)
    }
}

/// An address found by the scanner, with the coordinates that produce it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanMatch {
    pub address_type: AddressType,
    pub account: u32,
    pub change: u32,
    pub index: u32,
    pub path: DerivationPath,
    pub address: String,
    pub key_pair: KeyPair,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_network_parsing() {
        assert_eq!(Network::from_str("mainnet").unwrap(), Network::Bitcoin);
        assert_eq!(Network::from_str("Signet").unwrap(), Network::Mutinynet);
        assert!(Network::from_str("litecoin").is_err());
        assert_eq!(Network::Regtest.to_string(), "regtest");
    }

    #[test]
    fn test_address_type_round_trips_display() {
        for address_type in AddressType::ALL {
            let parsed = AddressType::from_str(&address_type.to_string()).unwrap();
            assert_eq!(parsed, address_type);
        }
        assert_eq!(AddressType::from_str("p2sh-p2wpkh").unwrap(), AddressType::NestedSegwit);
    }

    #[test]
    fn test_address_type_serde_names() {
        let json = serde_json::to_string(&AddressType::NestedSegwit).unwrap();
        assert_eq!(json, "\"nestedSegwit\"");
    }

    #[test]
    fn test_coin_type_and_hrp() {
        assert_eq!(Network::Bitcoin.coin_type(), 0);
        assert_eq!(Network::Testnet.coin_type(), 1);
        assert_eq!(Network::Bitcoin.spark_hrp(), "sp");
        assert_eq!(Network::Regtest.spark_hrp(), "sprt");
    }
}
