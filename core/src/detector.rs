//! Third-party wallet detection.
//!
//! Other wallets derive their default receive address at different paths. Deriving every
//! known path for a mnemonic and comparing the results with an address the user already has
//! tells which wallet the mnemonic came from.
//!
//! | Wallet                                  | Paths                                     |
//! |-----------------------------------------|-------------------------------------------|
//! | Bitcoin Core, Sparrow, Electrum (BIP39) | `m/84'/0'/0'/0/0`                         |
//! | Ledger Live, Trezor Suite, OKX          | `m/44'`, `m/49'`, `m/84'`, `m/86'` `/0'/0'/0/0` |
//! | Xverse                                  | `m/49'/0'/0'/0/0`, `m/86'/0'/0'/0/0`      |
//! | Leather, Magic Eden, Phantom, Unisat    | `m/84'/0'/0'/0/0`, `m/86'/0'/0'/0/0`      |
//! | Spark SDK                               | `m/8797555'/0'/0'`                        |
//!
//! Paths are written for mainnet. On test networks the coin type becomes `1'`.

use crate::error::{Error, Result};
use crate::hd_wallet::HdWallet;
use crate::path::{self, DerivationPath};
use crate::types::{AddressType, Network};
use bitcoin::bip32::ChildNumber;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A wallet and the (path, address type) pairs it uses for its default addresses.
#[derive(Debug, Clone, Copy)]
pub struct WalletProfile {
    pub name: &'static str,
    pub paths: &'static [(&'static str, AddressType)],
}

const BIP84_ONLY: &[(&str, AddressType)] = &[("m/84'/0'/0'/0/0", AddressType::NativeSegwit)];

const ALL_BIP_PURPOSES: &[(&str, AddressType)] = &[
    ("m/44'/0'/0'/0/0", AddressType::Legacy),
    ("m/49'/0'/0'/0/0", AddressType::NestedSegwit),
    ("m/84'/0'/0'/0/0", AddressType::NativeSegwit),
    ("m/86'/0'/0'/0/0", AddressType::Taproot),
];

const SEGWIT_AND_TAPROOT: &[(&str, AddressType)] = &[
    ("m/84'/0'/0'/0/0", AddressType::NativeSegwit),
    ("m/86'/0'/0'/0/0", AddressType::Taproot),
];

/// Known wallets, in the order they are reported.
pub const KNOWN_WALLETS: &[WalletProfile] = &[
    WalletProfile {
        name: "Bitcoin Core",
        paths: BIP84_ONLY,
    },
    WalletProfile {
        name: "Sparrow",
        paths: BIP84_ONLY,
    },
    WalletProfile {
        name: "Electrum",
        paths: BIP84_ONLY,
    },
    WalletProfile {
        name: "Ledger Live",
        paths: ALL_BIP_PURPOSES,
    },
    WalletProfile {
        name: "Trezor Suite",
        paths: ALL_BIP_PURPOSES,
    },
    WalletProfile {
        name: "Xverse",
        paths: &[
            ("m/49'/0'/0'/0/0", AddressType::NestedSegwit),
            ("m/86'/0'/0'/0/0", AddressType::Taproot),
        ],
    },
    WalletProfile {
        name: "Leather",
        paths: SEGWIT_AND_TAPROOT,
    },
    WalletProfile {
        name: "Unisat",
        paths: SEGWIT_AND_TAPROOT,
    },
    WalletProfile {
        name: "OKX",
        paths: ALL_BIP_PURPOSES,
    },
    WalletProfile {
        name: "Magic Eden",
        paths: SEGWIT_AND_TAPROOT,
    },
    WalletProfile {
        name: "Phantom",
        paths: SEGWIT_AND_TAPROOT,
    },
    WalletProfile {
        name: "Spark SDK",
        paths: &[("m/8797555'/0'/0'", AddressType::Spark)],
    },
];

/// The address one wallet derives at one of its paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedPath {
    pub wallet: String,
    pub path: DerivationPath,
    pub address_type: AddressType,
    pub address: String,
}

/// Every known wallet path derived for one mnemonic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub candidate_wallets: Vec<String>,
    pub active_paths: Vec<DetectedPath>,
}

impl Detection {
    /// Wallets whose default address at some path equals `address`.
    pub fn wallets_for(&self, address: &str) -> Vec<&str> {
        let mut wallets: Vec<&str> = Vec::new();
        for detected in self.active_paths.iter().filter(|p| p.address == address) {
            if !wallets.contains(&detected.wallet.as_str()) {
                wallets.push(&detected.wallet);
            }
        }
        wallets
    }

    /// Every path derived for `wallet`.
    pub fn paths_of<'a>(&'a self, wallet: &'a str) -> impl Iterator<Item = &'a DetectedPath> {
        self.active_paths.iter().filter(move |p| p.wallet == wallet)
    }
}

/// Derive the address at every path of [`KNOWN_WALLETS`].
///
/// Paths shared by several wallets are derived once.
pub fn detect_wallet_type(wallet: &HdWallet) -> Result<Detection> {
    let mut derived: HashMap<(DerivationPath, AddressType), String> = HashMap::new();
    let mut active_paths = Vec::new();

    for profile in KNOWN_WALLETS {
        for &(raw, address_type) in profile.paths {
            let path = for_network(raw.parse()?, address_type, wallet.network())?;
            let key = (path.clone(), address_type);
            let address = match derived.get(&key) {
                Some(address) => address.clone(),
                None => {
                    let address = wallet.derive_address_at(address_type, path.clone())?.address;
                    derived.insert(key, address.clone());
                    address
                }
            };

            active_paths.push(DetectedPath {
                wallet: profile.name.to_string(),
                path,
                address_type,
                address,
            });
        }
    }
    log::debug!(
        "Derived {} distinct wallet paths for {} profiles",
        derived.len(),
        KNOWN_WALLETS.len()
    );

    Ok(Detection {
        candidate_wallets: KNOWN_WALLETS.iter().map(|p| p.name.to_string()).collect(),
        active_paths,
    })
}

/// Rewrite the coin type of a mainnet BIP-44 style path for `network`.
fn for_network(
    path: DerivationPath,
    address_type: AddressType,
    network: Network,
) -> Result<DerivationPath> {
    if !address_type.is_bitcoin() || network == Network::Bitcoin {
        return Ok(path);
    }
    match path.children() {
        [purpose, ChildNumber::Hardened { index: 0 }, rest @ ..] => {
            let mut rewritten = vec![*purpose, path::child_number(network.coin_type(), true)?];
            rewritten.extend_from_slice(rest);
            Ok(DerivationPath::from(rewritten))
        }
        _ => Err(Error::InvalidPath(format!("{path} has no coin type level"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_wallet_table_is_valid() {
        let mut names = Vec::new();
        for profile in KNOWN_WALLETS {
            assert!(!profile.paths.is_empty(), "{} has no paths", profile.name);
            assert!(!names.contains(&profile.name), "{} listed twice", profile.name);
            names.push(profile.name);

            for &(raw, address_type) in profile.paths {
                let path: DerivationPath = raw.parse().unwrap();
                assert_eq!(path.to_string(), raw);
                assert_eq!(path.purpose(), Some(address_type.purpose()), "{raw}");
                assert!(path.children()[..path.len().min(3)].iter().all(|c| c.is_hardened()));
                if address_type.is_bitcoin() {
                    assert_eq!(path.len(), 5, "{raw}");
                    assert_eq!(path.children()[1], ChildNumber::Hardened { index: 0 });
                }
            }
        }
    }

    #[test]
    fn test_detects_golden_addresses() {
        let wallet = HdWallet::from_mnemonic(ABANDON, Network::Bitcoin).unwrap();
        let detection = detect_wallet_type(&wallet).unwrap();
        assert_eq!(detection.candidate_wallets.len(), KNOWN_WALLETS.len());

        let segwit = detection.wallets_for("bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu");
        assert!(segwit.contains(&"Sparrow"));
        assert!(segwit.contains(&"Ledger Live"));
        assert!(!segwit.contains(&"Xverse"));

        let nested = detection.wallets_for("37VucYSaXLCAsxYyAPfbSi9eh4iEcbShgf");
        assert_eq!(nested, vec!["Ledger Live", "Trezor Suite", "Xverse", "OKX"]);

        assert!(detection.wallets_for("1BoatSLRHtKNngkdXEeobR76b53LETtpyT").is_empty());
    }

    #[test]
    fn test_spark_profile_matches_assembled_account() {
        let wallet = HdWallet::from_mnemonic(ABANDON, Network::Bitcoin).unwrap();
        let account = wallet.assemble(0).unwrap();
        let detection = detect_wallet_type(&wallet).unwrap();

        assert_eq!(detection.wallets_for(&account.spark.address), vec!["Spark SDK"]);
        let taproot_wallets = detection.wallets_for(&account.taproot.address);
        assert!(taproot_wallets.contains(&"Unisat"));
        assert!(taproot_wallets.contains(&"Phantom"));
    }

    #[test]
    fn test_paths_follow_network() {
        let wallet = HdWallet::from_mnemonic(ABANDON, Network::Testnet).unwrap();
        let detection = detect_wallet_type(&wallet).unwrap();

        let xverse: Vec<_> = detection.paths_of("Xverse").collect();
        assert_eq!(xverse[0].path.to_string(), "m/49'/1'/0'/0/0");
        assert!(xverse[1].address.starts_with("tb1p"));

        let spark: Vec<_> = detection.paths_of("Spark SDK").collect();
        assert_eq!(spark[0].path.to_string(), "m/8797555'/0'/0'");
        assert!(spark[0].address.starts_with("spt1"));
    }
}
