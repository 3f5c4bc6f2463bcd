//! Wallet configuration.
//!
//! Configuration is plain data: it can be built in code, read from JSON, or handed over from
//! JavaScript as an object. Every field has a default, so `{}` is a valid configuration.

use crate::address::SparkAddressFormat;
use crate::error::Result;
use crate::types::{AddressType, Network};
use serde::{Deserialize, Serialize};

/// Default number of accounts searched by the scanner.
pub const DEFAULT_SCAN_ACCOUNTS: u32 = 5;
/// Default number of address indices searched per account.
pub const DEFAULT_SCAN_INDICES: u32 = 20;
/// Default ceiling on the number of key derivations a single scan may perform.
pub const DEFAULT_MAX_SCAN_DERIVATIONS: u64 = 10_000;

/// Bounds of an address scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanOptions {
    /// Accounts `0..accounts` are searched.
    pub accounts: u32,
    /// Address indices `0..indices` are searched in every account.
    pub indices: u32,
    /// Also search the change chain (`change = 1`).
    pub include_change: bool,
    /// Address types to derive. Empty means every type.
    pub address_types: Vec<AddressType>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            accounts: DEFAULT_SCAN_ACCOUNTS,
            indices: DEFAULT_SCAN_INDICES,
            include_change: false,
            address_types: AddressType::ALL.to_vec(),
        }
    }
}

impl ScanOptions {
    /// The address types to search, deduplicated and in [`AddressType::ALL`] order.
    pub fn types(&self) -> Vec<AddressType> {
        if self.address_types.is_empty() {
            return AddressType::ALL.to_vec();
        }
        AddressType::ALL
            .into_iter()
            .filter(|t| self.address_types.contains(t))
            .collect()
    }

    pub fn chains(&self) -> u32 {
        if self.include_change { 2 } else { 1 }
    }

    /// Number of key derivations the scan may perform, counting Spark once per account.
    pub fn derivation_count(&self) -> u64 {
        let per_index =
            u64::from(self.accounts) * u64::from(self.indices) * u64::from(self.chains());
        self.types()
            .into_iter()
            .map(|t| match t {
                AddressType::Spark => u64::from(self.accounts),
                _ => per_index,
            })
            .sum()
    }
}

/// Settings shared by every operation of a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WalletConfig {
    pub network: Network,
    pub spark_address_format: SparkAddressFormat,
    /// Scans needing more derivations than this fail with `ScanBoundExceeded`.
    pub max_scan_derivations: u64,
    /// Window used when a scan is requested without explicit options.
    pub scan: ScanOptions,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            network: Network::Bitcoin,
            spark_address_format: SparkAddressFormat::Sdk,
            max_scan_derivations: DEFAULT_MAX_SCAN_DERIVATIONS,
            scan: ScanOptions::default(),
        }
    }
}

impl WalletConfig {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(WalletConfig::from_json("{}").unwrap(), WalletConfig::default());
    }

    #[test]
    fn test_partial_json() {
        let config = WalletConfig::from_json(
            r#"{"network":"regtest","sparkAddressFormat":"legacyHash","scan":{"accounts":2}}"#,
        )
        .unwrap();
        assert_eq!(config.network, Network::Regtest);
        assert_eq!(config.spark_address_format, SparkAddressFormat::LegacyHash);
        assert_eq!(config.scan.accounts, 2);
        assert_eq!(config.scan.indices, DEFAULT_SCAN_INDICES);
        assert_eq!(config.max_scan_derivations, DEFAULT_MAX_SCAN_DERIVATIONS);
    }

    #[test]
    fn test_unknown_network_is_rejected() {
        assert!(WalletConfig::from_json(r#"{"network":"dogecoin"}"#).is_err());
    }

    #[test]
    fn test_default_window_cost() {
        // 4 bitcoin types x 5 accounts x 20 indices, plus one Spark key per account.
        assert_eq!(ScanOptions::default().derivation_count(), 405);

        let with_change = ScanOptions {
            include_change: true,
            ..Default::default()
        };
        assert_eq!(with_change.derivation_count(), 805);
    }

    #[test]
    fn test_types_are_deduplicated_and_ordered() {
        let options = ScanOptions {
            address_types: vec![AddressType::Spark, AddressType::Legacy, AddressType::Spark],
            ..Default::default()
        };
        assert_eq!(options.types(), vec![AddressType::Legacy, AddressType::Spark]);
    }
}
