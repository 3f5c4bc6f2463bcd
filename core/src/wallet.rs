//! Main wallet struct with dependency-injected storage.
//!
//! [`Wallet`] is the stateful entry point used by the bindings: it keeps the mnemonic and the
//! selected account in a [`WalletStorage`] and re-derives everything else on demand.

use crate::address;
use crate::config::{ScanOptions, WalletConfig};
use crate::detector::{self, Detection};
use crate::error::{Error, Result};
use crate::hd_wallet::HdWallet;
use crate::mnemonic::{self, Strength};
use crate::path;
use crate::scanner::{CancelToken, Scanner};
use crate::storage::{WalletStorage, WalletStorageExt};
use crate::types::{Account, AddressType, Network, ScanMatch};
use serde::{Deserialize, Serialize};

/// Main wallet struct with injected storage.
///
/// # Example
///
/// ```rust,ignore
/// use spark_wallet_core::{Wallet, WalletConfig, Strength};
///
/// let wallet = Wallet::new(my_storage, WalletConfig::default());
/// wallet.generate_or_get_mnemonic(Strength::Bits128).await?;
/// let account = wallet.account().await?;
/// println!("{}", account.spark.address);
/// ```
pub struct Wallet<S: WalletStorage> {
    storage: S,
    config: WalletConfig,
}

impl<S: WalletStorage> Wallet<S> {
    pub fn new(storage: S, config: WalletConfig) -> Self {
        Self { storage, config }
    }

    pub fn network(&self) -> Network {
        self.config.network
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Generate a new mnemonic or return the existing one from storage.
    ///
    /// `strength` only applies when a new mnemonic is generated.
    pub async fn generate_or_get_mnemonic(&self, strength: Strength) -> Result<String> {
        if let Some(mnemonic) = self.storage.get_mnemonic().await? {
            return Ok(mnemonic);
        }

        let mnemonic = mnemonic::generate(strength)?.to_string();
        self.storage.set_mnemonic(&mnemonic).await?;
        self.storage.set_account_index(0).await?;
        log::info!("Generated a new {}-word mnemonic", strength.word_count());

        Ok(mnemonic)
    }

    /// Get the stored mnemonic (for backup display).
    ///
    /// Returns `None` if no mnemonic has been generated or imported.
    pub async fn get_mnemonic(&self) -> Result<Option<String>> {
        self.storage.get_mnemonic().await
    }

    /// Import a mnemonic phrase, replacing the existing one.
    ///
    /// The phrase is validated before anything is stored, and stored in normalized form.
    /// The account index is reset to 0.
    pub async fn import_mnemonic(&self, phrase: &str) -> Result<String> {
        let normalized = mnemonic::parse(phrase)?.to_string();
        self.storage.set_mnemonic(&normalized).await?;
        self.storage.set_account_index(0).await?;
        log::info!("Imported mnemonic");
        Ok(normalized)
    }

    /// The [`HdWallet`] of the stored mnemonic.
    pub async fn hd_wallet(&self) -> Result<HdWallet> {
        let mnemonic = self
            .storage
            .get_mnemonic()
            .await?
            .ok_or(Error::NoMnemonic)?;
        HdWallet::from_config(&mnemonic, &self.config)
    }

    pub async fn get_account_index(&self) -> Result<u32> {
        self.storage.get_account_index().await
    }

    /// The currently selected account.
    pub async fn account(&self) -> Result<Account> {
        let index = self.storage.get_account_index().await?;
        self.account_at(index).await
    }

    /// Any account, without changing the selection.
    pub async fn account_at(&self, index: u32) -> Result<Account> {
        self.hd_wallet().await?.assemble(index)
    }

    /// Select `index` as the current account and return it.
    pub async fn switch_account(&self, index: u32) -> Result<Account> {
        path::child_number(index, true)?;
        let account = self.account_at(index).await?;
        self.storage.set_account_index(index).await?;
        log::debug!("Switched to account {}", index);
        Ok(account)
    }

    /// Select the account after the current one and return it.
    pub async fn next_account(&self) -> Result<Account> {
        let current = self.storage.get_account_index().await?;
        path::child_number(current.saturating_add(1), true)?;
        let index = self.storage.advance_account_index().await?;
        self.account_at(index).await
    }

    /// Search for `target` in the stored mnemonic's window.
    ///
    /// `options` defaults to the configured window. The configured ceiling always applies.
    pub async fn scan(
        &self,
        target: &str,
        options: Option<ScanOptions>,
        cancel: &CancelToken,
    ) -> Result<Vec<ScanMatch>> {
        let wallet = self.hd_wallet().await?;
        let options = options.unwrap_or_else(|| self.config.scan.clone());
        Scanner::new(&wallet, options)
            .with_max_derivations(self.config.max_scan_derivations)
            .scan(target, cancel)
    }

    /// Derive the default address of every known third-party wallet.
    pub async fn detect_wallet_type(&self) -> Result<Detection> {
        detector::detect_wallet_type(&self.hd_wallet().await?)
    }

    /// The mnemonic and the current account in the shape served to the web app.
    pub async fn response(&self) -> Result<WalletResponse> {
        let mnemonic = self
            .storage
            .get_mnemonic()
            .await?
            .ok_or(Error::NoMnemonic)?;
        let account = self.account().await?;
        Ok(WalletResponse::new(mnemonic, &account))
    }
}

/// Response body of the wallet endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    pub mnemonic: String,
    pub addresses: ByAddressType,
    pub private_keys: ByAddressType,
}

/// One string per address type. `bitcoin` and `segwit` both hold the native SegWit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByAddressType {
    pub spark: String,
    pub bitcoin: String,
    pub legacy: String,
    pub taproot: String,
    pub nested_segwit: String,
    pub segwit: String,
}

impl ByAddressType {
    fn collect(value: impl Fn(AddressType) -> String) -> Self {
        Self {
            spark: value(AddressType::Spark),
            bitcoin: value(AddressType::NativeSegwit),
            legacy: value(AddressType::Legacy),
            taproot: value(AddressType::Taproot),
            nested_segwit: value(AddressType::NestedSegwit),
            segwit: value(AddressType::NativeSegwit),
        }
    }
}

impl WalletResponse {
    /// Private keys are WIF for the Bitcoin types and hex for Spark.
    ///
    /// A legacy-scheme Spark address is a hash of the mnemonic, not of a key, so its private
    /// key is left empty.
    pub fn new(mnemonic: String, account: &Account) -> Self {
        let addresses = ByAddressType::collect(|t| account.get(t).address.clone());
        let private_keys = ByAddressType::collect(|t| {
            let derived = account.get(t);
            match t {
                AddressType::Spark if address::is_legacy_spark_address(&derived.address) => {
                    String::new()
                }
                AddressType::Spark => hex::encode(derived.key_pair.secret_key.secret_bytes()),
                _ => derived.key_pair.wif.clone(),
            }
        });

        Self {
            mnemonic,
            addresses,
            private_keys,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::SparkAddressFormat;
    use crate::storage::memory::InMemoryWalletStorage;

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn wallet() -> Wallet<InMemoryWalletStorage> {
        Wallet::new(InMemoryWalletStorage::new(), WalletConfig::default())
    }

    #[tokio::test]
    async fn test_generate_or_get_mnemonic() {
        let wallet = wallet();

        let mnemonic1 = wallet.generate_or_get_mnemonic(Strength::Bits128).await.unwrap();
        assert_eq!(mnemonic1.split_whitespace().count(), 12);

        // Strength is ignored once a mnemonic exists.
        let mnemonic2 = wallet.generate_or_get_mnemonic(Strength::Bits256).await.unwrap();
        assert_eq!(mnemonic1, mnemonic2);
    }

    #[tokio::test]
    async fn test_import_mnemonic() {
        let wallet = wallet();
        let stored = wallet.import_mnemonic(&format!("  {}  ", ABANDON.to_uppercase())).await;
        assert_eq!(stored.unwrap(), ABANDON);
        assert_eq!(wallet.get_mnemonic().await.unwrap().as_deref(), Some(ABANDON));
    }

    #[tokio::test]
    async fn test_import_rejects_invalid_and_keeps_previous() {
        let wallet = wallet();
        wallet.import_mnemonic(ABANDON).await.unwrap();

        let err = wallet.import_mnemonic("abandon abandon abandon").await.unwrap_err();
        assert!(err.is_invalid_input());
        assert_eq!(wallet.get_mnemonic().await.unwrap().as_deref(), Some(ABANDON));
    }

    #[tokio::test]
    async fn test_no_mnemonic() {
        let wallet = wallet();
        assert!(matches!(wallet.account().await, Err(Error::NoMnemonic)));
        assert!(matches!(wallet.response().await, Err(Error::NoMnemonic)));
        assert!(matches!(wallet.detect_wallet_type().await, Err(Error::NoMnemonic)));
    }

    #[tokio::test]
    async fn test_switch_account() {
        let wallet = wallet();
        wallet.import_mnemonic(ABANDON).await.unwrap();

        let first = wallet.account().await.unwrap();
        assert_eq!(first.index, 0);

        let third = wallet.switch_account(2).await.unwrap();
        assert_eq!(wallet.get_account_index().await.unwrap(), 2);
        assert_eq!(wallet.account().await.unwrap(), third);
        assert_ne!(first.native_segwit.address, third.native_segwit.address);

        let fourth = wallet.next_account().await.unwrap();
        assert_eq!(fourth.index, 3);

        // Importing resets the selection.
        wallet.import_mnemonic(ABANDON).await.unwrap();
        assert_eq!(wallet.account().await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_switch_account_rejects_hardened_overflow() {
        let wallet = wallet();
        wallet.import_mnemonic(ABANDON).await.unwrap();

        let err = wallet.switch_account(1 << 31).await.unwrap_err();
        assert!(matches!(err, Error::DerivationOverflow(_)));
        assert_eq!(wallet.get_account_index().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_scan_uses_configured_window() {
        let wallet = wallet();
        wallet.import_mnemonic(ABANDON).await.unwrap();
        let cancel = CancelToken::new();

        let target = wallet.account_at(1).await.unwrap().nested_segwit.address;
        let matches = wallet.scan(&target, None, &cancel).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].account, 1);

        let narrow = ScanOptions {
            accounts: 1,
            ..Default::default()
        };
        assert!(wallet.scan(&target, Some(narrow), &cancel).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_response_shape() {
        let wallet = wallet();
        wallet.import_mnemonic(ABANDON).await.unwrap();

        let response = wallet.response().await.unwrap();
        assert_eq!(response.mnemonic, ABANDON);
        assert_eq!(response.addresses.segwit, "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu");
        assert_eq!(response.addresses.bitcoin, response.addresses.segwit);
        assert_eq!(response.addresses.nested_segwit, "37VucYSaXLCAsxYyAPfbSi9eh4iEcbShgf");
        assert_eq!(
            response.private_keys.segwit,
            "KyZpNDKnfs94vbrwhJneDi77V6jF64PWPF8x5cdJb8ifgg2DUc9d"
        );
        assert_eq!(response.private_keys.spark.len(), 64);

        let json = serde_json::to_value(&response).unwrap();
        assert!(json["addresses"]["nestedSegwit"].is_string());
        assert!(json["privateKeys"]["taproot"].is_string());
    }

    #[tokio::test]
    async fn test_legacy_spark_address_has_no_private_key() {
        let config = WalletConfig {
            spark_address_format: SparkAddressFormat::LegacyHash,
            ..Default::default()
        };
        let wallet = Wallet::new(InMemoryWalletStorage::new(), config);
        wallet.import_mnemonic(ABANDON).await.unwrap();

        let response = wallet.response().await.unwrap();
        assert_eq!(response.addresses.spark, address::legacy_spark_address(ABANDON));
        assert!(response.private_keys.spark.is_empty());
        assert_eq!(
            response.private_keys.segwit,
            "KyZpNDKnfs94vbrwhJneDi77V6jF64PWPF8x5cdJb8ifgg2DUc9d"
        );
    }
}
