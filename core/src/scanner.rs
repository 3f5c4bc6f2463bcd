//! Address scanner.
//!
//! Given an address, find the (type, account, change, index) coordinates under which a
//! wallet produces it. The search window is bounded by [`ScanOptions`] and by a ceiling on
//! the number of key derivations, and can be cancelled from another thread through a
//! [`CancelToken`].
//!
//! Scans are pure: they only read the [`HdWallet`] and can run on any thread.

use crate::address;
use crate::config::{DEFAULT_MAX_SCAN_DERIVATIONS, ScanOptions, WalletConfig};
use crate::error::{Error, Result};
use crate::hd_wallet::HdWallet;
use crate::path::{self, CHANGE_CHAIN, RECEIVE_CHAIN};
use crate::types::{AddressType, Network, ScanMatch};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag used to stop a running scan.
///
/// Clones share the flag: cancelling any clone cancels every scan holding one.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::ScanCancelled);
        }
        Ok(())
    }
}

/// A bounded search over one wallet.
#[derive(Debug)]
pub struct Scanner<'a> {
    wallet: &'a HdWallet,
    options: ScanOptions,
    max_derivations: u64,
}

impl<'a> Scanner<'a> {
    pub fn new(wallet: &'a HdWallet, options: ScanOptions) -> Self {
        Self {
            wallet,
            options,
            max_derivations: DEFAULT_MAX_SCAN_DERIVATIONS,
        }
    }

    /// Scanner using the default window and ceiling of `config`.
    pub fn from_config(wallet: &'a HdWallet, config: &WalletConfig) -> Self {
        Self::new(wallet, config.scan.clone()).with_max_derivations(config.max_scan_derivations)
    }

    pub fn with_max_derivations(mut self, max_derivations: u64) -> Self {
        self.max_derivations = max_derivations;
        self
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Fail with [`Error::ScanBoundExceeded`] if the window needs more derivations than the
    /// ceiling allows.
    pub fn check_bounds(&self) -> Result<()> {
        let requested = self.options.derivation_count();
        if requested > self.max_derivations {
            return Err(Error::ScanBoundExceeded {
                requested,
                limit: self.max_derivations,
            });
        }
        Ok(())
    }

    /// Search every account of the window for `target`.
    ///
    /// Returns every match; an empty result means the address was not found. Targets that
    /// are not an address of any supported type on the wallet's network fail with
    /// [`Error::InvalidAddress`].
    pub fn scan(&self, target: &str, cancel: &CancelToken) -> Result<Vec<ScanMatch>> {
        self.check_bounds()?;
        let (target, types) = self.candidate_types(target)?;
        log::debug!(
            "Scanning {} accounts x {} indices for {:?}",
            self.options.accounts,
            self.options.indices,
            types
        );

        let mut matches = Vec::new();
        for account in 0..self.options.accounts {
            matches.extend(self.scan_types(&types, account, &target, cancel)?);
        }

        log::info!("Scan finished with {} match(es)", matches.len());
        Ok(matches)
    }

    /// Search a single account for `target`.
    ///
    /// Lets callers split a scan into chunks and yield between them. The ceiling is still
    /// checked against the whole window.
    pub fn scan_account(
        &self,
        account: u32,
        target: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<ScanMatch>> {
        self.check_bounds()?;
        let (target, types) = self.candidate_types(target)?;
        self.scan_types(&types, account, &target, cancel)
    }

    /// The target in the form the wallet derives it, and the requested types that could
    /// have produced it.
    ///
    /// Bech32 addresses are case-insensitive and derived in lower case; Base58 addresses are
    /// compared exactly.
    fn candidate_types(&self, target: &str) -> Result<(String, Vec<AddressType>)> {
        let network = self.wallet.network();
        let target_type = address::classify(target, network).ok_or_else(|| {
            Error::InvalidAddress(format!("{target} is not a supported address on {network}"))
        })?;

        let target = match target_type {
            AddressType::NativeSegwit | AddressType::Taproot | AddressType::Spark => {
                target.to_ascii_lowercase()
            }
            AddressType::Legacy | AddressType::NestedSegwit => target.to_string(),
        };
        let types = self
            .options
            .types()
            .into_iter()
            .filter(|t| *t == target_type)
            .collect();
        Ok((target, types))
    }

    fn scan_types(
        &self,
        types: &[AddressType],
        account: u32,
        target: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<ScanMatch>> {
        let mut matches = Vec::new();
        for &address_type in types {
            cancel.check()?;

            let account_path = path::account_path(address_type, self.wallet.network(), account)?;
            let account_node = self.wallet.derive_path(&account_path)?;

            for (change, index) in self.coordinates(address_type) {
                cancel.check()?;

                let suffix = path::address_suffix(address_type, change, index)?;
                let node = account_node.derive(self.wallet.secp(), &suffix)?;
                if self.wallet.address_of(address_type, &node)? != target {
                    continue;
                }

                let derived =
                    self.wallet
                        .encode_node(address_type, account_path.extend(&suffix), &node)?;
                log::debug!("Match at {}", derived.path);
                matches.push(ScanMatch {
                    address_type,
                    account,
                    change,
                    index,
                    path: derived.path,
                    address: derived.address,
                    key_pair: derived.key_pair,
                });
            }
        }
        Ok(matches)
    }

    /// (change, index) pairs searched for one type within one account.
    fn coordinates(&self, address_type: AddressType) -> Vec<(u32, u32)> {
        if address_type == AddressType::Spark {
            return vec![(RECEIVE_CHAIN, 0)];
        }

        let chains: &[u32] = if self.options.include_change {
            &[RECEIVE_CHAIN, CHANGE_CHAIN]
        } else {
            &[RECEIVE_CHAIN]
        };
        chains
            .iter()
            .flat_map(|&change| (0..self.options.indices).map(move |index| (change, index)))
            .collect()
    }
}

/// Validate `phrase` and search the default window for `target` on `network`.
pub fn scan(phrase: &str, target: &str, network: Network) -> Result<Vec<ScanMatch>> {
    let wallet = HdWallet::from_mnemonic(phrase, network)?;
    Scanner::new(&wallet, ScanOptions::default()).scan(target, &CancelToken::new())
}

/// Run a scan on a dedicated thread.
///
/// The returned handle yields the scan result; `cancel` stops the scan early.
#[cfg(not(target_arch = "wasm32"))]
pub fn spawn_scan(
    wallet: Arc<HdWallet>,
    target: String,
    options: ScanOptions,
    max_derivations: u64,
    cancel: CancelToken,
) -> std::thread::JoinHandle<Result<Vec<ScanMatch>>> {
    std::thread::spawn(move || {
        Scanner::new(&wallet, options)
            .with_max_derivations(max_derivations)
            .scan(&target, &cancel)
    })
}
