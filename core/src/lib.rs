//! Spark Wallet SDK - Core Library
//!
//! Platform-agnostic multi-address wallet: one BIP-39 mnemonic yields a Legacy, Nested
//! SegWit, Native SegWit, Taproot and Spark address per account.
//!
//! This crate provides the core wallet logic that can be used in both native Rust
//! applications and WebAssembly environments. Everything except [`Wallet`] is pure and
//! synchronous; storage of the mnemonic and of the selected account is abstracted through
//! [`WalletStorage`].
//!
//! # Example
//!
//! ```rust,ignore
//! use spark_wallet_core::{assemble, Network};
//!
//! let account = assemble("abandon abandon ... about", Network::Bitcoin)?;
//! assert_eq!(account.native_segwit.address, "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu");
//! ```

pub mod address;
pub mod config;
pub mod detector;
pub mod error;
pub mod hd_wallet;
pub mod keys;
pub mod mnemonic;
pub mod path;
pub mod scanner;
pub mod storage;
pub mod types;
pub mod wallet;

pub use address::SparkAddressFormat;
pub use config::{ScanOptions, WalletConfig};
pub use detector::{DetectedPath, Detection, KNOWN_WALLETS, detect_wallet_type};
pub use error::{Error, Result};
pub use hd_wallet::{HdWallet, assemble};
pub use keys::HdNode;
pub use mnemonic::Strength;
pub use path::DerivationPath;
pub use scanner::{CancelToken, Scanner, scan};
pub use storage::memory::InMemoryWalletStorage;
pub use storage::{StorageFuture, WalletStorage, WalletStorageExt};
pub use types::{Account, AddressType, DerivedAddress, KeyPair, Network, ScanMatch};
pub use wallet::{ByAddressType, Wallet, WalletResponse};
