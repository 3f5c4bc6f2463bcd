//! Hierarchical Deterministic (HD) wallet implementation.
//!
//! This module assembles BIP39/BIP32 key material into addresses. An [`HdWallet`] is
//! immutable: it holds the mnemonic and the master key, and every account or address is
//! recomputed from them on request.

use crate::address::{self, SparkAddressFormat};
use crate::config::WalletConfig;
use crate::error::Result;
use crate::keys::{self, HdNode};
use crate::mnemonic::{self, Strength};
use crate::path::{self, DerivationPath};
use crate::types::{Account, AddressType, DerivedAddress, Network};
use bitcoin::bip32::Xpub;
use bitcoin::secp256k1::{All, Secp256k1};

/// HD Wallet for multi-address key derivation.
pub struct HdWallet {
    mnemonic: bip39::Mnemonic,
    network: Network,
    spark_format: SparkAddressFormat,
    secp: Secp256k1<All>,
    master: HdNode,
}

impl HdWallet {
    /// Generate a new HD wallet with a random mnemonic.
    pub fn generate(network: Network, strength: Strength) -> Result<Self> {
        let mnemonic = mnemonic::generate(strength)?;
        Self::new(mnemonic, "", network)
    }

    /// Create an HD wallet from an existing mnemonic phrase.
    pub fn from_mnemonic(phrase: &str, network: Network) -> Result<Self> {
        Self::from_mnemonic_with_passphrase(phrase, "", network)
    }

    /// Create an HD wallet from a mnemonic phrase and a BIP-39 passphrase.
    pub fn from_mnemonic_with_passphrase(
        phrase: &str,
        passphrase: &str,
        network: Network,
    ) -> Result<Self> {
        let mnemonic = mnemonic::parse(phrase)?;
        Self::new(mnemonic, passphrase, network)
    }

    /// Create an HD wallet using the network and Spark format of `config`.
    pub fn from_config(phrase: &str, config: &WalletConfig) -> Result<Self> {
        Ok(Self::from_mnemonic(phrase, config.network)?
            .with_spark_format(config.spark_address_format))
    }

    fn new(mnemonic: bip39::Mnemonic, passphrase: &str, network: Network) -> Result<Self> {
        let secp = Secp256k1::new();
        let seed = mnemonic::to_seed(&mnemonic, passphrase);
        let master = keys::derive_master_key(&secp, &seed, network)?;

        Ok(Self {
            mnemonic,
            network,
            spark_format: SparkAddressFormat::default(),
            secp,
            master,
        })
    }

    /// Select the Spark address scheme used for this wallet's Spark addresses.
    pub fn with_spark_format(mut self, spark_format: SparkAddressFormat) -> Self {
        self.spark_format = spark_format;
        self
    }

    /// Get the mnemonic phrase as a string.
    pub fn mnemonic_phrase(&self) -> String {
        self.mnemonic.to_string()
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn spark_format(&self) -> SparkAddressFormat {
        self.spark_format
    }

    pub fn secp(&self) -> &Secp256k1<All> {
        &self.secp
    }

    pub fn master(&self) -> &HdNode {
        &self.master
    }

    /// Derive the node at an arbitrary path from the master key.
    pub fn derive_path(&self, path: &DerivationPath) -> Result<HdNode> {
        keys::derive(&self.secp, &self.master, path)
    }

    /// The account-level node of an address type (`m/purpose'/coin'/account'`).
    pub fn account_node(&self, address_type: AddressType, account: u32) -> Result<HdNode> {
        self.derive_path(&path::account_path(address_type, self.network, account)?)
    }

    /// Extended public key of an account, for watch-only derivation of its addresses.
    pub fn account_xpub(&self, address_type: AddressType, account: u32) -> Result<Xpub> {
        let node = self.account_node(address_type, account)?;
        Ok(node.to_xpub(&self.secp))
    }

    /// Derive the address of one type at the given account, chain and index.
    pub fn derive_address(
        &self,
        address_type: AddressType,
        account: u32,
        change: u32,
        index: u32,
    ) -> Result<DerivedAddress> {
        let path = path::address_path(address_type, self.network, account, change, index)?;
        self.derive_address_at(address_type, path)
    }

    /// Derive the key at `path` and encode it as an address of `address_type`.
    ///
    /// The path is used as given; it does not have to follow the purpose convention of the
    /// address type. This is what third-party wallet profiles rely on.
    pub fn derive_address_at(
        &self,
        address_type: AddressType,
        path: DerivationPath,
    ) -> Result<DerivedAddress> {
        let node = self.derive_path(&path)?;
        self.encode_node(address_type, path, &node)
    }

    /// Encode an already derived node.
    pub(crate) fn encode_node(
        &self,
        address_type: AddressType,
        path: DerivationPath,
        node: &HdNode,
    ) -> Result<DerivedAddress> {
        Ok(DerivedAddress {
            address_type,
            path,
            address: self.address_of(address_type, node)?,
            key_pair: node.key_pair(self.network),
        })
    }

    /// The address string of a node, without building its key pair.
    pub(crate) fn address_of(&self, address_type: AddressType, node: &HdNode) -> Result<String> {
        match (address_type, self.spark_format) {
            (AddressType::Spark, SparkAddressFormat::LegacyHash) => {
                Ok(address::legacy_spark_address(&self.mnemonic.to_string()))
            }
            _ => address::encode(
                &self.secp,
                address_type,
                &node.public_key().serialize(),
                self.network,
            ),
        }
    }

    /// Assemble an account: one address per type at change 0, index 0 of `account`.
    pub fn assemble(&self, account: u32) -> Result<Account> {
        let derive = |address_type| {
            let path = path::default_path(address_type, self.network, account)?;
            self.derive_address_at(address_type, path)
        };

        let assembled = Account {
            index: account,
            network: self.network,
            legacy: derive(AddressType::Legacy)?,
            native_segwit: derive(AddressType::NativeSegwit)?,
            nested_segwit: derive(AddressType::NestedSegwit)?,
            taproot: derive(AddressType::Taproot)?,
            spark: derive(AddressType::Spark)?,
        };
        log::debug!("Assembled account {} on {}", account, self.network);

        Ok(assembled)
    }
}

impl std::fmt::Debug for HdWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HdWallet")
            .field("network", &self.network)
            .field("spark_format", &self.spark_format)
            .finish_non_exhaustive()
    }
}

/// Validate `phrase` and assemble account 0 on `network`.
pub fn assemble(phrase: &str, network: Network) -> Result<Account> {
    HdWallet::from_mnemonic(phrase, network)?.assemble(0)
}
