//! BIP-32 hierarchical key derivation.

use crate::error::{Error, Result};
use crate::mnemonic::Seed;
use crate::path::DerivationPath;
use crate::types::{KeyPair, Network};
use bitcoin::bip32::{ChainCode, ChildNumber, Fingerprint, Xpriv, Xpub};
use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey, Signing, Verification};

/// An extended private key: secret key, public key and chain code at some depth of the tree.
#[derive(Clone, PartialEq, Eq)]
pub struct HdNode {
    xpriv: Xpriv,
    public_key: PublicKey,
}

impl std::fmt::Debug for HdNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HdNode")
            .field("depth", &self.xpriv.depth)
            .field("child_number", &self.xpriv.child_number)
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

impl HdNode {
    fn from_xpriv<C: Signing>(secp: &Secp256k1<C>, xpriv: Xpriv) -> Self {
        let public_key = xpriv.private_key.public_key(secp);
        Self { xpriv, public_key }
    }

    pub fn secret_key(&self) -> SecretKey {
        self.xpriv.private_key
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    pub fn chain_code(&self) -> ChainCode {
        self.xpriv.chain_code
    }

    pub fn depth(&self) -> u8 {
        self.xpriv.depth
    }

    pub fn child_number(&self) -> ChildNumber {
        self.xpriv.child_number
    }

    pub fn fingerprint<C: Signing>(&self, secp: &Secp256k1<C>) -> Fingerprint {
        self.xpriv.fingerprint(secp)
    }

    /// The neutered (public-only) counterpart of this node.
    pub fn to_xpub<C: Signing>(&self, secp: &Secp256k1<C>) -> Xpub {
        Xpub::from_priv(secp, &self.xpriv)
    }

    pub fn xpriv(&self) -> &Xpriv {
        &self.xpriv
    }

    /// The node's keys, with the secret also rendered as WIF for `network`.
    pub fn key_pair(&self, network: Network) -> KeyPair {
        let private_key = bitcoin::PrivateKey::new(self.secret_key(), network.to_bitcoin_network());
        KeyPair {
            secret_key: self.secret_key(),
            public_key: self.public_key,
            wif: private_key.to_wif(),
        }
    }

    /// Walk `path` from this node, one child derivation per segment.
    ///
    /// Hardened segments use the private key, so any path can be derived from a private node.
    pub fn derive<C: Signing, P: AsRef<[ChildNumber]>>(
        &self,
        secp: &Secp256k1<C>,
        path: &P,
    ) -> Result<HdNode> {
        let xpriv = self
            .xpriv
            .derive_priv(secp, path)
            .map_err(|e| Error::KeyDerivation(format!("Key derivation failed: {}", e)))?;
        Ok(Self::from_xpriv(secp, xpriv))
    }
}

/// Derive the master node of a seed (BIP-32 `m`).
pub fn derive_master_key<C: Signing>(
    secp: &Secp256k1<C>,
    seed: &Seed,
    network: Network,
) -> Result<HdNode> {
    let xpriv = Xpriv::new_master(network.to_bitcoin_network(), seed.as_bytes())
        .map_err(|e| Error::KeyDerivation(format!("Failed to derive master key: {}", e)))?;
    Ok(HdNode::from_xpriv(secp, xpriv))
}

/// Derive the node at `path` below `node`.
pub fn derive<C: Signing>(
    secp: &Secp256k1<C>,
    node: &HdNode,
    path: &DerivationPath,
) -> Result<HdNode> {
    node.derive(secp, path)
}

/// Public-only derivation from an extended public key.
///
/// Only non-hardened segments can be followed without the private key; a hardened segment
/// fails with [`Error::InvalidPath`].
pub fn derive_public<C: Verification>(
    secp: &Secp256k1<C>,
    xpub: &Xpub,
    path: &DerivationPath,
) -> Result<PublicKey> {
    if let Some(hardened) = path.children().iter().find(|c| c.is_hardened()) {
        return Err(Error::InvalidPath(format!(
            "{path}: hardened segment {hardened} requires the private key"
        )));
    }
    let derived = xpub
        .derive_pub(secp, path)
        .map_err(|e| Error::KeyDerivation(format!("Public key derivation failed: {}", e)))?;
    Ok(derived.public_key)
}
