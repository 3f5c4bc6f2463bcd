//! Error types for the Spark Wallet SDK.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Spark Wallet SDK.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid mnemonic phrase (bad word, word count or checksum).
    #[error("Invalid mnemonic phrase: {0}")]
    InvalidMnemonic(String),

    /// Entropy size is not one of 128, 160, 192, 224 or 256 bits.
    #[error("Unsupported mnemonic strength: {0} bits")]
    InvalidStrength(u32),

    /// Malformed derivation path string.
    #[error("Invalid derivation path: {0}")]
    InvalidPath(String),

    /// A path segment does not fit in the 31-bit child index range.
    #[error("Derivation index out of range: {0}")]
    DerivationOverflow(String),

    /// Input to an address encoder is not a compressed secp256k1 point.
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// The string is not an address of any supported type on this network.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Requested scan window is larger than the configured ceiling.
    #[error("Scan window of {requested} derivations exceeds the limit of {limit}")]
    ScanBoundExceeded { requested: u64, limit: u64 },

    /// The scan was aborted through its cancel token.
    #[error("Scan cancelled")]
    ScanCancelled,

    /// No mnemonic found in storage.
    #[error("No mnemonic found in storage. Generate or import one first.")]
    NoMnemonic,

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Parse error.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Key derivation error.
    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    /// Generic error with context.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the error was caused by caller input rather than by the environment.
    ///
    /// HTTP endpoints map these to `400`, everything else to `500`.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Error::InvalidMnemonic(_)
                | Error::InvalidStrength(_)
                | Error::InvalidPath(_)
                | Error::DerivationOverflow(_)
                | Error::InvalidPublicKey(_)
                | Error::InvalidAddress(_)
                | Error::ScanBoundExceeded { .. }
                | Error::Parse(_)
        )
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(format!("{:#}", err))
    }
}

impl From<bip39::Error> for Error {
    fn from(err: bip39::Error) -> Self {
        Error::InvalidMnemonic(err.to_string())
    }
}
