//! WASM-friendly type wrappers.
//!
//! These types wrap the core SDK types with wasm_bindgen annotations
//! for seamless JavaScript interop.

use serde::Serialize;
use spark_wallet_core::{CancelToken, DerivedAddress, Detection};
use wasm_bindgen::prelude::*;

/// Cancels a running `Wallet.scan`.
///
/// ```javascript
/// const handle = new ScanHandle();
/// const pending = wallet.scan(address, undefined, handle.share());
/// cancelButton.onclick = () => handle.cancel();
/// ```
#[wasm_bindgen]
#[derive(Debug, Clone, Default)]
pub struct ScanHandle {
    token: CancelToken,
}

#[wasm_bindgen]
impl ScanHandle {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::default()
    }

    /// A second handle controlling the same scan. Passing a handle to `scan` consumes it.
    pub fn share(&self) -> ScanHandle {
        self.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[wasm_bindgen(js_name = "isCancelled")]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl ScanHandle {
    pub(crate) fn token(&self) -> CancelToken {
        self.token.clone()
    }
}

/// A single derived address.
#[wasm_bindgen]
#[derive(Debug, Clone)]
pub struct AddressInfo {
    /// One of `legacy`, `nativeSegwit`, `nestedSegwit`, `taproot`, `spark`.
    #[wasm_bindgen(getter_with_clone, js_name = "addressType")]
    pub address_type: String,
    #[wasm_bindgen(getter_with_clone)]
    pub path: String,
    #[wasm_bindgen(getter_with_clone)]
    pub address: String,
    /// Compressed public key (hex-encoded).
    #[wasm_bindgen(getter_with_clone, js_name = "publicKey")]
    pub public_key: String,
}

impl From<DerivedAddress> for AddressInfo {
    fn from(derived: DerivedAddress) -> Self {
        Self {
            address_type: derived.address_type.to_string(),
            path: derived.path.to_string(),
            address: derived.address,
            public_key: hex::encode(derived.key_pair.public_key.serialize()),
        }
    }
}

/// Result of `Wallet.detectWalletType`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DetectionResult {
    #[serde(flatten)]
    pub detection: Detection,
    /// Wallets whose address equals the reference address, if one was given.
    pub matching_wallets: Vec<String>,
}

impl DetectionResult {
    pub fn new(detection: Detection, reference: Option<&str>) -> Self {
        let matching_wallets = reference
            .map(|address| {
                detection
                    .wallets_for(address)
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self {
            detection,
            matching_wallets,
        }
    }
}
