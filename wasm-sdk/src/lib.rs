//! Spark Wallet SDK - WASM Bindings
//!
//! This crate provides WebAssembly bindings for the Spark Wallet SDK.
//! It wraps the core library with WASM-compatible types and JavaScript interop.
//!
//! **Note:** This crate is WASM-only and will not compile for native targets.
//!
//! # Usage from JavaScript/TypeScript
//!
//! ```javascript
//! import init, { Wallet, JsWalletStorageProvider, ScanHandle } from '@spark-wallet/sdk';
//!
//! await init();
//!
//! const storage = new JsWalletStorageProvider(
//!     async () => localStorage.getItem('mnemonic'),
//!     async (mnemonic) => localStorage.setItem('mnemonic', mnemonic),
//!     async () => parseInt(localStorage.getItem('account_index') ?? '0'),
//!     async (index) => localStorage.setItem('account_index', index.toString())
//! );
//!
//! const wallet = new Wallet(storage, { network: 'bitcoin' });
//! await wallet.generateOrGetMnemonic();
//!
//! const { addresses } = await wallet.response();
//! const matches = await wallet.scan(addresses.taproot, undefined, new ScanHandle());
//! ```

// This crate only compiles for WASM targets
#![cfg(target_arch = "wasm32")]

mod client;
mod error;
mod js_types;
mod storage_adapter;

use serde::Serialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;

pub use client::*;
pub use error::*;
pub use js_types::*;
pub use storage_adapter::*;

use spark_wallet_core::{Network, address, detector, mnemonic};

/// Initialize the WASM module.
///
/// This sets up logging and panic hooks for better debugging.
#[wasm_bindgen(start)]
pub fn initialize() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    console_log::init_with_level(log::Level::Debug).ok();
    log::info!("Spark Wallet SDK initialized");
}

/// Serialize a value to JsValue as a plain object (not a Map).
fn to_js_value<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    let serializer = serde_wasm_bindgen::Serializer::new().serialize_maps_as_objects(true);
    value.serialize(&serializer).map_err(to_js_error)
}

fn from_js_value<T: DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(to_js_error)
}

fn parse_network(network: &str) -> Result<Network, JsValue> {
    map_err_to_js!(network.parse::<Network>())
}

/// Generate a new English mnemonic of `bits` entropy (128, 160, 192, 224 or 256; default 128).
#[wasm_bindgen(js_name = "generateMnemonic")]
pub fn generate_mnemonic(bits: Option<u32>) -> Result<String, JsValue> {
    let phrase = map_err_to_js!(mnemonic::generate_with_bits(bits.unwrap_or(128)))?;
    Ok(phrase.to_string())
}

/// Whether `phrase` is a valid mnemonic. Never throws.
#[wasm_bindgen(js_name = "validateMnemonic")]
pub fn validate_mnemonic(phrase: &str) -> bool {
    mnemonic::validate(phrase)
}

/// Account 0 of `phrase` without touching any storage.
#[wasm_bindgen(js_name = "assembleWallet")]
pub fn assemble_wallet(phrase: &str, network: &str) -> Result<JsValue, JsValue> {
    let account = map_err_to_js!(spark_wallet_core::assemble(phrase, parse_network(network)?))?;
    to_js_value(&account)
}

/// The address type of `address` on `network`, or `undefined` if it is not a supported
/// address.
#[wasm_bindgen(js_name = "classifyAddress")]
pub fn classify_address(address: &str, network: &str) -> Result<Option<String>, JsValue> {
    let network = parse_network(network)?;
    Ok(address::classify(address, network).map(|t| t.to_string()))
}

/// Names of the third-party wallets `Wallet.detectWalletType` knows about.
#[wasm_bindgen(js_name = "knownWallets")]
pub fn known_wallets() -> Vec<String> {
    detector::KNOWN_WALLETS
        .iter()
        .map(|profile| profile.name.to_string())
        .collect()
}

/// SDK version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
