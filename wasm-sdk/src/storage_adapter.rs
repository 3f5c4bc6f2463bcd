//! JavaScript storage adapter for WASM.
//!
//! Bridges JavaScript storage to the core `WalletStorage` trait, either through
//! Promise-returning callbacks supplied by TypeScript or directly through
//! `window.localStorage`.

use js_sys::{Function, Promise};
use spark_wallet_core::Error;
use spark_wallet_core::storage::{StorageFuture, WalletStorage};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

/// JavaScript wallet storage provider passed from TypeScript.
///
/// Each function must return a Promise.
///
/// # Example (TypeScript)
///
/// ```typescript
/// const provider = new JsWalletStorageProvider(
///     async () => localStorage.getItem('mnemonic'),
///     async (mnemonic) => localStorage.setItem('mnemonic', mnemonic),
///     async () => parseInt(localStorage.getItem('account_index') ?? '0'),
///     async (index) => localStorage.setItem('account_index', index.toString()),
/// );
/// ```
#[wasm_bindgen]
pub struct JsWalletStorageProvider {
    get_mnemonic_fn: Function,
    set_mnemonic_fn: Function,
    get_account_index_fn: Function,
    set_account_index_fn: Function,
}

#[wasm_bindgen]
impl JsWalletStorageProvider {
    /// # Arguments
    /// * `get_mnemonic_fn` - Function: `() => Promise<string | null>`
    /// * `set_mnemonic_fn` - Function: `(mnemonic: string) => Promise<void>`
    /// * `get_account_index_fn` - Function: `() => Promise<number>`
    /// * `set_account_index_fn` - Function: `(index: number) => Promise<void>`
    #[wasm_bindgen(constructor)]
    pub fn new(
        get_mnemonic_fn: Function,
        set_mnemonic_fn: Function,
        get_account_index_fn: Function,
        set_account_index_fn: Function,
    ) -> Self {
        Self {
            get_mnemonic_fn,
            set_mnemonic_fn,
            get_account_index_fn,
            set_account_index_fn,
        }
    }
}

/// Await the Promise returned by a storage callback.
async fn settle(name: &'static str, called: Result<JsValue, JsValue>) -> Result<JsValue, Error> {
    let promise: Promise = called
        .map_err(|e| Error::Storage(format!("Failed to call {name}: {e:?}")))?
        .dyn_into()
        .map_err(|_| Error::Storage(format!("Expected Promise from {name}")))?;

    JsFuture::from(promise)
        .await
        .map_err(|e| Error::Storage(format!("{name} Promise rejected: {e:?}")))
}

/// Implements the core `WalletStorage` trait using the JS callbacks.
pub struct JsWalletStorageAdapter {
    provider: JsWalletStorageProvider,
}

impl JsWalletStorageAdapter {
    pub fn new(provider: JsWalletStorageProvider) -> Self {
        Self { provider }
    }
}

impl WalletStorage for JsWalletStorageAdapter {
    fn get_mnemonic(&self) -> StorageFuture<'_, Option<String>> {
        let result = self.provider.get_mnemonic_fn.call0(&JsValue::NULL);

        Box::pin(async move {
            let value = settle("get_mnemonic", result).await?;
            if value.is_null() || value.is_undefined() {
                return Ok(None);
            }
            value
                .as_string()
                .map(Some)
                .ok_or_else(|| Error::Storage("get_mnemonic resolved to a non-string".into()))
        })
    }

    fn set_mnemonic(&self, mnemonic: &str) -> StorageFuture<'_, ()> {
        let mnemonic = JsValue::from_str(mnemonic);
        let result = self
            .provider
            .set_mnemonic_fn
            .call1(&JsValue::NULL, &mnemonic);

        Box::pin(async move {
            settle("set_mnemonic", result).await?;
            Ok(())
        })
    }

    fn get_account_index(&self) -> StorageFuture<'_, u32> {
        let result = self.provider.get_account_index_fn.call0(&JsValue::NULL);

        Box::pin(async move {
            let value = settle("get_account_index", result).await?;
            if value.is_null() || value.is_undefined() {
                return Ok(0);
            }
            parse_account_index(value.as_f64())
        })
    }

    fn set_account_index(&self, index: u32) -> StorageFuture<'_, ()> {
        let index = JsValue::from_f64(f64::from(index));
        let result = self
            .provider
            .set_account_index_fn
            .call1(&JsValue::NULL, &index);

        Box::pin(async move {
            settle("set_account_index", result).await?;
            Ok(())
        })
    }
}

/// Accept only non-negative integers that fit in `u32`; `NaN` (e.g. `parseInt` of an empty
/// string) counts as unset.
fn parse_account_index(value: Option<f64>) -> Result<u32, Error> {
    match value {
        Some(v) if v.is_nan() => Ok(0),
        Some(v) if v.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&v) => Ok(v as u32),
        other => Err(Error::Storage(format!(
            "get_account_index resolved to an invalid index: {other:?}"
        ))),
    }
}

/// Wallet storage backed directly by `window.localStorage`.
pub struct LocalStorageAdapter {
    storage: web_sys::Storage,
    prefix: String,
}

impl LocalStorageAdapter {
    pub fn new(prefix: &str) -> Result<Self, Error> {
        let storage = web_sys::window()
            .ok_or_else(|| Error::Storage("no window object".into()))?
            .local_storage()
            .map_err(|e| Error::Storage(format!("localStorage is not accessible: {e:?}")))?
            .ok_or_else(|| Error::Storage("localStorage is not available".into()))?;

        Ok(Self {
            storage,
            prefix: prefix.to_string(),
        })
    }

    fn key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    fn get(&self, name: &str) -> Result<Option<String>, Error> {
        self.storage
            .get_item(&self.key(name))
            .map_err(|e| Error::Storage(format!("localStorage read failed: {e:?}")))
    }

    fn set(&self, name: &str, value: &str) -> Result<(), Error> {
        self.storage
            .set_item(&self.key(name), value)
            .map_err(|e| Error::Storage(format!("localStorage write failed: {e:?}")))
    }
}

impl WalletStorage for LocalStorageAdapter {
    fn get_mnemonic(&self) -> StorageFuture<'_, Option<String>> {
        let result = self.get("mnemonic");
        Box::pin(async move { result })
    }

    fn set_mnemonic(&self, mnemonic: &str) -> StorageFuture<'_, ()> {
        let result = self.set("mnemonic", mnemonic);
        Box::pin(async move { result })
    }

    fn get_account_index(&self) -> StorageFuture<'_, u32> {
        let result = self.get("account_index").and_then(|stored| match stored {
            None => Ok(0),
            Some(raw) => raw
                .parse()
                .map_err(|_| Error::Storage(format!("stored account index {raw:?} is invalid"))),
        });
        Box::pin(async move { result })
    }

    fn set_account_index(&self, index: u32) -> StorageFuture<'_, ()> {
        let result = self.set("account_index", &index.to_string());
        Box::pin(async move { result })
    }
}

/// The storage backends a `Wallet` can be created with.
pub enum StorageBackend {
    Js(JsWalletStorageAdapter),
    Local(LocalStorageAdapter),
}

impl WalletStorage for StorageBackend {
    fn get_mnemonic(&self) -> StorageFuture<'_, Option<String>> {
        match self {
            StorageBackend::Js(s) => s.get_mnemonic(),
            StorageBackend::Local(s) => s.get_mnemonic(),
        }
    }

    fn set_mnemonic(&self, mnemonic: &str) -> StorageFuture<'_, ()> {
        match self {
            StorageBackend::Js(s) => s.set_mnemonic(mnemonic),
            StorageBackend::Local(s) => s.set_mnemonic(mnemonic),
        }
    }

    fn get_account_index(&self) -> StorageFuture<'_, u32> {
        match self {
            StorageBackend::Js(s) => s.get_account_index(),
            StorageBackend::Local(s) => s.get_account_index(),
        }
    }

    fn set_account_index(&self, index: u32) -> StorageFuture<'_, ()> {
        match self {
            StorageBackend::Js(s) => s.set_account_index(index),
            StorageBackend::Local(s) => s.set_account_index(index),
        }
    }
}
