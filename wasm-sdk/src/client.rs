use crate::js_types::{AddressInfo, DetectionResult, ScanHandle};
use crate::map_err_to_js;
use crate::storage_adapter::{
    JsWalletStorageAdapter, JsWalletStorageProvider, LocalStorageAdapter, StorageBackend,
};
use crate::{from_js_value, to_js_value};
use js_sys::Promise;
use spark_wallet_core::{AddressType, ScanOptions, Scanner, Strength, WalletConfig};
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::wasm_bindgen;
use wasm_bindgen_futures::JsFuture;

/// Default key prefix used by `Wallet.withLocalStorage`.
const LOCAL_STORAGE_PREFIX: &str = "spark_wallet_";

/// Spark wallet.
///
/// Holds no keys itself: the mnemonic and the selected account live in the storage it was
/// created with, and every call re-derives what it needs.
#[wasm_bindgen]
pub struct Wallet {
    inner: spark_wallet_core::Wallet<StorageBackend>,
}

#[wasm_bindgen]
impl Wallet {
    /// Create a wallet backed by JavaScript storage callbacks.
    ///
    /// # Arguments
    /// * `storage` - Storage provider for the mnemonic and account index
    /// * `config` - Optional `WalletConfig` object, e.g. `{ network: "testnet" }`
    #[wasm_bindgen(constructor)]
    pub fn new(storage: JsWalletStorageProvider, config: JsValue) -> Result<Wallet, JsValue> {
        let config = parse_config(config)?;
        let storage = StorageBackend::Js(JsWalletStorageAdapter::new(storage));
        Ok(Wallet {
            inner: spark_wallet_core::Wallet::new(storage, config),
        })
    }

    /// Create a wallet that keeps its data in `window.localStorage` under `prefix`.
    #[wasm_bindgen(js_name = "withLocalStorage")]
    pub fn with_local_storage(prefix: Option<String>, config: JsValue) -> Result<Wallet, JsValue> {
        let config = parse_config(config)?;
        let prefix = prefix.unwrap_or_else(|| LOCAL_STORAGE_PREFIX.to_string());
        let storage = StorageBackend::Local(map_err_to_js!(LocalStorageAdapter::new(&prefix))?);
        Ok(Wallet {
            inner: spark_wallet_core::Wallet::new(storage, config),
        })
    }

    #[wasm_bindgen(getter)]
    pub fn network(&self) -> String {
        self.inner.network().to_string()
    }

    /// Return the stored mnemonic, generating one of `bits` entropy (default 128) if absent.
    #[wasm_bindgen(js_name = "generateOrGetMnemonic")]
    pub async fn generate_or_get_mnemonic(&self, bits: Option<u32>) -> Result<String, JsValue> {
        let strength = match bits {
            Some(bits) => map_err_to_js!(Strength::from_bits(bits))?,
            None => Strength::default(),
        };
        map_err_to_js!(self.inner.generate_or_get_mnemonic(strength).await)
    }

    #[wasm_bindgen(js_name = "getMnemonic")]
    pub async fn get_mnemonic(&self) -> Result<Option<String>, JsValue> {
        map_err_to_js!(self.inner.get_mnemonic().await)
    }

    /// Validate and store `phrase`, replacing the current mnemonic. Returns the normalized
    /// phrase.
    #[wasm_bindgen(js_name = "importMnemonic")]
    pub async fn import_mnemonic(&self, phrase: String) -> Result<String, JsValue> {
        map_err_to_js!(self.inner.import_mnemonic(&phrase).await)
    }

    #[wasm_bindgen(js_name = "getAccountIndex")]
    pub async fn get_account_index(&self) -> Result<u32, JsValue> {
        map_err_to_js!(self.inner.get_account_index().await)
    }

    /// The selected account with all five addresses and key pairs.
    #[wasm_bindgen(js_name = "getAccount")]
    pub async fn get_account(&self) -> Result<JsValue, JsValue> {
        let account = map_err_to_js!(self.inner.account().await)?;
        to_js_value(&account)
    }

    #[wasm_bindgen(js_name = "getAccountAt")]
    pub async fn get_account_at(&self, index: u32) -> Result<JsValue, JsValue> {
        let account = map_err_to_js!(self.inner.account_at(index).await)?;
        to_js_value(&account)
    }

    #[wasm_bindgen(js_name = "switchAccount")]
    pub async fn switch_account(&self, index: u32) -> Result<JsValue, JsValue> {
        let account = map_err_to_js!(self.inner.switch_account(index).await)?;
        to_js_value(&account)
    }

    #[wasm_bindgen(js_name = "nextAccount")]
    pub async fn next_account(&self) -> Result<JsValue, JsValue> {
        let account = map_err_to_js!(self.inner.next_account().await)?;
        to_js_value(&account)
    }

    /// Derive one address at an arbitrary coordinate.
    #[wasm_bindgen(js_name = "deriveAddress")]
    pub async fn derive_address(
        &self,
        address_type: String,
        account: u32,
        change: u32,
        index: u32,
    ) -> Result<AddressInfo, JsValue> {
        let address_type: AddressType = map_err_to_js!(address_type.parse())?;
        let wallet = map_err_to_js!(self.inner.hd_wallet().await)?;
        let derived = map_err_to_js!(wallet.derive_address(address_type, account, change, index))?;
        Ok(derived.into())
    }

    /// Find where `target` comes from.
    ///
    /// Scans one account at a time and yields to the event loop in between, so the page
    /// stays responsive and `handle.cancel()` takes effect. Resolves to an array of matches,
    /// empty if the address was not found.
    pub async fn scan(
        &self,
        target: String,
        options: JsValue,
        handle: Option<ScanHandle>,
    ) -> Result<JsValue, JsValue> {
        let options: ScanOptions = if options.is_undefined() || options.is_null() {
            self.inner.config().scan.clone()
        } else {
            from_js_value(options)?
        };
        let cancel = handle.map(|h| h.token()).unwrap_or_default();

        let wallet = map_err_to_js!(self.inner.hd_wallet().await)?;
        let scanner = Scanner::new(&wallet, options)
            .with_max_derivations(self.inner.config().max_scan_derivations);
        map_err_to_js!(scanner.check_bounds())?;

        let mut matches = Vec::new();
        for account in 0..scanner.options().accounts {
            matches.extend(map_err_to_js!(scanner.scan_account(account, &target, &cancel))?);
            yield_to_event_loop().await?;
        }
        log::info!("Scan finished with {} match(es)", matches.len());

        to_js_value(&matches)
    }

    /// Derive the default address of every known third-party wallet.
    ///
    /// With `reference_address`, the result also lists the wallets that produce it.
    #[wasm_bindgen(js_name = "detectWalletType")]
    pub async fn detect_wallet_type(
        &self,
        reference_address: Option<String>,
    ) -> Result<JsValue, JsValue> {
        let detection = map_err_to_js!(self.inner.detect_wallet_type().await)?;
        to_js_value(&DetectionResult::new(detection, reference_address.as_deref()))
    }

    /// `{ mnemonic, addresses, privateKeys }` of the selected account.
    pub async fn response(&self) -> Result<JsValue, JsValue> {
        let response = map_err_to_js!(self.inner.response().await)?;
        to_js_value(&response)
    }
}

fn parse_config(config: JsValue) -> Result<WalletConfig, JsValue> {
    if config.is_undefined() || config.is_null() {
        return Ok(WalletConfig::default());
    }
    from_js_value(config)
}

/// Let the browser run other tasks before continuing.
async fn yield_to_event_loop() -> Result<(), JsValue> {
    let promise = Promise::new(&mut |resolve, _reject| {
        let scheduled = web_sys::window()
            .map(|window| window.set_timeout_with_callback(&resolve).is_ok())
            .unwrap_or(false);
        if !scheduled {
            // Not in a window (e.g. a worker): a resolved promise still yields to the
            // microtask queue.
            let _ = resolve.call0(&JsValue::NULL);
        }
    });
    JsFuture::from(promise).await?;
    Ok(())
}
