//! Error conversion utilities for WASM.

use wasm_bindgen::prelude::*;

/// Convert an error into a JavaScript `Error` whose message is the display string.
pub fn to_js_error<E: std::fmt::Display>(err: E) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

/// Macro to convert Rust errors to JavaScript values.
#[macro_export]
macro_rules! map_err_to_js {
    ($expr:expr) => {
        $expr.map_err($crate::error::to_js_error)
    };
}
