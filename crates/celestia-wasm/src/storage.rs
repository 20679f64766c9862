//! `window.localStorage` as a [`PreferenceStore`].

use celestia::error::StorageError;
use celestia::storage::PreferenceStore;
use wasm_bindgen::JsValue;
use web_sys::{Storage, Window};

/// Reads and writes `localStorage`. Access is re-checked on every call:
/// browsers may revoke storage while the page is open.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    window: Window,
}

impl LocalStorage {
    pub fn new(window: Window) -> Self {
        Self { window }
    }

    fn storage(&self) -> Result<Storage, StorageError> {
        match self.window.local_storage() {
            Ok(Some(storage)) => Ok(storage),
            Ok(None) => Err(StorageError::unavailable("localStorage is null")),
            Err(err) => Err(StorageError::unavailable(describe(&err))),
        }
    }
}

impl PreferenceStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage()?
            .get_item(key)
            .map_err(|err| StorageError::unavailable(describe(&err)))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage()?
            .set_item(key, value)
            .map_err(|err| StorageError::write_rejected(describe(&err)))
    }
}

/// Human-readable text for a thrown JS value (`DOMException` or string).
pub(crate) fn describe(err: &JsValue) -> String {
    err.as_string()
        .or_else(|| {
            js_sys::Reflect::get(err, &JsValue::from_str("message"))
                .ok()
                .and_then(|message| message.as_string())
        })
        .unwrap_or_else(|| format!("{err:?}"))
}
