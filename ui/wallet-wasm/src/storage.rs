//! Browser `localStorage` backend for the configuration store.

use aw_store::LocalConfigStore;
use aw_types::{CONFIG_STORAGE_KEY, ConfigPatch, WalletConfig};
use gloo_storage::{LocalStorage, Storage};

/// Persists the wallet configuration under [`CONFIG_STORAGE_KEY`].
///
/// A missing key is a normal first run. Anything else that goes wrong is
/// logged and treated as absent so a corrupt record never blocks startup.
pub struct BrowserLocalStore;

impl LocalConfigStore for BrowserLocalStore {
    fn load(&self) -> Option<ConfigPatch> {
        match LocalStorage::get::<ConfigPatch>(CONFIG_STORAGE_KEY) {
            Ok(patch) => Some(patch),
            Err(gloo_storage::errors::StorageError::KeyNotFound(_)) => None,
            Err(err) => {
                gloo_console::warn!(format!("[ai-wallet] unreadable stored config: {err}"));
                None
            }
        }
    }

    fn save(&self, config: &WalletConfig) {
        if let Err(err) = LocalStorage::set(CONFIG_STORAGE_KEY, config) {
            gloo_console::warn!(format!("[ai-wallet] failed to persist config: {err}"));
        }
    }
}
