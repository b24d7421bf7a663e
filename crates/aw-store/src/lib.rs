use async_trait::async_trait;
use aw_types::{ConfigPatch, WalletConfig};
use std::cell::{Cell, RefCell};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("read failed: {0}")]
    Read(String),
    #[error("write failed: {0}")]
    Write(String),
    #[error("remote backend is not connected")]
    Disconnected,
}

/// Synchronous per-browser store. Fails soft on both directions: a load
/// that cannot be parsed is absent, a save that cannot be written is
/// dropped. Errors are logged, never returned.
pub trait LocalConfigStore {
    fn load(&self) -> Option<ConfigPatch>;
    fn save(&self, config: &WalletConfig);
}

/// Asynchronous user-controlled sync backend. `load`/`save` may only be
/// called while `is_connected` reports true; the backend only reaches that
/// state after its connect handshake completes.
#[async_trait(?Send)]
pub trait RemoteConfigStore {
    fn is_connected(&self) -> bool;
    async fn load(&self) -> Result<Option<ConfigPatch>, StoreError>;
    async fn save(&self, config: &WalletConfig) -> Result<(), StoreError>;
}

// ── In-memory implementations ──
//
// Backed by JSON strings rather than parsed structs so that every load and
// save goes through real (de)serialization, same as the browser stores.

#[derive(Default)]
pub struct MemoryLocalStore {
    record: RefCell<Option<String>>,
    saves: Cell<u32>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(raw: &str) -> Self {
        Self {
            record: RefCell::new(Some(raw.to_owned())),
            saves: Cell::new(0),
        }
    }

    pub fn raw(&self) -> Option<String> {
        self.record.borrow().clone()
    }

    pub fn save_count(&self) -> u32 {
        self.saves.get()
    }
}

impl LocalConfigStore for MemoryLocalStore {
    fn load(&self) -> Option<ConfigPatch> {
        let raw = self.record.borrow().clone()?;
        match serde_json::from_str(&raw) {
            Ok(patch) => Some(patch),
            Err(err) => {
                warn!("discarding malformed local record: {err}");
                None
            }
        }
    }

    fn save(&self, config: &WalletConfig) {
        match serde_json::to_string(config) {
            Ok(raw) => {
                *self.record.borrow_mut() = Some(raw);
                self.saves.set(self.saves.get() + 1);
            }
            Err(err) => warn!("could not serialize configuration: {err}"),
        }
    }
}

pub struct MemoryRemoteStore {
    connected: Cell<bool>,
    record: RefCell<Option<String>>,
    saves: Cell<u32>,
}

impl MemoryRemoteStore {
    pub fn connected() -> Self {
        Self {
            connected: Cell::new(true),
            record: RefCell::new(None),
            saves: Cell::new(0),
        }
    }

    pub fn disconnected() -> Self {
        Self {
            connected: Cell::new(false),
            record: RefCell::new(None),
            saves: Cell::new(0),
        }
    }

    pub fn seeded(raw: &str) -> Self {
        let store = Self::connected();
        *store.record.borrow_mut() = Some(raw.to_owned());
        store
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.set(connected);
    }

    pub fn raw(&self) -> Option<String> {
        self.record.borrow().clone()
    }

    pub fn save_count(&self) -> u32 {
        self.saves.get()
    }
}

#[async_trait(?Send)]
impl RemoteConfigStore for MemoryRemoteStore {
    fn is_connected(&self) -> bool {
        self.connected.get()
    }

    async fn load(&self) -> Result<Option<ConfigPatch>, StoreError> {
        if !self.is_connected() {
            return Err(StoreError::Disconnected);
        }
        let Some(raw) = self.record.borrow().clone() else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|err| StoreError::Read(err.to_string()))
    }

    async fn save(&self, config: &WalletConfig) -> Result<(), StoreError> {
        if !self.is_connected() {
            return Err(StoreError::Disconnected);
        }
        let raw =
            serde_json::to_string(config).map_err(|err| StoreError::Write(err.to_string()))?;
        *self.record.borrow_mut() = Some(raw);
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aw_types::CapabilityId;

    #[test]
    fn local_roundtrip_is_field_for_field() {
        let store = MemoryLocalStore::new();

        let mut config = WalletConfig::default();
        config.endpoint = "https://x".to_owned();
        config.api_key = "k".to_owned();
        config.llm = Some("m1".to_owned());
        config.enabled_capabilities = vec![CapabilityId::Llm, CapabilityId::Tts];
        store.save(&config);

        let patch = store.load().expect("record should be present");
        let mut reloaded = WalletConfig::default();
        reloaded.merge(&patch);

        assert_eq!(reloaded, config);
    }

    #[test]
    fn malformed_local_record_loads_as_absent() {
        let store = MemoryLocalStore::seeded("{not json");
        assert!(store.load().is_none());
    }

    #[test]
    fn local_load_on_empty_store_is_absent() {
        let store = MemoryLocalStore::new();
        assert!(store.load().is_none());
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn remote_requires_connection() -> anyhow::Result<()> {
        let store = MemoryRemoteStore::disconnected();
        assert!(matches!(store.load().await, Err(StoreError::Disconnected)));
        assert!(matches!(
            store.save(&WalletConfig::default()).await,
            Err(StoreError::Disconnected)
        ));

        store.set_connected(true);
        assert_eq!(store.load().await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn remote_roundtrip_counts_saves() -> anyhow::Result<()> {
        let store = MemoryRemoteStore::connected();

        let mut config = WalletConfig::default();
        config.api_key = "k".to_owned();
        store.save(&config).await?;
        assert_eq!(store.save_count(), 1);

        let patch = store.load().await?.expect("record should be present");
        assert_eq!(patch.api_key.as_deref(), Some("k"));
        Ok(())
    }

    #[tokio::test]
    async fn remote_malformed_record_is_a_read_error() -> anyhow::Result<()> {
        let store = MemoryRemoteStore::seeded("[1,2,3]");
        assert!(matches!(store.load().await, Err(StoreError::Read(_))));
        Ok(())
    }
}
