//! Bridge to a host-provided sync backend.
//!
//! The embedding page may hand the widget an object that mirrors the
//! configuration to an account. The object exposes a `connected` flag, an
//! `on("connected", cb)` hook and an `aiWallet` module with promise-based
//! `getConfig`/`setConfig`. Everything here adapts that shape to
//! [`RemoteConfigStore`].

use std::rc::Rc;

use async_trait::async_trait;
use aw_store::{RemoteConfigStore, StoreError};
use aw_types::{ConfigPatch, WalletConfig};
use aw_wallet_core::{REMOTE_CONNECT_TIMEOUT_MS, WalletController};
use gloo_timers::future::TimeoutFuture;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};

#[wasm_bindgen]
extern "C" {
    #[derive(Clone)]
    pub type RemoteHandle;

    #[wasm_bindgen(method)]
    pub fn on(this: &RemoteHandle, event: &str, callback: &js_sys::Function);

    #[wasm_bindgen(method, getter)]
    pub fn connected(this: &RemoteHandle) -> bool;

    #[wasm_bindgen(method, getter, js_name = aiWallet)]
    pub fn ai_wallet(this: &RemoteHandle) -> AiWalletModule;

    pub type AiWalletModule;

    #[wasm_bindgen(method, js_name = getConfig)]
    pub fn get_config(this: &AiWalletModule) -> js_sys::Promise;

    #[wasm_bindgen(method, js_name = setConfig)]
    pub fn set_config(this: &AiWalletModule, config: JsValue) -> js_sys::Promise;
}

pub struct SyncBackendStore {
    handle: RemoteHandle,
}

impl SyncBackendStore {
    pub fn new(handle: RemoteHandle) -> Self {
        Self { handle }
    }
}

#[async_trait(?Send)]
impl RemoteConfigStore for SyncBackendStore {
    fn is_connected(&self) -> bool {
        self.handle.connected()
    }

    async fn load(&self) -> Result<Option<ConfigPatch>, StoreError> {
        if !self.is_connected() {
            return Err(StoreError::Disconnected);
        }
        let value = JsFuture::from(self.handle.ai_wallet().get_config())
            .await
            .map_err(|err| StoreError::Read(format!("{err:?}")))?;
        if value.is_null() || value.is_undefined() {
            return Ok(None);
        }
        let patch: ConfigPatch = serde_wasm_bindgen::from_value(value)
            .map_err(|err| StoreError::Read(err.to_string()))?;
        Ok(Some(patch))
    }

    async fn save(&self, config: &WalletConfig) -> Result<(), StoreError> {
        if !self.is_connected() {
            return Err(StoreError::Disconnected);
        }
        let value = serde_wasm_bindgen::to_value(config)
            .map_err(|err| StoreError::Write(err.to_string()))?;
        JsFuture::from(self.handle.ai_wallet().set_config(value))
            .await
            .map_err(|err| StoreError::Write(format!("{err:?}")))?;
        Ok(())
    }
}

/// Hooks the controller up to the handle's connection lifecycle.
///
/// Runs the connected handler right away when the backend is already up,
/// otherwise waits for its `connected` event. A timeout always starts so the
/// widget falls back to local data if the backend never comes up; the
/// controller ignores the timeout once loading has finished.
pub fn wire_connect(ctrl: &Rc<WalletController>, handle: &RemoteHandle) {
    if handle.connected() {
        let ctrl = Rc::clone(ctrl);
        spawn_local(async move {
            ctrl.handle_remote_connected().await;
        });
    } else {
        let on_connected = Rc::clone(ctrl);
        let cb = Closure::wrap(Box::new(move || {
            let ctrl = Rc::clone(&on_connected);
            spawn_local(async move {
                ctrl.handle_remote_connected().await;
            });
        }) as Box<dyn FnMut()>);
        handle.on("connected", cb.as_ref().unchecked_ref());
        cb.forget();
    }

    let ctrl = Rc::clone(ctrl);
    spawn_local(async move {
        TimeoutFuture::new(REMOTE_CONNECT_TIMEOUT_MS).await;
        ctrl.remote_wait_elapsed().await;
    });
}
