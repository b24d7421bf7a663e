//! Process-wide bootstrap.
//!
//! Hosts that just want the floating widget call `initialize` once; repeat
//! calls are no-ops. The active provider sits in `RefCell`-wrapped
//! `thread_local!` storage (WASM is single-threaded).

use std::cell::RefCell;

use wasm_bindgen::prelude::*;

use crate::provider::WalletProvider;

thread_local! {
    static ACTIVE: RefCell<Option<WalletProvider>> = RefCell::new(None);
}

/// Create the shared wallet and mount it floating. Does nothing when one is
/// already up.
#[wasm_bindgen]
pub fn initialize(options: JsValue) -> Result<(), JsValue> {
    if is_initialized() {
        return Ok(());
    }
    let provider = WalletProvider::new(options)?;
    provider.mount_floating()?;
    ACTIVE.with(|slot| {
        *slot.borrow_mut() = Some(provider);
    });
    Ok(())
}

#[wasm_bindgen(js_name = isInitialized)]
pub fn is_initialized() -> bool {
    ACTIVE.with(|slot| slot.borrow().is_some())
}

/// Snapshot of the shared wallet's configuration, `null` before initialize.
#[wasm_bindgen(js_name = currentConfiguration)]
pub fn current_configuration() -> JsValue {
    ACTIVE.with(|slot| {
        slot.borrow()
            .as_ref()
            .map(|p| p.config())
            .unwrap_or(JsValue::NULL)
    })
}
