//! Framework bindings.
//!
//! A [`WalletProvider`] owns one element and lets any number of JS consumers
//! observe the same configuration. Hosts either take the element node and
//! place it themselves or ask for the floating bottom-right placement.

use aw_wallet_core::WalletEvent;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::HtmlElement;

use crate::dom;
use crate::element::AiWallet;

#[wasm_bindgen]
pub struct WalletProvider {
    wallet: AiWallet,
}

#[wasm_bindgen]
impl WalletProvider {
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<WalletProvider, JsValue> {
        Ok(WalletProvider {
            wallet: AiWallet::new(options)?,
        })
    }

    /// The widget's root node, for hosts that place it themselves.
    pub fn element(&self) -> HtmlElement {
        self.wallet.root()
    }

    pub fn config(&self) -> JsValue {
        self.wallet.get_configuration()
    }

    /// Invoke `callback` with a fresh configuration snapshot on every change.
    pub fn subscribe(&self, callback: js_sys::Function) -> u32 {
        self.wallet.controller().subscribe(move |event| {
            if let WalletEvent::ConfigChanged(config) = event {
                if let Ok(snapshot) = serde_wasm_bindgen::to_value(config) {
                    let _ = callback.call1(&JsValue::NULL, &snapshot);
                }
            }
        })
    }

    pub fn unsubscribe(&self, subscription: u32) {
        self.wallet.controller().unsubscribe(subscription);
    }

    /// Mount into a host-chosen container.
    pub fn mount(&self, parent: &HtmlElement) -> Result<(), JsValue> {
        self.wallet.mount(parent)
    }

    /// Mount into a fixed bottom-right container appended to `<body>`.
    #[wasm_bindgen(js_name = mountFloating)]
    pub fn mount_floating(&self) -> Result<(), JsValue> {
        let holder: HtmlElement = dom::create_element("div").dyn_into().unwrap();
        holder.set_class_name("ai-wallet-floating");
        let style = holder.style();
        let _ = style.set_property("position", "fixed");
        let _ = style.set_property("bottom", "16px");
        let _ = style.set_property("right", "16px");
        let _ = style.set_property("z-index", "2147483000");
        let Some(body) = dom::document().body() else {
            return Err(JsValue::from_str("document has no body"));
        };
        body.append_child(&holder)?;
        self.wallet.mount(&holder)
    }

    #[wasm_bindgen(js_name = setRemoteStorage)]
    pub fn set_remote_storage(&self, handle: JsValue) {
        self.wallet.set_remote_storage(handle);
    }
}
