//! The embeddable wallet element.
//!
//! [`AiWallet`] is the object the host page talks to. It owns the widget's
//! root `<div>`, the controller and the render loop, and re-emits every
//! configuration change as a bubbling `configChanged` CustomEvent so frameworks
//! can listen without touching the Rust API.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use aw_catalog::ModelCatalogClient;
use aw_types::{CapabilityId, WalletConfig};
use aw_wallet_core::{WalletController, WalletEvent};
use gloo_timers::callback::Timeout;
use serde::Deserialize;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlElement;

use crate::dom;
use crate::net::FetchTransport;
use crate::remote::{self, RemoteHandle, SyncBackendStore};
use crate::storage::BrowserLocalStore;
use crate::view;

/// Host-supplied construction options, passed as a plain JS object.
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct WalletOptions {
    /// Capability names to show. Unknown names are ignored; an empty or
    /// missing list exposes everything.
    pub(crate) capabilities: Option<Vec<String>>,
    pub(crate) variant: Variant,
}

#[derive(Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Variant {
    #[default]
    Shadow,
    Border,
}

impl Variant {
    fn css_class(self) -> &'static str {
        match self {
            Variant::Shadow => "ai-wallet--shadow",
            Variant::Border => "ai-wallet--border",
        }
    }
}

impl WalletOptions {
    pub(crate) fn exposed_capabilities(&self) -> Vec<CapabilityId> {
        let Some(names) = &self.capabilities else {
            return CapabilityId::ALL.to_vec();
        };
        let mut out = Vec::new();
        for name in names {
            if let Some(cap) = CapabilityId::parse(name) {
                if !out.contains(&cap) {
                    out.push(cap);
                }
            }
        }
        if out.is_empty() { CapabilityId::ALL.to_vec() } else { out }
    }
}

/// Everything the render and wiring code needs, shared behind one `Rc`.
pub(crate) struct WalletCtx {
    pub(crate) ctrl: Rc<WalletController>,
    pub(crate) root: HtmlElement,
    pub(crate) options: WalletOptions,
    /// Pending debounce timers for the advanced inputs. Replacing a timer
    /// drops the old one, which cancels it.
    pub(crate) endpoint_timer: RefCell<Option<Timeout>>,
    pub(crate) api_key_timer: RefCell<Option<Timeout>>,
    pub(crate) advanced_open: Cell<bool>,
    /// Set when the user steps back from the endpoint screen to the key
    /// screen, so the wizard does not immediately bounce forward again.
    pub(crate) wizard_back: Cell<bool>,
    remote_handle: RefCell<Option<RemoteHandle>>,
    initialized: Cell<bool>,
}

#[wasm_bindgen]
pub struct AiWallet {
    inner: Rc<WalletCtx>,
}

#[wasm_bindgen]
impl AiWallet {
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<AiWallet, JsValue> {
        let options: WalletOptions = if options.is_undefined() || options.is_null() {
            WalletOptions::default()
        } else {
            serde_wasm_bindgen::from_value(options)
                .map_err(|err| JsValue::from_str(&format!("invalid options: {err}")))?
        };

        let root: HtmlElement = dom::create_element("div").dyn_into().unwrap();
        root.set_class_name("ai-wallet");
        dom::add_class(&root, options.variant.css_class());

        let ctrl = Rc::new(WalletController::new(
            Rc::new(BrowserLocalStore),
            Rc::new(ModelCatalogClient::new(FetchTransport)),
        ));

        let inner = Rc::new(WalletCtx {
            ctrl,
            root,
            options,
            endpoint_timer: RefCell::new(None),
            api_key_timer: RefCell::new(None),
            advanced_open: Cell::new(false),
            wizard_back: Cell::new(false),
            remote_handle: RefCell::new(None),
            initialized: Cell::new(false),
        });

        // Weak so the controller's subscriber list does not keep the context
        // (and through it the controller itself) alive forever.
        let weak = Rc::downgrade(&inner);
        inner.ctrl.subscribe(move |event| {
            let Some(ctx) = weak.upgrade() else {
                return;
            };
            match event {
                WalletEvent::ConfigChanged(config) => {
                    dispatch_config_changed(&ctx, config);
                    if !view::focus_locked(&ctx) {
                        view::render(&ctx);
                    }
                }
                WalletEvent::ModelsChanged => {
                    if view::focus_locked(&ctx) {
                        view::render_models_note(&ctx);
                    } else {
                        view::render(&ctx);
                    }
                }
                WalletEvent::PhaseChanged => view::render(&ctx),
            }
        });

        Ok(AiWallet { inner })
    }

    /// Attach the widget to `parent` and start loading configuration. The
    /// first call kicks off initialization; later calls only re-append the
    /// root element.
    pub fn mount(&self, parent: &HtmlElement) -> Result<(), JsValue> {
        parent.append_child(&self.inner.root)?;
        if self.inner.initialized.get() {
            return Ok(());
        }
        self.inner.initialized.set(true);
        view::render(&self.inner);
        let inner = Rc::clone(&self.inner);
        spawn_local(async move {
            inner.ctrl.initialize().await;
            let pending = inner.remote_handle.borrow().clone();
            if let Some(handle) = pending {
                remote::wire_connect(&inner.ctrl, &handle);
            }
        });
        Ok(())
    }

    #[wasm_bindgen(js_name = getConfiguration)]
    pub fn get_configuration(&self) -> JsValue {
        serde_wasm_bindgen::to_value(&self.inner.ctrl.configuration()).unwrap_or(JsValue::NULL)
    }

    /// Persist the current configuration to every reachable backend.
    /// Resolves to `false` when a connected sync backend rejected the write.
    #[wasm_bindgen(js_name = saveConfiguration)]
    pub fn save_configuration(&self) -> js_sys::Promise {
        let ctrl = Rc::clone(&self.inner.ctrl);
        wasm_bindgen_futures::future_to_promise(async move {
            let ok = ctrl.save_configuration().await;
            Ok(JsValue::from_bool(ok))
        })
    }

    #[wasm_bindgen(js_name = setRemoteStorage)]
    pub fn set_remote_storage(&self, handle: JsValue) {
        if handle.is_null() || handle.is_undefined() {
            self.inner.ctrl.set_remote(None);
            *self.inner.remote_handle.borrow_mut() = None;
            return;
        }
        let handle: RemoteHandle = handle.unchecked_into();
        self.inner
            .ctrl
            .set_remote(Some(Rc::new(SyncBackendStore::new(handle.clone()))));
        if self.inner.initialized.get() {
            remote::wire_connect(&self.inner.ctrl, &handle);
        }
        *self.inner.remote_handle.borrow_mut() = Some(handle);
    }

    #[wasm_bindgen(js_name = getRemoteStorage)]
    pub fn get_remote_storage(&self) -> JsValue {
        self.inner
            .remote_handle
            .borrow()
            .as_ref()
            .map(|h| JsValue::from(h.clone()))
            .unwrap_or(JsValue::NULL)
    }

    #[wasm_bindgen(getter)]
    pub fn root(&self) -> HtmlElement {
        self.inner.root.clone()
    }
}

impl AiWallet {
    pub(crate) fn controller(&self) -> Rc<WalletController> {
        Rc::clone(&self.inner.ctrl)
    }
}

fn dispatch_config_changed(ctx: &WalletCtx, config: &WalletConfig) {
    let Ok(detail) = serde_wasm_bindgen::to_value(config) else {
        return;
    };
    let init = web_sys::CustomEventInit::new();
    init.set_detail(&detail);
    init.set_bubbles(true);
    if let Ok(event) = web_sys::CustomEvent::new_with_event_init_dict("configChanged", &init) {
        let _ = ctx.root.dispatch_event(&event);
    }
}
