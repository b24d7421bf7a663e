//! AI Wallet WASM widget.
//!
//! Pure Rust + WASM implementation of the embeddable AI provider wallet.
//! Modularised for extensibility: each concern lives in its own module.
//! The host page talks to [`element::AiWallet`], [`provider::WalletProvider`]
//! or the page-level [`bootstrap`] entry points; everything else is plumbing
//! around `aw-wallet-core`.

pub mod bootstrap;
pub mod dom;
pub mod element;
pub mod net;
pub mod provider;
pub mod remote;
pub mod storage;
pub mod view;

use wasm_bindgen::prelude::*;

/// WASM entry point – called automatically when the module is instantiated.
/// Nothing mounts here; the host constructs a widget when it wants one.
#[wasm_bindgen(start)]
pub fn start() {
    // Improve panic messages in the browser console
    console_error_panic_hook::set_once();
}
