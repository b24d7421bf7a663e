//! Widget rendering.
//!
//! Each render rebuilds the root element's markup from controller state and
//! wires handlers onto the fresh nodes. Inputs that feed the controller on
//! every keystroke carry a `data-live` attribute; while one of them holds
//! focus, full re-renders are skipped so typing is never interrupted.

use std::rc::Rc;

use aw_types::{CapabilityId, DEFAULT_ENDPOINT, Model, SetupState, WalletConfig};
use aw_wallet_core::{EDIT_DEBOUNCE_MS, LoadPhase};
use gloo_timers::callback::Timeout;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlInputElement, HtmlSelectElement};

use crate::dom;
use crate::element::WalletCtx;

const STYLE: &str = r#"<style>
.ai-wallet{font:14px/1.5 system-ui,-apple-system,sans-serif;color:#0f172a}
.ai-wallet .aw-card{background:#fff;border-radius:12px;padding:16px;min-width:300px;max-width:380px}
.ai-wallet--shadow .aw-card{box-shadow:0 6px 24px rgba(15,23,42,.14)}
.ai-wallet--border .aw-card{border:1px solid #cbd5e1}
.ai-wallet .aw-header{display:flex;align-items:center;justify-content:space-between;margin-bottom:10px}
.ai-wallet .aw-title{font-weight:600}
.ai-wallet .aw-hint{margin:0 0 10px;color:#475569}
.ai-wallet .aw-loading{color:#475569;padding:8px 0}
.ai-wallet .aw-caps{display:flex;flex-wrap:wrap;gap:6px;margin-bottom:10px}
.ai-wallet .aw-chip{border:1px solid #cbd5e1;border-radius:999px;background:#fff;padding:3px 10px;cursor:pointer}
.ai-wallet .aw-chip--active{background:#0f172a;border-color:#0f172a;color:#fff}
.ai-wallet .aw-model-row{display:flex;align-items:center;gap:8px;margin-bottom:6px}
.ai-wallet .aw-model-cap{flex:0 0 72px;color:#475569}
.ai-wallet .aw-model-select{flex:1;padding:4px 6px;border:1px solid #cbd5e1;border-radius:6px;background:#fff}
.ai-wallet .aw-models-note{margin-top:8px}
.ai-wallet .aw-note{color:#475569;font-size:13px}
.ai-wallet .aw-note--error{color:#b91c1c}
.ai-wallet .aw-note--warn{color:#b45309}
.ai-wallet .aw-field{display:block;margin-bottom:8px}
.ai-wallet .aw-field span{display:block;color:#475569;font-size:12px;margin-bottom:2px}
.ai-wallet .aw-field-row{display:flex;gap:8px}
.ai-wallet .aw-input{width:100%;box-sizing:border-box;padding:6px 8px;border:1px solid #cbd5e1;border-radius:6px}
.ai-wallet .aw-btn{border:1px solid #cbd5e1;border-radius:6px;background:#f8fafc;padding:6px 12px;cursor:pointer}
.ai-wallet .aw-btn--primary{background:#0f172a;border-color:#0f172a;color:#fff}
.ai-wallet .aw-btn--ghost{background:transparent}
.ai-wallet .aw-link{border:none;background:none;color:#2563eb;cursor:pointer;padding:0}
.ai-wallet .aw-advanced{border-top:1px solid #e2e8f0;margin-top:12px;padding-top:12px}
.ai-wallet .aw-option--stale{color:#b45309}
</style>"#;

/// True while a `data-live` input inside the widget owns focus. Re-rendering
/// would steal the caret, so callers hold off until focus moves on.
pub(crate) fn focus_locked(ctx: &WalletCtx) -> bool {
    let Some(active) = dom::document().active_element() else {
        return false;
    };
    if !ctx.root.contains(Some(active.as_ref())) {
        return false;
    }
    active.has_attribute("data-live")
}

/// Re-render the whole widget from controller state.
pub(crate) fn render(ctx: &Rc<WalletCtx>) {
    if ctx.ctrl.load_phase() != LoadPhase::Loaded {
        render_loading(ctx);
        return;
    }
    match ctx.ctrl.setup_state() {
        SetupState::Ready => {
            ctx.wizard_back.set(false);
            render_main(ctx);
        }
        SetupState::NeedsApiKey => render_key_step(ctx),
        SetupState::NeedsEndpoint => {
            if ctx.wizard_back.get() {
                render_key_step(ctx)
            } else {
                render_endpoint_step(ctx)
            }
        }
    }
}

/// Refresh only the models note area. Used while focus is locked so the
/// loading/error text still updates under the user's caret.
pub(crate) fn render_models_note(ctx: &Rc<WalletCtx>) {
    let Some(note) = dom::query_within(&ctx.root, ".aw-models-note") else {
        return;
    };
    dom::set_inner_html(&note, &models_note_html(ctx));
    wire_retry(ctx);
}

fn render_loading(ctx: &Rc<WalletCtx>) {
    let mut html = String::from(STYLE);
    html.push_str(r#"<div class="aw-card"><div class="aw-loading">Loading wallet…</div></div>"#);
    dom::set_inner_html(&ctx.root, &html);
}

// ── Setup wizard ──

fn render_key_step(ctx: &Rc<WalletCtx>) {
    let config = ctx.ctrl.configuration();
    let mut html = String::from(STYLE);
    html.push_str(&format!(
        r#"<div class="aw-card">
  <div class="aw-header"><span class="aw-title">AI Wallet</span></div>
  <p class="aw-hint">Paste an API key to get started. Known providers are detected automatically.</p>
  <div class="aw-field-row">
    <input class="aw-input" type="password" data-role="wizard-key" placeholder="sk-..." value="{}">
    <button class="aw-btn aw-btn--primary" data-role="wizard-continue">Continue</button>
  </div>
</div>"#,
        dom::escape_html(&config.api_key),
    ));
    dom::set_inner_html(&ctx.root, &html);
    wire_key_step(ctx);
}

fn wire_key_step(ctx: &Rc<WalletCtx>) {
    let Some(input) = dom::query_typed::<HtmlInputElement>(&ctx.root, "[data-role='wizard-key']")
    else {
        return;
    };
    if let Some(btn) = dom::query_within(&ctx.root, "[data-role='wizard-continue']") {
        let ctx2 = Rc::clone(ctx);
        let field = input.clone();
        dom::on_click(&btn, move |_| submit_wizard_key(&ctx2, &field));
    }
    let ctx2 = Rc::clone(ctx);
    let field = input.clone();
    dom::on_keydown(&input, move |e| {
        if e.key() == "Enter" {
            submit_wizard_key(&ctx2, &field);
        }
    });
}

fn submit_wizard_key(ctx: &Rc<WalletCtx>, input: &HtmlInputElement) {
    let value = input.value();
    let key = value.trim().to_string();
    if key.is_empty() {
        return;
    }
    ctx.wizard_back.set(false);
    let ctrl = Rc::clone(&ctx.ctrl);
    spawn_local(async move {
        ctrl.submit_api_key(&key).await;
    });
}

fn render_endpoint_step(ctx: &Rc<WalletCtx>) {
    let config = ctx.ctrl.configuration();
    let mut html = String::from(STYLE);
    html.push_str(&format!(
        r#"<div class="aw-card">
  <div class="aw-header"><span class="aw-title">AI Wallet</span></div>
  <p class="aw-hint">No known provider for this key. Enter the API endpoint to use.</p>
  <div class="aw-field-row">
    <input class="aw-input" data-role="wizard-endpoint" placeholder="{}" value="{}">
    <button class="aw-btn aw-btn--primary" data-role="wizard-save">Save</button>
  </div>
  <button class="aw-link" data-role="wizard-back">Back</button>
</div>"#,
        DEFAULT_ENDPOINT,
        dom::escape_html(&config.endpoint),
    ));
    dom::set_inner_html(&ctx.root, &html);
    wire_endpoint_step(ctx);
}

fn wire_endpoint_step(ctx: &Rc<WalletCtx>) {
    let Some(input) =
        dom::query_typed::<HtmlInputElement>(&ctx.root, "[data-role='wizard-endpoint']")
    else {
        return;
    };
    if let Some(btn) = dom::query_within(&ctx.root, "[data-role='wizard-save']") {
        let ctx2 = Rc::clone(ctx);
        let field = input.clone();
        dom::on_click(&btn, move |_| submit_wizard_endpoint(&ctx2, &field));
    }
    if let Some(btn) = dom::query_within(&ctx.root, "[data-role='wizard-back']") {
        let ctx2 = Rc::clone(ctx);
        dom::on_click(&btn, move |_| {
            ctx2.wizard_back.set(true);
            render(&ctx2);
        });
    }
    let ctx2 = Rc::clone(ctx);
    let field = input.clone();
    dom::on_keydown(&input, move |e| {
        if e.key() == "Enter" {
            submit_wizard_endpoint(&ctx2, &field);
        }
    });
}

fn submit_wizard_endpoint(ctx: &Rc<WalletCtx>, input: &HtmlInputElement) {
    let value = input.value();
    let endpoint = value.trim().to_string();
    if endpoint.is_empty() {
        return;
    }
    let ctrl = Rc::clone(&ctx.ctrl);
    spawn_local(async move {
        ctrl.submit_endpoint(&endpoint).await;
    });
}

// ── Main view ──

fn render_main(ctx: &Rc<WalletCtx>) {
    let config = ctx.ctrl.configuration();
    let models = ctx.ctrl.models();
    let exposed = ctx.options.exposed_capabilities();

    let mut chips = String::new();
    for cap in &exposed {
        let active = if config.is_enabled(*cap) { " aw-chip--active" } else { "" };
        chips.push_str(&format!(
            r#"<button class="aw-chip{}" data-cap="{}">{}</button>"#,
            active,
            cap.as_str(),
            cap.label(),
        ));
    }

    let mut selects = String::new();
    for cap in exposed.iter().filter(|c| config.is_enabled(**c)) {
        selects.push_str(&model_select_html(&config, &models, *cap));
    }

    let advanced = if ctx.advanced_open.get() {
        format!(
            r#"<div class="aw-advanced">
  <label class="aw-field"><span>Endpoint</span><input class="aw-input" data-role="endpoint" data-live value="{}"></label>
  <label class="aw-field"><span>API key</span><input class="aw-input" type="password" data-role="api-key" data-live value="{}"></label>
  <button class="aw-btn aw-btn--ghost" data-role="reset-endpoint">Reset endpoint</button>
</div>"#,
            dom::escape_html(&config.endpoint),
            dom::escape_html(&config.api_key),
        )
    } else {
        String::new()
    };

    let toggle_label = if ctx.advanced_open.get() { "Hide advanced" } else { "Advanced" };
    let mut html = String::from(STYLE);
    html.push_str(&format!(
        r#"<div class="aw-card">
  <div class="aw-header"><span class="aw-title">AI Wallet</span><button class="aw-link" data-role="advanced-toggle">{}</button></div>
  <div class="aw-caps">{}</div>
  <div class="aw-models">{}</div>
  <div class="aw-models-note">{}</div>
  {}
</div>"#,
        toggle_label,
        chips,
        selects,
        models_note_html(ctx),
        advanced,
    ));
    dom::set_inner_html(&ctx.root, &html);
    wire_main(ctx);
}

fn model_select_html(config: &WalletConfig, models: &[Model], cap: CapabilityId) -> String {
    let selected = config.selected_model(cap);
    let mut opts = String::new();
    opts.push_str(&format!(
        r#"<option value=""{}>&mdash; none &mdash;</option>"#,
        if selected.is_none() { " selected" } else { "" },
    ));
    let mut listed = false;
    for m in models.iter().filter(|m| m.supports(cap)) {
        let is_selected = selected == Some(m.id.as_str());
        listed |= is_selected;
        opts.push_str(&format!(
            r#"<option value="{}"{}>{}</option>"#,
            dom::escape_html(&m.id),
            if is_selected { " selected" } else { "" },
            dom::escape_html(&m.display_name),
        ));
    }
    // A remembered choice the endpoint no longer offers stays selectable
    // instead of being silently dropped.
    if let Some(stale) = selected.filter(|_| !listed) {
        opts.push_str(&format!(
            r#"<option value="{}" class="aw-option--stale" selected>{} (unavailable)</option>"#,
            dom::escape_html(stale),
            dom::escape_html(stale),
        ));
    }
    format!(
        r#"<label class="aw-model-row"><span class="aw-model-cap">{}</span><select class="aw-model-select" data-cap="{}">{}</select></label>"#,
        cap.label(),
        cap.as_str(),
        opts,
    )
}

fn models_note_html(ctx: &WalletCtx) -> String {
    if let Some(err) = ctx.ctrl.models_error() {
        return format!(
            r#"<div class="aw-note aw-note--error">Couldn't load models: {}</div><button class="aw-btn aw-btn--ghost" data-role="retry">Retry</button>"#,
            dom::escape_html(&err),
        );
    }
    if ctx.ctrl.models_loading() {
        return r#"<div class="aw-note">Loading models…</div>"#.to_string();
    }
    if !ctx.ctrl.models_loaded_once() {
        return String::new();
    }
    let count = ctx.ctrl.models().len();
    let noun = if count == 1 { "model" } else { "models" };
    let mut html = format!(r#"<div class="aw-note">{count} {noun} available</div>"#);
    let unresolved = ctx.ctrl.unresolved_selections();
    if !unresolved.is_empty() {
        let labels: Vec<&str> = unresolved.iter().map(|c| c.label()).collect();
        html.push_str(&format!(
            r#"<div class="aw-note aw-note--warn">Unavailable selection for: {}</div>"#,
            labels.join(", "),
        ));
    }
    html
}

fn wire_main(ctx: &Rc<WalletCtx>) {
    wire_chips(ctx);
    wire_model_selects(ctx);
    wire_retry(ctx);
    wire_advanced(ctx);
}

fn wire_chips(ctx: &Rc<WalletCtx>) {
    for chip in dom::query_all_within(&ctx.root, ".aw-chip") {
        let Some(cap) = chip
            .get_attribute("data-cap")
            .and_then(|v| CapabilityId::parse(&v))
        else {
            continue;
        };
        let ctx2 = Rc::clone(ctx);
        dom::on_click(&chip, move |_| {
            let ctrl = Rc::clone(&ctx2.ctrl);
            spawn_local(async move {
                ctrl.toggle_capability(cap).await;
            });
        });
    }
}

fn wire_model_selects(ctx: &Rc<WalletCtx>) {
    for el in dom::query_all_within(&ctx.root, ".aw-model-select") {
        let Some(cap) = el
            .get_attribute("data-cap")
            .and_then(|v| CapabilityId::parse(&v))
        else {
            continue;
        };
        let Ok(select) = el.dyn_into::<HtmlSelectElement>() else {
            continue;
        };
        let ctx2 = Rc::clone(ctx);
        let field = select.clone();
        dom::on_change(&select, move |_| {
            let value = field.value();
            let choice = if value.is_empty() { None } else { Some(value) };
            let ctrl = Rc::clone(&ctx2.ctrl);
            spawn_local(async move {
                ctrl.select_model(cap, choice).await;
            });
        });
    }
}

fn wire_retry(ctx: &Rc<WalletCtx>) {
    if let Some(btn) = dom::query_within(&ctx.root, "[data-role='retry']") {
        let ctx2 = Rc::clone(ctx);
        dom::on_click(&btn, move |_| {
            let ctrl = Rc::clone(&ctx2.ctrl);
            spawn_local(async move {
                ctrl.refresh_models().await;
            });
        });
    }
}

fn wire_advanced(ctx: &Rc<WalletCtx>) {
    if let Some(btn) = dom::query_within(&ctx.root, "[data-role='advanced-toggle']") {
        let ctx2 = Rc::clone(ctx);
        dom::on_click(&btn, move |_| {
            ctx2.advanced_open.set(!ctx2.advanced_open.get());
            render(&ctx2);
        });
    }

    // Live inputs: every keystroke updates the draft config right away and
    // re-arms the debounce timer. Only the last ticket in a burst commits.
    if let Some(input) = dom::query_typed::<HtmlInputElement>(&ctx.root, "[data-role='endpoint']") {
        let ctx2 = Rc::clone(ctx);
        let field = input.clone();
        dom::on_input(&input, move |_| {
            let ticket = ctx2.ctrl.note_endpoint_input(&field.value());
            let ctrl = Rc::clone(&ctx2.ctrl);
            *ctx2.endpoint_timer.borrow_mut() = Some(Timeout::new(EDIT_DEBOUNCE_MS, move || {
                spawn_local(async move {
                    ctrl.commit_debounced(ticket).await;
                });
            }));
        });
    }
    if let Some(input) = dom::query_typed::<HtmlInputElement>(&ctx.root, "[data-role='api-key']") {
        let ctx2 = Rc::clone(ctx);
        let field = input.clone();
        dom::on_input(&input, move |_| {
            let ticket = ctx2.ctrl.note_api_key_input(&field.value());
            let ctrl = Rc::clone(&ctx2.ctrl);
            *ctx2.api_key_timer.borrow_mut() = Some(Timeout::new(EDIT_DEBOUNCE_MS, move || {
                spawn_local(async move {
                    ctrl.commit_debounced(ticket).await;
                });
            }));
        });
    }

    if let Some(btn) = dom::query_within(&ctx.root, "[data-role='reset-endpoint']") {
        let ctx2 = Rc::clone(ctx);
        dom::on_click(&btn, move |_| {
            *ctx2.endpoint_timer.borrow_mut() = None;
            let ctrl = Rc::clone(&ctx2.ctrl);
            spawn_local(async move {
                ctrl.reset_endpoint().await;
            });
        });
    }
}
