//! The configuration controller behind the wallet widget.
//!
//! Owns the in-memory [`WalletConfig`], drives loading from the local and
//! remote stores, debounces free-text edits, and keeps the discovered
//! model list in step with the credentials. Everything here is
//! single-threaded by design (the widget lives on the browser main
//! thread), so shared state is `Rc`/`RefCell` and async traits are
//! `?Send`.
//!
//! Store and catalog failures never escape this crate. They are logged,
//! folded into view state (`models_error`, fallback config) and the
//! controller keeps going.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use aw_catalog::ModelCatalog;
use aw_store::{LocalConfigStore, RemoteConfigStore};
use aw_types::{CapabilityId, Model, SetupState, WalletConfig, DEFAULT_ENDPOINT};
use tracing::{debug, warn};

mod detect;

pub use detect::detect_endpoint;

/// Quiet period after the last keystroke before a free-text edit commits.
pub const EDIT_DEBOUNCE_MS: u32 = 800;

/// How long to wait for a configured remote store to report `connected`
/// before falling back to the local copy.
pub const REMOTE_CONNECT_TIMEOUT_MS: u32 = 10_000;

// ── Events ──

/// Pushed to subscribers after every observable change. `ConfigChanged`
/// carries a snapshot so listeners never read half-updated state; the
/// other variants are markers and listeners pull what they need through
/// the controller's getters.
#[derive(Debug, Clone)]
pub enum WalletEvent {
    ConfigChanged(WalletConfig),
    ModelsChanged,
    PhaseChanged,
}

/// Where the controller is in its load lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// `initialize` has not run yet.
    Idle,
    /// Waiting for the remote store to connect.
    Loading,
    /// Config is loaded (from remote, local or defaults) and edits stick.
    Loaded,
}

/// Which free-text field a debounce ticket belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditField {
    Endpoint,
    ApiKey,
}

/// Handed out by `note_*_input` and redeemed by [`WalletController::commit_debounced`].
/// Each keystroke invalidates the tickets before it, so only the timer
/// for the last edit actually commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditTicket {
    field: EditField,
    epoch: u64,
}

pub type Subscription = u32;

type Listener = Rc<dyn Fn(&WalletEvent)>;

// ── Controller ──

struct ControllerState {
    config: WalletConfig,
    phase: LoadPhase,
    /// Guards persistence until the stored config has been read, so an
    /// early edit cannot clobber the record with near-defaults.
    config_loaded: bool,
    remote_seeded: bool,
    models: Vec<Model>,
    models_loading: bool,
    models_error: Option<String>,
    models_loaded_once: bool,
    fetch_generation: u64,
    endpoint_epoch: u64,
    api_key_epoch: u64,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self {
            config: WalletConfig::default(),
            phase: LoadPhase::Idle,
            config_loaded: false,
            remote_seeded: false,
            models: Vec::new(),
            models_loading: false,
            models_error: None,
            models_loaded_once: false,
            fetch_generation: 0,
            endpoint_epoch: 0,
            api_key_epoch: 0,
        }
    }
}

pub struct WalletController {
    state: RefCell<ControllerState>,
    local: Rc<dyn LocalConfigStore>,
    remote: RefCell<Option<Rc<dyn RemoteConfigStore>>>,
    catalog: Rc<dyn ModelCatalog>,
    subscribers: RefCell<Vec<(Subscription, Listener)>>,
    next_subscription: Cell<Subscription>,
}

impl WalletController {
    pub fn new(local: Rc<dyn LocalConfigStore>, catalog: Rc<dyn ModelCatalog>) -> Self {
        Self {
            state: RefCell::new(ControllerState::default()),
            local,
            remote: RefCell::new(None),
            catalog,
            subscribers: RefCell::new(Vec::new()),
            next_subscription: Cell::new(0),
        }
    }

    /// Swap the remote store in or out. The shell is responsible for
    /// wiring the new store's `connected` signal to
    /// [`handle_remote_connected`](Self::handle_remote_connected).
    pub fn set_remote(&self, remote: Option<Rc<dyn RemoteConfigStore>>) {
        *self.remote.borrow_mut() = remote;
    }

    pub fn remote(&self) -> Option<Rc<dyn RemoteConfigStore>> {
        self.remote.borrow().clone()
    }

    // ── Lifecycle ──

    /// Load the stored configuration and, once credentials allow it,
    /// kick off model discovery.
    ///
    /// With a remote store configured this only enters `Loading`; the
    /// shell must schedule [`remote_wait_elapsed`](Self::remote_wait_elapsed)
    /// after [`REMOTE_CONNECT_TIMEOUT_MS`] and call
    /// [`handle_remote_connected`](Self::handle_remote_connected) when the
    /// store connects. The controller itself owns no timers.
    pub async fn initialize(&self) {
        {
            let state = self.state.borrow();
            debug_assert!(state.phase == LoadPhase::Idle, "initialize called twice");
            if state.phase != LoadPhase::Idle {
                return;
            }
        }
        if self.remote.borrow().is_some() {
            self.state.borrow_mut().phase = LoadPhase::Loading;
            self.emit(&WalletEvent::PhaseChanged);
            return;
        }
        self.finish_with_local().await;
    }

    /// Fallback for a remote store that never connected. A no-op once
    /// the config is loaded, so a connect racing the timeout is safe.
    pub async fn remote_wait_elapsed(&self) {
        if self.state.borrow().phase != LoadPhase::Loading {
            return;
        }
        warn!("remote store did not connect in time, using local config");
        self.finish_with_local().await;
    }

    async fn finish_with_local(&self) {
        let snapshot = {
            let mut state = self.state.borrow_mut();
            if let Some(patch) = self.local.load() {
                state.config.merge(&patch);
            }
            state.config_loaded = true;
            state.phase = LoadPhase::Loaded;
            state.config.clone()
        };
        self.emit(&WalletEvent::ConfigChanged(snapshot.clone()));
        self.emit(&WalletEvent::PhaseChanged);
        if snapshot.setup_state().is_ready() {
            self.refresh_models().await;
        }
    }

    /// React to the remote store reporting `connected`. Valid at any
    /// point: on the first load the local record is read as the base and
    /// the remote fields overlay it, after a local fallback (or a late
    /// `set_remote`) the overlay lands on whatever is current.
    pub async fn handle_remote_connected(&self) {
        // stale signals from a swapped-out or flapping store are ignored
        let remote = match self.remote.borrow().clone() {
            Some(remote) => remote,
            None => {
                debug!("connected signal with no remote store configured");
                return;
            }
        };
        if !remote.is_connected() {
            debug!("connected signal while the store reports disconnected");
            return;
        }

        let loaded = remote.load().await;

        let (snapshot, merged, was_loading, seed, fetch) = {
            let mut state = self.state.borrow_mut();
            if !state.config_loaded {
                if let Some(patch) = self.local.load() {
                    state.config.merge(&patch);
                }
            }
            let endpoint_before = state.config.endpoint.clone();
            let api_key_before = state.config.api_key.clone();
            let mut merged = false;
            let mut seed = false;
            match loaded {
                Ok(Some(patch)) => {
                    state.config.merge(&patch);
                    merged = true;
                }
                Ok(None) => {
                    if !state.remote_seeded {
                        state.remote_seeded = true;
                        seed = true;
                    }
                }
                Err(err) => warn!(%err, "remote config unavailable, keeping current config"),
            }
            let was_loading = state.phase == LoadPhase::Loading;
            state.phase = LoadPhase::Loaded;
            state.config_loaded = true;
            let credentials_changed = state.config.endpoint != endpoint_before
                || state.config.api_key != api_key_before;
            let fetch = state.config.setup_state().is_ready()
                && (!state.models_loaded_once || credentials_changed);
            (state.config.clone(), merged, was_loading, seed, fetch)
        };

        if merged {
            // keep the local mirror in step with the synced record
            self.local.save(&snapshot);
        }
        self.emit(&WalletEvent::ConfigChanged(snapshot.clone()));
        if was_loading {
            self.emit(&WalletEvent::PhaseChanged);
        }
        if seed {
            if let Err(err) = remote.save(&snapshot).await {
                warn!(%err, "seeding remote config failed");
            }
        }
        if fetch {
            self.refresh_models().await;
        }
    }

    // ── Edits ──

    /// Record a keystroke in the endpoint field. Updates the in-memory
    /// config and notifies subscribers immediately; persistence and the
    /// follow-up fetch wait for [`commit_debounced`](Self::commit_debounced).
    pub fn note_endpoint_input(&self, value: &str) -> EditTicket {
        let (snapshot, epoch) = {
            let mut state = self.state.borrow_mut();
            state.config.endpoint = value.to_owned();
            state.endpoint_epoch += 1;
            (state.config.clone(), state.endpoint_epoch)
        };
        self.emit(&WalletEvent::ConfigChanged(snapshot));
        EditTicket {
            field: EditField::Endpoint,
            epoch,
        }
    }

    /// Record a keystroke in the API key field. See
    /// [`note_endpoint_input`](Self::note_endpoint_input).
    pub fn note_api_key_input(&self, value: &str) -> EditTicket {
        let (snapshot, epoch) = {
            let mut state = self.state.borrow_mut();
            state.config.api_key = value.to_owned();
            state.api_key_epoch += 1;
            (state.config.clone(), state.api_key_epoch)
        };
        self.emit(&WalletEvent::ConfigChanged(snapshot));
        EditTicket {
            field: EditField::ApiKey,
            epoch,
        }
    }

    /// Redeem a debounce ticket once its quiet period has elapsed. A
    /// ticket older than the field's latest keystroke is dropped, so a
    /// burst of edits persists and fetches exactly once.
    pub async fn commit_debounced(&self, ticket: EditTicket) {
        let current = {
            let state = self.state.borrow();
            match ticket.field {
                EditField::Endpoint => state.endpoint_epoch,
                EditField::ApiKey => state.api_key_epoch,
            }
        };
        if current != ticket.epoch {
            return;
        }
        self.save_configuration().await;
        self.refresh_models().await;
    }

    /// Enable or disable a capability. Commits immediately; capability
    /// membership never triggers a model fetch.
    pub async fn toggle_capability(&self, capability: CapabilityId) {
        let snapshot = {
            let mut state = self.state.borrow_mut();
            state.config.toggle_capability(capability);
            state.config.clone()
        };
        self.emit(&WalletEvent::ConfigChanged(snapshot));
        self.save_configuration().await;
    }

    /// Pick (or clear, with `None`) the model for a capability. The
    /// choice is kept even when the current model list does not offer
    /// it; [`unresolved_selections`](Self::unresolved_selections) reports
    /// such holdovers.
    pub async fn select_model(&self, capability: CapabilityId, model_id: Option<String>) {
        let snapshot = {
            let mut state = self.state.borrow_mut();
            state.config.set_selected_model(capability, model_id);
            state.config.clone()
        };
        self.emit(&WalletEvent::ConfigChanged(snapshot));
        self.save_configuration().await;
    }

    /// Wizard submit for the API key. When the key's shape identifies a
    /// provider the endpoint is filled in and the config commits in one
    /// step; otherwise the endpoint is cleared so setup moves on to
    /// asking for one, and nothing is persisted yet.
    pub async fn submit_api_key(&self, api_key: &str) {
        if api_key.is_empty() {
            return;
        }
        let (snapshot, detected) = {
            let mut state = self.state.borrow_mut();
            state.config.api_key = api_key.to_owned();
            state.api_key_epoch += 1;
            let detected = match detect_endpoint(api_key) {
                Some(endpoint) => {
                    state.config.endpoint = endpoint.to_owned();
                    true
                }
                None => {
                    state.config.endpoint.clear();
                    false
                }
            };
            state.endpoint_epoch += 1;
            (state.config.clone(), detected)
        };
        self.emit(&WalletEvent::ConfigChanged(snapshot));
        if detected {
            self.save_configuration().await;
            self.refresh_models().await;
        }
    }

    /// Wizard submit for a hand-entered endpoint.
    pub async fn submit_endpoint(&self, endpoint: &str) {
        if endpoint.is_empty() {
            return;
        }
        let snapshot = {
            let mut state = self.state.borrow_mut();
            state.config.endpoint = endpoint.to_owned();
            state.endpoint_epoch += 1;
            state.config.clone()
        };
        self.emit(&WalletEvent::ConfigChanged(snapshot));
        self.save_configuration().await;
        self.refresh_models().await;
    }

    /// Put the endpoint back to the built-in default, committing
    /// immediately.
    pub async fn reset_endpoint(&self) {
        self.submit_endpoint(DEFAULT_ENDPOINT).await;
    }

    // ── Model discovery ──

    /// Fetch the model catalog for the current credentials. At most one
    /// request is in flight; a refresh arriving while one is running is
    /// dropped, not queued. With no endpoint configured the list just
    /// empties.
    pub async fn refresh_models(&self) {
        let (endpoint, api_key, generation) = {
            let mut state = self.state.borrow_mut();
            if state.models_loading {
                debug!("model fetch already in flight, dropping refresh");
                return;
            }
            if state.config.endpoint.is_empty() {
                state.models.clear();
                state.models_error = None;
                state.models_loaded_once = true;
                drop(state);
                self.emit(&WalletEvent::ModelsChanged);
                return;
            }
            state.models_loading = true;
            state.models_error = None;
            state.fetch_generation += 1;
            (
                state.config.endpoint.clone(),
                state.config.api_key.clone(),
                state.fetch_generation,
            )
        };
        self.emit(&WalletEvent::ModelsChanged);

        let result = self.catalog.fetch_models(&endpoint, &api_key).await;

        {
            let mut state = self.state.borrow_mut();
            if state.fetch_generation != generation {
                debug!("discarding model fetch result that lost currency");
                return;
            }
            state.models_loading = false;
            state.models_loaded_once = true;
            match result {
                Ok(models) => {
                    state.models = models;
                    state.models_error = None;
                }
                Err(err) => {
                    warn!(%err, "model fetch failed");
                    state.models.clear();
                    state.models_error = Some(err.to_string());
                }
            }
        }
        self.emit(&WalletEvent::ModelsChanged);
    }

    // ── Persistence ──

    /// Write the current config to the local store and, when connected,
    /// the remote one. Returns `false` only when the remote write
    /// failed. Before the initial load finishes this is a no-op so
    /// stray early edits cannot overwrite the stored record.
    pub async fn save_configuration(&self) -> bool {
        let snapshot = {
            let state = self.state.borrow();
            if !state.config_loaded {
                debug!("skipping save before the stored config is loaded");
                return true;
            }
            state.config.clone()
        };
        self.local.save(&snapshot);
        let remote = self.remote.borrow().clone();
        if let Some(remote) = remote {
            if remote.is_connected() {
                if let Err(err) = remote.save(&snapshot).await {
                    warn!(%err, "remote config save failed");
                    return false;
                }
            }
        }
        true
    }

    // ── Reads ──

    pub fn configuration(&self) -> WalletConfig {
        self.state.borrow().config.clone()
    }

    pub fn setup_state(&self) -> SetupState {
        self.state.borrow().config.setup_state()
    }

    pub fn load_phase(&self) -> LoadPhase {
        self.state.borrow().phase
    }

    pub fn models(&self) -> Vec<Model> {
        self.state.borrow().models.clone()
    }

    pub fn models_loading(&self) -> bool {
        self.state.borrow().models_loading
    }

    pub fn models_error(&self) -> Option<String> {
        self.state.borrow().models_error.clone()
    }

    /// Whether at least one catalog fetch (or empty-endpoint clear) has
    /// completed since startup.
    pub fn models_loaded_once(&self) -> bool {
        self.state.borrow().models_loaded_once
    }

    /// Enabled capabilities whose selected model the current list does
    /// not advertise. Empty until the first fetch completes, since
    /// before that there is nothing to compare against.
    pub fn unresolved_selections(&self) -> Vec<CapabilityId> {
        let state = self.state.borrow();
        if !state.models_loaded_once {
            return Vec::new();
        }
        let mut unresolved = Vec::new();
        for capability in CapabilityId::ALL {
            if !state.config.is_enabled(capability) {
                continue;
            }
            let Some(selected) = state.config.selected_model(capability) else {
                continue;
            };
            let advertised = state
                .models
                .iter()
                .any(|model| model.id == selected && model.supports(capability));
            if !advertised {
                unresolved.push(capability);
            }
        }
        unresolved
    }

    // ── Subscriptions ──

    pub fn subscribe(&self, listener: impl Fn(&WalletEvent) + 'static) -> Subscription {
        let id = self.next_subscription.get();
        self.next_subscription.set(id + 1);
        self.subscribers.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, subscription: Subscription) {
        self.subscribers
            .borrow_mut()
            .retain(|(id, _)| *id != subscription);
    }

    /// Call every subscriber with `event`. The list is cloned out first
    /// so listeners may re-enter the controller, including subscribing
    /// or unsubscribing mid-emit.
    fn emit(&self, event: &WalletEvent) {
        let listeners: Vec<Listener> = self
            .subscribers
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use aw_store::MemoryLocalStore;

    struct EmptyCatalog;

    #[async_trait(?Send)]
    impl ModelCatalog for EmptyCatalog {
        async fn fetch_models(
            &self,
            _endpoint: &str,
            _api_key: &str,
        ) -> Result<Vec<Model>, aw_catalog::CatalogError> {
            Ok(Vec::new())
        }
    }

    fn controller() -> WalletController {
        WalletController::new(Rc::new(MemoryLocalStore::new()), Rc::new(EmptyCatalog))
    }

    #[test]
    fn subscribers_receive_config_snapshots() {
        let ctrl = controller();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        ctrl.subscribe(move |event| {
            if let WalletEvent::ConfigChanged(config) = event {
                sink.borrow_mut().push(config.endpoint.clone());
            }
        });

        ctrl.note_endpoint_input("https://a");
        ctrl.note_endpoint_input("https://ab");

        assert_eq!(*seen.borrow(), vec!["https://a", "https://ab"]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let ctrl = controller();
        let count = Rc::new(Cell::new(0u32));
        let sink = Rc::clone(&count);
        let subscription = ctrl.subscribe(move |_| sink.set(sink.get() + 1));

        ctrl.note_endpoint_input("https://a");
        ctrl.unsubscribe(subscription);
        ctrl.note_endpoint_input("https://b");

        assert_eq!(count.get(), 1);
    }

    #[test]
    fn listeners_can_reenter_the_controller() {
        let ctrl = Rc::new(controller());
        let inner = Rc::clone(&ctrl);
        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        ctrl.subscribe(move |_| {
            *sink.borrow_mut() = Some(inner.configuration().endpoint);
        });

        ctrl.note_endpoint_input("https://reentrant");
        assert_eq!(seen.borrow().as_deref(), Some("https://reentrant"));
    }

    #[tokio::test]
    async fn stale_tickets_do_not_commit() -> anyhow::Result<()> {
        let local = Rc::new(MemoryLocalStore::new());
        let ctrl = WalletController::new(Rc::clone(&local) as Rc<dyn LocalConfigStore>, Rc::new(EmptyCatalog));
        ctrl.initialize().await;

        let stale = ctrl.note_endpoint_input("https://a");
        let fresh = ctrl.note_endpoint_input("https://ab");
        let saves_before = local.save_count();

        ctrl.commit_debounced(stale).await;
        assert_eq!(local.save_count(), saves_before, "superseded ticket must not persist");

        ctrl.commit_debounced(fresh).await;
        assert_eq!(local.save_count(), saves_before + 1);
        Ok(())
    }

    #[test]
    fn ticket_epochs_are_per_field() {
        let ctrl = controller();
        let endpoint_ticket = ctrl.note_endpoint_input("https://a");
        ctrl.note_api_key_input("sk-x");
        // the key edit must not invalidate the endpoint ticket
        assert_eq!(endpoint_ticket.field, EditField::Endpoint);
        assert_eq!(
            ctrl.state.borrow().endpoint_epoch,
            endpoint_ticket.epoch
        );
    }

    #[test]
    fn unresolved_selections_wait_for_the_first_fetch() {
        let ctrl = controller();
        {
            let mut state = ctrl.state.borrow_mut();
            state.config.llm = Some("ghost".to_owned());
        }
        assert!(ctrl.unresolved_selections().is_empty());

        ctrl.state.borrow_mut().models_loaded_once = true;
        assert_eq!(ctrl.unresolved_selections(), vec![CapabilityId::Llm]);
    }
}
