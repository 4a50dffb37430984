use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::mpsc;

use dh_core::ports::{ContentProvider, OwnershipEvents, SelectionEventFilter, SelectionHost};
use dh_core::selection::TEXT_TARGET;
use dh_core::{
    OwnerChange, PointerState, SelectionError, SelectionKind, ServerTime, TargetName, WindowId,
};

#[derive(Default)]
struct SelectionState {
    owner: Option<WindowId>,
    /// Data an external client offers while it owns the selection.
    offers: Vec<(TargetName, Bytes)>,
    /// Installed when this process republishes the selection.
    provider: Option<Arc<dyn ContentProvider>>,
    provider_targets: Vec<TargetName>,
}

struct DisplayState {
    time: u64,
    next_window: u32,
    windows_created: u32,
    helper_window: Option<WindowId>,
    selections: HashMap<SelectionKind, SelectionState>,
    pointer: PointerState,
    reject_next_claim: bool,
    hijacker: Option<WindowId>,
    announce_fail: bool,
    announcements: Vec<(SelectionKind, WindowId)>,
    filters: Vec<(WindowId, Arc<dyn SelectionEventFilter>)>,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            time: 0,
            next_window: 1,
            windows_created: 0,
            helper_window: None,
            selections: HashMap::new(),
            pointer: PointerState::default(),
            reject_next_claim: false,
            hijacker: None,
            announce_fail: false,
            announcements: Vec::new(),
            filters: Vec::new(),
        }
    }
}

/// In-memory selection-owner registry.
///
/// Owner transitions emit organic `OwnerChange` notifications to every
/// subscriber, exactly as a display server would; the client-simulation
/// methods let tests play the part of external applications.
#[derive(Default)]
pub struct InMemoryDisplay {
    state: Mutex<DisplayState>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<OwnerChange>>>,
}

impl InMemoryDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    // === client simulation ===

    /// An external client takes a selection, offering `offers`.
    pub fn client_copy(
        &self,
        selection: SelectionKind,
        window: WindowId,
        offers: Vec<(TargetName, Bytes)>,
    ) {
        let change = {
            let mut state = self.state.lock().unwrap();
            state.time += 1;
            let time = ServerTime(state.time);
            let entry = state.selections.entry(selection).or_default();
            entry.owner = Some(window);
            entry.offers = offers;
            entry.provider = None;
            entry.provider_targets.clear();
            OwnerChange::organic(selection, Some(window), time)
        };
        self.emit(change);
    }

    /// An external client takes a selection with a single text offer.
    pub fn client_copy_text(&self, selection: SelectionKind, window: WindowId, text: &str) {
        self.client_copy(
            selection,
            window,
            vec![(
                TargetName::from(TEXT_TARGET),
                Bytes::copy_from_slice(text.as_bytes()),
            )],
        );
    }

    /// The owning client goes away; the selection is left unowned and its
    /// offered data is gone.
    pub fn client_clear(&self, selection: SelectionKind) {
        let change = {
            let mut state = self.state.lock().unwrap();
            state.time += 1;
            let time = ServerTime(state.time);
            let entry = state.selections.entry(selection).or_default();
            entry.owner = None;
            entry.offers.clear();
            entry.provider = None;
            entry.provider_targets.clear();
            OwnerChange::organic(selection, None, time)
        };
        self.emit(change);
    }

    /// Deliver a fabricated notification, as a misbehaving client would.
    pub fn emit_synthetic(&self, selection: SelectionKind, owner: Option<WindowId>) {
        let time = {
            let mut state = self.state.lock().unwrap();
            state.time += 1;
            ServerTime(state.time)
        };
        let mut change = OwnerChange::organic(selection, owner, time);
        change.synthetic = true;
        self.emit(change);
    }

    pub fn set_pointer(&self, pointer: PointerState) {
        self.state.lock().unwrap().pointer = pointer;
    }

    /// Read a selection the way a pasting client would.
    pub fn read(&self, selection: SelectionKind, target: &str) -> Option<Bytes> {
        self.fetch(selection, &TargetName::from(target))
    }

    pub fn read_text(&self, selection: SelectionKind) -> Option<String> {
        self.fetch_text(selection)
    }

    // === failure injection ===

    pub fn reject_next_claim(&self) {
        self.state.lock().unwrap().reject_next_claim = true;
    }

    /// Every subsequent claim is immediately won by `rival` instead.
    pub fn hijack_claims(&self, rival: WindowId) {
        self.state.lock().unwrap().hijacker = Some(rival);
    }

    pub fn fail_announcements(&self) {
        self.state.lock().unwrap().announce_fail = true;
    }

    // === inspection ===

    pub fn window_count(&self) -> u32 {
        self.state.lock().unwrap().windows_created
    }

    pub fn announcements(&self) -> Vec<(SelectionKind, WindowId)> {
        self.state.lock().unwrap().announcements.clone()
    }

    fn emit(&self, change: OwnerChange) {
        let filters: Vec<Arc<dyn SelectionEventFilter>> = {
            let state = self.state.lock().unwrap();
            state.filters.iter().map(|(_, f)| Arc::clone(f)).collect()
        };
        {
            let mut subscribers = self.subscribers.lock().unwrap();
            subscribers.retain(|tx| tx.send(change.clone()).is_ok());
        }
        for filter in filters {
            filter.handle(&change);
        }
    }
}

impl SelectionHost for InMemoryDisplay {
    fn current_server_time(&self) -> ServerTime {
        let mut state = self.state.lock().unwrap();
        state.time += 1;
        ServerTime(state.time)
    }

    fn selection_owner(&self, selection: SelectionKind) -> Option<WindowId> {
        self.state
            .lock()
            .unwrap()
            .selections
            .get(&selection)
            .and_then(|entry| entry.owner)
    }

    fn list_targets(&self, selection: SelectionKind) -> Vec<TargetName> {
        let state = self.state.lock().unwrap();
        match state.selections.get(&selection) {
            Some(entry) if entry.provider.is_some() => entry.provider_targets.clone(),
            Some(entry) => entry.offers.iter().map(|(t, _)| t.clone()).collect(),
            None => Vec::new(),
        }
    }

    fn fetch(&self, selection: SelectionKind, target: &TargetName) -> Option<Bytes> {
        let provider = {
            let state = self.state.lock().unwrap();
            match state.selections.get(&selection) {
                Some(entry) => match &entry.provider {
                    Some(provider) => Arc::clone(provider),
                    None => {
                        return entry
                            .offers
                            .iter()
                            .find(|(t, _)| t == target)
                            .map(|(_, payload)| payload.clone())
                    }
                },
                None => return None,
            }
        };
        provider.supply(target)
    }

    fn fetch_text(&self, selection: SelectionKind) -> Option<String> {
        self.fetch(selection, &TargetName::from(TEXT_TARGET))
            .and_then(|payload| String::from_utf8(payload.to_vec()).ok())
    }

    fn create_surrogate_window(&self) -> WindowId {
        let mut state = self.state.lock().unwrap();
        let window = WindowId(state.next_window);
        state.next_window += 1;
        state.windows_created += 1;
        window
    }

    fn claim(
        &self,
        selection: SelectionKind,
        window: WindowId,
        _time: ServerTime,
    ) -> Result<(), SelectionError> {
        let change = {
            let mut state = self.state.lock().unwrap();
            if state.reject_next_claim {
                state.reject_next_claim = false;
                return Err(SelectionError::ClaimRejected);
            }
            let owner = state.hijacker.unwrap_or(window);
            state.time += 1;
            let time = ServerTime(state.time);
            let entry = state.selections.entry(selection).or_default();
            entry.owner = Some(owner);
            entry.offers.clear();
            entry.provider = None;
            entry.provider_targets.clear();
            OwnerChange::organic(selection, Some(owner), time)
        };
        self.emit(change);
        Ok(())
    }

    fn publish(
        &self,
        selection: SelectionKind,
        targets: Vec<TargetName>,
        provider: Arc<dyn ContentProvider>,
    ) {
        let change = {
            let mut state = self.state.lock().unwrap();
            let helper = match state.helper_window {
                Some(window) => window,
                None => {
                    let window = WindowId(state.next_window);
                    state.next_window += 1;
                    state.helper_window = Some(window);
                    window
                }
            };
            state.time += 1;
            let time = ServerTime(state.time);
            let entry = state.selections.entry(selection).or_default();
            entry.owner = Some(helper);
            entry.offers.clear();
            entry.provider = Some(provider);
            entry.provider_targets = targets;
            OwnerChange::organic(selection, Some(helper), time)
        };
        self.emit(change);
    }

    fn publish_text(&self, selection: SelectionKind, text: &str) {
        let change = {
            let mut state = self.state.lock().unwrap();
            let helper = match state.helper_window {
                Some(window) => window,
                None => {
                    let window = WindowId(state.next_window);
                    state.next_window += 1;
                    state.helper_window = Some(window);
                    window
                }
            };
            state.time += 1;
            let time = ServerTime(state.time);
            let entry = state.selections.entry(selection).or_default();
            entry.owner = Some(helper);
            entry.offers = vec![(
                TargetName::from(TEXT_TARGET),
                Bytes::copy_from_slice(text.as_bytes()),
            )];
            entry.provider = None;
            entry.provider_targets.clear();
            OwnerChange::organic(selection, Some(helper), time)
        };
        self.emit(change);
    }

    fn announce_manager(
        &self,
        selection: SelectionKind,
        window: WindowId,
    ) -> Result<(), SelectionError> {
        let mut state = self.state.lock().unwrap();
        if state.announce_fail {
            return Err(SelectionError::SendFailed(
                "injected send failure".to_string(),
            ));
        }
        state.announcements.push((selection, window));
        Ok(())
    }

    fn install_event_filter(&self, window: WindowId, filter: Arc<dyn SelectionEventFilter>) {
        self.state.lock().unwrap().filters.push((window, filter));
    }

    fn pointer_state(&self) -> PointerState {
        self.state.lock().unwrap().pointer
    }
}

impl OwnershipEvents for InMemoryDisplay {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<OwnerChange> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }
}
