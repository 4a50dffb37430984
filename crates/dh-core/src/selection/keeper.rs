//! Clipboard keeper
//!
//! Reacts to "selection owner changed" notifications and keeps clipboard
//! contents alive after the owning application exits.
//!
//! ## Responsibility
//!
//! The keeper is responsible for:
//!
//! - Snapshotting the outgoing owner's data when a new clipboard owner
//!   appears (*store*)
//! - Republishing the snapshot under a synthetic in-process owner when the
//!   clipboard is left unowned (*restore*)
//! - Preserving primary-selection text across the owning client's
//!   lifetime, debounced so an in-progress selection drag is not cached
//!
//! The keeper **does not** schedule timers or talk to the event loop; it
//! reports debounce intent through [`DebounceCommand`] and leaves the
//! actual timer to the runtime.
//!
//! ## Feedback loops
//!
//! A restore makes this process the new owner, which triggers the very
//! notification the keeper listens for. One internal-change flag per
//! selection marks the next notification as self-caused; the flag is set
//! immediately before a publish and cleared by the notification it causes.
//! At most one flag per selection is outstanding at any time.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, trace};

use super::events::OwnerChange;
use super::model::SelectionKind;
use super::snapshot::{SelectionSnapshot, SnapshotProvider};
use crate::ports::SelectionHost;

/// Delay before a primary-selection store, so a selection still being
/// dragged out is not cached mid-drag.
pub const PRIMARY_DEBOUNCE: Duration = Duration::from_millis(250);

/// Debounce intent reported to the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceCommand {
    /// Arm the primary store timer.
    Schedule,
    /// Abort the pending primary store timer.
    Cancel,
}

/// Result of a primary store timer firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceVerdict {
    /// Selection drag still in progress; re-arm and check again later.
    Reschedule,
    /// Store attempt finished; timer no longer pending.
    Complete,
    /// Nothing left to store; stop without re-arming.
    Cancel,
}

/// Keeps the default clipboard and primary selection alive across owner
/// exits. One instance per display connection, driven from a single
/// control thread.
pub struct ClipboardKeeper {
    host: Arc<dyn SelectionHost>,

    clipboard_cache: Arc<Mutex<SelectionSnapshot>>,
    primary_cache: Option<String>,

    clipboard_internal_change: bool,
    primary_internal_change: bool,
    primary_debounce_pending: bool,
}

impl ClipboardKeeper {
    pub fn new(host: Arc<dyn SelectionHost>) -> Self {
        Self {
            host,
            clipboard_cache: Arc::new(Mutex::new(SelectionSnapshot::new())),
            primary_cache: None,
            clipboard_internal_change: false,
            primary_internal_change: false,
            primary_debounce_pending: false,
        }
    }

    /// Dispatch an ownership notification. Only organically generated
    /// events are trusted; synthetic ones are dropped outright.
    pub fn handle_owner_change(&mut self, change: &OwnerChange) -> Option<DebounceCommand> {
        if change.synthetic {
            trace!(selection = %change.selection, "ignoring synthetic owner change");
            return None;
        }

        match change.selection {
            SelectionKind::Clipboard => {
                self.handle_clipboard_change(change);
                None
            }
            SelectionKind::Primary => self.handle_primary_change(change),
            SelectionKind::Manager => None,
        }
    }

    fn handle_clipboard_change(&mut self, change: &OwnerChange) {
        if change.owner.is_some() {
            if self.clipboard_internal_change {
                // The notification our own restore caused; acknowledge it.
                self.clipboard_internal_change = false;
                return;
            }
            self.store_clipboard();
        } else {
            /* Some clients notify twice when we restore: once with no
             * owner (when we must republish) and once naming us as the
             * owner. Reacting to the first again would republish and then
             * immediately re-store empty content, so skip it while the
             * flag is still outstanding. */
            if self.clipboard_internal_change {
                return;
            }
            self.restore_clipboard();
        }
    }

    /// Snapshot every non-meta target the new owner advertises, replacing
    /// the previous snapshot. A target whose fetch returns nothing is
    /// skipped without retry; failed enumeration keeps the old snapshot.
    fn store_clipboard(&mut self) {
        let targets = self.host.list_targets(SelectionKind::Clipboard);
        if targets.is_empty() {
            debug!("clipboard owner advertises no targets, keeping previous snapshot");
            return;
        }

        let mut fresh = SelectionSnapshot::new();
        for target in targets {
            if target.is_meta() {
                continue;
            }
            if let Some(payload) = self.host.fetch(SelectionKind::Clipboard, &target) {
                fresh.prepend(target, payload);
            }
        }

        debug!(targets = fresh.len(), "stored clipboard snapshot");
        *self.clipboard_cache.lock().unwrap() = fresh;
    }

    /// Republish the current snapshot under this process. Publishing
    /// nothing would clobber a paste in progress, so an empty snapshot
    /// leaves the selection alone and the flag clear.
    fn restore_clipboard(&mut self) {
        let targets = {
            let cache = self.clipboard_cache.lock().unwrap();
            if cache.is_empty() {
                return;
            }
            cache.targets()
        };

        debug!(targets = targets.len(), "restoring clipboard snapshot");
        self.clipboard_internal_change = true;
        self.host.publish(
            SelectionKind::Clipboard,
            targets,
            Arc::new(SnapshotProvider::new(Arc::clone(&self.clipboard_cache))),
        );
    }

    fn handle_primary_change(&mut self, change: &OwnerChange) -> Option<DebounceCommand> {
        if change.owner.is_some() {
            if self.primary_internal_change {
                self.primary_internal_change = false;
                return None;
            }
            if self.primary_debounce_pending {
                // Leave the armed timer running; it re-checks pointer
                // state when it fires.
                return None;
            }
            self.primary_debounce_pending = true;
            Some(DebounceCommand::Schedule)
        } else {
            // Cancel before restoring so a stale store can never overwrite
            // the republished text.
            let cancel = if self.primary_debounce_pending {
                self.primary_debounce_pending = false;
                Some(DebounceCommand::Cancel)
            } else {
                None
            };

            if let Some(text) = self.primary_cache.clone() {
                debug!("restoring primary selection text");
                self.primary_internal_change = true;
                self.host.publish_text(SelectionKind::Primary, &text);
            }

            cancel
        }
    }

    /// The debounced primary store. Called by the event loop when the
    /// timer fires.
    pub fn primary_store_tick(&mut self) -> DebounceVerdict {
        if self.host.pointer_state().selection_in_progress() {
            return DebounceVerdict::Reschedule;
        }

        if self.host.selection_owner(SelectionKind::Primary).is_none() {
            self.primary_debounce_pending = false;
            return DebounceVerdict::Cancel;
        }

        if let Some(text) = self.host.fetch_text(SelectionKind::Primary) {
            if !text.is_empty() {
                trace!(len = text.len(), "cached primary selection text");
                self.primary_cache = Some(text);
            }
        }

        self.primary_debounce_pending = false;
        DebounceVerdict::Complete
    }

    /// Drop both caches. Called at daemon shutdown.
    pub fn clear(&mut self) {
        self.clipboard_cache.lock().unwrap().clear();
        self.primary_cache = None;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use bytes::Bytes;
    use mockall::mock;

    use super::*;
    use crate::ports::{ContentProvider, SelectionEventFilter, SelectionHost};
    use crate::selection::model::{PointerState, ServerTime, TargetName, WindowId, META_TARGETS};
    use crate::SelectionError;

    /// Scriptable stand-in for the display's selection registry.
    #[derive(Default)]
    struct FakeHost {
        clipboard_targets: Mutex<Vec<TargetName>>,
        clipboard_contents: Mutex<HashMap<TargetName, Bytes>>,
        primary_owner: Mutex<Option<WindowId>>,
        primary_text: Mutex<Option<String>>,
        pointer: Mutex<PointerState>,

        published: Mutex<Vec<Vec<TargetName>>>,
        published_provider: Mutex<Option<Arc<dyn ContentProvider>>>,
        published_text: Mutex<Vec<String>>,
    }

    impl FakeHost {
        fn offer(&self, target: &str, payload: &'static [u8]) {
            let target = TargetName::from(target);
            self.clipboard_targets.lock().unwrap().push(target.clone());
            self.clipboard_contents
                .lock()
                .unwrap()
                .insert(target, Bytes::from_static(payload));
        }

        fn offer_without_content(&self, target: &str) {
            self.clipboard_targets
                .lock()
                .unwrap()
                .push(TargetName::from(target));
        }

        fn clear_offers(&self) {
            self.clipboard_targets.lock().unwrap().clear();
            self.clipboard_contents.lock().unwrap().clear();
        }

        fn publish_count(&self) -> usize {
            self.published.lock().unwrap().len()
        }

        fn supplied(&self, target: &str) -> Option<Bytes> {
            let provider = self.published_provider.lock().unwrap();
            provider
                .as_ref()
                .and_then(|p| p.supply(&TargetName::from(target)))
        }
    }

    impl SelectionHost for FakeHost {
        fn current_server_time(&self) -> ServerTime {
            ServerTime(0)
        }

        fn selection_owner(&self, selection: SelectionKind) -> Option<WindowId> {
            match selection {
                SelectionKind::Primary => *self.primary_owner.lock().unwrap(),
                _ => None,
            }
        }

        fn list_targets(&self, _selection: SelectionKind) -> Vec<TargetName> {
            self.clipboard_targets.lock().unwrap().clone()
        }

        fn fetch(&self, _selection: SelectionKind, target: &TargetName) -> Option<Bytes> {
            self.clipboard_contents.lock().unwrap().get(target).cloned()
        }

        fn fetch_text(&self, _selection: SelectionKind) -> Option<String> {
            self.primary_text.lock().unwrap().clone()
        }

        fn create_surrogate_window(&self) -> WindowId {
            WindowId(1)
        }

        fn claim(
            &self,
            _selection: SelectionKind,
            _window: WindowId,
            _time: ServerTime,
        ) -> Result<(), SelectionError> {
            Ok(())
        }

        fn publish(
            &self,
            _selection: SelectionKind,
            targets: Vec<TargetName>,
            provider: Arc<dyn ContentProvider>,
        ) {
            self.published.lock().unwrap().push(targets);
            *self.published_provider.lock().unwrap() = Some(provider);
        }

        fn publish_text(&self, _selection: SelectionKind, text: &str) {
            self.published_text.lock().unwrap().push(text.to_string());
        }

        fn announce_manager(
            &self,
            _selection: SelectionKind,
            _window: WindowId,
        ) -> Result<(), SelectionError> {
            Ok(())
        }

        fn install_event_filter(&self, _window: WindowId, _filter: Arc<dyn SelectionEventFilter>) {}

        fn pointer_state(&self) -> PointerState {
            *self.pointer.lock().unwrap()
        }
    }

    fn owner_present(selection: SelectionKind) -> OwnerChange {
        OwnerChange::organic(selection, Some(WindowId(42)), ServerTime(1))
    }

    fn owner_absent(selection: SelectionKind) -> OwnerChange {
        OwnerChange::organic(selection, None, ServerTime(2))
    }

    fn keeper_with_host() -> (ClipboardKeeper, Arc<FakeHost>) {
        let host = Arc::new(FakeHost::default());
        let keeper = ClipboardKeeper::new(host.clone());
        (keeper, host)
    }

    #[test]
    fn store_excludes_meta_targets() {
        let (mut keeper, host) = keeper_with_host();
        for meta in META_TARGETS {
            host.offer(meta, b"meta");
        }
        host.offer("UTF8_STRING", b"hello");

        keeper.handle_owner_change(&owner_present(SelectionKind::Clipboard));

        let cache = keeper.clipboard_cache.lock().unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.lookup(&TargetName::from("UTF8_STRING")),
            Some(&Bytes::from_static(b"hello"))
        );
        for meta in META_TARGETS {
            assert_eq!(cache.lookup(&TargetName::from(meta)), None);
        }
    }

    #[test]
    fn store_skips_targets_without_content() {
        let (mut keeper, host) = keeper_with_host();
        host.offer("UTF8_STRING", b"hello");
        host.offer_without_content("image/png");

        keeper.handle_owner_change(&owner_present(SelectionKind::Clipboard));

        let cache = keeper.clipboard_cache.lock().unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup(&TargetName::from("image/png")), None);
    }

    #[test]
    fn failed_enumeration_keeps_previous_snapshot() {
        let (mut keeper, host) = keeper_with_host();
        host.offer("UTF8_STRING", b"hello");
        keeper.handle_owner_change(&owner_present(SelectionKind::Clipboard));

        host.clear_offers();
        keeper.handle_owner_change(&owner_present(SelectionKind::Clipboard));

        let cache = keeper.clipboard_cache.lock().unwrap();
        assert_eq!(
            cache.lookup(&TargetName::from("UTF8_STRING")),
            Some(&Bytes::from_static(b"hello"))
        );
    }

    #[test]
    fn restore_republishes_snapshot_and_serves_bytes_verbatim() {
        let (mut keeper, host) = keeper_with_host();
        host.offer("UTF8_STRING", b"hello");
        host.offer("text/html", b"<p>hello</p>");
        keeper.handle_owner_change(&owner_present(SelectionKind::Clipboard));

        keeper.handle_owner_change(&owner_absent(SelectionKind::Clipboard));

        assert_eq!(host.publish_count(), 1);
        let advertised = host.published.lock().unwrap()[0].clone();
        assert_eq!(advertised.len(), 2);
        assert_eq!(host.supplied("UTF8_STRING"), Some(Bytes::from_static(b"hello")));
        assert_eq!(
            host.supplied("text/html"),
            Some(Bytes::from_static(b"<p>hello</p>"))
        );
        assert_eq!(host.supplied("image/png"), None);
    }

    #[test]
    fn self_triggered_store_is_suppressed() {
        let (mut keeper, host) = keeper_with_host();
        host.offer("UTF8_STRING", b"hello");
        keeper.handle_owner_change(&owner_present(SelectionKind::Clipboard));
        keeper.handle_owner_change(&owner_absent(SelectionKind::Clipboard));
        let before = keeper.clipboard_cache.lock().unwrap().clone();

        // The restore above makes us the owner, which produces this event.
        // Changing the advertised offers proves no store runs on it.
        host.clear_offers();
        host.offer("text/html", b"changed");
        keeper.handle_owner_change(&owner_present(SelectionKind::Clipboard));

        assert!(!keeper.clipboard_internal_change);
        assert_eq!(*keeper.clipboard_cache.lock().unwrap(), before);

        // A later, genuinely external owner does get stored.
        keeper.handle_owner_change(&owner_present(SelectionKind::Clipboard));
        assert_eq!(
            keeper
                .clipboard_cache
                .lock()
                .unwrap()
                .lookup(&TargetName::from("text/html")),
            Some(&Bytes::from_static(b"changed"))
        );
    }

    #[test]
    fn double_notification_does_not_restore_twice() {
        let (mut keeper, host) = keeper_with_host();
        host.offer("UTF8_STRING", b"hello");
        keeper.handle_owner_change(&owner_present(SelectionKind::Clipboard));

        keeper.handle_owner_change(&owner_absent(SelectionKind::Clipboard));
        keeper.handle_owner_change(&owner_absent(SelectionKind::Clipboard));

        assert_eq!(host.publish_count(), 1);
        assert!(keeper.clipboard_internal_change);
    }

    #[test]
    fn empty_snapshot_restore_publishes_nothing_and_leaves_flag_clear() {
        let (mut keeper, host) = keeper_with_host();

        keeper.handle_owner_change(&owner_absent(SelectionKind::Clipboard));

        assert_eq!(host.publish_count(), 0);
        assert!(!keeper.clipboard_internal_change);

        // The next genuine owner must still be stored.
        host.offer("UTF8_STRING", b"hello");
        keeper.handle_owner_change(&owner_present(SelectionKind::Clipboard));
        assert_eq!(keeper.clipboard_cache.lock().unwrap().len(), 1);
    }

    #[test]
    fn synthetic_events_are_ignored() {
        let (mut keeper, host) = keeper_with_host();
        host.offer("UTF8_STRING", b"hello");

        let mut change = owner_present(SelectionKind::Clipboard);
        change.synthetic = true;
        keeper.handle_owner_change(&change);

        assert!(keeper.clipboard_cache.lock().unwrap().is_empty());
    }

    #[test]
    fn primary_owner_schedules_one_debounce() {
        let (mut keeper, _host) = keeper_with_host();

        let first = keeper.handle_owner_change(&owner_present(SelectionKind::Primary));
        assert_eq!(first, Some(DebounceCommand::Schedule));

        // A second owner while the timer is pending leaves it running.
        let second = keeper.handle_owner_change(&owner_present(SelectionKind::Primary));
        assert_eq!(second, None);
        assert!(keeper.primary_debounce_pending);
    }

    #[test]
    fn primary_tick_reschedules_while_dragging() {
        let (mut keeper, host) = keeper_with_host();
        *host.primary_owner.lock().unwrap() = Some(WindowId(42));
        *host.primary_text.lock().unwrap() = Some("partial".to_string());
        *host.pointer.lock().unwrap() = PointerState {
            button1_held: true,
            shift_held: false,
        };
        keeper.handle_owner_change(&owner_present(SelectionKind::Primary));

        assert_eq!(keeper.primary_store_tick(), DebounceVerdict::Reschedule);
        assert!(keeper.primary_debounce_pending);
        assert_eq!(keeper.primary_cache, None);
    }

    #[test]
    fn primary_tick_stores_text_once_settled() {
        let (mut keeper, host) = keeper_with_host();
        *host.primary_owner.lock().unwrap() = Some(WindowId(42));
        *host.primary_text.lock().unwrap() = Some("selected words".to_string());
        keeper.handle_owner_change(&owner_present(SelectionKind::Primary));

        assert_eq!(keeper.primary_store_tick(), DebounceVerdict::Complete);
        assert!(!keeper.primary_debounce_pending);
        assert_eq!(keeper.primary_cache.as_deref(), Some("selected words"));
    }

    #[test]
    fn primary_tick_cancels_when_selection_unowned() {
        let (mut keeper, _host) = keeper_with_host();
        keeper.handle_owner_change(&owner_present(SelectionKind::Primary));

        assert_eq!(keeper.primary_store_tick(), DebounceVerdict::Cancel);
        assert!(!keeper.primary_debounce_pending);
    }

    #[test]
    fn primary_tick_keeps_cache_on_empty_text() {
        let (mut keeper, host) = keeper_with_host();
        *host.primary_owner.lock().unwrap() = Some(WindowId(42));
        *host.primary_text.lock().unwrap() = Some("kept".to_string());
        keeper.handle_owner_change(&owner_present(SelectionKind::Primary));
        keeper.primary_store_tick();

        *host.primary_text.lock().unwrap() = Some(String::new());
        keeper.handle_owner_change(&owner_present(SelectionKind::Primary));
        keeper.primary_store_tick();

        assert_eq!(keeper.primary_cache.as_deref(), Some("kept"));
    }

    #[test]
    fn primary_restore_cancels_pending_timer_and_republishes() {
        let (mut keeper, host) = keeper_with_host();
        *host.primary_owner.lock().unwrap() = Some(WindowId(42));
        *host.primary_text.lock().unwrap() = Some("cached".to_string());
        keeper.handle_owner_change(&owner_present(SelectionKind::Primary));
        keeper.primary_store_tick();

        // New owner arms a fresh timer, then exits before it fires.
        keeper.handle_owner_change(&owner_present(SelectionKind::Primary));
        let cmd = keeper.handle_owner_change(&owner_absent(SelectionKind::Primary));

        assert_eq!(cmd, Some(DebounceCommand::Cancel));
        assert_eq!(
            host.published_text.lock().unwrap().as_slice(),
            ["cached".to_string()]
        );
        assert!(keeper.primary_internal_change);

        // The notification caused by our own republish clears the flag.
        keeper.handle_owner_change(&owner_present(SelectionKind::Primary));
        assert!(!keeper.primary_internal_change);
        assert!(!keeper.primary_debounce_pending);
    }

    #[test]
    fn primary_restore_without_cache_stays_silent() {
        let (mut keeper, host) = keeper_with_host();

        let cmd = keeper.handle_owner_change(&owner_absent(SelectionKind::Primary));

        assert_eq!(cmd, None);
        assert!(host.published_text.lock().unwrap().is_empty());
        assert!(!keeper.primary_internal_change);
    }

    mock! {
        Host {}

        impl SelectionHost for Host {
            fn current_server_time(&self) -> ServerTime;
            fn selection_owner(&self, selection: SelectionKind) -> Option<WindowId>;
            fn list_targets(&self, selection: SelectionKind) -> Vec<TargetName>;
            fn fetch(&self, selection: SelectionKind, target: &TargetName) -> Option<Bytes>;
            fn fetch_text(&self, selection: SelectionKind) -> Option<String>;
            fn create_surrogate_window(&self) -> WindowId;
            fn claim(
                &self,
                selection: SelectionKind,
                window: WindowId,
                time: ServerTime,
            ) -> Result<(), SelectionError>;
            fn publish(
                &self,
                selection: SelectionKind,
                targets: Vec<TargetName>,
                provider: Arc<dyn ContentProvider>,
            );
            fn publish_text(&self, selection: SelectionKind, text: &str);
            fn announce_manager(
                &self,
                selection: SelectionKind,
                window: WindowId,
            ) -> Result<(), SelectionError>;
            fn install_event_filter(&self, window: WindowId, filter: Arc<dyn SelectionEventFilter>);
            fn pointer_state(&self) -> PointerState;
        }
    }

    #[test]
    fn store_fetches_each_advertised_target_exactly_once() {
        let mut host = MockHost::new();
        host.expect_list_targets()
            .returning(|_| vec![TargetName::from("UTF8_STRING"), TargetName::from("TARGETS")]);
        host.expect_fetch()
            .withf(|_, target| target.as_str() == "UTF8_STRING")
            .times(1)
            .returning(|_, _| Some(Bytes::from_static(b"hello")));

        let mut keeper = ClipboardKeeper::new(Arc::new(host));
        keeper.handle_owner_change(&owner_present(SelectionKind::Clipboard));

        assert_eq!(keeper.clipboard_cache.lock().unwrap().len(), 1);
    }
}
