//! Manager-selection acquisition.
//!
//! Becoming the owner of the singleton `CLIPBOARD_MANAGER` selection is
//! how a persistence service announces itself; exactly one manager may be
//! active per display.

use std::sync::Arc;

use tracing::{debug, error, info};

use dh_core::ports::{SelectionEventFilter, SelectionHost};
use dh_core::{AcquireError, SelectionKind, WindowId};

/// The claimed manager selection: the surrogate window now owning it.
#[derive(Debug, Clone, Copy)]
pub struct ManagerHandle {
    pub window: WindowId,
}

/// Claim the manager selection following the manager-selection convention.
///
/// Unless `force` is set, an existing owner aborts the attempt before any
/// window is created. A rejected claim is the only fatal outcome; losing
/// the race to a competitor after the claim is reported without error
/// noise, and a failed announcement broadcast is logged but tolerated.
pub fn acquire_manager_selection(
    host: &dyn SelectionHost,
    force: bool,
    filter: Option<Arc<dyn SelectionEventFilter>>,
) -> Result<ManagerHandle, AcquireError> {
    let selection = SelectionKind::Manager;

    if !force && host.selection_owner(selection).is_some() {
        info!("a clipboard manager is already running");
        return Err(AcquireError::AlreadyManaged(
            selection.atom_name().to_string(),
        ));
    }

    let window = host.create_surrogate_window();
    let time = host.current_server_time();

    if let Err(e) = host.claim(selection, window, time) {
        error!(error = %e, selection = %selection, "unable to acquire selection");
        return Err(AcquireError::ClaimRejected(
            selection.atom_name().to_string(),
        ));
    }

    // The claim may have gone to a competitor between the owner check and
    // the claim itself; re-read to confirm it stuck.
    if host.selection_owner(selection) != Some(window) {
        debug!(selection = %selection, "another manager won the acquisition race");
        return Err(AcquireError::LostRace(selection.atom_name().to_string()));
    }

    if let Err(e) = host.announce_manager(selection, window) {
        error!(error = %e, "failed to send client event");
    }

    if let Some(filter) = filter {
        host.install_event_filter(window, filter);
    }

    info!(selection = %selection, window = %window, "acquired manager selection");
    Ok(ManagerHandle { window })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::InMemoryDisplay;
    use dh_core::SelectionKind;

    #[test]
    fn acquisition_claims_announces_and_confirms() {
        let display = InMemoryDisplay::new();

        let handle = acquire_manager_selection(&display, false, None).unwrap();

        assert_eq!(
            display.selection_owner(SelectionKind::Manager),
            Some(handle.window)
        );
        assert_eq!(
            display.announcements(),
            vec![(SelectionKind::Manager, handle.window)]
        );
    }

    #[test]
    fn existing_owner_aborts_before_any_side_effect() {
        let display = InMemoryDisplay::new();
        let rival = display.create_surrogate_window();
        display
            .claim(
                SelectionKind::Manager,
                rival,
                display.current_server_time(),
            )
            .unwrap();
        let windows_before = display.window_count();

        let err = acquire_manager_selection(&display, false, None).unwrap_err();

        assert!(matches!(err, AcquireError::AlreadyManaged(_)));
        assert_eq!(display.window_count(), windows_before);
        assert!(display.announcements().is_empty());
        assert_eq!(display.selection_owner(SelectionKind::Manager), Some(rival));
    }

    #[test]
    fn force_replaces_an_existing_owner() {
        let display = InMemoryDisplay::new();
        let rival = display.create_surrogate_window();
        display
            .claim(
                SelectionKind::Manager,
                rival,
                display.current_server_time(),
            )
            .unwrap();

        let handle = acquire_manager_selection(&display, true, None).unwrap();

        assert_eq!(
            display.selection_owner(SelectionKind::Manager),
            Some(handle.window)
        );
    }

    #[test]
    fn rejected_claim_is_fatal_and_unannounced() {
        let display = InMemoryDisplay::new();
        display.reject_next_claim();

        let err = acquire_manager_selection(&display, false, None).unwrap_err();

        assert!(matches!(err, AcquireError::ClaimRejected(_)));
        assert!(display.announcements().is_empty());
    }

    #[test]
    fn lost_race_aborts_without_announcement() {
        let display = InMemoryDisplay::new();
        let rival = display.create_surrogate_window();
        display.hijack_claims(rival);

        let err = acquire_manager_selection(&display, false, None).unwrap_err();

        assert!(matches!(err, AcquireError::LostRace(_)));
        assert!(display.announcements().is_empty());
    }

    #[test]
    fn installed_filter_sees_subsequent_traffic() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct CountingFilter(AtomicUsize);
        impl SelectionEventFilter for CountingFilter {
            fn handle(&self, _change: &dh_core::OwnerChange) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let display = InMemoryDisplay::new();
        let filter = Arc::new(CountingFilter(AtomicUsize::new(0)));

        acquire_manager_selection(&display, false, Some(filter.clone())).unwrap();
        display.client_copy_text(
            SelectionKind::Clipboard,
            dh_core::WindowId(0x42),
            "hello",
        );

        assert!(filter.0.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn failed_announcement_is_tolerated() {
        let display = InMemoryDisplay::new();
        display.fail_announcements();

        let handle = acquire_manager_selection(&display, false, None).unwrap();

        assert_eq!(
            display.selection_owner(SelectionKind::Manager),
            Some(handle.window)
        );
    }
}
