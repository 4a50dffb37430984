use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::selection::{OwnerChange, PointerState, SelectionKind, ServerTime, TargetName, WindowId};
use crate::SelectionError;

/// Supplies content on demand when another client requests data from a
/// selection this process owns.
pub trait ContentProvider: Send + Sync {
    /// Bytes for `target`, or `None` when the target is not offered.
    fn supply(&self, target: &TargetName) -> Option<Bytes>;
}

/// Receives further protocol traffic addressed to an owner window.
pub trait SelectionEventFilter: Send + Sync {
    fn handle(&self, change: &OwnerChange);
}

/// The windowing system's per-display selection registry, as consumed by
/// the helpers.
///
/// All calls are synchronous and blocking from the caller's perspective;
/// there is no parallelism behind them.
pub trait SelectionHost: Send + Sync {
    fn current_server_time(&self) -> ServerTime;

    /// Current owner of `selection`, or `None` when it is unowned.
    fn selection_owner(&self, selection: SelectionKind) -> Option<WindowId>;

    /// Data formats the current owner advertises. Empty when the selection
    /// is unowned or enumeration fails.
    fn list_targets(&self, selection: SelectionKind) -> Vec<TargetName>;

    /// Content for `(selection, target)`, or `None` when the owner supplies
    /// nothing for that target.
    fn fetch(&self, selection: SelectionKind, target: &TargetName) -> Option<Bytes>;

    /// Text content of `selection`, or `None` when no text is available.
    fn fetch_text(&self, selection: SelectionKind) -> Option<String>;

    /// Create a hidden, otherwise-unused window to serve as a synthetic
    /// owner surface.
    fn create_surrogate_window(&self) -> WindowId;

    /// Claim ownership of `selection` for `window` at `time`.
    fn claim(
        &self,
        selection: SelectionKind,
        window: WindowId,
        time: ServerTime,
    ) -> Result<(), SelectionError>;

    /// Become owner of `selection`, advertising exactly `targets` and
    /// serving content through `provider`.
    fn publish(
        &self,
        selection: SelectionKind,
        targets: Vec<TargetName>,
        provider: Arc<dyn ContentProvider>,
    );

    /// Become owner of `selection` with a single plain-text target.
    fn publish_text(&self, selection: SelectionKind, text: &str);

    /// Broadcast the root-window manager announcement naming the claimed
    /// selection and its owner window.
    fn announce_manager(
        &self,
        selection: SelectionKind,
        window: WindowId,
    ) -> Result<(), SelectionError>;

    /// Route further protocol traffic for `window` to `filter`.
    fn install_event_filter(&self, window: WindowId, filter: Arc<dyn SelectionEventFilter>);

    /// Pointer button/modifier state at the time of the call.
    fn pointer_state(&self) -> PointerState;
}

/// Source of "selection owner changed" notifications.
///
/// A single registration point: each subscriber receives every subsequent
/// notification on its own receiver.
pub trait OwnershipEvents: Send + Sync {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<OwnerChange>;
}
