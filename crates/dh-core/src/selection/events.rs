use chrono::{DateTime, Utc};

use super::model::{SelectionKind, ServerTime, WindowId};

/// A "selection owner changed" notification.
///
/// `owner` is `None` when the selection was cleared (the previous owner
/// went away). `synthetic` mirrors the wire-level send-event flag: `true`
/// when another client fabricated the notification, in which case the
/// keeper ignores it entirely.
#[derive(Debug, Clone)]
pub struct OwnerChange {
    pub selection: SelectionKind,
    pub owner: Option<WindowId>,
    pub synthetic: bool,
    pub time: ServerTime,
    pub observed_at: DateTime<Utc>,
}

impl OwnerChange {
    pub fn organic(
        selection: SelectionKind,
        owner: Option<WindowId>,
        time: ServerTime,
    ) -> Self {
        Self {
            selection,
            owner,
            synthetic: false,
            time,
            observed_at: Utc::now(),
        }
    }
}
