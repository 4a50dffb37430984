//! Selection domain: named selections, owner-change events, the cached
//! snapshot, and the keeper that reacts to ownership transitions.

pub mod events;
pub mod keeper;
pub mod model;
pub mod snapshot;

pub use events::OwnerChange;
pub use keeper::{ClipboardKeeper, DebounceCommand, DebounceVerdict, PRIMARY_DEBOUNCE};
pub use model::{PointerState, SelectionKind, ServerTime, TargetName, WindowId, TEXT_TARGET};
pub use snapshot::{SelectionSnapshot, SnapshotProvider};
