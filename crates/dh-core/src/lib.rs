//! # dh-core
//!
//! Core domain models and session-helper logic for deskhelper.
//!
//! This crate contains the pure reactive logic of the two session helpers
//! (clipboard persistence, keyboard settings sync) without any display or
//! storage dependencies. Infrastructure binds at the port traits in
//! [`ports`].

// Public module exports
pub mod config;
pub mod error;
pub mod keyboard;
pub mod ports;
pub mod selection;

// Re-export commonly used types at the crate root
pub use config::{keys, ChannelEvent, ChannelValue};
pub use error::{AcquireError, DeviceError, SelectionError};
pub use keyboard::{repeat_interval_ms, ExtensionInfo, RepeatControls};
pub use selection::{
    ClipboardKeeper, DebounceCommand, DebounceVerdict, OwnerChange, PointerState, SelectionKind,
    SelectionSnapshot, ServerTime, TargetName, WindowId, PRIMARY_DEBOUNCE,
};
