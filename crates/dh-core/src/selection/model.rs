use std::fmt;

use serde::{Deserialize, Serialize};

/// A named, system-wide selection slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectionKind {
    /// The default clipboard (explicit copy/paste).
    Clipboard,
    /// The primary selection (mouse selection, middle-click paste).
    Primary,
    /// The singleton manager selection announcing persistence-service
    /// availability.
    Manager,
}

impl SelectionKind {
    pub fn atom_name(&self) -> &'static str {
        match self {
            SelectionKind::Clipboard => "CLIPBOARD",
            SelectionKind::Primary => "PRIMARY",
            SelectionKind::Manager => "CLIPBOARD_MANAGER",
        }
    }
}

impl fmt::Display for SelectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.atom_name())
    }
}

/// A data-format identifier (an interned atom name such as `UTF8_STRING`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetName(String);

/// Meta targets a store operation never caches. They describe the transfer
/// protocol itself, not owner data.
pub const META_TARGETS: [&str; 6] = [
    "TARGETS",
    "MULTIPLE",
    "DELETE",
    "INSERT_PROPERTY",
    "INSERT_SELECTION",
    "PIXMAP",
];

/// The plain-text target used when republishing primary-selection text.
pub const TEXT_TARGET: &str = "UTF8_STRING";

impl TargetName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_meta(&self) -> bool {
        META_TARGETS.contains(&self.0.as_str())
    }
}

impl From<&str> for TargetName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl fmt::Display for TargetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A window handle; selection owners are identified by their window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowId(pub u32);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// A display-server timestamp, monotonically increasing per connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServerTime(pub u64);

/// Pointer modifier state sampled when the primary debounce fires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerState {
    pub button1_held: bool,
    pub shift_held: bool,
}

impl PointerState {
    /// A held primary button or shift modifier means a text selection is
    /// likely still being dragged out.
    pub fn selection_in_progress(&self) -> bool {
        self.button1_held || self.shift_held
    }
}
