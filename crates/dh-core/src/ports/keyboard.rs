use crate::keyboard::{ExtensionInfo, RepeatControls};
use crate::DeviceError;

/// Device-control surface of the keyboard, reached through an explicit
/// handle rather than an ambient per-process connection.
pub trait KeyboardDevice: Send + Sync {
    /// Probe the keyboard extension. A failure disables the keyboard-sync
    /// subsystem for the whole session.
    fn query_extension(&self) -> Result<ExtensionInfo, DeviceError>;

    /// Toggle global key auto-repeat.
    fn set_auto_repeat(&self, enabled: bool) -> Result<(), DeviceError>;

    /// Current repeat-controls structure of the device.
    fn repeat_controls(&self) -> Result<RepeatControls, DeviceError>;

    /// Write back a repeat-controls structure.
    fn set_repeat_controls(&self, controls: RepeatControls) -> Result<(), DeviceError>;

    /// Set or clear the lock state of the numlock modifier.
    fn lock_numlock(&self, locked: bool) -> Result<(), DeviceError>;

    /// Current hardware numlock indicator state.
    fn numlock_indicator(&self) -> Result<bool, DeviceError>;
}
