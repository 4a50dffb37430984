//! Keyboard-sync domain: the repeat-controls structure and the rate
//! conversion applied before writing it back to the device.

/// Keyboard extension version reported by the device at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionInfo {
    pub major: i32,
    pub minor: i32,
}

/// The two repeat fields of the device control structure. Fetched, patched
/// and written back as a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatControls {
    /// Delay before the first repeat, in milliseconds.
    pub delay: i32,
    /// Interval between repeats, in milliseconds.
    pub interval: i32,
}

/// Convert a repeat rate in Hz to an interval in milliseconds.
///
/// Integer truncation is deliberate and must be preserved exactly for
/// compatibility with existing device state.
pub fn repeat_interval_ms(rate: i32) -> i32 {
    if rate != 0 {
        1000 / rate
    } else {
        0
    }
}
