use std::sync::Mutex;

use dh_core::ports::KeyboardDevice;
use dh_core::{DeviceError, ExtensionInfo, RepeatControls};

struct KeyboardState {
    extension_available: bool,
    protocol_failures: bool,
    auto_repeat: bool,
    controls: RepeatControls,
    numlock_locked: bool,
    auto_repeat_writes: u32,
    controls_writes: u32,
}

impl Default for KeyboardState {
    fn default() -> Self {
        Self {
            extension_available: true,
            protocol_failures: false,
            auto_repeat: true,
            // Stock server defaults before any helper touches the device.
            controls: RepeatControls {
                delay: 660,
                interval: 40,
            },
            numlock_locked: false,
            auto_repeat_writes: 0,
            controls_writes: 0,
        }
    }
}

/// In-memory keyboard device with injectable failures.
#[derive(Default)]
pub struct InMemoryKeyboard {
    state: Mutex<KeyboardState>,
}

impl InMemoryKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `query_extension` fail, as on a server without the keyboard
    /// extension.
    pub fn disable_extension(&self) {
        self.state.lock().unwrap().extension_available = false;
    }

    /// Make every device-control call fail.
    pub fn fail_protocol_calls(&self) {
        self.state.lock().unwrap().protocol_failures = true;
    }

    /// Flip the hardware numlock state, as the user hitting the key would.
    pub fn set_numlock_locked(&self, locked: bool) {
        self.state.lock().unwrap().numlock_locked = locked;
    }

    pub fn auto_repeat(&self) -> bool {
        self.state.lock().unwrap().auto_repeat
    }

    pub fn controls(&self) -> RepeatControls {
        self.state.lock().unwrap().controls
    }

    pub fn numlock_locked(&self) -> bool {
        self.state.lock().unwrap().numlock_locked
    }

    pub fn auto_repeat_writes(&self) -> u32 {
        self.state.lock().unwrap().auto_repeat_writes
    }

    pub fn controls_writes(&self) -> u32 {
        self.state.lock().unwrap().controls_writes
    }

    fn guard_protocol(&self) -> Result<(), DeviceError> {
        if self.state.lock().unwrap().protocol_failures {
            Err(DeviceError::Protocol("injected device failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl KeyboardDevice for InMemoryKeyboard {
    fn query_extension(&self) -> Result<ExtensionInfo, DeviceError> {
        if self.state.lock().unwrap().extension_available {
            Ok(ExtensionInfo { major: 1, minor: 0 })
        } else {
            Err(DeviceError::ExtensionUnavailable)
        }
    }

    fn set_auto_repeat(&self, enabled: bool) -> Result<(), DeviceError> {
        self.guard_protocol()?;
        let mut state = self.state.lock().unwrap();
        state.auto_repeat = enabled;
        state.auto_repeat_writes += 1;
        Ok(())
    }

    fn repeat_controls(&self) -> Result<RepeatControls, DeviceError> {
        self.guard_protocol()?;
        Ok(self.state.lock().unwrap().controls)
    }

    fn set_repeat_controls(&self, controls: RepeatControls) -> Result<(), DeviceError> {
        self.guard_protocol()?;
        let mut state = self.state.lock().unwrap();
        state.controls = controls;
        state.controls_writes += 1;
        Ok(())
    }

    fn lock_numlock(&self, locked: bool) -> Result<(), DeviceError> {
        self.guard_protocol()?;
        self.state.lock().unwrap().numlock_locked = locked;
        Ok(())
    }

    fn numlock_indicator(&self) -> Result<bool, DeviceError> {
        self.guard_protocol()?;
        Ok(self.state.lock().unwrap().numlock_locked)
    }
}
