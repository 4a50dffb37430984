//! Keyboard helper
//!
//! Applies the three keyboard-behavior configuration values to the device
//! and mirrors the numlock hardware state back into configuration at
//! shutdown. Every device-protocol failure is logged and tolerated; only a
//! missing keyboard extension disables the subsystem, for the whole
//! session.

use std::sync::Arc;

use tracing::{debug, error, warn};

use dh_core::config::{defaults, keys};
use dh_core::ports::{ConfigChannel, KeyboardDevice};
use dh_core::{repeat_interval_ms, ChannelEvent, DeviceError};

pub struct KeyboardHelper {
    device: Arc<dyn KeyboardDevice>,
    channel: Arc<dyn ConfigChannel>,
}

impl KeyboardHelper {
    /// Probe the keyboard extension and build the helper. A probe failure
    /// means no keyboard sync this session; the caller logs and drops.
    pub fn new(
        device: Arc<dyn KeyboardDevice>,
        channel: Arc<dyn ConfigChannel>,
    ) -> Result<Self, DeviceError> {
        let version = device.query_extension()?;
        debug!(
            major = version.major,
            minor = version.minor,
            "initialized keyboard extension"
        );
        Ok(Self { device, channel })
    }

    /// The startup sequence: apply both repeat settings, then restore the
    /// numlock state the previous session left behind.
    pub async fn apply_all(&self) {
        self.apply_repeat_mode().await;
        self.apply_repeat_rate().await;
        self.restore_numlock().await;
    }

    pub async fn apply_repeat_mode(&self) {
        let repeat = self
            .channel
            .get_bool(keys::KEY_REPEAT, defaults::KEY_REPEAT)
            .await;

        if let Err(e) = self.device.set_auto_repeat(repeat) {
            error!(error = %e, "failed to change keyboard repeat mode");
            return;
        }
        debug!(enabled = repeat, "set auto repeat");
    }

    pub async fn apply_repeat_rate(&self) {
        let delay = self
            .channel
            .get_int(keys::KEY_REPEAT_DELAY, defaults::KEY_REPEAT_DELAY)
            .await;
        let rate = self
            .channel
            .get_int(keys::KEY_REPEAT_RATE, defaults::KEY_REPEAT_RATE)
            .await;

        // Read-modify-write: only the two repeat fields change, the rest
        // of the control structure goes back untouched.
        let result = self.device.repeat_controls().and_then(|mut controls| {
            controls.delay = delay;
            controls.interval = repeat_interval_ms(rate);
            self.device.set_repeat_controls(controls)
        });

        match result {
            Ok(()) => debug!(delay, rate, "set key repeat"),
            Err(e) => error!(error = %e, "failed to change the keyboard repeat"),
        }
    }

    pub async fn restore_numlock(&self) {
        let locked = self.channel.get_bool(keys::NUMLOCK, defaults::NUMLOCK).await;

        if let Err(e) = self.device.lock_numlock(locked) {
            error!(error = %e, "failed to restore numlock state");
            return;
        }
        debug!(enabled = locked, "set numlock");
    }

    /// Mirror the hardware numlock indicator into configuration so the
    /// next session starts where the user left off.
    pub async fn save_numlock(&self) {
        let locked = match self.device.numlock_indicator() {
            Ok(locked) => locked,
            Err(e) => {
                warn!(error = %e, "failed to query numlock indicator");
                return;
            }
        };

        if let Err(e) = self.channel.set_bool(keys::NUMLOCK, locked).await {
            warn!(error = %e, "failed to save numlock state");
        }
    }

    /// Re-run only the apply step the changed key corresponds to.
    pub async fn handle_channel_event(&self, event: &ChannelEvent) {
        match event.key.as_str() {
            keys::KEY_REPEAT => self.apply_repeat_mode().await,
            keys::KEY_REPEAT_DELAY | keys::KEY_REPEAT_RATE => self.apply_repeat_rate().await,
            _ => {}
        }
    }
}
