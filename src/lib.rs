//! # deskhelper
//!
//! Desktop-session helper daemon: keeps clipboard contents alive after the
//! owning application exits, and applies/persists the user's key-repeat
//! and numlock settings.
//!
//! The daemon is assembled from four ports: the selection host and
//! ownership-event source of a display connection, a keyboard device
//! handle, and a configuration channel. `dh-platform` ships an in-memory
//! display for tests and headless sessions; a production backend binds the
//! same ports against a real server connection.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use dh_core::ports::{ConfigChannel, KeyboardDevice, OwnershipEvents, SelectionHost};
use dh_core::selection::keeper::ClipboardKeeper;
use dh_core::AcquireError;
use dh_platform::bus::{SessionCommand, SessionCommandSender, SessionEvent};
use dh_platform::{acquire_manager_selection, KeyboardHelper, SessionRuntime};

pub use dh_core;
pub use dh_infra;
pub use dh_platform;

/// Install the process-wide tracing subscriber, honouring `RUST_LOG`.
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Which helpers actually came up.
///
/// A manager already running elsewhere disables the clipboard helper; a
/// missing keyboard extension disables the keyboard helper. Neither is
/// fatal to the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveHelpers {
    pub clipboard: bool,
    pub keyboard: bool,
}

/// Builder for assembling the session daemon.
pub struct DaemonBuilder {
    host: Option<Arc<dyn SelectionHost>>,
    events: Option<Arc<dyn OwnershipEvents>>,
    device: Option<Arc<dyn KeyboardDevice>>,
    channel: Option<Arc<dyn ConfigChannel>>,
    force_manager: bool,
}

impl Default for DaemonBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DaemonBuilder {
    pub fn new() -> Self {
        Self {
            host: None,
            events: None,
            device: None,
            channel: None,
            force_manager: false,
        }
    }

    pub fn with_selection_host(mut self, host: Arc<dyn SelectionHost>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn with_ownership_events(mut self, events: Arc<dyn OwnershipEvents>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_keyboard_device(mut self, device: Arc<dyn KeyboardDevice>) -> Self {
        self.device = Some(device);
        self
    }

    pub fn with_config_channel(mut self, channel: Arc<dyn ConfigChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Take the manager selection even if another owner holds it.
    pub fn force_manager_acquisition(mut self) -> Self {
        self.force_manager = true;
        self
    }

    pub fn build(self) -> Result<Daemon> {
        Ok(Daemon {
            host: self
                .host
                .ok_or_else(|| anyhow::anyhow!("SelectionHost is required"))?,
            events: self
                .events
                .ok_or_else(|| anyhow::anyhow!("OwnershipEvents is required"))?,
            device: self
                .device
                .ok_or_else(|| anyhow::anyhow!("KeyboardDevice is required"))?,
            channel: self
                .channel
                .ok_or_else(|| anyhow::anyhow!("ConfigChannel is required"))?,
            force_manager: self.force_manager,
        })
    }
}

/// The assembled, not-yet-started daemon.
pub struct Daemon {
    host: Arc<dyn SelectionHost>,
    events: Arc<dyn OwnershipEvents>,
    device: Arc<dyn KeyboardDevice>,
    channel: Arc<dyn ConfigChannel>,
    force_manager: bool,
}

impl Daemon {
    pub fn builder() -> DaemonBuilder {
        DaemonBuilder::new()
    }

    /// Bring the helpers up and spawn the session runtime.
    ///
    /// Subsystem failures are contained: an already-running manager or a
    /// lost acquisition race leaves the clipboard helper off, a missing
    /// keyboard extension leaves the keyboard helper off, and the daemon
    /// runs with whatever remains.
    pub async fn start(self) -> Result<RunningSession> {
        let clipboard = match acquire_manager_selection(self.host.as_ref(), self.force_manager, None)
        {
            Ok(_handle) => true,
            Err(AcquireError::ClaimRejected(selection)) => {
                warn!(selection = %selection, "unable to get the clipboard manager selection");
                false
            }
            Err(e) => {
                info!("{e}");
                false
            }
        };

        let keyboard = match KeyboardHelper::new(self.device.clone(), self.channel.clone()) {
            Ok(helper) => {
                let helper = Arc::new(helper);
                helper.apply_all().await;
                Some(helper)
            }
            Err(e) => {
                error!(error = %e, "failed to initialize the keyboard extension");
                None
            }
        };

        let helpers = ActiveHelpers {
            clipboard,
            keyboard: keyboard.is_some(),
        };

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::channel(8);

        if clipboard {
            let mut owner_rx = self.events.subscribe();
            let tx = event_tx.clone();
            tokio::spawn(async move {
                while let Some(change) = owner_rx.recv().await {
                    if tx.send(SessionEvent::Owner(change)).is_err() {
                        break;
                    }
                }
            });
        }

        let mut channel_rx = self.channel.subscribe();
        let tx = event_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = channel_rx.recv().await {
                if tx.send(SessionEvent::Channel(event)).is_err() {
                    break;
                }
            }
        });

        let keeper = ClipboardKeeper::new(self.host.clone());
        let runtime = SessionRuntime::new(keeper, keyboard, event_tx, event_rx, command_rx);
        let runtime = tokio::spawn(runtime.run());

        info!(
            clipboard = helpers.clipboard,
            keyboard = helpers.keyboard,
            "session daemon started"
        );

        Ok(RunningSession {
            helpers,
            commands: command_tx,
            runtime,
        })
    }
}

/// Handle to a started daemon.
pub struct RunningSession {
    pub helpers: ActiveHelpers,
    commands: SessionCommandSender,
    runtime: JoinHandle<()>,
}

impl RunningSession {
    /// Shut the session down: the numlock state is saved, the caches are
    /// dropped, and the runtime exits.
    pub async fn stop(self) {
        let _ = self.commands.send(SessionCommand::Shutdown).await;
        let _ = self.runtime.await;
    }
}
