//! Session runtime
//!
//! A single-threaded, notification-driven loop multiplexing ownership
//! notifications, configuration changes, debounce firings and control
//! commands over one event channel. The helpers themselves stay
//! synchronous; the runtime owns the one timed deferral (the primary
//! debounce) and re-arms or aborts it as the keeper instructs.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use dh_core::selection::keeper::{ClipboardKeeper, DebounceCommand, DebounceVerdict};
use dh_core::PRIMARY_DEBOUNCE;

use crate::bus::{SessionCommand, SessionCommandReceiver, SessionEvent, SessionEventSender};
use crate::keyboard::KeyboardHelper;

pub struct SessionRuntime {
    keeper: ClipboardKeeper,
    keyboard: Option<Arc<KeyboardHelper>>,
    event_tx: SessionEventSender,
    event_rx: mpsc::UnboundedReceiver<SessionEvent>,
    command_rx: SessionCommandReceiver,
    debounce: Option<JoinHandle<()>>,
    shutting_down: bool,
}

impl SessionRuntime {
    pub fn new(
        keeper: ClipboardKeeper,
        keyboard: Option<Arc<KeyboardHelper>>,
        event_tx: SessionEventSender,
        event_rx: mpsc::UnboundedReceiver<SessionEvent>,
        command_rx: SessionCommandReceiver,
    ) -> Self {
        Self {
            keeper,
            keyboard,
            event_tx,
            event_rx,
            command_rx,
            debounce: None,
            shutting_down: false,
        }
    }

    pub async fn run(mut self) {
        info!("session runtime started");
        while !self.shutting_down {
            tokio::select! {
                Some(event) = self.event_rx.recv() => {
                    self.handle_event(event).await;
                }
                command = self.command_rx.recv() => {
                    // A dropped command sender shuts the session down too.
                    match command {
                        Some(SessionCommand::Shutdown) | None => self.shutdown().await,
                    }
                }
            }
        }
        info!("session runtime stopped");
    }

    async fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Owner(change) => match self.keeper.handle_owner_change(&change) {
                Some(DebounceCommand::Schedule) => self.arm_debounce(),
                Some(DebounceCommand::Cancel) => self.cancel_debounce(),
                None => {}
            },
            SessionEvent::Channel(event) => {
                if let Some(keyboard) = &self.keyboard {
                    keyboard.handle_channel_event(&event).await;
                }
            }
            SessionEvent::PrimaryDebounceFired => {
                self.debounce = None;
                match self.keeper.primary_store_tick() {
                    DebounceVerdict::Reschedule => self.arm_debounce(),
                    DebounceVerdict::Complete | DebounceVerdict::Cancel => {}
                }
            }
        }
    }

    fn arm_debounce(&mut self) {
        let tx = self.event_tx.clone();
        self.debounce = Some(tokio::spawn(async move {
            tokio::time::sleep(PRIMARY_DEBOUNCE).await;
            let _ = tx.send(SessionEvent::PrimaryDebounceFired);
        }));
    }

    fn cancel_debounce(&mut self) {
        if let Some(handle) = self.debounce.take() {
            debug!("cancelled pending primary store");
            handle.abort();
        }
    }

    async fn shutdown(&mut self) {
        self.cancel_debounce();
        if let Some(keyboard) = &self.keyboard {
            keyboard.save_numlock().await;
        }
        self.keeper.clear();
        self.shutting_down = true;
    }
}
