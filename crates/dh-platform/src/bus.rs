use tokio::sync::mpsc;

use dh_core::{ChannelEvent, OwnerChange};

/// Everything the session runtime reacts to.
#[derive(Debug)]
pub enum SessionEvent {
    Owner(OwnerChange),
    Channel(ChannelEvent),
    PrimaryDebounceFired,
}

/// Control-plane commands for the runtime.
#[derive(Debug)]
pub enum SessionCommand {
    Shutdown,
}

pub type SessionEventSender = mpsc::UnboundedSender<SessionEvent>;
pub type SessionEventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

pub type SessionCommandSender = mpsc::Sender<SessionCommand>;
pub type SessionCommandReceiver = mpsc::Receiver<SessionCommand>;
