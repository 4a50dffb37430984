use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use dh_core::ports::ConfigChannel;
use dh_core::{ChannelEvent, ChannelValue};

/// In-memory configuration channel for tests and headless sessions.
///
/// Same notification semantics as the file repository, without the disk.
#[derive(Default)]
pub struct InMemoryChannel {
    state: Mutex<HashMap<String, ChannelValue>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<ChannelEvent>>>,
}

impl InMemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value without notifying subscribers, as if it had been on
    /// disk before the daemon started.
    pub fn seed(&self, key: &str, value: ChannelValue) {
        self.state.lock().unwrap().insert(key.to_string(), value);
    }

    /// Overwrite a value and notify subscribers, as an external settings
    /// editor would.
    pub fn set_external(&self, key: &str, value: ChannelValue) {
        self.state.lock().unwrap().insert(key.to_string(), value);
        self.notify(ChannelEvent::new(key, value));
    }

    fn notify(&self, event: ChannelEvent) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[async_trait]
impl ConfigChannel for InMemoryChannel {
    async fn get_bool(&self, key: &str, default: bool) -> bool {
        self.state
            .lock()
            .unwrap()
            .get(key)
            .and_then(|value| value.as_bool())
            .unwrap_or(default)
    }

    async fn get_int(&self, key: &str, default: i32) -> i32 {
        self.state
            .lock()
            .unwrap()
            .get(key)
            .and_then(|value| value.as_int())
            .unwrap_or(default)
    }

    async fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .insert(key.to_string(), ChannelValue::Bool(value));
        self.notify(ChannelEvent::new(key, ChannelValue::Bool(value)));
        Ok(())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<ChannelEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }
}
