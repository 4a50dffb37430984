use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::config::ChannelEvent;

/// A namespaced key/value store with change notification.
///
/// Reads fall back to the caller's default on a missing key; failures to
/// read are treated the same way, so helpers never distinguish "unset"
/// from "unreadable".
#[async_trait]
pub trait ConfigChannel: Send + Sync {
    async fn get_bool(&self, key: &str, default: bool) -> bool;

    async fn get_int(&self, key: &str, default: i32) -> i32;

    /// Persist `value` under `key` and notify every subscriber, including
    /// subscribers in this process.
    async fn set_bool(&self, key: &str, value: bool) -> Result<()>;

    /// Register for `(key, new_value)` change notifications.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<ChannelEvent>;
}
