//! Configuration channel model: the keys the helpers consume, their
//! defaults, and the change-notification event delivered to subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Channel keys consumed by the keyboard helper.
pub mod keys {
    pub const KEY_REPEAT: &str = "/Default/KeyRepeat";
    pub const KEY_REPEAT_DELAY: &str = "/Default/KeyRepeat/Delay";
    pub const KEY_REPEAT_RATE: &str = "/Default/KeyRepeat/Rate";
    pub const NUMLOCK: &str = "/Default/Numlock";
}

/// Defaults applied when a key is absent from the channel store.
pub mod defaults {
    pub const KEY_REPEAT: bool = true;
    pub const KEY_REPEAT_DELAY: i32 = 500;
    pub const KEY_REPEAT_RATE: i32 = 20;
    pub const NUMLOCK: bool = false;
}

/// A typed channel value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelValue {
    Bool(bool),
    Int(i32),
}

impl ChannelValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ChannelValue::Bool(v) => Some(*v),
            ChannelValue::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            ChannelValue::Int(v) => Some(*v),
            ChannelValue::Bool(_) => None,
        }
    }
}

/// A `(key, new_value)` change notification from the configuration channel.
#[derive(Debug, Clone)]
pub struct ChannelEvent {
    pub key: String,
    pub value: ChannelValue,
    pub observed_at: DateTime<Utc>,
}

impl ChannelEvent {
    pub fn new(key: impl Into<String>, value: ChannelValue) -> Self {
        Self {
            key: key.into(),
            value,
            observed_at: Utc::now(),
        }
    }
}
