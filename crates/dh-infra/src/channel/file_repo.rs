use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

use dh_core::ports::ConfigChannel;
use dh_core::{ChannelEvent, ChannelValue};

/// File-backed configuration channel.
///
/// The store is a flat JSON object mapping channel keys to values. A
/// missing file means "all defaults"; keys this process never touches are
/// preserved across rewrites. Writes go through a temp-file-then-rename so
/// the store is always either the previous or the fully written contents.
pub struct FileChannelRepository {
    path: PathBuf,
    state: RwLock<HashMap<String, ChannelValue>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<ChannelEvent>>>,
}

impl FileChannelRepository {
    /// Open the channel store at `path`, reading it if it exists.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = match fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("parse channel store failed: {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("read channel store failed: {}", path.display()))
            }
        };

        Ok(Self {
            path,
            state: RwLock::new(state),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    /// Default per-user location of the channel store.
    pub fn default_store_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("deskhelper").join("channel.json"))
    }

    fn dir(&self) -> Option<&Path> {
        self.path.parent()
    }

    async fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(dir) = self.dir() {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("create channel store dir failed: {}", dir.display()))?;
        }
        Ok(())
    }

    async fn atomic_write(&self, content: &str) -> Result<()> {
        self.ensure_parent_dir().await?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content)
            .await
            .with_context(|| format!("write temp channel store failed: {}", tmp_path.display()))?;

        fs::rename(&tmp_path, &self.path).await.with_context(|| {
            format!(
                "rename temp channel store to target failed: {} -> {}",
                tmp_path.display(),
                self.path.display()
            )
        })?;

        Ok(())
    }

    fn notify(&self, event: ChannelEvent) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[async_trait]
impl ConfigChannel for FileChannelRepository {
    async fn get_bool(&self, key: &str, default: bool) -> bool {
        self.state
            .read()
            .await
            .get(key)
            .and_then(|value| value.as_bool())
            .unwrap_or(default)
    }

    async fn get_int(&self, key: &str, default: i32) -> i32 {
        self.state
            .read()
            .await
            .get(key)
            .and_then(|value| value.as_int())
            .unwrap_or(default)
    }

    async fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        let content = {
            let mut state = self.state.write().await;
            state.insert(key.to_string(), ChannelValue::Bool(value));
            serde_json::to_string_pretty(&*state).context("serialize channel store failed")?
        };

        self.atomic_write(&content).await?;
        debug!(key, value, "persisted channel value");

        self.notify(ChannelEvent::new(key, ChannelValue::Bool(value)));
        Ok(())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<ChannelEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }
}
