use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::hall::HallLayout;

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("object store fetch failed: {0}")]
    Store(#[source] anyhow::Error),

    #[error("hall {hall_id} has no layout object")]
    NotFound { hall_id: String },

    #[error("layout json malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Minimal view of the bucket that holds venue layouts. The production
/// implementation is an S3-compatible client configured by the `MINIO_*`
/// settings; [`FsObjectStore`] serves development and tests.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> anyhow::Result<Vec<u8>>;

    /// Keys under `prefix`, in stable order.
    async fn list(&self, prefix: &str) -> anyhow::Result<Vec<String>>;
}

/// Loads and parses `HallLayout` documents from an object store.
pub struct HallLayoutStore {
    store: Arc<dyn ObjectStore>,
}

impl HallLayoutStore {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Fetches the layout for `hall_id`.
    ///
    /// Looks for the canonical `halls/{hall_id}/layout.json` first; if that
    /// object is missing, lists the hall prefix and takes the first `*.json`
    /// entry.
    #[instrument(skip(self), level = "debug")]
    pub async fn get_hall_layout(&self, hall_id: &str) -> Result<HallLayout, LayoutError> {
        let canonical = format!("halls/{hall_id}/layout.json");

        let bytes = match self.store.get(&canonical).await {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!(key = %canonical, %err, "canonical layout object missing; listing hall prefix");
                let prefix = format!("halls/{hall_id}/");
                let entries = self.store.list(&prefix).await.map_err(LayoutError::Store)?;

                let Some(key) = entries.iter().find(|k| k.ends_with(".json")) else {
                    return Err(LayoutError::NotFound {
                        hall_id: hall_id.to_string(),
                    });
                };
                self.store.get(key).await.map_err(LayoutError::Store)?
            }
        };

        let layout: HallLayout = serde_json::from_slice(&bytes)?;
        info!(
            hall_id,
            sections = layout.sections.len(),
            "hall layout loaded"
        );
        Ok(layout)
    }
}

/// Directory tree standing in for the bucket: object keys map to paths
/// under `root`.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn get(&self, key: &str) -> anyhow::Result<Vec<u8>> {
        Ok(tokio::fs::read(self.root.join(key)).await?)
    }

    async fn list(&self, prefix: &str) -> anyhow::Result<Vec<String>> {
        let dir = self.root.join(prefix);
        let mut entries = tokio::fs::read_dir(&dir).await?;

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                keys.push(format!("{prefix}{}", entry.file_name().to_string_lossy()));
            }
        }
        keys.sort();
        Ok(keys)
    }
}
