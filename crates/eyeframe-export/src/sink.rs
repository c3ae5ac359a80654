use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use eyeframe_types::Result;
use tokio::{fs, sync::Mutex};
use tracing::info;

use crate::export_error;

/// Delivers a named payload to the user.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn deliver(&self, file_name: &str, payload: &[u8]) -> Result<()>;
}

/// Writes each delivered payload into a download directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl DeliverySink for DirectorySink {
    async fn deliver(&self, file_name: &str, payload: &[u8]) -> Result<()> {
        if Path::new(file_name).file_name().and_then(|n| n.to_str()) != Some(file_name) {
            return Err(export_error(format!("refusing to deliver '{file_name}'")));
        }
        fs::create_dir_all(&self.dir).await.map_err(|err| {
            export_error(format!("failed to create {}: {err}", self.dir.display()))
        })?;
        let path = self.dir.join(file_name);
        fs::write(&path, payload)
            .await
            .map_err(|err| export_error(format!("failed to write {}: {err}", path.display())))?;
        info!("Delivered {} ({} bytes)", path.display(), payload.len());
        Ok(())
    }
}

/// Keeps delivered payloads in memory, in delivery order.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    files: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn files(&self) -> Vec<(String, Vec<u8>)> {
        self.files.lock().await.clone()
    }
}

#[async_trait]
impl DeliverySink for MemorySink {
    async fn deliver(&self, file_name: &str, payload: &[u8]) -> Result<()> {
        self.files
            .lock()
            .await
            .push((file_name.to_string(), payload.to_vec()));
        Ok(())
    }
}
