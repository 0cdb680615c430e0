//! 已选面试官偏好的存储端口。
//!
//! 控制器只依赖 [`SelectionStore`]，具体落盘方式由调用方注入。

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dirs_compat::app_data_dir;

const TARGET: &str = "selection_store";
const SELECTION_FILENAME: &str = "selection.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewerSelection {
    pub interviewer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl InterviewerSelection {
    pub fn new<S: Into<String>>(interviewer_id: S) -> Self {
        Self {
            interviewer_id: interviewer_id.into(),
            display_name: None,
        }
    }

    pub fn with_display_name<S: Into<String>>(mut self, display_name: S) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

#[async_trait]
pub trait SelectionStore: Send + Sync {
    async fn load(&self) -> Result<Option<InterviewerSelection>>;
    async fn save(&self, selection: &InterviewerSelection) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemorySelectionStore {
    selection: Mutex<Option<InterviewerSelection>>,
}

impl MemorySelectionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SelectionStore for MemorySelectionStore {
    async fn load(&self) -> Result<Option<InterviewerSelection>> {
        let guard = self
            .selection
            .lock()
            .map_err(|_| anyhow!("selection lock poisoned"))?;
        Ok(guard.clone())
    }

    async fn save(&self, selection: &InterviewerSelection) -> Result<()> {
        let mut guard = self
            .selection
            .lock()
            .map_err(|_| anyhow!("selection lock poisoned"))?;
        *guard = Some(selection.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut guard = self
            .selection
            .lock()
            .map_err(|_| anyhow!("selection lock poisoned"))?;
        *guard = None;
        Ok(())
    }
}

/// 以 JSON 文件保存选择结果；写入先落临时文件再重命名。
#[derive(Debug, Clone)]
pub struct FileSelectionStore {
    path: PathBuf,
}

impl FileSelectionStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// 使用平台数据目录下的默认路径。
    pub fn with_default_path() -> Result<Self> {
        let dir = app_data_dir().ok_or_else(|| anyhow!("failed to determine data directory"))?;
        Ok(Self::new(dir.join(SELECTION_FILENAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SelectionStore for FileSelectionStore {
    async fn load(&self) -> Result<Option<InterviewerSelection>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read selection file: {}", self.path.display())
                })
            }
        };

        match serde_json::from_str(&contents) {
            Ok(selection) => Ok(Some(selection)),
            Err(err) => {
                warn!(
                    target: TARGET,
                    %err,
                    path = %self.path.display(),
                    "ignoring corrupt selection file"
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, selection: &InterviewerSelection) -> Result<()> {
        let path = self.path.clone();
        let payload =
            serde_json::to_vec_pretty(selection).context("failed to encode interviewer selection")?;

        tokio::task::spawn_blocking(move || write_atomically(&path, &payload))
            .await
            .context("selection write task failed")??;

        info!(
            target: TARGET,
            interviewer_id = %selection.interviewer_id,
            "interviewer selection saved"
        );
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| {
                format!("failed to remove selection file: {}", self.path.display())
            }),
        }
    }
}

fn write_atomically(path: &Path, payload: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!("failed to create selection directory: {}", parent.display())
        })?;
    }

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, payload)
        .with_context(|| format!("failed to write selection file: {}", temp_path.display()))?;
    fs::rename(&temp_path, path)
        .with_context(|| format!("failed to finalize selection file: {}", path.display()))?;
    Ok(())
}
