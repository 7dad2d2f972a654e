//! JsonFileTaskStore - JSON ファイルに永続化する TaskStore
//!
//! 別プロセス（CLI の `status` / `cancel`）からも同じ状態が見えるように、
//! `load` と `update` は毎回ファイルを読み直します。
//!
//! # 排他
//! - プロセス内: Mutex
//! - プロセス間: 隣に置くロックファイル（`task.json.lock`、create_new で取得）
//! - ロックを取らずに書く相手: 書き込み直前に読み直し、変わっていたら判定からやり直す
//! - 書き込みは「一時ファイルに書いて rename」（同一ホスト前提）
//! - `subscribe` が通知するのはこのプロセスで書いた変更のみ

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tokio::sync::{Mutex, watch};

use crate::domain::TaskState;
use crate::ports::{StateTransition, StoreError, TaskStore};

const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(10);
const LOCK_TIMEOUT: Duration = Duration::from_secs(5);
/// A lock file older than this was left by a dead process.
const LOCK_STALE_AFTER: Duration = Duration::from_secs(30);
/// Re-evaluations allowed when the file keeps changing under `update`.
const MAX_UPDATE_ROUNDS: usize = 5;

pub struct JsonFileTaskStore {
    path: PathBuf,
    lock_path: PathBuf,
    lock: Mutex<()>,
    tx: watch::Sender<TaskState>,
}

impl JsonFileTaskStore {
    /// Open (or lazily create) the state file. A missing file reads as `idle`.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let state = read_state(&path).await?;
        let (tx, _rx) = watch::channel(state);
        Ok(Self {
            lock_path: sibling(&path, ".lock"),
            path,
            lock: Mutex::new(()),
            tx,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TaskStore for JsonFileTaskStore {
    async fn load(&self) -> Result<TaskState, StoreError> {
        let _guard = self.lock.lock().await;
        read_state(&self.path).await
    }

    async fn update(&self, transition: StateTransition) -> Result<Option<TaskState>, StoreError> {
        let _guard = self.lock.lock().await;
        let _file_lock = LockFile::acquire(&self.lock_path).await?;

        let mut current = read_state(&self.path).await?;
        for _ in 0..MAX_UPDATE_ROUNDS {
            let Some(next) = transition(&current) else {
                return Ok(None);
            };
            let latest = read_state(&self.path).await?;
            if latest != current {
                tracing::debug!(path = %self.path.display(), "task state changed during update, re-evaluating");
                current = latest;
                continue;
            }
            write_state(&self.path, &next).await?;
            self.tx.send_replace(next.clone());
            return Ok(Some(next));
        }
        Err(StoreError::Io(format!(
            "{} kept changing during update",
            self.path.display()
        )))
    }

    fn subscribe(&self) -> watch::Receiver<TaskState> {
        self.tx.subscribe()
    }
}

/// Cross-process lock held for one read-modify-write. Removed on drop.
struct LockFile {
    path: PathBuf,
}

impl LockFile {
    async fn acquire(path: &Path) -> Result<Self, StoreError> {
        create_parent(path).await?;
        let deadline = tokio::time::Instant::now() + LOCK_TIMEOUT;
        loop {
            let created = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)
                .await;
            match created {
                Ok(_) => {
                    return Ok(Self {
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if lock_is_stale(path).await {
                        tracing::warn!(path = %path.display(), "removing stale task state lock");
                        let _ = tokio::fs::remove_file(path).await;
                        continue;
                    }
                    if tokio::time::Instant::now() >= deadline {
                        return Err(StoreError::Io(format!(
                            "timed out waiting for lock {}",
                            path.display()
                        )));
                    }
                    tokio::time::sleep(LOCK_RETRY_INTERVAL).await;
                }
                Err(e) => {
                    return Err(StoreError::Io(format!("lock {}: {e}", path.display())));
                }
            }
        }
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

async fn lock_is_stale(path: &Path) -> bool {
    let Ok(meta) = tokio::fs::metadata(path).await else {
        return false;
    };
    meta.modified()
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > LOCK_STALE_AFTER)
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

async fn create_parent(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::Io(format!("create {}: {e}", parent.display())))?;
    }
    Ok(())
}

async fn read_state(path: &Path) -> Result<TaskState, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Corrupt(format!("{}: {e}", path.display()))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(TaskState::Idle),
        Err(e) => Err(StoreError::Io(format!("read {}: {e}", path.display()))),
    }
}

async fn write_state(path: &Path, state: &TaskState) -> Result<(), StoreError> {
    create_parent(path).await?;
    let bytes = serde_json::to_vec_pretty(state)
        .map_err(|e| StoreError::Io(format!("encode task state: {e}")))?;

    let tmp = sibling(path, ".tmp");
    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| StoreError::Io(format!("write {}: {e}", tmp.display())))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| StoreError::Io(format!("rename to {}: {e}", path.display())))
}
