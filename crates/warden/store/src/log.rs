//! Append-only line logs backing the cache and the ledger

use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Durable, newline-terminated, append-only text log
#[async_trait]
pub trait LineLog: Send + Sync {
    /// Append one line. Returns once the line is persisted.
    async fn append(&self, line: &str) -> StoreResult<()>;

    /// Read every non-empty line in append order.
    async fn read_lines(&self) -> StoreResult<Vec<String>>;

    /// Human-readable location, used in logs and errors.
    fn location(&self) -> String;
}

/// File-based log with append-only writes
pub struct FileLineLog {
    path: PathBuf,
}

impl FileLineLog {
    /// Open a log at `path`, creating parent directories if needed.
    ///
    /// The file itself is created on first append.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::io(parent.display().to_string(), e))?;
            }
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LineLog for FileLineLog {
    async fn append(&self, line: &str) -> StoreResult<()> {
        let location = self.location();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| StoreError::io(&location, e))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| StoreError::io(&location, e))?;
        file.write_all(b"\n")
            .await
            .map_err(|e| StoreError::io(&location, e))?;
        file.flush().await.map_err(|e| StoreError::io(&location, e))?;

        Ok(())
    }

    async fn read_lines(&self) -> StoreResult<Vec<String>> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let location = self.location();
        let file = File::open(&self.path)
            .await
            .map_err(|e| StoreError::io(&location, e))?;
        let mut lines = BufReader::new(file).lines();
        let mut out = Vec::new();

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| StoreError::io(&location, e))?
        {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
        }

        Ok(out)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory log for development and testing.
///
/// Can be switched unavailable to exercise the storage-failure paths.
#[derive(Default)]
pub struct MemoryLineLog {
    name: String,
    lines: RwLock<Vec<String>>,
    unavailable: AtomicBool,
}

impl MemoryLineLog {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lines: RwLock::new(Vec::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Pre-populate the log, as if written by an earlier run.
    pub fn with_lines<I, S>(name: impl Into<String>, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let log = Self::new(name);
        log.lines.write().extend(lines.into_iter().map(Into::into));
        log
    }

    /// Make every subsequent operation fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Raw lines, for assertions.
    pub fn lines(&self) -> Vec<String> {
        self.lines.read().clone()
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable(self.location()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LineLog for MemoryLineLog {
    async fn append(&self, line: &str) -> StoreResult<()> {
        self.check_available()?;
        self.lines.write().push(line.to_string());
        Ok(())
    }

    async fn read_lines(&self) -> StoreResult<Vec<String>> {
        self.check_available()?;
        Ok(self
            .lines
            .read()
            .iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect())
    }

    fn location(&self) -> String {
        format!("memory:{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_log_appends_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileLineLog::open(dir.path().join("nested/cards.txt"))
            .await
            .unwrap();

        assert!(log.read_lines().await.unwrap().is_empty());

        log.append("04A1B2C3,Alice,U1,student").await.unwrap();
        log.append("0BADF00D,Bob,U2,staff").await.unwrap();

        let lines = log.read_lines().await.unwrap();
        assert_eq!(
            lines,
            vec!["04A1B2C3,Alice,U1,student", "0BADF00D,Bob,U2,staff"]
        );
    }

    #[tokio::test]
    async fn test_file_log_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attendance.txt");

        {
            let log = FileLineLog::open(&path).await.unwrap();
            log.append("1000,04A1B2C3,Alice,ENTRY,ESP32_001").await.unwrap();
        }

        let reopened = FileLineLog::open(&path).await.unwrap();
        assert_eq!(reopened.read_lines().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_memory_log_unavailable() {
        let log = MemoryLineLog::new("cards");
        log.set_unavailable(true);
        assert!(matches!(
            log.append("x").await,
            Err(StoreError::Unavailable(_))
        ));
        log.set_unavailable(false);
        log.append("x").await.unwrap();
        assert_eq!(log.lines(), vec!["x"]);
    }
}
