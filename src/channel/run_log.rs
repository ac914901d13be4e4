use std::fs;
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::Receipt;
use crate::error::{BenchError, Result};

/// Append-only timing file written by the receiver, one run per file.
///
/// The receiver is its only writer; readers open it after the run.
pub struct RunLog {
    path: PathBuf,
    file: File,
}

impl RunLog {
    /// Start a new run log. An existing non-empty file is refused, since a
    /// timing window is read from the first two lines only.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let log = Self::open_append(path).await?;
        let len = log
            .file
            .metadata()
            .await
            .map_err(|e| BenchError::io(&log.path, e))?
            .len();
        if len > 0 {
            return Err(BenchError::RunLogInUse { path: log.path });
        }
        Ok(log)
    }

    /// Continue an existing run log, creating the file and its parent
    /// directory when absent
    pub async fn open_append(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BenchError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| BenchError::io(&path, e))?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&mut self, receipt: &Receipt) -> Result<()> {
        let line = format!("{}\n", receipt.to_log_line());
        self.file
            .write_all(line.as_bytes())
            .await
            .map_err(|e| BenchError::io(&self.path, e))?;
        self.file
            .flush()
            .await
            .map_err(|e| BenchError::io(&self.path, e))
    }
}

/// Read every receipt back from a run log; unparseable lines are an error.
pub fn load_receipts(path: &Path) -> Result<Vec<Receipt>> {
    let text = fs::read_to_string(path).map_err(|e| BenchError::io(path, e))?;
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            Receipt::from_log_line(line).ok_or_else(|| {
                BenchError::format(path, format!("line {}: bad receipt {:?}", idx + 1, line))
            })
        })
        .collect()
}
