use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

use super::{RecordSink, SinkError};
use crate::probe::ProbeResult;

/// Append-only file store holding one JSON document per line.
///
/// A failed write is truncated away, and a line left unterminated by
/// anything else is closed before the next record, so one bad write never
/// merges into the following record.
pub struct JsonLinesSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonLinesSink {
    /// Opens `path` for appending, creating it if needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads back every stored record in insertion order. Lines that do not
    /// hold a record are logged and skipped.
    pub async fn read_all(&self) -> Result<Vec<ProbeResult>, SinkError> {
        let contents = fs::read_to_string(&self.path).await?;
        let records = contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(idx, line)| match serde_json::from_str(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    log::warn!(
                        "Skipping unreadable record at {}:{}: {e}",
                        self.path.display(),
                        idx + 1
                    );
                    None
                }
            })
            .collect();
        Ok(records)
    }
}

async fn ends_mid_line(file: &mut File, len: u64) -> Result<bool, SinkError> {
    if len == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::Start(len - 1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] != b'\n')
}

async fn append(file: &mut File, len: u64, line: &[u8]) -> Result<(), SinkError> {
    let mut bytes = Vec::with_capacity(line.len() + 1);
    if ends_mid_line(file, len).await? {
        bytes.push(b'\n');
    }
    bytes.extend_from_slice(line);

    file.write_all(&bytes).await?;
    file.flush().await?;
    file.sync_data().await?;
    Ok(())
}

#[async_trait]
impl RecordSink for JsonLinesSink {
    async fn insert(&self, record: ProbeResult) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        // One write per record keeps concurrent inserts from interleaving.
        let mut file = self.file.lock().await;
        let len = file.metadata().await?.len();

        if let Err(e) = append(&mut file, len, &line).await {
            if let Err(rollback) = file.set_len(len).await {
                log::error!(
                    "Failed to roll back partial write to {}: {rollback}",
                    self.path.display()
                );
            }
            return Err(e);
        }
        Ok(())
    }
}
