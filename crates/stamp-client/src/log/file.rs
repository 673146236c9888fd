//! JSON Lines stamp log.
//!
//! One serialized [`StampRecord`] per line, appended with `O_APPEND` and
//! synced before the append returns. The whole file is replayed into memory
//! on open; reads are served from that cache.
//!
//! A crash between `write` and `fsync` can leave a final line without its
//! terminating newline. Such a torn tail is dropped on open (and the file is
//! truncated back to the last complete line). A complete line that fails to
//! decode is [`LogError::Corrupt`].
//!
//! Appends never build on a partial line: the writer tracks the length of
//! the committed prefix, truncates anything past it before writing, and
//! truncates back to it when a write or sync fails.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use stamp_core::StampRecord;
use tokio::io::AsyncWriteExt;

use super::StampLog;
use crate::error::LogError;

/// Stamp log persisted as JSON Lines.
#[derive(Debug)]
pub struct FileStampLog {
    path: PathBuf,
    records: RwLock<Vec<StampRecord>>,
    writer: tokio::sync::Mutex<Writer>,
}

#[derive(Debug)]
struct Writer {
    file: tokio::fs::File,
    /// Bytes of complete, synced lines.
    committed: u64,
}

impl FileStampLog {
    /// Open (or create) the log at `path`, replaying existing records.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, LogError> {
        let path = path.as_ref().to_path_buf();
        let io_err = |source| LogError::Io {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let contents = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(io_err(e)),
        };
        let (records, complete_len) = replay(&path, &contents)?;

        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(io_err)?;
        if complete_len < contents.len() {
            tracing::warn!(
                path = %path.display(),
                dropped_bytes = contents.len() - complete_len,
                "dropping torn trailing line from stamp log"
            );
            file.set_len(complete_len as u64).await.map_err(io_err)?;
            file.sync_all().await.map_err(io_err)?;
        }

        tracing::info!(path = %path.display(), records = records.len(), "stamp log opened");
        Ok(Self {
            path,
            records: RwLock::new(records),
            writer: tokio::sync::Mutex::new(Writer {
                file,
                committed: complete_len as u64,
            }),
        })
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> LogError {
        LogError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

/// Decode every newline-terminated line. Returns the records (oldest first)
/// and the byte length of the complete-line prefix.
fn replay(path: &Path, contents: &[u8]) -> Result<(Vec<StampRecord>, usize), LogError> {
    let complete_len = contents
        .iter()
        .rposition(|b| *b == b'\n')
        .map_or(0, |i| i + 1);

    let mut records = Vec::new();
    for (idx, line) in contents[..complete_len].split(|b| *b == b'\n').enumerate() {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let record = serde_json::from_slice(line).map_err(|e| LogError::Corrupt {
            path: path.display().to_string(),
            line: idx + 1,
            reason: e.to_string(),
        })?;
        records.push(record);
    }
    Ok((records, complete_len))
}

async fn write_line(file: &mut tokio::fs::File, line: &[u8]) -> std::io::Result<()> {
    file.write_all(line).await?;
    file.flush().await?;
    file.sync_data().await
}

#[async_trait]
impl StampLog for FileStampLog {
    async fn append(&self, record: StampRecord) -> Result<(), LogError> {
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        // Held across write, sync and cache update so file order matches
        // cache order.
        let mut writer = self.writer.lock().await;
        let on_disk = writer
            .file
            .metadata()
            .await
            .map_err(|e| self.io_error(e))?
            .len();
        if on_disk > writer.committed {
            tracing::warn!(
                path = %self.path.display(),
                dropped_bytes = on_disk - writer.committed,
                "dropping partial line before append"
            );
            writer
                .file
                .set_len(writer.committed)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        if let Err(e) = write_line(&mut writer.file, &line).await {
            // Leave the file ending on a complete line.
            if let Err(rollback) = writer.file.set_len(writer.committed).await {
                tracing::error!(
                    path = %self.path.display(),
                    error = %rollback,
                    "failed to truncate stamp log after a failed append"
                );
            }
            return Err(self.io_error(e));
        }
        writer.committed += line.len() as u64;
        self.records.write().push(record);
        Ok(())
    }

    async fn snapshot(&self) -> Result<Vec<StampRecord>, LogError> {
        Ok(self.records.read().iter().rev().cloned().collect())
    }

    async fn len(&self) -> Result<usize, LogError> {
        Ok(self.records.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stamp_core::{ContentId, LedgerTxId};

    #[test]
    fn replay_skips_blank_lines() {
        let data = b"{\"contentId\":\"bafy1\",\"ledgerTxId\":\"tx1\"}\n\n";
        let (records, len) = replay(Path::new("/tmp/x"), data).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(len, data.len());
    }

    #[test]
    fn replay_ignores_torn_tail() {
        let data = b"{\"contentId\":\"bafy1\",\"ledgerTxId\":\"tx1\"}\n{\"contentId\":\"ba";
        let (records, len) = replay(Path::new("/tmp/x"), data).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(len, data.iter().position(|b| *b == b'\n').unwrap() + 1);
    }

    #[test]
    fn replay_rejects_corrupt_complete_line() {
        let data = b"{\"contentId\":\"bafy1\",\"ledgerTxId\":\"tx1\"}\nnot json\n";
        let err = replay(Path::new("/tmp/x"), data).unwrap_err();
        assert!(matches!(err, LogError::Corrupt { line: 2, .. }));
    }

    #[test]
    fn replay_accepts_legacy_field_names() {
        let data = b"{\"ipfsCid\":\"bafy1\",\"arkTransactionId\":\"tx1\"}\n";
        let (records, _) = replay(Path::new("/tmp/x"), data).unwrap();
        assert_eq!(records[0].content_id, ContentId::new("bafy1").unwrap());
        assert_eq!(records[0].ledger_tx_id, LedgerTxId::new("tx1"));
        assert!(records[0].recorded_at.is_none());
    }
}
