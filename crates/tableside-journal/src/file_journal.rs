//! JSON Lines implementation of the `ActionJournal` trait.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use tableside_core::error::RelayError;
use tableside_core::journal::{ActionJournal, JournalRecord};

/// Append-only journal file: one serialized [`JournalRecord`] per line,
/// flushed and synced before each append returns.
pub struct FileJournal {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileJournal {
    /// Opens the journal at `path`, creating it if absent. An existing
    /// journal is appended to, never truncated.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Journal` if the file cannot be opened.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, RelayError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| RelayError::Journal(format!("open {}: {e}", path.display())))?;
        tracing::info!(path = %path.display(), "journal opened");
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }
}

#[async_trait]
impl ActionJournal for FileJournal {
    async fn append(&self, record: &JournalRecord) -> Result<(), RelayError> {
        let mut line = serde_json::to_string(record)
            .map_err(|e| RelayError::Journal(format!("serialize record: {e}")))?;
        line.push('\n');

        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| RelayError::Journal(format!("append: {e}")))?;
        file.sync_data()
            .await
            .map_err(|e| RelayError::Journal(format!("sync: {e}")))?;
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<JournalRecord>, RelayError> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| RelayError::Journal(format!("read {}: {e}", self.path.display())))?;

        let lines: Vec<&str> = contents.lines().filter(|l| !l.trim().is_empty()).collect();
        let mut records = Vec::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            match serde_json::from_str::<JournalRecord>(line) {
                Ok(record) => records.push(record),
                // A torn trailing line means the process died mid-write;
                // the record it describes was never acknowledged, so it is
                // safe to drop. Corruption anywhere else is a real fault.
                Err(e) if i == lines.len() - 1 => {
                    tracing::warn!(line = i + 1, error = %e, "dropping torn trailing journal line");
                }
                Err(e) => {
                    return Err(RelayError::Journal(format!(
                        "corrupt record at line {}: {e}",
                        i + 1
                    )));
                }
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tableside_core::action::{Action, ActionStatus};
    use tableside_core::outcome::Outcome;
    use uuid::Uuid;

    fn scratch_path() -> PathBuf {
        std::env::temp_dir().join(format!("tableside-journal-{}.jsonl", Uuid::new_v4()))
    }

    fn submitted(sequence: u64) -> JournalRecord {
        JournalRecord::Submitted {
            action: Action {
                id: Uuid::new_v4(),
                sequence,
                identity: Uuid::new_v4(),
                payload: "draw sword".to_owned(),
                submitted_at: Utc::now(),
                status: ActionStatus::Pending,
                deferred: false,
            },
        }
    }

    #[tokio::test]
    async fn test_append_then_load_round_trips_in_order() {
        let path = scratch_path();
        let journal = FileJournal::open(&path).await.unwrap();

        let first = submitted(0);
        journal.append(&first).await.unwrap();
        journal
            .append(&JournalRecord::Taken {
                action_id: Uuid::new_v4(),
                at: Utc::now(),
            })
            .await
            .unwrap();
        journal
            .append(&JournalRecord::Resolved {
                action_id: Uuid::new_v4(),
                outcome: Outcome {
                    action_id: Uuid::new_v4(),
                    public: "done".to_owned(),
                    private: vec![],
                    host_notes: None,
                },
                at: Utc::now(),
            })
            .await
            .unwrap();

        let records = journal.load_all().await.unwrap();

        assert_eq!(records.len(), 3);
        assert!(matches!(records[0], JournalRecord::Submitted { .. }));
        assert!(matches!(records[1], JournalRecord::Taken { .. }));
        assert!(matches!(records[2], JournalRecord::Resolved { .. }));

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_reopen_appends_rather_than_truncates() {
        let path = scratch_path();
        {
            let journal = FileJournal::open(&path).await.unwrap();
            journal.append(&submitted(0)).await.unwrap();
        }
        let journal = FileJournal::open(&path).await.unwrap();
        journal.append(&submitted(1)).await.unwrap();

        let records = journal.load_all().await.unwrap();
        assert_eq!(records.len(), 2);

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_torn_trailing_line_is_dropped() {
        let path = scratch_path();
        let journal = FileJournal::open(&path).await.unwrap();
        journal.append(&submitted(0)).await.unwrap();

        // Simulate a crash mid-write of the next record.
        let mut contents = tokio::fs::read_to_string(&path).await.unwrap();
        contents.push_str("{\"Taken\":{\"action_id\":\"b3");
        tokio::fs::write(&path, contents).await.unwrap();

        let records = journal.load_all().await.unwrap();
        assert_eq!(records.len(), 1);

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_corruption_before_the_tail_is_an_error() {
        let path = scratch_path();
        let journal = FileJournal::open(&path).await.unwrap();
        journal.append(&submitted(0)).await.unwrap();

        let mut contents = tokio::fs::read_to_string(&path).await.unwrap();
        contents = format!("not json at all\n{contents}");
        tokio::fs::write(&path, contents).await.unwrap();

        let result = journal.load_all().await;
        assert!(matches!(result, Err(RelayError::Journal(_))));

        let _ = tokio::fs::remove_file(&path).await;
    }
}
