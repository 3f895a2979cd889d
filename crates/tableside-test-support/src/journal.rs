//! Test journals — mock `ActionJournal` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use tableside_core::error::RelayError;
use tableside_core::journal::{ActionJournal, JournalRecord};

/// An in-memory journal that records every appended record in order.
/// `load_all` returns the records appended so far, which makes it usable
/// both as a recording mock and as a replay source.
#[derive(Debug, Default)]
pub struct MemoryJournal {
    records: Mutex<Vec<JournalRecord>>,
}

impl MemoryJournal {
    /// Creates an empty in-memory journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a journal pre-seeded with records, for replay tests.
    #[must_use]
    pub fn with_records(records: Vec<JournalRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    /// Returns a snapshot of everything appended so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn records(&self) -> Vec<JournalRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActionJournal for MemoryJournal {
    async fn append(&self, record: &JournalRecord) -> Result<(), RelayError> {
        self.records
            .lock()
            .map_err(|_| RelayError::Journal("journal mutex poisoned".into()))?
            .push(record.clone());
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<JournalRecord>, RelayError> {
        Ok(self
            .records
            .lock()
            .map_err(|_| RelayError::Journal("journal mutex poisoned".into()))?
            .clone())
    }
}

/// A journal that always fails. Useful for testing error-handling paths.
#[derive(Debug, Default)]
pub struct FailingJournal;

#[async_trait]
impl ActionJournal for FailingJournal {
    async fn append(&self, _record: &JournalRecord) -> Result<(), RelayError> {
        Err(RelayError::Journal("disk full".into()))
    }

    async fn load_all(&self) -> Result<Vec<JournalRecord>, RelayError> {
        Err(RelayError::Journal("disk full".into()))
    }
}
