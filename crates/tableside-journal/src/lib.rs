//! Tableside — durable action journal.
//!
//! File-backed implementation of the `ActionJournal` trait: one JSON
//! record per line, appended and flushed before each append call returns.

mod file_journal;

pub use file_journal::FileJournal;
