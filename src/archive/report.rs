//! Outcome of one archive run.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::storage::{StoredFile, WriteOutcome};

/// One attachment handled during the run.
#[derive(Debug, Clone, Serialize)]
pub struct SavedAttachment {
    pub message_key: String,
    pub subject: String,
    /// Attachment name as found in the message.
    pub original: String,
    /// Where it went (or would go, in a dry run).
    pub file: StoredFile,
}

/// An attachment that could not be archived.
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub message_key: String,
    pub subject: String,
    pub attachment: String,
    pub reason: String,
}

/// Counters and details of a run, serializable for `--json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mailbox: PathBuf,
    pub location: PathBuf,
    pub query: String,
    pub now: DateTime<Utc>,
    pub dry_run: bool,
    /// Messages read from the mailbox.
    pub scanned: u64,
    /// Messages inside the lookback window.
    pub in_window: u64,
    /// In-window messages already carrying the processed label.
    pub already_processed: u64,
    /// Messages matching the query.
    pub matched: u64,
    /// Messages that received the processed label.
    pub labeled: u64,
    /// Attachments written (or planned).
    pub saved: u64,
    /// Attachments left alone because the name was taken.
    pub skipped: u64,
    /// Attachments already stored by an earlier run that did not finish
    /// their message.
    pub resumed: u64,
    pub bytes_written: u64,
    pub attachments: Vec<SavedAttachment>,
    pub failures: Vec<Failure>,
}

impl RunReport {
    pub(crate) fn new(
        mailbox: PathBuf,
        location: PathBuf,
        query: String,
        now: DateTime<Utc>,
        dry_run: bool,
    ) -> Self {
        Self {
            mailbox,
            location,
            query,
            now,
            dry_run,
            scanned: 0,
            in_window: 0,
            already_processed: 0,
            matched: 0,
            labeled: 0,
            saved: 0,
            skipped: 0,
            resumed: 0,
            bytes_written: 0,
            attachments: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub(crate) fn record_file(&mut self, saved: SavedAttachment) {
        match saved.file.outcome {
            WriteOutcome::Skipped => self.skipped += 1,
            WriteOutcome::Created | WriteOutcome::Overwritten => {
                self.saved += 1;
                self.bytes_written += saved.file.bytes;
            }
        }
        self.attachments.push(saved);
    }

    /// `true` when nothing failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
