//! The archive run: search the mailbox, save matching attachments, and
//! label the messages that were fully handled.

pub mod report;

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::ValidatedConfig;
use crate::error::Result;
use crate::ledger::{message_key, Ledger};
use crate::model::attachment::AttachmentMeta;
use crate::model::mail::MailEntry;
use crate::parser::header::parse_headers_to_entry;
use crate::parser::mbox::MboxParser;
use crate::search::SearchQuery;
use crate::storage::Storage;
use crate::store::reader::MboxStore;
use crate::template::{FileNameFields, FileNameFormat};

pub use report::{Failure, RunReport, SavedAttachment};

/// Per-run switches.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Render names and count, but write neither files nor the ledger.
    pub dry_run: bool,
    /// Reference time for the lookback window and label timestamps.
    pub now: DateTime<Utc>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            now: Utc::now(),
        }
    }
}

/// Progress callback: `(bytes_scanned, total_bytes)`.
pub type Progress<'a> = &'a dyn Fn(u64, u64);

/// Runs the archive job against one mailbox.
pub struct Archiver<'a, S: Storage> {
    query: SearchQuery,
    format: &'a FileNameFormat,
    storage: S,
    ledger: Ledger,
}

impl<'a, S: Storage> Archiver<'a, S> {
    pub fn new(config: &'a ValidatedConfig, storage: S, ledger: Ledger) -> Self {
        Self {
            query: SearchQuery::from_config(config),
            format: config.file_name_format(),
            storage,
            ledger,
        }
    }

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Process `mbox` once.
    ///
    /// Attachment failures are recorded in the report and leave the
    /// message unlabeled, so the next run retries it. Attachments that did
    /// get stored are noted in the ledger and are not written again on the
    /// retry. Mailbox and ledger errors abort the run; what was stored up
    /// to that point is still saved to the ledger.
    pub fn run(
        &mut self,
        mbox: &Path,
        options: &RunOptions,
        progress: Option<Progress<'_>>,
    ) -> Result<RunReport> {
        let now = options.now;
        let mut report = RunReport::new(
            mbox.to_path_buf(),
            self.storage.location().to_path_buf(),
            self.query.to_query_string(),
            now,
            options.dry_run,
        );
        info!(
            mailbox = %mbox.display(),
            query = %report.query,
            dry_run = options.dry_run,
            "Starting archive run"
        );

        let candidates = self.scan(mbox, now, &mut report, progress)?;
        let processed = self.process(mbox, &candidates, options, &mut report);

        if !options.dry_run && self.ledger.is_dirty() {
            self.ledger.save()?;
        }
        processed?;

        info!(
            scanned = report.scanned,
            matched = report.matched,
            saved = report.saved,
            skipped = report.skipped,
            resumed = report.resumed,
            failures = report.failures.len(),
            "Archive run finished"
        );
        Ok(report)
    }

    fn process(
        &mut self,
        mbox: &Path,
        candidates: &[MailEntry],
        options: &RunOptions,
        report: &mut RunReport,
    ) -> Result<()> {
        let now = options.now;
        let mut store = MboxStore::open(mbox)?;

        for entry in candidates {
            let key = message_key(entry);
            if self.ledger.has_label(&key, self.query.processed_label())
                || self.query.is_processed_by_headers(entry)
            {
                debug!(key = %key, "Already processed");
                report.already_processed += 1;
                continue;
            }

            let attachments = store.attachments(entry)?.to_vec();
            if !self.query.matches(entry, &attachments, now) {
                continue;
            }
            report.matched += 1;
            debug!(key = %key, subject = %entry.subject, "Message matched");

            let all_handled =
                self.archive_message(&mut store, entry, &key, &attachments, options, report);

            if all_handled {
                if !options.dry_run {
                    self.ledger
                        .apply_label(&key, self.query.processed_label(), now);
                }
                report.labeled += 1;
            }
        }
        Ok(())
    }

    /// Stream the headers, keeping only messages inside the window.
    fn scan(
        &self,
        mbox: &Path,
        now: DateTime<Utc>,
        report: &mut RunReport,
        progress: Option<Progress<'_>>,
    ) -> Result<Vec<MailEntry>> {
        let parser = MboxParser::new(mbox)?;
        let mut candidates = Vec::new();
        let mut sequence = 0u64;

        let mut on_message = |offset: u64, length: u64, headers: &[u8]| {
            let entry = parse_headers_to_entry(headers, offset, length, sequence);
            sequence += 1;
            if self.query.in_window(&entry, now) {
                candidates.push(entry);
            }
            true
        };
        report.scanned = parser.scan_headers(&mut on_message, progress)?;
        report.in_window = candidates.len() as u64;

        debug!(
            scanned = report.scanned,
            in_window = report.in_window,
            "Header scan complete"
        );
        Ok(candidates)
    }

    /// Save every non-inline attachment not stored yet; `true` if none failed.
    fn archive_message(
        &mut self,
        store: &mut MboxStore,
        entry: &MailEntry,
        key: &str,
        attachments: &[AttachmentMeta],
        options: &RunOptions,
        report: &mut RunReport,
    ) -> bool {
        let mut ok = true;

        for attachment in attachments.iter().filter(|a| !a.is_inline) {
            if self.ledger.is_stored(key, attachment.index) {
                debug!(
                    key = %key,
                    original = %attachment.filename,
                    "Stored by an earlier run"
                );
                report.resumed += 1;
                continue;
            }

            let (fields, ext) = FileNameFields::from_message(entry, &attachment.filename);
            let name = self.format.render_with_extension(&fields, ext.as_deref());

            let stored = if options.dry_run {
                Ok(self.storage.plan(&name, attachment.size))
            } else {
                store
                    .attachment_bytes(entry, attachment)
                    .and_then(|bytes| self.storage.write(&name, &bytes))
            };

            match stored {
                Ok(file) => {
                    debug!(
                        original = %attachment.filename,
                        path = %file.path.display(),
                        outcome = ?file.outcome,
                        "Attachment stored"
                    );
                    if !options.dry_run {
                        self.ledger
                            .record_stored(key, attachment.index, &file.name, options.now);
                    }
                    report.record_file(SavedAttachment {
                        message_key: key.to_string(),
                        subject: entry.subject.clone(),
                        original: attachment.filename.clone(),
                        file,
                    });
                }
                Err(e) => {
                    warn!(
                        filename = %attachment.filename,
                        error = %e,
                        "Failed to store attachment"
                    );
                    report.failures.push(Failure {
                        message_key: key.to_string(),
                        subject: entry.subject.clone(),
                        attachment: attachment.filename.clone(),
                        reason: e.to_string(),
                    });
                    ok = false;
                }
            }
        }
        ok
    }
}
