//! Processed-label ledger.
//!
//! A local MBOX cannot be relabeled in place, so applied labels are kept in
//! a JSON file next to the cache:
//!
//! ```json
//! {
//!   "version": 1,
//!   "messages": {
//!     "<abc@example.com>": [
//!       { "label": "請求書/処理済み", "labeled_at": "2024-01-20T09:00:00Z" }
//!     ]
//!   },
//!   "stored": {
//!     "<def@example.com>": [
//!       { "index": 0, "name": "2024-01-16_invoice.pdf", "stored_at": "2024-01-20T09:00:00Z" }
//!     ]
//!   }
//! }
//! ```
//!
//! `stored` lists attachments already written for messages that are not
//! labeled yet, so a retry only writes the ones that failed. An entry is
//! dropped once its message is labeled.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{ArchiveError, Result};
use crate::label::LabelPath;
use crate::model::mail::MailEntry;

/// Current ledger file format version.
pub const LEDGER_VERSION: u32 = 1;

/// One applied label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMark {
    pub label: String,
    pub labeled_at: DateTime<Utc>,
}

/// One attachment written for a message that is not labeled yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMark {
    /// Attachment index within the message.
    pub index: usize,
    /// File name it was stored under.
    pub name: String,
    pub stored_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    version: u32,
    messages: BTreeMap<String, Vec<LabelMark>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    stored: BTreeMap<String, Vec<StoredMark>>,
}

/// Labels applied to messages, persisted as JSON.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    file: LedgerFile,
    dirty: bool,
}

/// Stable key for a message: its `Message-ID`, or a hash of
/// `date|from|subject` when it has none.
pub fn message_key(entry: &MailEntry) -> String {
    let id = entry.message_id.trim();
    if !id.is_empty() {
        return id.to_string();
    }
    let mut hasher = Sha256::new();
    hasher.update(entry.date.to_rfc3339().as_bytes());
    hasher.update(b"|");
    hasher.update(entry.from.address.as_bytes());
    hasher.update(b"|");
    hasher.update(entry.subject.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    format!("sha256:{hex}")
}

impl Ledger {
    /// Load the ledger at `path`; a missing file is an empty ledger.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = match std::fs::read_to_string(&path) {
            Ok(text) => {
                let file: LedgerFile =
                    serde_json::from_str(&text).map_err(|e| ArchiveError::InvalidLedger {
                        path: path.clone(),
                        reason: e.to_string(),
                    })?;
                if file.version != LEDGER_VERSION {
                    return Err(ArchiveError::InvalidLedger {
                        path,
                        reason: format!(
                            "unsupported version {} (expected {LEDGER_VERSION})",
                            file.version
                        ),
                    });
                }
                debug!(path = %path.display(), messages = file.messages.len(), "Loaded ledger");
                file
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LedgerFile {
                version: LEDGER_VERSION,
                ..LedgerFile::default()
            },
            Err(e) => return Err(ArchiveError::io(&path, e)),
        };
        Ok(Self {
            path,
            file,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of messages with at least one label.
    pub fn len(&self) -> usize {
        self.file.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.file.messages.is_empty()
    }

    /// Whether unsaved changes exist.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn has_label(&self, key: &str, label: &LabelPath) -> bool {
        self.file
            .messages
            .get(key)
            .is_some_and(|marks| marks.iter().any(|m| m.label == label.as_str()))
    }

    /// Labels recorded for a message.
    pub fn marks(&self, key: &str) -> &[LabelMark] {
        self.file
            .messages
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Attachments recorded as stored for a message not yet labeled.
    pub fn stored(&self, key: &str) -> &[StoredMark] {
        self.file
            .stored
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_stored(&self, key: &str, index: usize) -> bool {
        self.stored(key).iter().any(|m| m.index == index)
    }

    /// Record that attachment `index` of `key` was stored as `name`.
    pub fn record_stored(&mut self, key: &str, index: usize, name: &str, at: DateTime<Utc>) {
        if self.is_stored(key, index) {
            return;
        }
        self.file
            .stored
            .entry(key.to_string())
            .or_default()
            .push(StoredMark {
                index,
                name: name.to_string(),
                stored_at: at,
            });
        self.dirty = true;
    }

    /// Record `label` on `key` and forget its stored attachments.
    /// Returns `false` if the label was already there.
    pub fn apply_label(&mut self, key: &str, label: &LabelPath, at: DateTime<Utc>) -> bool {
        if self.file.stored.remove(key).is_some() {
            self.dirty = true;
        }
        if self.has_label(key, label) {
            return false;
        }
        self.file
            .messages
            .entry(key.to_string())
            .or_default()
            .push(LabelMark {
                label: label.as_str().to_string(),
                labeled_at: at,
            });
        self.dirty = true;
        true
    }

    /// Write to a temporary file next to the ledger, then rename over it.
    pub fn save(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(&self.file).map_err(|e| {
            ArchiveError::InvalidLedger {
                path: self.path.clone(),
                reason: e.to_string(),
            }
        })?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, json).map_err(|e| ArchiveError::io(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| ArchiveError::io(&self.path, e))?;

        self.dirty = false;
        info!(path = %self.path.display(), messages = self.len(), "Saved ledger");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::address::EmailAddress;
    use chrono::TimeZone;

    fn entry(message_id: &str) -> MailEntry {
        MailEntry {
            offset: 0,
            length: 1,
            date: Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap(),
            utc_offset_secs: 0,
            from: EmailAddress::parse("billing@example.com"),
            to: Vec::new(),
            subject: "請求書".to_string(),
            message_id: message_id.to_string(),
            has_attachments: true,
            content_type: "multipart/mixed".to_string(),
            labels: Vec::new(),
            sequence: 0,
        }
    }

    fn label() -> LabelPath {
        LabelPath::parse("請求書/処理済み").unwrap()
    }

    #[test]
    fn test_message_key_prefers_message_id() {
        assert_eq!(message_key(&entry("<a@b>")), "<a@b>");
    }

    #[test]
    fn test_message_key_hash_fallback() {
        let key = message_key(&entry(""));
        assert!(key.starts_with("sha256:"));
        assert_eq!(key.len(), "sha256:".len() + 64);
        assert_eq!(key, message_key(&entry("  ")));

        let mut other = entry("");
        other.subject = "別件".to_string();
        assert_ne!(key, message_key(&other));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let ledger = Ledger::load(tmp.path().join("ledger.json")).unwrap();
        assert!(ledger.is_empty());
        assert!(!ledger.is_dirty());
    }

    #[test]
    fn test_apply_and_persist() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sub").join("ledger.json");
        let at = Utc.with_ymd_and_hms(2024, 1, 20, 9, 0, 0).unwrap();

        let mut ledger = Ledger::load(&path).unwrap();
        assert!(ledger.apply_label("<a@b>", &label(), at));
        assert!(!ledger.apply_label("<a@b>", &label(), at));
        assert!(ledger.is_dirty());
        ledger.save().unwrap();
        assert!(!ledger.is_dirty());

        let reloaded = Ledger::load(&path).unwrap();
        assert!(reloaded.has_label("<a@b>", &label()));
        assert!(!reloaded.has_label("<other@b>", &label()));
        assert_eq!(reloaded.marks("<a@b>")[0].labeled_at, at);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("2024-01-20T09:00:00Z"));
        assert!(!tmp.path().join("sub").join("ledger.json.tmp").exists());
    }

    #[test]
    fn test_stored_attachments_until_labeled() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("ledger.json");
        let at = Utc.with_ymd_and_hms(2024, 1, 20, 9, 0, 0).unwrap();

        let mut ledger = Ledger::load(&path).unwrap();
        ledger.record_stored("<a@b>", 0, "2024-01-16_invoice.pdf", at);
        ledger.record_stored("<a@b>", 0, "2024-01-16_invoice_1.pdf", at);
        ledger.record_stored("<a@b>", 2, "2024-01-16_receipt.pdf", at);
        ledger.save().unwrap();

        let mut reloaded = Ledger::load(&path).unwrap();
        assert!(reloaded.is_stored("<a@b>", 0));
        assert!(!reloaded.is_stored("<a@b>", 1));
        assert!(reloaded.is_stored("<a@b>", 2));
        assert_eq!(reloaded.stored("<a@b>")[0].name, "2024-01-16_invoice.pdf");
        assert!(!reloaded.has_label("<a@b>", &label()));

        assert!(reloaded.apply_label("<a@b>", &label(), at));
        assert!(reloaded.stored("<a@b>").is_empty());
        reloaded.save().unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("\"stored\""));
    }

    #[test]
    fn test_file_without_stored_section_loads() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("ledger.json");
        std::fs::write(
            &path,
            r#"{"version": 1, "messages": {"<a@b>": [{"label": "x", "labeled_at": "2024-01-20T09:00:00Z"}]}}"#,
        )
        .unwrap();
        let ledger = Ledger::load(&path).unwrap();
        assert_eq!(ledger.len(), 1);
        assert!(ledger.stored("<a@b>").is_empty());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("ledger.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Ledger::load(&path),
            Err(ArchiveError::InvalidLedger { .. })
        ));
    }

    #[test]
    fn test_unknown_version_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("ledger.json");
        std::fs::write(&path, r#"{"version": 9, "messages": {}}"#).unwrap();
        let err = Ledger::load(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported version 9"));
    }
}
