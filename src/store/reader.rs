//! Random-access MBOX reader with an LRU cache of attachment listings.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use lru::LruCache;
use tracing::debug;

use crate::error::{ArchiveError, Result};
use crate::model::attachment::AttachmentMeta;
use crate::model::mail::MailEntry;
use crate::parser::mime;

/// Number of attachment listings kept in memory.
const DEFAULT_CACHE_SIZE: NonZeroUsize = match NonZeroUsize::new(64) {
    Some(n) => n,
    None => unreachable!(),
};

/// Reads individual messages from an MBOX file by offset.
///
/// Listing attachments requires a full MIME parse, so the listing is
/// cached per message offset; the search needs it for `filename:` terms
/// and the archive step needs it again to write each part.
pub struct MboxStore {
    path: PathBuf,
    file: File,
    listings: LruCache<u64, Vec<AttachmentMeta>>,
}

impl MboxStore {
    /// Open an MBOX file for random-access reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ArchiveError::FileNotFound(path.clone())
            } else {
                ArchiveError::io(&path, e)
            }
        })?;
        Ok(Self {
            path,
            file,
            listings: LruCache::new(DEFAULT_CACHE_SIZE),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Attachments of a message, inline parts included.
    pub fn attachments(&mut self, entry: &MailEntry) -> Result<&[AttachmentMeta]> {
        if !self.listings.contains(&entry.offset) {
            let raw = self.read_raw(entry)?;
            let listing = mime::list_attachments(&raw);
            self.listings.put(entry.offset, listing);
        }
        Ok(self
            .listings
            .get(&entry.offset)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    /// Decode one attachment's content.
    pub fn attachment_bytes(
        &mut self,
        entry: &MailEntry,
        attachment: &AttachmentMeta,
    ) -> Result<Vec<u8>> {
        let raw = self.read_raw(entry)?;
        mime::extract_attachment(&raw, attachment)
    }

    /// Raw bytes of a message, `From ` line included (not cached).
    pub fn raw_message(&mut self, entry: &MailEntry) -> Result<Vec<u8>> {
        self.read_raw(entry)
    }

    fn read_raw(&mut self, entry: &MailEntry) -> Result<Vec<u8>> {
        debug!(
            offset = entry.offset,
            length = entry.length,
            "Reading message from MBOX"
        );
        self.file
            .seek(SeekFrom::Start(entry.offset))
            .map_err(|e| ArchiveError::io(&self.path, e))?;
        let mut buf = vec![0u8; entry.length as usize];
        self.file
            .read_exact(&mut buf)
            .map_err(|e| ArchiveError::io(&self.path, e))?;
        Ok(buf)
    }
}
