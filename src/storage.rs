//! Storage location writer.
//!
//! A folder id names a folder under the storage root; an empty id means the
//! root itself. Locally, the root is a directory and folder ids are its
//! subdirectories. Rendered names are sanitized here, right before they
//! touch the filesystem.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ArchiveError, Result};
use crate::template::split_extension;

/// Name used when sanitizing leaves nothing.
pub const FALLBACK_NAME: &str = "unnamed";

/// Highest numeric suffix tried before giving up.
const MAX_SUFFIX: u32 = 9_999;

/// What to do when a name is already taken in the folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Append `_1`, `_2`, … before the extension.
    #[default]
    Suffix,
    /// Replace the existing file.
    Overwrite,
    /// Keep the existing file and report the attachment as skipped.
    Skip,
}

/// What a write did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteOutcome {
    Created,
    Overwritten,
    Skipped,
}

/// Result of writing (or planning) one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    /// Final path, suffix included.
    pub path: PathBuf,
    /// Final file name.
    pub name: String,
    pub outcome: WriteOutcome,
    /// Bytes written; 0 when skipped.
    pub bytes: u64,
}

/// A place attachments are written to.
pub trait Storage {
    /// Where files end up.
    fn location(&self) -> &Path;

    /// Sanitize `name`, resolve collisions, and write `bytes`.
    fn write(&self, name: &str, bytes: &[u8]) -> Result<StoredFile>;

    /// What [`Storage::write`] would do right now, without writing.
    fn plan(&self, name: &str, size: u64) -> StoredFile;
}

/// A directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFolder {
    dir: PathBuf,
    policy: CollisionPolicy,
    max_name_len: usize,
}

impl LocalFolder {
    /// Resolve the folder without touching the filesystem.
    pub fn new(
        root_dir: impl AsRef<Path>,
        folder_id: Option<&str>,
        policy: CollisionPolicy,
        max_name_len: usize,
    ) -> Self {
        let root = root_dir.as_ref();
        let dir = match folder_id {
            Some(id) if !id.is_empty() => root.join(id),
            _ => root.to_path_buf(),
        };
        Self {
            dir,
            policy,
            max_name_len: max_name_len.max(1),
        }
    }

    /// Resolve the folder and create it if needed.
    pub fn open(
        root_dir: impl AsRef<Path>,
        folder_id: Option<&str>,
        policy: CollisionPolicy,
        max_name_len: usize,
    ) -> Result<Self> {
        let folder = Self::new(root_dir, folder_id, policy, max_name_len);
        std::fs::create_dir_all(&folder.dir).map_err(|e| ArchiveError::io(&folder.dir, e))?;
        debug!(dir = %folder.dir.display(), "Storage folder ready");
        Ok(folder)
    }

    pub fn policy(&self) -> CollisionPolicy {
        self.policy
    }

    fn stored(&self, name: String, outcome: WriteOutcome, bytes: u64) -> StoredFile {
        StoredFile {
            path: self.dir.join(&name),
            name,
            outcome,
            bytes,
        }
    }

    /// Create `name` exclusively; `Ok(None)` if it already exists.
    fn create_new(&self, name: &str, bytes: &[u8]) -> Result<Option<()>> {
        let path = self.dir.join(name);
        let file = OpenOptions::new().write(true).create_new(true).open(&path);
        match file {
            Ok(mut f) => {
                f.write_all(bytes).map_err(|e| ArchiveError::io(&path, e))?;
                Ok(Some(()))
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(ArchiveError::io(&path, e)),
        }
    }
}

impl Storage for LocalFolder {
    fn location(&self) -> &Path {
        &self.dir
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<StoredFile> {
        let name = sanitize_filename(name, self.max_name_len);
        let size = bytes.len() as u64;

        match self.policy {
            CollisionPolicy::Overwrite => {
                let path = self.dir.join(&name);
                let existed = path.exists();
                std::fs::write(&path, bytes).map_err(|e| ArchiveError::io(&path, e))?;
                let outcome = if existed {
                    WriteOutcome::Overwritten
                } else {
                    WriteOutcome::Created
                };
                Ok(self.stored(name, outcome, size))
            }
            CollisionPolicy::Skip => match self.create_new(&name, bytes)? {
                Some(()) => Ok(self.stored(name, WriteOutcome::Created, size)),
                None => {
                    debug!(name = %name, "Name taken, skipping");
                    Ok(self.stored(name, WriteOutcome::Skipped, 0))
                }
            },
            CollisionPolicy::Suffix => {
                for candidate in candidates(&name, self.max_name_len) {
                    if self.create_new(&candidate, bytes)?.is_some() {
                        return Ok(self.stored(candidate, WriteOutcome::Created, size));
                    }
                }
                Err(ArchiveError::StorageError(format!(
                    "no free name for '{name}' in {}",
                    self.dir.display()
                )))
            }
        }
    }

    fn plan(&self, name: &str, size: u64) -> StoredFile {
        let name = sanitize_filename(name, self.max_name_len);
        let taken = |n: &str| self.dir.join(n).exists();

        match self.policy {
            CollisionPolicy::Overwrite if taken(&name) => {
                self.stored(name, WriteOutcome::Overwritten, size)
            }
            CollisionPolicy::Skip if taken(&name) => self.stored(name, WriteOutcome::Skipped, 0),
            CollisionPolicy::Suffix => {
                let free = candidates(&name, self.max_name_len)
                    .find(|c| !taken(c.as_str()))
                    .unwrap_or_else(|| name.clone());
                self.stored(free, WriteOutcome::Created, size)
            }
            _ => self.stored(name, WriteOutcome::Created, size),
        }
    }
}

/// `name`, then `stem_1.ext`, `stem_2.ext`, …, with the stem cut so every
/// candidate stays within `max_len` characters.
fn candidates(name: &str, max_len: usize) -> impl Iterator<Item = String> + '_ {
    let (stem, ext) = split_extension(name);
    std::iter::once(name.to_string()).chain((1..=MAX_SUFFIX).map(move |i| {
        let tail = match ext {
            Some(ext) => format!("_{i}.{ext}"),
            None => format!("_{i}"),
        };
        let keep = max_len.saturating_sub(tail.chars().count());
        let stem: String = stem.chars().take(keep).collect();
        format!("{}{tail}", stem.trim_end_matches(|c: char| c == '.' || c.is_whitespace()))
    }))
}

fn is_illegal(c: char) -> bool {
    matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || c.is_control()
}

/// Make a rendered name safe to use as a file name.
///
/// Path-illegal characters become `_`. Other characters, Japanese
/// included, are kept. Leading and trailing dots and whitespace are
/// trimmed, and names longer than `max_len` characters are cut on a char
/// boundary with the extension kept.
pub fn sanitize_filename(name: &str, max_len: usize) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if is_illegal(c) { '_' } else { c })
        .collect();
    let trimmed = trim_edges(&replaced);
    if trimmed.is_empty() {
        return FALLBACK_NAME.to_string();
    }

    let max_len = max_len.max(1);
    if trimmed.chars().count() <= max_len {
        return trimmed.to_string();
    }

    match split_extension(trimmed) {
        (stem, Some(ext)) if ext.chars().count() + 1 < max_len => {
            let keep = max_len - ext.chars().count() - 1;
            let stem: String = stem.chars().take(keep).collect();
            let stem = trim_edges(&stem);
            if stem.is_empty() {
                format!("{FALLBACK_NAME}.{ext}")
            } else {
                format!("{stem}.{ext}")
            }
        }
        _ => {
            let cut: String = trimmed.chars().take(max_len).collect();
            let cut = trim_edges(&cut);
            if cut.is_empty() {
                FALLBACK_NAME.to_string()
            } else {
                cut.to_string()
            }
        }
    }
}

fn trim_edges(s: &str) -> &str {
    s.trim_matches(|c: char| c == '.' || c.is_whitespace())
}
