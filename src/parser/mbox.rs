//! Streaming MBOX scanner.
//!
//! Walks the file line by line with a large buffer and reports each
//! message's offset, length and header block. Bodies are skipped; they are
//! read again by offset only for messages that pass the search.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{ArchiveError, Result};

/// Read buffer size (1 MB).
const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Progress is reported every 4 MB.
const PROGRESS_INTERVAL: u64 = 4 * 1024 * 1024;

/// Header blocks larger than this are truncated (256 KB).
const MAX_HEADER_SIZE: usize = 256 * 1024;

/// UTF-8 byte order mark.
const BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Sequential MBOX scanner.
///
/// Tolerates mixed `\n` / `\r\n` endings, a leading BOM, `From ` lines
/// without a preceding blank line (logged), and a truncated last message.
pub struct MboxParser {
    path: PathBuf,
    file_size: u64,
}

impl MboxParser {
    /// Open a scanner for `path`. Does not check that the file is an MBOX.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = std::fs::metadata(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ArchiveError::FileNotFound(path.clone())
            } else {
                ArchiveError::io(&path, e)
            }
        })?;
        Ok(Self {
            path,
            file_size: metadata.len(),
        })
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Scan every message, calling `on_message(offset, length, headers)`.
    ///
    /// `headers` includes the `From ` separator line. Returning `false`
    /// from the callback stops the scan. Returns the number of messages
    /// delivered.
    pub fn scan_headers(
        &self,
        on_message: &mut dyn FnMut(u64, u64, &[u8]) -> bool,
        progress: Option<&dyn Fn(u64, u64)>,
    ) -> Result<u64> {
        if self.file_size == 0 {
            return Ok(0);
        }

        let file = File::open(&self.path).map_err(|e| ArchiveError::io(&self.path, e))?;
        let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);

        let mut count: u64 = 0;
        let mut offset: u64 = 0;
        let mut last_progress: u64 = 0;
        let mut line: Vec<u8> = Vec::with_capacity(4096);

        // State of the message currently being read
        let mut current: Option<(u64, Vec<u8>)> = None;
        let mut in_headers = false;
        let mut prev_blank = true;

        loop {
            line.clear();
            let n = reader
                .read_until(b'\n', &mut line)
                .map_err(|e| ArchiveError::io(&self.path, e))? as u64;
            if n == 0 {
                break;
            }

            if is_mbox_separator(&line) {
                if !prev_blank && offset > 0 {
                    warn!(offset, "Found 'From ' separator without preceding blank line");
                }
                if let Some((start, headers)) = current.take() {
                    count += 1;
                    if !on_message(start, offset - start, &headers) {
                        return Ok(count);
                    }
                }
                current = Some((offset, line.clone()));
                in_headers = true;
            } else if in_headers {
                if is_blank_line(&line) {
                    in_headers = false;
                } else if let Some((start, headers)) = current.as_mut() {
                    if headers.len() + line.len() <= MAX_HEADER_SIZE {
                        headers.extend_from_slice(&line);
                    } else {
                        warn!(offset = *start, "Header block too large, truncating");
                        in_headers = false;
                    }
                }
            }

            prev_blank = is_blank_line(&line);
            offset += n;

            if let Some(cb) = progress {
                if offset - last_progress >= PROGRESS_INTERVAL {
                    cb(offset, self.file_size);
                    last_progress = offset;
                }
            }
        }

        if let Some((start, headers)) = current.take() {
            count += 1;
            on_message(start, offset - start, &headers);
        }

        if let Some(cb) = progress {
            cb(self.file_size, self.file_size);
        }

        Ok(count)
    }
}

/// Strip a leading UTF-8 BOM.
pub(crate) fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(BOM).unwrap_or(data)
}

/// Whether a line starts a new message (`From ` at column 0).
fn is_mbox_separator(line: &[u8]) -> bool {
    strip_bom(line).starts_with(b"From ")
}

fn is_blank_line(line: &[u8]) -> bool {
    line.iter().all(|b| matches!(b, b'\n' | b'\r' | b' ' | b'\t'))
}
