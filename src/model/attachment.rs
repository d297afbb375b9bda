//! Attachment metadata.
//!
//! The payload is not kept here; it is decoded from the raw message only
//! when the attachment is written to storage.

use serde::{Deserialize, Serialize};

/// Metadata about one attachment of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMeta {
    /// Position among the message's attachments (0-based).
    pub index: usize,

    /// Filename from `Content-Disposition` / `Content-Type`, or a generated
    /// `attachment_{index}` when the part carries none.
    pub filename: String,

    /// MIME content type (e.g. `"application/pdf"`).
    pub content_type: String,

    /// Decoded size in bytes.
    pub size: u64,

    /// `true` for parts embedded in an HTML body (logos, signatures).
    pub is_inline: bool,
}

impl AttachmentMeta {
    /// Whether the name was generated because the part had none.
    pub fn has_generated_name(&self) -> bool {
        self.filename == generated_name(self.index)
    }
}

/// Name given to attachments without a filename.
pub fn generated_name(index: usize) -> String {
    format!("attachment_{index}")
}
