//! Message metadata as read from a mailbox.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use super::address::EmailAddress;

/// Header-level metadata for a single message.
///
/// Built from the headers only; attachments are listed later, once a
/// message passes the cheap date and label checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailEntry {
    /// Byte offset of the message start inside the MBOX file
    /// (points to the `From ` separator line).
    pub offset: u64,

    /// Total byte length of the message.
    pub length: u64,

    /// Receipt date from the `Date:` header, Unix epoch if unparseable.
    pub date: DateTime<Utc>,

    /// Offset of the `Date:` header from UTC, in seconds.
    #[serde(default)]
    pub utc_offset_secs: i32,

    /// Sender (first `From:` header).
    pub from: EmailAddress,

    /// Primary recipients (`To:`), truncated to the first 5.
    pub to: Vec<EmailAddress>,

    /// Decoded subject line (RFC 2047 encoded-words resolved).
    pub subject: String,

    /// The `Message-ID` header value, angle brackets included. May be empty.
    pub message_id: String,

    /// Whether the top-level structure suggests attachments
    /// (`multipart/mixed` or an `attachment` disposition).
    pub has_attachments: bool,

    /// Top-level `Content-Type` of the message.
    pub content_type: String,

    /// Gmail labels from the `X-Gmail-Labels` header.
    pub labels: Vec<String>,

    /// Sequential index within the MBOX (0, 1, 2, …).
    pub sequence: u64,
}

impl MailEntry {
    /// The receipt date in the sender's own offset; UTC if the offset is
    /// out of range.
    pub fn local_date(&self) -> DateTime<FixedOffset> {
        let offset = FixedOffset::east_opt(self.utc_offset_secs).unwrap_or(Utc.fix());
        self.date.with_timezone(&offset)
    }
}
