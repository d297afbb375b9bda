//! MIME attachment listing and extraction, backed by `mail-parser`.

use mail_parser::{MessageParser, MimeHeaders};

use crate::error::{ArchiveError, Result};
use crate::model::attachment::{generated_name, AttachmentMeta};
use crate::parser::mbox::strip_bom;

/// List the attachments of a raw message without keeping their content.
///
/// An unparseable message yields an empty list.
pub fn list_attachments(raw_message: &[u8]) -> Vec<AttachmentMeta> {
    let bytes = skip_from_line(raw_message);
    match MessageParser::default().parse(bytes) {
        Some(msg) => msg
            .attachments()
            .enumerate()
            .map(|(index, part)| AttachmentMeta {
                index,
                filename: part
                    .attachment_name()
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| generated_name(index)),
                content_type: part
                    .content_type()
                    .map(|ct| match ct.subtype() {
                        Some(sub) => format!("{}/{}", ct.ctype(), sub),
                        None => ct.ctype().to_string(),
                    })
                    .unwrap_or_else(|| "application/octet-stream".to_string()),
                size: part.contents().len() as u64,
                is_inline: part
                    .content_disposition()
                    .map(|d| d.ctype().eq_ignore_ascii_case("inline"))
                    .unwrap_or(false),
            })
            .collect(),
        None => Vec::new(),
    }
}

/// Decode the content of the attachment at `attachment.index`.
pub fn extract_attachment(raw_message: &[u8], attachment: &AttachmentMeta) -> Result<Vec<u8>> {
    let bytes = skip_from_line(raw_message);
    let msg = MessageParser::default().parse(bytes).ok_or_else(|| {
        ArchiveError::MimeError("Failed to parse message for attachment extraction".into())
    })?;

    msg.attachments()
        .nth(attachment.index)
        .map(|part| part.contents().to_vec())
        .ok_or_else(|| {
            ArchiveError::MimeError(format!(
                "Attachment #{} '{}' not found in message",
                attachment.index, attachment.filename
            ))
        })
}

/// Skip the `From ` separator line of an MBOX message.
fn skip_from_line(data: &[u8]) -> &[u8] {
    let data = strip_bom(data);
    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSAGE: &[u8] = b"From billing@example.com Mon Jan 15 09:30:00 2024\r\n\
From: Billing <billing@example.com>\r\n\
Subject: Invoice\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"XYZ\"\r\n\
\r\n\
--XYZ\r\n\
Content-Type: text/plain\r\n\
\r\n\
Please find the invoice attached.\r\n\
--XYZ\r\n\
Content-Type: application/pdf; name=\"invoice.pdf\"\r\n\
Content-Disposition: attachment; filename=\"invoice.pdf\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
JVBERi0xLjQK\r\n\
--XYZ\r\n\
Content-Type: text/csv; name=\"detail.csv\"\r\n\
Content-Disposition: attachment; filename=\"detail.csv\"\r\n\
\r\n\
item,amount\r\n\
--XYZ--\r\n";

    #[test]
    fn test_skip_from_line() {
        assert!(skip_from_line(MESSAGE).starts_with(b"From: Billing"));
        let bare = b"Subject: x\n\nbody";
        assert_eq!(skip_from_line(bare), bare);
    }

    #[test]
    fn test_list_attachments() {
        let atts = list_attachments(MESSAGE);
        assert_eq!(atts.len(), 2);
        assert_eq!(atts[0].filename, "invoice.pdf");
        assert_eq!(atts[0].content_type, "application/pdf");
        assert_eq!(atts[0].index, 0);
        assert!(!atts[0].is_inline);
        assert_eq!(atts[1].filename, "detail.csv");
        assert_eq!(atts[1].index, 1);
    }

    #[test]
    fn test_extract_attachment() {
        let atts = list_attachments(MESSAGE);
        let pdf = extract_attachment(MESSAGE, &atts[0]).unwrap();
        assert_eq!(pdf, b"%PDF-1.4\n");
    }

    #[test]
    fn test_extract_missing_index() {
        let missing = AttachmentMeta {
            index: 9,
            filename: "nope.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            size: 0,
            is_inline: false,
        };
        assert!(extract_attachment(MESSAGE, &missing).is_err());
    }

    #[test]
    fn test_plain_message_has_no_attachments() {
        let plain = b"From: a@b.com\nSubject: hi\n\nJust text\n";
        assert!(list_attachments(plain).is_empty());
    }
}
