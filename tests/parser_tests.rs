//! Integration tests for the MBOX scanner, header decoding, and message store.

use std::path::Path;

use invoice_archiver::model::mail::MailEntry;
use invoice_archiver::parser::header::{decode_encoded_words, parse_date, parse_headers_to_entry};
use invoice_archiver::parser::mbox::MboxParser;
use invoice_archiver::store::reader::MboxStore;

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn scan(path: &Path) -> Vec<MailEntry> {
    let parser = MboxParser::new(path).unwrap();
    let mut entries = Vec::new();
    parser
        .scan_headers(
            &mut |offset, length, headers| {
                let seq = entries.len() as u64;
                entries.push(parse_headers_to_entry(headers, offset, length, seq));
                true
            },
            None,
        )
        .unwrap();
    entries
}

// ─── Scan invoices.mbox → exactly 6 messages ────────────────────────

#[test]
fn test_scan_message_count() {
    let parser = MboxParser::new(fixture("invoices.mbox")).unwrap();
    let mut count: u64 = 0;
    let delivered = parser
        .scan_headers(
            &mut |_offset, _length, _headers| {
                count += 1;
                true
            },
            None,
        )
        .unwrap();
    assert_eq!(count, 6, "invoices.mbox should contain exactly 6 messages");
    assert_eq!(delivered, 6);
}

// ─── First message fields ───────────────────────────────────────────

#[test]
fn test_first_message_fields() {
    let entries = scan(&fixture("invoices.mbox"));
    let first = &entries[0];
    assert_eq!(first.offset, 0);
    assert_eq!(first.subject, "請求書");
    assert_eq!(first.from.address, "billing@example.com");
    assert_eq!(first.from.display_name, "Billing");
    assert_eq!(first.message_id, "<inv-001@example.com>");
    assert_eq!(first.date.format("%Y-%m-%d %H:%M").to_string(), "2024-01-15 00:30");
    assert!(first.has_attachments);
}

// ─── Offsets and lengths tile the file ──────────────────────────────

#[test]
fn test_offsets_cover_file() {
    let path = fixture("invoices.mbox");
    let entries = scan(&path);
    let size = std::fs::metadata(&path).unwrap().len();
    for pair in entries.windows(2) {
        assert_eq!(pair[0].offset + pair[0].length, pair[1].offset);
    }
    let last = entries.last().unwrap();
    assert_eq!(last.offset + last.length, size);
}

// ─── Gmail labels header ────────────────────────────────────────────

#[test]
fn test_gmail_labels() {
    let entries = scan(&fixture("invoices.mbox"));
    assert!(entries[0].labels.is_empty());
    assert_eq!(entries[3].labels, vec!["Inbox", "請求書/処理済み"]);
}

// ─── Store: attachment listing and extraction by offset ─────────────

#[test]
fn test_store_attachments() {
    let path = fixture("invoices.mbox");
    let entries = scan(&path);
    let mut store = MboxStore::open(&path).unwrap();

    let names: Vec<String> = store
        .attachments(&entries[1])
        .unwrap()
        .iter()
        .map(|a| a.filename.clone())
        .collect();
    assert_eq!(names, vec!["invoice.pdf", "detail.csv", "receipt.pdf"]);

    let first = store.attachments(&entries[0]).unwrap()[0].clone();
    assert_eq!(first.content_type, "application/pdf");
    let bytes = store.attachment_bytes(&entries[0], &first).unwrap();
    assert_eq!(bytes, b"%PDF-1.4\n");

    assert!(store.attachments(&entries[5]).unwrap().is_empty());

    let raw = store.raw_message(&entries[0]).unwrap();
    assert!(raw.starts_with(b"From billing@example.com"));
}

// ─── Empty file → 0 messages, no error ──────────────────────────────

#[test]
fn test_scan_empty_mbox() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    assert!(scan(tmp.path()).is_empty());
}

// ─── Missing file ───────────────────────────────────────────────────

#[test]
fn test_missing_file() {
    assert!(MboxParser::new("/nonexistent/mail.mbox").is_err());
    assert!(MboxStore::open("/nonexistent/mail.mbox").is_err());
}

// ─── Header helpers ─────────────────────────────────────────────────

#[test]
fn test_decode_and_dates() {
    assert_eq!(decode_encoded_words("=?UTF-8?B?6KuL5rGC5pu4?= 1月分"), "請求書 1月分");
    let date = parse_date("Mon, 15 Jan 2024 09:30:00 +0900").unwrap();
    assert_eq!(date.to_rfc3339(), "2024-01-15T00:30:00+00:00");
}
