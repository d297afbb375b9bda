//! RFC 5322 header parsing: folding, encoded-words (RFC 2047), and dates.

use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use tracing::{debug, warn};

use crate::model::address::EmailAddress;
use crate::model::mail::MailEntry;
use crate::parser::mbox::strip_bom;

/// Encoded-words in the wild often drop the `=` padding.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &base64::alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Build a [`MailEntry`] from a raw header block (the `From ` line may be included).
pub fn parse_headers_to_entry(
    raw_headers: &[u8],
    offset: u64,
    message_length: u64,
    sequence: u64,
) -> MailEntry {
    let text = decode_header_bytes(raw_headers);
    let headers = unfold_headers(&text);
    let get = |name: &str| get_header(&headers, name);

    let (date, utc_offset_secs) = get("date")
        .and_then(parse_date_with_offset)
        .map(|dt| (dt.with_timezone(&Utc), dt.offset().local_minus_utc()))
        .unwrap_or((DateTime::UNIX_EPOCH, 0));

    let from = EmailAddress::parse(&decode_encoded_words(get("from").unwrap_or_default()));

    let mut to = EmailAddress::parse_list(&decode_encoded_words(get("to").unwrap_or_default()));
    to.truncate(5);

    let subject = decode_encoded_words(get("subject").unwrap_or_default());

    let message_id = get("message-id")
        .map(extract_angle_bracket)
        .unwrap_or_default();

    let content_type = get("content-type")
        .map(|ct| ct.split(';').next().unwrap_or("").trim().to_lowercase())
        .unwrap_or_else(|| "text/plain".to_string());

    let has_attachments = content_type.starts_with("multipart/mixed")
        || headers
            .iter()
            .any(|(k, v)| k == "content-disposition" && v.to_lowercase().contains("attachment"));

    let labels = get("x-gmail-labels")
        .map(|s| {
            decode_encoded_words(s)
                .split(',')
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect()
        })
        .unwrap_or_default();

    MailEntry {
        offset,
        length: message_length,
        date,
        utc_offset_secs,
        from,
        to,
        subject,
        message_id,
        has_attachments,
        content_type,
        labels,
        sequence,
    }
}

/// Decode header bytes: UTF-8 when valid, Windows-1252 otherwise.
fn decode_header_bytes(bytes: &[u8]) -> String {
    let bytes = strip_bom(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
    }
}

/// Join continuation lines and return `(lowercase_name, value)` pairs.
///
/// Lines that are neither a `Name: value` header nor a continuation
/// (such as the `From ` separator) are skipped.
fn unfold_headers(text: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some((_, value)) = result.last_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
        } else if let Some((name, value)) = line.split_once(':') {
            if name.contains(' ') {
                continue;
            }
            result.push((name.trim().to_lowercase(), value.trim().to_string()));
        }
    }

    result
}

fn get_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

/// Decode RFC 2047 encoded-words in a header value.
///
/// `"=?UTF-8?B?6KuL5rGC5pu4?="` → `"請求書"`. Whitespace between two
/// adjacent encoded-words is dropped; undecodable tokens are kept as-is.
pub fn decode_encoded_words(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut remaining = input;
    let mut last_was_encoded = false;

    while let Some(start) = remaining.find("=?") {
        let before = &remaining[..start];
        if !last_was_encoded || !before.trim().is_empty() {
            result.push_str(before);
        }

        match decode_one_word(&remaining[start + 2..]) {
            Some((text, consumed)) => {
                result.push_str(&text);
                remaining = &remaining[start + 2 + consumed..];
                last_was_encoded = true;
            }
            None => {
                result.push_str("=?");
                remaining = &remaining[start + 2..];
                last_was_encoded = false;
            }
        }
    }

    result.push_str(remaining);
    result
}

/// Decode `charset?enc?text?=` and return the text plus bytes consumed.
fn decode_one_word(s: &str) -> Option<(String, usize)> {
    let (charset, rest) = s.split_once('?')?;
    let (encoding, rest) = rest.split_once('?')?;
    let end = rest.find("?=")?;
    let encoded = &rest[..end];
    let consumed = charset.len() + 1 + encoding.len() + 1 + end + 2;

    let bytes = match encoding {
        "B" | "b" => LENIENT_BASE64.decode(encoded).ok()?,
        "Q" | "q" => decode_q_encoding(encoded),
        _ => return None,
    };

    Some((decode_charset(charset, &bytes), consumed))
}

/// Q-encoding: `_` is a space, `=XX` a hex byte.
fn decode_q_encoding(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => out.push(b' '),
            b'=' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(b) => {
                        out.push(b);
                        i += 3;
                        continue;
                    }
                    None => out.push(b'='),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    out
}

fn decode_charset(charset: &str, bytes: &[u8]) -> String {
    // RFC 2231 language suffix: "utf-8*ja"
    let label = charset.split('*').next().unwrap_or(charset);
    match encoding_rs::Encoding::for_label(label.as_bytes()) {
        Some(encoding) => encoding.decode(bytes).0.into_owned(),
        None => {
            warn!(charset, "Unknown charset, falling back to UTF-8 lossy");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// Keep the `<...>` part of a Message-ID header.
fn extract_angle_bracket(s: &str) -> String {
    let trimmed = s.trim();
    if let Some(start) = trimmed.find('<') {
        if let Some(len) = trimmed[start..].find('>') {
            return trimmed[start..=start + len].to_string();
        }
    }
    trimmed.to_string()
}

/// Parse a `Date:` header value into UTC.
pub fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    parse_date_with_offset(date_str).map(|dt| dt.with_timezone(&Utc))
}

/// Parse a `Date:` header value, keeping the sender's offset.
///
/// RFC 2822 and RFC 3339 first, then a few common broken variants
/// (missing weekday, named zones, no zone). A missing zone is read as UTC.
pub fn parse_date_with_offset(date_str: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Trailing comments such as "(JST)" confuse every parser
    let trimmed = match trimmed.find(" (") {
        Some(pos) if trimmed.ends_with(')') => trimmed[..pos].trim(),
        _ => trimmed,
    };

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt);
    }

    let no_dow = strip_day_of_week(trimmed);
    let candidate = replace_named_tz(no_dow);

    const WITH_ZONE: [&str; 3] = [
        "%d %b %Y %H:%M:%S %z",
        "%d %b %Y %H:%M %z",
        "%Y-%m-%d %H:%M:%S %z",
    ];
    const WITHOUT_ZONE: [&str; 3] = ["%d %b %Y %H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S"];

    for fmt in WITH_ZONE {
        if let Ok(dt) = DateTime::parse_from_str(&candidate, fmt) {
            return Some(dt);
        }
    }
    for fmt in WITHOUT_ZONE {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(&candidate, fmt) {
            return Some(ndt.and_utc().fixed_offset());
        }
    }

    debug!(date = trimmed, "Could not parse date");
    None
}

/// Drop a leading `Mon, ` / `Mon ` weekday.
fn strip_day_of_week(s: &str) -> &str {
    const DAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
    for day in DAYS {
        if let Some(rest) = s.strip_prefix(day) {
            return rest.trim_start_matches(',').trim_start();
        }
    }
    s
}

/// Replace a trailing zone abbreviation with its numeric offset.
fn replace_named_tz(s: &str) -> String {
    const ZONES: [(&str, &str); 10] = [
        ("UTC", "+0000"),
        ("GMT", "+0000"),
        ("JST", "+0900"),
        ("KST", "+0900"),
        ("EST", "-0500"),
        ("EDT", "-0400"),
        ("PST", "-0800"),
        ("PDT", "-0700"),
        ("CET", "+0100"),
        ("CEST", "+0200"),
    ];
    for (name, offset) in ZONES {
        if let Some(head) = s.strip_suffix(name) {
            if head.ends_with(' ') {
                return format!("{head}{offset}");
            }
        }
    }
    s.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base64_japanese_subject() {
        assert_eq!(decode_encoded_words("=?UTF-8?B?6KuL5rGC5pu4?="), "請求書");
    }

    #[test]
    fn test_decode_unpadded_base64() {
        // "Hola" without its trailing "=="
        assert_eq!(decode_encoded_words("=?UTF-8?B?SG9sYQ?="), "Hola");
    }

    #[test]
    fn test_decode_q_encoded_word() {
        assert_eq!(decode_encoded_words("=?ISO-8859-1?Q?caf=E9?="), "café");
        assert_eq!(decode_encoded_words("=?UTF-8?Q?Invoice_No=2E_42?="), "Invoice No. 42");
    }

    #[test]
    fn test_adjacent_words_join_without_space() {
        let input = "=?UTF-8?B?6KuL5rGC?= =?UTF-8?B?5pu4?=";
        assert_eq!(decode_encoded_words(input), "請求書");
    }

    #[test]
    fn test_mixed_plain_and_encoded() {
        assert_eq!(
            decode_encoded_words("Re: =?UTF-8?B?6KuL5rGC5pu4?= (January)"),
            "Re: 請求書 (January)"
        );
    }

    #[test]
    fn test_invalid_word_kept() {
        assert_eq!(decode_encoded_words("=?bogus"), "=?bogus");
    }

    #[test]
    fn test_unfold_headers() {
        let headers = unfold_headers("Subject: A long\n\tsubject\nFrom: a@b.com\n");
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0], ("subject".to_string(), "A long subject".to_string()));
    }

    #[test]
    fn test_parse_date_rfc2822() {
        let dt = parse_date("Mon, 15 Jan 2024 09:30:00 +0900").unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2024-01-15 00:30");
    }

    #[test]
    fn test_parse_date_with_comment_and_named_zone() {
        assert!(parse_date("Mon, 15 Jan 2024 09:30:00 +0900 (JST)").is_some());
        assert!(parse_date("15 Jan 2024 09:30:00 JST").is_some());
    }

    #[test]
    fn test_parse_date_iso() {
        assert!(parse_date("2024-01-15T09:30:00Z").is_some());
        assert!(parse_date("2024-01-15 09:30:00").is_some());
    }

    #[test]
    fn test_parse_date_garbage() {
        assert!(parse_date("").is_none());
        assert!(parse_date("yesterday").is_none());
    }

    #[test]
    fn test_parse_headers_to_entry() {
        let raw = b"From billing@example.com Mon Jan 15 09:30:00 2024\n\
From: =?UTF-8?B?6KuL5rGC5pu4?= <billing@example.com>\n\
To: me@example.org\n\
Subject: =?UTF-8?B?6KuL5rGC5pu4?=\n\
Date: Mon, 15 Jan 2024 09:30:00 +0000\n\
Message-ID: <inv-1@example.com>\n\
Content-Type: multipart/mixed; boundary=\"b\"\n\
X-Gmail-Labels: Inbox,=?UTF-8?B?6KuL5rGC5pu4?=\n";
        let entry = parse_headers_to_entry(raw, 10, 500, 3);
        assert_eq!(entry.offset, 10);
        assert_eq!(entry.length, 500);
        assert_eq!(entry.sequence, 3);
        assert_eq!(entry.from.address, "billing@example.com");
        assert_eq!(entry.from.display_name, "請求書");
        assert_eq!(entry.subject, "請求書");
        assert_eq!(entry.message_id, "<inv-1@example.com>");
        assert!(entry.has_attachments);
        assert_eq!(entry.labels, vec!["Inbox".to_string(), "請求書".to_string()]);
        assert_eq!(entry.date.format("%Y-%m-%d").to_string(), "2024-01-15");
    }

    #[test]
    fn test_entry_keeps_sender_offset() {
        let entry = parse_headers_to_entry(b"Date: Mon, 15 Jan 2024 08:00:00 +0900\n", 0, 10, 0);
        assert_eq!(entry.date.format("%Y-%m-%d %H:%M").to_string(), "2024-01-14 23:00");
        assert_eq!(entry.utc_offset_secs, 9 * 3600);
        assert_eq!(entry.local_date().format("%Y-%m-%d").to_string(), "2024-01-15");

        let named = parse_date_with_offset("15 Jan 2024 08:00:00 JST").unwrap();
        assert_eq!(named.offset().local_minus_utc(), 9 * 3600);
        let bare = parse_date_with_offset("2024-01-15 08:00:00").unwrap();
        assert_eq!(bare.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_entry_without_date_uses_epoch() {
        let entry = parse_headers_to_entry(b"Subject: x\n", 0, 10, 0);
        assert_eq!(entry.date, DateTime::UNIX_EPOCH);
        assert_eq!(entry.utc_offset_secs, 0);
        assert_eq!(entry.content_type, "text/plain");
    }
}
