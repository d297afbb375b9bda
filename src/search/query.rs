//! The combined archive query.

use chrono::{DateTime, Duration, Utc};

use crate::config::ValidatedConfig;
use crate::label::LabelPath;
use crate::model::attachment::AttachmentMeta;
use crate::model::mail::MailEntry;

use super::keyword::KeywordExpr;

/// Keywords OR-combined, restricted to messages with attachments, inside
/// the lookback window, and not yet carrying the processed label.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    keywords: Vec<KeywordExpr>,
    days: u32,
    processed: LabelPath,
}

impl SearchQuery {
    pub fn new(keywords: Vec<KeywordExpr>, days: u32, processed: LabelPath) -> Self {
        Self {
            keywords,
            days,
            processed,
        }
    }

    pub fn from_config(config: &ValidatedConfig) -> Self {
        Self::new(
            config.keywords().to_vec(),
            config.search_days(),
            config.processed_label().clone(),
        )
    }

    /// Gmail search syntax for this query.
    ///
    /// A single keyword is used as-is; several are grouped with `OR`.
    /// Multi-term keywords get their own parentheses, because `OR` binds
    /// tighter than the implicit AND.
    pub fn to_query_string(&self) -> String {
        let keywords = match self.keywords.as_slice() {
            [] => String::new(),
            [only] => only.as_str().to_string(),
            many => {
                let parts: Vec<String> = many
                    .iter()
                    .map(|k| {
                        if k.is_compound() {
                            format!("({})", k.as_str())
                        } else {
                            k.as_str().to_string()
                        }
                    })
                    .collect();
                format!("({})", parts.join(" OR "))
            }
        };

        let mut query = String::new();
        if !keywords.is_empty() {
            query.push_str(&keywords);
            query.push(' ');
        }
        query.push_str(&format!(
            "has:attachment newer_than:{}d {}",
            self.days,
            self.processed.search_term()
        ));
        query
    }

    pub fn keywords(&self) -> &[KeywordExpr] {
        &self.keywords
    }

    pub fn processed_label(&self) -> &LabelPath {
        &self.processed
    }

    /// Oldest date still inside the window, clamped to the earliest
    /// representable date.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(Duration::days(i64::from(self.days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Messages dated after `now` are inside the window.
    pub fn in_window(&self, entry: &MailEntry, now: DateTime<Utc>) -> bool {
        entry.date >= self.window_start(now)
    }

    /// Whether the mailbox itself already records the processed label.
    pub fn is_processed_by_headers(&self, entry: &MailEntry) -> bool {
        entry
            .labels
            .iter()
            .any(|l| self.processed.matches_header_label(l))
    }

    /// Whether any keyword matches.
    pub fn matches_keywords(&self, entry: &MailEntry, attachments: &[AttachmentMeta]) -> bool {
        self.keywords.iter().any(|k| k.matches(entry, attachments))
    }

    /// The whole query except the ledger check: window, at least one
    /// non-inline attachment, a matching keyword, no processed header label.
    pub fn matches(
        &self,
        entry: &MailEntry,
        attachments: &[AttachmentMeta],
        now: DateTime<Utc>,
    ) -> bool {
        self.in_window(entry, now)
            && attachments.iter().any(|a| !a.is_inline)
            && !self.is_processed_by_headers(entry)
            && self.matches_keywords(entry, attachments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArchiveConfig;
    use crate::model::address::EmailAddress;
    use chrono::TimeZone;

    fn query(keywords: &[&str], days: u32, label: &str) -> SearchQuery {
        SearchQuery::new(
            keywords.iter().map(|k| KeywordExpr::parse(k)).collect(),
            days,
            LabelPath::parse(label).unwrap(),
        )
    }

    fn dated(date: DateTime<Utc>, labels: &[&str]) -> MailEntry {
        MailEntry {
            offset: 0,
            length: 1,
            date,
            utc_offset_secs: 0,
            from: EmailAddress::parse("billing@example.com"),
            to: Vec::new(),
            subject: "請求書".to_string(),
            message_id: String::new(),
            has_attachments: true,
            content_type: "multipart/mixed".to_string(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            sequence: 0,
        }
    }

    #[test]
    fn test_query_string_default_config() {
        let v = ArchiveConfig::default().validate().unwrap();
        assert_eq!(
            SearchQuery::from_config(&v).to_query_string(),
            "(請求書 OR Invoice OR 御請求書) has:attachment newer_than:7d -label:請求書-処理済み"
        );
    }

    #[test]
    fn test_query_string_single_keyword() {
        let q = query(&["from:billing@example.com"], 30, "処理済み");
        assert_eq!(
            q.to_query_string(),
            "from:billing@example.com has:attachment newer_than:30d -label:処理済み"
        );
    }

    #[test]
    fn test_query_string_groups_compound_keywords() {
        let q = query(&["請求書 from:example.com", "Invoice"], 7, "a/b");
        assert_eq!(
            q.to_query_string(),
            "((請求書 from:example.com) OR Invoice) has:attachment newer_than:7d -label:a-b"
        );
    }

    #[test]
    fn test_window() {
        let now = Utc.with_ymd_and_hms(2024, 1, 20, 12, 0, 0).unwrap();
        let q = query(&["請求書"], 7, "done");
        assert_eq!(
            q.window_start(now),
            Utc.with_ymd_and_hms(2024, 1, 13, 12, 0, 0).unwrap()
        );
        assert!(q.in_window(&dated(Utc.with_ymd_and_hms(2024, 1, 13, 12, 0, 0).unwrap(), &[]), now));
        assert!(q.in_window(&dated(Utc.with_ymd_and_hms(2024, 1, 21, 0, 0, 0).unwrap(), &[]), now));
        assert!(!q.in_window(&dated(Utc.with_ymd_and_hms(2024, 1, 13, 11, 59, 59).unwrap(), &[]), now));
    }

    #[test]
    fn test_window_start_clamps_instead_of_overflowing() {
        let now = Utc.with_ymd_and_hms(2024, 1, 20, 12, 0, 0).unwrap();
        let q = query(&["請求書"], u32::MAX, "done");
        assert_eq!(q.window_start(now), DateTime::<Utc>::MIN_UTC);
        assert!(q.in_window(&dated(DateTime::UNIX_EPOCH, &[]), now));

        let cfg = ArchiveConfig {
            search_days: i64::from(crate::config::archive::MAX_SEARCH_DAYS),
            ..ArchiveConfig::default()
        };
        let v = cfg.validate().unwrap();
        let start = SearchQuery::from_config(&v).window_start(now);
        assert_eq!(start.format("%Y").to_string(), "1924");
    }

    #[test]
    fn test_processed_by_headers() {
        let q = query(&["請求書"], 7, "請求書/処理済み");
        let date = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        assert!(q.is_processed_by_headers(&dated(date, &["Inbox", "請求書/処理済み"])));
        assert!(!q.is_processed_by_headers(&dated(date, &["請求書"])));
    }

    #[test]
    fn test_matches_any_keyword() {
        let q = query(&["Invoice", "請求書"], 7, "done");
        let date = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        assert!(q.matches_keywords(&dated(date, &[]), &[]));
    }

    #[test]
    fn test_matches_requires_real_attachment() {
        let q = query(&["請求書"], 7, "done");
        let now = Utc.with_ymd_and_hms(2024, 1, 16, 0, 0, 0).unwrap();
        let entry = dated(Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(), &[]);
        let mut att = AttachmentMeta {
            index: 0,
            filename: "invoice.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            size: 10,
            is_inline: false,
        };
        assert!(q.matches(&entry, std::slice::from_ref(&att), now));
        assert!(!q.matches(&entry, &[], now));
        att.is_inline = true;
        assert!(!q.matches(&entry, &[att], now));
    }
}
