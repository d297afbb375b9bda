//! The archive job configuration and its load-time validation.
//!
//! [`ArchiveConfig`] is the hand-edited `[archive]` table, loosely typed so
//! that every mistake reaches [`ArchiveConfig::validate`] and is reported
//! together. [`ValidatedConfig`] is the only form the pipeline accepts.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ArchiveError, FieldError, FieldErrors, Result};
use crate::label::LabelPath;
use crate::search::keyword::KeywordExpr;
use crate::template::FileNameFormat;

use super::presets;

/// Longest accepted lookback window, about a hundred years.
pub const MAX_SEARCH_DAYS: u32 = 36_500;

/// The `[archive]` table as written by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Storage folder id. Empty means the storage root.
    pub drive_folder_id: String,
    /// Search keywords, OR-combined. Each may use operators (`from:...`).
    pub search_keywords: Vec<String>,
    /// Label applied to processed messages, `/`-separated.
    pub processed_label: String,
    /// Lookback window in days.
    pub search_days: i64,
    /// Attachment filename template.
    pub file_name_format: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        presets::basic()
    }
}

/// A configuration that passed validation. Immutable.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    drive_folder_id: Option<String>,
    keywords: Vec<KeywordExpr>,
    processed_label: LabelPath,
    search_days: u32,
    file_name_format: FileNameFormat,
    warnings: Vec<String>,
}

impl ArchiveConfig {
    /// Check every field, collecting all violations.
    pub fn validate(&self) -> Result<ValidatedConfig> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let drive_folder_id = match validate_folder_id(&self.drive_folder_id) {
            Ok(id) => id,
            Err(e) => {
                errors.push(e);
                None
            }
        };

        let keywords = validate_keywords(&self.search_keywords, &mut errors);

        let processed_label = match LabelPath::parse(&self.processed_label) {
            Ok(label) => Some(label),
            Err(ArchiveError::InvalidLabel { reason, .. }) => {
                errors.push(FieldError::new(
                    "processed_label",
                    format!("'{}' {reason}", self.processed_label),
                ));
                None
            }
            Err(e) => return Err(e),
        };

        let search_days = match u32::try_from(self.search_days) {
            Ok(days) if (1..=MAX_SEARCH_DAYS).contains(&days) => Some(days),
            _ if self.search_days < 1 => {
                errors.push(FieldError::new(
                    "search_days",
                    format!("must be at least 1, got {}", self.search_days),
                ));
                None
            }
            _ => {
                errors.push(FieldError::new(
                    "search_days",
                    format!(
                        "{} is too large (at most {MAX_SEARCH_DAYS})",
                        self.search_days
                    ),
                ));
                None
            }
        };

        let file_name_format = FileNameFormat::parse(&self.file_name_format);
        if self.file_name_format.trim().is_empty() {
            errors.push(FieldError::new("file_name_format", "must not be empty"));
        }
        for token in file_name_format.unknown_tokens() {
            let message = format!(
                "file_name_format: unknown placeholder {token} will be kept literally \
                 (known: {{date}}, {{subject}}, {{sender}}, {{original}})"
            );
            warn!(token = %token, "Unknown placeholder in file_name_format");
            warnings.push(message);
        }
        if !file_name_format.uses(crate::template::Placeholder::Original)
            && !file_name_format.uses(crate::template::Placeholder::Subject)
        {
            warnings.push(
                "file_name_format: names may collide when one day has several attachments"
                    .to_string(),
            );
        }

        match (processed_label, search_days) {
            (Some(processed_label), Some(search_days)) if errors.is_empty() => {
                Ok(ValidatedConfig {
                    drive_folder_id,
                    keywords,
                    processed_label,
                    search_days,
                    file_name_format,
                    warnings,
                })
            }
            _ => Err(ArchiveError::InvalidConfig(FieldErrors(errors))),
        }
    }
}

/// Empty → `None`; otherwise ASCII alphanumerics, `-` and `_` only.
fn validate_folder_id(raw: &str) -> std::result::Result<Option<String>, FieldError> {
    let id = raw.trim();
    if id.is_empty() {
        return Ok(None);
    }
    match id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        Some(bad) => Err(FieldError::new(
            "drive_folder_id",
            format!("'{raw}' contains invalid character '{bad}'"),
        )),
        None => Ok(Some(id.to_string())),
    }
}

fn validate_keywords(raw: &[String], errors: &mut Vec<FieldError>) -> Vec<KeywordExpr> {
    if raw.is_empty() {
        errors.push(FieldError::new(
            "search_keywords",
            "must contain at least one keyword",
        ));
        return Vec::new();
    }

    let mut parsed = Vec::with_capacity(raw.len());
    for (i, keyword) in raw.iter().enumerate() {
        if keyword.trim().is_empty() {
            errors.push(FieldError::new(
                "search_keywords",
                format!("entry {} is blank", i + 1),
            ));
            continue;
        }
        let expr = KeywordExpr::parse(keyword);
        if expr.is_empty() {
            errors.push(FieldError::new(
                "search_keywords",
                format!("entry {} ('{keyword}') has no searchable terms", i + 1),
            ));
            continue;
        }
        parsed.push(expr);
    }
    parsed
}

impl ValidatedConfig {
    /// Folder id, or `None` for the storage root.
    pub fn drive_folder_id(&self) -> Option<&str> {
        self.drive_folder_id.as_deref()
    }

    pub fn keywords(&self) -> &[KeywordExpr] {
        &self.keywords
    }

    pub fn processed_label(&self) -> &LabelPath {
        &self.processed_label
    }

    pub fn search_days(&self) -> u32 {
        self.search_days
    }

    pub fn file_name_format(&self) -> &FileNameFormat {
        &self.file_name_format
    }

    /// Non-fatal findings (unknown placeholders, collision-prone formats).
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors_of(cfg: &ArchiveConfig) -> Vec<FieldError> {
        match cfg.validate() {
            Err(ArchiveError::InvalidConfig(FieldErrors(errs))) => errs,
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
    }

    #[test]
    fn test_default_is_valid() {
        let v = ArchiveConfig::default().validate().unwrap();
        assert_eq!(v.drive_folder_id(), None);
        assert_eq!(v.search_days(), 7);
        assert_eq!(v.processed_label().as_str(), "請求書/処理済み");
        assert_eq!(v.keywords().len(), 3);
        assert_eq!(v.file_name_format().as_str(), "{date}_{original}");
    }

    #[test]
    fn test_zero_days_rejected() {
        let cfg = ArchiveConfig {
            search_days: 0,
            ..ArchiveConfig::default()
        };
        let errs = errors_of(&cfg);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].field, "search_days");
        assert!(errs[0].message.contains("got 0"));
    }

    #[test]
    fn test_negative_days_rejected() {
        let cfg = ArchiveConfig {
            search_days: -3,
            ..ArchiveConfig::default()
        };
        assert_eq!(errors_of(&cfg)[0].field, "search_days");
    }

    #[test]
    fn test_huge_days_rejected() {
        for days in [
            i64::from(MAX_SEARCH_DAYS) + 1,
            1_000_000_000,
            i64::from(u32::MAX) + 1,
        ] {
            let cfg = ArchiveConfig {
                search_days: days,
                ..ArchiveConfig::default()
            };
            let errs = errors_of(&cfg);
            assert_eq!(errs[0].field, "search_days");
            assert!(errs[0].message.contains("too large"));
        }
    }

    #[test]
    fn test_max_days_accepted() {
        let cfg = ArchiveConfig {
            search_days: i64::from(MAX_SEARCH_DAYS),
            ..ArchiveConfig::default()
        };
        assert_eq!(cfg.validate().unwrap().search_days(), MAX_SEARCH_DAYS);
    }

    #[test]
    fn test_bad_label_rejected() {
        let cfg = ArchiveConfig {
            processed_label: "請求書//処理済み".to_string(),
            ..ArchiveConfig::default()
        };
        let errs = errors_of(&cfg);
        assert_eq!(errs[0].field, "processed_label");
        assert!(errs[0].message.contains("empty level"));
    }

    #[test]
    fn test_bad_folder_id_rejected() {
        let cfg = ArchiveConfig {
            drive_folder_id: "../etc".to_string(),
            ..ArchiveConfig::default()
        };
        assert_eq!(errors_of(&cfg)[0].field, "drive_folder_id");
    }

    #[test]
    fn test_folder_id_accepted() {
        let cfg = ArchiveConfig {
            drive_folder_id: "1a2b3c4d5e6f7g8h9i0j".to_string(),
            ..ArchiveConfig::default()
        };
        let v = cfg.validate().unwrap();
        assert_eq!(v.drive_folder_id(), Some("1a2b3c4d5e6f7g8h9i0j"));
    }

    #[test]
    fn test_keywords_rules() {
        let none = ArchiveConfig {
            search_keywords: vec![],
            ..ArchiveConfig::default()
        };
        assert_eq!(errors_of(&none)[0].field, "search_keywords");

        let blank = ArchiveConfig {
            search_keywords: vec!["Invoice".to_string(), "  ".to_string()],
            ..ArchiveConfig::default()
        };
        assert!(errors_of(&blank)[0].message.contains("entry 2 is blank"));

        let no_terms = ArchiveConfig {
            search_keywords: vec!["-".to_string()],
            ..ArchiveConfig::default()
        };
        assert!(errors_of(&no_terms)[0].message.contains("no searchable terms"));
    }

    #[test]
    fn test_all_errors_collected() {
        let cfg = ArchiveConfig {
            drive_folder_id: "has space".to_string(),
            search_keywords: vec![],
            processed_label: String::new(),
            search_days: 0,
            file_name_format: " ".to_string(),
        };
        let fields: Vec<&str> = errors_of(&cfg).iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "drive_folder_id",
                "search_keywords",
                "processed_label",
                "search_days",
                "file_name_format"
            ]
        );
    }

    #[test]
    fn test_unknown_placeholder_is_warning_only() {
        let cfg = ArchiveConfig {
            file_name_format: "{date}_{unknown}_{original}".to_string(),
            ..ArchiveConfig::default()
        };
        let v = cfg.validate().unwrap();
        assert_eq!(v.warnings().len(), 1);
        assert!(v.warnings()[0].contains("{unknown}"));
    }

    #[test]
    fn test_date_only_format_warns_about_collisions() {
        let cfg = ArchiveConfig {
            file_name_format: "{date}".to_string(),
            ..ArchiveConfig::default()
        };
        let v = cfg.validate().unwrap();
        assert!(v.warnings().iter().any(|w| w.contains("collide")));
    }
}
