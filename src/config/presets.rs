//! Built-in example configurations.
//!
//! Pick one with `invoice-archiver presets <name> --write`, then replace
//! the folder id with a real one and adjust the rest as needed.

use crate::error::{ArchiveError, Result};

use super::archive::ArchiveConfig;

/// Folder id used by the examples; replace it with a real one.
pub const EXAMPLE_FOLDER_ID: &str = "1a2b3c4d5e6f7g8h9i0j";

/// A named example configuration.
#[derive(Debug, Clone)]
pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    /// What a saved attachment ends up being called.
    pub example_name: &'static str,
    pub archive: ArchiveConfig,
}

fn keywords(list: &[&str]) -> Vec<String> {
    list.iter().map(|k| k.to_string()).collect()
}

/// Storage root, invoice keywords, one week, `{date}_{original}`.
pub fn basic() -> ArchiveConfig {
    ArchiveConfig {
        drive_folder_id: String::new(),
        search_keywords: keywords(&["請求書", "Invoice", "御請求書"]),
        processed_label: "請求書/処理済み".to_string(),
        search_days: 7,
        file_name_format: "{date}_{original}".to_string(),
    }
}

/// Every preset, in display order.
pub fn all() -> Vec<Preset> {
    vec![
        Preset {
            name: "basic",
            description: "Save to the storage root as date + original name",
            example_name: "2024-01-15_invoice.pdf",
            archive: basic(),
        },
        Preset {
            name: "dated-subject",
            description: "Save to a specific folder as date + subject",
            example_name: "2024-01-15_クラウドサービス請求書.pdf",
            archive: ArchiveConfig {
                drive_folder_id: EXAMPLE_FOLDER_ID.to_string(),
                search_keywords: keywords(&["請求書", "Invoice"]),
                processed_label: "請求書/処理済み".to_string(),
                search_days: 7,
                file_name_format: "{date}_{subject}".to_string(),
            },
        },
        Preset {
            name: "by-sender",
            description: "Only process mail from specific senders, last 30 days",
            example_name: "billing_2024-01-15_invoice.pdf",
            archive: ArchiveConfig {
                drive_folder_id: EXAMPLE_FOLDER_ID.to_string(),
                search_keywords: keywords(&[
                    "from:billing@example.com",
                    "from:invoice@company.co.jp",
                ]),
                processed_label: "請求書/処理済み".to_string(),
                search_days: 30,
                file_name_format: "{sender}_{date}_{original}".to_string(),
            },
        },
        Preset {
            name: "monthly",
            description: "Monthly run covering a full month of statements",
            example_name: "2024-01-15_company_invoice.pdf",
            archive: ArchiveConfig {
                drive_folder_id: EXAMPLE_FOLDER_ID.to_string(),
                search_keywords: keywords(&["請求書", "Invoice", "明細書", "Statement"]),
                processed_label: "経理/処理済み".to_string(),
                search_days: 31,
                file_name_format: "{date}_{sender}_{original}".to_string(),
            },
        },
        Preset {
            name: "date-only",
            description: "Date only (several attachments on one day share a name)",
            example_name: "2024-01-15.pdf",
            archive: ArchiveConfig {
                drive_folder_id: String::new(),
                search_keywords: keywords(&["請求書"]),
                processed_label: "処理済み".to_string(),
                search_days: 7,
                file_name_format: "{date}".to_string(),
            },
        },
        Preset {
            name: "detailed",
            description: "Date, sender and subject in the filename",
            example_name: "2024-01-15_company_1月分請求書.pdf",
            archive: ArchiveConfig {
                drive_folder_id: EXAMPLE_FOLDER_ID.to_string(),
                search_keywords: keywords(&["請求書", "Invoice"]),
                processed_label: "請求書/自動保存済み".to_string(),
                search_days: 14,
                file_name_format: "{date}_{sender}_{subject}".to_string(),
            },
        },
    ]
}

/// Look up a preset by name.
pub fn find(name: &str) -> Result<Preset> {
    all()
        .into_iter()
        .find(|p| p.name == name)
        .ok_or_else(|| ArchiveError::UnknownPreset(name.to_string()))
}

/// Preset names, in display order.
pub fn names() -> Vec<&'static str> {
    all().into_iter().map(|p| p.name).collect()
}
