//! Internationalization (i18n) module.
//!
//! Localized strings for CLI help and output. English is the default;
//! Japanese is available for the mailboxes this tool is usually pointed at.

use std::sync::OnceLock;

static CURRENT_LANG: OnceLock<Lang> = OnceLock::new();

/// Supported languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    /// English (default)
    En,
    /// Japanese
    Ja,
}

impl Lang {
    /// Parse a language code string (e.g. "en", "ja", "en_US", "ja_JP.UTF-8").
    /// Returns `None` for unrecognized codes.
    pub fn from_code(code: &str) -> Option<Self> {
        let normalized = code.to_lowercase();
        let prefix = normalized.split(['_', '-', '.']).next().unwrap_or("");
        match prefix {
            "en" => Some(Self::En),
            "ja" | "jp" => Some(Self::Ja),
            _ => None,
        }
    }

    /// Return the ISO 639-1 code for this language.
    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ja => "ja",
        }
    }
}

/// Initialize the global language. Call once at startup.
/// If already initialized, this is a no-op.
pub fn set_lang(lang: Lang) {
    let _ = CURRENT_LANG.set(lang);
}

/// Get the currently configured language (defaults to English).
pub fn lang() -> Lang {
    CURRENT_LANG.get().copied().unwrap_or(Lang::En)
}

/// Detect language from `INVOICE_ARCHIVER_LANG`, then `LC_MESSAGES` / `LANG`.
pub fn detect_system_lang() -> Lang {
    std::env::var("INVOICE_ARCHIVER_LANG")
        .ok()
        .and_then(|v| Lang::from_code(&v))
        .or_else(|| {
            std::env::var("LC_MESSAGES")
                .ok()
                .and_then(|v| Lang::from_code(&v))
        })
        .or_else(|| std::env::var("LANG").ok().and_then(|v| Lang::from_code(&v)))
        .unwrap_or(Lang::En)
}

/// Macro for defining translatable message functions.
/// Each function returns a `&'static str` based on the current language.
macro_rules! msg {
    ($name:ident, $en:expr, $ja:expr) => {
        /// Returns a localized string for the current language.
        pub fn $name() -> &'static str {
            match lang() {
                Lang::En => $en,
                Lang::Ja => $ja,
            }
        }
    };
}

// ── General ──────────────────────────────────────────────────────

msg!(
    app_about,
    "Save invoice attachments from a mailbox into a storage folder and label the processed mail.",
    "メールボックスから請求書の添付ファイルを保存フォルダに保存し、処理済みラベルを付けます。"
);
msg!(
    app_long_about,
    "invoice-archiver searches a mailbox for messages matching the configured\nkeywords within the last N days, saves their attachments under names\nbuilt from a template ({date}, {subject}, {sender}, {original}),\nand marks each fully saved message with the processed label.",
    "invoice-archiver は、設定したキーワードに一致する過去 N 日間のメールを検索し、\n添付ファイルをテンプレート（{date}、{subject}、{sender}、{original}）で\n組み立てた名前で保存して、保存が完了したメールに処理済みラベルを付けます。"
);
msg!(
    app_after_help,
    "Start with `invoice-archiver presets basic --write`, then `invoice-archiver check`.",
    "まず `invoice-archiver presets basic --write` を実行し、次に `invoice-archiver check` で確認してください。"
);

// ── CLI help strings ─────────────────────────────────────────────

msg!(
    help_verbose,
    "Verbose logging (-v info, -vv debug, -vvv trace)",
    "詳細ログ (-v info, -vv debug, -vvv trace)"
);
msg!(
    help_lang,
    "Language (en, ja). Defaults to system locale",
    "表示言語 (en, ja)。既定はシステムのロケール"
);
msg!(
    help_config,
    "Config file (overrides $INVOICE_ARCHIVER_CONFIG)",
    "設定ファイル ($INVOICE_ARCHIVER_CONFIG より優先)"
);
msg!(
    help_cmd_run,
    "Search the mailbox and archive matching attachments",
    "メールボックスを検索し、一致した添付ファイルを保存する"
);
msg!(
    help_cmd_check,
    "Validate the configuration and show the effective settings",
    "設定を検証し、有効な設定を表示する"
);
msg!(
    help_cmd_query,
    "Print the mail search query built from the configuration",
    "設定から組み立てたメール検索クエリを表示する"
);
msg!(
    help_cmd_preview,
    "Render a filename with the configured format",
    "設定のフォーマットでファイル名を試しに生成する"
);
msg!(
    help_cmd_presets,
    "List example configurations, or print / write one",
    "設定例を一覧表示、または表示・書き出しする"
);
msg!(
    help_cmd_completions,
    "Generate shell completions",
    "シェル補完スクリプトを生成する"
);
msg!(help_cmd_manpage, "Generate a man page", "man ページを生成する");

// ── Run output ───────────────────────────────────────────────────

msg!(msg_scanning, "Scanning", "スキャン中");
msg!(msg_mailbox, "Mailbox", "メールボックス");
msg!(msg_location, "Saved to", "保存先");
msg!(msg_query, "Query", "検索クエリ");
msg!(msg_scanned, "Messages scanned", "走査したメール");
msg!(msg_in_window, "In date window", "期間内のメール");
msg!(msg_already_processed, "Already processed", "処理済み");
msg!(msg_matched, "Matched", "一致したメール");
msg!(msg_labeled, "Labeled", "ラベル付与");
msg!(msg_saved, "Attachments saved", "保存した添付ファイル");
msg!(msg_skipped, "Skipped (name taken)", "スキップ（同名あり）");
msg!(msg_resumed, "Stored by an earlier run", "前回までに保存済み");
msg!(msg_bytes_written, "Bytes written", "書き込みサイズ");
msg!(msg_failures, "Failures", "失敗");
msg!(msg_elapsed, "Elapsed", "所要時間");
msg!(
    msg_dry_run_notice,
    "Dry run: no files or labels were written.",
    "ドライラン: ファイルとラベルは書き込まれていません。"
);

// ── Check / presets output ───────────────────────────────────────

msg!(msg_config_file, "Config file", "設定ファイル");
msg!(msg_defaults, "(built-in defaults)", "（組み込みの既定値）");
msg!(msg_config_ok, "Configuration is valid.", "設定は有効です。");
msg!(msg_folder, "Folder id", "フォルダ ID");
msg!(msg_storage_root, "(storage root)", "（保存先のルート）");
msg!(msg_keywords, "Keywords", "キーワード");
msg!(msg_label, "Processed label", "処理済みラベル");
msg!(msg_days, "Search days", "検索日数");
msg!(msg_format, "File name format", "ファイル名フォーマット");
msg!(msg_warning, "warning", "警告");
msg!(msg_example, "e.g.", "例");
msg!(msg_preset_written, "Preset written to", "設定例を書き出しました:");
msg!(
    msg_preset_next_step,
    "Replace the folder id with a real one, then run `invoice-archiver check`.",
    "フォルダ ID を実際のものに置き換えてから `invoice-archiver check` を実行してください。"
);

// ── Errors ───────────────────────────────────────────────────────

msg!(err_file_not_found, "File not found", "ファイルが見つかりません");
msg!(
    err_no_mailbox,
    "No mailbox given; pass an MBOX path or set [mailbox].path in the config",
    "メールボックスが指定されていません。MBOX のパスを渡すか、設定の [mailbox].path を指定してください"
);
msg!(
    err_run_failures,
    "Some attachments could not be saved; their messages were left unlabeled",
    "一部の添付ファイルを保存できませんでした。該当メールにはラベルを付けていません"
);
msg!(
    err_config_exists,
    "Config file already exists (use --force to replace)",
    "設定ファイルが既に存在します（置き換えるには --force）"
);
