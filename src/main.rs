//! CLI entry point for `invoice-archiver`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use invoice_archiver::archive::{Archiver, RunOptions, RunReport};
use invoice_archiver::config::{self, presets, Config};
use invoice_archiver::i18n;
use invoice_archiver::ledger::Ledger;
use invoice_archiver::search::SearchQuery;
use invoice_archiver::storage::{self, LocalFolder, WriteOutcome};
use invoice_archiver::template::{FileNameFields, FileNameFormat};

#[derive(Parser)]
#[command(name = "invoice-archiver", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (overrides $INVOICE_ARCHIVER_CONFIG)
    #[arg(long, global = true, value_name = "PATH", env = "INVOICE_ARCHIVER_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Language (en, ja). Defaults to system locale.
    #[arg(long, global = true, value_name = "LANG")]
    lang: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the mailbox and archive matching attachments
    Run {
        /// MBOX file (defaults to [mailbox].path)
        mbox: Option<PathBuf>,
        /// Show what would be saved without writing anything
        #[arg(long)]
        dry_run: bool,
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
        /// Reference time for the date window (RFC 3339)
        #[arg(long, value_name = "RFC3339")]
        now: Option<String>,
    },
    /// Validate the configuration
    Check,
    /// Print the mail search query
    Query,
    /// Render a filename with the configured format
    Preview {
        #[arg(long, default_value = "2024-01-15")]
        date: String,
        #[arg(long, default_value = "")]
        subject: String,
        #[arg(long, default_value = "")]
        sender: String,
        #[arg(long, default_value = "")]
        original: String,
        /// Original extension, without the dot
        #[arg(long)]
        ext: Option<String>,
        /// Format to use instead of the configured one
        #[arg(long)]
        format: Option<String>,
    },
    /// List, print or write example configurations
    Presets {
        name: Option<String>,
        /// Write the preset as the config file
        #[arg(long, requires = "name")]
        write: bool,
        /// Replace an existing config file
        #[arg(long, requires = "write")]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

/// Value of `--flag VALUE` or `--flag=VALUE` in the raw arguments.
fn raw_flag(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    for (i, arg) in args.iter().enumerate() {
        if arg == flag {
            return args.get(i + 1).cloned();
        }
        if let Some(value) = arg.strip_prefix(&prefix) {
            return Some(value.to_string());
        }
    }
    None
}

/// Detect language before clap processes --help: `--lang`, then the
/// config file's `general.lang`, then the system locale.
fn detect_lang_early() -> i18n::Lang {
    let args: Vec<String> = std::env::args().collect();
    if let Some(lang) = raw_flag(&args, "--lang").and_then(|c| i18n::Lang::from_code(&c)) {
        return lang;
    }
    let config_path = raw_flag(&args, "--config").map(PathBuf::from);
    config::load_config(config_path.as_deref())
        .ok()
        .and_then(|c| c.general.lang)
        .and_then(|c| i18n::Lang::from_code(&c))
        .unwrap_or_else(i18n::detect_system_lang)
}

/// Build a localized clap Command using i18n strings.
fn build_localized_command() -> clap::Command {
    let mut cmd = Cli::command();
    cmd = cmd
        .about(i18n::app_about())
        .long_about(i18n::app_long_about())
        .after_help(i18n::app_after_help())
        .mut_arg("verbose", |a| a.help(i18n::help_verbose()))
        .mut_arg("lang", |a| a.help(i18n::help_lang()))
        .mut_arg("config", |a| a.help(i18n::help_config()));

    let subcommands: Vec<clap::Command> = cmd
        .get_subcommands()
        .map(|sub| {
            let mut s = sub.clone();
            match s.get_name() {
                "run" => { s = s.about(i18n::help_cmd_run()); }
                "check" => { s = s.about(i18n::help_cmd_check()); }
                "query" => { s = s.about(i18n::help_cmd_query()); }
                "preview" => { s = s.about(i18n::help_cmd_preview()); }
                "presets" => { s = s.about(i18n::help_cmd_presets()); }
                "completions" => { s = s.about(i18n::help_cmd_completions()); }
                "manpage" => { s = s.about(i18n::help_cmd_manpage()); }
                _ => {}
            }
            s
        })
        .collect();

    for sub in subcommands {
        cmd = cmd.mut_subcommand(sub.get_name(), |_| sub.clone());
    }

    cmd
}

fn main() -> anyhow::Result<()> {
    // Detect language BEFORE clap parsing so --help is localized
    let lang = detect_lang_early();
    i18n::set_lang(lang);

    let cmd = build_localized_command();
    let matches = cmd.get_matches();
    let cli = Cli::from_arg_matches(&matches)?;

    match cli.command {
        Commands::Completions { shell } => return cmd_completions(shell),
        Commands::Manpage => return cmd_manpage(),
        // Works without a loadable config, so a broken one can be replaced
        Commands::Presets {
            ref name,
            write,
            force,
        } => return cmd_presets(name.as_deref(), write, force, cli.config.as_deref()),
        _ => {}
    }

    let config = config::load_config(cli.config.as_deref())?;

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Run {
            mbox,
            dry_run,
            json,
            now,
        } => cmd_run(&config, mbox, dry_run, json, now.as_deref()),
        Commands::Check => cmd_check(&config, cli.config.as_deref()),
        Commands::Query => cmd_query(&config),
        Commands::Preview {
            date,
            subject,
            sender,
            original,
            ext,
            format,
        } => {
            let fields = FileNameFields {
                date,
                subject,
                sender,
                original,
            };
            cmd_preview(&config, &fields, ext.as_deref(), format.as_deref())
        }
        Commands::Completions { .. } | Commands::Manpage | Commands::Presets { .. } => Ok(()),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_file = config::log_file_path(config);
    let log_dir = log_file.parent().map(Path::to_path_buf).unwrap_or_default();
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "invoice-archiver.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "invoice-archiver", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

fn print_warnings(warnings: &[String]) {
    for warning in warnings {
        eprintln!("{}: {warning}", i18n::msg_warning());
    }
}

/// Run the archive job once.
fn cmd_run(
    config: &Config,
    mbox: Option<PathBuf>,
    dry_run: bool,
    json: bool,
    now: Option<&str>,
) -> anyhow::Result<()> {
    let validated = config.archive.validate()?;
    print_warnings(validated.warnings());

    let Some(mbox) = mbox.or_else(|| config.mailbox.path.clone()) else {
        anyhow::bail!("{}", i18n::err_no_mailbox());
    };
    if !mbox.exists() {
        anyhow::bail!("{}: {}", i18n::err_file_not_found(), mbox.display());
    }

    let now = match now {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .with_context(|| format!("--now '{s}' is not an RFC 3339 timestamp"))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let storage = if dry_run {
        LocalFolder::new(
            &config.storage.root_dir,
            validated.drive_folder_id(),
            config.storage.collision,
            config.storage.max_name_len,
        )
    } else {
        LocalFolder::open(
            &config.storage.root_dir,
            validated.drive_folder_id(),
            config.storage.collision,
            config.storage.max_name_len,
        )?
    };
    let ledger = Ledger::load(config::ledger_path(config))?;
    let mut archiver = Archiver::new(&validated, storage, ledger);

    let file_size = std::fs::metadata(&mbox)?.len();
    let pb = if json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(file_size)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} {} [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} ({{eta}})",
                i18n::msg_scanning()
            ))
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let report = archiver.run(
        &mbox,
        &RunOptions { dry_run, now },
        Some(&|current, total| {
            pb.set_length(total);
            pb.set_position(current);
        }),
    )?;
    pb.finish_and_clear();
    let elapsed = start.elapsed();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report_table(&report, elapsed);
    }

    if !report.is_clean() {
        anyhow::bail!("{}", i18n::err_run_failures());
    }
    Ok(())
}

/// Print a run report in a human-readable table.
fn print_report_table(report: &RunReport, elapsed: std::time::Duration) {
    use humansize::{format_size, BINARY};

    println!();
    println!("  {:<22} {}", i18n::msg_mailbox(), report.mailbox.display());
    println!("  {:<22} {}", i18n::msg_location(), report.location.display());
    println!("  {:<22} {}", i18n::msg_query(), report.query);
    println!("  {:<22} {}", i18n::msg_scanned(), report.scanned);
    println!("  {:<22} {}", i18n::msg_in_window(), report.in_window);
    println!(
        "  {:<22} {}",
        i18n::msg_already_processed(),
        report.already_processed
    );
    println!("  {:<22} {}", i18n::msg_matched(), report.matched);
    println!("  {:<22} {}", i18n::msg_labeled(), report.labeled);
    println!("  {:<22} {}", i18n::msg_saved(), report.saved);
    println!("  {:<22} {}", i18n::msg_skipped(), report.skipped);
    if report.resumed > 0 {
        println!("  {:<22} {}", i18n::msg_resumed(), report.resumed);
    }
    println!(
        "  {:<22} {}",
        i18n::msg_bytes_written(),
        format_size(report.bytes_written, BINARY)
    );
    println!("  {:<22} {:.2?}", i18n::msg_elapsed(), elapsed);

    if !report.attachments.is_empty() {
        println!();
        for saved in &report.attachments {
            let mark = match saved.file.outcome {
                WriteOutcome::Created => "+",
                WriteOutcome::Overwritten => "~",
                WriteOutcome::Skipped => "=",
            };
            println!("    {mark} {}  ({})", saved.file.path.display(), saved.original);
        }
    }

    if !report.failures.is_empty() {
        println!();
        println!("  {}:", i18n::msg_failures());
        for failure in &report.failures {
            println!(
                "    ! {} / {}: {}",
                failure.subject, failure.attachment, failure.reason
            );
        }
    }

    if report.dry_run {
        println!();
        println!("  {}", i18n::msg_dry_run_notice());
    }
    println!();
}

/// Validate the configuration and print the effective settings.
fn cmd_check(config: &Config, explicit: Option<&Path>) -> anyhow::Result<()> {
    let source = explicit
        .map(Path::to_path_buf)
        .or_else(config::config_file_path)
        .filter(|p| p.exists());

    let validated = config.archive.validate()?;

    println!();
    match source {
        Some(path) => println!("  {:<20} {}", i18n::msg_config_file(), path.display()),
        None => println!("  {:<20} {}", i18n::msg_config_file(), i18n::msg_defaults()),
    }
    println!(
        "  {:<20} {}",
        i18n::msg_folder(),
        validated
            .drive_folder_id()
            .unwrap_or_else(|| i18n::msg_storage_root())
    );
    let keywords: Vec<&str> = validated.keywords().iter().map(|k| k.as_str()).collect();
    println!("  {:<20} {}", i18n::msg_keywords(), keywords.join(", "));
    println!("  {:<20} {}", i18n::msg_label(), validated.processed_label());
    println!("  {:<20} {}", i18n::msg_days(), validated.search_days());
    println!("  {:<20} {}", i18n::msg_format(), validated.file_name_format());
    println!(
        "  {:<20} {}",
        i18n::msg_query(),
        SearchQuery::from_config(&validated).to_query_string()
    );
    println!();
    for warning in validated.warnings() {
        println!("  {}: {warning}", i18n::msg_warning());
    }
    println!("  {}", i18n::msg_config_ok());
    println!();
    Ok(())
}

/// Print the search query built from the configuration.
fn cmd_query(config: &Config) -> anyhow::Result<()> {
    let validated = config.archive.validate()?;
    println!("{}", SearchQuery::from_config(&validated).to_query_string());
    Ok(())
}

/// Render one filename and show what storage would name it.
fn cmd_preview(
    config: &Config,
    fields: &FileNameFields,
    ext: Option<&str>,
    format: Option<&str>,
) -> anyhow::Result<()> {
    let format = FileNameFormat::parse(format.unwrap_or(&config.archive.file_name_format));
    for token in format.unknown_tokens() {
        eprintln!("{}: {token}", i18n::msg_warning());
    }
    let rendered = format.render_with_extension(fields, ext);
    let stored = storage::sanitize_filename(&rendered, config.storage.max_name_len);

    println!("{rendered}");
    if stored != rendered {
        println!("{stored}");
    }
    Ok(())
}

/// List presets, print one as TOML, or write it as the config file.
fn cmd_presets(
    name: Option<&str>,
    write: bool,
    force: bool,
    explicit: Option<&Path>,
) -> anyhow::Result<()> {
    let Some(name) = name else {
        println!();
        for preset in presets::all() {
            println!("  {:<14} {}", preset.name, preset.description);
            println!(
                "  {:<14} {} {}  ({})",
                "",
                i18n::msg_example(),
                preset.example_name,
                preset.archive.file_name_format
            );
        }
        println!();
        return Ok(());
    };

    let preset = presets::find(name)?;
    let cfg = config::preset_config(&preset);

    if !write {
        print!("{}", config::to_toml(&cfg)?);
        return Ok(());
    }

    let path = explicit
        .map(Path::to_path_buf)
        .or_else(config::config_file_path)
        .context("no config directory on this platform; pass --config")?;
    if path.exists() && !force {
        anyhow::bail!("{}: {}", i18n::err_config_exists(), path.display());
    }
    config::save_config(&cfg, &path)?;
    println!("{} {}", i18n::msg_preset_written(), path.display());
    println!("{}", i18n::msg_preset_next_step());
    Ok(())
}
