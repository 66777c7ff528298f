use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use yomiru::clipboard::{ClipboardReader, NoClipboard, TextClipboard};
use yomiru::config::Config;
use yomiru::models::{find_language, Settings, SettingsPatch, SUPPORTED_LANGUAGES};
use yomiru::settings::FileKeyValueStore;
use yomiru::storage::StorageManager;
use yomiru::ReaderSession;

#[derive(Parser)]
#[command(name = "yomiru")]
#[command(about = "Read manga chapters translated and colorized by a Yomiru backend")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Clipboard content to check for a chapter URL at startup
    #[arg(long, env = "YOMIRU_CLIPBOARD", hide_env_values = true)]
    clipboard: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Process a chapter and download its pages
    Process {
        /// Chapter URL (defaults to the one in settings)
        url: Option<String>,
        /// Enable translation
        #[arg(long, conflicts_with = "no_translate")]
        translate: bool,
        /// Disable translation
        #[arg(long)]
        no_translate: bool,
        /// Enable colorization
        #[arg(long, conflicts_with = "no_colorize")]
        colorize: bool,
        /// Disable colorization
        #[arg(long)]
        no_colorize: bool,
        /// Source language code
        #[arg(long)]
        source: Option<String>,
        /// Target language code
        #[arg(long)]
        target: Option<String>,
    },
    /// Show chapter metadata without processing it
    Info {
        /// Chapter URL
        url: String,
    },
    /// Check whether the backend is reachable
    Health,
    /// Show or change stored settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Show the last processed chapter
    Status,
    /// List supported languages
    Languages,
    /// Remove downloaded page images
    Cleanup,
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print current settings
    Show,
    /// Set one value, e.g. `settings set backend_endpoint https://api.example.com`
    Set { key: String, value: String },
    /// Restore defaults
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    if let Commands::Init = cli.command {
        Config::init(&cli.config)?;
        println!("✅ Wrote default configuration to {}", cli.config);
        return Ok(());
    }

    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config))?;

    match cli.command {
        Commands::Init => {} // handled above
        Commands::Languages => show_languages(),
        Commands::Cleanup => {
            let storage = StorageManager::new(config.images_path());
            let removed = storage.remove_downloaded_pages().await?;
            println!("🧹 Removed {} page images", removed);
        }
        Commands::Process {
            url,
            translate,
            no_translate,
            colorize,
            no_colorize,
            source,
            target,
        } => {
            let session = open_session(config, cli.clipboard.as_deref())?;
            let patch = SettingsPatch {
                chapter_url: url,
                translation_enabled: flag(translate, no_translate),
                colorization_enabled: flag(colorize, no_colorize),
                source_language: source.map(|code| checked_language(&code)).transpose()?,
                target_language: target.map(|code| checked_language(&code)).transpose()?,
                ..SettingsPatch::default()
            };
            if !patch.is_empty() {
                session.update_settings(patch)?;
            }
            run_process(&session).await?;
        }
        Commands::Info { url } => {
            let session = open_session(config, cli.clipboard.as_deref())?;
            let processor = session
                .processor()
                .context("backend endpoint and API key are not configured")?;
            let info = processor.fetch_chapter_info(&url).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Commands::Health => {
            let session = open_session(config, cli.clipboard.as_deref())?;
            let Some(processor) = session.processor() else {
                bail!("backend endpoint and API key are not configured");
            };
            if processor.health_check().await {
                println!("✅ Backend is healthy");
            } else {
                println!("❌ Backend is unreachable or unhealthy");
                std::process::exit(1);
            }
        }
        Commands::Settings { action } => {
            let session = open_session(config, cli.clipboard.as_deref())?;
            match action {
                SettingsAction::Show => show_settings(&session.settings()),
                SettingsAction::Set { key, value } => {
                    let patch = parse_setting(&key, &value)?;
                    session.update_settings(patch)?;
                    println!("✅ Updated {}", key);
                }
                SettingsAction::Reset => {
                    session.clear_settings()?;
                    println!("✅ Settings restored to defaults");
                }
            }
        }
        Commands::Status => {
            let session = open_session(config, cli.clipboard.as_deref())?;
            show_status(&session)?;
        }
    }

    Ok(())
}

/// Builds the reader session the way the app does at startup: settings from
/// disk, clipboard URL prefill, backend client when configured.
fn open_session(config: Config, clipboard: Option<&str>) -> Result<ReaderSession<FileKeyValueStore>> {
    let store = FileKeyValueStore::new(config.settings_path());
    let session = ReaderSession::new(config, store);

    let clipboard: Box<dyn ClipboardReader> = match clipboard {
        Some(text) => Box::new(TextClipboard(text.to_string())),
        None => Box::new(NoClipboard),
    };
    let startup = session.initialize(clipboard.as_ref())?;
    if let Some(url) = &startup.clipboard_url {
        println!("📋 URL detected, loaded into settings: {}", url);
    }
    if !startup.backend_configured {
        info!("Backend is not configured, set backend_endpoint and api_key");
    }

    Ok(session)
}

fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(format!("yomiru={}", level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn flag(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn checked_language(code: &str) -> Result<String> {
    match find_language(code) {
        Some(language) => Ok(language.code.to_string()),
        None => bail!("unsupported language '{}', see `yomiru languages`", code),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => bail!("{} expects true or false, got '{}'", key, value),
    }
}

fn parse_setting(key: &str, value: &str) -> Result<SettingsPatch> {
    let mut patch = SettingsPatch::default();
    match key {
        "chapter_url" | "chapterUrl" => patch.chapter_url = Some(value.to_string()),
        "translation_enabled" | "translationEnabled" => {
            patch.translation_enabled = Some(parse_bool(key, value)?)
        }
        "colorization_enabled" | "colorizationEnabled" => {
            patch.colorization_enabled = Some(parse_bool(key, value)?)
        }
        "source_language" | "sourceLanguage" => patch.source_language = Some(checked_language(value)?),
        "target_language" | "targetLanguage" => patch.target_language = Some(checked_language(value)?),
        "api_key" | "apiKey" => patch.api_key = Some(value.to_string()),
        "backend_endpoint" | "backendEndpoint" => patch.backend_endpoint = Some(value.to_string()),
        _ => bail!("unknown setting '{}'", key),
    }
    Ok(patch)
}

async fn run_process(session: &ReaderSession<FileKeyValueStore>) -> Result<()> {
    let settings = session.settings();
    info!("📖 Processing chapter: {}", settings.chapter_url);

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    pb.set_message("Fetching chapter...");

    let result = session
        .execute(|event| {
            pb.set_length(event.total as u64);
            pb.set_position(event.current as u64);
            pb.set_message(event.message.clone());
        })
        .await;

    let chapter = match result {
        Ok(chapter) => {
            pb.finish_with_message("Processing complete!");
            chapter
        }
        Err(e) => {
            pb.abandon_with_message("Processing failed");
            warn!("❌ {}", e);
            return Err(e.into());
        }
    };

    println!("✅ Processed {} pages", chapter.pages.len());
    println!("{:<6} {:<20} {:<10} {}", "#", "Page", "Processed", "Source");
    println!("{}", "-".repeat(70));
    for (index, page) in chapter.pages.iter().enumerate() {
        println!(
            "{:<6} {:<20} {:<10} {}",
            index + 1,
            page.id,
            if page.is_processed { "yes" } else { "no" },
            page.display_source()
        );
    }

    Ok(())
}

fn show_settings(settings: &Settings) {
    let masked_key = if settings.api_key.is_empty() {
        "(not set)".to_string()
    } else {
        format!("{}…", settings.api_key.chars().take(4).collect::<String>())
    };

    println!("⚙️  Settings:");
    println!("{:<22} {}", "chapter_url", settings.chapter_url);
    println!("{:<22} {}", "translation_enabled", settings.translation_enabled);
    println!("{:<22} {}", "source_language", settings.source_language);
    println!("{:<22} {}", "target_language", settings.target_language);
    println!("{:<22} {}", "colorization_enabled", settings.colorization_enabled);
    println!("{:<22} {}", "api_key", masked_key);
    println!("{:<22} {}", "backend_endpoint", settings.backend_endpoint);
}

fn show_status(session: &ReaderSession<FileKeyValueStore>) -> Result<()> {
    let Some(chapter) = session.saved_chapter()? else {
        println!("📚 No chapter processed yet");
        return Ok(());
    };

    let processed = chapter.pages.iter().filter(|p| p.is_processed).count();
    println!("📚 Last processed chapter:");
    println!("{:<12} {}", "URL", chapter.url);
    println!("{:<12} {}", "Pages", chapter.pages.len());
    println!("{:<12} {}", "Processed", processed);
    if let Some(at) = chapter.processed_at {
        println!("{:<12} {}", "When", at.format("%Y-%m-%d %H:%M"));
    }
    Ok(())
}

fn show_languages() {
    println!("{:<6} {}", "Code", "Language");
    println!("{}", "-".repeat(20));
    for language in SUPPORTED_LANGUAGES {
        println!("{:<6} {}", language.code, language.name);
    }
}
