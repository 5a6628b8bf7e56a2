//! ctxcopy CLI
//!
//! Reads a selection from a file or stdin, runs one masking pass and writes
//! the masked text to stdout. Status and notification text go to stderr.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use ctxcopy_config_file::{Settings, load_settings};
use ctxcopy_mask::{
    DocumentKind, Error, MaskingConfig, MaskingResult, MaskingStrategy, mask_document,
    notification_message, stats_footer, status_indicator,
};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "ctxcopy")]
#[command(about = "ctxcopy - mask sensitive data before it leaves the editor", long_about = None)]
struct Cli {
    /// Settings file (YAML, or TOML with a .toml extension)
    #[arg(long, global = true, env = "CTXCOPY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mask a selection and print the result
    Mask(SelectionArgs),
    /// Print detections as JSON
    Detect(SelectionArgs),
    /// Print the normalized configuration
    CheckConfig,
}

#[derive(Args)]
struct SelectionArgs {
    /// Input file; stdin when omitted
    file: Option<PathBuf>,

    /// How the input is structured
    #[arg(long, value_enum, default_value = "auto")]
    kind: KindArg,

    /// Column names for CSV input that has no header row
    #[arg(long)]
    header_line: Option<String>,

    /// Override the configured masking strategy
    #[arg(long)]
    strategy: Option<MaskingStrategy>,

    /// Print the whole masking result as JSON
    #[arg(long, default_value = "false")]
    json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KindArg {
    Auto,
    Text,
    Csv,
    Xml,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let force_enable = !matches!(cli.command, Commands::CheckConfig);
    let (settings, missing) = load(cli.config.as_deref(), force_enable)?;

    init_tracing(&settings.logging.level)?;
    if let Some(path) = missing {
        info!("No settings at {}, using defaults", path.display());
    }

    match cli.command {
        Commands::Mask(args) => {
            let (result, config) = run(&settings, &args)?;
            let mut stdout = std::io::stdout().lock();

            if args.json {
                writeln!(stdout, "{}", serde_json::to_string_pretty(&result)?)?;
            } else {
                stdout.write_all(result.masked_text.as_bytes())?;
                if let Some(footer) = stats_footer(&result, &config) {
                    if !result.masked_text.ends_with('\n') {
                        writeln!(stdout)?;
                    }
                    writeln!(stdout, "{}", footer)?;
                }
            }

            if let Some(indicator) = status_indicator(&result, &config) {
                eprintln!("{}", indicator.text);
            }
            if let Some(message) = notification_message(&result, &config) {
                eprintln!("{}", message);
            }
        }
        Commands::Detect(args) => {
            let (result, _) = run(&settings, &args)?;
            println!("{}", serde_json::to_string_pretty(&result.detections)?);
        }
        Commands::CheckConfig => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
    }

    Ok(())
}

/// Load settings; a missing default file falls back to defaults
fn load(path: Option<&Path>, force_enable: bool) -> anyhow::Result<(Settings, Option<PathBuf>)> {
    let (mut settings, missing) = match load_settings(path) {
        Ok(settings) => (settings, None),
        Err(Error::ConfigNotFound(missing)) if path.is_none() => {
            let mut settings = Settings::default();
            settings.masking.enabled = force_enable;
            (settings, Some(missing))
        }
        Err(e) => return Err(e).context("Failed to load settings"),
    };

    settings.merge_env();
    Ok((settings, missing))
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;
    Ok(())
}

fn run(settings: &Settings, args: &SelectionArgs) -> anyhow::Result<(MaskingResult, MaskingConfig)> {
    let text = read_input(args.file.as_deref())?;

    let mut config = settings.masking.clone();
    if let Some(strategy) = args.strategy {
        config.strategy = strategy;
    }

    let kind = resolve_kind(args.kind, args.file.as_deref(), &text, settings);
    debug!("Masking {} bytes as {}", text.len(), kind.as_str());

    let result = mask_document(&text, &config, kind, args.header_line.as_deref());
    Ok((result, config))
}

fn read_input(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

fn resolve_kind(kind: KindArg, file: Option<&Path>, text: &str, settings: &Settings) -> DocumentKind {
    match kind {
        KindArg::Text => DocumentKind::PlainText,
        KindArg::Csv => DocumentKind::Csv,
        KindArg::Xml => DocumentKind::Xml,
        KindArg::Auto => file
            .and_then(DocumentKind::from_path)
            .unwrap_or_else(|| DocumentKind::sniff(text, &settings.large_input)),
    }
}
