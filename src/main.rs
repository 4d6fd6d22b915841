//! ysnp - PHP source obfuscator CLI.

use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use ysnp::{Config, Obfuscator, SafetyList};

/// Obfuscate a PHP source tree: rename symbols (and optionally files)
/// consistently across all files.
#[derive(Parser)]
#[command(name = "ysnp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "ysnp.config.json")]
    config: PathBuf,

    /// Safety-list file, merged into the built-in defaults
    #[arg(long)]
    safety: Option<PathBuf>,

    /// Override the configured source root
    #[arg(long)]
    source: Option<PathBuf>,

    /// Override the configured destination root
    #[arg(long)]
    destination: Option<PathBuf>,

    /// Overwrite an existing destination without asking
    #[arg(short = 'y', long)]
    yes: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 if cli.quiet => Level::ERROR,
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(log_level.to_string())),
        )
        .init();

    let mut config = Config::from_file(&cli.config)?;
    if let Some(source) = cli.source {
        config.source_root = source;
    }
    if let Some(destination) = cli.destination {
        config.destination_root = destination;
    }
    config.validate()?;

    let safety = match cli.safety {
        Some(ref path) => SafetyList::from_file(path)?,
        None => SafetyList::default(),
    };

    if !config.source_root.is_dir() {
        anyhow::bail!(
            "source_root '{}' is not a directory",
            config.source_root.display()
        );
    }

    if config.destination_root.exists() && !cli.yes && !confirm_overwrite(&config)? {
        println!("Operation cancelled.");
        std::process::exit(1);
    }

    info!(
        source = %config.source_root.display(),
        destination = %config.destination_root.display(),
        "starting obfuscation run"
    );

    let mut obfuscator = Obfuscator::new(config, safety)?;
    let report = obfuscator.run()?;

    if !cli.quiet {
        println!(
            "Done: {} files discovered, {} rewritten, {} renamed, {} symbols mapped",
            report.files_discovered,
            report.files_rewritten,
            report.files_renamed,
            report.symbols_mapped
        );
    }

    if !report.is_clean() {
        eprintln!("{} file(s) failed:", report.errors.len());
        for error in &report.errors {
            eprintln!("  {}: {}", error.path.display(), error.message);
        }
        std::process::exit(1);
    }

    Ok(())
}

fn confirm_overwrite(config: &Config) -> anyhow::Result<bool> {
    println!(
        "Warning: destination '{}' already exists and will be overwritten.",
        config.destination_root.display()
    );
    print!("Do you want to continue? [y/N]: ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().eq_ignore_ascii_case("y"))
}
