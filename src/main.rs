//! Harvest-DL main entry point
//!
//! This is the command-line interface for the Harvest-DL catalog downloader.

use anyhow::Context;
use clap::Parser;
use harvest_dl::config::{read_config_with_hash, Config, DispatchMode, EngineKind};
use harvest_dl::crawler::run_harvest;
use harvest_dl::output::print_summary;
use harvest_dl::RunConfiguration;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Harvest-DL: a paginated catalog downloader
///
/// Harvest-DL walks a harvest catalog page by page, downloads every archive
/// of the chosen type and language, and unpacks them into the save directory.
#[derive(Parser, Debug)]
#[command(name = "harvest-dl")]
#[command(version = "1.0.0")]
#[command(about = "Downloads books from a paginated harvest catalog", long_about = None)]
struct Cli {
    /// Optional TOML configuration file; flags override its values
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Type of files to download (txt, epub or html)
    #[arg(short = 't', long)]
    file_type: Option<String>,

    /// Language of the files to download (es, en, fr, ...)
    #[arg(short, long)]
    language: Option<String>,

    /// Directory where downloads are stored
    #[arg(short, long)]
    save_path: Option<PathBuf>,

    /// Delay in milliseconds before each sequential download
    #[arg(short, long, allow_negative_numbers = true)]
    delay_ms: Option<i64>,

    /// Maximum number of files to download (0 downloads all)
    #[arg(short, long, allow_negative_numbers = true)]
    max_files: Option<i64>,

    /// Replace files that already exist locally
    #[arg(short, long)]
    overwrite: bool,

    /// Keep the downloaded archives packed
    #[arg(long)]
    no_unzip: bool,

    /// Fetch engine (http-connection)
    #[arg(short, long)]
    engine: Option<String>,

    /// Dispatch mode (sequential or concurrent)
    #[arg(short = 'x', long)]
    mode: Option<String>,

    /// Root of the harvest endpoint
    #[arg(long)]
    root_url: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate the configuration and show it without downloading anything
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    /// Applies command-line values on top of the file configuration
    fn apply(&self, config: &mut Config) -> anyhow::Result<()> {
        if let Some(file_type) = &self.file_type {
            config.catalog.file_type = file_type.clone();
        }
        if let Some(language) = &self.language {
            config.catalog.language = language.clone();
        }
        if let Some(root_url) = &self.root_url {
            config.catalog.root_url = root_url.clone();
        }
        if let Some(save_path) = &self.save_path {
            config.download.save_path = save_path.clone();
        }
        if let Some(delay_ms) = self.delay_ms {
            config.download.delay_ms = delay_ms;
        }
        if let Some(max_files) = self.max_files {
            config.download.max_files = max_files;
        }
        if self.overwrite {
            config.download.overwrite = true;
        }
        if self.no_unzip {
            config.download.unzip = false;
        }
        if let Some(engine) = &self.engine {
            config.download.engine = engine
                .parse::<EngineKind>()
                .context("invalid --engine")?;
        }
        if let Some(mode) = &self.mode {
            config.download.mode = mode
                .parse::<DispatchMode>()
                .context("invalid --mode")?;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            match read_config_with_hash(path) {
                Ok((cfg, hash)) => {
                    tracing::info!("Configuration loaded successfully (hash: {})", hash);
                    cfg
                }
                Err(e) => {
                    tracing::error!("Failed to load configuration: {}", e);
                    return Err(e.into());
                }
            }
        }
        None => Config::default(),
    };
    // Validation happens in RunConfiguration::new, after the flags are applied
    cli.apply(&mut config)?;

    let run_config = match RunConfiguration::new(&config) {
        Ok(run_config) => run_config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&run_config);
        return Ok(());
    }

    handle_harvest(run_config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("harvest_dl=info,warn"),
            1 => EnvFilter::new("harvest_dl=debug,info"),
            2 => EnvFilter::new("harvest_dl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &RunConfiguration) {
    println!("=== Harvest-DL Dry Run ===\n");

    println!("Catalog:");
    println!("  URL: {}", config.base_url());
    println!("  File type: {}", config.file_type());
    println!("  Language: {}", config.language());

    println!("\nDownload:");
    println!("  Save path: {}", config.save_path().display());
    println!("  Archives: {}", config.zips_path().display());
    println!("  Overwrite: {}", config.overwrite());
    println!("  Delay: {} ms", config.delay().as_millis());
    if config.is_unbounded() {
        println!("  Max files: all");
    } else {
        println!("  Max files: {}", config.max_files());
    }
    println!("  Engine: {}", config.engine());
    println!("  Mode: {}", config.mode());
    println!("  Unzip: {}", config.unzip());

    println!("\n✓ Configuration is valid");
}

/// Handles the main harvest operation
async fn handle_harvest(config: RunConfiguration) -> anyhow::Result<()> {
    match run_harvest(config).await {
        Ok(summary) => {
            tracing::info!("Harvest completed successfully");
            print_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
