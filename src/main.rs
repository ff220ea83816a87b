//! Subtrans - Subtitle Translation Client
//!
//! Command line entry point: one-shot translation of a file, or an
//! interactive session against the translation service.

use anyhow::Result;
use clap::Parser;
use tokio::io::BufReader;
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, rolling};

use subtrans::cli::{Args, Commands};
use subtrans::config::Config;
use subtrans::error::SubtransError;
use subtrans::intake::{FormatClass, SUPPORTED_EXTENSIONS};
use subtrans::workflow::Workflow;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;
    info!("Starting Subtrans - Subtitle Translation Client");

    // Load configuration
    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("subtrans.toml").exists() {
                info!("Found subtrans.toml in current directory, loading...");
                Config::from_file("subtrans.toml")?
            } else {
                Config::default()
            }
        }
    };
    let config = config.with_base_url(args.base_url.clone())?;

    match args.command {
        Commands::Translate { input, api_key, output_dir } => {
            let workflow = Workflow::new(config)?;
            let saved = workflow.translate_file(&input, &api_key, output_dir.as_ref()).await?;
            println!("Translated file saved to {}", saved.display());
        }
        Commands::Interactive { api_key } => {
            let workflow = Workflow::new(config)?;
            if let Some(key) = api_key {
                workflow.session().set_credential(key);
            }
            let input = BufReader::new(tokio::io::stdin());
            let mut output = tokio::io::stdout();
            workflow.run_interactive(input, &mut output).await?;
        }
        Commands::Formats => {
            println!("\nSupported Subtitle Formats:");
            println!("{:<10} {:<40}", "Extension", "Format");
            println!("{}", "-".repeat(50));
            for extension in SUPPORTED_EXTENSIONS {
                let format = FormatClass::classify(&format!("file.{}", extension));
                println!("{:<10} {:<40}", format!(".{}", extension), format.label());
            }
        }
        Commands::InitConfig { path, force } => {
            if path.exists() && !force {
                return Err(SubtransError::Config(format!(
                    "{} already exists, use --force to overwrite",
                    path.display()
                )).into());
            }
            config.save_to_file(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
    }

    info!("Subtrans finished");
    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = std::env::current_dir()?.join(".subtrans").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "subtrans.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Console output goes to stderr so stdout stays usable for the interactive session
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(verbose)
        .with_line_number(verbose);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("subtrans.log").display());

    Ok(())
}
