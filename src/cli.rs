use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Base URL of the translation service (overrides the config file)
    #[arg(long, env = "SUBTRANS_BASE_URL")]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Translate a single subtitle file and save the result
    Translate {
        /// Input subtitle file (.srt, .vtt, .ass)
        #[arg(short, long)]
        input: PathBuf,

        /// Translation service API key
        #[arg(short = 'k', long, env = "SUBTRANS_API_KEY", hide_env_values = true)]
        api_key: String,

        /// Output directory for the translated file
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Start an interactive session (file, key, submit, status, download, reset)
    Interactive {
        /// Translation service API key to start with
        #[arg(short = 'k', long, env = "SUBTRANS_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },

    /// List accepted subtitle formats
    Formats,

    /// Write a configuration file with default values
    InitConfig {
        /// Where to write the file
        #[arg(short, long, default_value = "subtrans.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
