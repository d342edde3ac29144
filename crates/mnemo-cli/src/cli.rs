use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format for CLI commands
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

#[derive(Parser)]
#[command(name = "mnemo")]
#[command(version, about = "Mnemo - A terminal assistant that remembers you")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ~/.config/mnemo/config.toml)
    #[arg(long, global = true, env = "MNEMO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database path (overrides the config file)
    #[arg(long, global = true, env = "MNEMO_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database and optionally seed the user profile
    Setup(SetupArgs),

    /// Start an interactive chat session
    Chat,

    /// Ask a single question and exit
    Ask {
        /// Message to send
        message: String,
    },

    /// Print the stored user profile
    Profile,
}

#[derive(Args, Debug, Default)]
pub struct SetupArgs {
    /// First name
    #[arg(long)]
    pub name: Option<String>,

    /// Last name
    #[arg(long)]
    pub last_name: Option<String>,

    /// Occupation
    #[arg(long)]
    pub occupation: Option<String>,

    /// Location
    #[arg(long)]
    pub location: Option<String>,
}
