use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "herald-bot", version)]
pub struct Cli {
    /// Optional configuration file, overridden by environment variables
    #[arg(long, default_value = "herald.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Connect to the gateway and serve commands (default)
    Run,
    /// Validate the configuration, print enabled subsystems and exit
    Check,
}
