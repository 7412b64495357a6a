//! Configuration and CLI argument handling

use std::path::PathBuf;
use clap::Parser;

use crate::api::BASE_PORT;

/// CLI argument parsing structure
#[derive(Parser)]
#[command(name = "haptic-timers")]
#[command(about = "Countdown timers with haptic feedback and a local settings page")]
#[command(version)]
pub struct Config {
    /// Directory holding timer-config.json
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// First port tried by the settings server
    #[arg(short, long, default_value_t = BASE_PORT)]
    pub port: u16,

    /// Do not reload the configuration when the file changes on disk
    #[arg(long)]
    pub no_watch: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Directory for the configuration file, defaulting to the user data directory
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("haptic-timers")
        })
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}
