use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Command line and environment settings. `.env` in the working directory is
/// loaded before parsing, so every `AKV_*` variable may live there too.
#[derive(Debug, Parser)]
#[command(
    name = "akvb",
    about = "Browse and manage Azure Key Vault secrets from the terminal",
    version
)]
pub struct Cli {
    /// Write debug logs to the log file
    #[arg(long)]
    pub debug: bool,

    /// Log file used with --debug
    #[arg(long, env = "AKV_LOG_FILE", default_value = "akv_tui.log")]
    pub log_file: PathBuf,

    /// Log level used with --debug when RUST_LOG is unset
    #[arg(long, env = "AKV_LOG_LEVEL", default_value = "debug")]
    pub log_level: String,

    /// Redraw interval while work is pending, in milliseconds
    #[arg(long, env = "AKV_TICK_MS", default_value_t = 50, value_parser = clap::value_parser!(u64).range(10..=1000))]
    pub tick_ms: u64,

    /// Azure Resource Manager endpoint used for vault discovery
    #[arg(long, env = "AKV_MANAGEMENT_URL", default_value = "https://management.azure.com")]
    pub management_url: String,

    /// Initialise and restore the terminal, then exit
    #[arg(long)]
    pub smoke_test: bool,
}

impl Cli {
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Self::parse()
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn management_url(&self) -> &str {
        self.management_url.trim_end_matches('/')
    }
}
