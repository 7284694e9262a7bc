// src/main.rs
use std::io;
use std::sync::Arc;

use azure_identity::DeveloperToolsCredential;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{error, info};

mod action;
mod app;
mod azure;
mod cache;
mod clipboard;
mod command;
mod config;
mod error;
mod filter;
mod keys;
mod logging;
mod model;
mod nav;
mod prompt;
mod runtime;
mod store;
mod ui;

use app::App;
use azure::AzureStore;
use crate::clipboard::SystemClipboard;
use config::Cli;
use error::Result;
use runtime::{Services, Tui};

#[tokio::main]
async fn main() {
    let cli = Cli::load();

    if let Err(e) = run(cli).await {
        error!("Fatal: {}", e);
        eprintln!("akvb: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // only log to a file, and only when asked: the terminal belongs to the UI
    if cli.debug {
        logging::init_file_logging(&cli.log_file, &cli.log_level)?;
        info!("Tracing initialized to {} ({})", cli.log_file.display(), cli.log_level);
    }

    if cli.smoke_test {
        let mut terminal = init_terminal()?;
        restore_terminal(&mut terminal)?;
        println!("smoke-test: ok");
        return Ok(());
    }

    info!("Starting Azure Key Vault browser");
    let credential = DeveloperToolsCredential::new(None)?;
    let store = AzureStore::new(credential, cli.management_url());
    let services = Services::new(Arc::new(store), Box::new(SystemClipboard));
    let mut app = App::new();

    let mut terminal = init_terminal()?;
    let result = runtime::run(&mut terminal, &mut app, &services, cli.tick_rate()).await;
    // restore even when the loop failed, then report the loop's error first
    let restored = restore_terminal(&mut terminal);
    result?;
    restored?;
    info!("Exiting Azure Key Vault browser");
    Ok(())
}

fn init_terminal() -> Result<Tui> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
