mod app;
mod bridge;
mod classify;
mod config;
mod db;
mod domain;
mod harvest;
mod infrastructure;
mod overlay;
mod pipeline;
mod rules;
mod tasks;
mod web_content;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use infrastructure::{directories, logging, shutdown};

#[derive(Parser)]
#[command(name = "linkguard")]
#[command(version)]
#[command(about = "Site blocker and link-safety annotator host for the LinkGuard extension")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run as the browser's native-messaging host (default)
    Serve,
    /// Manage the blocked-site list
    #[command(subcommand)]
    Block(BlockCommand),
    /// Inspect or rebuild the installed redirect rules
    #[command(subcommand)]
    Rules(RulesCommand),
    /// Annotate every link on a page (local file or http(s) URL)
    Scan {
        source: String,
        /// Base URL used to resolve relative links in a local file
        #[arg(short, long, value_name = "URL")]
        base_url: Option<String>,
        /// Write the annotated page here
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Classify the given URLs and print a report
    Classify {
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

#[derive(Subcommand)]
enum BlockCommand {
    Add { site: String },
    Remove { site: String },
    List,
}

#[derive(Subcommand)]
enum RulesCommand {
    Sync,
    Show,
    /// Report which rule, if any, redirects a top-level navigation to URL
    Check { url: String },
}

/// Chromium passes the caller's origin (plus `--parent-window` on Windows);
/// Firefox passes the host manifest path followed by the add-on ID.
fn launched_by_browser(args: &[String]) -> bool {
    match args.get(1) {
        Some(origin) if origin.starts_with("chrome-extension://") => true,
        Some(manifest) => manifest.ends_with(".json") && args.len() == 3,
        None => false,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let command = if launched_by_browser(&args) {
        Command::Serve
    } else {
        Cli::parse_from(args).command.unwrap_or(Command::Serve)
    };

    let config = config::load_config()?;
    let paths = directories::ensure_directories(&config.directories)?;
    logging::init_tracing(&config, &paths)?;

    let shutdown = shutdown::Shutdown::new();
    shutdown::install_signal_handlers(shutdown.clone());

    let app = app::LinkGuardApp::initialize(config, paths, shutdown).await?;
    let outcome = match command {
        Command::Serve => {
            let outcome = app.serve().await;
            if let Err(err) = &outcome {
                tracing::error!(target: "app", error = %err, "host stopped with an error");
            }
            // The runtime would otherwise wait on the blocking stdin reader.
            std::process::exit(exit_code(&outcome));
        }
        Command::Block(BlockCommand::Add { site }) => app.add_site(&site).await,
        Command::Block(BlockCommand::Remove { site }) => app.remove_site(&site).await,
        Command::Block(BlockCommand::List) => app.list_sites().await,
        Command::Rules(RulesCommand::Sync) => app.sync_rules().await,
        Command::Rules(RulesCommand::Show) => app.show_rules().await,
        Command::Rules(RulesCommand::Check { url }) => app.check_url(&url).await,
        Command::Scan {
            source,
            base_url,
            output,
        } => app.scan(&source, base_url.as_deref(), output).await,
        Command::Classify { urls } => app.classify(urls).await,
    };
    app.close().await;
    outcome
}

fn exit_code(outcome: &Result<()>) -> i32 {
    if outcome.is_ok() {
        0
    } else {
        1
    }
}
