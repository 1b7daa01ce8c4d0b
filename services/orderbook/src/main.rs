//! Order Book Store Service
//!
//! Feeds newline-delimited JSON instruction records through the book actor
//! and prints the resulting depth view.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use orderbook_store::{InstructionEvent, OrderBookService, ServiceConfig, StoreError};
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// Order book store CLI
#[derive(Parser)]
#[clap(name = "orderbook-store")]
#[clap(about = "Level-indexed order book store")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    /// JSON configuration file
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[clap(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply instructions and print the book
    Replay {
        /// Input file of JSON lines (stdin when omitted)
        input: Option<PathBuf>,

        /// Number of levels to print
        #[clap(long)]
        depth: Option<u32>,

        /// Print a metrics report after the book
        #[clap(long)]
        metrics: bool,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ServiceConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServiceConfig::default(),
    };

    let directive = if cli.debug {
        "orderbook_store=debug"
    } else {
        config.log_directive.as_str()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(directive.parse()?),
        )
        .with_target(false)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Replay {
            input,
            depth,
            metrics,
        } => {
            let reader: Box<dyn AsyncBufRead + Unpin> = match input {
                Some(path) => Box::new(BufReader::new(
                    tokio::fs::File::open(&path)
                        .await
                        .with_context(|| format!("opening {}", path.display()))?,
                )),
                None => Box::new(BufReader::new(tokio::io::stdin())),
            };
            run_replay(&config, reader, depth, metrics).await
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn run_replay(
    config: &ServiceConfig,
    reader: Box<dyn AsyncBufRead + Unpin>,
    depth: Option<u32>,
    print_metrics: bool,
) -> Result<()> {
    let (book, task) = OrderBookService::spawn(config);

    let mut lines = reader.lines();
    let mut line_no = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        let event: InstructionEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = line_no, error = %e, "skipping unparseable record");
                continue;
            }
        };
        match book.apply(event).await {
            Ok(()) => {}
            Err(e @ StoreError::EmptyBookAfterDelete { .. }) => {
                info!(line = line_no, "{e}");
            }
            Err(e) => {
                warn!(line = line_no, error = %e, "instruction failed");
            }
        }
    }

    let depth = depth.unwrap_or_else(|| book.default_depth());
    let rows = book.order_book(depth).await?;
    println!("{}", serde_json::to_string_pretty(&rows)?);

    if print_metrics {
        eprintln!("{}", book.metrics().format_report());
    }

    book.shutdown().await?;
    let store = task.await?;
    info!(entries = store.len(), lines = line_no, "replay complete");
    Ok(())
}
