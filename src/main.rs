//! Terminal build status client.
//!
//! Connects to a development server's event stream and shows its build
//! status on stderr until interrupted.
//!
//! Usage:
//!   flogo-live
//!   flogo-live --url http://127.0.0.1:3000/.flogo/events
//!   flogo-live --max-retries 5 --debug
//!   RUST_LOG=flogo_live=trace flogo-live
//!
//! Press Enter to dismiss the current status, Ctrl+C to exit.
//!
//! Manual check for shutdown with an idle stdin:
//!   mkfifo /tmp/in && (sleep 60 > /tmp/in &) && flogo-live < /tmp/in
//!   then Ctrl+C; the process exits right after "Stopped".

// ============================================================================
// Imports
// ============================================================================

use std::io::{BufRead, BufReader};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use flogo_live::{LiveStatus, Result, SupervisorConfig};

// ============================================================================
// Types
// ============================================================================

/// Live build status for Flogo development servers.
#[derive(Parser, Debug)]
#[command(name = "flogo-live")]
#[command(version, about, long_about = None)]
struct Args {
    /// Event stream URL (overrides FLOGO_EVENTS_URL)
    #[arg(short = 'u', long, value_name = "URL")]
    url: Option<String>,

    /// First reconnect delay in milliseconds
    #[arg(long, value_name = "MS")]
    base_delay_ms: Option<u64>,

    /// Reconnect delay ceiling in milliseconds
    #[arg(long, value_name = "MS")]
    max_delay_ms: Option<u64>,

    /// Give up after this many consecutive failures
    #[arg(long, value_name = "N")]
    max_retries: Option<u32>,

    /// Enable debug logging
    #[arg(short = 'd', long)]
    debug: bool,
}

impl Args {
    /// Applies command-line overrides on top of `config`.
    fn apply(&self, mut config: SupervisorConfig) -> SupervisorConfig {
        if let Some(url) = &self.url {
            config = config.with_endpoint(url.clone());
        }
        if let Some(ms) = self.base_delay_ms {
            config = config.with_base_delay(Duration::from_millis(ms));
        }
        if let Some(ms) = self.max_delay_ms {
            config = config.with_max_delay(Duration::from_millis(ms));
        }
        if let Some(retries) = self.max_retries {
            config = config.with_max_retries(retries);
        }
        config
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = args.apply(SupervisorConfig::from_env());
    let live = Arc::new(LiveStatus::terminal(config)?);
    info!(endpoint = %live.supervisor().endpoint(), "Watching build status");

    let lines = forward_lines(BufReader::new(std::io::stdin()));
    let dismisser = tokio::spawn(dismiss_on_lines(Arc::clone(&live), lines));

    live.run_until(async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await;

    dismisser.abort();
    info!("Stopped");
    Ok(())
}

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging.
///
/// `RUST_LOG` takes precedence over `--debug`.
fn init_logging(debug: bool) {
    let fallback = if debug {
        "flogo_live=debug"
    } else {
        "flogo_live=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Reads lines on a detached thread.
///
/// The thread is never joined, so a read blocked on a terminal cannot
/// hold up runtime shutdown after Ctrl+C.
fn forward_lines<R>(reader: R) -> mpsc::UnboundedReceiver<String>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();

    let spawned = thread::Builder::new()
        .name("flogo-stdin".into())
        .spawn(move || {
            for line in reader.lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        debug!(error = %e, "Stdin reader unavailable, dismiss disabled");
    }

    rx
}

/// Each input line acts as the status bar's close control.
async fn dismiss_on_lines<S>(
    live: Arc<LiveStatus<S>>,
    mut lines: mpsc::UnboundedReceiver<String>,
) where
    S: flogo_live::Surface + 'static,
{
    while lines.recv().await.is_some() {
        live.dismiss();
    }
}

// ============================================================================
// Tests
// ============================================================================
