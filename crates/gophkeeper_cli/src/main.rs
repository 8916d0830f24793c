//! gophkeeper client
//!
//! Interactive shell over a local encrypted vault that syncs in the
//! background with a gophkeeper server.
//!
//! # Commands
//!
//! - `register` / `login` - Authenticate against the server
//! - `set` / `get` / `delete` / `list` / `export` - Work with secrets
//! - `sync` / `status` - Run a cycle now, show sync state

mod client;
mod commands;
mod shell;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use gophkeeper_core::{LocalStore, Vault};
use gophkeeper_sync_engine::{
    HttpTransport, SyncConfig, SyncEngine, SyncRunner, DEFAULT_SERVER_URL,
};
use tokio::sync::{mpsc, watch};
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

use client::ReqwestClient;
use shell::{Outcome, Shell};

/// Password manager with offline vault and background sync.
#[derive(Parser)]
#[command(name = "gophkeeper")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the local vault database
    #[arg(long, env = "GOPHKEEPER_DB", default_value = "gophkeeper.db")]
    db: PathBuf,

    /// Server base URL
    #[arg(long, env = "GOPHKEEPER_ADDR", default_value = DEFAULT_SERVER_URL)]
    addr: String,

    /// Seconds between background sync cycles
    #[arg(long, env = "GOPHKEEPER_SYNC_INTERVAL", default_value_t = 60)]
    interval: u64,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Master password (prompted for when absent)
    #[arg(long, env = "GOPHKEEPER_MASTER_PASSWORD", hide_env_values = true)]
    master_password: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    if cli.interval == 0 {
        return Err("--interval must be at least 1 second".into());
    }

    let master_password = match cli.master_password {
        Some(password) => Zeroizing::new(password),
        None => Zeroizing::new(rpassword::prompt_password("Master password: ")?),
    };

    let store = Arc::new(LocalStore::open(&cli.db)?);
    let vault = Vault::unlock(Arc::clone(&store), &master_password)?;
    tracing::info!(db = %cli.db.display(), "vault unlocked");

    let config = SyncConfig::new(cli.addr)
        .with_interval(Duration::from_secs(cli.interval))
        .with_request_timeout(Duration::from_secs(cli.timeout));
    // reqwest's blocking client must be created and dropped outside tokio.
    let client = ReqwestClient::new(config.request_timeout)?;
    let transport = HttpTransport::new(config.server_url.clone(), client);
    let engine = Arc::new(SyncEngine::new(config, transport, store));
    let shell = Arc::new(Shell::new(vault, Arc::clone(&engine), master_password));

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(Arc::clone(&shell)));
    runtime.shutdown_timeout(Duration::from_secs(1));
    result
}

async fn run(shell: Arc<Shell<ReqwestClient>>) -> Result<(), Box<dyn std::error::Error>> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let engine = Arc::clone(shell.engine());
    let interval = engine.config().interval;
    let runner = SyncRunner::spawn(engine, interval, shutdown_rx);

    let (line_tx, mut line_rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || read_lines(line_tx));

    println!("gophkeeper {}, type `help` for commands", env!("CARGO_PKG_VERSION"));
    prompt();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = line_rx.recv() => {
                let Some(line) = line else {
                    break;
                };
                let shell = Arc::clone(&shell);
                match tokio::task::spawn_blocking(move || shell.execute(&line)).await? {
                    Ok(Outcome::Exit) => break,
                    Ok(Outcome::Continue(output)) => {
                        if !output.is_empty() {
                            println!("{output}");
                        }
                    }
                    Err(e) => eprintln!("error: {e}"),
                }
                prompt();
            }
            _ = &mut ctrl_c => {
                println!();
                break;
            }
        }
    }

    let _ = shutdown_tx.send(true);
    runner.stop().await;
    Ok(())
}

fn read_lines(tx: mpsc::UnboundedSender<String>) {
    for line in io::stdin().lock().lines() {
        match line {
            Ok(line) => {
                if tx.send(line).is_err() {
                    return;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "stdin closed");
                return;
            }
        }
    }
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}
