//! peerchat: two-party chat over a single TCP connection.
//!
//! One side hosts (`peerchat host --port 5000`), the other joins
//! (`peerchat join --host 10.0.0.7 --port 5000`). With no subcommand the
//! role is asked for interactively.

mod app;
mod setup;

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use clap::{Parser, Subcommand};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use peerchat_core::parse_port;
use peerchat_transport::{Bridge, ChannelPresentation, ConnectConfig, Session};
use tracing::info;
use tracing_subscriber::EnvFilter;

use app::App;
use setup::{Setup, DEFAULT_HOST, DEFAULT_PORT};

const DEFAULT_LOG_FILTER: &str = "peerchat_transport=info,peerchat_cli=info";

#[derive(Parser)]
#[command(name = "peerchat", version)]
#[command(about = "Two-party chat over a single TCP connection")]
struct Cli {
    /// Append logs to this file (the chat window owns the terminal)
    #[arg(long, env = "PEERCHAT_LOG_FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand)]
enum Mode {
    /// Host a chat and wait for one peer
    Host {
        /// Port to listen on (all interfaces)
        #[arg(short, long, env = "PEERCHAT_PORT", default_value_t = DEFAULT_PORT, value_parser = port_arg)]
        port: u16,
    },
    /// Join a chat someone is hosting
    Join {
        /// Host name or IP of the peer
        #[arg(long, env = "PEERCHAT_HOST", default_value = DEFAULT_HOST)]
        host: String,

        /// Port the peer is listening on
        #[arg(short, long, env = "PEERCHAT_PORT", default_value_t = DEFAULT_PORT, value_parser = port_arg)]
        port: u16,
    },
}

impl Mode {
    fn into_config(self) -> ConnectConfig {
        match self {
            Mode::Host { port } => ConnectConfig::host(port),
            Mode::Join { host, port } => ConnectConfig::join(host, port),
        }
    }
}

fn port_arg(text: &str) -> Result<u16, String> {
    parse_port(text).map_err(|e| e.to_string())
}

/// `RUST_LOG` when set and valid, otherwise info for our own crates.
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn init_logging(path: &Path) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref()))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.log_file {
        init_logging(path)?;
    }

    let config = match cli.mode {
        Some(mode) => mode.into_config(),
        None => {
            let stdin = io::stdin();
            match setup::prompt(&mut stdin.lock(), &mut io::stdout())? {
                Setup::Start(config) => config,
                Setup::Cancelled => return Ok(()),
                Setup::Invalid(e) => {
                    eprintln!("{e}");
                    return Ok(());
                }
            }
        }
    };
    info!(role = %config.role, target = %config.target(), "starting");

    let (presentation, events) = ChannelPresentation::new();
    let session = Session::new(Bridge::new(presentation));
    let app = App::new(config.role);
    session.start(config)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

    let result = app.run(&session, events).await;

    execute!(stdout, cursor::Show, LeaveAlternateScreen)?;
    disable_raw_mode()?;
    println!("Session ended.");

    result.context("terminal failure")
}
