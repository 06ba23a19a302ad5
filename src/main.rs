use clap::Parser;
use prompt_packer::app::{self, proxy::StdoutProxy, sinks::NativeSink, state::AppState};
use prompt_packer::config;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the packer session
#[derive(Parser, Debug)]
#[command(
    name = "prompt-packer",
    version = env!("CARGO_PKG_VERSION"),
    about = "Pack selected project files into one LLM-ready document",
    long_about = "Loads a project, then reads JSON commands from stdin (one per line) and writes JSON events to stdout."
)]
struct Args {
    /// Project folder to load
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Config file to use instead of the platform default
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the event stream.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let initial_config = config::settings::load_config(args.config.as_deref())?;

    let mut app_state = AppState::new(initial_config);
    app_state.config_path = args.config.clone();
    let state = Arc::new(Mutex::new(app_state));
    let proxy = StdoutProxy;
    let sink: Arc<dyn app::sinks::OutputSink> = Arc::new(NativeSink);

    let root = std::fs::canonicalize(&args.root).unwrap_or(args.root);
    app::commands::load_project(root, proxy.clone(), state.clone());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        app::handle_ipc_message(line, sink.clone(), proxy.clone(), state.clone());
    }

    tracing::info!("Input closed. Shutting down.");
    app::state::lock_state(&state).cancel_current_generation();
    Ok(())
}
