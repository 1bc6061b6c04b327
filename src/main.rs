// MIT License - Copyright (c) 2026 Peter Wright
// Line-oriented host for the alarm panel node

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use alarm_panel::constants::DEFAULT_REGISTRATION_DELAY_MS;
use alarm_panel::{
    listener, AlarmPanel, FileStore, PanelError, PanelMessage, PanelNodeConfig, StateMessage,
    StateReply,
};

/// Listener id under which the host itself receives state changes.
const STDOUT_LISTENER: &str = "stdout";

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "alarm-panel-node")]
#[command(about = "Alarm panel node: reads flow messages on stdin, writes replies and state changes on stdout")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "alarm-panel.toml")]
    config: PathBuf,

    /// Override the shared store file from the config
    #[arg(long)]
    store: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct Config {
    #[serde(default)]
    node: NodeToml,
    #[serde(default)]
    store: StoreToml,
}

#[derive(Debug, Deserialize)]
struct NodeToml {
    #[serde(default = "default_node_id")]
    id: String,
    #[serde(default = "default_node_name")]
    name: String,
    #[serde(default = "default_registration_delay")]
    registration_delay_ms: u64,
}

impl Default for NodeToml {
    fn default() -> Self {
        Self {
            id: default_node_id(),
            name: default_node_name(),
            registration_delay_ms: default_registration_delay(),
        }
    }
}

fn default_node_id() -> String {
    "alarm-panel".to_string()
}
fn default_node_name() -> String {
    "Alarm Panel".to_string()
}
fn default_registration_delay() -> u64 {
    DEFAULT_REGISTRATION_DELAY_MS
}

#[derive(Debug, Deserialize)]
struct StoreToml {
    #[serde(default = "default_store_path")]
    path: PathBuf,
}

impl Default for StoreToml {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("alarm-panel-state.json")
}

fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        info!("No config file at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    let text = std::fs::read_to_string(path).context("Failed to read config file")?;
    toml::from_str(&text).context("Failed to parse config file")
}

fn build_node_config(toml: &NodeToml) -> PanelNodeConfig {
    PanelNodeConfig::builder()
        .id(&toml.id)
        .name(&toml.name)
        .registration_delay_ms(toml.registration_delay_ms)
        .build()
}

// ---------------------------------------------------------------------------
// Output lines
// ---------------------------------------------------------------------------

// Every line shares the {now, op, ...} shape

#[derive(Serialize)]
struct ReplyLine<'a> {
    now: u64,
    op: &'static str,
    reply: &'a StateReply,
}

#[derive(Serialize)]
struct StateLine<'a> {
    now: u64,
    op: &'static str,
    msg: &'a StateMessage,
}

fn now_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

fn emit(out: &mpsc::UnboundedSender<String>, line: &impl Serialize) {
    match serde_json::to_string(line) {
        Ok(json) => {
            let _ = out.send(json);
        }
        Err(e) => error!("Failed to serialize output line: {e}"),
    }
}

fn emit_reply(out: &mpsc::UnboundedSender<String>, reply: &StateReply) {
    emit(
        out,
        &ReplyLine {
            now: now_epoch_ms(),
            op: "REPLY",
            reply,
        },
    );
}

// ---------------------------------------------------------------------------
// Input handling
// ---------------------------------------------------------------------------

async fn handle_line(line: &str, panel: &AlarmPanel, out: &mpsc::UnboundedSender<String>) {
    let msg = match serde_json::from_str::<PanelMessage>(line) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Failed to parse message: {e}");
            emit_reply(out, &StateReply::failure(&PanelError::InvalidPayload));
            return;
        }
    };

    let result = panel.set_state(msg).await;
    emit_reply(out, &StateReply::from(&result));
    // fan-out handles are dropped: deliveries continue detached
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity (e.g. RUST_LOG=debug or RUST_LOG=alarm_panel=trace).
    // Default: info. Logs go to stderr; stdout carries only JSON lines.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // systemd journal already adds timestamps, so omit them when running under systemd
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt()
            .without_time()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter)
            .init();
    }

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let store_path = cli.store.unwrap_or(config.store.path);

    info!("Using shared store {}", store_path.display());
    let store = Arc::new(FileStore::open(&store_path));
    let panel = Arc::new(AlarmPanel::new(build_node_config(&config.node), store));

    // Single writer task so concurrent deliveries never interleave lines
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let writer_handle = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = out_rx.recv().await {
            let written = async {
                stdout.write_all(line.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await
            };
            if let Err(e) = written.await {
                error!("Failed to write to stdout: {e}");
                break;
            }
        }
    });

    let state_tx = out_tx.clone();
    panel
        .register_state_listener(
            STDOUT_LISTENER,
            listener(move |msg| {
                emit(
                    &state_tx,
                    &StateLine {
                        now: now_epoch_ms(),
                        op: "STATE",
                        msg: &msg,
                    },
                );
            }),
        )
        .await;

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    info!(
        "{} running. Send messages as JSON lines on stdin; SIGINT/SIGTERM or EOF to stop.",
        panel.config().name
    );
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        debug!("Message received: {line}");
                        handle_line(line, &panel, &out_tx).await;
                    }
                    Ok(None) => {
                        info!("Input closed, shutting down...");
                        break;
                    }
                    Err(e) => {
                        error!("Failed to read stdin: {e}");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT, shutting down...");
                break;
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                break;
            }
        }
    }

    panel.deregister_state_listener(STDOUT_LISTENER).await;
    // The writer drains until every sender is gone, including the clone held
    // by the stdout listener in detached deliveries still in flight.
    drop(out_tx);
    drop(panel);
    if let Err(e) = writer_handle.await {
        warn!("Output writer failed: {e}");
    }

    info!("Shutdown complete");
    Ok(())
}
