//! screenlogic -- query and drive a ScreenLogic pool controller.
//!
//! Usage:
//!   screenlogic status                     # Circuit states
//!   screenlogic --addr 10.0.0.9 config     # Controller configuration
//!   screenlogic on "Pool Light"            # Switch a circuit by name or id
//!   screenlogic --json status              # Machine-readable output

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use screenlogic_adapter::render;
use screenlogic_adapter::{expand_tilde, Adapter, Config};

#[derive(Parser)]
#[command(name = "screenlogic", about = "ScreenLogic pool controller client")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "~/.screenlogic/config.toml")]
    config: String,

    /// Controller address, overrides the config file
    #[arg(short, long)]
    addr: Option<String>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show controller date and time
    Time,
    /// Show controller firmware version
    Version,
    /// Show controller configuration
    Config,
    /// Show circuit states
    Status,
    /// Turn a circuit on
    On {
        /// Circuit id or name
        circuit: String,
    },
    /// Turn a circuit off
    Off {
        /// Circuit id or name
        circuit: String,
    },
    /// Flip a circuit
    Toggle {
        /// Circuit id or name
        circuit: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut cfg = Config::load_or_default(&expand_tilde(&cli.config))?;
    init_tracing(&cfg);

    if let Some(addr) = cli.addr {
        cfg.adapter.ip_address = addr;
    }
    let adapter = Adapter::new(&cfg.adapter)?;

    let result = run(&adapter, cli.command, cli.json).await;
    if let Err(e) = adapter.close(cfg.adapter.close_grace()).await {
        tracing::debug!(error = %e, "close failed");
    }
    result
}

fn init_tracing(cfg: &Config) {
    let default_filter = cfg
        .logging
        .filter
        .clone()
        .unwrap_or_else(|| "screenlogic_adapter=info".into());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cfg.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(adapter: &Adapter, command: Commands, json: bool) -> anyhow::Result<()> {
    match command {
        Commands::Time => {
            let t = adapter.get_time().await?;
            emit(json, &t, || t.format("%Y-%m-%d %H:%M:%S").to_string())?;
        }
        Commands::Version => {
            let v = adapter.get_version().await?;
            emit(json, &v, || v.clone())?;
        }
        Commands::Config => {
            let cfg = adapter.get_config().await?;
            emit(json, &cfg, || render::config_text(&cfg))?;
        }
        Commands::Status => {
            let status = adapter.get_status().await?;
            // Names are a nicety; show ids alone if config fails.
            let cfg = if json { None } else { adapter.get_config().await.ok() };
            emit(json, &status, || render::status_text(&status, cfg.as_ref()))?;
        }
        Commands::On { circuit } => {
            let id = resolve_circuit(adapter, &circuit).await?;
            adapter.set_circuit(id, true).await?;
            emit(json, &serde_json::json!({ "circuit": id, "on": true }), || {
                format!("circuit {id} on")
            })?;
        }
        Commands::Off { circuit } => {
            let id = resolve_circuit(adapter, &circuit).await?;
            adapter.set_circuit(id, false).await?;
            emit(json, &serde_json::json!({ "circuit": id, "on": false }), || {
                format!("circuit {id} off")
            })?;
        }
        Commands::Toggle { circuit } => {
            let id = resolve_circuit(adapter, &circuit).await?;
            let on = adapter.toggle_circuit(id).await?;
            emit(json, &serde_json::json!({ "circuit": id, "on": on }), || {
                format!("circuit {id} {}", if on { "on" } else { "off" })
            })?;
        }
    }
    Ok(())
}

/// A numeric argument is a circuit id; anything else is looked up by name.
async fn resolve_circuit(adapter: &Adapter, arg: &str) -> anyhow::Result<u32> {
    if let Ok(id) = arg.parse::<u32>() {
        return Ok(id);
    }
    let cfg = adapter.get_config().await?;
    cfg.circuit_by_name(arg)
        .or_else(|| {
            cfg.circuits
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(arg))
        })
        .map(|c| c.id)
        .with_context(|| format!("no circuit named {arg:?}"))
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        let text = text();
        print!("{text}");
        if !text.ends_with('\n') {
            println!();
        }
    }
    Ok(())
}
