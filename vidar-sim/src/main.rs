//! # vidar-sim
//!
//! Runs the demo command set against an in-memory transport. Without a
//! script it lists the declared commands; with one it syncs the commands
//! and replays each scripted event through the router, printing replies.
//!
//! ```bash
//! vidar-sim --print-payloads
//! vidar-sim --config vidar.toml --script scripts/demo.json
//! ```

mod console;
mod demo;
mod script;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use vidar::{AutocompleteRequest, Interaction, Vidar, VidarConfig, load_config};

use crate::console::{ConsoleRegistrar, ConsoleResponder, ConsoleSuggestions};
use crate::script::{ScriptEvent, load_script};

#[derive(Parser, Debug)]
#[command(name = "vidar-sim")]
#[command(about = "Replay slash-command interactions against the vidar router")]
#[command(version)]
struct Args {
    /// Settings file (TOML, YAML or JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long)]
    log_level: Option<String>,

    /// JSON array of events to replay
    #[arg(long)]
    script: Option<PathBuf>,

    /// Print the registration payloads as JSON and exit
    #[arg(long)]
    print_payloads: bool,
}

async fn run() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?
            .with_context(|| format!("config file {} not found", path.display()))?,
        None => VidarConfig::default(),
    };

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.log_level.clone());
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.parse().unwrap_or_default()),
        )
        .init();

    info!("Starting vidar-sim v{}", env!("CARGO_PKG_VERSION"));

    let vidar = Vidar::new(config);
    demo::declare(&vidar)?;

    if args.print_payloads {
        let payloads: Vec<_> = vidar
            .registry()
            .specs()
            .iter()
            .map(|spec| spec.payload().clone())
            .collect();
        println!("{}", serde_json::to_string_pretty(&payloads)?);
        return Ok(());
    }

    match &args.script {
        Some(path) => replay(&vidar, load_script(path)?).await,
        None => {
            list_commands(&vidar);
            Ok(())
        }
    }
}

fn list_commands(vidar: &Vidar) {
    for spec in vidar.registry().specs() {
        println!("/{} - {}", spec.name(), spec.description());
        let tree = spec.tree();
        for (path, arguments) in tree.nodes() {
            if path.is_root() && !tree.children.is_empty() {
                continue;
            }
            let mut line = format!("  /{}", spec.name());
            if !path.is_root() {
                line.push(' ');
                line.push_str(&path.to_string());
            }
            for argument in arguments {
                line.push(' ');
                line.push_str(&argument.to_syntax());
            }
            println!("{line}");
        }
    }
}

async fn replay(vidar: &Vidar, events: Vec<ScriptEvent>) -> Result<()> {
    let registrar = Arc::new(ConsoleRegistrar::new(&vidar.config().debug_guilds));
    let report = vidar.registry().initialize(registrar).await?;
    if !report.is_clean() {
        info!(?report, "sync finished with problems");
    }

    let router = vidar.router();
    for (index, event) in events.into_iter().enumerate() {
        let label = event.label(index + 1);
        match event {
            ScriptEvent::Invoke(data) => {
                let responder = Arc::new(ConsoleResponder::new(label.clone()));
                let outcome = router.dispatch(Interaction::new(data, responder)).await;
                router.flush_notices().await;
                println!("[{label}] outcome: {outcome:?}");
            }
            ScriptEvent::Autocomplete {
                data,
                focused,
                query,
            } => {
                let responder = Arc::new(ConsoleSuggestions::new(label.clone()));
                let request = AutocompleteRequest::new(data, focused, query, responder);
                let outcome = router.autocomplete(request).await;
                println!("[{label}] outcome: {outcome:?}");
            }
        }
    }

    vidar.registry().flush().await;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[vidar-sim] Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
