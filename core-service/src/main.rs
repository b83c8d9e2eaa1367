//! FireSentinel Edge Agent - Main Entry Point

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::watch;

use firesentinel_core::constants::{APP_NAME, APP_VERSION};
use firesentinel_core::logic::capture::probe;
use firesentinel_core::logic::config::AgentConfig;
use firesentinel_core::logic::escalation::Escalator;
use firesentinel_core::logic::features::LayoutInfo;
use firesentinel_core::logic::model::load_bundle;
use firesentinel_core::logic::pipeline::{Monitor, TriggerHandler};

#[derive(Parser)]
#[command(name = "firesentinel-agent", version, about = "Wildfire sensor escalation agent")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the monitor loop (default)
    Run,
    /// Take one test capture and report whether the camera works
    ProbeCamera,
    /// Run the configured validation cascade on an image file
    CheckFire {
        /// JPEG or PNG to validate
        image: PathBuf,
    },
    /// Load and validate the classifier bundle
    CheckBundle,
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Ignoring unreadable .env: {}", e);
        }
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    log::info!("Starting {} agent v{}...", APP_NAME, APP_VERSION);

    let config = AgentConfig::from_env().context("invalid configuration")?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::ProbeCamera => probe_camera(&config).await,
        Command::CheckFire { image } => check_fire(&config, image).await,
        Command::CheckBundle => check_bundle(&config),
    }
}

async fn run(config: AgentConfig) -> Result<()> {
    config.log_summary();

    let layout = LayoutInfo::current();
    log::info!(
        "Feature layout v{} hash {:08x}: {}",
        layout.version,
        layout.hash,
        layout.feature_names.join(", ")
    );

    let bundle = load_bundle(&config.bundle_source()).context("cannot load classifier bundle")?;
    let escalator = Escalator::new(config.threshold)?;

    let source = config.build_source()?;
    let capture = config.build_capture()?;
    probe(capture.as_ref()).await;

    let cascade = Arc::new(config.build_cascade());
    log::info!("Validation stages: {}", cascade.stage_names().join(" -> "));

    let handler = TriggerHandler::new(capture, cascade, config.build_dispatcher());
    let monitor = Monitor::spawn(source, Arc::new(bundle.classifier), escalator, handler);

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::info!("Shutdown requested");
                let _ = stop_tx.send(true);
            }
            Err(e) => {
                log::error!("Cannot listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    });

    monitor.run(config.sample_interval, stop_rx).await;
    log::info!("{} agent stopped", APP_NAME);
    Ok(())
}

async fn probe_camera(config: &AgentConfig) -> Result<()> {
    let capture = config.build_capture()?;
    if !probe(capture.as_ref()).await {
        bail!("camera {} unavailable", capture.name());
    }
    println!("camera {} OK", capture.name());
    Ok(())
}

async fn check_fire(config: &AgentConfig, image: PathBuf) -> Result<()> {
    let bytes = tokio::fs::read(&image)
        .await
        .with_context(|| format!("cannot read {}", image.display()))?;

    let cascade = config.build_cascade();
    let report = cascade.evaluate(Some(bytes.as_slice())).await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    println!(
        "{}: {}",
        image.display(),
        if report.should_escalate() { "FIRE - would escalate" } else { "no escalation" }
    );
    Ok(())
}

fn check_bundle(config: &AgentConfig) -> Result<()> {
    let bundle = load_bundle(&config.bundle_source()).context("classifier bundle invalid")?;
    println!(
        "bundle OK: {} trees, features [{}], sha256 {}",
        bundle.classifier.tree_count(),
        bundle.feature_names.join(", "),
        bundle.model_sha256
    );
    Ok(())
}
