//! `meshbridge` – demo driver for the meshcat bridge.
//!
//! 1. Loads `~/.meshbridge/config.toml`, writing the defaults on first run.
//! 2. Builds the cart-pole scene in a meshcat server (or an in-process scene
//!    when `dry_run = true`).
//! 3. Publishes the scripted cart-pole poses at the configured rate until the
//!    duration elapses or **Ctrl-C** is pressed, then disconnects.

mod cart_pole;
mod config;

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use meshbridge_middleware::{InMemoryScene, MeshcatClient, RemoteScene};
use meshbridge_runtime::{LoopSummary, MeshcatVisualizer, PublishLoop};
use meshbridge_types::VizError;
use tracing::{error, info, warn};

use crate::cart_pole::CartPole;
use crate::config::{Config, ConfigError};

fn main() -> ExitCode {
    let _telemetry = meshbridge_runtime::init_tracing("meshbridge");

    print_banner();

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping after the current publish …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; the run can only end at its duration");
    }

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "configuration rejected");
            println!("{}: {}", "Config error".red(), e);
            return ExitCode::FAILURE;
        }
    };
    print_plan(&cfg);

    // ── Run ───────────────────────────────────────────────────────────────
    match run(&cfg, shutdown) {
        Ok(summary) => {
            println!(
                "\n  {} {} publishes, {} poses sent, sim time {:.2} s{}",
                "✓".green().bold(),
                summary.publishes,
                summary.poses_sent,
                summary.final_time,
                if summary.interrupted { " (interrupted)" } else { "" }
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "visualizer run failed");
            println!("\n  {}: {}", "Run failed".red().bold(), e);
            if matches!(e, VizError::Connection { .. }) {
                println!(
                    "  Start a server with `{}` or set `{}` in the config.",
                    "meshcat-server".bold(),
                    "dry_run = true".bold()
                );
            }
            ExitCode::FAILURE
        }
    }
}

/// Load the config file, seeding it with defaults when absent.
fn load_config() -> Result<Config, ConfigError> {
    let cfg = match config::load()? {
        Some(cfg) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        None => {
            let defaults = Config::default();
            match config::save(&defaults) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => warn!(error = %e, "could not write default config; continuing with defaults"),
            }
            let mut cfg = defaults;
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };
    cfg.validate()?;
    Ok(cfg)
}

fn run(cfg: &Config, shutdown: Arc<AtomicBool>) -> Result<LoopSummary, VizError> {
    let scene: Box<dyn RemoteScene> = if cfg.dry_run {
        Box::new(InMemoryScene::new().without_log())
    } else {
        Box::new(MeshcatClient::new(cfg.zmq_url.clone()).with_request_timeout(cfg.request_timeout()))
    };

    let mut visualizer = MeshcatVisualizer::new(scene, &cart_pole::load_message(), cfg.visualizer())?;
    info!(prefix = %visualizer.prefix_path(), "scene ready");

    let outcome = PublishLoop::new(visualizer.draw_period(), cfg.duration_s)
        .with_target_realtime_rate(cfg.target_realtime_rate)
        .with_pose_log(cfg.animate)
        .with_shutdown(shutdown)
        .run(&mut visualizer, &mut CartPole::new());

    if let Ok(LoopSummary { log: Some(log), .. }) = &outcome
        && let Err(e) = visualizer.animate(log)
    {
        warn!(error = %e, "animation replay skipped");
    }

    let closed = visualizer.disconnect();
    let summary = outcome?;
    closed?;
    Ok(summary)
}

// ─────────────────────────────────────────────────────────────────────────────
// Console output
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", "  ┌─────────────────────────────────────┐".bold().cyan());
    println!("{}", "  │   meshbridge · pose → meshcat demo   │".bold().cyan());
    println!("{}", "  └─────────────────────────────────────┘".bold().cyan());
    println!();
}

fn print_plan(cfg: &Config) {
    let target = if cfg.dry_run {
        "in-process scene (dry run)".to_string()
    } else {
        cfg.zmq_url.clone()
    };
    println!("  Visualizer : {}", target.bold());
    println!("  Prefix     : /{}", cfg.prefix);
    println!(
        "  Publishing : every {:.1} ms for {:.1} s at {}× real time",
        cfg.draw_period_s * 1000.0,
        cfg.duration_s,
        cfg.target_realtime_rate
    );
    println!("  Press {} to stop early.\n", "Ctrl-C".bold());
}
