//! lottod: polls the guild log, keeps the board current and runs the monthly
//! draw. Operator commands are read from stdin.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use lotto_cli::app::{build_controller, load_config, open_engine};
use lotto_cli::logging::init_logging;
use lotto_cli::{format_coins, DaemonArgs};
use lotto_engine::{spawn, DrawOutcome, EngineHandle, SystemClock};
use owo_colors::OwoColorize;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = DaemonArgs::parse();
    init_logging("info");

    let config = load_config(&args.config, args.data_dir)?;

    println!("{}", "Guild Lottery Daemon".cyan().bold());
    println!("{}: {}", "Config".yellow().bold(), args.config.display());
    println!("{}: {}", "Guild".yellow().bold(), config.guild.id);
    println!(
        "{}: {} ({:?})",
        "Data".yellow().bold(),
        config.storage.data_dir.display(),
        config.storage.backend
    );
    if config.guild.api_key.is_empty() {
        warn!("no API key configured, the guild log will reject requests");
    }

    let engine = open_engine(&config, Utc::now())?;
    println!(
        "{}: {} (next draw {})",
        "Interval".yellow().bold(),
        engine.interval(),
        engine.next_draw()
    );
    if config.lottery.auto_draw {
        println!("{}", "Automatic draws enabled".green());
    }
    println!("{}", "Commands: draw | repost | status | tick | quit".bright_black());

    let controller = build_controller(&config, engine)?;
    let service = spawn(controller, config.schedule(), Arc::new(SystemClock));

    let console = tokio::spawn(read_commands(service.handle.clone(), stdin_lines()));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!(error = %e, "failed to listen for ctrl-c");
            }
            info!("shutdown requested");
        }
        _ = wait_for_quit(console) => {}
    }

    service.shutdown().await;
    Ok(())
}

/// Resolves when the operator typed `quit`; a closed stdin keeps the daemon up
async fn wait_for_quit(console: tokio::task::JoinHandle<bool>) {
    match console.await {
        Ok(true) => {}
        _ => std::future::pending::<()>().await,
    }
}

/// Stdin is read on a plain thread so a pending read never holds up shutdown
fn stdin_lines() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(8);
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            match line {
                Ok(line) => {
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "stdin closed");
                    break;
                }
            }
        }
    });
    rx
}

/// Returns `true` on `quit`, `false` when stdin closes
async fn read_commands(handle: EngineHandle, mut lines: mpsc::Receiver<String>) -> bool {
    while let Some(line) = lines.recv().await {
        match line.trim() {
            "" => {}
            "quit" | "exit" => return true,
            "draw" => match handle.draw().await {
                Ok(DrawOutcome::NotDue { interval, next_draw }) => {
                    println!("{} {} is not due before {}", "⏳".yellow(), interval, next_draw);
                }
                Ok(outcome) => {
                    if let Some(result) = outcome.result() {
                        println!("{} {}", "Draw complete:".green().bold(), result.interval);
                        for (rank, winner) in result.placements() {
                            println!("  {:<12} {} {}", rank.label, winner, format_coins(rank.amount as i64));
                        }
                    }
                }
                Err(e) => println!("{} {}", "Draw failed:".red().bold(), e),
            },
            "repost" => match handle.repost().await {
                Ok(message) => println!("{} {}", "Board posted:".green(), message),
                Err(e) => println!("{} {}", "Repost failed:".red().bold(), e),
            },
            "status" => match handle.status().await {
                Ok(status) => {
                    println!("{}: {} ({:?})", "Interval".yellow(), status.interval, status.phase);
                    println!("{}: {}", "Next draw".yellow(), status.next_draw);
                    println!("{}: {}", "Pot".yellow(), format_coins(status.pot));
                    println!("{}: {} from {} users", "Tickets".yellow(), status.total_tickets, status.holders);
                    println!("{}: {} (last id {:?})", "Records".yellow(), status.records, status.last_id);
                    if status.ledger_dirty {
                        println!("{}", "Ledger has unsaved records".red());
                    }
                }
                Err(e) => println!("{} {}", "Status failed:".red().bold(), e),
            },
            "tick" => match handle.tick().await {
                Ok(report) => println!(
                    "{} appended {:?}, malformed {}, display updated {}",
                    "Tick:".green(),
                    report.appended.map(|a| a.added),
                    report.malformed,
                    report.display_updated
                ),
                Err(e) => println!("{} {}", "Tick failed:".red().bold(), e),
            },
            other => println!("{} {}", "Unknown command:".red(), other),
        }
    }
    false
}
