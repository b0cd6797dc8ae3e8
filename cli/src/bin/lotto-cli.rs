//! lotto-cli: inspect and operate the lottery state directly.
//!
//! Works on the data directory directly, so it refuses to start while `lottod`
//! holds the state; use the daemon's own commands then.

use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use clap::Parser;
use lotto_cli::app::{build_controller, load_config, open_engine};
use lotto_cli::display::phase_marker;
use lotto_cli::logging::init_logging;
use lotto_cli::{format_coins, render_results, Config, OperatorArgs, OperatorCommand};
use lotto_core::{DrawResult, Interval};
use lotto_engine::{DrawEngine, DrawOutcome};
use owo_colors::OwoColorize;
use serde_json::json;
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    let args = OperatorArgs::parse();
    init_logging("warn");

    let config = load_config(&args.config, args.data_dir.clone())?;
    let now = Utc::now();
    let engine = open_engine(&config, now)?;

    match args.command {
        OperatorCommand::Status => status(&engine, args.json),
        OperatorCommand::Draw => draw(&config, engine, args.json).await,
        OperatorCommand::Repost => {
            let mut controller = build_controller(&config, engine)?;
            let message = controller.repost(Utc::now()).await?;
            println!("{} {}", "Board posted:".green(), message);
            Ok(())
        }
        OperatorCommand::Verify { interval } => verify(&engine, interval),
        OperatorCommand::Show { interval } => {
            let result = stored_result(&engine, interval)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", render_results(&result, &engine.rules().utc_offset));
            }
            Ok(())
        }
        OperatorCommand::History => history(&engine, args.json),
    }
}

fn stored_result(engine: &DrawEngine, interval: Interval) -> Result<DrawResult> {
    engine
        .draw_result(interval)?
        .ok_or_else(|| anyhow!("no draw recorded for {}", interval))
}

fn status(engine: &DrawEngine, as_json: bool) -> Result<()> {
    let now = Utc::now();
    let board = engine.board(now);

    if as_json {
        let report = json!({
            "interval": board.interval,
            "phase": board.phase,
            "next_draw": board.next_draw,
            "records": engine.ledger().len(),
            "last_id": engine.ledger().last_id(),
            "pot": board.pot,
            "total_tickets": board.total_tickets,
            "standings": board.standings,
            "ranks": board.ranks,
            "message": engine.state().last_displayed_message_ref,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "\n{} {} {}",
        "Guild Lottery".cyan().bold(),
        board.interval,
        phase_marker(board.phase)
    );
    println!("═══════════════════════════════════");
    println!("{:<12} {}", "Next draw:".bright_black(), board.next_draw);
    println!("{:<12} {}", "Pot:".bright_black(), format_coins(board.pot).bright_yellow());
    println!(
        "{:<12} {} ({} records, last id {:?})",
        "Tickets:".bright_black(),
        board.total_tickets,
        engine.ledger().len(),
        engine.ledger().last_id()
    );
    for standing in &board.standings {
        println!("  {}: {}", standing.user, standing.tickets);
    }
    println!();
    for rank in &board.ranks {
        println!("  {:<12} {}", rank.label, format_coins(rank.amount as i64));
    }
    println!();
    Ok(())
}

async fn draw(config: &Config, engine: DrawEngine, as_json: bool) -> Result<()> {
    let mut controller = build_controller(config, engine)?;

    // Catch up with the log first so late deposits of the window count
    if let Err(e) = controller.pull().await {
        warn!(error = %e, "could not sync before drawing, using stored ledger");
    }

    let outcome = controller.draw(Utc::now()).await?;
    if as_json {
        let report = match &outcome {
            DrawOutcome::NotDue { interval, next_draw } => json!({
                "status": "not_due",
                "interval": interval,
                "next_draw": next_draw,
            }),
            DrawOutcome::Drawn(result) => json!({ "status": "drawn", "result": result }),
            DrawOutcome::Recovered(result) => json!({ "status": "recovered", "result": result }),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match outcome {
        DrawOutcome::NotDue { interval, next_draw } => {
            println!("{} {} is not due before {}", "⏳".yellow(), interval, next_draw);
        }
        DrawOutcome::Drawn(result) | DrawOutcome::Recovered(result) => {
            print!("{}", render_results(&result, &config.rules()?.utc_offset));
            println!("{} seed {}", "✓ Draw committed,".green(), result.seed);
        }
    }
    Ok(())
}

fn verify(engine: &DrawEngine, interval: Interval) -> Result<()> {
    let result = stored_result(engine, interval)?;
    match result.verify() {
        Ok(()) => {
            println!(
                "{} {} replays from seed {} ({} tickets)",
                "✓".green(),
                interval,
                result.seed,
                result.log.len()
            );
            Ok(())
        }
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            bail!("verification failed for {}", interval)
        }
    }
}

fn history(engine: &DrawEngine, as_json: bool) -> Result<()> {
    let mut results = Vec::new();
    for interval in engine.history()? {
        results.push(stored_result(engine, interval)?);
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("{}", "No draws yet".bright_black());
        return Ok(());
    }
    for result in &results {
        let winners: Vec<String> = result.winners.iter().map(|w| w.to_string()).collect();
        println!(
            "{}  {}  {}",
            result.interval.to_string().cyan(),
            format_coins(result.pot).bright_yellow(),
            winners.join(", ")
        );
    }
    Ok(())
}
