use chrono::NaiveDateTime;
use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

use remindr::analytics::{
    DayOutcome, history_entries, longest_streak, minutes_on, percent_of_goal, streak_length,
    weekly_window,
};
use remindr::clock::{Clock, SystemClock};
use remindr::domain::{AlertStage, ReminderEvent, Task};
use remindr::scheduler::{ChannelSink, ReminderScheduler, arming_plan};
use remindr::source::{JsonTaskSource, TaskSource};

mod cli;
mod config;

use cli::Cli;
use cli::commands::Commands;
use config::Config;

fn setup_logging(verbose: u8, default_level: Option<&str>) {
    // RUST_LOG wins when set; -v flags force the filter wider
    let default = format!("remindr={}", default_level.unwrap_or("info"));
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        1 => EnvFilter::new("remindr=debug"),
        _ => EnvFilter::new("remindr=trace"),
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run_application(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Run { tasks, interval_secs } => {
            let config = apply_overrides(config, tasks, interval_secs);
            run_daemon(config).await
        }
        Commands::Plan { tasks } => {
            let config = apply_overrides(config, tasks, None);
            handle_plan_command(&config).await
        }
        Commands::Stats { tasks } => {
            let config = apply_overrides(config, tasks, None);
            handle_stats_command(&config).await
        }
    }
}

fn apply_overrides(mut config: Config, tasks: Option<PathBuf>, interval_secs: Option<u64>) -> Config {
    if let Some(path) = tasks {
        config = config.with_tasks_file(path);
    }
    if let Some(secs) = interval_secs {
        config = config.with_heartbeat_secs(secs);
    }
    config
}

/// Run the scheduler against the tasks file until Ctrl-C.
async fn run_daemon(config: Config) -> Result<()> {
    config.validate()?;
    info!(
        tasks_file = %config.tasks_file.display(),
        heartbeat_secs = config.heartbeat_secs,
        "starting reminder daemon"
    );

    let source = Arc::new(JsonTaskSource::new(&config.tasks_file));
    let (sink, mut events) = ChannelSink::new(config.event_capacity);
    let scheduler = ReminderScheduler::new(Arc::new(SystemClock), Arc::new(sink));

    // fired reminders land on the console, not just in the log
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            print_event(&event);
        }
    });

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            let _ = shutdown_tx.send(());
        }
    });

    let interval = Duration::from_secs(config.heartbeat_secs);
    scheduler
        .run(source, interval, shutdown_rx)
        .await
        .context("scheduler stopped unexpectedly")?;

    printer.abort();
    Ok(())
}

fn print_event(event: &ReminderEvent) {
    let stage = match event.stage {
        AlertStage::Pre => "pre ".yellow(),
        AlertStage::Main => "main".green(),
    };
    println!(
        "{} {} {}  {}",
        event.fired_at.format("%H:%M").to_string().dimmed(),
        stage,
        event.title.bold(),
        event.message
    );
}

/// Print the arming decision for every task in the snapshot.
async fn handle_plan_command(config: &Config) -> Result<()> {
    let (tasks, now) = load_snapshot(config).await?;
    println!(
        "{} {}",
        "Arming plan as of".bold(),
        now.format("%Y-%m-%d %H:%M")
    );

    for task in &tasks {
        println!("{} {}", task.title.bold(), format!("[{}]", task.priority).cyan());
        if let Some(deadline) = task.deadline {
            println!("  {} {}", "deadline".dimmed(), deadline.format("%Y-%m-%d"));
        }
        match arming_plan(task, now) {
            Ok(plan) if plan.is_empty() => {
                println!("  {}", "no upcoming occurrence".dimmed());
            }
            Ok(plan) => {
                for alert in plan {
                    println!("  {:<4} {}", alert.stage, alert.fire_at.format("%Y-%m-%d %H:%M"));
                }
            }
            Err(e) => {
                println!("  {} {}", "skipped:".red(), e);
            }
        }
    }

    Ok(())
}

/// Print streaks, goal percentages, and recent misses for every habit
/// in the snapshot.
async fn handle_stats_command(config: &Config) -> Result<()> {
    let (tasks, now) = load_snapshot(config).await?;
    let today = now.date();

    let mut shown = 0;
    for task in &tasks {
        if !task.is_habit {
            continue;
        }
        let goal = match task.time_goal_minutes {
            Some(goal) if goal > 0 => goal,
            _ => {
                println!(
                    "{} {}",
                    task.title.bold(),
                    "skipped: habit needs a positive time goal".dimmed()
                );
                continue;
            }
        };
        shown += 1;

        println!("{} {}", task.title.bold(), format!("(goal {} min/day)", goal).cyan());
        let streak = streak_length(&task.time_spent, goal, today)?;
        let best = longest_streak(&task.time_spent, goal)?;
        let today_minutes = minutes_on(&task.time_spent, today);
        println!(
            "  streak {} day(s), best {}  |  today {} min ({}%)",
            streak,
            best,
            today_minutes,
            percent_of_goal(today_minutes as f64, goal as f64)
        );

        for day in weekly_window(&task.time_spent, goal, 7, today)? {
            let line = format!(
                "  {} {:>4} min {:>4}%",
                day.date.format("%a %m-%d"),
                day.minutes_logged,
                percent_of_goal(day.minutes_logged as f64, goal as f64)
            );
            if day.goal_met {
                println!("{}", line.green());
            } else {
                println!("{}", line.dimmed());
            }
        }

        // newest first, so these are the latest recorded misses
        for row in history_entries(&task.time_spent, &task.missed_for_date)
            .into_iter()
            .filter(|row| row.outcome() == DayOutcome::Missed)
            .take(3)
        {
            println!(
                "  {} {}  {}",
                "missed".red(),
                row.date.format("%Y-%m-%d"),
                row.missed_reason.unwrap_or_default()
            );
        }
    }

    if shown == 0 {
        println!("{}", "No habits with a time goal found".dimmed());
    }

    Ok(())
}

async fn load_snapshot(config: &Config) -> Result<(Vec<Task>, NaiveDateTime)> {
    let source = JsonTaskSource::new(&config.tasks_file);
    let tasks = source
        .snapshot()
        .await
        .context(format!("Failed to load tasks from {}", config.tasks_file.display()))?;
    Ok((tasks, SystemClock.now()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(cli.verbose, config.log_level.as_deref());

    // Run the main application logic
    run_application(cli, config).await.context("Application failed")?;

    Ok(())
}
