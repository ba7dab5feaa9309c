//! Pulse CLI
//!
//! Client for the ingestion service:
//! - send: post events
//! - events / summary / stats / health: read back what the service holds
//! - watch: poll the summary like a dashboard does

mod client;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use serde_json::{json, Value};
use std::time::Duration;

use client::{PulseClient, SendOutcome};
use event_gateway::EventSummary;

#[derive(Parser)]
#[command(name = "pulse-cli")]
#[command(about = "Command line client for the Pulse analytics ingestion service")]
#[command(version = "0.1.0")]
struct Cli {
    /// Base URL of the service
    #[arg(long, default_value = "http://127.0.0.1:3001", env = "PULSE_URL")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Post one or more events
    Send {
        #[arg(long)]
        site_id: String,

        #[arg(long = "type")]
        event_type: String,

        #[arg(long)]
        path: Option<String>,

        #[arg(long)]
        user_id: Option<String>,

        /// Number of copies to send
        #[arg(short, long, default_value = "1")]
        count: usize,
    },

    /// List stored events
    Events {
        /// Only records with an id greater than this
        #[arg(long)]
        after_id: Option<i64>,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show dashboard aggregates
    Summary,

    /// Show pipeline counters
    Stats,

    /// Show service health
    Health,

    /// Poll the summary on a fixed interval
    Watch {
        /// Poll interval in seconds
        #[arg(short, long, default_value = "5")]
        interval_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = PulseClient::new(cli.url)?;

    match cli.command {
        Commands::Send { site_id, event_type, path, user_id, count } => {
            let mut event = json!({ "site_id": site_id, "event_type": event_type });
            if let Some(path) = path {
                event["path"] = json!(path);
            }
            if let Some(user_id) = user_id {
                event["user_id"] = json!(user_id);
            }
            send_events(&client, &event, count).await?;
        }
        Commands::Events { after_id, limit } => {
            let events = client.list_events(after_id, limit).await?;
            print_events(&events);
        }
        Commands::Summary => {
            let summary = client.summary().await?;
            print_summary(&summary);
        }
        Commands::Stats => {
            let stats = client.stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Health => {
            let health = client.health().await?;
            let status = health.get("status").and_then(Value::as_str).unwrap_or("unknown");
            let colored_status = if status == "healthy" { status.green() } else { status.red() };
            println!("{} {}", "Status:".bold(), colored_status);
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
        Commands::Watch { interval_secs } => {
            watch(&client, Duration::from_secs(interval_secs.max(1))).await;
        }
    }

    Ok(())
}

async fn send_events(client: &PulseClient, event: &Value, count: usize) -> Result<()> {
    let mut queued = 0usize;
    for _ in 0..count {
        match client.send_event(event).await? {
            SendOutcome::Queued { depth } => {
                queued += 1;
                if count == 1 {
                    println!("{} (buffer depth {})", "queued".green(), depth);
                }
            }
            SendOutcome::Invalid { message, details } => {
                println!("{} {}", "rejected:".red(), message);
                if !details.is_null() {
                    println!("  {details}");
                }
                break;
            }
            SendOutcome::Busy { retry_after_secs } => {
                println!("{} retrying in {}s", "service busy,".yellow(), retry_after_secs);
                tokio::time::sleep(Duration::from_secs(retry_after_secs)).await;
            }
        }
    }

    if count > 1 {
        println!("{} {}/{} events", "queued".green(), queued, count);
    }
    Ok(())
}

fn field<'a>(record: &'a Value, name: &str) -> &'a str {
    record.get(name).and_then(Value::as_str).unwrap_or("")
}

fn print_events(events: &[Value]) {
    println!(
        "{:>6}  {:<12} {:<14} {:<24} {:<12} {}",
        "ID".bold(),
        "SITE".bold(),
        "TYPE".bold(),
        "PATH".bold(),
        "USER".bold(),
        "TIMESTAMP".bold()
    );
    for record in events {
        let id = record.get("id").and_then(Value::as_i64).map(|id| id.to_string());
        println!(
            "{:>6}  {:<12} {:<14} {:<24} {:<12} {}",
            id.unwrap_or_default(),
            field(record, "site_id"),
            field(record, "event_type"),
            field(record, "path"),
            field(record, "user_id"),
            field(record, "timestamp")
        );
    }
    println!("{} records", events.len());
}

fn print_summary(summary: &EventSummary) {
    println!("{} {}", "Total events:".bold(), summary.total.to_string().cyan());

    for (title, counts) in [
        ("By event type", &summary.by_event_type),
        ("By site", &summary.by_site),
        ("By path", &summary.by_path),
    ] {
        println!("\n{}", title.bold().underline());
        for (key, count) in counts {
            println!("  {:<30} {}", key, count);
        }
    }

    println!("\n{}", "Timeline".bold().underline());
    for point in &summary.timeline {
        println!("  {:<24} {}", point.bucket, point.count);
    }
}

/// Poll until Ctrl+C; failed fetches are reported and retried on the next tick
async fn watch(client: &PulseClient, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut last_total: Option<u64> = None;

    println!("Watching {} every {}s. Press Ctrl+C to stop.", client.base_url(), every.as_secs());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = interval.tick() => {}
        }

        let now = chrono::Local::now().format("%H:%M:%S");
        match client.summary().await {
            Ok(summary) => {
                let delta = last_total.map(|prev| summary.total.saturating_sub(prev)).unwrap_or(0);
                let top = summary
                    .by_event_type
                    .iter()
                    .max_by_key(|(_, count)| **count)
                    .map(|(kind, count)| format!("{kind} ({count})"))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "[{}] total {} {} top {}",
                    now,
                    summary.total.to_string().cyan(),
                    format!("+{delta}").green(),
                    top
                );
                last_total = Some(summary.total);
            }
            Err(e) => println!("[{}] {} {}", now, "fetch failed, retrying:".yellow(), e),
        }
    }
}
