use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pagewatch_common::{Config, Monitor, SelectorRule};
use pagewatch_notify::Notifier;
use pagewatch_store::MonitorStore;
use pagewatch_watcher::checker::Checker;
use pagewatch_watcher::extractor::SelectorExtractor;
use pagewatch_watcher::fetcher::HttpFetcher;
use pagewatch_watcher::scheduler::TokioScheduler;

#[derive(Parser)]
#[command(name = "pagewatch", about = "Watch web pages and alert on new content")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the monitoring daemon until interrupted.
    Run,
    /// Check one monitor immediately.
    Check { id: String },
    /// Check every enabled monitor once, paced.
    CheckAll,
    /// List configured monitors.
    List,
    /// Add a monitor.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        url: String,
        /// Polling interval in seconds.
        #[arg(long, default_value_t = 300)]
        interval: u64,
        /// Webhook endpoint for change notifications.
        #[arg(long)]
        webhook: Option<String>,
        /// CSS selector to extract (repeatable); whole page if omitted.
        #[arg(long)]
        selector: Vec<String>,
    },
    /// Remove a monitor and its runtime state.
    Remove { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pagewatch=info".parse()?))
        .init();

    let config = Config::from_env();
    let store = Arc::new(MonitorStore::open(&config.store_path).await?);
    let checker = Arc::new(Checker::new(
        store,
        Arc::new(HttpFetcher::new(config.fetch_timeout_secs)?),
        Arc::new(SelectorExtractor),
        Arc::new(Notifier::new(Duration::from_millis(
            config.webhook_min_interval_ms,
        ))?),
    ));

    match Cli::parse().command.unwrap_or(Command::Run) {
        Command::Run => {
            info!("Pagewatch starting");
            let scheduler = TokioScheduler::new(Arc::clone(&checker));
            scheduler.reload().await;
            tokio::signal::ctrl_c().await?;
            info!("Shutting down");
        }
        Command::Check { id } => {
            let outcome = checker.check(&id).await;
            println!("{outcome:?}");
        }
        Command::CheckAll => {
            let notified = checker.check_all().await;
            println!("{notified} monitor(s) had new content");
        }
        Command::List => {
            let mut monitors = checker.store().list().await;
            monitors.sort_by(|a, b| a.name.cmp(&b.name));
            for m in monitors {
                println!(
                    "{}  {}  {}  every {}s  {}{}",
                    m.id,
                    if m.enabled { "on " } else { "off" },
                    m.url,
                    m.effective_interval_secs(),
                    m.name,
                    m.last_check
                        .map(|t| format!("  (last checked {t})"))
                        .unwrap_or_default(),
                );
            }
        }
        Command::Add {
            name,
            url,
            interval,
            webhook,
            selector,
        } => {
            let mut monitor = Monitor::new(uuid::Uuid::new_v4().to_string(), name, url);
            monitor.interval_secs = interval;
            monitor.webhook_url = webhook;
            monitor.rules = selector.into_iter().map(SelectorRule::text).collect();
            let id = monitor.id.clone();
            checker.store().set(monitor).await?;
            println!("Added monitor {id}");
        }
        Command::Remove { id } => match checker.remove_monitor(&id).await? {
            Some(m) => println!("Removed monitor {} ({})", id, m.name),
            None => println!("No monitor with id {id}"),
        },
    }

    Ok(())
}
