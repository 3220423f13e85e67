//! visadesk - task alerts for visa agency staff
//!
//! Fetches the agency's task collections, derives deadline and payment alerts
//! for the signed-in staff member, and prints them.
//!
//! ## Usage
//!
//! ```bash
//! # One-shot list of alerts
//! visadesk alerts --user "Alice Tanaka"
//!
//! # Same, as JSON
//! visadesk alerts --user "Alice Tanaka" --json
//!
//! # Bell badge and panel
//! visadesk panel
//!
//! # Keep polling and show toasts one at a time (Enter dismisses)
//! visadesk watch -v --base-url https://agency.example.com
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use visadesk_alerts::{
    Alert, AlertDeriver, AlertStore, ClientIndex, ClientNameResolver, Clock, DerivedAlerts,
    NotificationSequencer, SystemClock,
};
use visadesk_api::{AgencyClient, ApiError, RefreshEvent, Refresher};
use visadesk_core::{Config, LogGuard, VisadeskError, init_logging};

/// Task alerts for visa agency staff
#[derive(Parser, Debug)]
#[command(name = "visadesk")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging (increases log level)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory for log files (defaults to ~/.visadesk/logs/)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Config file (defaults to ~/.visadesk/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, overriding api.base_url
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Staff member whose alerts to show (defaults to viewer.full_name)
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch once and print deadline and payment alerts
    Alerts {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Fetch once and print the bell badge and panel
    Panel,
    /// Poll the backend and show alerts as toasts
    Watch,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match setup_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::from(1);
        }
    };

    info!(command = ?cli.command, "Starting visadesk");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("visadesk error: {:#}", e);
            eprintln!("Error: {:#}", e);
            if let Some(hint) = hint_for(&e) {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::from(exit_status(&e))
        }
    }
}

/// Set up logging based on CLI arguments.
fn setup_logging(cli: &Cli) -> visadesk_core::Result<LogGuard> {
    init_logging(cli.log_dir.clone(), cli.verbose)
}

fn hint_for(err: &anyhow::Error) -> Option<&'static str> {
    if let Some(e) = err.downcast_ref::<VisadeskError>() {
        return e.guidance();
    }
    err.downcast_ref::<ApiError>().map(ApiError::suggested_action)
}

/// Exit with 2 for problems fixed by editing config or flags, 1 otherwise.
fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<VisadeskError>() {
        Some(e) if e.is_config_error() => 2,
        _ => 1,
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(base_url) = &cli.base_url {
        config.api.base_url = base_url.clone();
        config.validate()?;
    }
    Ok(config)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let viewer = config.viewer_name(cli.user.as_deref())?;
    let client = AgencyClient::from_config(&config.api, config.api_token())?;

    info!(viewer = %viewer, base_url = %client.base_url(), "configured");

    let window = config.alerts.upcoming_window_days;
    match cli.command {
        Command::Alerts { json } => {
            let derived = derive_alerts(&client, window, &viewer).await?;
            print_alerts(&derived, json)
        }
        Command::Panel => {
            let derived = derive_alerts(&client, window, &viewer).await?;
            let mut store = AlertStore::new();
            store.publish(derived, Utc::now());
            print_panel(&store);
            Ok(())
        }
        Command::Watch => watch(client, config, viewer).await,
    }
}

/// One fetch cycle: tasks and clients, then derivation for `viewer`.
async fn derive_alerts(
    client: &AgencyClient,
    upcoming_window_days: i64,
    viewer: &str,
) -> visadesk_api::Result<DerivedAlerts> {
    let (tasks, clients) = tokio::join!(client.fetch_tasks(), client.fetch_clients());
    let tasks = tasks?;

    // Names still resolve per id without the list.
    let clients = clients.unwrap_or_else(|e| {
        warn!("Failed to fetch client list: {}", e);
        Vec::new()
    });

    let index = ClientIndex::new(clients);
    let mut resolver = ClientNameResolver::new(&index, Some(client));
    let derived = AlertDeriver::new(upcoming_window_days)
        .derive(&tasks, Utc::now(), viewer, &mut resolver)
        .await;

    info!(
        tasks = tasks.len(),
        deadline = derived.deadline.len(),
        payment = derived.payment.len(),
        lookups = resolver.lookups(),
        "derived alerts"
    );
    Ok(derived)
}

fn print_alerts(derived: &DerivedAlerts, as_json: bool) -> anyhow::Result<()> {
    if as_json {
        let out = json!({
            "deadlineAlerts": derived.deadline,
            "paymentAlerts": derived.payment,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&out).context("serializing alerts")?
        );
        return Ok(());
    }

    println!("Deadline alerts ({}):", derived.deadline.len());
    for alert in &derived.deadline {
        println!("  {}", alert.format_detail());
    }
    println!("Payment alerts ({}):", derived.payment.len());
    for alert in &derived.payment {
        println!("  {}", alert.format_detail());
    }
    Ok(())
}

fn print_panel(store: &AlertStore) {
    let snapshot = store.snapshot();
    let badge = snapshot.badge();
    println!("{}", badge.format_header());
    if !badge.should_display() {
        return;
    }
    for line in snapshot.panel_lines() {
        println!("  {}", line);
    }
}

fn show_toast(alert: &Alert, queued: usize) {
    if queued > 0 {
        println!("{}  (+{} more, Enter to dismiss)", alert.format_compact(), queued);
    } else {
        println!("{}  (Enter to dismiss)", alert.format_compact());
    }
}

/// Poll, publish and sequence toasts until Ctrl-C.
async fn watch(client: AgencyClient, config: Config, viewer: String) -> anyhow::Result<()> {
    let window = config.alerts.upcoming_window_days;
    let fetch_client = client.clone();
    let mut refresher = Refresher::spawn(
        Duration::from_millis(config.refresh.debounce_ms),
        move || {
            let client = fetch_client.clone();
            let viewer = viewer.clone();
            async move { derive_alerts(&client, window, &viewer).await }
        },
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut sequencer = NotificationSequencer::with_display_duration(
        clock,
        Duration::from_millis(config.alerts.toast_duration_ms),
    );
    let mut store = AlertStore::new();

    let mut interval = tokio::time::interval(Duration::from_secs(config.refresh.interval_secs));
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = config.refresh.interval_secs,
        base_url = %client.base_url(),
        "watching for alerts"
    );

    loop {
        let expiry = sequencer.time_until_expiry();

        tokio::select! {
            _ = &mut shutdown => {
                info!("shutting down");
                break;
            }
            _ = interval.tick() => refresher.trigger(),
            Some(event) = refresher.next_event() => match event {
                RefreshEvent::Applied { generation, value } => {
                    let before = store.snapshot().badge();
                    let raised = store.publish(value, Utc::now());
                    let after = store.snapshot().badge();
                    if before != after {
                        println!("{}", after.format_header());
                    }
                    info!(generation, raised = raised.len(), "refresh applied");

                    let snapshot = store.snapshot();
                    let replaced = sequencer.retain(|a| snapshot.contains(&a.key()));
                    if let Some(shown) = sequencer.offer(raised).or(replaced) {
                        show_toast(&shown, sequencer.queued());
                    }
                }
                RefreshEvent::Failed { generation, error } => {
                    error!(generation, "refresh failed: {}", error);
                    store.clear(Utc::now());
                    sequencer.retain(|_| false);
                    println!("⚠ {}", error.friendly_message());
                }
            },
            _ = tokio::time::sleep(expiry.unwrap_or_default()), if expiry.is_some() => {
                if let Some(advance) = sequencer.tick() {
                    if let Some(next) = &advance.next {
                        show_toast(next, sequencer.queued());
                    }
                }
            }
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(_)) => {
                    if let Some(advance) = sequencer.dismiss() {
                        store.dismiss(&advance.finished.key());
                        if let Some(next) = &advance.next {
                            show_toast(next, sequencer.queued());
                        }
                    }
                }
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!("stdin closed: {}", e);
                    stdin_open = false;
                }
            },
        }
    }

    sequencer.reset();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_exit_with_usage_code() {
        let err = anyhow::Error::new(VisadeskError::config_validation("bad value"));
        assert_eq!(exit_status(&err), 2);
        assert!(hint_for(&err).is_some());

        let err = anyhow::Error::new(ApiError::ConnectionFailed("refused".into()));
        assert_eq!(exit_status(&err), 1);
        assert_eq!(
            hint_for(&err),
            Some("Verify api.base_url and network connectivity.")
        );
    }

    #[test]
    fn test_cli_parses_watch_with_globals() {
        let cli =
            Cli::try_parse_from(["visadesk", "watch", "-vv", "--user", "Alice Tanaka"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.user.as_deref(), Some("Alice Tanaka"));
        assert!(matches!(cli.command, Command::Watch));
    }
}
