use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use trialwatch_client::browser::DEFAULT_LISTING_URL;
use trialwatch_client::smtp::{DEFAULT_SMTP_HOST, DEFAULT_SMTP_PORT};
use trialwatch_client::table::DEFAULT_TABLE_SELECTOR;
use trialwatch_client::{RegistryBrowser, RegistryConfig, SmtpConfig, SmtpNotifier};
use trialwatch_core::config::DEFAULT_MAX_PAGES;
use trialwatch_core::report::DEFAULT_FLAG_MARKER;
use trialwatch_core::traits::NullNotifier;
use trialwatch_core::{FirstRunPolicy, MonitorConfig, MonitorService, RunPlan, TracingReporter};
use trialwatch_store::{CsvSnapshotStore, DEFAULT_SNAPSHOT_PATH};

#[derive(Parser)]
#[command(
    name = "trialwatch",
    version,
    about = "Notifies about newly approved clinical trials in the MFDS registry"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the registry, mail new approvals and record the listing
    Run(RunArgs),

    /// Print the persisted snapshot
    Show {
        /// Snapshot file of the last successful run
        #[arg(long, env = "TRIALWATCH_SNAPSHOT", default_value = DEFAULT_SNAPSHOT_PATH)]
        snapshot: PathBuf,

        /// Print records as JSON
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Number of records to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Snapshot file of the last successful run
    #[arg(long, env = "TRIALWATCH_SNAPSHOT", default_value = DEFAULT_SNAPSHOT_PATH)]
    snapshot: PathBuf,

    /// Listing pages to scan, starting from the newest
    #[arg(long, env = "TRIALWATCH_MAX_PAGES", default_value_t = DEFAULT_MAX_PAGES)]
    max_pages: u32,

    /// Title marker of the highlighted category
    #[arg(long, env = "TRIALWATCH_FLAG_MARKER", default_value = DEFAULT_FLAG_MARKER)]
    flag_marker: String,

    /// What a run without a previous snapshot reports: `suppress`, or
    /// `sample:N` to mail the N newest records (debug only)
    #[arg(long, env = "TRIALWATCH_FIRST_RUN", default_value_t = FirstRunPolicy::Suppress)]
    first_run: FirstRunPolicy,

    /// Registry listing URL
    #[arg(long, env = "TRIALWATCH_LISTING_URL", default_value = DEFAULT_LISTING_URL)]
    listing_url: String,

    /// CSS selector of the result table
    #[arg(long, env = "TRIALWATCH_TABLE_SELECTOR", default_value = DEFAULT_TABLE_SELECTOR)]
    table_selector: String,

    /// Multiplier for the page settle delays
    #[arg(long, env = "TRIALWATCH_SETTLE_FACTOR", default_value_t = 1.0)]
    settle_factor: f64,

    /// Chrome/Chromium binary to launch
    #[arg(long, env = "CHROME_BIN")]
    chrome_bin: Option<PathBuf>,

    /// Sender address, also the SMTP login
    #[arg(long, env = "SENDER_EMAIL")]
    sender_email: Option<String>,

    /// SMTP password (app password) of the sender
    #[arg(long, env = "SENDER_PASSWORD", hide_env_values = true)]
    sender_password: Option<String>,

    /// Notification recipient
    #[arg(long, env = "RECIPIENT_EMAIL")]
    recipient_email: Option<String>,

    #[arg(long, env = "SMTP_HOST", default_value = DEFAULT_SMTP_HOST)]
    smtp_host: String,

    #[arg(long, env = "SMTP_PORT", default_value_t = DEFAULT_SMTP_PORT)]
    smtp_port: u16,

    /// Print the notification instead of sending it; the snapshot is not updated
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// With --dry-run, print the plan as JSON
    #[arg(long, default_value_t = false, requires = "dry_run")]
    json: bool,
}

impl RunArgs {
    fn monitor_config(&self) -> Result<MonitorConfig> {
        let config = MonitorConfig::default()
            .with_max_pages(self.max_pages)
            .with_flag_marker(self.flag_marker.as_str())
            .with_first_run(self.first_run);
        config.validate()?;
        Ok(config)
    }

    fn registry_config(&self) -> Result<RegistryConfig> {
        let config = RegistryConfig::default()
            .with_listing_url(self.listing_url.as_str())
            .with_table_selector(self.table_selector.as_str())
            .with_chrome_bin(self.chrome_bin.clone())
            .with_settle_factor(self.settle_factor)?;
        config.validate()?;
        Ok(config)
    }

    fn smtp_config(&self) -> Result<SmtpConfig> {
        let config = SmtpConfig::new(
            self.sender_email.clone(),
            self.sender_password.clone(),
            self.recipient_email.clone(),
        )?;
        Ok(config.with_server(self.smtp_host.as_str(), self.smtp_port))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("trialwatch=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => cmd_run(args).await?,
        Commands::Show {
            snapshot,
            json,
            limit,
        } => cmd_show(&snapshot, json, limit)?,
    }

    Ok(())
}

async fn cmd_run(args: RunArgs) -> Result<()> {
    let started = Local::now().naive_local();
    tracing::info!("Monitor run started at {}", started.format("%Y-%m-%d %H:%M:%S"));

    // All configuration is checked before the browser is launched.
    let monitor_config = args.monitor_config()?;
    let registry_config = args.registry_config()?;
    let store = CsvSnapshotStore::new(&args.snapshot);

    if args.dry_run {
        return cmd_dry_run(registry_config, store, monitor_config, started, args.json).await;
    }

    let smtp_config = args.smtp_config()?;
    let notifier = SmtpNotifier::new(&smtp_config)?;

    let browser = RegistryBrowser::launch(registry_config)
        .await
        .context("Failed to open the registry listing")?;
    let service = MonitorService::new(browser, store, notifier, monitor_config);

    let result = service.run(started, &TracingReporter).await;
    let (browser, _, _) = service.into_parts();
    browser.shutdown().await;

    let report = result?;
    if !report.skipped_pages.is_empty() {
        tracing::warn!(pages = ?report.skipped_pages, "Some pages were skipped this run");
    }
    tracing::info!(
        records = report.records_seen,
        new_items = report.new_items,
        flagged = report.flagged,
        notified = report.notified,
        "Monitor run finished at {}",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    Ok(())
}

async fn cmd_dry_run(
    registry_config: RegistryConfig,
    store: CsvSnapshotStore,
    monitor_config: MonitorConfig,
    started: NaiveDateTime,
    json: bool,
) -> Result<()> {
    let browser = RegistryBrowser::launch(registry_config)
        .await
        .context("Failed to open the registry listing")?;
    let service = MonitorService::new(browser, store, NullNotifier, monitor_config);

    let result = service.plan(started, &TracingReporter).await;
    let (browser, _, _) = service.into_parts();
    browser.shutdown().await;

    print_plan(&result?, json)
}

fn print_plan(plan: &RunPlan, json: bool) -> Result<()> {
    if json {
        let output = serde_json::json!({
            "records_seen": plan.current.len(),
            "first_run": plan.is_first_run(),
            "skipped_pages": plan.skipped_pages,
            "new_items": plan.new_items.records(),
            "flagged": plan.flagged,
            "notification": plan.notification,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match &plan.notification {
        Some(notification) => {
            println!("Subject: {}\n", notification.subject);
            println!("{}", notification.html_body);
        }
        None if plan.is_first_run() => {
            println!(
                "First run: {} records would be recorded, no notification",
                plan.current.len()
            );
        }
        None => println!("No new items among {} records", plan.current.len()),
    }

    Ok(())
}

fn cmd_show(path: &Path, json: bool, limit: usize) -> Result<()> {
    let store = CsvSnapshotStore::new(path);
    let Some(snapshot) = store.read()? else {
        println!("No snapshot at {}", path.display());
        return Ok(());
    };

    if json {
        let records: Vec<_> = snapshot.iter().take(limit).collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    println!("Snapshot {} ({} records):\n", path.display(), snapshot.len());
    for record in snapshot.iter().take(limit) {
        println!(
            "  {}  {}  {}  {}",
            record.sequence_id, record.approval_date, record.item_name, record.title
        );
    }
    if snapshot.len() > limit {
        println!("  ({} more)", snapshot.len() - limit);
    }
    if let Some(first) = snapshot.records().first() {
        println!(
            "\nObserved at {} (fingerprint {}...)",
            first.observed_at.format("%Y-%m-%d %H:%M:%S"),
            &snapshot.fingerprint()[..8]
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_defaults_build_valid_configs() {
        let cli = Cli::try_parse_from(["trialwatch", "run", "--max-pages", "3"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };

        let monitor = args.monitor_config().unwrap();
        assert_eq!(monitor.max_pages, 3);
        assert_eq!(monitor.first_run, FirstRunPolicy::Suppress);
        assert!(args.registry_config().is_ok());
    }

    #[test]
    fn first_run_flag_selects_sampling() {
        let cli =
            Cli::try_parse_from(["trialwatch", "run", "--first-run", "sample:5"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(
            args.monitor_config().unwrap().first_run,
            FirstRunPolicy::Sample(5)
        );
        assert!(Cli::try_parse_from(["trialwatch", "run", "--first-run", "sometimes"]).is_err());
    }

    #[test]
    fn oversized_page_count_is_rejected() {
        let cli = Cli::try_parse_from(["trialwatch", "run", "--max-pages", "4294967295"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert!(args.monitor_config().is_err());
    }

    #[test]
    fn unusable_settle_factor_is_rejected() {
        for factor in ["1e300", "inf", "-2"] {
            let arg = format!("--settle-factor={factor}");
            let cli = Cli::try_parse_from(["trialwatch", "run", arg.as_str()]).unwrap();
            let Commands::Run(args) = cli.command else {
                panic!("expected run");
            };
            assert!(args.registry_config().is_err(), "factor {factor}");
        }
    }

    #[test]
    fn zero_pages_is_rejected() {
        let cli = Cli::try_parse_from(["trialwatch", "run", "--max-pages", "0"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert!(args.monitor_config().is_err());
    }

    #[test]
    fn json_requires_dry_run() {
        assert!(Cli::try_parse_from(["trialwatch", "run", "--json"]).is_err());
        assert!(Cli::try_parse_from(["trialwatch", "run", "--dry-run", "--json"]).is_ok());
    }
}
