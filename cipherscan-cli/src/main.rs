//! CipherScan CLI — scan, universe, and cooldown store commands.
//!
//! Commands:
//! - `scan` — run one scan cycle (or repeat on an interval) and dispatch alerts
//! - `universe` — fetch the market snapshot and print the tier classification
//! - `dedup status` — list cooldown records and their eligibility
//! - `dedup prune` — drop records older than the retention window

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cipherscan_core::data::Exclusion;
use cipherscan_runner::{
    build_candle_chain, build_metadata_source, build_sinks, dispatch_all, open_cooldown_store,
    open_dry_run_store, CycleError, CycleReport, ScanConfig, Scanner,
};

#[derive(Parser)]
#[command(
    name = "cipherscan",
    about = "CipherScan CLI — Market Cipher B signal scanner"
)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scan cycle and dispatch confirmed alerts.
    Scan {
        /// Path to a TOML config file. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the per-symbol outcome table to this CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Decide against the stored cooldowns without persisting them or sending anything.
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Repeat the cycle every N seconds instead of exiting after one.
        #[arg(long)]
        every: Option<u64>,
    },
    /// Print how the current market snapshot splits into risk tiers.
    Universe {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Also list excluded symbols and the reason.
        #[arg(long, default_value_t = false)]
        excluded: bool,
    },
    /// Cooldown store commands.
    Dedup {
        #[command(subcommand)]
        action: DedupAction,
    },
}

#[derive(Subcommand)]
enum DedupAction {
    /// List every cooldown record.
    Status {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Remove records older than the configured retention window.
    Prune {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the retention window in days.
        #[arg(long)]
        days: Option<i64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json);

    match cli.command {
        Commands::Scan {
            config,
            csv,
            dry_run,
            every,
        } => run_scan(config.as_deref(), csv, dry_run, every),
        Commands::Universe { config, excluded } => run_universe(config.as_deref(), excluded),
        Commands::Dedup { action } => match action {
            DedupAction::Status { config } => run_dedup_status(config.as_deref()),
            DedupAction::Prune { config, days } => run_dedup_prune(config.as_deref(), days),
        },
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cipherscan=debug"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> Result<ScanConfig> {
    let config = match path {
        Some(p) => ScanConfig::load(p)?,
        None => ScanConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn run_scan(
    config_path: Option<&Path>,
    csv: Option<PathBuf>,
    dry_run: bool,
    every: Option<u64>,
) -> Result<()> {
    if every == Some(0) {
        bail!("--every must be at least 1 second");
    }

    let config = load_config(config_path)?;
    let candles = build_candle_chain(&config)?;
    let metadata = build_metadata_source(&config)?;
    let store = if dry_run {
        open_dry_run_store(&config)
    } else {
        open_cooldown_store(&config)
    }
    .context("opening cooldown store")?;
    let sinks = build_sinks(&config);
    let scanner = Scanner::new(config, Arc::new(candles), metadata)?;

    info!(
        fingerprint = %&scanner.config().fingerprint()[..12],
        timeframe = %scanner.config().cycle.timeframe,
        stored = store.len(),
        dry_run,
        "scanner ready"
    );

    loop {
        match scanner.run_cycle(&store, Utc::now()) {
            Ok(report) => {
                print_report(&report);
                if let Some(path) = &csv {
                    let file = std::fs::File::create(path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    report.write_outcomes_csv(file)?;
                    println!("Outcomes written to: {}", path.display());
                }
                if dry_run {
                    println!("Dry run: {} alert(s) not dispatched, cooldowns not saved.", report.payloads.len());
                } else {
                    let summary = dispatch_all(&sinks, &report.payloads);
                    if summary.failed > 0 {
                        warn!(sent = summary.sent, failed = summary.failed, "some alerts were not delivered");
                    }
                }
            }
            Err(CycleError::Store(e)) => {
                error!(error = %e, "cooldown store failed; no alerts dispatched");
                std::process::exit(2);
            }
            Err(e) => {
                if every.is_none() {
                    return Err(e.into());
                }
                error!(error = %e, "cycle failed");
            }
        }

        let Some(secs) = every else {
            return Ok(());
        };
        std::thread::sleep(Duration::from_secs(secs));
    }
}

fn run_universe(config_path: Option<&Path>, show_excluded: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let candles = build_candle_chain(&config)?;
    let metadata = build_metadata_source(&config)?;
    let scanner = Scanner::new(config, Arc::new(candles), metadata)?;

    let entries = scanner.fetch_universe()?;
    let filter = scanner.universe_filter()?;
    let selection = filter.apply(&entries);
    let stats = selection.stats;

    println!();
    println!("=== Universe ===");
    println!("Snapshot:       {} symbols", stats.total);
    println!("Standard:       {}", stats.standard);
    println!("High-risk:      {}", stats.high_risk);
    println!("Blocked:        {}", stats.blocked);
    println!("Stablecoins:    {}", stats.stablecoin);
    println!("Invalid data:   {}", stats.invalid_data);
    println!("Below cap:      {}", stats.below_market_cap);
    println!("Below volume:   {}", stats.below_volume);
    println!();
    println!("{:<10} {:<10} {:>16} {:>16}", "Symbol", "Tier", "Market Cap", "24h Volume");
    println!("{}", "-".repeat(55));
    for s in &selection.eligible {
        println!(
            "{:<10} {:<10} {:>16} {:>16}",
            s.symbol,
            s.tier.as_str(),
            format_usd(s.market_cap),
            format_usd(s.volume_24h)
        );
    }

    if show_excluded {
        println!();
        println!("{:<10} {:<16}", "Excluded", "Reason");
        println!("{}", "-".repeat(27));
        for entry in &entries {
            if let Err(reason) = filter.classify(entry) {
                println!("{:<10} {:<16}", entry.symbol, exclusion_label(reason));
            }
        }
    }
    println!();
    Ok(())
}

fn run_dedup_status(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let store = open_cooldown_store(&config)
        .with_context(|| format!("opening {}", config.cooldown.store.display()))?;

    let records = store.records();
    if records.is_empty() {
        println!("Cooldown store is empty: {}", config.cooldown.store.display());
        return Ok(());
    }

    let now = Utc::now();
    println!("Store:    {}", config.cooldown.store.display());
    println!("Cooldown: {}h", store.cooldown().num_hours());
    println!();
    println!("{:<10} {:<6} {:<22} {:>8} {:<10}", "Symbol", "Side", "Last Alert", "Age", "Status");
    println!("{}", "-".repeat(60));
    for r in &records {
        let age = now - r.last_alert_timestamp;
        let status = if store.is_eligible(&r.symbol, r.direction, now) {
            "eligible"
        } else {
            "cooling"
        };
        println!(
            "{:<10} {:<6} {:<22} {:>7}m {:<10}",
            r.symbol,
            r.direction.as_str(),
            r.last_alert_timestamp.format("%Y-%m-%d %H:%M:%S"),
            age.num_minutes(),
            status
        );
    }
    Ok(())
}

fn run_dedup_prune(config_path: Option<&Path>, days: Option<i64>) -> Result<()> {
    let config = load_config(config_path)?;
    let retention = match days {
        Some(d) if d <= 0 => bail!("--days must be positive"),
        Some(d) => chrono::Duration::days(d),
        None => config.cooldown.retention(),
    };

    let store = open_cooldown_store(&config)
        .with_context(|| format!("opening {}", config.cooldown.store.display()))?;
    let removed = store.prune(Utc::now(), retention)?;
    println!(
        "Removed {removed} record(s) older than {} days; {} remain.",
        retention.num_days(),
        store.len()
    );
    Ok(())
}

fn print_report(report: &CycleReport) {
    println!();
    println!("=== Cycle {} ===", &report.cycle_id[..12]);
    println!("Started:        {}", report.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("Timeframe:      {}", report.timeframe);
    println!(
        "Universe:       {} eligible of {} ({} standard, {} high-risk)",
        report.stats.eligible(),
        report.stats.total,
        report.stats.standard,
        report.stats.high_risk
    );
    println!();
    for label in [
        "alerted",
        "suppressed",
        "unconfirmed",
        "no_signal",
        "insufficient",
        "gap",
        "provider_failed",
        "skipped_deadline",
    ] {
        println!("{:<16}{}", format!("{label}:"), report.count(label));
    }
    if !report.payloads.is_empty() {
        println!();
        println!("--- Alerts ---");
        for p in &report.payloads {
            println!("{}", p.summary());
            println!("  {}", p.chart_link);
        }
    }
    println!();
}

fn exclusion_label(reason: Exclusion) -> &'static str {
    match reason {
        Exclusion::Blocked => "blocked",
        Exclusion::Blocklisted => "blocklisted",
        Exclusion::Stablecoin => "stablecoin",
        Exclusion::InvalidData => "invalid data",
        Exclusion::BelowMarketCap => "below cap",
        Exclusion::BelowVolume => "below volume",
    }
}

fn format_usd(value: f64) -> String {
    if value >= 1e9 {
        format!("${:.2}B", value / 1e9)
    } else if value >= 1e6 {
        format!("${:.1}M", value / 1e6)
    } else {
        format!("${value:.0}")
    }
}
