//! # LeadClaw — Recurring Lead Outreach Engine
//!
//! Scrapes candidate leads by keyword, filters them by rule, and runs a
//! rate-limited engagement plan against the survivors, with an external
//! tabular store as the system of record and kill switch.
//!
//! Usage:
//!   leadclaw init                  # Write a starter config
//!   leadclaw run                   # Run cycles until stopped
//!   leadclaw once --dry-run        # Rehearse one cycle in memory
//!   leadclaw status                # Candidate counts + kill switch

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use leadclaw_core::config::LeadClawConfig;
use leadclaw_core::traits::RecordStore;
use leadclaw_core::types::EngageStatus;
use leadclaw_engine::CycleOrchestrator;
use leadclaw_store::{HttpRecordStore, MemoryStore, StoreAdapter};

mod fixtures;
use fixtures::{DryRunExecutor, FixtureScraper, KeywordRuleEvaluator};

#[derive(Parser)]
#[command(
    name = "leadclaw",
    version,
    about = "🦞 LeadClaw — recurring, rate-limited lead outreach engine"
)]
struct Cli {
    /// Config file path (default: ~/.leadclaw/config.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run engagement cycles until the kill switch or circuit stops them
    Run {
        /// Ignore the configured backend and run against the in-memory store
        #[arg(long)]
        dry_run: bool,
    },

    /// Run a single cycle, then release the executor session and exit
    Once {
        /// Ignore the configured backend and run against the in-memory store
        #[arg(long)]
        dry_run: bool,
    },

    /// Show candidate counts by status and the current kill-switch value
    Status,

    /// Write a starter config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "leadclaw=debug,leadclaw_core=debug,leadclaw_store=debug,leadclaw_scheduler=debug,leadclaw_engine=debug"
    } else {
        "leadclaw=info,leadclaw_core=info,leadclaw_store=info,leadclaw_scheduler=info,leadclaw_engine=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init { force } => init_config(cli.config.as_deref(), force),
        Commands::Status => {
            let config = load_config(cli.config.as_deref())?;
            show_status(&config).await
        }
        Commands::Run { dry_run } => {
            let config = load_config(cli.config.as_deref())?;
            print_banner(&config, dry_run);
            let mut engine = build_engine(config, dry_run)?;
            engine.run().await?;
            Ok(())
        }
        Commands::Once { dry_run } => {
            let config = load_config(cli.config.as_deref())?;
            print_banner(&config, dry_run);
            let mut engine = build_engine(config, dry_run)?;
            engine.run_once().await?;
            Ok(())
        }
    }
}

fn load_config(path: Option<&str>) -> Result<LeadClawConfig> {
    let config = match path {
        Some(p) => LeadClawConfig::load_from(std::path::Path::new(&expand_path(p)))?,
        None => LeadClawConfig::load()?,
    };
    Ok(config)
}

fn print_banner(config: &LeadClawConfig, dry_run: bool) {
    let backend = if dry_run { "memory (dry run)" } else { config.store.backend.as_str() };
    println!("🦞 LeadClaw v{}", env!("CARGO_PKG_VERSION"));
    println!("   🗄️  Store:    {backend}");
    println!("   🔑 Keywords: {}", config.scrape.keywords.join(", "));
    println!(
        "   📊 Limits:   {} DMs/h, {} DMs/day",
        config.limits.dm_per_hour, config.limits.dm_per_day
    );
    println!();
}

fn build_engine(config: LeadClawConfig, dry_run: bool) -> Result<CycleOrchestrator> {
    let store = build_store(&config, dry_run)?;
    let adapter = Arc::new(StoreAdapter::new(store, &config.store));
    let scraper = Box::new(FixtureScraper::new());
    let evaluator = Box::new(KeywordRuleEvaluator::new(config.rules.clone()));
    let executor = Box::new(DryRunExecutor);
    Ok(CycleOrchestrator::new(config, adapter, scraper, evaluator, executor))
}

fn build_store(config: &LeadClawConfig, dry_run: bool) -> Result<Arc<dyn RecordStore>> {
    if dry_run {
        tracing::info!("🎭 Dry run: in-memory store, nothing leaves this process");
        return Ok(Arc::new(MemoryStore::new()));
    }
    match config.store.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        "http" => Ok(Arc::new(HttpRecordStore::new(config.store.clone())?)),
        other => anyhow::bail!("unknown store backend '{other}' (expected 'memory' or 'http')"),
    }
}

async fn show_status(config: &LeadClawConfig) -> Result<()> {
    let store = build_store(config, false)?;
    let adapter = StoreAdapter::new(store, &config.store);

    let control = adapter.control_signal().await;
    let candidates = adapter.all_candidates().await?;

    let mut by_status: BTreeMap<&'static str, usize> = BTreeMap::new();
    for candidate in &candidates {
        *by_status.entry(candidate.status.as_str()).or_default() += 1;
    }
    let sent = candidates
        .iter()
        .filter(|c| c.engage == EngageStatus::Sent)
        .count();

    println!("🦞 LeadClaw status ({} backend)", config.store.backend);
    println!("   🔔 Kill switch: {control}");
    println!("   👥 Candidates:  {}", candidates.len());
    for (status, count) in &by_status {
        println!("      {status:<8} {count}");
    }
    println!("   📤 DMs sent:    {sent}");
    Ok(())
}

fn init_config(path: Option<&str>, force: bool) -> Result<()> {
    let target = match path {
        Some(p) => std::path::PathBuf::from(expand_path(p)),
        None => LeadClawConfig::default_path(),
    };
    if target.exists() && !force {
        println!("⚠️  {} already exists (use --force to overwrite)", target.display());
        return Ok(());
    }
    LeadClawConfig::default().save_to(&target)?;
    println!("✅ Wrote starter config to {}", target.display());
    println!("   Edit [store] to point at your tabular store, then: leadclaw once --dry-run");
    Ok(())
}
