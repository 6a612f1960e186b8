//! Probe Agent - agent-side test run executor
//!
//! Executes test runs that the distribution layer has installed into the
//! agent cache: one testlet invocation per target, all in parallel, each
//! bounded by the run's time limit. The combined per-target results are
//! written back to the cache under the run id.
//!
//! ## Usage
//!
//! ```bash
//! # Install a test run definition
//! probe-agent install testrun.json
//!
//! # Execute it after the default rendezvous delay
//! probe-agent run 3f2a9c1e
//!
//! # Execute at a scheduled time
//! probe-agent run 3f2a9c1e --start-at 2026-10-19T12:00:00Z
//!
//! # Show stored results
//! probe-agent show 3f2a9c1e --format json-pretty
//!
//! # Fetch a testlet
//! probe-agent download http://server:8080/assets/testlets/dns
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use std::io::IsTerminal;
use std::sync::Arc;
use tracing::info;

mod assets;
mod cli;
mod config;
mod executor;
mod models;
mod output;
mod results;
mod store;
mod testlet;
mod utils;

use assets::AssetDownloader;
use cli::Args;
use config::AgentConfig;
use executor::{RunOrchestrator, RunState, StartSignal};
use models::TestRun;
use output::{OutputFormat, ResultFormatter};
use results::ResultAggregator;
use store::{FileRunStore, RunStore};
use testlet::TestletResolver;
use utils::{init_logger, LogLevel};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = AgentConfig::resolve(args.config.as_deref())?;

    let level = if args.verbose {
        LogLevel::Debug
    } else {
        config.log_level.parse().unwrap_or_default()
    };
    init_logger(level);

    match args.command {
        cli::Command::Run(run_args) => {
            run_test_run(&config, run_args).await?;
        }
        cli::Command::Install(install_args) => {
            install_test_run(&config, install_args)?;
        }
        cli::Command::Show(show_args) => {
            show_results(&config, show_args)?;
        }
        cli::Command::Download(download_args) => {
            download_assets(&config, download_args).await?;
        }
        cli::Command::Config(config_args) => {
            manage_config(&config, config_args)?;
        }
    }

    Ok(())
}

fn formatter(format: &str) -> Result<ResultFormatter> {
    let format = OutputFormat::from_str(format)
        .ok_or_else(|| anyhow::anyhow!("Unknown output format: {format}"))?;

    let formatter = ResultFormatter::new(format);
    if std::io::stdout().is_terminal() {
        Ok(formatter)
    } else {
        Ok(formatter.no_color())
    }
}

async fn run_test_run(config: &AgentConfig, args: cli::RunArgs) -> Result<()> {
    let formatter = formatter(&args.format)?;

    let start = if args.no_delay {
        StartSignal::Immediate
    } else if let Some(start_at) = &args.start_at {
        let at = DateTime::parse_from_rfc3339(start_at)
            .with_context(|| format!("Invalid start time: {start_at}"))?;
        StartSignal::At(at.with_timezone(&Utc))
    } else {
        StartSignal::Delay(config.rendezvous_delay())
    };

    let store = Arc::new(FileRunStore::new(&config.cache_dir));
    let orchestrator =
        RunOrchestrator::new(store, TestletResolver::new(&config.opt_dir)).with_start(start);

    let result = orchestrator.execute(&args.run_id).await;
    info!("Test run {} {}", args.run_id, RunState::from_result(&result));

    let report = result?;
    println!("{}", formatter.format_results(&report.run_id, &report.results)?);

    Ok(())
}

fn install_test_run(config: &AgentConfig, args: cli::InstallArgs) -> Result<()> {
    let content = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read test run: {}", args.file.display()))?;
    let run: TestRun = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse test run: {}", args.file.display()))?;
    run.validate()?;

    let store = FileRunStore::new(&config.cache_dir);
    store.install(&run)?;

    println!("✓ Installed test run {run}");
    Ok(())
}

fn show_results(config: &AgentConfig, args: cli::ShowArgs) -> Result<()> {
    let formatter = formatter(&args.format)?;
    let store = FileRunStore::new(&config.cache_dir);

    let encoded = store
        .results(&args.run_id)?
        .ok_or_else(|| anyhow::anyhow!("No results stored for test run {}", args.run_id))?;
    let results = ResultAggregator::deserialize(&encoded)?;

    println!("{}", formatter.format_results(&args.run_id, &results)?);
    Ok(())
}

async fn download_assets(config: &AgentConfig, args: cli::DownloadArgs) -> Result<()> {
    let downloader = AssetDownloader::new(&config.opt_dir, config.download_timeout_secs)?;
    let paths = downloader.download_all(&args.urls).await?;

    for path in paths {
        println!("✓ {}", path.display());
    }
    Ok(())
}

fn manage_config(config: &AgentConfig, args: cli::ConfigArgs) -> Result<()> {
    use config::{print_env_help, EnvConfig};

    match args.action {
        cli::ConfigAction::Init { output, force } => {
            if output.exists() && !force {
                anyhow::bail!(
                    "Configuration file already exists: {}. Use --force to overwrite.",
                    output.display()
                );
            }

            AgentConfig::default().save(&output)?;
            println!("✓ Configuration file created: {}", output.display());
            println!("\nEdit the file to customize your settings.");
        }

        cli::ConfigAction::Show { env, format } => {
            if env {
                let env_config = EnvConfig::load();
                env_config.print_summary();
                if !env_config.has_any() {
                    println!();
                    print_env_help();
                }
            } else {
                let output = if format == "json" {
                    serde_json::to_string_pretty(config)?
                } else {
                    serde_yaml::to_string(config)?
                };
                println!("{output}");
            }
        }
    }

    Ok(())
}
