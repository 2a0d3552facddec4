use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use imgpull::cli::Cli;
use imgpull::config::Config;
use imgpull::ledger::{default_failures_path, read_failed_keys, write_failures_jsonl};
use imgpull::orchestrator::{Orchestrator, RunOptions};
use imgpull::store::{LocalStore, S3Store, StoreClient};
use imgpull::summary::{EXIT_FATAL, RunSummary};

fn main() {
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            EXIT_FATAL
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    let _log_guard = imgpull::logging::init(cli.verbose, &Config::app_dir().join("logs"));

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(&config_path)?;
    apply_overrides(&mut config, &cli);

    let only_keys = match &cli.retry_from {
        Some(p) => {
            let keys = read_failed_keys(p)
                .with_context(|| format!("cannot read failures file {}", p.display()))?;
            tracing::info!("re-driving {} failed keys from {}", keys.len(), p.display());
            Some(keys)
        }
        None => None,
    };

    let store: Arc<dyn StoreClient> = match &cli.source_dir {
        Some(dir) => Arc::new(LocalStore::new(dir)),
        None => Arc::new(S3Store::connect(&config.store_config())?),
    };

    let mut orchestrator = Orchestrator::new(
        store,
        RunOptions {
            bucket: config.bucket.clone(),
            max_workers: config.max_workers,
            show_progress: !cli.quiet,
            dry_run: cli.dry_run,
            only_keys,
        },
    );
    let summary = orchestrator.run(&cli.coco_file, &cli.output_dir)?;

    if !cli.quiet {
        summary.print_human();
    }

    let failures_path = if summary.has_failures() {
        let path = cli
            .failures_out
            .clone()
            .unwrap_or_else(|| default_failures_path(&config.failures_dir()));
        persist_failures(&summary, path)
    } else {
        None
    };
    if let Some(path) = &failures_path
        && !cli.quiet
    {
        println!("Failures written to: {}", path.display());
    }

    if cli.json {
        let mut obj = serde_json::to_value(&summary)?;
        obj["failures_path"] =
            serde_json::json!(failures_path.as_ref().map(|p| p.to_string_lossy().to_string()));
        println!("{}", serde_json::to_string(&obj)?);
    }

    Ok(summary.outcome.exit_code())
}

// Write the failures file; a write error is logged and the run result stands.
fn persist_failures(summary: &RunSummary, path: PathBuf) -> Option<PathBuf> {
    if !summary.has_failures() {
        return None;
    }
    match write_failures_jsonl(&path, &summary.failures) {
        Ok(()) => Some(path),
        Err(e) => {
            tracing::warn!("could not write failures to {}: {}", path.display(), e);
            None
        }
    }
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(b) = &cli.bucket {
        config.bucket = b.clone();
    }
    if let Some(r) = &cli.region {
        config.region = r.clone();
    }
    if let Some(p) = &cli.profile {
        config.profile = Some(p.clone());
    }
    if let Some(u) = &cli.endpoint_url {
        config.endpoint_url = Some(u.clone());
    }
    if cli.path_style {
        config.force_path_style = true;
    }
    if cli.max_workers.is_some() {
        config.max_workers = cli.max_workers;
    }
}
