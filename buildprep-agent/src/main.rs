//! Build Preparation Agent - Main entry point
//!
//! Runs one build-prep pass and exits.

use anyhow::Context;
use buildprep_agent::config::{Config, Overrides};
use buildprep_agent::external::{CommandDatabaseScript, CommandServiceControl, DatabaseScript};
use buildprep_agent::mirror::RobocopyMirror;
use buildprep_agent::settings::SettingsStore;
use buildprep_agent::{utils, Orchestrator};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Instrument;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Project collection URL of the build pipeline
    #[arg(long, value_name = "URL")]
    collection_url: Option<String>,

    /// SDK root (database scripts resolve against it)
    #[arg(long, value_name = "DIR")]
    sdk_path: Option<PathBuf>,

    /// Deployed packages directory
    #[arg(long, value_name = "DIR")]
    packages_path: Option<PathBuf>,

    /// Backup base directory (skips candidate probing)
    #[arg(long, value_name = "DIR")]
    backup_path: Option<PathBuf>,

    /// Restore the database from this backup file instead of backing it up
    #[arg(long, value_name = "FILE")]
    database_backup_file: Option<PathBuf>,

    /// Deployment service to stop before touching packages
    #[arg(long, value_name = "NAME")]
    service: Option<String>,

    /// Restore every file, including foreign directories
    #[arg(long)]
    restore_all_files: bool,

    /// Discard an existing package backup and take a new one
    #[arg(long)]
    overwrite_backup: bool,

    /// Also write log output to this file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            collection_url: self.collection_url.clone(),
            sdk_dir: self.sdk_path.clone(),
            packages_dir: self.packages_path.clone(),
            backup_dir: self.backup_path.clone(),
            database_backup_file: self.database_backup_file.clone(),
            service_name: self.service.clone(),
            restore_all_files: self.restore_all_files,
            overwrite_backup: self.overwrite_backup,
            log_file: self.log_file.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("buildprep-agent: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = utils::logger::init(&config.log.level, config.log.file.as_deref()) {
        eprintln!("buildprep-agent: failed to initialize logging: {:#}", e);
        return ExitCode::FAILURE;
    }

    let run_id = uuid::Uuid::new_v4();
    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let span = tracing::info_span!("run", %run_id, %host);

    match run(&config).instrument(span).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let cause = format!("{:#}", e);
            tracing::error!(%run_id, error = %cause, "Build preparation failed");
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };
    Ok(config.apply_overrides(args.overrides()))
}

async fn run(config: &Config) -> anyhow::Result<()> {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        collection_url = config.run.collection_url.as_deref().unwrap_or("-"),
        packages = ?config.paths.packages_dir,
        "Starting buildprep-agent"
    );

    let settings = SettingsStore::load(&config.paths.settings_file)
        .context("failed to load persisted settings")?;
    let mirror = RobocopyMirror::from_config(&config.mirror);
    let service = CommandServiceControl::from_config(&config.service);
    let database = config
        .database_script()
        .map(|script| CommandDatabaseScript::new(config.database.interpreter.clone(), script));

    let mut orchestrator = Orchestrator::new(
        config,
        settings,
        &mirror,
        &service,
        database.as_ref().map(|d| d as &dyn DatabaseScript),
    );
    let summary = orchestrator.run().await.map_err(|e| {
        let kind = e.kind();
        anyhow::Error::new(e).context(format!("{:?} failure", kind))
    })?;

    tracing::info!(?summary, "Run complete");
    Ok(())
}
