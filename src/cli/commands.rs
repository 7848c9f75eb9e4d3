//! CLI command definitions and handlers

use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::core::cache::ChangeCache;
use crate::core::client::DeepLClient;
use crate::core::config::{project_root, TranslateConfig};
use crate::core::scheduler::{default_parallelism, JobScheduler};

/// Options of a translation run
#[derive(Args, Debug, Clone)]
pub struct TranslateArgs {
    /// Path to the configuration file
    #[arg(long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Translate files even if they did not change since the last run
    #[arg(long)]
    pub force: bool,

    /// Number of files translated in parallel (default: number of CPUs)
    #[arg(long)]
    pub parallel: Option<usize>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl TranslateArgs {
    /// Directory holding the config file
    pub fn project_root(&self) -> PathBuf {
        project_root(&self.config)
    }
}

/// Handle a translation run. Errors returned here are startup failures;
/// per-file problems end up in the printed summary.
pub async fn handle_translate(args: TranslateArgs) -> anyhow::Result<()> {
    let start_time = Instant::now();

    let config = TranslateConfig::from_file(&args.config)?;
    let client = DeepLClient::from_env()?;

    let root = args.project_root();
    let cache = ChangeCache::open(&root)?;

    let parallel = args.parallel.unwrap_or_else(default_parallelism);

    info!("Starting Markdown translation");
    info!("Config: {}", args.config.display());
    info!("Endpoint: {}", client.endpoint());
    info!("Parallel: {}", parallel);
    info!("Force: {}", args.force);

    let scheduler = JobScheduler::new(Arc::new(client), cache)
        .with_parallel(parallel)
        .with_force(args.force)
        .with_progress(!args.no_progress);

    scheduler.run_config(&config).await;

    if let Err(e) = scheduler.save_cache().await {
        warn!("Failed to save cache: {}", e);
    }

    scheduler.report().print().await;

    info!("Completed in {:?}", start_time.elapsed());
    Ok(())
}
