//! actor-singleton: drive the singleton coordinator against in-memory backends.
//!
//! # Usage
//!
//! ```bash
//! # Eight concurrent callers racing for one key
//! actor-singleton simulate --key session-cache --callers 8
//!
//! # Same, with a flaky registry and a worker that dies after the first round
//! actor-singleton simulate --callers 8 --transient-reads 3 --transient-writes 2 --kill-after-first
//!
//! # Print the effective configuration
//! SINGLETON_MAX_ATTEMPTS=5 actor-singleton --config singleton.toml config
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use actor_singleton::AppConfig;
use actor_singleton::GetOptions;
use actor_singleton::Priority;
use actor_singleton::SingletonCoordinator;
use actor_singleton::WorkerHandle;
use actor_singleton::testing::DeterministicKeyValueStore;
use actor_singleton::testing::DeterministicScheduler;
use actor_singleton::testing::FaultInjectingKeyValueStore;
use actor_singleton::testing::WorkerSpec;
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use tokio::task::JoinSet;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "actor-singleton", version, about = "Cluster singleton coordinator")]
struct Args {
    /// Path to TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the maximum attempts per operation.
    #[arg(long, global = true)]
    max_attempts: Option<u32>,

    /// Override the default construction priority.
    #[arg(long, global = true, allow_hyphen_values = true)]
    priority: Option<i32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Race concurrent callers for one singleton against in-memory backends.
    Simulate(SimulateArgs),
    /// Print the effective configuration as TOML.
    Config,
}

#[derive(clap::Args, Debug)]
struct SimulateArgs {
    /// Singleton key.
    #[arg(long, default_value = "demo")]
    key: String,

    /// Number of concurrent callers per round.
    #[arg(long, default_value_t = 4)]
    callers: u32,

    /// Fail this many registry reads before they start succeeding.
    #[arg(long, default_value_t = 0)]
    transient_reads: u32,

    /// Fail this many registry writes before they start succeeding.
    #[arg(long, default_value_t = 0)]
    transient_writes: u32,

    /// Kill the winning worker and run a second round.
    #[arg(long)]
    kill_after_first: bool,

    /// Record TTL in milliseconds.
    #[arg(long)]
    ttl_ms: Option<u64>,
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();
}

/// Layer CLI flags over environment and file configuration.
fn build_config(args: &Args) -> Result<AppConfig> {
    let mut config = AppConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(max_attempts) = args.max_attempts {
        config.coordinator.max_attempts = max_attempts;
    }
    if let Some(priority) = args.priority {
        config.coordinator.default_priority = Priority(priority);
    }
    config.validate().context("invalid command-line overrides")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = build_config(&args)?;
    init_tracing(&config.log_filter);

    match args.command {
        Command::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        Command::Simulate(sim) => simulate(config, sim).await,
    }
}

type SimCoordinator = SingletonCoordinator<FaultInjectingKeyValueStore<DeterministicKeyValueStore>, DeterministicScheduler>;

async fn simulate(config: AppConfig, sim: SimulateArgs) -> Result<()> {
    anyhow::ensure!(sim.callers > 0, "--callers must be at least 1");

    let store = Arc::new(FaultInjectingKeyValueStore::new(DeterministicKeyValueStore::new()));
    store.fail_reads(sim.transient_reads);
    store.fail_writes(sim.transient_writes);
    let scheduler = DeterministicScheduler::new();
    let coordinator = Arc::new(SingletonCoordinator::new(store.clone(), scheduler.clone(), config.coordinator)?);

    let mut options = GetOptions::new();
    if let Some(ttl_ms) = sim.ttl_ms {
        options = options.with_ttl(Duration::from_millis(ttl_ms));
    }

    let first = race(&coordinator, &sim.key, sim.callers, &options).await?;
    info!(key = %sim.key, handle = %first, "first round settled");

    let winner = if sim.kill_after_first {
        scheduler.kill(&first);
        let second = race(&coordinator, &sim.key, sim.callers, &options).await?;
        info!(key = %sim.key, old = %first, new = %second, "second round settled");
        second
    } else {
        first
    };

    let record = coordinator.inspect(&sim.key).await?.context("no record after simulation")?;
    println!("key:            {}", sim.key);
    println!("handle:         {winner}");
    println!("version:        {}", record.version);
    match record.expires_at_ms() {
        Some(deadline) => println!("expires at:     {deadline} ms"),
        None => println!("expires at:     never"),
    }
    println!("constructions:  {}", scheduler.construction_count());
    println!("releases:       {}", scheduler.release_count());
    println!("live workers:   {}", scheduler.live_workers());
    println!("injected faults: {}", store.injected_count());
    Ok(())
}

/// Run `callers` concurrent gets and require that they all agree.
async fn race(coordinator: &Arc<SimCoordinator>, key: &str, callers: u32, options: &GetOptions) -> Result<WorkerHandle> {
    let mut tasks = JoinSet::new();
    for caller in 0..callers {
        let coordinator = coordinator.clone();
        let key = key.to_string();
        let options = options.clone();
        tasks.spawn(async move {
            let name = format!("{key}#{caller}");
            coordinator.get(&key, || WorkerSpec::new(name.clone()), options).await
        });
    }

    let mut winner: Option<WorkerHandle> = None;
    while let Some(joined) = tasks.join_next().await {
        let handle = joined.context("caller task panicked")??;
        match &winner {
            Some(existing) => anyhow::ensure!(*existing == handle, "callers disagree: {existing} vs {handle}"),
            None => winner = Some(handle),
        }
    }
    winner.context("no callers ran")
}
