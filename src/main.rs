use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use healthmgr::{HealthManager, StateFile};
use healthmgr_adapters::{MetricsProvider, StateStore, StaticProvider};
use healthmgr_engine::{
    spawn_invalidation_listener, EventBus, PackingPlanProvider, PolicyConfig, SensorConfig,
    SensorContext, TopologyProvider,
};

#[derive(Parser, Debug)]
#[command(name = "healthmgr")]
#[command(about = "Detect and diagnose unhealthy stream-processing jobs")]
struct Args {
    /// Path to a cluster state JSON file, reloaded when it changes
    #[cfg_attr(
        feature = "tracker",
        arg(short, long, conflicts_with = "tracker", required_unless_present = "tracker")
    )]
    #[cfg_attr(not(feature = "tracker"), arg(short, long, required = true))]
    state: Option<PathBuf>,

    /// Tracker endpoint to query (e.g., "http://localhost:8888")
    #[cfg(feature = "tracker")]
    #[arg(long, requires = "topology")]
    tracker: Option<String>,

    /// Cluster the job runs on (used with --tracker)
    #[cfg(feature = "tracker")]
    #[arg(long, default_value = "local")]
    cluster: String,

    /// Environment of the job (used with --tracker)
    #[cfg(feature = "tracker")]
    #[arg(long, default_value = "default")]
    environ: String,

    /// Name of the job to monitor (used with --tracker)
    #[arg(long)]
    topology: Option<String>,

    /// Policy file with detector and diagnoser thresholds
    #[arg(short, long)]
    policy: Option<PathBuf>,

    /// Seconds between cycles
    #[arg(short, long, default_value = "60")]
    interval: u64,

    /// Metric aggregation window in seconds
    #[arg(short, long, default_value = "60")]
    window: u64,

    /// Timeout of a single provider call in seconds
    #[arg(long, default_value = "10")]
    call_timeout: u64,

    /// Timeout of a whole cycle in seconds
    #[arg(long, default_value = "120")]
    cycle_timeout: u64,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

/// Where metrics and cluster state come from.
struct Providers {
    metrics: Arc<dyn MetricsProvider>,
    store: Arc<dyn StateStore>,
    job: String,
    /// Set when running from a state file.
    reload: Option<(StateFile, Arc<StaticProvider>)>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let policy = PolicyConfig::load(args.policy.as_deref())
        .with_context(|| format!("failed to load policy {:?}", args.policy))?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(args, policy))
}

async fn run(args: Args, policy: PolicyConfig) -> Result<()> {
    let Providers {
        metrics,
        store,
        job,
        mut reload,
    } = providers(&args)?;

    let topology = Arc::new(TopologyProvider::new(store.clone(), job.clone()));
    let packing = Arc::new(PackingPlanProvider::new(store, job.clone()));

    let bus = EventBus::default();
    let listener = spawn_invalidation_listener(bus.subscribe(), topology.clone(), packing.clone());

    let ctx = SensorContext::new(topology, packing, metrics).with_config(SensorConfig {
        window: Duration::from_secs(args.window),
        call_timeout: Duration::from_secs(args.call_timeout),
    });
    let manager = HealthManager::from_policy(ctx, &policy);
    let cycle_timeout = Duration::from_secs(args.cycle_timeout);

    info!(job = %job, interval = args.interval, "health manager started");

    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval.max(1)));
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }

        if let Some((state_file, provider)) = reload.as_mut() {
            state_file.reload(provider, &bus);
        }

        match tokio::time::timeout(cycle_timeout, manager.run_cycle()).await {
            Ok(Ok(report)) => println!("{}", serde_json::to_string(&report)?),
            Ok(Err(e)) if args.once => return Err(e.into()),
            Ok(Err(e)) => error!(error = %e, "cycle failed"),
            Err(_) if args.once => bail!("cycle timed out after {:?}", cycle_timeout),
            Err(_) => warn!(timeout = ?cycle_timeout, "cycle abandoned"),
        }

        if args.once {
            break;
        }
    }

    drop(bus);
    listener.await?;
    Ok(())
}

fn providers(args: &Args) -> Result<Providers> {
    if let Some(path) = &args.state {
        return state_providers(path);
    }

    #[cfg(feature = "tracker")]
    if let Some(endpoint) = &args.tracker {
        use healthmgr_adapters::tracker::TrackerClient;

        let job = args
            .topology
            .clone()
            .context("--topology is required with --tracker")?;
        let tracker = Arc::new(
            TrackerClient::builder()
                .endpoint(endpoint.as_str())
                .cluster(args.cluster.as_str())
                .environ(args.environ.as_str())
                .topology(job.as_str())
                .timeout(Duration::from_secs(args.call_timeout))
                .build()?,
        );
        return Ok(Providers {
            metrics: tracker.clone(),
            store: tracker,
            job,
            reload: None,
        });
    }

    bail!("no data source: pass --state or --tracker")
}

fn state_providers(path: &Path) -> Result<Providers> {
    let mut state_file = StateFile::new(path);
    let state = match state_file.poll() {
        Some(state) => state,
        None => bail!(
            "failed to read {}: {}",
            path.display(),
            state_file.error().unwrap_or("unknown error")
        ),
    };

    let job = state.topology.name.clone();
    let provider = Arc::new(StaticProvider::new(state));
    Ok(Providers {
        metrics: provider.clone(),
        store: provider.clone(),
        job,
        reload: Some((state_file, provider)),
    })
}
