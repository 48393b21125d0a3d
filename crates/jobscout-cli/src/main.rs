use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use jobscout_client::{M2mAuthenticator, ReqwestExchangeClient, StaticOracleSource};
use jobscout_core::{
    BackoffPolicy, CatalogQuery, CatalogReader, Crawler, CycleOutcome, CycleService, JobListing,
    ListingFilter, MergeCache, MokaCache, OracleDirectory, OracleRecord, Scheduler, SortField,
    SortOrder, SyncConfig, TracingCycleReporter,
};

type Service = CycleService<
    M2mAuthenticator,
    StaticOracleSource,
    MokaCache<Vec<OracleRecord>>,
    ReqwestExchangeClient,
    MokaCache<Vec<JobListing>>,
>;

type Reader = CatalogReader<MokaCache<Vec<JobListing>>>;

#[derive(Parser)]
#[command(name = "jobscout", version, about = "Exchange oracle job crawler and catalog cache")]
struct Cli {
    #[command(flatten)]
    client: ClientArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ClientArgs {
    /// Reputation oracle base URL used for M2M sign-in
    #[arg(long, env = "REPUTATION_ORACLE_URL")]
    reputation_oracle_url: String,

    /// M2M secret key (reads from M2M_AUTH_SECRET_KEY if not provided)
    #[arg(long, env = "M2M_AUTH_SECRET_KEY", hide_env_values = true)]
    secret_key: String,

    /// JSON file listing the exchange oracles per chain id
    #[arg(long, env = "ORACLE_REGISTRY_FILE")]
    registry: PathBuf,

    /// Timeout for every outgoing HTTP request, in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 30)]
    http_timeout_secs: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl on the configured interval until Ctrl-C
    Run,

    /// Run a single crawl cycle and print the resulting catalogs
    Once {
        /// Only print the catalog of this oracle
        #[arg(short, long)]
        oracle: Option<String>,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Crawl one oracle now, ignoring its backoff, and print its catalog
    Refresh {
        /// Oracle address
        #[arg(short, long)]
        oracle: String,

        #[command(flatten)]
        view: ViewArgs,
    },
}

#[derive(Args)]
struct ViewArgs {
    #[arg(long, default_value_t = 0)]
    page: usize,

    #[arg(long, default_value_t = 10)]
    page_size: usize,

    /// created_at, updated_at, reward_amount, chain_id, escrow_address, job_type or status
    #[arg(long, default_value = "created_at")]
    sort: SortField,

    /// asc or desc
    #[arg(long, default_value = "desc")]
    order: SortOrder,

    #[arg(long)]
    chain_id: Option<u64>,

    #[arg(long)]
    job_type: Option<String>,

    #[arg(long)]
    status: Option<String>,
}

impl ViewArgs {
    fn query(&self) -> CatalogQuery {
        CatalogQuery::new(self.page, self.page_size)
            .with_sort(self.sort, self.order)
            .with_filter(ListingFilter {
                chain_id: self.chain_id,
                job_type: self.job_type.clone(),
                status: self.status.clone(),
                escrow_address: None,
            })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("jobscout=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = SyncConfig::from_env().context("Invalid sync configuration")?;
    let (service, reader) = build(&cli.client, &config)?;

    match cli.command {
        Commands::Run => cmd_run(service, &config).await,
        Commands::Once { oracle, view } => {
            cmd_once(&service, &reader, oracle.as_deref(), &view.query()).await
        }
        Commands::Refresh { oracle, view } => {
            cmd_refresh(&service, &reader, &oracle, &view.query()).await
        }
    }
}

fn build(args: &ClientArgs, config: &SyncConfig) -> Result<(Service, Reader)> {
    let timeout = Duration::from_secs(args.http_timeout_secs);

    let source = StaticOracleSource::from_file(&args.registry)
        .context("Failed to load oracle registry")?;
    let registered = source.chain_ids();
    for chain_id in &config.chain_ids {
        if !registered.contains(chain_id) {
            tracing::warn!(chain_id, "Enabled chain has no entry in the oracle registry");
        }
    }

    let authenticator =
        M2mAuthenticator::with_timeout(&args.reputation_oracle_url, &args.secret_key, timeout)
            .context("Failed to create M2M authenticator")?;
    let exchange =
        ReqwestExchangeClient::with_timeout(timeout).context("Failed to create HTTP client")?;

    let catalogs = MokaCache::new();
    let service = CycleService::new(
        authenticator,
        OracleDirectory::new(source, MokaCache::new(), config),
        Crawler::new(exchange, config),
        MergeCache::new(catalogs.clone()),
        BackoffPolicy::new(config.max_skip_cycles),
    );

    Ok((service, CatalogReader::new(catalogs)))
}

async fn cmd_run(service: Service, config: &SyncConfig) -> Result<()> {
    let cancel = CancellationToken::new();
    let Some(handle) = Scheduler::new(service, config).spawn(cancel.clone(), TracingCycleReporter)
    else {
        tracing::warn!("JOBS_DISCOVERY_ENABLED is off, nothing to run");
        return Ok(());
    };

    tokio::signal::ctrl_c()
        .await
        .context("Failed to install Ctrl-C handler")?;
    tracing::info!("Shutdown signal received");

    cancel.cancel();
    let cycles = handle.await.context("Scheduler task failed")?;
    tracing::info!(cycles, "Stopped");

    Ok(())
}

async fn cmd_once(
    service: &Service,
    reader: &Reader,
    oracle: Option<&str>,
    query: &CatalogQuery,
) -> Result<()> {
    let outcome = service.run_cycle(&TracingCycleReporter).await;
    match outcome {
        CycleOutcome::Completed(_) => {}
        CycleOutcome::AuthenticationFailed => anyhow::bail!("Sign-in failed, no oracle crawled"),
        CycleOutcome::NoOracles => anyhow::bail!("No oracles discovered"),
        CycleOutcome::AlreadyRunning => anyhow::bail!("Another cycle is running"),
    }

    let addresses: Vec<String> = match oracle {
        Some(address) => vec![service.directory().find(address).await?.address],
        None => service
            .directory()
            .discover()
            .await
            .into_iter()
            .map(|o| o.address)
            .collect(),
    };

    let mut pages = BTreeMap::new();
    for address in addresses {
        let page = reader.query_oracle(&address, query).await?;
        pages.insert(address, page);
    }

    println!("{}", serde_json::to_string_pretty(&pages)?);
    Ok(())
}

async fn cmd_refresh(
    service: &Service,
    reader: &Reader,
    oracle: &str,
    query: &CatalogQuery,
) -> Result<()> {
    let address = service.directory().find(oracle).await?.address;
    let merge = service
        .refresh_oracle(&address, &TracingCycleReporter)
        .await
        .with_context(|| format!("Refresh of oracle {address} failed"))?;

    tracing::info!(
        oracle = %address,
        inserted = merge.inserted,
        replaced = merge.replaced,
        total = merge.total,
        "Refresh complete"
    );

    let page = reader.query_oracle(&address, query).await?;
    println!("{}", serde_json::to_string_pretty(&page)?);
    Ok(())
}
