use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server as GrpcServer;

use stellar_ledger_archiver::broadcast::balance::BalanceService;
use stellar_ledger_archiver::broadcast::invocation::InvocationService;
use stellar_ledger_archiver::broadcast::payment::PaymentService;
use stellar_ledger_archiver::broadcast::BroadcastDeps;
use stellar_ledger_archiver::config::{
    CacheConfig, ColdStoreConfig, ControlConfig, HotStoreConfig, LimitsConfig, PipelineConfig, SourceConfig,
};
use stellar_ledger_archiver::control::{self, BreakerStateCell, ControlState};
use stellar_ledger_archiver::flush::{FlushConfig, FlushOrchestrator};
use stellar_ledger_archiver::grpc::events::balance_broadcaster_server::BalanceBroadcasterServer;
use stellar_ledger_archiver::grpc::events::invocation_broadcaster_server::InvocationBroadcasterServer;
use stellar_ledger_archiver::grpc::events::payment_broadcaster_server::PaymentBroadcasterServer;
use stellar_ledger_archiver::observability::Metrics;
use stellar_ledger_archiver::writer::HotWriter;
use stellar_ledger_archiver::{pipeline, telemetry};

const DEFAULT_ARCHIVE_URL: &str =
    "https://aws-public-blockchain.s3.us-east-2.amazonaws.com/v1.1/stellar/ledgers/pubnet";
const DEFAULT_NETWORK_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";

/// How long graceful shutdown waits for in-flight work to drain once a
/// signal arrives before returning anyway (spec §5 "30-second grace period").
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(
    name = "stellar-ledger-archiver",
    about = "Ingests closed Stellar ledgers, persists them hot, archives them cold, and broadcasts live events",
    version
)]
struct Cli {
    /// Upstream RawLedgerSource gRPC endpoint
    #[arg(long, env = "SOURCE_ENDPOINT")]
    source_endpoint: String,

    /// Base URL for the historical ledger archive
    #[arg(long, default_value = DEFAULT_ARCHIVE_URL, env = "ARCHIVE_URL")]
    archive_url: String,

    /// Network passphrase, used for SAC detection and transaction hashing
    #[arg(long, default_value = DEFAULT_NETWORK_PASSPHRASE, env = "NETWORK_PASSPHRASE")]
    network_passphrase: String,

    /// Ledger sequence to start ingesting from, if no checkpoint exists yet
    #[arg(long, default_value = "1", env = "START_SEQUENCE")]
    start_sequence: u32,

    /// Ledger sequence to stop at; 0 means unbounded / live-follow
    #[arg(long, default_value = "0", env = "END_SEQUENCE")]
    end_sequence: u32,

    /// Postgres connection string for the hot store
    #[arg(long, env = "HOT_STORE_URL")]
    hot_store_url: String,

    /// Ledgers per hot-store batch commit
    #[arg(long, default_value = "50", env = "BATCH_SIZE")]
    batch_size: u32,

    /// Maximum time an incomplete batch waits before committing anyway, in seconds
    #[arg(long, default_value = "5", env = "COMMIT_INTERVAL_SECS")]
    commit_interval_secs: u64,

    /// `object_store` URL for the cold columnar store (e.g. `s3://bucket`, `/var/data`)
    #[arg(long, env = "COLD_STORE_URL")]
    cold_store_url: String,

    /// Key prefix under the cold store bucket/path each table is written under
    #[arg(long, default_value = "ledgers", env = "COLD_STORE_CATALOG")]
    cold_store_catalog: String,

    /// Cold store region, for S3-compatible backends
    #[arg(long, env = "COLD_STORE_REGION")]
    cold_store_region: Option<String>,

    /// How often the flush orchestrator runs a MARK -> COPY -> DELETE cycle, in seconds
    #[arg(long, default_value = "10800", env = "FLUSH_INTERVAL_SECS")]
    flush_interval_secs: u64,

    /// Port for `/health` and `/maintenance/*`
    #[arg(long, default_value = "8080", env = "HEALTH_PORT")]
    health_port: u16,

    /// Port for `/metrics`
    #[arg(long, default_value = "9090", env = "METRICS_PORT")]
    metrics_port: u16,

    /// Port the three gRPC event broadcasters listen on
    #[arg(long, default_value = "50051", env = "GRPC_PORT")]
    grpc_port: u16,

    /// Allow `/maintenance/recreate` to run at all (still requires `confirm: true` per request)
    #[arg(long, default_value = "false", env = "ALLOW_RECREATE")]
    allow_recreate: bool,

    /// Disable the frame cache
    #[arg(long, default_value = "false", env = "DISABLE_CACHE")]
    disable_cache: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_logging();
    let prometheus_handle = telemetry::init_metrics();
    let cli = Cli::parse();

    let config = PipelineConfig {
        source: SourceConfig {
            endpoint: cli.source_endpoint.clone(),
            network_passphrase: cli.network_passphrase.clone(),
            start_sequence: cli.start_sequence,
            end_sequence: cli.end_sequence,
        },
        hot_store: HotStoreConfig {
            connection: cli.hot_store_url.clone(),
            batch_size: cli.batch_size,
            commit_interval: Duration::from_secs(cli.commit_interval_secs),
            ..HotStoreConfig::default()
        },
        cold_store: ColdStoreConfig {
            catalog: cli.cold_store_catalog.clone(),
            data_path: cli.cold_store_url.clone(),
            region: cli.cold_store_region.clone(),
            ..ColdStoreConfig::default()
        },
        cache: CacheConfig {
            enabled: !cli.disable_cache,
            ..CacheConfig::default()
        },
        control: ControlConfig {
            health_port: cli.health_port,
            metrics_port: cli.metrics_port,
            allow_recreate: cli.allow_recreate,
        },
        limits: LimitsConfig::default(),
    };

    let metrics = Metrics::new();
    let breaker_state = Arc::new(BreakerStateCell::default());
    let cancel = CancellationToken::new();

    let http_client = reqwest::Client::builder().timeout(Duration::from_secs(30)).build()?;

    let hot_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections((config.hot_store.batch_size * 2).max(1))
        .connect(&config.hot_store.connection)
        .await?;

    let writer = Arc::new(HotWriter::connect(config.hot_store.clone(), metrics.clone()).await?);

    let flush_config = FlushConfig {
        cycle_interval: Duration::from_secs(cli.flush_interval_secs),
        ..FlushConfig::default()
    };
    let flush = Arc::new(FlushOrchestrator::new(hot_pool, &config.cold_store, flush_config, metrics.clone())?);

    let broadcast_deps = Arc::new(BroadcastDeps {
        source_config: config.source.clone(),
        limits: config.limits.clone(),
        cache: config.cache.clone(),
        archive_base_url: cli.archive_url.clone(),
        http_client: http_client.clone(),
        network_passphrase: config.source.network_passphrase.clone(),
        metrics: metrics.clone(),
    });

    let control_state = Arc::new(ControlState {
        metrics: metrics.clone(),
        breaker_state: breaker_state.clone(),
        flush: flush.clone(),
        prometheus_handle,
        allow_recreate: config.control.allow_recreate,
        maintenance_gate: AsyncMutex::new(()),
    });

    let pipeline_task = tokio::spawn(pipeline::run(
        config.clone(),
        http_client.clone(),
        cli.archive_url.clone(),
        writer.clone(),
        metrics.clone(),
        breaker_state.clone(),
        cancel.clone(),
    ));

    let flush_task = {
        let flush = flush.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { flush.run(cancel).await })
    };

    let grpc_task = {
        let addr = format!("0.0.0.0:{}", cli.grpc_port).parse()?;
        let deps = broadcast_deps.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tracing::info!(%addr, "starting gRPC event broadcaster server");
            GrpcServer::builder()
                .add_service(PaymentBroadcasterServer::new(PaymentService::new(deps.clone())))
                .add_service(InvocationBroadcasterServer::new(InvocationService::new(deps.clone())))
                .add_service(BalanceBroadcasterServer::new(BalanceService::new(deps)))
                .serve_with_shutdown(addr, cancel.cancelled())
                .await
        })
    };

    let health_task = {
        let addr: std::net::SocketAddr = format!("0.0.0.0:{}", cli.health_port).parse()?;
        let app = control::router(control_state.clone());
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tracing::info!(%addr, "starting control surface");
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { cancel.cancelled().await })
                .await
        })
    };

    let metrics_task = {
        let addr: std::net::SocketAddr = format!("0.0.0.0:{}", cli.metrics_port).parse()?;
        let app = control::metrics_router(control_state.clone());
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tracing::info!(%addr, "starting metrics exporter");
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { cancel.cancelled().await })
                .await
        })
    };

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received, draining in-flight work");
    cancel.cancel();

    let _ = tokio::time::timeout(SHUTDOWN_GRACE, async {
        let _ = pipeline_task.await;
        let _ = flush_task.await;
        let _ = grpc_task.await;
        let _ = health_task.await;
        let _ = metrics_task.await;
    })
    .await;

    Ok(())
}
