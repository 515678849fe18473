//! Process assembly: storage, pipeline, both transports, and shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Cli;
use crate::network::{NetworkModule, ShutdownController};
use crate::rpc::RpcServer;
use crate::service::domain::{BuildInfo, HealthService, UserService};
use crate::service::{
    build_operation_pipeline, service_names, Collaborators, Dispatcher, OperationRouter,
};
use crate::storage::{MemoryUserStore, UserStore};
use crate::telemetry::metrics::install_prometheus;
use crate::telemetry::{
    ErrorReporter, LogReporter, LogTracer, MetricsSink, PrometheusSink, QueuedMetrics, Tracer,
    WebhookReporter,
};

/// Capacity of the metrics queue in front of the Prometheus recorder.
const METRICS_QUEUE_CAPACITY: usize = 1024;

fn build_store(cli: &Cli) -> anyhow::Result<Arc<dyn UserStore>> {
    if let Some(url) = &cli.database_url {
        #[cfg(feature = "postgres")]
        {
            let store =
                crate::storage::PostgresUserStore::connect_lazy(url, cli.database_max_connections)?;
            return Ok(Arc::new(store));
        }
        #[cfg(not(feature = "postgres"))]
        {
            let _ = url;
            anyhow::bail!("a database URL was given but this build lacks the `postgres` feature");
        }
    }

    let store = match &cli.seed_file {
        Some(path) => MemoryUserStore::from_seed_file(path)?,
        None => MemoryUserStore::new(),
    };
    warn!(records = store.len(), "using in-memory store, changes are not persisted");
    Ok(Arc::new(store))
}

/// Sinks for the optional decorators. Must run inside the runtime.
fn build_collaborators(cli: &Cli) -> anyhow::Result<Collaborators> {
    let metrics: Option<Arc<dyn MetricsSink>> = if cli.metrics_enabled {
        install_prometheus(SocketAddr::from(([0, 0, 0, 0], cli.metrics_port)))?;
        let (queue, _drain) = QueuedMetrics::spawn(Arc::new(PrometheusSink), METRICS_QUEUE_CAPACITY);
        Some(Arc::new(queue))
    } else {
        None
    };

    let tracer: Option<Arc<dyn Tracer>> = cli
        .tracer_enabled
        .then(|| Arc::new(LogTracer::new(cli.tracer_name.clone())) as Arc<dyn Tracer>);

    let reporter = cli.reporter_enabled.then(|| -> Arc<dyn ErrorReporter> {
        match &cli.reporter_dsn {
            Some(dsn) => Arc::new(WebhookReporter::new(dsn.clone(), cli.reporter_environment.clone())),
            None => Arc::new(LogReporter),
        }
    });

    Ok(Collaborators {
        metrics,
        tracer,
        reporter,
    })
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

/// Runs the server until SIGINT or SIGTERM, then drains both transports.
///
/// # Errors
///
/// Startup failures (storage, bind, exporter) and fatal server errors.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    info!(config = %cli.summary(), "starting guestlist server");

    let store = build_store(&cli)?;
    store.initialize().await?;

    let shutdown = Arc::new(ShutdownController::new());
    let collaborators = build_collaborators(&cli)?;

    let mut router = OperationRouter::new();
    router.register(service_names::USER, UserService::new(Arc::clone(&store)));
    router.register(
        service_names::HEALTH,
        HealthService::new(Arc::clone(&shutdown), Arc::clone(&store), BuildInfo::from_env()),
    );
    let dispatcher = Dispatcher::new(build_operation_pipeline(router, &collaborators));

    let mut http = NetworkModule::new(
        cli.network_config(),
        dispatcher.clone(),
        Arc::clone(&shutdown),
        collaborators.tracer.clone(),
    );
    let mut rpc = RpcServer::new(
        cli.rpc_config(),
        dispatcher,
        Arc::clone(&shutdown),
        collaborators.tracer.clone(),
    );
    http.start().await?;
    rpc.start().await?;
    shutdown.set_ready();

    let on_signal = Arc::clone(&shutdown);
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("shutdown signal received, draining");
        on_signal.trigger_shutdown();
    });

    let http_stop = Arc::clone(&shutdown);
    let rpc_stop = Arc::clone(&shutdown);
    let result = tokio::try_join!(
        http.serve(async move { http_stop.wait_for_shutdown().await }),
        rpc.serve(async move { rpc_stop.wait_for_shutdown().await }),
    );
    // Either server failing stops the other.
    shutdown.trigger_shutdown();

    store.close().await;
    result?;
    info!("guestlist server stopped");
    Ok(())
}
