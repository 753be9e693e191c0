//! Run orchestration: worker fan-out and the reporting loop.

use crate::config::LoadOpts;
use crate::display::MetricsAggregator;
use crate::error::LoaderError;
use crate::metrics::WorkerMetrics;
use crate::sink::{MetricsSink, MongoMetricsSink};
use crate::store::mongo::MongoStore;
use crate::store::StorePool;
use crate::worker::{LoaderWorker, WorkerConfig};
use po_generator::{Draw, OrderSynthesizer, ReferenceData};
use rand::Rng;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

/// Parameters of one load run, decoupled from the CLI surface so tests can
/// drive the loop against a mock pool.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub workers: usize,
    pub worker: WorkerConfig,
    pub collection: String,
    pub report_interval: Duration,
    pub reset_after_ticks: Option<u64>,
    pub seed: Option<u64>,
}

/// Full CLI entry point: connect, prepare the collection, run to
/// completion.
pub async fn run(opts: LoadOpts) -> anyhow::Result<()> {
    let workers = opts.workers();
    info!(database = %opts.database, collection = %opts.collection, "starting loader");
    info!(
        async_commit = opts.async_commit,
        batch_size = opts.batch_size,
        workers,
        append_hint = opts.append_hint,
        truncate = opts.truncate,
        cache_size = opts.cache_size,
        "configuration"
    );

    let refdata = Arc::new(ReferenceData::load(&opts.data_dir).map_err(LoaderError::from)?);

    let store = MongoStore::connect(
        &opts.connection_string,
        &opts.database,
        &opts.collection,
        workers as u32 + 1,
        opts.durability(),
        opts.append_hint,
    )
    .await?;
    store.ensure_collection(opts.truncate).await?;

    let initial_documents = store.document_count().await?;
    info!(initial_documents, "initial document count");

    let sink: Option<Arc<dyn MetricsSink>> = opts
        .metrics_collection
        .as_deref()
        .map(|name| Arc::new(MongoMetricsSink::new(store.database(), name)) as Arc<dyn MetricsSink>);

    let config = RunConfig {
        workers,
        worker: WorkerConfig {
            batch_size: opts.batch_size as usize,
            cache_size: opts.cache_size as usize,
            cycle_policy: opts.cycle_policy,
        },
        collection: opts.collection.clone(),
        report_interval: opts.report_interval(),
        reset_after_ticks: opts.reset_after_ticks,
        seed: opts.seed,
    };

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            signal_token.cancel();
        }
    });

    run_load(
        Arc::new(store),
        refdata,
        config,
        initial_documents,
        sink,
        shutdown,
    )
    .await
}

/// Spawn the workers and drive the reporting loop until shutdown or until
/// every worker has terminated. Waits for all workers before returning.
pub async fn run_load<P: StorePool>(
    pool: Arc<P>,
    refdata: Arc<ReferenceData>,
    config: RunConfig,
    initial_documents: u64,
    sink: Option<Arc<dyn MetricsSink>>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let tracker = TaskTracker::new();
    let base_seed = config.seed.unwrap_or_else(|| rand::rng().random());
    let mut receivers = Vec::with_capacity(config.workers);

    for id in 0..config.workers {
        let (metrics, rx) = WorkerMetrics::channel();
        receivers.push(rx);

        let seed = base_seed.wrapping_add((id as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
        let synthesizer = OrderSynthesizer::new(Draw::new(refdata.clone(), seed));
        let worker = LoaderWorker::new(
            id,
            pool.clone(),
            synthesizer,
            config.worker,
            metrics,
            shutdown.child_token(),
        );

        // Every exit path ends the task, so the tracker's countdown fires
        // exactly once per worker.
        tracker.spawn(async move {
            match worker.run().await {
                Ok(()) => info!(worker = id, "worker stopped"),
                Err(e) if e.is_recoverable() => {
                    warn!(worker = id, error = %e, "worker terminated after recoverable store error")
                }
                Err(e) => error!(worker = id, error = %e, "worker terminated"),
            }
        });
    }
    tracker.close();

    let mut aggregator = MetricsAggregator::new(
        config.collection.clone(),
        initial_documents,
        config.reset_after_ticks,
    );
    let mut interval = tokio::time::interval(config.report_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                aggregator.begin_tick();
                for rx in &receivers {
                    aggregator.add(&rx.borrow());
                }
                let snapshot = aggregator.finish_tick();
                render(&aggregator);
                debug!("{}", aggregator.detail_line());

                if let Some(sink) = &sink {
                    if let Err(e) = sink.record(&snapshot).await {
                        warn!(error = %e, "metrics sink write failed");
                    }
                }
            }
            _ = shutdown.cancelled() => break,
            // All workers already terminated on their own.
            _ = tracker.wait() => break,
        }
    }

    shutdown.cancel();
    tracker.wait().await;
    println!();
    info!(
        total_documents = aggregator.total_documents(),
        "run complete"
    );
    Ok(())
}

fn render(aggregator: &MetricsAggregator) {
    let mut stdout = std::io::stdout().lock();
    let _ = write!(stdout, "\r{:<80}\r{}", "", aggregator.status_line());
    let _ = stdout.flush();
}
