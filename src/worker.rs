//! Loader worker: one connection, one cache, one metrics snapshot.
//!
//! Lifecycle: acquire a pooled connection, eagerly build the document
//! cache, then cycle batches through insert+commit until cancellation or a
//! store error. A batch of one follows the identical path; only the batch
//! size differs.

use crate::cache::{CyclePolicy, DocumentCache};
use crate::error::LoaderError;
use crate::metrics::WorkerMetrics;
use crate::store::{StoreConnection, StorePool};
use po_generator::OrderSynthesizer;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Per-worker load parameters, identical across workers.
#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    pub batch_size: usize,
    pub cache_size: usize,
    pub cycle_policy: CyclePolicy,
}

/// One independent loading stream.
pub struct LoaderWorker<P: StorePool> {
    id: usize,
    pool: Arc<P>,
    synthesizer: OrderSynthesizer,
    config: WorkerConfig,
    metrics: WorkerMetrics,
    shutdown: CancellationToken,
}

impl<P: StorePool> LoaderWorker<P> {
    pub fn new(
        id: usize,
        pool: Arc<P>,
        synthesizer: OrderSynthesizer,
        config: WorkerConfig,
        metrics: WorkerMetrics,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            id,
            pool,
            synthesizer,
            config,
            metrics,
            shutdown,
        }
    }

    /// Run until cancellation or a store failure. The connection is
    /// released on every exit path when it drops here.
    pub async fn run(mut self) -> Result<(), LoaderError> {
        let mut conn = self.pool.acquire().await?;

        debug!(
            worker = self.id,
            cache_size = self.config.cache_size,
            "building document cache"
        );
        let cache = DocumentCache::build(
            &mut self.synthesizer,
            self.config.cache_size,
            self.config.cycle_policy,
            |bytes| conn.prepare(bytes),
        )?;
        debug!(
            worker = self.id,
            len = cache.len(),
            modulo = cache.modulo(),
            "document cache ready"
        );

        let mut cursor = cache.cursor();
        let mut batch: Vec<<P::Conn as StoreConnection>::Doc> =
            Vec::with_capacity(self.config.batch_size);

        let mut documents: u64 = 0;
        let mut bytes: u64 = 0;
        let mut value = Decimal::ZERO;
        let mut batches: u64 = 0;

        // Cancellation is observed between batches; an in-flight commit is
        // allowed to finish naturally.
        while !self.shutdown.is_cancelled() {
            let mut batch_bytes: u64 = 0;
            let mut batch_value = Decimal::ZERO;
            for _ in 0..self.config.batch_size {
                let slot = cursor.advance();
                batch_bytes += cache.byte_len(slot);
                batch_value += cache.amount(slot);
                batch.push(cache.doc(slot).clone());
            }

            if let Err(e) = Self::submit(&mut conn, &batch).await {
                // Best-effort rollback; the error that matters is the
                // original one.
                if let Err(rollback_err) = conn.rollback().await {
                    debug!(worker = self.id, error = %rollback_err, "rollback failed");
                }
                error!(
                    worker = self.id,
                    batch = batches + 1,
                    documents,
                    error = %e,
                    "batch submit failed"
                );
                return Err(e.into());
            }

            documents += batch.len() as u64;
            bytes += batch_bytes;
            value += batch_value;
            batches += 1;
            batch.clear();

            self.metrics
                .update(documents, bytes, value.to_f64().unwrap_or(0.0));
        }

        debug!(worker = self.id, documents, batches, "worker stopping");
        Ok(())
    }

    async fn submit(
        conn: &mut P::Conn,
        batch: &[<P::Conn as StoreConnection>::Doc],
    ) -> Result<(), crate::store::StoreError> {
        conn.insert_batch(batch).await?;
        conn.commit().await
    }
}
