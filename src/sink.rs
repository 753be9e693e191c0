//! Optional structured metrics sink.
//!
//! The reporting loop hands every aggregated snapshot to the sink if one is
//! configured; sink failures are logged by the caller and never reach the
//! workers.

use crate::display::AggregatedSnapshot;
use async_trait::async_trait;
use bson::Document;
use mongodb::{Collection, Database};

#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn record(&self, snapshot: &AggregatedSnapshot) -> anyhow::Result<()>;
}

/// Persists snapshots into a MongoDB collection alongside the loaded data.
pub struct MongoMetricsSink {
    collection: Collection<Document>,
}

impl MongoMetricsSink {
    pub fn new(database: &Database, collection: &str) -> Self {
        Self {
            collection: database.collection(collection),
        }
    }
}

#[async_trait]
impl MetricsSink for MongoMetricsSink {
    async fn record(&self, snapshot: &AggregatedSnapshot) -> anyhow::Result<()> {
        let doc = bson::to_document(snapshot)?;
        self.collection.insert_one(doc).await?;
        Ok(())
    }
}
