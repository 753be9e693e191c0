//! CLI surface.

use crate::cache::CyclePolicy;
use crate::store::Durability;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Purchase-order load generator options.
#[derive(Parser, Clone, Debug)]
#[command(
    name = "po-loadgen",
    about = "Generate synthetic purchase orders and bulk-load them into MongoDB"
)]
pub struct LoadOpts {
    /// MongoDB connection string
    #[arg(
        long,
        env = "MONGODB_CONNECTION_STRING",
        default_value = "mongodb://localhost:27017"
    )]
    pub connection_string: String,

    /// Target database name
    #[arg(long, env = "MONGODB_DATABASE", default_value = "bench")]
    pub database: String,

    /// Target collection name
    #[arg(long, default_value = "purchase_orders")]
    pub collection: String,

    /// Commit asynchronously (no-wait) instead of waiting for durability
    #[arg(long, default_value_t = false)]
    pub async_commit: bool,

    /// Documents per commit unit
    #[arg(long, default_value_t = 10_000, value_parser = clap::value_parser!(u32).range(1..=50_000))]
    pub batch_size: u32,

    /// Number of parallel loader workers (default: CPU core count)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Use unordered (append-style) bulk inserts
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub append_hint: bool,

    /// Truncate the collection before loading
    #[arg(long, default_value_t = false)]
    pub truncate: bool,

    /// Pre-synthesized documents per worker cache
    #[arg(long, default_value_t = 10_000, value_parser = clap::value_parser!(u64).range(1..=100_000))]
    pub cache_size: u64,

    /// How the worker cursor cycles over its cache
    #[arg(long, value_enum, default_value_t = CyclePolicy::SubRange)]
    pub cycle_policy: CyclePolicy,

    /// Directory holding first_names.txt, last_names.txt and products.csv
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Metrics reporting period in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub report_interval_ms: u64,

    /// Reset running min/avg/max every N ticks (default: never)
    #[arg(long)]
    pub reset_after_ticks: Option<u64>,

    /// Collection to persist aggregated metrics snapshots into
    #[arg(long)]
    pub metrics_collection: Option<String>,

    /// Base seed for reproducible document synthesis
    #[arg(long)]
    pub seed: Option<u64>,
}

impl LoadOpts {
    pub fn workers(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get)
    }

    pub fn durability(&self) -> Durability {
        if self.async_commit {
            Durability::Asynchronous
        } else {
            Durability::Synchronous
        }
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_loader_conventions() {
        let opts = LoadOpts::parse_from(["po-loadgen"]);
        assert_eq!(opts.collection, "purchase_orders");
        assert_eq!(opts.batch_size, 10_000);
        assert_eq!(opts.cache_size, 10_000);
        assert!(!opts.async_commit);
        assert!(opts.append_hint);
        assert!(!opts.truncate);
        assert_eq!(opts.workers(), num_cpus::get());
        assert_eq!(opts.durability(), Durability::Synchronous);
        assert_eq!(opts.cycle_policy, CyclePolicy::SubRange);
    }

    #[test]
    fn batch_size_is_range_checked() {
        assert!(LoadOpts::try_parse_from(["po-loadgen", "--batch-size", "0"]).is_err());
        assert!(LoadOpts::try_parse_from(["po-loadgen", "--batch-size", "50001"]).is_err());
        let opts = LoadOpts::try_parse_from(["po-loadgen", "--batch-size", "1"]).unwrap();
        assert_eq!(opts.batch_size, 1);
    }

    #[test]
    fn cache_size_is_range_checked() {
        // A zero-size cache would give the worker cursor nothing to cycle
        // over; reject it at parse time like batch_size.
        assert!(LoadOpts::try_parse_from(["po-loadgen", "--cache-size", "0"]).is_err());
        assert!(LoadOpts::try_parse_from(["po-loadgen", "--cache-size", "100001"]).is_err());
        let opts = LoadOpts::try_parse_from(["po-loadgen", "--cache-size", "1"]).unwrap();
        assert_eq!(opts.cache_size, 1);
    }

    #[test]
    fn async_commit_selects_asynchronous_durability() {
        let opts = LoadOpts::parse_from(["po-loadgen", "--async-commit"]);
        assert_eq!(opts.durability(), Durability::Asynchronous);
    }
}
