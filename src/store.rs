//! Store abstraction: connection pool, batched inserts, commit/rollback.
//!
//! The loader core only sees these traits; the MongoDB implementation lives
//! in [`mongo`]. Tests drive workers through the mock in `crate::testing`.

use async_trait::async_trait;
use thiserror::Error;

pub mod mongo;

/// Commit durability: a latency/durability trade-off exposed as
/// configuration, not logic the loader decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Durability {
    /// Wait for the write to be durable before acknowledging.
    Synchronous,
    /// Batched, no-wait acknowledgment.
    Asynchronous,
}

/// Whether a store failure is worth an orchestrator-level retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Recoverable,
    Fatal,
}

/// Store-side failures.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("connection pool exhausted")]
    PoolExhausted,

    #[error("store connection failed: {0}")]
    Connection(String),

    #[error("document rejected by the store: {0}")]
    Prepare(String),

    #[error("batch insert failed: {message}")]
    Write { message: String, kind: ErrorKind },

    #[error("commit failed: {message}")]
    Commit { message: String, kind: ErrorKind },

    #[error("rollback failed: {0}")]
    Rollback(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Write { kind, .. } | StoreError::Commit { kind, .. } => *kind,
            // A worker that cannot acquire or keep a connection is done;
            // only the orchestrator may react by reducing concurrency.
            StoreError::PoolExhausted
            | StoreError::Connection(_)
            | StoreError::Prepare(_)
            | StoreError::Rollback(_) => ErrorKind::Fatal,
        }
    }
}

/// Bounded pool of store connections. Must be sized >= worker count + 1.
#[async_trait]
pub trait StorePool: Send + Sync + 'static {
    type Conn: StoreConnection;

    async fn acquire(&self) -> Result<Self::Conn, StoreError>;
}

/// One store connection, owned exclusively by a worker.
#[async_trait]
pub trait StoreConnection: Send + 'static {
    /// Store-native document representation cached by the worker.
    type Doc: Clone + Send + Sync + 'static;

    /// Convert serialized JSON bytes into the store-native form once, at
    /// cache-build time.
    fn prepare(&self, bytes: &[u8]) -> Result<Self::Doc, StoreError>;

    /// Submit one batch as a single atomic bulk-insert.
    async fn insert_batch(&mut self, docs: &[Self::Doc]) -> Result<(), StoreError>;

    /// Commit the current write unit. Durability is fixed when the
    /// connection is acquired.
    async fn commit(&mut self) -> Result<(), StoreError>;

    /// Best-effort rollback; callers swallow failures.
    async fn rollback(&mut self) -> Result<(), StoreError>;
}
