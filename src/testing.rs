//! In-memory store used by unit and integration tests.
//!
//! Counts inserts, commits, and rollbacks, and can inject a classified
//! failure at a chosen batch boundary.

use crate::store::{ErrorKind, StoreConnection, StoreError, StorePool};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Failure injection point.
#[derive(Debug, Clone, Copy)]
pub enum FailAt {
    /// Fail the Nth `insert_batch` call (1-based).
    Insert { batch: u64, kind: ErrorKind },
    /// Fail the commit of the Nth batch (1-based).
    Commit { batch: u64, kind: ErrorKind },
}

/// Shared observable state behind every connection of one pool.
#[derive(Debug, Default)]
pub struct MockState {
    pub inserted_documents: u64,
    pub insert_calls: u64,
    pub commits: u64,
    pub rollbacks: u64,
}

/// Pool handing out connections over one shared [`MockState`].
pub struct MockPool {
    state: Arc<Mutex<MockState>>,
    failure: Option<FailAt>,
    exhausted: bool,
}

impl MockPool {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            failure: None,
            exhausted: false,
        }
    }

    pub fn with_failure(mut self, failure: FailAt) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Every `acquire` fails with `PoolExhausted`.
    pub fn with_exhausted_pool(mut self) -> Self {
        self.exhausted = true;
        self
    }

    pub fn state(&self) -> Arc<Mutex<MockState>> {
        self.state.clone()
    }
}

impl Default for MockPool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorePool for MockPool {
    type Conn = MockConnection;

    async fn acquire(&self) -> Result<MockConnection, StoreError> {
        if self.exhausted {
            return Err(StoreError::PoolExhausted);
        }
        Ok(MockConnection {
            state: self.state.clone(),
            failure: self.failure,
            pending: 0,
        })
    }
}

pub struct MockConnection {
    state: Arc<Mutex<MockState>>,
    failure: Option<FailAt>,
    /// Documents inserted but not yet committed.
    pending: u64,
}

#[async_trait]
impl StoreConnection for MockConnection {
    type Doc = Vec<u8>;

    fn prepare(&self, bytes: &[u8]) -> Result<Vec<u8>, StoreError> {
        Ok(bytes.to_vec())
    }

    async fn insert_batch(&mut self, docs: &[Vec<u8>]) -> Result<(), StoreError> {
        // Yield so spinning workers cooperate with single-threaded test
        // runtimes.
        tokio::task::yield_now().await;

        let call = {
            let mut state = self.state.lock().unwrap();
            state.insert_calls += 1;
            state.insert_calls
        };
        if let Some(FailAt::Insert { batch, kind }) = self.failure {
            if call == batch {
                return Err(StoreError::Write {
                    message: format!("injected insert failure at batch {batch}"),
                    kind,
                });
            }
        }
        self.pending += docs.len() as u64;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let call = self.state.lock().unwrap().insert_calls;
        if let Some(FailAt::Commit { batch, kind }) = self.failure {
            if call == batch {
                return Err(StoreError::Commit {
                    message: format!("injected commit failure at batch {batch}"),
                    kind,
                });
            }
        }
        let mut state = self.state.lock().unwrap();
        state.inserted_documents += self.pending;
        state.commits += 1;
        self.pending = 0;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.pending = 0;
        self.state.lock().unwrap().rollbacks += 1;
        Ok(())
    }
}
