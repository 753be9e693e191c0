//! MongoDB store implementation.
//!
//! Each worker connection wraps a `ClientSession`; batches are inserted
//! inside a multi-document transaction so commit/rollback form one atomic
//! write unit. Durability maps to the transaction write concern:
//! majority + journal for synchronous commits, w:1 un-journaled for
//! asynchronous ones.

use crate::store::{Durability, ErrorKind, StoreConnection, StoreError, StorePool};
use async_trait::async_trait;
use bson::{doc, Document};
use mongodb::error::{
    Error as MongoError, ErrorKind as MongoErrorKind, TRANSIENT_TRANSACTION_ERROR,
    UNKNOWN_TRANSACTION_COMMIT_RESULT,
};
use mongodb::options::{Acknowledgment, ClientOptions, TransactionOptions, WriteConcern};
use mongodb::{Client, ClientSession, Collection, Database};
use tracing::info;

/// MongoDB-backed store: one shared client (internally pooled), one target
/// collection.
pub struct MongoStore {
    client: Client,
    database: Database,
    collection_name: String,
    durability: Durability,
    append_hint: bool,
}

impl MongoStore {
    /// Connect and verify the deployment is reachable.
    ///
    /// `pool_size` caps the client's internal connection pool; size it at
    /// least worker count + 1.
    pub async fn connect(
        connection_string: &str,
        database: &str,
        collection: &str,
        pool_size: u32,
        durability: Durability,
        append_hint: bool,
    ) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(connection_string)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        options.max_pool_size = Some(pool_size);

        let client =
            Client::with_options(options).map_err(|e| StoreError::Connection(e.to_string()))?;
        let database = client.database(database);

        // Test connection
        database
            .list_collection_names()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            database,
            collection_name: collection.to_string(),
            durability,
            append_hint,
        })
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    fn collection(&self) -> Collection<Document> {
        self.database.collection(&self.collection_name)
    }

    /// Create the target collection if missing; optionally drop and recreate
    /// it first. Transactions require the collection to pre-exist.
    pub async fn ensure_collection(&self, truncate: bool) -> Result<(), StoreError> {
        let names = self
            .database
            .list_collection_names()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let exists = names.iter().any(|n| n == &self.collection_name);

        if exists && truncate {
            info!(collection = %self.collection_name, "truncating collection");
            self.collection()
                .drop()
                .await
                .map_err(|e| StoreError::Connection(e.to_string()))?;
        }
        if !exists || truncate {
            info!(collection = %self.collection_name, "creating collection");
            self.database
                .create_collection(&self.collection_name)
                .await
                .map_err(|e| StoreError::Connection(e.to_string()))?;
        }
        Ok(())
    }

    /// Number of documents already in the collection at startup.
    pub async fn document_count(&self) -> Result<u64, StoreError> {
        self.collection()
            .count_documents(doc! {})
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

}

fn write_concern(durability: Durability) -> WriteConcern {
    match durability {
        Durability::Synchronous => WriteConcern::builder()
            .w(Acknowledgment::Majority)
            .journal(true)
            .build(),
        Durability::Asynchronous => WriteConcern::builder()
            .w(Acknowledgment::Nodes(1))
            .journal(false)
            .build(),
    }
}

#[async_trait]
impl StorePool for MongoStore {
    type Conn = MongoConnection;

    async fn acquire(&self) -> Result<MongoConnection, StoreError> {
        let transaction_options = TransactionOptions::builder()
            .write_concern(write_concern(self.durability))
            .build();
        let session = self
            .client
            .start_session()
            .default_transaction_options(transaction_options)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(MongoConnection {
            collection: self.collection(),
            session,
            in_transaction: false,
            ordered: !self.append_hint,
        })
    }
}

/// One session-scoped connection, owned by a single worker.
pub struct MongoConnection {
    collection: Collection<Document>,
    session: ClientSession,
    in_transaction: bool,
    ordered: bool,
}

#[async_trait]
impl StoreConnection for MongoConnection {
    type Doc = Document;

    fn prepare(&self, bytes: &[u8]) -> Result<Document, StoreError> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| StoreError::Prepare(e.to_string()))?;
        bson::to_document(&value).map_err(|e| StoreError::Prepare(e.to_string()))
    }

    async fn insert_batch(&mut self, docs: &[Document]) -> Result<(), StoreError> {
        if !self.in_transaction {
            self.session
                .start_transaction()
                .await
                .map_err(|e| StoreError::Write {
                    message: e.to_string(),
                    kind: classify(&e),
                })?;
            self.in_transaction = true;
        }

        self.collection
            .insert_many(docs)
            .ordered(self.ordered)
            .session(&mut self.session)
            .await
            .map_err(|e| StoreError::Write {
                message: e.to_string(),
                kind: classify(&e),
            })?;
        Ok(())
    }

    // Durability is fixed per session via the default transaction options
    // set at acquire time.
    async fn commit(&mut self) -> Result<(), StoreError> {
        if !self.in_transaction {
            return Ok(());
        }
        self.in_transaction = false;
        self.session
            .commit_transaction()
            .await
            .map_err(|e| StoreError::Commit {
                message: e.to_string(),
                kind: classify(&e),
            })
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        if !self.in_transaction {
            return Ok(());
        }
        self.in_transaction = false;
        self.session
            .abort_transaction()
            .await
            .map_err(|e| StoreError::Rollback(e.to_string()))
    }
}

/// Transient transaction and transport failures are retry-worthy; anything
/// else (malformed batch, server-side rejection) is fatal.
fn classify(err: &MongoError) -> ErrorKind {
    if err.contains_label(TRANSIENT_TRANSACTION_ERROR)
        || err.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT)
    {
        return ErrorKind::Recoverable;
    }
    match &*err.kind {
        MongoErrorKind::Io(_) | MongoErrorKind::ServerSelection { .. } => ErrorKind::Recoverable,
        _ => ErrorKind::Fatal,
    }
}
