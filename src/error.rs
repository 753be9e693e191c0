//! Error taxonomy for the loader.

use crate::store::{ErrorKind, StoreError};
use po_generator::{RefDataError, SynthesisError};
use thiserror::Error;

/// Errors that can terminate a worker or abort the run.
#[derive(Error, Debug)]
pub enum LoaderError {
    /// Reference data unreadable. Fatal at startup, aborts the whole run.
    #[error("reference data error: {0}")]
    RefData(#[from] RefDataError),

    /// Document encoding broke. Fatal to the owning worker only.
    #[error("document synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),

    /// Store-side failure, classified recoverable or fatal by the store
    /// implementation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LoaderError {
    /// Whether the orchestrator may treat this as a transient store
    /// condition rather than a defect.
    pub fn is_recoverable(&self) -> bool {
        match self {
            LoaderError::Store(e) => e.kind() == ErrorKind::Recoverable,
            LoaderError::RefData(_) | LoaderError::Synthesis(_) => false,
        }
    }
}
