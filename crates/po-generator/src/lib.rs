//! Synthetic purchase-order generation for po-loadgen.
//!
//! This crate owns everything that happens before a document reaches the
//! store: loading the immutable reference tables (names, product catalog),
//! drawing randomized values from them with realistic skew, and assembling
//! one serialized purchase-order document together with the facts (byte
//! length, order total) the loader's metrics need.
//!
//! Each loader worker owns its own [`Draw`] with an independently seeded
//! RNG, so workers never contend on shared random state and test runs can
//! pin a seed for reproducible documents.

pub mod draw;
pub mod order;
pub mod refdata;

pub use draw::{Address, Draw};
pub use order::{OrderSynthesizer, SyntheticDocument, SynthesisError};
pub use refdata::{Product, RefDataError, ReferenceData};
