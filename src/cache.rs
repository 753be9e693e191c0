//! Per-worker cache of pre-synthesized documents.
//!
//! Built once before the worker enters its measured loop, so document
//! generation cost never shows up in the insertion rate. Slots hold the
//! store-native document plus the facts (byte length, order total) charged
//! to the metrics when the slot is replayed.

use crate::error::LoaderError;
use crate::store::StoreError;
use clap::ValueEnum;
use po_generator::OrderSynthesizer;
use rust_decimal::Decimal;

/// How the cursor cycles over the cache.
///
/// `SubRange` bounds the cycle to a random modulo between half and full
/// capacity, picked once at build time, so small batch sizes do not replay
/// the cache with a perfectly periodic pattern. The policy is fixed for the
/// life of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CyclePolicy {
    Full,
    SubRange,
}

/// Fixed-capacity, read-only document cache. Never mutated after build.
pub struct DocumentCache<D> {
    docs: Vec<D>,
    byte_lens: Vec<u64>,
    amounts: Vec<Decimal>,
    modulo: usize,
}

impl<D> DocumentCache<D> {
    /// Eagerly synthesize `capacity` documents, converting each into the
    /// store-native form via `prepare`.
    pub fn build<F>(
        synthesizer: &mut OrderSynthesizer,
        capacity: usize,
        policy: CyclePolicy,
        mut prepare: F,
    ) -> Result<Self, LoaderError>
    where
        F: FnMut(&[u8]) -> Result<D, StoreError>,
    {
        let mut docs = Vec::with_capacity(capacity);
        let mut byte_lens = Vec::with_capacity(capacity);
        let mut amounts = Vec::with_capacity(capacity);

        for index in 0..capacity {
            let doc = synthesizer.synthesize(index as u32)?;
            docs.push(prepare(&doc.bytes)?);
            byte_lens.push(doc.byte_len);
            amounts.push(doc.total_value);
        }

        let modulo = match policy {
            CyclePolicy::Full => capacity,
            CyclePolicy::SubRange if capacity >= 2 => {
                let half = capacity / 2;
                capacity.min(half + synthesizer.draw_mut().below(half))
            }
            CyclePolicy::SubRange => capacity,
        };

        Ok(Self {
            docs,
            byte_lens,
            amounts,
            modulo,
        })
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Effective cycle length; `<= len()` under `SubRange`.
    pub fn modulo(&self) -> usize {
        self.modulo
    }

    pub fn doc(&self, slot: usize) -> &D {
        &self.docs[slot]
    }

    pub fn byte_len(&self, slot: usize) -> u64 {
        self.byte_lens[slot]
    }

    pub fn amount(&self, slot: usize) -> Decimal {
        self.amounts[slot]
    }

    pub fn cursor(&self) -> Cursor {
        Cursor {
            pos: 0,
            modulo: self.modulo,
        }
    }
}

/// Cyclic cursor over a cache. Wraps without reallocating.
#[derive(Debug, Clone)]
pub struct Cursor {
    pos: usize,
    modulo: usize,
}

impl Cursor {
    /// Return the current slot and step to the next one.
    pub fn advance(&mut self) -> usize {
        let slot = self.pos;
        self.pos = (self.pos + 1) % self.modulo;
        slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use po_generator::{Draw, Product, ReferenceData};
    use std::sync::Arc;

    fn synthesizer(seed: u64) -> OrderSynthesizer {
        let products = (0..12)
            .map(|i| Product {
                name: format!("product-{i}"),
                unit_price: Decimal::new(100, 2),
                code: i,
            })
            .collect();
        let refdata = Arc::new(
            ReferenceData::from_parts(
                vec!["Alice".into()],
                vec!["Smith".into()],
                products,
            )
            .unwrap(),
        );
        OrderSynthesizer::new(Draw::new(refdata, seed))
    }

    fn bytes_cache(capacity: usize, policy: CyclePolicy) -> DocumentCache<Vec<u8>> {
        let mut synth = synthesizer(7);
        DocumentCache::build(&mut synth, capacity, policy, |bytes| Ok(bytes.to_vec())).unwrap()
    }

    #[test]
    fn build_fills_every_slot() {
        let cache = bytes_cache(25, CyclePolicy::Full);
        assert_eq!(cache.len(), 25);
        assert_eq!(cache.modulo(), 25);
        for slot in 0..cache.len() {
            assert_eq!(cache.byte_len(slot), cache.doc(slot).len() as u64);
            assert!(cache.amount(slot) > Decimal::ZERO);
        }
    }

    #[test]
    fn full_cycle_batches_wrap_deterministically() {
        // capacity=3, batch=2: [A,B], [C,A], [B,C], then back to the start.
        let cache = bytes_cache(3, CyclePolicy::Full);
        let mut cursor = cache.cursor();
        let slots: Vec<usize> = (0..6).map(|_| cursor.advance()).collect();
        assert_eq!(slots, [0, 1, 2, 0, 1, 2]);

        let batches: Vec<[usize; 2]> = {
            let mut c = cache.cursor();
            (0..3).map(|_| [c.advance(), c.advance()]).collect()
        };
        assert_eq!(batches, [[0, 1], [2, 0], [1, 2]]);
    }

    #[test]
    fn cursor_never_leaves_bounds() {
        for policy in [CyclePolicy::Full, CyclePolicy::SubRange] {
            let cache = bytes_cache(17, policy);
            let mut cursor = cache.cursor();
            for _ in 0..1000 {
                let slot = cursor.advance();
                assert!(slot < cache.len());
                assert!(slot < cache.modulo());
            }
        }
    }

    #[test]
    fn sub_range_modulo_is_between_half_and_full() {
        for seed in 0..20 {
            let mut synth = synthesizer(seed);
            let cache: DocumentCache<Vec<u8>> =
                DocumentCache::build(&mut synth, 100, CyclePolicy::SubRange, |b| Ok(b.to_vec()))
                    .unwrap();
            assert!(cache.modulo() >= 50 && cache.modulo() <= 100);
            assert_eq!(cache.len(), 100);
        }
    }

    #[test]
    fn tiny_caches_fall_back_to_full_cycle() {
        let cache = bytes_cache(1, CyclePolicy::SubRange);
        assert_eq!(cache.modulo(), 1);
        let mut cursor = cache.cursor();
        assert_eq!(cursor.advance(), 0);
        assert_eq!(cursor.advance(), 0);
    }

    #[test]
    fn prepare_failure_aborts_build() {
        let mut synth = synthesizer(1);
        let result: Result<DocumentCache<Vec<u8>>, _> =
            DocumentCache::build(&mut synth, 10, CyclePolicy::Full, |_| {
                Err(StoreError::Prepare("bad document".into()))
            });
        assert!(result.is_err());
    }
}
