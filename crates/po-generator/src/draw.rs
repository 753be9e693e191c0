//! Per-worker random draws over the reference tables.
//!
//! Every worker owns one [`Draw`] with its own seeded `StdRng`; nothing here
//! is shared mutable state, which keeps draw sequences uncorrelated across
//! workers and reproducible in tests.

use crate::refdata::{
    Product, ReferenceData, CITIES, COUNTRIES, SPECIAL_INSTRUCTIONS, STATES, STREET_NAMES,
    STREET_SUFFIXES,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use std::sync::Arc;

/// A synthesized postal address with a point geometry.
#[derive(Debug, Clone)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub longitude: f64,
    pub latitude: f64,
}

/// Owned random source bound to the shared reference tables.
pub struct Draw {
    refdata: Arc<ReferenceData>,
    rng: StdRng,
}

impl Draw {
    pub fn new(refdata: Arc<ReferenceData>, seed: u64) -> Self {
        Self {
            refdata,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn refdata(&self) -> &ReferenceData {
        &self.refdata
    }

    /// Uniform integer in `0..max`. `max` must be positive.
    pub fn below(&mut self, max: usize) -> usize {
        self.rng.random_range(0..max)
    }

    /// `|round(multiplier * N(0,1))|`, always non-negative.
    pub fn abs_gaussian(&mut self, multiplier: f64) -> u32 {
        let sample: f64 = self.rng.sample(StandardNormal);
        (multiplier * sample).round().abs() as u32
    }

    pub fn flag(&mut self) -> bool {
        self.rng.random()
    }

    pub fn first_name(&mut self) -> String {
        let names = self.refdata.first_names();
        let idx = self.rng.random_range(0..names.len());
        names[idx].clone()
    }

    pub fn last_name(&mut self) -> String {
        let names = self.refdata.last_names();
        let idx = self.rng.random_range(0..names.len());
        names[idx].clone()
    }

    pub fn special_instruction(&mut self) -> &'static str {
        SPECIAL_INSTRUCTIONS[self.rng.random_range(0..SPECIAL_INSTRUCTIONS.len())]
    }

    /// Skewed catalog draw: 50% of draws land in the first 5 entries, 20% in
    /// the next 5, the remaining 30% uniformly across the whole catalog.
    /// Models real-world product popularity.
    pub fn product(&mut self) -> Product {
        let products = self.refdata.products();
        let bucket = self.rng.random_range(0..100);
        let idx = if bucket < 50 {
            self.rng.random_range(0..5.min(products.len()))
        } else if bucket < 70 {
            let hot = 5.min(products.len());
            let warm = 10.min(products.len());
            self.rng.random_range(hot.min(warm.saturating_sub(1))..warm)
        } else {
            self.rng.random_range(0..products.len())
        };
        products[idx].clone()
    }

    pub fn address(&mut self) -> Address {
        let number = 1 + self.rng.random_range(0..9999);
        let street = format!(
            "{} {} {}",
            number,
            STREET_NAMES[self.rng.random_range(0..STREET_NAMES.len())],
            STREET_SUFFIXES[self.rng.random_range(0..STREET_SUFFIXES.len())],
        );
        Address {
            street,
            city: CITIES[self.rng.random_range(0..CITIES.len())].to_string(),
            state: STATES[self.rng.random_range(0..STATES.len())].to_string(),
            zip_code: format!("{:05}", self.rng.random_range(501..99951)),
            country: COUNTRIES[self.rng.random_range(0..COUNTRIES.len())].to_string(),
            longitude: self.rng.random_range(-124.7..-66.9),
            latitude: self.rng.random_range(24.5..49.4),
        }
    }

    /// Landline-style number: `(AAA) PPP-NNNN`.
    pub fn phone_number(&mut self) -> String {
        format!(
            "({}{}) {}-{}",
            self.rng.random_range(2..10),
            self.digits(2),
            self.digits(3),
            self.digits(4),
        )
    }

    /// Mobile-style number: `AAA-PPP-NNNN`.
    pub fn mobile_number(&mut self) -> String {
        format!(
            "{}{}-{}-{}",
            self.rng.random_range(2..10),
            self.digits(2),
            self.digits(3),
            self.digits(4),
        )
    }

    fn digits(&mut self, count: usize) -> String {
        (0..count)
            .map(|_| char::from(b'0' + self.rng.random_range(0..10) as u8))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refdata::Product;
    use rust_decimal::Decimal;

    fn fixture(catalog_size: usize) -> Arc<ReferenceData> {
        let products = (0..catalog_size)
            .map(|i| Product {
                name: format!("product-{i}"),
                unit_price: Decimal::new(100 + i as i64, 2),
                code: i as i64,
            })
            .collect();
        Arc::new(
            ReferenceData::from_parts(
                vec!["Alice".into(), "Bob".into()],
                vec!["Smith".into(), "Jones".into()],
                products,
            )
            .unwrap(),
        )
    }

    #[test]
    fn below_is_bounded() {
        let mut draw = Draw::new(fixture(20), 1);
        for _ in 0..1000 {
            assert!(draw.below(7) < 7);
        }
    }

    #[test]
    fn abs_gaussian_is_non_negative_and_finite() {
        let mut draw = Draw::new(fixture(20), 2);
        for _ in 0..10_000 {
            // u32 return type already rules out negatives; make sure the
            // scaling stays in a sane band for the multiplier used by the
            // null-instructions trick.
            assert!(draw.abs_gaussian(10.0) < 1000);
        }
    }

    #[test]
    fn product_draw_matches_skew_policy() {
        let catalog = 100;
        let mut draw = Draw::new(fixture(catalog), 3);
        let n = 100_000;
        let mut first5 = 0usize;
        let mut next5 = 0usize;
        for _ in 0..n {
            let code = draw.product().code as usize;
            if code < 5 {
                first5 += 1;
            } else if code < 10 {
                next5 += 1;
            }
        }

        // 50% hot + uniform spillover, 20% warm + spillover.
        let expected_first5 = 0.5 + 0.3 * 5.0 / catalog as f64;
        let expected_next5 = 0.2 + 0.3 * 5.0 / catalog as f64;
        let f5 = first5 as f64 / n as f64;
        let n5 = next5 as f64 / n as f64;
        assert!((f5 - expected_first5).abs() < 0.02, "first5 fraction {f5}");
        assert!((n5 - expected_next5).abs() < 0.02, "next5 fraction {n5}");
    }

    #[test]
    fn product_draw_handles_small_catalogs() {
        let mut draw = Draw::new(fixture(3), 4);
        for _ in 0..10_000 {
            let p = draw.product();
            assert!((p.code as usize) < 3);
        }
    }

    #[test]
    fn seeded_draws_are_reproducible() {
        let refdata = fixture(20);
        let mut a = Draw::new(refdata.clone(), 42);
        let mut b = Draw::new(refdata, 42);
        for _ in 0..100 {
            assert_eq!(a.below(1000), b.below(1000));
            assert_eq!(a.first_name(), b.first_name());
            assert_eq!(a.product(), b.product());
        }
    }

    #[test]
    fn phone_numbers_have_expected_shape() {
        let mut draw = Draw::new(fixture(20), 5);
        let landline = draw.phone_number();
        assert_eq!(landline.len(), "(123) 456-7890".len());
        assert!(landline.starts_with('('));

        let mobile = draw.mobile_number();
        assert_eq!(mobile.len(), "123-456-7890".len());
        assert_eq!(mobile.matches('-').count(), 2);
    }

    #[test]
    fn address_coordinates_are_in_range() {
        let mut draw = Draw::new(fixture(20), 6);
        for _ in 0..100 {
            let a = draw.address();
            assert!(a.longitude > -125.0 && a.longitude < -66.0);
            assert!(a.latitude > 24.0 && a.latitude < 50.0);
            assert_eq!(a.zip_code.len(), 5);
        }
    }
}
