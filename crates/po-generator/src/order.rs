//! Purchase-order document synthesis.

use crate::draw::Draw;
use chrono::{SecondsFormat, TimeDelta, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use thiserror::Error;

/// Document synthesis failed. Randomization paths are total; only the
/// serialization of the finished order can fail.
#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("failed to serialize purchase order: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One synthesized purchase order: its serialized form plus the facts the
/// loader's metrics need. Immutable once produced.
#[derive(Debug, Clone)]
pub struct SyntheticDocument {
    pub bytes: Vec<u8>,
    pub byte_len: u64,
    pub total_value: Decimal,
}

/// Builds synthetic purchase orders from an owned [`Draw`].
pub struct OrderSynthesizer {
    draw: Draw,
}

impl OrderSynthesizer {
    pub fn new(draw: Draw) -> Self {
        Self { draw }
    }

    pub fn draw_mut(&mut self) -> &mut Draw {
        &mut self.draw
    }

    /// Synthesize one purchase order.
    ///
    /// `index` offsets the order timestamp by that many milliseconds so a
    /// cache built in one pass carries strictly increasing, collision-free
    /// timestamps.
    pub fn synthesize(&mut self, index: u32) -> Result<SyntheticDocument, SynthesisError> {
        let first_name = self.draw.first_name();
        let last_name = self.draw.last_name();
        let full_name = format!("{first_name} {last_name}");

        let mut user = String::new();
        user.extend(first_name.chars().take(1));
        let last_fragment: String = last_name.chars().take(8).collect();
        user.push_str(&last_fragment.to_uppercase());

        let requested_at = Utc::now() + TimeDelta::milliseconds(i64::from(index));
        let reference = format!("{user}-{}", requested_at.format("%Y%m%d"));

        let address = self.draw.address();

        let phone_count = self.draw.below(4);
        let mut phones = Vec::with_capacity(phone_count);
        for ordinal in 1..=phone_count {
            let number = if ordinal == 2 {
                self.draw.mobile_number()
            } else {
                self.draw.phone_number()
            };
            phones.push(json!({
                "type": self.draw.refdata().phone_type(ordinal - 1),
                "number": number,
            }));
        }

        let cost_center = format!("A{}", 10 * (1 + self.draw.below(10)));

        // A Gaussian draw hitting one fixed value nulls the field with small
        // probability.
        let special_instructions = if self.draw.abs_gaussian(10.0) == 2 {
            Value::Null
        } else {
            Value::String(self.draw.special_instruction().to_string())
        };

        let item_count = 1 + self.draw.below(5);
        let mut items = Vec::with_capacity(item_count);
        let mut total_value = Decimal::ZERO;
        for _ in 0..item_count {
            let product = self.draw.product();
            let quantity = 1 + self.draw.below(4);
            total_value += Decimal::from(quantity) * product.unit_price;
            items.push(json!({
                "description": product.name,
                "unitPrice": product.unit_price.to_f64().unwrap_or(0.0),
                "UPCCode": product.code,
                "quantity": quantity,
            }));
        }

        let mut shipping = json!({
            "name": full_name,
            "address": {
                "street": address.street,
                "city": address.city,
                "state": address.state,
                "zipCode": address.zip_code,
                "country": address.country,
                "geometry": {
                    "type": "Point",
                    "coordinates": [address.longitude, address.latitude],
                },
            },
        });
        if !phones.is_empty() {
            shipping["phone"] = Value::Array(phones);
        }

        let order = json!({
            "reference": reference,
            "requestor": full_name,
            "user": user,
            "requestedAt": requested_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            "shippingInstructions": shipping,
            "costCenter": cost_center,
            "specialInstructions": special_instructions,
            "allowPartialShipment": self.draw.flag(),
            "items": items,
        });

        let bytes = serde_json::to_vec(&order)?;
        let byte_len = bytes.len() as u64;

        Ok(SyntheticDocument {
            bytes,
            byte_len,
            total_value,
        })
    }
}
