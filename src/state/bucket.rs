//! Bucket (bin) snapshots and tolerant parsing of raw bucket payloads.
//!
//! The AMM gateway hands back bucket data whose field names vary with the
//! upstream SDK version. Parsing therefore runs a fixed, ordered list of
//! named-field probes per attribute; the first probe that both finds the
//! field and parses it wins, and a bucket where no probe matches a required
//! attribute is treated as absent data rather than an error.

use serde_json::Value;
use tracing::warn;

/// Probe order for the bucket id field.
const BUCKET_ID_KEYS: &[&str] = &["binId", "bin_id", "id"];

/// Probe order for the X-token quantity field.
const AMOUNT_X_KEYS: &[&str] = &["positionXAmount", "binXAmount", "xAmount", "amountX", "amount_x"];

/// Probe order for the Y-token quantity field.
const AMOUNT_Y_KEYS: &[&str] = &["positionYAmount", "binYAmount", "yAmount", "amountY", "amount_y"];

/// Probe order for the optional per-bucket price tag.
pub(crate) const PRICE_KEYS: &[&str] = &["pricePerToken", "price", "binPrice", "price_per_token"];

/// Immutable snapshot of one price bucket inside a position.
///
/// Quantities are ledger base units. A bucket holding neither token is
/// "empty": it still counts for range membership but contributes nothing to
/// distribution analysis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bucket {
    /// Bin id; ordered consistently across every pool in the chain.
    pub id: i32,
    /// X-token quantity in base units.
    pub amount_x: u64,
    /// Y-token quantity in base units.
    pub amount_y: u64,
    /// Raw price tag reported by the gateway, display-only.
    pub price: Option<f64>,
}

impl Bucket {
    pub fn new(id: i32, amount_x: u64, amount_y: u64) -> Self {
        Self {
            id,
            amount_x,
            amount_y,
            price: None,
        }
    }

    /// True when the bucket holds neither token.
    pub fn is_empty(&self) -> bool {
        self.amount_x == 0 && self.amount_y == 0
    }

    /// Parse one raw bucket payload, trying each known field spelling in
    /// priority order. Returns `None` when any required attribute (id, X
    /// quantity, Y quantity) has no matching probe.
    pub fn from_raw(raw: &Value) -> Option<Self> {
        let id = probe_i32(raw, BUCKET_ID_KEYS)?;
        let amount_x = probe_u64(raw, AMOUNT_X_KEYS)?;
        let amount_y = probe_u64(raw, AMOUNT_Y_KEYS)?;
        let price = probe_f64(raw, PRICE_KEYS);

        Some(Self {
            id,
            amount_x,
            amount_y,
            price,
        })
    }
}

/// Parse a batch of raw bucket payloads, dropping the ones no probe matches.
///
/// An unrecognizable bucket is logged once and contributes nothing; an input
/// where every payload is unrecognizable yields an empty list.
pub fn parse_buckets(raw: &[Value]) -> Vec<Bucket> {
    let mut buckets = Vec::with_capacity(raw.len());
    let mut skipped = 0usize;

    for value in raw {
        match Bucket::from_raw(value) {
            Some(bucket) => buckets.push(bucket),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(
            skipped,
            parsed = buckets.len(),
            "bucket payloads with unrecognized field shape were dropped"
        );
    }

    buckets
}

/// Inclusive bucket-id range `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketRange {
    pub min: i32,
    pub max: i32,
}

impl BucketRange {
    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, bucket_id: i32) -> bool {
        bucket_id >= self.min && bucket_id <= self.max
    }

    /// Smallest range spanning both inputs.
    pub fn union(&self, other: &BucketRange) -> BucketRange {
        BucketRange {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

impl std::fmt::Display for BucketRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}..{}]", self.min, self.max)
    }
}

pub(crate) fn probe_i32(raw: &Value, keys: &[&str]) -> Option<i32> {
    for key in keys {
        let Some(field) = raw.get(key) else { continue };
        let parsed = match field {
            Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
            Value::String(s) => s.trim().parse::<i32>().ok(),
            _ => None,
        };
        if parsed.is_some() {
            return parsed;
        }
    }
    None
}

fn probe_u64(raw: &Value, keys: &[&str]) -> Option<u64> {
    for key in keys {
        let Some(field) = raw.get(key) else { continue };
        let parsed = match field {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        };
        if parsed.is_some() {
            return parsed;
        }
    }
    None
}

pub(crate) fn probe_f64(raw: &Value, keys: &[&str]) -> Option<f64> {
    for key in keys {
        let Some(field) = raw.get(key) else { continue };
        let parsed = match field {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        if parsed.is_some() {
            return parsed;
        }
    }
    None
}
