//! Aggregators: per-group accumulators with incremental fold and finalize.

use hashbrown::HashSet;
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use tabula_core::{Error, Result, Value};

/// A per-group accumulator.
///
/// `add_value` is called once per row of the group, in stream order; `result` is
/// called exactly once after the scan.
pub trait Aggregator {
    /// Folds one value into the accumulator.
    fn add_value(&mut self, value: &Value);

    /// Finalized result.
    fn result(&self) -> Result<Value>;
}

/// Numeric reading of a value shared by `Sum`, `Mean` and `Percentile`.
///
/// `true` reads as 1 and `false` as 0. Strings of digits (with an optional leading
/// minus) read as integers, other strings that parse as a finite float read as
/// floats. Everything else, including the empty string, is ignored.
pub(crate) fn numeric(value: &Value) -> Option<Value> {
    match value {
        Value::Boolean(b) => Some(Value::Int64(*b as i64)),
        Value::Int64(_) | Value::Float64(_) => Some(value.clone()),
        Value::String(s) => {
            let digits = s.strip_prefix('-').unwrap_or(s);
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                match s.parse::<i64>() {
                    Ok(i) => Some(Value::Int64(i)),
                    Err(_) => s.parse::<f64>().ok().map(Value::Float64),
                }
            } else {
                match s.trim().parse::<f64>() {
                    Ok(f) if f.is_finite() && !s.trim().is_empty() => Some(Value::Float64(f)),
                    _ => None,
                }
            }
        }
        _ => None,
    }
}

/// Running total that stays integral until a float (or an overflow) shows up.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Total {
    Int(i64),
    Float(f64),
}

impl Total {
    fn add(self, value: &Value) -> Total {
        match (self, value) {
            (Total::Int(a), Value::Int64(b)) => match a.checked_add(*b) {
                Some(sum) => Total::Int(sum),
                None => Total::Float(a as f64 + *b as f64),
            },
            (Total::Int(a), Value::Float64(b)) => Total::Float(a as f64 + b),
            (Total::Float(a), Value::Int64(b)) => Total::Float(a + *b as f64),
            (Total::Float(a), Value::Float64(b)) => Total::Float(a + b),
            (total, _) => total,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Total::Int(i) => i as f64,
            Total::Float(f) => f,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Total::Int(i) => Value::Int64(i),
            Total::Float(f) => Value::Float64(f),
        }
    }
}

/// Sum of the numeric reading of every value. Starts at 0.
#[derive(Clone, Debug)]
pub struct Sum {
    total: Total,
}

impl Sum {
    pub fn new() -> Self {
        Self {
            total: Total::Int(0),
        }
    }
}

impl Default for Sum {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator for Sum {
    fn add_value(&mut self, value: &Value) {
        if let Some(n) = numeric(value) {
            self.total = self.total.add(&n);
        }
    }

    fn result(&self) -> Result<Value> {
        Ok(self.total.into_value())
    }
}

/// Arithmetic mean: the `Sum` total divided by the number of non-null values.
#[derive(Clone, Debug)]
pub struct Mean {
    total: Total,
    count: usize,
}

impl Mean {
    pub fn new() -> Self {
        Self {
            total: Total::Int(0),
            count: 0,
        }
    }
}

impl Default for Mean {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator for Mean {
    fn add_value(&mut self, value: &Value) {
        if value.is_null() {
            return;
        }
        self.count += 1;
        if let Some(n) = numeric(value) {
            self.total = self.total.add(&n);
        }
    }

    fn result(&self) -> Result<Value> {
        if self.count == 0 {
            return Err(Error::empty_aggregate("mean"));
        }
        Ok(Value::Float64(self.total.as_f64() / self.count as f64))
    }
}

/// Ordering used by `Min` and `Max`.
///
/// Null is below everything. A boolean is above every non-boolean, for both
/// aggregates. Everything else follows the natural value ordering.
pub fn extreme_cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
        (Value::Boolean(_), _) => Ordering::Greater,
        (_, Value::Boolean(_)) => Ordering::Less,
        _ => a.cmp(b),
    }
}

/// Smallest value under `extreme_cmp`; `Null` when nothing was added.
#[derive(Clone, Debug, Default)]
pub struct Min {
    current: Option<Value>,
}

impl Min {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Aggregator for Min {
    fn add_value(&mut self, value: &Value) {
        let replace = match &self.current {
            None => true,
            Some(current) => extreme_cmp(value, current) == Ordering::Less,
        };
        if replace {
            self.current = Some(value.clone());
        }
    }

    fn result(&self) -> Result<Value> {
        Ok(self.current.clone().unwrap_or(Value::Null))
    }
}

/// Largest value under `extreme_cmp`; `Null` when nothing was added.
#[derive(Clone, Debug, Default)]
pub struct Max {
    current: Option<Value>,
}

impl Max {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Aggregator for Max {
    fn add_value(&mut self, value: &Value) {
        let replace = match &self.current {
            None => true,
            Some(current) => extreme_cmp(value, current) == Ordering::Greater,
        };
        if replace {
            self.current = Some(value.clone());
        }
    }

    fn result(&self) -> Result<Value> {
        Ok(self.current.clone().unwrap_or(Value::Null))
    }
}

/// First non-null value.
#[derive(Clone, Debug, Default)]
pub struct First {
    value: Option<Value>,
}

impl First {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Aggregator for First {
    fn add_value(&mut self, value: &Value) {
        if self.value.is_none() && !value.is_null() {
            self.value = Some(value.clone());
        }
    }

    fn result(&self) -> Result<Value> {
        Ok(self.value.clone().unwrap_or(Value::Null))
    }
}

/// Number of non-null values.
#[derive(Clone, Debug, Default)]
pub struct Count {
    count: i64,
}

impl Count {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Aggregator for Count {
    fn add_value(&mut self, value: &Value) {
        if !value.is_null() {
            self.count += 1;
        }
    }

    fn result(&self) -> Result<Value> {
        Ok(Value::Int64(self.count))
    }
}

/// Strings and byte strings longer than this many bits are kept as a digest.
pub const DEFAULT_DISTINCT_THRESHOLD_BITS: usize = 256;

/// Exact-value key for short scalars.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum ScalarKey {
    Int(i64),
    Str(String),
    Bytes(Vec<u8>),
}

/// Counts distinct values across a heterogeneous stream.
///
/// Values fall into five buckets, each deduplicated on its own terms:
///
/// - booleans: `true` and `false` each count at most once
/// - objects: by identity
/// - floats: by value (`-0.0` equals `0.0`, all NaNs are one value)
/// - short scalars: integers and strings by exact value; a string spelling a
///   canonical decimal integer (`"1"`, `"-20"`, not `"01"`) is the same key as that
///   integer
/// - long strings and byte strings: by SHA-256 digest of their content
///
/// `Null` is never counted. The result is the sum of the bucket sizes.
#[derive(Clone, Debug)]
pub struct CountDistinctValues {
    threshold_bits: usize,
    seen_true: bool,
    seen_false: bool,
    objects: HashSet<usize>,
    floats: HashSet<u64>,
    scalars: HashSet<ScalarKey>,
    digests: HashSet<[u8; 32]>,
}

impl CountDistinctValues {
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_DISTINCT_THRESHOLD_BITS)
    }

    /// Uses `threshold_bits` as the long-string cutoff.
    pub fn with_threshold(threshold_bits: usize) -> Self {
        Self {
            threshold_bits,
            seen_true: false,
            seen_false: false,
            objects: HashSet::new(),
            floats: HashSet::new(),
            scalars: HashSet::new(),
            digests: HashSet::new(),
        }
    }

    fn is_long(&self, len: usize) -> bool {
        len.saturating_mul(8) > self.threshold_bits
    }

    fn digest(tag: u8, content: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update([tag]);
        hasher.update(content);
        hasher.finalize().into()
    }

    fn count(&self) -> usize {
        self.seen_true as usize
            + self.seen_false as usize
            + self.objects.len()
            + self.floats.len()
            + self.scalars.len()
            + self.digests.len()
    }
}

impl Default for CountDistinctValues {
    fn default() -> Self {
        Self::new()
    }
}

/// Integer spelled by `s` in canonical decimal form, if any.
fn canonical_int(s: &str) -> Option<i64> {
    let i = s.parse::<i64>().ok()?;
    if i.to_string() == s {
        Some(i)
    } else {
        None
    }
}

impl Aggregator for CountDistinctValues {
    fn add_value(&mut self, value: &Value) {
        match value {
            Value::Null => {}
            Value::Boolean(true) => self.seen_true = true,
            Value::Boolean(false) => self.seen_false = true,
            Value::Object(o) => {
                self.objects.insert(o.addr());
            }
            Value::Float64(f) => {
                let bits = if *f == 0.0 {
                    0.0f64.to_bits()
                } else if f.is_nan() {
                    f64::NAN.to_bits()
                } else {
                    f.to_bits()
                };
                self.floats.insert(bits);
            }
            Value::Int64(i) => {
                self.scalars.insert(ScalarKey::Int(*i));
            }
            Value::String(s) => {
                if let Some(i) = canonical_int(s) {
                    self.scalars.insert(ScalarKey::Int(i));
                } else if self.is_long(s.len()) {
                    self.digests.insert(Self::digest(b's', s.as_bytes()));
                } else {
                    self.scalars.insert(ScalarKey::Str(s.clone()));
                }
            }
            Value::Bytes(b) => {
                if self.is_long(b.len()) {
                    self.digests.insert(Self::digest(b'b', b));
                } else {
                    self.scalars.insert(ScalarKey::Bytes(b.clone()));
                }
            }
        }
    }

    fn result(&self) -> Result<Value> {
        Ok(Value::Int64(self.count() as i64))
    }
}

/// Nearest-rank percentile over the numeric reading of the values.
#[derive(Clone, Debug)]
pub struct Percentile {
    percent: f64,
    values: Vec<Value>,
}

impl Percentile {
    /// `percent` must lie in `[0, 100]`.
    pub fn new(percent: f64) -> Result<Self> {
        if !(0.0..=100.0).contains(&percent) {
            return Err(Error::invalid_argument(format!(
                "percentile must be within [0, 100], got {}",
                percent
            )));
        }
        Ok(Self {
            percent,
            values: Vec::new(),
        })
    }
}

impl Aggregator for Percentile {
    fn add_value(&mut self, value: &Value) {
        if let Some(n) = numeric(value) {
            self.values.push(n);
        }
    }

    fn result(&self) -> Result<Value> {
        if self.values.is_empty() {
            return Err(Error::empty_aggregate("percentile"));
        }
        let mut sorted = self.values.clone();
        sorted.sort();
        let n = sorted.len();
        let rank = ((self.percent / 100.0) * n as f64).ceil() as usize;
        let index = rank.clamp(1, n) - 1;
        Ok(sorted[index].clone())
    }
}
