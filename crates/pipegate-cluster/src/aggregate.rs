//! Typed reduction of indicator values across members.
//!
//! A [`Reducer`] combines the JSON-encoded scalars reported by the members
//! of a group into one JSON-encoded scalar. Which reducer applies to which
//! indicator is a fixed compile-time table per scope; an indicator absent
//! from its table is unknown and the combiner lists the raw per-member
//! values instead of reducing them.

use pipegate_common::protocol::StatScope;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Numeric domain a reducer operates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    Float64,
    Int64,
    Uint64,
}

/// The combining operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    Sum,
    Max,
    Min,
    Avg,
}

/// A pure combining function over one numeric domain.
///
/// Scalars that fail to decode are skipped; if every scalar fails (or the
/// input is empty) the reduction yields `None`. Integral sums wrap on
/// overflow, inputs are expected to be counters well inside the domain.
/// Integral averages truncate toward zero.
///
/// ```
/// use pipegate_cluster::aggregate::{NumericKind, ReduceOp, Reducer};
///
/// let sum = Reducer::new(ReduceOp::Sum, NumericKind::Int64);
/// let values = vec![b"17".to_vec(), b"25".to_vec(), b"8".to_vec()];
/// assert_eq!(sum.reduce(&values), Some(b"50".to_vec()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reducer {
    pub op: ReduceOp,
    pub kind: NumericKind,
}

impl Reducer {
    pub const fn new(op: ReduceOp, kind: NumericKind) -> Self {
        Self { op, kind }
    }

    pub fn reduce(&self, values: &[Vec<u8>]) -> Option<Vec<u8>> {
        match self.kind {
            NumericKind::Float64 => reduce_f64(self.op, &decoded(values)),
            NumericKind::Int64 => reduce_i64(self.op, &decoded(values)),
            NumericKind::Uint64 => reduce_u64(self.op, &decoded(values)),
        }
    }
}

fn decoded<T: DeserializeOwned>(values: &[Vec<u8>]) -> Vec<T> {
    values
        .iter()
        .filter_map(|value| serde_json::from_slice(value).ok())
        .collect()
}

fn encode<T: Serialize>(value: T) -> Option<Vec<u8>> {
    serde_json::to_vec(&value).ok()
}

fn reduce_f64(op: ReduceOp, values: &[f64]) -> Option<Vec<u8>> {
    if values.is_empty() {
        return None;
    }
    let result = match op {
        ReduceOp::Sum => values.iter().sum(),
        // a NaN seed is replaced by the first value; f64::max then keeps the
        // numeric side of any NaN comparison
        ReduceOp::Max => values
            .iter()
            .fold(f64::NAN, |best, &v| if best.is_nan() { v } else { best.max(v) }),
        ReduceOp::Min => values
            .iter()
            .fold(f64::NAN, |best, &v| if best.is_nan() { v } else { best.min(v) }),
        ReduceOp::Avg => values.iter().sum::<f64>() / values.len() as f64,
    };
    encode(result)
}

fn reduce_i64(op: ReduceOp, values: &[i64]) -> Option<Vec<u8>> {
    if values.is_empty() {
        return None;
    }
    let result = match op {
        ReduceOp::Sum => wrapping_sum_i64(values),
        ReduceOp::Max => values.iter().copied().max()?,
        ReduceOp::Min => values.iter().copied().min()?,
        ReduceOp::Avg => wrapping_sum_i64(values) / values.len() as i64,
    };
    encode(result)
}

fn reduce_u64(op: ReduceOp, values: &[u64]) -> Option<Vec<u8>> {
    if values.is_empty() {
        return None;
    }
    let result = match op {
        ReduceOp::Sum => wrapping_sum_u64(values),
        ReduceOp::Max => values.iter().copied().max()?,
        ReduceOp::Min => values.iter().copied().min()?,
        ReduceOp::Avg => wrapping_sum_u64(values) / values.len() as u64,
    };
    encode(result)
}

fn wrapping_sum_i64(values: &[i64]) -> i64 {
    values.iter().fold(0i64, |sum, &v| sum.wrapping_add(v))
}

fn wrapping_sum_u64(values: &[u64]) -> u64 {
    values.iter().fold(0u64, |sum, &v| sum.wrapping_add(v))
}

const SUM_F64: Reducer = Reducer::new(ReduceOp::Sum, NumericKind::Float64);
const MAX_F64: Reducer = Reducer::new(ReduceOp::Max, NumericKind::Float64);
const SUM_I64: Reducer = Reducer::new(ReduceOp::Sum, NumericKind::Int64);
const MAX_I64: Reducer = Reducer::new(ReduceOp::Max, NumericKind::Int64);
const MIN_I64: Reducer = Reducer::new(ReduceOp::Min, NumericKind::Int64);
const SUM_U64: Reducer = Reducer::new(ReduceOp::Sum, NumericKind::Uint64);

/// Reducer of a pipeline-scoped indicator, `None` for unknown names.
///
/// Percentile, standard deviation and variance figures are per-member
/// statistics; combining them by max yields a worst-case proxy rather than
/// a true cluster percentile. Kept deliberately until proper digest merging
/// exists.
pub fn pipeline_reducer(indicator_name: &str) -> Option<Reducer> {
    let reducer = match indicator_name {
        "THROUGHPUT_RATE_LAST_1MIN_ALL"
        | "THROUGHPUT_RATE_LAST_5MIN_ALL"
        | "THROUGHPUT_RATE_LAST_15MIN_ALL" => SUM_F64,

        "EXECUTION_COUNT_ALL" => SUM_I64,
        "EXECUTION_TIME_MAX_ALL" => MAX_I64,
        "EXECUTION_TIME_MIN_ALL" => MIN_I64,

        "EXECUTION_TIME_50_PERCENT_ALL"
        | "EXECUTION_TIME_90_PERCENT_ALL"
        | "EXECUTION_TIME_99_PERCENT_ALL"
        | "EXECUTION_TIME_STD_DEV_ALL"
        | "EXECUTION_TIME_VARIANCE_ALL" => MAX_F64,

        "EXECUTION_TIME_SUM_ALL" => SUM_I64,

        _ => return None,
    };
    Some(reducer)
}

/// Reducer of a plugin-scoped indicator, `None` for unknown names.
pub fn plugin_reducer(indicator_name: &str) -> Option<Reducer> {
    let reducer = match indicator_name {
        "THROUGHPUT_RATE_LAST_1MIN_ALL"
        | "THROUGHPUT_RATE_LAST_5MIN_ALL"
        | "THROUGHPUT_RATE_LAST_15MIN_ALL"
        | "THROUGHPUT_RATE_LAST_1MIN_SUCCESS"
        | "THROUGHPUT_RATE_LAST_5MIN_SUCCESS"
        | "THROUGHPUT_RATE_LAST_15MIN_SUCCESS"
        | "THROUGHPUT_RATE_LAST_1MIN_FAILURE"
        | "THROUGHPUT_RATE_LAST_5MIN_FAILURE"
        | "THROUGHPUT_RATE_LAST_15MIN_FAILURE" => SUM_F64,

        "EXECUTION_COUNT_ALL" | "EXECUTION_COUNT_SUCCESS" | "EXECUTION_COUNT_FAILURE" => SUM_I64,

        "EXECUTION_TIME_MAX_ALL" | "EXECUTION_TIME_MAX_SUCCESS" | "EXECUTION_TIME_MAX_FAILURE" => {
            MAX_I64
        }
        "EXECUTION_TIME_MIN_ALL" | "EXECUTION_TIME_MIN_SUCCESS" | "EXECUTION_TIME_MIN_FAILURE" => {
            MIN_I64
        }

        "EXECUTION_TIME_50_PERCENT_SUCCESS"
        | "EXECUTION_TIME_50_PERCENT_FAILURE"
        | "EXECUTION_TIME_90_PERCENT_SUCCESS"
        | "EXECUTION_TIME_90_PERCENT_FAILURE"
        | "EXECUTION_TIME_99_PERCENT_SUCCESS"
        | "EXECUTION_TIME_99_PERCENT_FAILURE"
        | "EXECUTION_TIME_STD_DEV_SUCCESS"
        | "EXECUTION_TIME_STD_DEV_FAILURE"
        | "EXECUTION_TIME_VARIANCE_SUCCESS"
        | "EXECUTION_TIME_VARIANCE_FAILURE" => MAX_F64,

        "EXECUTION_TIME_SUM_ALL" | "EXECUTION_TIME_SUM_SUCCESS" | "EXECUTION_TIME_SUM_FAILURE" => {
            SUM_I64
        }

        // plugin dedicated indicators
        "WAIT_QUEUE_LENGTH" | "WIP_REQUEST_COUNT" | "RECENT_HEADER_COUNT" => SUM_U64,

        _ => return None,
    };
    Some(reducer)
}

/// Reducer of a task-scoped indicator, `None` for unknown names.
pub fn task_reducer(indicator_name: &str) -> Option<Reducer> {
    let reducer = match indicator_name {
        "EXECUTION_COUNT_ALL" | "EXECUTION_COUNT_SUCCESS" | "EXECUTION_COUNT_FAILURE" => SUM_U64,
        _ => return None,
    };
    Some(reducer)
}

/// Catalog lookup by scope and indicator name.
pub fn reducer_for(scope: StatScope, indicator_name: &str) -> Option<Reducer> {
    match scope {
        StatScope::Pipeline => pipeline_reducer(indicator_name),
        StatScope::Plugin => plugin_reducer(indicator_name),
        StatScope::Task => task_reducer(indicator_name),
    }
}
