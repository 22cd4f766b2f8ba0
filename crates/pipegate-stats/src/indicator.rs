// Copyright 2025 Pipegate Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// One observed indicator value, typed by its numeric domain.
///
/// Serializes untagged, so a value appears as a bare JSON number inside the
/// `{"Value": ...}` sub-blob the aggregation layer ships between members.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndicatorValue {
    Int64(i64),
    Uint64(u64),
    Float64(f64),
}

/// Storage cell of an indicator, matching its numeric domain.
///
/// Floats are stored as raw bits in an `AtomicU64`.
#[derive(Debug)]
enum Cell {
    Float64(AtomicU64),
    Int64(AtomicI64),
    Uint64(AtomicU64),
}

/// A named measurement: a human-readable description plus a live value the
/// execution engine updates atomically.
#[derive(Debug)]
pub struct Indicator {
    description: String,
    cell: Cell,
}

impl Indicator {
    pub fn float64(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            cell: Cell::Float64(AtomicU64::new(0f64.to_bits())),
        }
    }

    pub fn int64(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            cell: Cell::Int64(AtomicI64::new(0)),
        }
    }

    pub fn uint64(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            cell: Cell::Uint64(AtomicU64::new(0)),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn value(&self) -> IndicatorValue {
        match &self.cell {
            Cell::Float64(bits) => IndicatorValue::Float64(f64::from_bits(bits.load(Ordering::Relaxed))),
            Cell::Int64(cell) => IndicatorValue::Int64(cell.load(Ordering::Relaxed)),
            Cell::Uint64(cell) => IndicatorValue::Uint64(cell.load(Ordering::Relaxed)),
        }
    }

    /// Stores a new value. Returns `false` when the value's domain does not
    /// match the indicator's cell; the stored value is left untouched.
    pub fn set(&self, value: IndicatorValue) -> bool {
        match (&self.cell, value) {
            (Cell::Float64(bits), IndicatorValue::Float64(v)) => {
                bits.store(v.to_bits(), Ordering::Relaxed);
                true
            }
            (Cell::Int64(cell), IndicatorValue::Int64(v)) => {
                cell.store(v, Ordering::Relaxed);
                true
            }
            (Cell::Uint64(cell), IndicatorValue::Uint64(v)) => {
                cell.store(v, Ordering::Relaxed);
                true
            }
            _ => false,
        }
    }

    /// Adds a delta to the current value. Integral cells wrap on overflow.
    /// Returns `false` on a domain mismatch.
    pub fn add(&self, delta: IndicatorValue) -> bool {
        match (&self.cell, delta) {
            (Cell::Float64(bits), IndicatorValue::Float64(d)) => {
                let mut current = bits.load(Ordering::Relaxed);
                loop {
                    let next = (f64::from_bits(current) + d).to_bits();
                    match bits.compare_exchange_weak(
                        current,
                        next,
                        Ordering::Relaxed,
                        Ordering::Relaxed,
                    ) {
                        Ok(_) => return true,
                        Err(observed) => current = observed,
                    }
                }
            }
            (Cell::Int64(cell), IndicatorValue::Int64(d)) => {
                cell.fetch_add(d, Ordering::Relaxed);
                true
            }
            (Cell::Uint64(cell), IndicatorValue::Uint64(d)) => {
                cell.fetch_add(d, Ordering::Relaxed);
                true
            }
            _ => false,
        }
    }
}
