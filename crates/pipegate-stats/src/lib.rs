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

//! Pipegate Local Statistics Registry
//!
//! This crate holds the per-node statistics state the cluster aggregation
//! layer reads from. Each pipeline owns a [`PipelineStats`] record exposing
//! numeric indicators at three scopes:
//!
//! - **Pipeline**: figures describing the pipeline as a whole
//! - **Plugin**: figures for one named stage inside the pipeline
//! - **Task**: figures for end-to-end execution units flowing through it
//!
//! The execution engine registers indicators at startup and updates their
//! values with atomic operations on the hot path; the aggregation layer only
//! ever reads. Reads and engine updates may race freely, an indicator value
//! is a single atomic cell.
//!
//! # Usage Example
//!
//! ```
//! use pipegate_stats::{Indicator, IndicatorValue, PipelineStatsRegistry, StatRegistry};
//!
//! let registry = PipelineStatsRegistry::new();
//! let stats = registry.register_pipeline("ingest");
//!
//! stats.register_pipeline_indicator(
//!     "EXECUTION_COUNT_ALL",
//!     Indicator::int64("total executions of the pipeline"),
//! );
//! stats
//!     .pipeline_indicator("EXECUTION_COUNT_ALL")
//!     .unwrap()
//!     .set(IndicatorValue::Int64(17));
//!
//! let value = registry
//!     .pipeline_stats("ingest")
//!     .unwrap()
//!     .pipeline_indicator_value("EXECUTION_COUNT_ALL")
//!     .unwrap();
//! assert_eq!(value, IndicatorValue::Int64(17));
//! ```

mod indicator;
mod registry;

pub use indicator::{Indicator, IndicatorValue};
pub use registry::{PipelineStats, PipelineStatsRegistry, StatRegistry, StatsError};
