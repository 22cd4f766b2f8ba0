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

use crate::indicator::{Indicator, IndicatorValue};
use std::collections::HashMap;
use std::sync::{Arc, RwLock as StdRwLock};
use thiserror::Error;

/// Failure reading an indicator from a pipeline's statistics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatsError {
    #[error("unknown indicator {0}")]
    UnknownIndicator(String),

    #[error("unknown plugin {0}")]
    UnknownPlugin(String),
}

type IndicatorTable = HashMap<String, Arc<Indicator>>;

/// Statistics of one pipeline: indicator tables at pipeline, plugin and task
/// scope.
///
/// Name listings come back sorted, so every member of a group answers a
/// names query with the same order for the same configuration.
#[derive(Debug, Default)]
pub struct PipelineStats {
    pipeline: StdRwLock<IndicatorTable>,
    plugins: StdRwLock<HashMap<String, IndicatorTable>>,
    task: StdRwLock<IndicatorTable>,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a pipeline-scoped indicator.
    pub fn register_pipeline_indicator(&self, name: impl Into<String>, indicator: Indicator) {
        self.pipeline
            .write()
            .unwrap()
            .insert(name.into(), Arc::new(indicator));
    }

    /// Registers (or replaces) an indicator of one plugin.
    pub fn register_plugin_indicator(
        &self,
        plugin_name: impl Into<String>,
        name: impl Into<String>,
        indicator: Indicator,
    ) {
        self.plugins
            .write()
            .unwrap()
            .entry(plugin_name.into())
            .or_default()
            .insert(name.into(), Arc::new(indicator));
    }

    /// Registers (or replaces) a task-scoped indicator.
    pub fn register_task_indicator(&self, name: impl Into<String>, indicator: Indicator) {
        self.task
            .write()
            .unwrap()
            .insert(name.into(), Arc::new(indicator));
    }

    /// Handle to a pipeline-scoped indicator, for engine-side updates.
    pub fn pipeline_indicator(&self, name: &str) -> Option<Arc<Indicator>> {
        self.pipeline.read().unwrap().get(name).cloned()
    }

    /// Handle to a plugin-scoped indicator, for engine-side updates.
    pub fn plugin_indicator(&self, plugin_name: &str, name: &str) -> Option<Arc<Indicator>> {
        self.plugins
            .read()
            .unwrap()
            .get(plugin_name)
            .and_then(|table| table.get(name))
            .cloned()
    }

    /// Handle to a task-scoped indicator, for engine-side updates.
    pub fn task_indicator(&self, name: &str) -> Option<Arc<Indicator>> {
        self.task.read().unwrap().get(name).cloned()
    }

    pub fn pipeline_indicator_names(&self) -> Vec<String> {
        sorted_names(&self.pipeline.read().unwrap())
    }

    pub fn pipeline_indicator_value(&self, name: &str) -> Result<IndicatorValue, StatsError> {
        self.pipeline
            .read()
            .unwrap()
            .get(name)
            .map(|indicator| indicator.value())
            .ok_or_else(|| StatsError::UnknownIndicator(name.to_string()))
    }

    pub fn pipeline_indicator_description(&self, name: &str) -> Result<String, StatsError> {
        self.pipeline
            .read()
            .unwrap()
            .get(name)
            .map(|indicator| indicator.description().to_string())
            .ok_or_else(|| StatsError::UnknownIndicator(name.to_string()))
    }

    pub fn plugin_indicator_names(&self, plugin_name: &str) -> Vec<String> {
        self.plugins
            .read()
            .unwrap()
            .get(plugin_name)
            .map(sorted_names)
            .unwrap_or_default()
    }

    pub fn plugin_indicator_value(
        &self,
        plugin_name: &str,
        name: &str,
    ) -> Result<IndicatorValue, StatsError> {
        let plugins = self.plugins.read().unwrap();
        let table = plugins
            .get(plugin_name)
            .ok_or_else(|| StatsError::UnknownPlugin(plugin_name.to_string()))?;
        table
            .get(name)
            .map(|indicator| indicator.value())
            .ok_or_else(|| StatsError::UnknownIndicator(name.to_string()))
    }

    pub fn plugin_indicator_description(
        &self,
        plugin_name: &str,
        name: &str,
    ) -> Result<String, StatsError> {
        let plugins = self.plugins.read().unwrap();
        let table = plugins
            .get(plugin_name)
            .ok_or_else(|| StatsError::UnknownPlugin(plugin_name.to_string()))?;
        table
            .get(name)
            .map(|indicator| indicator.description().to_string())
            .ok_or_else(|| StatsError::UnknownIndicator(name.to_string()))
    }

    pub fn task_indicator_names(&self) -> Vec<String> {
        sorted_names(&self.task.read().unwrap())
    }

    pub fn task_indicator_value(&self, name: &str) -> Result<IndicatorValue, StatsError> {
        self.task
            .read()
            .unwrap()
            .get(name)
            .map(|indicator| indicator.value())
            .ok_or_else(|| StatsError::UnknownIndicator(name.to_string()))
    }

    pub fn task_indicator_description(&self, name: &str) -> Result<String, StatsError> {
        self.task
            .read()
            .unwrap()
            .get(name)
            .map(|indicator| indicator.description().to_string())
            .ok_or_else(|| StatsError::UnknownIndicator(name.to_string()))
    }
}

fn sorted_names(table: &IndicatorTable) -> Vec<String> {
    let mut names: Vec<String> = table.keys().cloned().collect();
    names.sort();
    names
}

/// Read seam used by the aggregation layer.
///
/// A missing pipeline is `None`; the caller maps it to its own not-found
/// error.
pub trait StatRegistry: Send + Sync {
    fn pipeline_stats(&self, pipeline_name: &str) -> Option<Arc<PipelineStats>>;
}

/// Process-wide store of per-pipeline statistics.
///
/// The execution engine registers a pipeline when it is spawned and
/// deregisters it when it is deleted; the aggregation layer only reads.
#[derive(Debug, Default)]
pub struct PipelineStatsRegistry {
    pipelines: StdRwLock<HashMap<String, Arc<PipelineStats>>>,
}

impl PipelineStatsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates and stores the statistics record of a pipeline, returning the
    /// shared handle. Registering an existing name returns the existing
    /// record unchanged.
    pub fn register_pipeline(&self, pipeline_name: impl Into<String>) -> Arc<PipelineStats> {
        self.pipelines
            .write()
            .unwrap()
            .entry(pipeline_name.into())
            .or_insert_with(|| Arc::new(PipelineStats::new()))
            .clone()
    }

    pub fn deregister_pipeline(&self, pipeline_name: &str) -> bool {
        self.pipelines
            .write()
            .unwrap()
            .remove(pipeline_name)
            .is_some()
    }

    pub fn pipeline_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.pipelines.read().unwrap().keys().cloned().collect();
        names.sort();
        names
    }
}

impl StatRegistry for PipelineStatsRegistry {
    fn pipeline_stats(&self, pipeline_name: &str) -> Option<Arc<PipelineStats>> {
        self.pipelines.read().unwrap().get(pipeline_name).cloned()
    }
}
