use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::{ClusterError, Result};

/// The level a statistics question is asked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatScope {
    Pipeline,
    Plugin,
    Task,
}

/// What a statistics question asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatFacet {
    /// The set of indicator names known at the scope.
    Names,
    /// One indicator's numeric value.
    Value,
    /// One indicator's human-readable description.
    Desc,
}

/// The filter of a statistics query: one of nine variants, three scopes by
/// three facets, each carrying exactly the selectors that scope and facet
/// require.
///
/// The serde representation is externally tagged, so a JSON request is a flat
/// object with exactly one variant key present:
///
/// ```
/// use pipegate_common::protocol::StatFilter;
///
/// let filter: StatFilter = serde_json::from_str(
///     r#"{"PluginIndicatorValue": {
///         "pipeline_name": "ingest",
///         "plugin_name": "http_input",
///         "indicator_name": "WAIT_QUEUE_LENGTH"
///     }}"#,
/// ).unwrap();
/// assert_eq!(filter.pipeline_name(), "ingest");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatFilter {
    PipelineIndicatorNames {
        pipeline_name: String,
    },
    PipelineIndicatorValue {
        pipeline_name: String,
        indicator_name: String,
    },
    PipelineIndicatorDesc {
        pipeline_name: String,
        indicator_name: String,
    },
    PluginIndicatorNames {
        pipeline_name: String,
        plugin_name: String,
    },
    PluginIndicatorValue {
        pipeline_name: String,
        plugin_name: String,
        indicator_name: String,
    },
    PluginIndicatorDesc {
        pipeline_name: String,
        plugin_name: String,
        indicator_name: String,
    },
    TaskIndicatorNames {
        pipeline_name: String,
    },
    TaskIndicatorValue {
        pipeline_name: String,
        indicator_name: String,
    },
    TaskIndicatorDesc {
        pipeline_name: String,
        indicator_name: String,
    },
}

impl StatFilter {
    pub fn scope(&self) -> StatScope {
        match self {
            StatFilter::PipelineIndicatorNames { .. }
            | StatFilter::PipelineIndicatorValue { .. }
            | StatFilter::PipelineIndicatorDesc { .. } => StatScope::Pipeline,
            StatFilter::PluginIndicatorNames { .. }
            | StatFilter::PluginIndicatorValue { .. }
            | StatFilter::PluginIndicatorDesc { .. } => StatScope::Plugin,
            StatFilter::TaskIndicatorNames { .. }
            | StatFilter::TaskIndicatorValue { .. }
            | StatFilter::TaskIndicatorDesc { .. } => StatScope::Task,
        }
    }

    pub fn facet(&self) -> StatFacet {
        match self {
            StatFilter::PipelineIndicatorNames { .. }
            | StatFilter::PluginIndicatorNames { .. }
            | StatFilter::TaskIndicatorNames { .. } => StatFacet::Names,
            StatFilter::PipelineIndicatorValue { .. }
            | StatFilter::PluginIndicatorValue { .. }
            | StatFilter::TaskIndicatorValue { .. } => StatFacet::Value,
            StatFilter::PipelineIndicatorDesc { .. }
            | StatFilter::PluginIndicatorDesc { .. }
            | StatFilter::TaskIndicatorDesc { .. } => StatFacet::Desc,
        }
    }

    /// The pipeline selector, present on every variant.
    pub fn pipeline_name(&self) -> &str {
        match self {
            StatFilter::PipelineIndicatorNames { pipeline_name }
            | StatFilter::PipelineIndicatorValue { pipeline_name, .. }
            | StatFilter::PipelineIndicatorDesc { pipeline_name, .. }
            | StatFilter::PluginIndicatorNames { pipeline_name, .. }
            | StatFilter::PluginIndicatorValue { pipeline_name, .. }
            | StatFilter::PluginIndicatorDesc { pipeline_name, .. }
            | StatFilter::TaskIndicatorNames { pipeline_name }
            | StatFilter::TaskIndicatorValue { pipeline_name, .. }
            | StatFilter::TaskIndicatorDesc { pipeline_name, .. } => pipeline_name,
        }
    }

    /// The plugin selector, present only on plugin-scoped variants.
    pub fn plugin_name(&self) -> Option<&str> {
        match self {
            StatFilter::PluginIndicatorNames { plugin_name, .. }
            | StatFilter::PluginIndicatorValue { plugin_name, .. }
            | StatFilter::PluginIndicatorDesc { plugin_name, .. } => Some(plugin_name),
            _ => None,
        }
    }

    /// The indicator selector, present on value and description variants.
    pub fn indicator_name(&self) -> Option<&str> {
        match self {
            StatFilter::PipelineIndicatorValue { indicator_name, .. }
            | StatFilter::PipelineIndicatorDesc { indicator_name, .. }
            | StatFilter::PluginIndicatorValue { indicator_name, .. }
            | StatFilter::PluginIndicatorDesc { indicator_name, .. }
            | StatFilter::TaskIndicatorValue { indicator_name, .. }
            | StatFilter::TaskIndicatorDesc { indicator_name, .. } => Some(indicator_name),
            _ => None,
        }
    }

    /// Checks that every selector the variant requires is non-empty.
    pub fn validate(&self) -> Result<()> {
        let context = self.context();
        require(self.pipeline_name(), "pipeline name", context)?;
        if let Some(plugin_name) = self.plugin_name() {
            require(plugin_name, "plugin name", context)?;
        }
        if let Some(indicator_name) = self.indicator_name() {
            require(indicator_name, "indicator name", context)?;
        }
        Ok(())
    }

    fn context(&self) -> &'static str {
        match (self.scope(), self.facet()) {
            (StatScope::Pipeline, StatFacet::Names) => "pipeline statistics indicator names",
            (StatScope::Pipeline, StatFacet::Value) => "pipeline statistics indicator value",
            (StatScope::Pipeline, StatFacet::Desc) => "pipeline statistics indicator description",
            (StatScope::Plugin, StatFacet::Names) => "plugin statistics indicator names",
            (StatScope::Plugin, StatFacet::Value) => "plugin statistics indicator value",
            (StatScope::Plugin, StatFacet::Desc) => "plugin statistics indicator description",
            (StatScope::Task, StatFacet::Names) => "task statistics indicator names",
            (StatScope::Task, StatFacet::Value) => "task statistics indicator value",
            (StatScope::Task, StatFacet::Desc) => "task statistics indicator description",
        }
    }
}

fn require(value: &str, what: &str, context: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ClusterError::wrong_format(format!(
            "empty {} in filter to retrieve {}",
            what, context
        )));
    }
    Ok(())
}

/// A statistics question addressed to the whole group.
///
/// The timeout bounds the entire two-hop exchange: the entry member copies it
/// into the relay fan-out and stops collecting when it expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatQuery {
    pub filter: StatFilter,
    pub timeout: Duration,
}

impl StatQuery {
    pub fn new(filter: StatFilter, timeout: Duration) -> Self {
        Self { filter, timeout }
    }

    /// Validates the filter selectors and the deadline.
    ///
    /// A zero timeout is rejected: it would expire the fan-out before any
    /// peer could answer.
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(ClusterError::wrong_format(
                "non-positive timeout in statistics query",
            ));
        }
        self.filter.validate()
    }
}
