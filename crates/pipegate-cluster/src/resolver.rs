//! Answering a statistics query from the local registry.
//!
//! Every member, entry point or relay target, resolves the same query the
//! same way: read the pipeline's statistics, pick the scope and facet the
//! filter names, and encode one partial response. Failures become typed
//! cluster errors; the caller decides whether to surface or drop them.

use tracing::{error, warn};

use pipegate_common::protocol::{
    ClusterError, ClusterErrorKind, DescResult, NamesResult, Result, StatFilter, StatQuery,
    StatResponse, ValueResult,
};
use pipegate_stats::{IndicatorValue, StatRegistry};

/// Resolves a validated query against the local registry into one partial
/// response.
pub fn resolve_local_stat(registry: &dyn StatRegistry, query: &StatQuery) -> Result<StatResponse> {
    let filter = &query.filter;
    let pipeline_name = filter.pipeline_name();

    let stats = registry.pipeline_stats(pipeline_name).ok_or_else(|| {
        ClusterError::new(
            ClusterErrorKind::PipelineStatNotFound,
            format!("pipeline {} statistics not found", pipeline_name),
        )
    })?;

    match filter {
        StatFilter::PipelineIndicatorNames { .. } => encode_names(stats.pipeline_indicator_names()),

        StatFilter::PipelineIndicatorValue { indicator_name, .. } => {
            let value = stats.pipeline_indicator_value(indicator_name).map_err(|e| {
                warn!(
                    "retrieving the value of pipeline {} indicator {} failed: {}",
                    pipeline_name, indicator_name, e
                );
                ClusterError::new(ClusterErrorKind::RetrievePipelineStatValue, e.to_string())
            })?;
            encode_value(value)
        }

        StatFilter::PipelineIndicatorDesc { indicator_name, .. } => {
            let desc = stats
                .pipeline_indicator_description(indicator_name)
                .map_err(|e| {
                    warn!(
                        "retrieving the description of pipeline {} indicator {} failed: {}",
                        pipeline_name, indicator_name, e
                    );
                    ClusterError::new(ClusterErrorKind::RetrievePipelineStatDesc, e.to_string())
                })?;
            encode_desc(desc)
        }

        StatFilter::PluginIndicatorNames { plugin_name, .. } => {
            encode_names(stats.plugin_indicator_names(plugin_name))
        }

        StatFilter::PluginIndicatorValue {
            plugin_name,
            indicator_name,
            ..
        } => {
            let value = stats
                .plugin_indicator_value(plugin_name, indicator_name)
                .map_err(|e| {
                    warn!(
                        "retrieving the value of plugin {} indicator {} in pipeline {} failed: {}",
                        plugin_name, indicator_name, pipeline_name, e
                    );
                    ClusterError::new(ClusterErrorKind::RetrievePluginStatValue, e.to_string())
                })?;
            encode_value(value)
        }

        StatFilter::PluginIndicatorDesc {
            plugin_name,
            indicator_name,
            ..
        } => {
            let desc = stats
                .plugin_indicator_description(plugin_name, indicator_name)
                .map_err(|e| {
                    warn!(
                        "retrieving the description of plugin {} indicator {} in pipeline {} failed: {}",
                        plugin_name, indicator_name, pipeline_name, e
                    );
                    ClusterError::new(ClusterErrorKind::RetrievePluginStatDesc, e.to_string())
                })?;
            encode_desc(desc)
        }

        StatFilter::TaskIndicatorNames { .. } => encode_names(stats.task_indicator_names()),

        StatFilter::TaskIndicatorValue { indicator_name, .. } => {
            let value = stats.task_indicator_value(indicator_name).map_err(|e| {
                warn!(
                    "retrieving the value of task indicator {} in pipeline {} failed: {}",
                    indicator_name, pipeline_name, e
                );
                ClusterError::new(ClusterErrorKind::RetrieveTaskStatValue, e.to_string())
            })?;
            encode_value(value)
        }

        StatFilter::TaskIndicatorDesc { indicator_name, .. } => {
            let desc = stats.task_indicator_description(indicator_name).map_err(|e| {
                warn!(
                    "retrieving the description of task indicator {} in pipeline {} failed: {}",
                    indicator_name, pipeline_name, e
                );
                ClusterError::new(ClusterErrorKind::RetrieveTaskStatDesc, e.to_string())
            })?;
            encode_desc(desc)
        }
    }
}

fn encode_names(names: Vec<String>) -> Result<StatResponse> {
    let blob = serde_json::to_vec(&NamesResult { names }).map_err(marshal_failure)?;
    Ok(StatResponse::names(blob))
}

fn encode_value(value: IndicatorValue) -> Result<StatResponse> {
    let value = serde_json::to_value(value).map_err(marshal_failure)?;
    let blob = serde_json::to_vec(&ValueResult { value }).map_err(marshal_failure)?;
    Ok(StatResponse::value(blob))
}

fn encode_desc(desc: String) -> Result<StatResponse> {
    let blob = serde_json::to_vec(&DescResult { desc }).map_err(marshal_failure)?;
    Ok(StatResponse::desc(blob))
}

fn marshal_failure(e: serde_json::Error) -> ClusterError {
    error!("BUG: marshal statistics result failed: {}", e);
    ClusterError::internal(format!("marshal statistics result failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipegate_stats::{Indicator, PipelineStatsRegistry};
    use serde_json::json;
    use std::time::Duration;

    fn sample_registry() -> PipelineStatsRegistry {
        let registry = PipelineStatsRegistry::new();
        let stats = registry.register_pipeline("ingest");
        stats.register_pipeline_indicator(
            "EXECUTION_COUNT_ALL",
            Indicator::int64("total executions of the pipeline"),
        );
        stats
            .pipeline_indicator("EXECUTION_COUNT_ALL")
            .unwrap()
            .set(IndicatorValue::Int64(17));
        stats.register_plugin_indicator(
            "http_input",
            "WAIT_QUEUE_LENGTH",
            Indicator::uint64("requests waiting in the input queue"),
        );
        stats.register_task_indicator("EXECUTION_COUNT_SUCCESS", Indicator::uint64("successes"));
        registry
    }

    fn query(filter: StatFilter) -> StatQuery {
        StatQuery::new(filter, Duration::from_secs(5))
    }

    #[test]
    fn test_missing_pipeline_is_not_found() {
        let registry = sample_registry();
        let err = resolve_local_stat(
            &registry,
            &query(StatFilter::PipelineIndicatorNames {
                pipeline_name: "nope".to_string(),
            }),
        )
        .unwrap_err();
        assert_eq!(err.kind, ClusterErrorKind::PipelineStatNotFound);
    }

    #[test]
    fn test_pipeline_names_blob() {
        let registry = sample_registry();
        let resp = resolve_local_stat(
            &registry,
            &query(StatFilter::PipelineIndicatorNames {
                pipeline_name: "ingest".to_string(),
            }),
        )
        .unwrap();
        let decoded: NamesResult = serde_json::from_slice(resp.names.as_deref().unwrap()).unwrap();
        assert_eq!(decoded.names, vec!["EXECUTION_COUNT_ALL"]);
    }

    #[test]
    fn test_pipeline_value_blob() {
        let registry = sample_registry();
        let resp = resolve_local_stat(
            &registry,
            &query(StatFilter::PipelineIndicatorValue {
                pipeline_name: "ingest".to_string(),
                indicator_name: "EXECUTION_COUNT_ALL".to_string(),
            }),
        )
        .unwrap();
        let decoded: ValueResult = serde_json::from_slice(resp.value.as_deref().unwrap()).unwrap();
        assert_eq!(decoded.value, json!(17));
    }

    #[test]
    fn test_pipeline_desc_blob() {
        let registry = sample_registry();
        let resp = resolve_local_stat(
            &registry,
            &query(StatFilter::PipelineIndicatorDesc {
                pipeline_name: "ingest".to_string(),
                indicator_name: "EXECUTION_COUNT_ALL".to_string(),
            }),
        )
        .unwrap();
        let decoded: DescResult = serde_json::from_slice(resp.desc.as_deref().unwrap()).unwrap();
        assert_eq!(decoded.desc, "total executions of the pipeline");
    }

    #[test]
    fn test_unknown_indicator_maps_to_retrieve_error() {
        let registry = sample_registry();
        let err = resolve_local_stat(
            &registry,
            &query(StatFilter::PipelineIndicatorValue {
                pipeline_name: "ingest".to_string(),
                indicator_name: "NOPE".to_string(),
            }),
        )
        .unwrap_err();
        assert_eq!(err.kind, ClusterErrorKind::RetrievePipelineStatValue);

        let err = resolve_local_stat(
            &registry,
            &query(StatFilter::PluginIndicatorValue {
                pipeline_name: "ingest".to_string(),
                plugin_name: "nope".to_string(),
                indicator_name: "WAIT_QUEUE_LENGTH".to_string(),
            }),
        )
        .unwrap_err();
        assert_eq!(err.kind, ClusterErrorKind::RetrievePluginStatValue);

        let err = resolve_local_stat(
            &registry,
            &query(StatFilter::TaskIndicatorDesc {
                pipeline_name: "ingest".to_string(),
                indicator_name: "NOPE".to_string(),
            }),
        )
        .unwrap_err();
        assert_eq!(err.kind, ClusterErrorKind::RetrieveTaskStatDesc);
    }

    #[test]
    fn test_plugin_and_task_names() {
        let registry = sample_registry();
        let resp = resolve_local_stat(
            &registry,
            &query(StatFilter::PluginIndicatorNames {
                pipeline_name: "ingest".to_string(),
                plugin_name: "http_input".to_string(),
            }),
        )
        .unwrap();
        let decoded: NamesResult = serde_json::from_slice(resp.names.as_deref().unwrap()).unwrap();
        assert_eq!(decoded.names, vec!["WAIT_QUEUE_LENGTH"]);

        let resp = resolve_local_stat(
            &registry,
            &query(StatFilter::TaskIndicatorNames {
                pipeline_name: "ingest".to_string(),
            }),
        )
        .unwrap();
        let decoded: NamesResult = serde_json::from_slice(resp.names.as_deref().unwrap()).unwrap();
        assert_eq!(decoded.names, vec!["EXECUTION_COUNT_SUCCESS"]);
    }
}
