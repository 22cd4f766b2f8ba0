//! End-to-end aggregation over an in-memory cluster.
//!
//! The harness wires several gateways to a loopback transport: a request
//! addressed to a node is dispatched to that node's handler in a spawned
//! task and the reply is fed back into the requester's response stream.
//! Nodes can be marked silent to model peers that never answer.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{mpsc, watch};

use pipegate_cluster::gateway::{StatGateway, StatGatewayConfig};
use pipegate_cluster::member::{Member, MemberMode, MemberStatus, Membership};
use pipegate_cluster::transport::{
    ClusterTransport, MemberResponse, RequestEvent, RequestFuture, RequestParam,
};
use pipegate_common::codec::{kind_of, MessageKind};
use pipegate_common::protocol::{
    ClusterErrorKind, DescResult, NamesResult, StatFilter, ValueResult,
};
use pipegate_stats::{Indicator, IndicatorValue, PipelineStatsRegistry};

const GROUP: &str = "g1";
const PIPELINE: &str = "orders";

struct StaticMembership {
    members: Vec<Member>,
}

impl Membership for StaticMembership {
    fn members(&self) -> Vec<Member> {
        self.members.clone()
    }
}

/// Shared state of the loopback network.
#[derive(Default)]
struct TestNet {
    gateways: Mutex<HashMap<String, Arc<StatGateway>>>,
    silent: Mutex<HashSet<String>>,
    request_log: Mutex<Vec<String>>,
}

impl TestNet {
    fn register(&self, name: &str, gateway: Arc<StatGateway>) {
        self.gateways.lock().unwrap().insert(name.to_string(), gateway);
    }

    fn silence(&self, name: &str) {
        self.silent.lock().unwrap().insert(name.to_string());
    }

    fn request_names(&self) -> Vec<String> {
        self.request_log.lock().unwrap().clone()
    }
}

struct LoopbackTransport {
    net: Arc<TestNet>,
}

#[async_trait]
impl ClusterTransport for LoopbackTransport {
    async fn request(
        &self,
        name: &str,
        payload: Vec<u8>,
        param: &RequestParam,
    ) -> pipegate_common::protocol::Result<RequestFuture> {
        self.net.request_log.lock().unwrap().push(name.to_string());

        let (tx, rx) = mpsc::channel(param.target_node_names.len().max(1));

        for target in &param.target_node_names {
            if self.net.silent.lock().unwrap().contains(target) {
                continue;
            }
            let Some(gateway) = self.net.gateways.lock().unwrap().get(target).cloned() else {
                continue;
            };

            let tx = tx.clone();
            let target = target.clone();
            let name = name.to_string();
            let payload = payload.clone();
            tokio::spawn(async move {
                let (event, reply) = RequestEvent::new(name, "test-caller", payload.clone());
                match kind_of(&payload) {
                    Some(MessageKind::Stat) => gateway.handle_stat(event).await,
                    Some(MessageKind::StatRelay) => gateway.handle_stat_relay(event).await,
                    None => return,
                }
                if let Ok(payload) = reply.await {
                    let _ = tx
                        .send(MemberResponse {
                            node_name: target,
                            payload,
                        })
                        .await;
                }
            });
        }

        Ok(RequestFuture::new(rx))
    }
}

struct TestCluster {
    gateways: HashMap<String, Arc<StatGateway>>,
    net: Arc<TestNet>,
    _stop_tx: watch::Sender<bool>,
}

impl TestCluster {
    fn gateway(&self, name: &str) -> &StatGateway {
        self.gateways.get(name).unwrap()
    }
}

/// Builds a cluster where every listed node is alive in [`GROUP`].
fn spawn_cluster(
    modes: &[(&str, MemberMode)],
    registries: HashMap<String, Arc<PipelineStatsRegistry>>,
) -> TestCluster {
    let members: Vec<Member> = modes
        .iter()
        .map(|(name, mode)| Member::new(*name, GROUP, *mode, MemberStatus::Alive))
        .collect();
    let membership = Arc::new(StaticMembership { members });
    let net = Arc::new(TestNet::default());
    let (stop_tx, stop_rx) = watch::channel(false);

    let mut gateways = HashMap::new();
    for (name, _) in modes {
        let registry = registries
            .get(*name)
            .cloned()
            .unwrap_or_else(|| Arc::new(PipelineStatsRegistry::new()));
        let gateway = Arc::new(StatGateway::new(
            *name,
            GROUP,
            membership.clone(),
            Arc::new(LoopbackTransport { net: net.clone() }),
            registry,
            stop_rx.clone(),
            StatGatewayConfig::default(),
        ));
        net.register(name, gateway.clone());
        gateways.insert(name.to_string(), gateway);
    }

    TestCluster {
        gateways,
        net,
        _stop_tx: stop_tx,
    }
}

fn registry_with_pipeline_value(
    indicator_name: &str,
    indicator: Indicator,
    value: IndicatorValue,
) -> Arc<PipelineStatsRegistry> {
    let registry = Arc::new(PipelineStatsRegistry::new());
    let stats = registry.register_pipeline(PIPELINE);
    stats.register_pipeline_indicator(indicator_name, indicator);
    stats.pipeline_indicator(indicator_name).unwrap().set(value);
    registry
}

fn value_filter(indicator_name: &str) -> StatFilter {
    StatFilter::PipelineIndicatorValue {
        pipeline_name: PIPELINE.to_string(),
        indicator_name: indicator_name.to_string(),
    }
}

fn decoded_value(blob: &[u8]) -> serde_json::Value {
    serde_json::from_slice::<ValueResult>(blob).unwrap().value
}

#[tokio::test]
async fn test_sum_of_counters_across_all_members() {
    let registries = HashMap::from([
        (
            "n1".to_string(),
            registry_with_pipeline_value(
                "EXECUTION_COUNT_ALL",
                Indicator::int64("executions"),
                IndicatorValue::Int64(17),
            ),
        ),
        (
            "n2".to_string(),
            registry_with_pipeline_value(
                "EXECUTION_COUNT_ALL",
                Indicator::int64("executions"),
                IndicatorValue::Int64(25),
            ),
        ),
        (
            "n3".to_string(),
            registry_with_pipeline_value(
                "EXECUTION_COUNT_ALL",
                Indicator::int64("executions"),
                IndicatorValue::Int64(8),
            ),
        ),
    ]);
    let cluster = spawn_cluster(
        &[
            ("n1", MemberMode::Read),
            ("n2", MemberMode::Write),
            ("n3", MemberMode::Write),
        ],
        registries,
    );

    let blob = cluster
        .gateway("n2")
        .issue_stat(GROUP, Duration::from_secs(5), value_filter("EXECUTION_COUNT_ALL"))
        .await
        .unwrap();

    assert_eq!(decoded_value(&blob), json!(50));
}

#[tokio::test]
async fn test_relay_handlers_never_rebroadcast() {
    let registries = HashMap::from([
        (
            "n1".to_string(),
            registry_with_pipeline_value(
                "EXECUTION_COUNT_ALL",
                Indicator::int64("executions"),
                IndicatorValue::Int64(1),
            ),
        ),
        (
            "n2".to_string(),
            registry_with_pipeline_value(
                "EXECUTION_COUNT_ALL",
                Indicator::int64("executions"),
                IndicatorValue::Int64(2),
            ),
        ),
        (
            "n3".to_string(),
            registry_with_pipeline_value(
                "EXECUTION_COUNT_ALL",
                Indicator::int64("executions"),
                IndicatorValue::Int64(3),
            ),
        ),
    ]);
    let cluster = spawn_cluster(
        &[
            ("n1", MemberMode::Read),
            ("n2", MemberMode::Write),
            ("n3", MemberMode::Write),
        ],
        registries,
    );

    cluster
        .gateway("n3")
        .issue_stat(GROUP, Duration::from_secs(5), value_filter("EXECUTION_COUNT_ALL"))
        .await
        .unwrap();

    // one entry request plus one relay fan-out; relay targets issued nothing
    assert_eq!(cluster.net.request_names(), vec!["stat", "stat_relay"]);
}

#[tokio::test]
async fn test_max_latency_with_one_silent_peer() {
    let values = [("n1", 100), ("n2", 0), ("n3", 250), ("n4", 170)];
    let registries: HashMap<String, Arc<PipelineStatsRegistry>> = values
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                registry_with_pipeline_value(
                    "EXECUTION_TIME_MAX_ALL",
                    Indicator::int64("slowest execution"),
                    IndicatorValue::Int64(*value),
                ),
            )
        })
        .collect();
    let cluster = spawn_cluster(
        &[
            ("n1", MemberMode::Read),
            ("n2", MemberMode::Write),
            ("n3", MemberMode::Write),
            ("n4", MemberMode::Write),
        ],
        registries,
    );
    cluster.net.silence("n2");

    let blob = cluster
        .gateway("n1")
        .issue_stat(
            GROUP,
            Duration::from_millis(500),
            value_filter("EXECUTION_TIME_MAX_ALL"),
        )
        .await
        .unwrap();

    // the silent peer contributes nothing and no error surfaces
    assert_eq!(decoded_value(&blob), json!(250));
}

#[tokio::test]
async fn test_unknown_indicator_lists_values_in_peer_name_order() {
    let registries = HashMap::from([
        (
            "n1".to_string(),
            registry_with_pipeline_value(
                "CUSTOM_X",
                Indicator::float64("custom figure"),
                IndicatorValue::Float64(3.0),
            ),
        ),
        (
            "n2".to_string(),
            registry_with_pipeline_value(
                "CUSTOM_X",
                Indicator::float64("custom figure"),
                IndicatorValue::Float64(4.0),
            ),
        ),
    ]);
    // a single read-mode member pins the entry point to n1
    let cluster = spawn_cluster(
        &[("n1", MemberMode::Read), ("n2", MemberMode::Write)],
        registries,
    );

    let blob = cluster
        .gateway("n2")
        .issue_stat(GROUP, Duration::from_secs(5), value_filter("CUSTOM_X"))
        .await
        .unwrap();

    assert_eq!(decoded_value(&blob), json!([3.0, 4.0]));
}

#[tokio::test]
async fn test_names_union_is_sorted_and_deduplicated() {
    let make_registry = |names: &[&str]| {
        let registry = Arc::new(PipelineStatsRegistry::new());
        let stats = registry.register_pipeline(PIPELINE);
        for name in names {
            stats.register_pipeline_indicator(*name, Indicator::int64("figure"));
        }
        registry
    };
    let registries = HashMap::from([
        ("n1".to_string(), make_registry(&["a", "c"])),
        ("n2".to_string(), make_registry(&["b", "a"])),
    ]);
    let cluster = spawn_cluster(
        &[("n1", MemberMode::Read), ("n2", MemberMode::Write)],
        registries,
    );

    let blob = cluster
        .gateway("n1")
        .issue_stat(
            GROUP,
            Duration::from_secs(5),
            StatFilter::PipelineIndicatorNames {
                pipeline_name: PIPELINE.to_string(),
            },
        )
        .await
        .unwrap();

    let decoded: NamesResult = serde_json::from_slice(&blob).unwrap();
    assert_eq!(decoded.names, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_description_takes_first_non_empty_in_member_order() {
    let make_registry = |desc: &str| {
        let registry = Arc::new(PipelineStatsRegistry::new());
        let stats = registry.register_pipeline(PIPELINE);
        stats.register_pipeline_indicator("EXECUTION_COUNT_ALL", Indicator::int64(desc));
        registry
    };
    let registries = HashMap::from([
        ("n1".to_string(), make_registry("")),
        ("n2".to_string(), make_registry("hello")),
        ("n3".to_string(), make_registry("world")),
    ]);
    // n1 is the only read-mode member, so it resolves first with its empty
    // description and the peers follow in name order
    let cluster = spawn_cluster(
        &[
            ("n1", MemberMode::Read),
            ("n2", MemberMode::Write),
            ("n3", MemberMode::Write),
        ],
        registries,
    );

    let blob = cluster
        .gateway("n3")
        .issue_stat(
            GROUP,
            Duration::from_secs(5),
            StatFilter::PipelineIndicatorDesc {
                pipeline_name: PIPELINE.to_string(),
                indicator_name: "EXECUTION_COUNT_ALL".to_string(),
            },
        )
        .await
        .unwrap();

    let decoded: DescResult = serde_json::from_slice(&blob).unwrap();
    assert_eq!(decoded.desc, "hello");
}

#[tokio::test]
async fn test_no_alive_member_fails_without_any_request() {
    let cluster = spawn_cluster(&[("n1", MemberMode::Read)], HashMap::new());

    let err = cluster
        .gateway("n1")
        .issue_stat(
            "empty-group",
            Duration::from_secs(5),
            value_filter("EXECUTION_COUNT_ALL"),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind, ClusterErrorKind::NoAliveMember);
    assert!(cluster.net.request_names().is_empty());
}

#[tokio::test]
async fn test_entry_member_local_failure_stands_on_peer_replies() {
    // the entry member has no such pipeline at all; its peers do
    let registries = HashMap::from([
        (
            "n2".to_string(),
            registry_with_pipeline_value(
                "EXECUTION_COUNT_ALL",
                Indicator::int64("executions"),
                IndicatorValue::Int64(25),
            ),
        ),
        (
            "n3".to_string(),
            registry_with_pipeline_value(
                "EXECUTION_COUNT_ALL",
                Indicator::int64("executions"),
                IndicatorValue::Int64(8),
            ),
        ),
    ]);
    let cluster = spawn_cluster(
        &[
            ("n1", MemberMode::Read),
            ("n2", MemberMode::Write),
            ("n3", MemberMode::Write),
        ],
        registries,
    );

    let blob = cluster
        .gateway("n1")
        .issue_stat(GROUP, Duration::from_secs(5), value_filter("EXECUTION_COUNT_ALL"))
        .await
        .unwrap();

    assert_eq!(decoded_value(&blob), json!(33));
}

#[tokio::test]
async fn test_failing_peer_partial_is_dropped() {
    // n3 lacks the pipeline and answers with an error partial
    let registries = HashMap::from([
        (
            "n1".to_string(),
            registry_with_pipeline_value(
                "EXECUTION_COUNT_ALL",
                Indicator::int64("executions"),
                IndicatorValue::Int64(17),
            ),
        ),
        (
            "n2".to_string(),
            registry_with_pipeline_value(
                "EXECUTION_COUNT_ALL",
                Indicator::int64("executions"),
                IndicatorValue::Int64(25),
            ),
        ),
    ]);
    let cluster = spawn_cluster(
        &[
            ("n1", MemberMode::Read),
            ("n2", MemberMode::Write),
            ("n3", MemberMode::Write),
        ],
        registries,
    );

    let blob = cluster
        .gateway("n1")
        .issue_stat(GROUP, Duration::from_secs(5), value_filter("EXECUTION_COUNT_ALL"))
        .await
        .unwrap();

    assert_eq!(decoded_value(&blob), json!(42));
}

#[tokio::test]
async fn test_silent_entry_member_times_out() {
    let cluster = spawn_cluster(
        &[("n1", MemberMode::Read), ("n2", MemberMode::Write)],
        HashMap::new(),
    );
    cluster.net.silence("n1");

    let err = cluster
        .gateway("n2")
        .issue_stat(
            GROUP,
            Duration::from_millis(200),
            value_filter("EXECUTION_COUNT_ALL"),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind, ClusterErrorKind::Timeout);
}
