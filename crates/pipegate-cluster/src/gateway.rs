//! Two-hop aggregation coordinator.
//!
//! A statistics question travels caller -> entry member -> all peers and no
//! further. The entry member answers the query locally, relays it to every
//! alive peer of its group, collects the partial responses under the query's
//! deadline and combines whatever arrived. Relay targets answer from their
//! local registry only; they never issue cluster requests of their own,
//! which is what keeps the topology at two hops and free of cycles.

use rand::thread_rng;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use pipegate_common::codec::{kind_of, pack_with_kind, relay_payload, unpack, MessageKind};
use pipegate_common::protocol::{
    ClusterError, ClusterErrorKind, Result, StatFilter, StatQuery, StatResponse,
};
use pipegate_stats::StatRegistry;

use crate::combine::combine_stat_responses;
use crate::member::{rest_alive_members_in_group, Membership, GROUP_TAG_KEY, MODE_TAG_KEY};
use crate::resolver::resolve_local_stat;
use crate::selector::choose_aggregation_member;
use crate::transport::{ClusterTransport, RequestEvent, RequestFuture, RequestParam};

/// Request name of the entry-point statistics message.
pub const STAT_REQUEST_NAME: &str = "stat";

/// Tuning knobs of the aggregation coordinator.
#[derive(Debug, Clone)]
pub struct StatGatewayConfig {
    /// Transport-level reply relay retries, fault tolerance on network
    /// issues.
    ///
    /// Default: 1
    pub response_relay_count: u32,
}

impl Default for StatGatewayConfig {
    fn default() -> Self {
        Self {
            response_relay_count: 1,
        }
    }
}

/// Per-node coordinator of cluster statistics aggregation.
///
/// One `StatGateway` runs on every member. Three paths meet here:
///
/// 1. **API path** ([`issue_stat`](Self::issue_stat)): picks an entry member
///    for the target group and sends it the query.
/// 2. **Entry path** ([`handle_stat`](Self::handle_stat)): local partial,
///    relay fan-out, collection, combining.
/// 3. **Relay path** ([`handle_stat_relay`](Self::handle_stat_relay)): local
///    partial only.
///
/// All waits are bounded by the query's deadline and cancelled by the
/// process-wide stop signal, whichever fires first.
pub struct StatGateway {
    node_name: String,
    group: String,
    membership: Arc<dyn Membership>,
    transport: Arc<dyn ClusterTransport>,
    registry: Arc<dyn StatRegistry>,
    stop: watch::Receiver<bool>,
    config: StatGatewayConfig,
}

impl StatGateway {
    pub fn new(
        node_name: impl Into<String>,
        group: impl Into<String>,
        membership: Arc<dyn Membership>,
        transport: Arc<dyn ClusterTransport>,
        registry: Arc<dyn StatRegistry>,
        stop: watch::Receiver<bool>,
        config: StatGatewayConfig,
    ) -> Self {
        Self {
            node_name: node_name.into(),
            group: group.into(),
            membership,
            transport,
            registry,
            stop,
            config,
        }
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// Issues a cluster statistics query on behalf of the management
    /// surface and returns the aggregated facet payload.
    ///
    /// The target group may differ from the local one. One alive member of
    /// the group is selected (read mode preferred) and asked to act as
    /// entry point; its reply carries the combined answer or a typed error.
    pub async fn issue_stat(
        &self,
        group: &str,
        timeout: Duration,
        filter: StatFilter,
    ) -> Result<Vec<u8>> {
        let query = StatQuery::new(filter, timeout);
        query.validate()?;

        let payload = pack_with_kind(&query, MessageKind::Stat).map_err(|e| {
            error!("BUG: pack statistics request failed: {}", e);
            e
        })?;

        let members = self.membership.members();
        let target = choose_aggregation_member(&members, group, &mut thread_rng()).ok_or_else(
            || {
                ClusterError::new(
                    ClusterErrorKind::NoAliveMember,
                    "none of members is alive to aggregate statistics",
                )
            },
        )?;

        let mut tags = HashMap::new();
        tags.insert(GROUP_TAG_KEY.to_string(), group.to_string());
        tags.insert(MODE_TAG_KEY.to_string(), target.mode.to_string());
        let param = RequestParam {
            target_node_names: vec![target.node_name.clone()],
            target_node_tags: tags,
            timeout,
            response_relay_count: self.config.response_relay_count,
        };

        let mut future = self
            .transport
            .request(STAT_REQUEST_NAME, payload, &param)
            .await
            .map_err(|e| {
                ClusterError::internal(format!("issue statistics aggregation failed: {}", e))
            })?;

        let deadline = Instant::now() + timeout;
        let mut stop = self.stop.clone();
        let member_resp = tokio::select! {
            resp = future.recv() => resp.ok_or_else(|| {
                ClusterError::new(ClusterErrorKind::Timeout, "issue statistics aggregation timeout")
            })?,
            _ = tokio::time::sleep_until(deadline) => {
                return Err(ClusterError::new(
                    ClusterErrorKind::Timeout,
                    "issue statistics aggregation timeout",
                ));
            }
            _ = stop_triggered(&mut stop) => {
                return Err(ClusterError::new(
                    ClusterErrorKind::IssueMemberGone,
                    "the member gone during issuing statistics aggregation",
                ));
            }
        };

        if member_resp.payload.is_empty() {
            return Err(ClusterError::internal(
                "issue statistics aggregation responds empty response",
            ));
        }

        let resp: StatResponse = unpack(&member_resp.payload[1..]).map_err(|e| {
            ClusterError::internal(format!(
                "unpack statistics aggregation response failed: {}",
                e
            ))
        })?;

        if let Some(err) = resp.err {
            return Err(err);
        }

        match resp.payload_for(query.filter.facet()) {
            Some(payload) if !payload.is_empty() => Ok(payload.to_vec()),
            _ => Err(ClusterError::internal(
                "issue statistics aggregation responds invalid result",
            )),
        }
    }

    /// Entry handler for `Stat` messages.
    pub async fn handle_stat(&self, event: RequestEvent) {
        if event.payload.is_empty() {
            return;
        }

        let Some(query) = self.unpack_query(&event) else {
            return;
        };

        // one failing member, including this one, must not poison the
        // cluster aggregate
        let local_resp = match resolve_local_stat(self.registry.as_ref(), &query) {
            Ok(resp) => Some(resp),
            Err(e) => {
                warn!(
                    "resolving statistics locally failed, continuing on peer replies: {}",
                    e
                );
                None
            }
        };

        let members = self.membership.members();
        let peers = rest_alive_members_in_group(&members, &self.group, &self.node_name);
        let peer_names: Vec<String> = peers.into_iter().map(|m| m.node_name).collect();

        let mut valid_partials: Vec<StatResponse> = Vec::new();
        valid_partials.extend(local_resp);

        if !peer_names.is_empty() {
            let mut tags = HashMap::new();
            tags.insert(GROUP_TAG_KEY.to_string(), self.group.clone());
            let param = RequestParam {
                target_node_names: peer_names.clone(),
                target_node_tags: tags,
                timeout: query.timeout,
                response_relay_count: self.config.response_relay_count,
            };

            let relay_name = format!("{}_relay", event.request_name);
            let future = match self
                .transport
                .request(&relay_name, relay_payload(&event.payload), &param)
                .await
            {
                Ok(future) => future,
                Err(e) => {
                    error!("sending statistics relay request failed: {}", e);
                    self.respond_stat_err(&event, ClusterErrorKind::InternalServer, e.to_string());
                    return;
                }
            };

            let book = match self
                .collect_peer_responses(future, &peer_names, query.timeout)
                .await
            {
                Ok(book) => book,
                Err(e) => {
                    self.respond_stat_err(&event, e.kind, e.message);
                    return;
                }
            };

            for (peer_name, payload) in book {
                let Some(payload) = payload else { continue };
                if payload.is_empty() {
                    continue;
                }
                let Ok(resp) = unpack::<StatResponse>(&payload[1..]) else {
                    debug!("discarding undecodable partial from {}", peer_name);
                    continue;
                };
                if resp.err.is_some() {
                    continue;
                }
                valid_partials.push(resp);
            }
        }

        match combine_stat_responses(&query, &valid_partials) {
            Some(combined) => self.respond_stat(&event, &combined),
            None => self.respond_stat_err(
                &event,
                ClusterErrorKind::InternalServer,
                "aggregate statistics for cluster members failed",
            ),
        }
    }

    /// Relay handler for `StatRelay` messages.
    ///
    /// Answers from the local registry only. Issuing further cluster
    /// requests here would turn the two-hop fan-out into an amplification
    /// cycle.
    pub async fn handle_stat_relay(&self, event: RequestEvent) {
        if event.payload.is_empty() {
            return;
        }

        let Some(query) = self.unpack_query(&event) else {
            return;
        };

        match resolve_local_stat(self.registry.as_ref(), &query) {
            Ok(resp) => self.respond_stat(&event, &resp),
            Err(e) => self.respond_stat_err(&event, e.kind, e.message),
        }
    }

    /// Collects relay replies into one slot per requested peer.
    ///
    /// The book is keyed by peer name, so downstream iteration is in name
    /// order regardless of arrival order. A peer that never answers keeps
    /// its `None` slot; the deadline only stops waiting, it discards
    /// nothing already recorded. A process stop aborts the collection.
    async fn collect_peer_responses(
        &self,
        mut future: RequestFuture,
        peer_names: &[String],
        timeout: Duration,
    ) -> Result<BTreeMap<String, Option<Vec<u8>>>> {
        let mut book: BTreeMap<String, Option<Vec<u8>>> = peer_names
            .iter()
            .map(|name| (name.clone(), None))
            .collect();
        let mut outstanding = book.len();
        let deadline = Instant::now() + timeout;
        let mut stop = self.stop.clone();

        while outstanding > 0 {
            tokio::select! {
                resp = future.recv() => {
                    let Some(resp) = resp else { break };
                    match book.get_mut(&resp.node_name) {
                        Some(slot) => {
                            // duplicates overwrite, the slot stays filled
                            if slot.is_none() {
                                outstanding -= 1;
                            }
                            *slot = Some(resp.payload);
                        }
                        None => {
                            debug!("ignoring reply from unsolicited node {}", resp.node_name);
                        }
                    }
                }
                _ = tokio::time::sleep_until(deadline) => break,
                _ = stop_triggered(&mut stop) => {
                    return Err(ClusterError::new(
                        ClusterErrorKind::IssueMemberGone,
                        "the member gone during collecting statistics responses",
                    ));
                }
            }
        }

        Ok(book)
    }

    fn unpack_query(&self, event: &RequestEvent) -> Option<StatQuery> {
        let query: StatQuery = match unpack(&event.payload[1..]) {
            Ok(query) => query,
            Err(e) => {
                self.respond_stat_err(event, ClusterErrorKind::WrongMessageFormat, e.message);
                return None;
            }
        };

        if let Err(e) = query.validate() {
            self.respond_stat_err(event, e.kind, e.message);
            return None;
        }

        Some(query)
    }

    /// Packs a response under the request's own kind byte and replies.
    fn respond_stat(&self, event: &RequestEvent, resp: &StatResponse) {
        let Some(kind) = kind_of(&event.payload) else {
            return;
        };

        let payload = match pack_with_kind(resp, kind) {
            Ok(payload) => payload,
            Err(e) => {
                error!("BUG: pack statistics response failed: {}", e);
                return;
            }
        };

        if let Err(e) = event.respond(payload) {
            error!(
                "responding {} to member {} failed: {}",
                event.request_name, event.source_node, e
            );
        }
    }

    fn respond_stat_err(
        &self,
        event: &RequestEvent,
        kind: ClusterErrorKind,
        message: impl Into<String>,
    ) {
        let resp = StatResponse::error(ClusterError::new(kind, message));
        self.respond_stat(event, &resp);
    }
}

/// Resolves when the process-wide stop signal fires.
///
/// A dropped sender counts as a stop: the process owning the signal is gone.
async fn stop_triggered(stop: &mut watch::Receiver<bool>) {
    if *stop.borrow() {
        return;
    }
    while stop.changed().await.is_ok() {
        if *stop.borrow() {
            return;
        }
    }
}
