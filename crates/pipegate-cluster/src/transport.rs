use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use pipegate_common::protocol::{ClusterError, Result};

/// Routing and delivery parameters of one cluster request.
///
/// Targets are addressed by node name; the tags repeat the group (and, for
/// single-target requests, the mode) so stale name lists cannot route a
/// request into the wrong group.
#[derive(Debug, Clone)]
pub struct RequestParam {
    pub target_node_names: Vec<String>,
    pub target_node_tags: HashMap<String, String>,
    /// Upper bound on the whole exchange; the transport stops delivering
    /// replies once it expires.
    pub timeout: Duration,
    /// Transport-level relay retries for reply delivery.
    pub response_relay_count: u32,
}

/// One peer's raw reply to a cluster request.
#[derive(Debug, Clone)]
pub struct MemberResponse {
    pub node_name: String,
    pub payload: Vec<u8>,
}

/// Stream of replies to one cluster request.
///
/// Replies arrive in any order; the stream closes when the transport gives
/// up on the remaining targets. Duplicates are possible and left to the
/// caller.
pub struct RequestFuture {
    responses: mpsc::Receiver<MemberResponse>,
}

impl RequestFuture {
    pub fn new(responses: mpsc::Receiver<MemberResponse>) -> Self {
        Self { responses }
    }

    pub async fn recv(&mut self) -> Option<MemberResponse> {
        self.responses.recv().await
    }
}

/// An inbound cluster request handed to a handler.
///
/// The responder is one-shot: a second `respond` call is an error, as is
/// responding after the transport abandoned the request.
pub struct RequestEvent {
    pub request_name: String,
    pub source_node: String,
    pub payload: Vec<u8>,
    responder: Mutex<Option<oneshot::Sender<Vec<u8>>>>,
}

impl RequestEvent {
    /// Creates an event plus the receiving half the transport awaits the
    /// reply on.
    pub fn new(
        request_name: impl Into<String>,
        source_node: impl Into<String>,
        payload: Vec<u8>,
    ) -> (Self, oneshot::Receiver<Vec<u8>>) {
        let (tx, rx) = oneshot::channel();
        let event = Self {
            request_name: request_name.into(),
            source_node: source_node.into(),
            payload,
            responder: Mutex::new(Some(tx)),
        };
        (event, rx)
    }

    pub fn respond(&self, payload: Vec<u8>) -> Result<()> {
        let sender = self
            .responder
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| ClusterError::internal("request already responded"))?;
        sender
            .send(payload)
            .map_err(|_| ClusterError::internal("requester stopped waiting for the response"))
    }
}

/// Seam to the cluster gossip transport.
///
/// The transport owns membership dissemination, framing and delivery; this
/// subsystem only issues requests and reads the reply stream.
#[async_trait]
pub trait ClusterTransport: Send + Sync {
    async fn request(
        &self,
        name: &str,
        payload: Vec<u8>,
        param: &RequestParam,
    ) -> Result<RequestFuture>;
}
