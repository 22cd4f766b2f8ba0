//! Pipegate Cluster Statistics Aggregation
//!
//! This crate answers one question for a group of pipegate nodes: what is
//! the value of a statistics indicator across the entire group, not merely
//! on one member.
//!
//! # Architecture
//!
//! Aggregation is a two-hop protocol:
//!
//! 1. The management surface uses the [`selector`] to pick one alive member
//!    of the target group (read mode preferred) and sends it the query.
//! 2. That entry member answers the query from its own registry, relays the
//!    identical payload to every alive peer of its group under a swapped
//!    message kind, and collects the partial responses until the query's
//!    deadline.
//! 3. The [`combine`] step merges the partials: name listings are
//!    set-unioned and sorted, descriptions take the first non-empty answer,
//!    and values are reduced by the indicator's catalog entry in
//!    [`aggregate`] (or listed raw when the indicator is unknown).
//!
//! Relay targets answer locally and never fan out again; the topology is
//! two hops by construction.
//!
//! # Partial Failure
//!
//! Any peer may time out, fail locally or return garbage. Error-bearing and
//! undecodable partials are dropped before combining, deadline expiry turns
//! missing peers into absent slots, and the aggregate is produced from
//! whatever arrived. Only when nothing at all can be combined does the
//! entry member report a failure.
//!
//! # Key Components
//!
//! - [`member`]: membership snapshot model and group helpers
//! - [`selector`]: entry-point selection with read-mode preference
//! - [`transport`]: seam to the external cluster gossip transport
//! - [`aggregate`]: typed reducers and the per-scope indicator catalogs
//! - [`combine`]: facet-dispatched merging of partial responses
//! - [`resolver`]: local registry reads behind a validated query
//! - [`gateway`]: the coordinator tying the paths together

pub mod aggregate;
pub mod combine;
pub mod gateway;
pub mod member;
pub mod resolver;
pub mod selector;
pub mod transport;

pub use gateway::{StatGateway, StatGatewayConfig, STAT_REQUEST_NAME};
pub use member::{Member, MemberMode, MemberStatus, Membership};
pub use transport::{ClusterTransport, MemberResponse, RequestEvent, RequestFuture, RequestParam};
