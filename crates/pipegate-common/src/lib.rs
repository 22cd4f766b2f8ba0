//! Pipegate Common Types and Wire Codec
//!
//! This crate provides the protocol definitions and the binary envelope codec
//! shared by every component of the pipegate cluster statistics subsystem.
//!
//! # Overview
//!
//! Pipegate nodes form a peer group, each serving user-defined processing
//! pipelines and exposing a local statistics registry. The management surface
//! asks one member for the value of an indicator across the whole group; that
//! member relays the question to its peers and combines the partial answers.
//! This crate contains everything both sides of that exchange must agree on:
//!
//! - **Protocol Layer**: statistics queries (nine filter variants over three
//!   scopes and three facets), partial responses, and the typed cluster error
//!   taxonomy carried on the wire
//! - **Codec Layer**: the `[kind byte][body]` envelope framing and the JSON
//!   sub-blob records carried inside partial responses
//!
//! # Example
//!
//! ```
//! use pipegate_common::codec::{self, MessageKind};
//! use pipegate_common::protocol::{StatFilter, StatQuery};
//! use std::time::Duration;
//!
//! let query = StatQuery::new(
//!     StatFilter::PipelineIndicatorValue {
//!         pipeline_name: "ingest".to_string(),
//!         indicator_name: "EXECUTION_COUNT_ALL".to_string(),
//!     },
//!     Duration::from_secs(5),
//! );
//!
//! let payload = codec::pack_with_kind(&query, MessageKind::Stat).unwrap();
//! assert_eq!(codec::kind_of(&payload), Some(MessageKind::Stat));
//!
//! let decoded: StatQuery = codec::unpack(&payload[1..]).unwrap();
//! assert_eq!(decoded, query);
//! ```

pub mod codec;
pub mod protocol;

pub use protocol::*;
