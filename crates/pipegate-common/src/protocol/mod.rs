//! Pipegate Protocol Definitions
//!
//! This module defines the core protocol types for cluster statistics
//! aggregation: queries, partial responses, and the error taxonomy shared
//! between peers and the management surface.
//!
//! # Protocol Types
//!
//! - **[`StatQuery`]**: a statistics question with one of nine filter
//!   variants and a hard deadline
//! - **[`StatResponse`]**: one member's partial answer, carrying a single
//!   JSON sub-blob or a typed error
//! - **[`ClusterError`]**: the `{type, message}` error record surfaced to
//!   callers and carried on the wire
//!
//! # Error Handling
//!
//! A peer failing locally reports the failure in its own partial response;
//! the entry member drops such partials before combining, so one bad peer
//! never poisons the cluster aggregate. Only when nothing at all can be
//! combined does the entry member surface an error itself.

pub mod error;
pub mod query;
pub mod response;

pub use error::{ClusterError, ClusterErrorKind, Result};
pub use query::{StatFacet, StatFilter, StatQuery, StatScope};
pub use response::{DescResult, NamesResult, StatResponse, ValueResult};
