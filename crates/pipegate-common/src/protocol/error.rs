use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classification of a cluster statistics failure.
///
/// The kind travels on the wire inside [`ClusterError`] and decides how the
/// management surface maps the failure to an HTTP status class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterErrorKind {
    /// No alive member in the target group could act as entry point.
    NoAliveMember,
    /// The envelope or query failed structural or selector validation.
    WrongMessageFormat,
    /// The local registry has no statistics for the named pipeline.
    PipelineStatNotFound,
    /// The registry failed to read a pipeline-scoped indicator value.
    RetrievePipelineStatValue,
    /// The registry failed to read a pipeline-scoped indicator description.
    RetrievePipelineStatDesc,
    /// The registry failed to read a plugin-scoped indicator value.
    RetrievePluginStatValue,
    /// The registry failed to read a plugin-scoped indicator description.
    RetrievePluginStatDesc,
    /// The registry failed to read a task-scoped indicator value.
    RetrieveTaskStatValue,
    /// The registry failed to read a task-scoped indicator description.
    RetrieveTaskStatDesc,
    /// The query deadline expired before any reply arrived.
    Timeout,
    /// A process stop interrupted a pending cluster request.
    IssueMemberGone,
    /// Pack/unpack/marshal failures and combiner dead ends.
    InternalServer,
}

impl fmt::Display for ClusterErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClusterErrorKind::NoAliveMember => "no alive member",
            ClusterErrorKind::WrongMessageFormat => "wrong message format",
            ClusterErrorKind::PipelineStatNotFound => "pipeline statistics not found",
            ClusterErrorKind::RetrievePipelineStatValue => "retrieve pipeline statistics value error",
            ClusterErrorKind::RetrievePipelineStatDesc => "retrieve pipeline statistics description error",
            ClusterErrorKind::RetrievePluginStatValue => "retrieve plugin statistics value error",
            ClusterErrorKind::RetrievePluginStatDesc => "retrieve plugin statistics description error",
            ClusterErrorKind::RetrieveTaskStatValue => "retrieve task statistics value error",
            ClusterErrorKind::RetrieveTaskStatDesc => "retrieve task statistics description error",
            ClusterErrorKind::Timeout => "timeout",
            ClusterErrorKind::IssueMemberGone => "member gone",
            ClusterErrorKind::InternalServer => "internal server error",
        };
        f.write_str(name)
    }
}

/// A typed cluster failure as it appears on the wire: `{type, message}`.
///
/// Partial responses carry a `ClusterError` instead of a payload when the
/// responding member failed locally; the entry member surfaces one to the
/// caller when the whole aggregation cannot produce a result.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ClusterError {
    #[serde(rename = "type")]
    pub kind: ClusterErrorKind,
    pub message: String,
}

impl ClusterError {
    pub fn new(kind: ClusterErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for the catch-all [`ClusterErrorKind::InternalServer`] kind.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ClusterErrorKind::InternalServer, message)
    }

    /// Shorthand for [`ClusterErrorKind::WrongMessageFormat`].
    pub fn wrong_format(message: impl Into<String>) -> Self {
        Self::new(ClusterErrorKind::WrongMessageFormat, message)
    }
}

pub type Result<T> = std::result::Result<T, ClusterError>;
