use serde::{Deserialize, Serialize};

use super::error::ClusterError;
use super::query::StatFacet;

/// One member's contribution to a cluster statistics aggregate.
///
/// At most one field is set. The payload fields hold JSON sub-blobs (the
/// [`NamesResult`], [`ValueResult`] and [`DescResult`] records) so the
/// combiner can carry values opaquely until it is time to reduce them. A
/// member that failed locally sets `err` instead; such partials are dropped
/// before combining.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatResponse {
    pub names: Option<Vec<u8>>,
    pub value: Option<Vec<u8>>,
    pub desc: Option<Vec<u8>>,
    pub err: Option<ClusterError>,
}

impl StatResponse {
    pub fn names(blob: Vec<u8>) -> Self {
        Self {
            names: Some(blob),
            ..Self::default()
        }
    }

    pub fn value(blob: Vec<u8>) -> Self {
        Self {
            value: Some(blob),
            ..Self::default()
        }
    }

    pub fn desc(blob: Vec<u8>) -> Self {
        Self {
            desc: Some(blob),
            ..Self::default()
        }
    }

    pub fn error(err: ClusterError) -> Self {
        Self {
            err: Some(err),
            ..Self::default()
        }
    }

    /// The sub-blob answering the given facet, if this response carries one.
    pub fn payload_for(&self, facet: StatFacet) -> Option<&[u8]> {
        match facet {
            StatFacet::Names => self.names.as_deref(),
            StatFacet::Value => self.value.as_deref(),
            StatFacet::Desc => self.desc.as_deref(),
        }
    }
}

/// Sub-blob for the names facet: `{"Names": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamesResult {
    #[serde(rename = "Names")]
    pub names: Vec<String>,
}

/// Sub-blob for the value facet: `{"Value": <scalar or list>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueResult {
    #[serde(rename = "Value")]
    pub value: serde_json::Value,
}

/// Sub-blob for the description facet: `{"Desc": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescResult {
    #[serde(rename = "Desc")]
    pub desc: String,
}
