//! Wire envelope framing for cluster statistics messages.
//!
//! Every request and response payload on the cluster transport is
//! `[kind: u8][body: bytes]`. The body is a postcard-serialized protocol
//! record; postcard keeps enum discriminants on the wire, which is all the
//! envelope needs to round-trip the tagged query and response unions. JSON
//! sub-blobs inside a [`StatResponse`](crate::protocol::StatResponse) are
//! untouched by this layer.
//!
//! The relay hop of the two-hop protocol is expressed entirely at this
//! level: the entry member copies the request payload byte-for-byte and
//! overwrites the leading kind byte with [`MessageKind::StatRelay`].

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::protocol::{ClusterError, Result};

/// Discriminator byte leading every wire payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageKind {
    /// A statistics query addressed to the aggregation entry member.
    Stat = 1,
    /// A statistics query relayed by the entry member to one peer.
    StatRelay = 2,
}

impl MessageKind {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(MessageKind::Stat),
            2 => Some(MessageKind::StatRelay),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Serializes a message and prepends the kind byte.
pub fn pack_with_kind<T: Serialize>(message: &T, kind: MessageKind) -> Result<Vec<u8>> {
    let body = postcard::to_allocvec(message).map_err(|e| {
        ClusterError::internal(format!(
            "pack message (kind={}) failed: {}",
            kind.as_byte(),
            e
        ))
    })?;

    let mut payload = Vec::with_capacity(body.len() + 1);
    payload.push(kind.as_byte());
    payload.extend_from_slice(&body);
    Ok(payload)
}

/// Deserializes an envelope body (the kind byte already stripped).
///
/// Failures are reported as [`WrongMessageFormat`]; response-path callers
/// remap to [`InternalServer`] where the sender is trusted.
///
/// [`WrongMessageFormat`]: crate::protocol::ClusterErrorKind::WrongMessageFormat
/// [`InternalServer`]: crate::protocol::ClusterErrorKind::InternalServer
pub fn unpack<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    postcard::from_bytes(body)
        .map_err(|e| ClusterError::wrong_format(format!("unpack message failed: {}", e)))
}

/// Reads the kind byte of a payload. Empty payloads have no kind.
pub fn kind_of(payload: &[u8]) -> Option<MessageKind> {
    payload.first().copied().and_then(MessageKind::from_byte)
}

/// Builds the relay payload: a byte-for-byte copy of the request with the
/// leading kind byte overwritten to [`MessageKind::StatRelay`].
pub fn relay_payload(payload: &[u8]) -> Vec<u8> {
    let mut relayed = payload.to_vec();
    if let Some(first) = relayed.first_mut() {
        *first = MessageKind::StatRelay.as_byte();
    }
    relayed
}
