use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag key carrying a member's group on cluster requests.
pub const GROUP_TAG_KEY: &str = "group";
/// Tag key carrying a member's mode on cluster requests.
pub const MODE_TAG_KEY: &str = "mode";

/// Role tag of a peer.
///
/// Read-mode members are the designated query responders; write-mode members
/// accept configuration changes and only answer statistics queries when no
/// read-mode member is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberMode {
    Read,
    Write,
}

impl fmt::Display for MemberMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberMode::Read => f.write_str("read"),
            MemberMode::Write => f.write_str("write"),
        }
    }
}

/// Liveness of a peer as observed by the membership service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberStatus {
    Alive,
    Failed,
    Left,
}

/// One peer of the group, immutable per membership observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub node_name: String,
    pub group: String,
    pub mode: MemberMode,
    pub status: MemberStatus,
}

impl Member {
    pub fn new(
        node_name: impl Into<String>,
        group: impl Into<String>,
        mode: MemberMode,
        status: MemberStatus,
    ) -> Self {
        Self {
            node_name: node_name.into(),
            group: group.into(),
            mode,
            status,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.status == MemberStatus::Alive
    }
}

/// Membership view maintained by the external cluster service.
///
/// `members` returns a point-in-time snapshot; a blocking read is permitted.
pub trait Membership: Send + Sync {
    fn members(&self) -> Vec<Member>;
}

/// Alive members of one group.
pub fn alive_members_in_group(members: &[Member], group: &str) -> Vec<Member> {
    members
        .iter()
        .filter(|m| m.is_alive() && m.group == group)
        .cloned()
        .collect()
}

/// Alive members of one group, excluding the local node.
pub fn rest_alive_members_in_group(
    members: &[Member],
    group: &str,
    self_name: &str,
) -> Vec<Member> {
    members
        .iter()
        .filter(|m| m.is_alive() && m.group == group && m.node_name != self_name)
        .cloned()
        .collect()
}
