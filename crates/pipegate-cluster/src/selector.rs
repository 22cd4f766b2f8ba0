use rand::Rng;

use crate::member::{alive_members_in_group, Member, MemberMode};

/// Picks the member that should serve as aggregation entry point for a
/// group.
///
/// Read-mode members are preferred to keep query load off members under
/// write mode; the pick is uniform among the preferred pool. With no alive
/// read-mode member the pick falls back to alive write-mode members, and
/// with nothing alive at all it is `None`.
///
/// The caller supplies the RNG, so selection is reproducible under test and
/// there is no process-global seed.
pub fn choose_aggregation_member<R: Rng>(
    members: &[Member],
    group: &str,
    rng: &mut R,
) -> Option<Member> {
    let alive = alive_members_in_group(members, group);
    let (read_members, write_members): (Vec<Member>, Vec<Member>) = alive
        .into_iter()
        .partition(|m| m.mode == MemberMode::Read);

    let pool = if !read_members.is_empty() {
        read_members
    } else {
        write_members
    };
    if pool.is_empty() {
        return None;
    }

    let index = rng.gen_range(0..pool.len());
    Some(pool[index].clone())
}
