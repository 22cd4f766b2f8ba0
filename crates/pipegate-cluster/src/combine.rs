//! Merging member partials into one cluster answer.
//!
//! The combiner receives the partial responses that survived collection
//! (error-bearing partials are dropped, remaining ones arrive local-first
//! then sorted by peer name) and produces the aggregate the caller sees.
//! `None` means nothing could be combined; the entry member then surfaces an
//! internal error.

use std::collections::HashSet;

use pipegate_common::protocol::{
    DescResult, NamesResult, StatFacet, StatQuery, StatResponse, ValueResult,
};

use crate::aggregate::reducer_for;

/// Combines partial responses according to the query's facet.
pub fn combine_stat_responses(
    query: &StatQuery,
    partials: &[StatResponse],
) -> Option<StatResponse> {
    let healthy: Vec<&StatResponse> = partials.iter().filter(|p| p.err.is_none()).collect();

    match query.filter.facet() {
        StatFacet::Names => combine_names(&healthy),
        StatFacet::Desc => combine_desc(&healthy),
        StatFacet::Value => combine_values(query, &healthy),
    }
}

/// Set-union of the members' name listings, sorted lexicographically.
///
/// Undecodable partials are skipped silently; the union of zero decodable
/// partials is the empty listing, not a failure.
fn combine_names(partials: &[&StatResponse]) -> Option<StatResponse> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();

    for partial in partials {
        let Some(blob) = partial.names.as_deref() else {
            continue;
        };
        let Ok(decoded) = serde_json::from_slice::<NamesResult>(blob) else {
            continue;
        };
        for name in decoded.names {
            if seen.insert(name.clone()) {
                names.push(name);
            }
        }
    }

    names.sort();
    let blob = serde_json::to_vec(&NamesResult { names }).ok()?;
    Some(StatResponse::names(blob))
}

/// First partial whose description decodes to a non-empty string.
///
/// Iteration order is the collection order (local first, then peers by
/// name), so the answer is deterministic for a given set of arrivals.
fn combine_desc(partials: &[&StatResponse]) -> Option<StatResponse> {
    for partial in partials {
        let Some(blob) = partial.desc.as_deref() else {
            continue;
        };
        let Ok(decoded) = serde_json::from_slice::<DescResult>(blob) else {
            continue;
        };
        if decoded.desc.is_empty() {
            continue;
        }
        return Some(StatResponse::desc(blob.to_vec()));
    }
    None
}

/// Reduces a known indicator via its catalog reducer, or lists the raw
/// per-member values for an unknown one.
fn combine_values(query: &StatQuery, partials: &[&StatResponse]) -> Option<StatResponse> {
    let indicator_name = query.filter.indicator_name()?;

    let decoded: Vec<serde_json::Value> = partials
        .iter()
        .filter_map(|partial| partial.value.as_deref())
        .filter_map(|blob| serde_json::from_slice::<ValueResult>(blob).ok())
        .map(|result| result.value)
        .filter(|value| !value.is_null())
        .collect();

    let Some(reducer) = reducer_for(query.filter.scope(), indicator_name) else {
        // unknown indicators are handed back raw, in collection order
        let blob = serde_json::to_vec(&ValueResult {
            value: serde_json::Value::Array(decoded),
        })
        .ok()?;
        return Some(StatResponse::value(blob));
    };

    let scalars: Vec<Vec<u8>> = decoded
        .iter()
        .filter_map(|value| serde_json::to_vec(value).ok())
        .collect();
    if scalars.is_empty() {
        return None;
    }

    let reduced = reducer.reduce(&scalars)?;
    let value = serde_json::from_slice(&reduced).ok()?;
    let blob = serde_json::to_vec(&ValueResult { value }).ok()?;
    Some(StatResponse::value(blob))
}
