use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};

use crate::models::{PolicyMatch, RefKey, ReferencePools, ReferenceToScan, ScanPlan, ScanTarget};
use crate::policy::{KeepPolicy, Limit, Operator, Pattern, Selector};

/// References whose match name satisfies `pattern`, in input order.
///
/// Branches are matched without their remote segment (`origin/release` is
/// tested as `release`); tags are matched by their full short name.
pub fn select_by_pattern<'a>(
    refs: &'a [ReferenceToScan],
    pattern: &Pattern,
) -> Vec<&'a ReferenceToScan> {
    refs.iter()
        .filter(|r| pattern.is_match(r.match_name()))
        .collect()
}

/// Narrow `refs` down to what `limit` keeps.
///
/// No limit, or a limit with neither bound, keeps everything.
pub fn apply_limit<'a>(
    refs: Vec<&'a ReferenceToScan>,
    limit: Option<&Limit>,
    now: DateTime<Utc>,
) -> Vec<&'a ReferenceToScan> {
    let Some(limit) = limit else {
        return refs;
    };

    let by_time = limit.within.map(|within| filter_by_in(&refs, within, now));
    let by_count = limit.last.map(|last| filter_by_last(&refs, last));

    match (by_time, by_count) {
        (None, None) => refs,
        (Some(by_time), None) => by_time,
        (None, Some(by_count)) => by_count,
        (Some(by_time), Some(by_count)) => match limit.effective_operator() {
            Operator::Or => references_or(&by_time, &by_count),
            Operator::And => references_and(&by_time, &by_count),
        },
    }
}

/// References created strictly after `now - within`
fn filter_by_in<'a>(
    refs: &[&'a ReferenceToScan],
    within: Duration,
    now: DateTime<Utc>,
) -> Vec<&'a ReferenceToScan> {
    // A window reaching past the representable range keeps everything
    let cutoff = chrono::Duration::from_std(within)
        .ok()
        .and_then(|d| now.checked_sub_signed(d));

    refs.iter()
        .copied()
        .filter(|r| cutoff.map_or(true, |cutoff| r.created_at > cutoff))
        .collect()
}

/// The `last` most recent references; negative means unbounded
fn filter_by_last<'a>(refs: &[&'a ReferenceToScan], last: i64) -> Vec<&'a ReferenceToScan> {
    if last < 0 {
        return refs.to_vec();
    }

    let mut sorted = refs.to_vec();
    sort_newest_first(&mut sorted);
    sorted.truncate(usize::try_from(last).unwrap_or(usize::MAX));
    sorted
}

fn sort_newest_first(refs: &mut [&ReferenceToScan]) {
    refs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Union by identity; `base` keeps its order and `extra` fills in what is missing
pub fn references_or<'a>(
    extra: &[&'a ReferenceToScan],
    base: &[&'a ReferenceToScan],
) -> Vec<&'a ReferenceToScan> {
    let mut merged: IndexMap<RefKey, &'a ReferenceToScan> =
        base.iter().map(|r| (r.key(), *r)).collect();
    for r in extra {
        merged.entry(r.key()).or_insert(*r);
    }
    merged.into_values().collect()
}

/// Intersection by identity, in the order of `first`
pub fn references_and<'a>(
    first: &[&'a ReferenceToScan],
    second: &[&'a ReferenceToScan],
) -> Vec<&'a ReferenceToScan> {
    let keys: IndexSet<RefKey> = second.iter().map(|r| r.key()).collect();
    first
        .iter()
        .copied()
        .filter(|r| keys.contains(&r.key()))
        .collect()
}

/// Decide which references the image cleanup has to scan.
///
/// Policies run in declaration order. A reference is listed once, in the
/// group of the first policy that kept it, while its image sub-policy is the
/// one from the last policy that kept it. When `policies` is empty the
/// built-in defaults apply.
pub fn references_to_scan(
    pools: &ReferencePools,
    policies: &[KeepPolicy],
    now: DateTime<Utc>,
) -> ScanPlan {
    let defaults;
    let policies = if policies.is_empty() {
        tracing::debug!("no keep policies configured, using defaults");
        defaults = KeepPolicy::defaults();
        &defaults[..]
    } else {
        policies
    };

    let mut kept_branches: IndexMap<RefKey, &ReferenceToScan> = IndexMap::new();
    let mut kept_tags: IndexMap<RefKey, &ReferenceToScan> = IndexMap::new();
    let mut images_policies: HashMap<RefKey, Limit> = HashMap::new();
    let mut trace = Vec::with_capacity(policies.len());

    for policy in policies {
        let (pool, kept) = match &policy.selector {
            Selector::Branch(_) => (&pools.branches, &mut kept_branches),
            Selector::Tag(_) => (&pools.tags, &mut kept_tags),
        };

        let selected = select_by_pattern(pool, policy.selector.pattern());
        let policy_refs = apply_limit(selected, policy.references_limit.as_ref(), now);

        for r in &policy_refs {
            let key = r.key();
            images_policies.insert(key.clone(), policy.images_per_reference.clone());
            kept.entry(key).or_insert(*r);
        }

        let names: Vec<String> = policy_refs
            .iter()
            .map(|r| r.short_name().to_string())
            .collect();
        tracing::debug!(policy = %policy, references = ?names, "keep policy applied");
        trace.push(PolicyMatch {
            policy: policy.to_string(),
            references: names,
        });
    }

    let mut branches: Vec<&ReferenceToScan> = kept_branches.into_values().collect();
    let mut tags: Vec<&ReferenceToScan> = kept_tags.into_values().collect();
    sort_newest_first(&mut branches);
    sort_newest_first(&mut tags);

    let targets = branches
        .into_iter()
        .chain(tags)
        .map(|r| ScanTarget {
            images_cleanup_keep_policy: images_policies.remove(&r.key()).unwrap_or_default(),
            reference: r.clone(),
        })
        .collect();

    ScanPlan { trace, targets }
}
