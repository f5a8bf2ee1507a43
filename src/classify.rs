use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::{CommitInfo, RawKind, RawReference, RefKind, ReferencePools, ReferenceToScan};
use crate::source::ReferenceSource;

const BRANCH_SCAN_DEPTH: i32 = -1;
const TAG_SCAN_DEPTH: i32 = 1;

/// Split upstream remote branches and tags into pools with timestamps resolved.
///
/// Local branches, other remotes and symbolic references are skipped. Any
/// resolution failure aborts the whole classification.
pub fn classify<S: ReferenceSource + ?Sized>(
    source: &S,
    remote: &str,
) -> Result<ReferencePools, AppError> {
    let remote_prefix = format!("{}/", remote);
    let mut pools = ReferencePools::default();

    for raw in source.references().map_err(AppError::Enumerate)? {
        let short = raw.short_name();

        match raw.kind {
            RawKind::RemoteBranch if short.starts_with(&remote_prefix) => {}
            RawKind::Tag => {}
            _ => {
                tracing::debug!(reference = %raw.name, "skipping: not an upstream branch or tag");
                continue;
            }
        }

        if raw.target.is_zero() {
            tracing::debug!(reference = %raw.name, "skipping: no resolvable target");
            continue;
        }

        match raw.kind {
            RawKind::Tag => pools.tags.push(classify_tag(source, &raw)?),
            _ => pools.branches.push(classify_branch(source, &raw)?),
        }
    }

    tracing::debug!(
        branches = pools.branches.len(),
        tags = pools.tags.len(),
        "classified references"
    );

    Ok(pools)
}

fn classify_branch<S: ReferenceSource + ?Sized>(
    source: &S,
    raw: &RawReference,
) -> Result<ReferenceToScan, AppError> {
    let head_commit = source
        .commit(raw.target)
        .map_err(|source| AppError::ResolveCommit {
            name: raw.short_name().to_string(),
            hash: raw.target,
            source,
        })?;

    Ok(reference(raw, RefKind::Branch, head_commit.committed_at, head_commit, BRANCH_SCAN_DEPTH))
}

fn classify_tag<S: ReferenceSource + ?Sized>(
    source: &S,
    raw: &RawReference,
) -> Result<ReferenceToScan, AppError> {
    let commit_id = source
        .resolve_revision(raw.target)
        .map_err(|source| AppError::ResolveRevision {
            name: raw.short_name().to_string(),
            hash: raw.target,
            source,
        })?;

    let head_commit = source
        .commit(commit_id)
        .map_err(|source| AppError::ResolveCommit {
            name: raw.short_name().to_string(),
            hash: commit_id,
            source,
        })?;

    let tag = source
        .tag(raw.target)
        .map_err(|source| AppError::ResolveTag {
            name: raw.short_name().to_string(),
            hash: raw.target,
            source,
        })?;

    // Lightweight tags and taggerless annotated tags fall back to the commit date
    let created_at = tag
        .and_then(|t| t.tagged_at)
        .unwrap_or(head_commit.committed_at);

    Ok(reference(raw, RefKind::Tag, created_at, head_commit, TAG_SCAN_DEPTH))
}

fn reference(
    raw: &RawReference,
    kind: RefKind,
    created_at: DateTime<Utc>,
    head_commit: CommitInfo,
    scan_depth_limit: i32,
) -> ReferenceToScan {
    ReferenceToScan {
        kind,
        name: raw.name.clone(),
        target: raw.target,
        created_at,
        head_commit,
        scan_depth_limit,
    }
}
