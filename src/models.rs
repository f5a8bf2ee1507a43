use chrono::{DateTime, Utc};
use git2::Oid;
use serde::Serialize;

use crate::policy::Limit;

const REMOTES_PREFIX: &str = "refs/remotes/";
const TAGS_PREFIX: &str = "refs/tags/";
const HEADS_PREFIX: &str = "refs/heads/";

/// How the reference source classified a reference during enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawKind {
    RemoteBranch,
    LocalBranch,
    Tag,
    Other,
}

/// One entry yielded by `ReferenceSource::references`
#[derive(Debug, Clone)]
pub struct RawReference {
    /// Full reference name, e.g. `refs/remotes/origin/master`
    pub name: String,
    /// Zero for symbolic references without a concrete target
    pub target: Oid,
    pub kind: RawKind,
}

impl RawReference {
    pub fn short_name(&self) -> &str {
        short_name(&self.name)
    }
}

/// Strip the well-known namespace prefix from a full reference name
pub fn short_name(name: &str) -> &str {
    [REMOTES_PREFIX, TAGS_PREFIX, HEADS_PREFIX]
        .iter()
        .find_map(|prefix| name.strip_prefix(prefix))
        .unwrap_or(name)
}

/// Resolved commit at the tip of a reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub id: Oid,
    pub committed_at: DateTime<Utc>,
}

/// Annotated tag object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagInfo {
    /// Tags created without a tagger signature have no date of their own
    pub tagged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefKind {
    Branch,
    Tag,
}

impl std::fmt::Display for RefKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefKind::Branch => write!(f, "branch"),
            RefKind::Tag => write!(f, "tag"),
        }
    }
}

/// Stable identity of a reference within one engine run.
///
/// A branch and a tag may share a short name; the kind and the full name keep
/// them apart, and the target pins the snapshot the reference was read from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RefKey {
    pub kind: RefKind,
    pub name: String,
    pub target: Oid,
}

/// A classified branch or tag under scan
#[derive(Debug, Clone)]
pub struct ReferenceToScan {
    pub kind: RefKind,
    /// Full reference name
    pub name: String,
    pub target: Oid,
    pub created_at: DateTime<Utc>,
    pub head_commit: CommitInfo,
    /// `-1` walks the whole history, `1` looks at the tip only
    pub scan_depth_limit: i32,
}

impl ReferenceToScan {
    pub fn key(&self) -> RefKey {
        RefKey {
            kind: self.kind,
            name: self.name.clone(),
            target: self.target,
        }
    }

    pub fn short_name(&self) -> &str {
        short_name(&self.name)
    }

    /// Short name without the remote segment for branches, e.g. `origin/release` -> `release`
    pub fn match_name(&self) -> &str {
        let short = self.short_name();
        match self.kind {
            RefKind::Branch => short.split_once('/').map_or(short, |(_, rest)| rest),
            RefKind::Tag => short,
        }
    }
}

/// Branch and tag pools produced by classification
#[derive(Debug, Clone, Default)]
pub struct ReferencePools {
    pub branches: Vec<ReferenceToScan>,
    pub tags: Vec<ReferenceToScan>,
}

/// A retained reference with the image sub-policy attached by the engine
#[derive(Debug, Clone)]
pub struct ScanTarget {
    pub reference: ReferenceToScan,
    pub images_cleanup_keep_policy: Limit,
}

impl std::fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reference.short_name())?;
        if !self.images_cleanup_keep_policy.is_empty() {
            write!(f, " ({})", self.images_cleanup_keep_policy)?;
        }
        Ok(())
    }
}

/// Trace record of one evaluated keep policy
#[derive(Debug, Clone, Serialize)]
pub struct PolicyMatch {
    pub policy: String,
    pub references: Vec<String>,
}

/// Result of running the retention engine
#[derive(Debug, Clone, Default)]
pub struct ScanPlan {
    pub trace: Vec<PolicyMatch>,
    /// Branches first, then tags, each newest first
    pub targets: Vec<ScanTarget>,
}
