//! Test builders and an in-memory reference source.

use std::collections::HashMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use git2::{ObjectType, Oid};

use crate::models::{CommitInfo, RawKind, RawReference, RefKind, ReferenceToScan, TagInfo};
use crate::source::ReferenceSource;

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// A point in time `days` before `now()`
pub fn at(days: i64) -> DateTime<Utc> {
    now() - Duration::days(days)
}

pub fn oid(seed: &str) -> Oid {
    Oid::hash_object(ObjectType::Blob, seed.as_bytes()).unwrap()
}

fn commit_info(seed: &str, when: DateTime<Utc>) -> CommitInfo {
    CommitInfo {
        id: oid(&format!("commit:{}", seed)),
        committed_at: when,
    }
}

/// Remote branch reference, `short` includes the remote, e.g. `origin/master`
pub fn branch(short: &str, created_at: DateTime<Utc>) -> ReferenceToScan {
    let head_commit = commit_info(short, created_at);
    ReferenceToScan {
        kind: RefKind::Branch,
        name: format!("refs/remotes/{}", short),
        target: head_commit.id,
        created_at,
        head_commit,
        scan_depth_limit: -1,
    }
}

pub fn tag(short: &str, created_at: DateTime<Utc>) -> ReferenceToScan {
    let head_commit = commit_info(short, created_at);
    ReferenceToScan {
        kind: RefKind::Tag,
        name: format!("refs/tags/{}", short),
        target: oid(&format!("tag:{}", short)),
        created_at,
        head_commit,
        scan_depth_limit: 1,
    }
}

pub fn short_names(refs: &[&ReferenceToScan]) -> Vec<String> {
    refs.iter().map(|r| r.short_name().to_string()).collect()
}

#[derive(Default)]
pub struct FakeSource {
    pub refs: Vec<RawReference>,
    pub commits: HashMap<Oid, CommitInfo>,
    pub tags: HashMap<Oid, TagInfo>,
    pub peeled: HashMap<Oid, Oid>,
    pub fail_enumeration: bool,
}

impl FakeSource {
    pub fn with_commit(&mut self, name: &str, kind: RawKind, when: DateTime<Utc>) -> Oid {
        let commit = commit_info(name, when);
        let id = commit.id;
        self.commits.insert(id, commit);
        self.peeled.insert(id, id);
        self.refs.push(RawReference {
            name: name.to_string(),
            target: id,
            kind,
        });
        id
    }

    pub fn remote_branch(&mut self, short: &str, when: DateTime<Utc>) -> Oid {
        self.with_commit(&format!("refs/remotes/{}", short), RawKind::RemoteBranch, when)
    }

    pub fn local_branch(&mut self, short: &str, when: DateTime<Utc>) -> Oid {
        self.with_commit(&format!("refs/heads/{}", short), RawKind::LocalBranch, when)
    }

    pub fn lightweight_tag(&mut self, short: &str, when: DateTime<Utc>) -> Oid {
        self.with_commit(&format!("refs/tags/{}", short), RawKind::Tag, when)
    }

    /// Annotated tag pointing at a commit made at `committed`
    pub fn annotated_tag(
        &mut self,
        short: &str,
        committed: DateTime<Utc>,
        tagged: DateTime<Utc>,
    ) -> Oid {
        let commit = commit_info(short, committed);
        let commit_id = commit.id;
        self.commits.insert(commit_id, commit);

        let tag_id = oid(&format!("tag:{}", short));
        self.tags.insert(
            tag_id,
            TagInfo {
                tagged_at: Some(tagged),
            },
        );
        self.peeled.insert(tag_id, commit_id);
        self.refs.push(RawReference {
            name: format!("refs/tags/{}", short),
            target: tag_id,
            kind: RawKind::Tag,
        });
        tag_id
    }

    pub fn symbolic(&mut self, name: &str, kind: RawKind) {
        self.refs.push(RawReference {
            name: name.to_string(),
            target: Oid::zero(),
            kind,
        });
    }

    /// Reference whose target is absent from the object store
    pub fn dangling(&mut self, name: &str, kind: RawKind) -> Oid {
        let id = oid(&format!("dangling:{}", name));
        self.refs.push(RawReference {
            name: name.to_string(),
            target: id,
            kind,
        });
        id
    }
}

impl ReferenceSource for FakeSource {
    fn references(&self) -> Result<Vec<RawReference>, git2::Error> {
        if self.fail_enumeration {
            return Err(git2::Error::from_str("cannot list references"));
        }
        Ok(self.refs.clone())
    }

    fn commit(&self, id: Oid) -> Result<CommitInfo, git2::Error> {
        self.commits
            .get(&id)
            .cloned()
            .ok_or_else(|| git2::Error::from_str("object not found"))
    }

    fn tag(&self, id: Oid) -> Result<Option<TagInfo>, git2::Error> {
        Ok(self.tags.get(&id).cloned())
    }

    fn resolve_revision(&self, id: Oid) -> Result<Oid, git2::Error> {
        self.peeled
            .get(&id)
            .copied()
            .ok_or_else(|| git2::Error::from_str("revision not found"))
    }
}
