use std::path::Path;

use chrono::{DateTime, Utc};
use git2::{ObjectType, Oid, Repository};

use crate::models::{CommitInfo, RawKind, RawReference, TagInfo};

/// Primitives the classifier needs from a version-control backend
pub trait ReferenceSource {
    /// Every reference in the repository, symbolic ones with a zero target
    fn references(&self) -> Result<Vec<RawReference>, git2::Error>;

    fn commit(&self, id: Oid) -> Result<CommitInfo, git2::Error>;

    /// `Ok(None)` when `id` is not a tag object, i.e. the tag is lightweight
    fn tag(&self, id: Oid) -> Result<Option<TagInfo>, git2::Error>;

    /// Peel whatever `id` names down to a commit id
    fn resolve_revision(&self, id: Oid) -> Result<Oid, git2::Error>;
}

pub struct GitRepository {
    repo: Repository,
}

impl GitRepository {
    /// Open the repository containing `path`
    pub fn discover(path: &Path) -> Result<Self, git2::Error> {
        let repo = Repository::discover(path)?;
        tracing::debug!(path = %repo.path().display(), "opened git repository");
        Ok(Self { repo })
    }
}

impl ReferenceSource for GitRepository {
    fn references(&self) -> Result<Vec<RawReference>, git2::Error> {
        let mut refs = Vec::new();
        for reference in self.repo.references()? {
            let reference = reference?;
            let Some(name) = reference.name() else {
                tracing::debug!("skipping reference with non UTF-8 name");
                continue;
            };

            let kind = if reference.is_remote() {
                RawKind::RemoteBranch
            } else if reference.is_tag() {
                RawKind::Tag
            } else if reference.is_branch() {
                RawKind::LocalBranch
            } else {
                RawKind::Other
            };

            refs.push(RawReference {
                name: name.to_string(),
                target: reference.target().unwrap_or_else(Oid::zero),
                kind,
            });
        }
        Ok(refs)
    }

    fn commit(&self, id: Oid) -> Result<CommitInfo, git2::Error> {
        let commit = self.repo.find_commit(id)?;
        let committed_at = git_time(commit.committer().when())?;
        Ok(CommitInfo { id, committed_at })
    }

    fn tag(&self, id: Oid) -> Result<Option<TagInfo>, git2::Error> {
        let object = self.repo.find_object(id, None)?;
        if object.kind() != Some(ObjectType::Tag) {
            return Ok(None);
        }
        let Some(tag) = object.as_tag() else {
            return Ok(None);
        };
        let tagged_at = match tag.tagger() {
            Some(tagger) => Some(git_time(tagger.when())?),
            None => None,
        };
        Ok(Some(TagInfo { tagged_at }))
    }

    fn resolve_revision(&self, id: Oid) -> Result<Oid, git2::Error> {
        let object = self.repo.revparse_single(&id.to_string())?;
        Ok(object.peel_to_commit()?.id())
    }
}

fn git_time(time: git2::Time) -> Result<DateTime<Utc>, git2::Error> {
    DateTime::from_timestamp(time.seconds(), 0)
        .ok_or_else(|| git2::Error::from_str("timestamp out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{Signature, Time};
    use tempfile::TempDir;

    fn signature(secs: i64) -> Signature<'static> {
        Signature::new("Dev", "dev@example.com", &Time::new(secs, 0)).unwrap()
    }

    fn commit_at(repo: &Repository, secs: i64, message: &str) -> Oid {
        let tree_id = repo.index().unwrap().write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = signature(secs);
        repo.commit(None, &sig, &sig, message, &tree, &[]).unwrap()
    }

    #[test]
    fn test_enumerates_and_resolves_references() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        let c1 = commit_at(&repo, 1_700_000_000, "first");
        let c2 = commit_at(&repo, 1_700_100_000, "second");

        repo.reference("refs/remotes/origin/master", c1, true, "test").unwrap();
        repo.reference("refs/heads/local", c2, true, "test").unwrap();
        repo.reference_symbolic(
            "refs/remotes/origin/HEAD",
            "refs/remotes/origin/master",
            true,
            "test",
        )
        .unwrap();

        let c2_obj = repo.find_object(c2, None).unwrap();
        repo.tag_lightweight("light", &c2_obj, false).unwrap();
        let tag_id = repo
            .tag("annotated", &c2_obj, &signature(1_700_200_000), "release", false)
            .unwrap();

        let source = GitRepository::discover(dir.path()).unwrap();
        let refs = source.references().unwrap();

        let find = |name: &str| refs.iter().find(|r| r.name == name).unwrap();
        assert_eq!(find("refs/remotes/origin/master").kind, RawKind::RemoteBranch);
        assert_eq!(find("refs/remotes/origin/master").target, c1);
        assert_eq!(find("refs/heads/local").kind, RawKind::LocalBranch);
        assert_eq!(find("refs/tags/light").kind, RawKind::Tag);
        assert_eq!(find("refs/tags/annotated").target, tag_id);
        assert!(find("refs/remotes/origin/HEAD").target.is_zero());

        let commit = source.commit(c1).unwrap();
        assert_eq!(commit.committed_at.timestamp(), 1_700_000_000);
        assert_eq!(commit.id, c1);

        assert_eq!(source.tag(c2).unwrap(), None);
        let annotated = source.tag(tag_id).unwrap().unwrap();
        assert_eq!(annotated.tagged_at.unwrap().timestamp(), 1_700_200_000);

        assert_eq!(source.resolve_revision(tag_id).unwrap(), c2);
        assert_eq!(source.resolve_revision(c2).unwrap(), c2);
    }

    #[test]
    fn test_commit_time_is_committer_not_author() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let tree_id = repo.index().unwrap().write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let id = repo
            .commit(
                None,
                &signature(1_600_000_000),
                &signature(1_650_000_000),
                "rebased",
                &tree,
                &[],
            )
            .unwrap();

        let source = GitRepository::discover(dir.path()).unwrap();
        let commit = source.commit(id).unwrap();
        assert_eq!(commit.id, id);
        assert_eq!(commit.committed_at.timestamp(), 1_650_000_000);
    }

    #[test]
    fn test_missing_commit_is_error() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        let source = GitRepository::discover(dir.path()).unwrap();

        let missing = Oid::from_str("1111111111111111111111111111111111111111").unwrap();
        assert!(source.commit(missing).is_err());
    }
}
