//! Revision resolution
//!
//! Turns `--revision` input into the identifier releases are keyed by:
//! `=stage` is replaced by that stage's live commit, then branch names are
//! replaced by their tip commit; anything else passes through unchanged.
//!
//! The result names a directory under `releases/<stage>`, so a value that is
//! not a single path segment (a tag such as `rel/1.0`) must be a remote tag
//! and is replaced by the commit it points at.

use tracing::debug;

use crate::domain::ports::{BranchSource, LiveReleaseLookup};
use crate::domain::value_objects::RevisionDescriptor;
use crate::error::{CutoverError, CutoverResult};

pub struct RevisionResolver<'a> {
    branches: &'a dyn BranchSource,
    live: &'a dyn LiveReleaseLookup,
}

impl<'a> RevisionResolver<'a> {
    pub fn new(branches: &'a dyn BranchSource, live: &'a dyn LiveReleaseLookup) -> Self {
        Self { branches, live }
    }

    /// Resolve a descriptor to a commit-ish
    pub fn resolve(&self, descriptor: &str) -> CutoverResult<String> {
        let unresolved = || CutoverError::UnresolvedRevision {
            revision: descriptor.to_string(),
        };

        let working = match RevisionDescriptor::parse(descriptor) {
            RevisionDescriptor::LiveOf(stage) => {
                let live = self.live.live_commit(&stage)?.unwrap_or_default();
                debug!(stage = %stage, live = %live, "resolved stage indirection");
                live
            }
            RevisionDescriptor::CommitIsh(rev) => rev,
        };

        if working.is_empty() {
            return Err(unresolved());
        }

        let branches = self.branches.branches()?;
        if let Some(branch) = branches.iter().find(|b| b.name == working) {
            debug!(branch = %branch.name, commit = %branch.commit, "resolved branch tip");
            return Ok(branch.commit.clone());
        }

        if is_release_name(&working) {
            return Ok(working);
        }

        let tags = self.branches.tags()?;
        match tags.iter().find(|t| t.name == working) {
            Some(tag) => {
                debug!(tag = %tag.name, commit = %tag.commit, "resolved tag");
                Ok(tag.commit.clone())
            }
            None => Err(unresolved()),
        }
    }

    /// Commit currently live on `stage`, if any
    pub fn current_live_commit(&self, stage: &str) -> CutoverResult<Option<String>> {
        self.live.live_commit(stage)
    }
}

/// Whether `value` can be used as one directory name under `releases/<stage>`
pub fn is_release_name(value: &str) -> bool {
    !value.is_empty()
        && value != "."
        && value != ".."
        && !value.starts_with('-')
        && !value.contains(['/', '\\'])
        && !value.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::BranchRef;
    use std::collections::HashMap;

    struct Branches(Vec<BranchRef>);

    impl BranchSource for Branches {
        fn branches(&self) -> CutoverResult<Vec<BranchRef>> {
            Ok(self.0.clone())
        }

        fn tags(&self) -> CutoverResult<Vec<BranchRef>> {
            Ok(vec![BranchRef {
                name: "rel/1.0".into(),
                commit: "7a9c0de".into(),
            }])
        }
    }

    struct Live(HashMap<String, String>);

    impl LiveReleaseLookup for Live {
        fn live_commit(&self, stage: &str) -> CutoverResult<Option<String>> {
            Ok(self.0.get(stage).cloned())
        }
    }

    fn fixtures() -> (Branches, Live) {
        let branches = Branches(vec![
            BranchRef {
                name: "main".into(),
                commit: "abc123".into(),
            },
            BranchRef {
                name: "release/2.0".into(),
                commit: "def456".into(),
            },
        ]);
        let live = Live(HashMap::from([
            ("prod".to_string(), "0ff1ce".to_string()),
            ("staging".to_string(), "main".to_string()),
        ]));
        (branches, live)
    }

    #[test]
    fn branch_name_resolves_to_tip() {
        let (b, l) = fixtures();
        let resolver = RevisionResolver::new(&b, &l);
        assert_eq!(resolver.resolve("main").unwrap(), "abc123");
        assert_eq!(resolver.resolve("release/2.0").unwrap(), "def456");
    }

    #[test]
    fn non_branch_passes_through() {
        let (b, l) = fixtures();
        let resolver = RevisionResolver::new(&b, &l);
        assert_eq!(resolver.resolve("v1.4.2").unwrap(), "v1.4.2");
        assert_eq!(resolver.resolve("9fceb02").unwrap(), "9fceb02");
        // prefix of a branch name is not a match
        assert_eq!(resolver.resolve("mai").unwrap(), "mai");
    }

    #[test]
    fn tag_with_slash_resolves_to_commit() {
        let (b, l) = fixtures();
        let resolver = RevisionResolver::new(&b, &l);
        assert_eq!(resolver.resolve("rel/1.0").unwrap(), "7a9c0de");
    }

    #[test]
    fn unknown_nested_revision_fails() {
        let (b, l) = fixtures();
        let resolver = RevisionResolver::new(&b, &l);
        for rev in ["rel/2.0", "../../etc", "..", "-rf"] {
            let err = resolver.resolve(rev).unwrap_err();
            assert!(matches!(err, CutoverError::UnresolvedRevision { .. }), "{}", rev);
        }
    }

    #[test]
    fn release_names_are_single_segments() {
        assert!(is_release_name("v1.4.2"));
        assert!(is_release_name("9fceb02"));
        assert!(!is_release_name("rel/1.0"));
        assert!(!is_release_name(".."));
        assert!(!is_release_name("a b"));
    }

    #[test]
    fn indirection_uses_live_commit() {
        let (b, l) = fixtures();
        let resolver = RevisionResolver::new(&b, &l);
        assert_eq!(resolver.resolve("=prod").unwrap(), "0ff1ce");
    }

    #[test]
    fn indirection_reapplies_branch_resolution() {
        let (b, l) = fixtures();
        let resolver = RevisionResolver::new(&b, &l);
        assert_eq!(resolver.resolve("=staging").unwrap(), "abc123");
    }

    #[test]
    fn indirection_without_live_release_fails() {
        let (b, l) = fixtures();
        let resolver = RevisionResolver::new(&b, &l);
        let err = resolver.resolve("=dev").unwrap_err();
        assert!(matches!(err, CutoverError::UnresolvedRevision { ref revision } if revision == "=dev"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn empty_descriptor_fails() {
        let (b, l) = fixtures();
        let resolver = RevisionResolver::new(&b, &l);
        assert!(resolver.resolve("").is_err());
    }

    #[test]
    fn current_live_commit_reads_pointer() {
        let (b, l) = fixtures();
        let resolver = RevisionResolver::new(&b, &l);
        assert_eq!(resolver.current_live_commit("prod").unwrap().as_deref(), Some("0ff1ce"));
        assert_eq!(resolver.current_live_commit("dev").unwrap(), None);
    }
}
