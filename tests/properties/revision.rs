//! Property tests for revision resolution.

use std::collections::HashMap;

use proptest::prelude::*;

use cutover::domain::ports::{BranchRef, BranchSource, LiveReleaseLookup};
use cutover::domain::services::RevisionResolver;
use cutover::CutoverResult;

struct Branches(Vec<BranchRef>);

impl BranchSource for Branches {
    fn branches(&self) -> CutoverResult<Vec<BranchRef>> {
        Ok(self.0.clone())
    }
}

struct Live(HashMap<String, String>);

impl LiveReleaseLookup for Live {
    fn live_commit(&self, stage: &str) -> CutoverResult<Option<String>> {
        Ok(self.0.get(stage).cloned())
    }
}

fn branch_name() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z][a-z0-9/_-]{0,12}").unwrap()
}

fn commit() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[0-9a-f]{40}").unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: a branch name always resolves to its tip, never to the name.
    #[test]
    fn property_branch_resolves_to_tip(
        branches in proptest::collection::btree_map(branch_name(), commit(), 1..6),
        pick in any::<prop::sample::Index>(),
    ) {
        let refs: Vec<BranchRef> = branches
            .iter()
            .map(|(name, commit)| BranchRef { name: name.clone(), commit: commit.clone() })
            .collect();
        let chosen = pick.get(&refs).clone();
        let source = Branches(refs);
        let live = Live(HashMap::new());

        let resolved = RevisionResolver::new(&source, &live).resolve(&chosen.name).unwrap();
        prop_assert_eq!(resolved, chosen.commit);
    }

    /// PROPERTY: anything that is not a branch passes through unchanged.
    #[test]
    fn property_unknown_descriptor_is_unchanged(
        descriptor in "[0-9a-f]{7,40}",
    ) {
        let source = Branches(vec![BranchRef { name: "main".into(), commit: "f".repeat(40) }]);
        let live = Live(HashMap::new());

        let resolved = RevisionResolver::new(&source, &live).resolve(&descriptor).unwrap();
        prop_assert_eq!(resolved, descriptor);
    }

    /// PROPERTY: `=stage` substitutes the live commit, then applies branch lookup.
    #[test]
    fn property_stage_indirection_uses_live_commit(
        stage in "[a-z]{2,6}",
        live_commit in commit(),
    ) {
        let source = Branches(Vec::new());
        let live = Live(HashMap::from([(stage.clone(), live_commit.clone())]));

        let resolved = RevisionResolver::new(&source, &live)
            .resolve(&format!("={}", stage))
            .unwrap();
        prop_assert_eq!(resolved, live_commit);
    }
}
