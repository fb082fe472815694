//! Property tests for relative link targets.

use proptest::prelude::*;

use cutover::domain::services::{relative_link, share_link_target};

fn segment() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z0-9_-]{1,8}").unwrap()
}

fn segments(max: usize) -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec(segment(), 0..=max)
}

fn absolute(parts: &[String]) -> String {
    format!("/{}", parts.join("/"))
}

/// Follow `link` from directory `from` the way the kernel would
fn follow(from: &str, link: &str) -> String {
    let mut parts: Vec<&str> = from.split('/').filter(|s| !s.is_empty()).collect();
    for part in link.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    format!("/{}", parts.join("/"))
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: following `relative_link(a, b)` from `a` lands on `b`.
    ///
    /// Covers ancestors, descendants and siblings because the shared prefix
    /// and both tails are generated independently (either tail may be empty).
    #[test]
    fn property_link_resolves_to_target(
        common in segments(4),
        from_tail in segments(4),
        to_tail in segments(4),
    ) {
        let from = absolute(&[common.clone(), from_tail].concat());
        let to = absolute(&[common, to_tail].concat());

        let link = relative_link(&from, &to);

        prop_assert_eq!(follow(&from, &link), to);
    }

    /// PROPERTY: links never start with `/`, so the tree stays relocatable.
    #[test]
    fn property_link_is_relative(
        from in segments(5),
        to in segments(5),
    ) {
        let link = relative_link(&absolute(&from), &absolute(&to));
        prop_assert!(!link.starts_with('/'));
        prop_assert!(!link.is_empty());
    }

    /// PROPERTY: a share link placed at `release/<share>` points at `shares/<share>`.
    #[test]
    fn property_share_link_resolves_from_its_parent(
        root in segments(3),
        stage in segment(),
        commit in "[0-9a-f]{7,12}",
        share in proptest::collection::vec(segment(), 1..=4),
    ) {
        let root = absolute(&root);
        let release = format!("{}/releases/{}/{}", root.trim_end_matches('/'), stage, commit);
        let shares = format!("{}/shares/{}", root.trim_end_matches('/'), stage);
        let share_path = share.join("/");

        let target = share_link_target(&release, &shares, &share_path);

        let link_parent = follow(&release, &share[..share.len() - 1].join("/"));
        prop_assert_eq!(
            follow(&link_parent, &target),
            follow(&shares, &share_path)
        );
    }
}
