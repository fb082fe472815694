//! Relative symlink targets
//!
//! Releases, shares and stage pointers all live under one root, so links
//! between them are written relative. The tree can then be moved or mounted
//! elsewhere without breaking.

/// Path from directory `from_dir` to `to_dir`, using `/` separators
///
/// Both inputs are absolute (or both relative to the same base). Empty and
/// `.` segments are ignored. Identical directories yield `"."`.
pub fn relative_link(from_dir: &str, to_dir: &str) -> String {
    let from = segments(from_dir);
    let to = segments(to_dir);

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = Vec::with_capacity(from.len() - common + to.len() - common);
    parts.extend(std::iter::repeat("..").take(from.len() - common));
    parts.extend(to[common..].iter().copied());

    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Link target for share `share_path` placed inside `release_dir`
///
/// The link lives in the share's parent directory within the release, so a
/// share declared as `a/b/c` needs two extra `../` to climb back to the
/// release directory first.
pub fn share_link_target(release_dir: &str, shares_dir: &str, share_path: &str) -> String {
    let share = segments(share_path);
    let depth = share.len().saturating_sub(1);

    let mut target = "../".repeat(depth);
    target.push_str(&relative_link(release_dir, shares_dir));
    for segment in share {
        target.push('/');
        target.push_str(segment);
    }
    target
}

fn segments(path: &str) -> Vec<&str> {
    path.split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != ".")
        .collect()
}
