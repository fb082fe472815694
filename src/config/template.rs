//! `{{ name }}` substitution in configured strings

use std::collections::BTreeMap;

/// Replace every `{{ name }}` whose name is in `vars`
///
/// Whitespace inside the braces is optional. Unknown names and unterminated
/// openers are left verbatim.
pub fn resolve_template(input: &str, vars: &BTreeMap<&str, String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = after[..end].trim();
        match vars.get(name) {
            Some(value) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}
