//! Glob matcher for tool and skill scoping.
//!
//! Clients scope the exposed tool set (and skill selection) with simple
//! glob patterns: `*` matches any run of characters, `?` a single
//! character, so `read_*`, `*search*`, and `exec` all work. An empty
//! pattern list or exactly `["*"]` selects everything.

use regex::Regex;

/// Compile one glob pattern into an anchored regex.
fn compile_pattern(pattern: &str) -> Option<Regex> {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).ok()
}

/// Whether `name` matches the glob `pattern`.
pub fn matches_pattern(pattern: &str, name: &str) -> bool {
    compile_pattern(pattern).map_or(false, |re| re.is_match(name))
}

/// Whether a pattern list selects everything.
pub fn selects_all(patterns: &[String]) -> bool {
    patterns.is_empty() || (patterns.len() == 1 && patterns[0] == "*")
}

/// Filter `names` by the pattern list, preserving input order and
/// de-duplicating. An all-selecting list returns every name.
pub fn filter_names<'a, I>(patterns: &[String], names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();

    let select_all = selects_all(patterns);
    for name in names {
        if !seen.insert(name.to_string()) {
            continue;
        }
        if select_all || patterns.iter().any(|p| matches_pattern(p, name)) {
            out.push(name.to_string());
        }
    }
    out
}
