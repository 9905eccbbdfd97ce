//! Scanner for `#<id>` entity references embedded in raw argument text.
//!
//! Unmodeled STEP records keep their argument list as text. Their
//! references still matter for pruning and id remapping, so this module
//! finds and rewrites every `#<digits>` token outside quoted strings.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Matches either a whole quoted STEP string (skipped) or an entity
/// reference (captured).
static REF_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"'(?:[^']|'')*'|#(\d+)").unwrap_or_else(|e| panic!("invalid ref pattern: {e}"))
});

/// Returns every entity id referenced from `text`, in order of appearance.
///
/// Ids inside quoted strings (e.g. a label `'Pin #1'`) are not references.
#[must_use]
pub fn scan_refs(text: &str) -> Vec<u64> {
    REF_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// Rewrites every entity reference in `text` through `remap`.
///
/// Quoted strings are copied through unchanged.
pub fn rewrite_refs(text: &str, mut remap: impl FnMut(u64) -> u64) -> String {
    REF_PATTERN
        .replace_all(text, |caps: &Captures<'_>| match caps.get(1) {
            Some(m) => match m.as_str().parse::<u64>() {
                Ok(id) => format!("#{}", remap(id)),
                Err(_) => caps[0].to_string(),
            },
            None => caps[0].to_string(),
        })
        .into_owned()
}
