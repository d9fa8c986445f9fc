//! Glob Pattern Module
//!
//! Key patterns where `*` matches any sequence and everything else is literal.

use regex::Regex;

// == Glob Pattern ==
/// Compiled key pattern, anchored at both ends.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    regex: Regex,
}

impl GlobPattern {
    /// Compiles a glob. Returns None if the pattern cannot be compiled
    /// (e.g. it exceeds the regex size limit); callers treat that as "matches nothing".
    pub fn new(pattern: &str) -> Option<Self> {
        let body = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");

        Regex::new(&format!("^{}$", body))
            .ok()
            .map(|regex| Self { regex })
    }

    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }
}
