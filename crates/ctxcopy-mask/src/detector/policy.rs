//! Allow/deny list policy
//!
//! Entries are lowercased when the configuration is normalized. A value
//! matches a list when it contains one of its entries, compared ASCII
//! case-insensitively. A value that matches both lists is denied.

use aho_corasick::{AhoCorasick, MatchKind};
use tracing::error;

/// Outcome of checking a candidate value against the lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListVerdict {
    /// Always masked, regardless of confidence
    Deny,
    /// Never masked
    Allow,
    Neutral,
}

#[derive(Debug, Clone, Default)]
pub struct ListPolicy {
    deny: Option<AhoCorasick>,
    allow: Option<AhoCorasick>,
}

impl ListPolicy {
    pub fn new(deny_list: &[String], allow_list: &[String]) -> Self {
        Self {
            deny: build_automaton(deny_list, "deny"),
            allow: build_automaton(allow_list, "allow"),
        }
    }

    pub fn verdict(&self, value: &str) -> ListVerdict {
        if self.deny.as_ref().is_some_and(|ac| ac.is_match(value)) {
            ListVerdict::Deny
        } else if self.allow.as_ref().is_some_and(|ac| ac.is_match(value)) {
            ListVerdict::Allow
        } else {
            ListVerdict::Neutral
        }
    }

    /// Byte spans of every literal deny-list occurrence in `text`
    pub fn deny_hits(&self, text: &str) -> Vec<(usize, usize)> {
        match &self.deny {
            Some(ac) => ac.find_iter(text).map(|m| (m.start(), m.end())).collect(),
            None => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.deny.is_none() && self.allow.is_none()
    }
}

fn build_automaton(entries: &[String], list: &str) -> Option<AhoCorasick> {
    let entries: Vec<String> = entries
        .iter()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    if entries.is_empty() {
        return None;
    }

    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .match_kind(MatchKind::LeftmostLongest)
        .build(&entries)
        .map_err(|e| error!(error = %e, "Failed to build {} list automaton, ignoring it", list))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_containment_is_case_insensitive() {
        let policy = ListPolicy::new(&list(&["acme"]), &list(&["example.com"]));

        assert_eq!(policy.verdict("ops@ACME.io"), ListVerdict::Deny);
        assert_eq!(policy.verdict("jane@Example.COM"), ListVerdict::Allow);
        assert_eq!(policy.verdict("jane@other.org"), ListVerdict::Neutral);
    }

    #[test]
    fn test_deny_wins_over_allow() {
        let policy = ListPolicy::new(&list(&["jane"]), &list(&["example.com"]));
        assert_eq!(policy.verdict("jane@example.com"), ListVerdict::Deny);
    }

    #[test]
    fn test_deny_hits() {
        let policy = ListPolicy::new(&list(&["Project Falcon"]), &[]);
        let text = "re: project falcon and PROJECT FALCON";

        assert_eq!(policy.deny_hits(text), vec![(4, 18), (23, 37)]);
    }

    #[test]
    fn test_empty_lists() {
        let policy = ListPolicy::new(&list(&["", "  "]), &[]);
        assert!(policy.is_empty());
        assert_eq!(policy.verdict("anything"), ListVerdict::Neutral);
        assert!(policy.deny_hits("anything").is_empty());
    }
}
