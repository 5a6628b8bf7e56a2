//! Overlap resolution
//!
//! Candidates are ranked by a strategy chain (higher confidence, then earlier
//! start, then longer span) and accepted greedily; a candidate that overlaps
//! an already accepted one is dropped. The survivors are returned in
//! ascending offset order.

use crate::catalog::PiiType;
use crate::chain::StrategyChain;
use once_cell::sync::Lazy;
use std::cmp::Ordering;

/// A scored match that has not yet been turned into a detection
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<'r> {
    pub pii_type: PiiType,
    pub rule: &'r str,
    pub start: usize,
    pub end: usize,
    pub confidence: f32,
    /// Type-tag replacement carried over from a custom rule
    pub replacement: Option<&'r str>,
}

impl Candidate<'_> {
    fn overlaps(&self, other: &Candidate<'_>) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, Copy)]
struct Rank {
    confidence: f32,
    start: usize,
    end: usize,
}

/// Two ranks being compared; `Less` means the first is preferred
type Contest = (Rank, Rank);

fn higher_confidence((a, b): &Contest) -> Option<Ordering> {
    match b.confidence.total_cmp(&a.confidence) {
        Ordering::Equal => None,
        ord => Some(ord),
    }
}

fn earlier_start((a, b): &Contest) -> Option<Ordering> {
    match a.start.cmp(&b.start) {
        Ordering::Equal => None,
        ord => Some(ord),
    }
}

fn longer_span((a, b): &Contest) -> Option<Ordering> {
    match (b.end - b.start).cmp(&(a.end - a.start)) {
        Ordering::Equal => None,
        ord => Some(ord),
    }
}

static PREFERENCE: Lazy<StrategyChain<Contest, Ordering>> = Lazy::new(|| {
    StrategyChain::new()
        .then("higher_confidence", higher_confidence)
        .then("earlier_start", earlier_start)
        .then("longer_span", longer_span)
});

fn preference(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    let rank = |c: &Candidate<'_>| Rank {
        confidence: c.confidence,
        start: c.start,
        end: c.end,
    };
    PREFERENCE.run(&(rank(a), rank(b))).unwrap_or(Ordering::Equal)
}

/// Reduce candidates to a non-overlapping list sorted by start offset
pub fn resolve_overlaps(mut candidates: Vec<Candidate<'_>>) -> Vec<Candidate<'_>> {
    // Stable sort keeps catalog order for complete ties
    candidates.sort_by(preference);

    let mut accepted: Vec<Candidate<'_>> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !accepted.iter().any(|a| a.overlaps(&candidate)) {
            accepted.push(candidate);
        }
    }

    accepted.sort_by_key(|c| c.start);
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(rule: &str, start: usize, end: usize, confidence: f32) -> Candidate<'_> {
        Candidate {
            pii_type: PiiType::Custom,
            rule,
            start,
            end,
            confidence,
            replacement: None,
        }
    }

    fn rules(resolved: &[Candidate<'_>]) -> Vec<String> {
        resolved.iter().map(|c| c.rule.to_string()).collect()
    }

    #[test]
    fn test_higher_confidence_wins() {
        let resolved = resolve_overlaps(vec![
            candidate("phone", 36, 50, 0.75),
            candidate("card", 36, 55, 0.8),
        ]);
        assert_eq!(rules(&resolved), vec!["card"]);
    }

    #[test]
    fn test_tie_prefers_earlier_then_longer() {
        let resolved = resolve_overlaps(vec![
            candidate("later", 5, 15, 0.9),
            candidate("earlier", 2, 8, 0.9),
        ]);
        assert_eq!(rules(&resolved), vec!["earlier"]);

        let resolved = resolve_overlaps(vec![
            candidate("short", 2, 8, 0.9),
            candidate("long", 2, 12, 0.9),
        ]);
        assert_eq!(rules(&resolved), vec!["long"]);
    }

    #[test]
    fn test_output_is_sorted_and_disjoint() {
        let resolved = resolve_overlaps(vec![
            candidate("c", 30, 40, 0.7),
            candidate("a", 0, 10, 0.9),
            candidate("b", 12, 20, 0.8),
            candidate("a2", 5, 14, 0.75),
        ]);

        assert_eq!(rules(&resolved), vec!["a", "b", "c"]);
        for pair in resolved.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
    }

    #[test]
    fn test_adjacent_spans_do_not_overlap() {
        let resolved = resolve_overlaps(vec![candidate("x", 0, 5, 0.9), candidate("y", 5, 9, 0.8)]);
        assert_eq!(resolved.len(), 2);
    }
}
