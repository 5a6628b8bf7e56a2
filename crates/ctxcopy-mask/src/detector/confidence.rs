//! Confidence scoring for raw matches

use crate::catalog::{PatternRule, PiiType};

/// Characters inspected on each side of a match
pub(crate) const CONTEXT_WINDOW: usize = 100;

const POSITIVE_WORDS: &[&str] = &[
    "user", "customer", "client", "member", "contact", "personal", "private",
];
const NEGATIVE_WORDS: &[&str] = &["example", "sample", "test", "demo", "dummy", "placeholder"];
const PLACEHOLDER_PREFIXES: &[&str] = &[
    "xxxx", "0000", "n/a", "tbd", "test", "example", "dummy", "sample",
];

const POSITIVE_BOOST: f32 = 0.05;
const NEGATIVE_PENALTY: f32 = 0.3;
const FIELD_KEYWORD_BOOST: f32 = 0.2;
const CHECKSUM_BOOST: f32 = 0.1;
const CHECKSUM_PENALTY: f32 = 0.8;

/// How a checksum outcome affects a candidate
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ChecksumEffect {
    Passed,
    Failed { mandatory: bool },
    NotApplicable,
}

impl ChecksumEffect {
    pub(crate) fn evaluate(rule: &PatternRule, value: &str, mandatory: bool) -> Self {
        match rule.checksum {
            Some(check) if check(value) => ChecksumEffect::Passed,
            Some(_) => ChecksumEffect::Failed { mandatory },
            None => ChecksumEffect::NotApplicable,
        }
    }

    /// Adjusted confidence, or `None` when the match must be discarded
    fn apply(self, confidence: f32) -> Option<f32> {
        match self {
            ChecksumEffect::Passed => Some((confidence + CHECKSUM_BOOST).min(1.0)),
            ChecksumEffect::Failed { mandatory: true } => None,
            ChecksumEffect::Failed { mandatory: false } => Some(confidence * CHECKSUM_PENALTY),
            ChecksumEffect::NotApplicable => Some(confidence),
        }
    }
}

/// Multiplier below 1.0 for values that look fabricated
pub(crate) fn anomaly_multiplier(value: &str) -> f32 {
    let lowered = value.to_lowercase();

    if PLACEHOLDER_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
        return 0.1;
    }

    let significant: Vec<char> = value.chars().filter(|c| c.is_alphanumeric()).collect();
    if significant.len() > 1 && significant.iter().all(|&c| c == significant[0]) {
        return 0.15;
    }

    if longest_digit_run(value) >= 5 {
        return 0.2;
    }

    1.0
}

/// Longest run of one repeated digit, ignoring separators
fn longest_digit_run(value: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    let mut previous = None;

    for c in value.chars().filter(|c| c.is_ascii_digit()) {
        current = if previous == Some(c) { current + 1 } else { 1 };
        previous = Some(c);
        longest = longest.max(current);
    }

    longest
}

/// Whole alphabetic words of the context, lowercased
fn words(context: &str) -> impl Iterator<Item = String> + '_ {
    context
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|token| !token.is_empty() && token.chars().all(char::is_alphabetic))
        .map(str::to_lowercase)
}

fn word_matches(word: &str, list: &[&str]) -> bool {
    list.iter().any(|w| word.starts_with(w))
}

/// Additive adjustment from the words surrounding a match
pub(crate) fn context_adjustment(pii_type: PiiType, before: &str, after: &str) -> f32 {
    let mut positive = false;
    let mut negative = false;

    for word in words(before).chain(words(after)) {
        positive |= word_matches(&word, POSITIVE_WORDS);
        negative |= word_matches(&word, NEGATIVE_WORDS);
    }

    let mut adjustment = 0.0;
    if positive {
        adjustment += POSITIVE_BOOST;
    }
    if negative {
        adjustment -= NEGATIVE_PENALTY;
    }

    let surrounding = format!("{} {}", before, after).to_lowercase();
    if pii_type
        .field_keywords()
        .iter()
        .any(|k| surrounding.contains(k))
    {
        adjustment += FIELD_KEYWORD_BOOST;
    }

    adjustment
}

/// Up to `window` characters before `start` and after `end`
pub(crate) fn context_around(text: &str, start: usize, end: usize, window: usize) -> (&str, &str) {
    let before = &text[..start];
    let before_start = before
        .char_indices()
        .rev()
        .nth(window.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(0);

    let after = &text[end..];
    let after_end = after
        .char_indices()
        .nth(window)
        .map(|(i, _)| i)
        .unwrap_or(after.len());

    (&before[before_start..], &after[..after_end])
}

/// Score a raw match: base x anomaly + context, clamped, then the checksum effect
pub(crate) fn score(
    rule: &PatternRule,
    value: &str,
    before: &str,
    after: &str,
    checksum: ChecksumEffect,
) -> Option<f32> {
    let confidence = rule.base_confidence * anomaly_multiplier(value)
        + context_adjustment(rule.pii_type, before, after);

    checksum.apply(confidence.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin_rules;

    fn rule(name: &str) -> &'static PatternRule {
        builtin_rules().iter().find(|r| r.name == name).unwrap()
    }

    #[test]
    fn test_anomalies() {
        assert_eq!(anomaly_multiplier("4532 1234 5678 9010"), 1.0);
        assert_eq!(anomaly_multiplier("test@example.com"), 0.1);
        assert_eq!(anomaly_multiplier("XXXX-XXXX-1234"), 0.1);
        assert_eq!(anomaly_multiplier("1111 1111 1111 1111"), 0.15);
        assert_eq!(anomaly_multiplier("4000 0000 1234 5678"), 0.2);
    }

    #[test]
    fn test_context_words_are_whole_tokens() {
        // "example" inside an email address is not a negative context word
        let adj = context_adjustment(PiiType::CreditCard, "jane.doe@example.com, card ", "");
        assert!((adj - 0.2).abs() < 1e-6);

        let adj = context_adjustment(PiiType::CreditCard, "Example card: ", "");
        assert!((adj - (0.2 - 0.3)).abs() < 1e-6);

        let adj = context_adjustment(PiiType::Email, "Customer ", "");
        assert!((adj - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_context_window_excludes_match() {
        let text = "abc MATCH def";
        let (before, after) = context_around(text, 4, 9, 100);
        assert_eq!(before, "abc ");
        assert_eq!(after, " def");

        let (before, after) = context_around(text, 4, 9, 2);
        assert_eq!(before, "c ");
        assert_eq!(after, " d");
    }

    #[test]
    fn test_context_window_respects_char_boundaries() {
        let text = "é€ X ü";
        let start = text.find('X').unwrap();
        let (before, after) = context_around(text, start, start + 1, 2);
        assert_eq!(before, "€ ");
        assert_eq!(after, " ü");
    }

    #[test]
    fn test_scenario_card_score() {
        let card = rule("credit_card");
        let value = "4532 1234 5678 9010";
        let checksum = ChecksumEffect::evaluate(card, value, false);
        assert_eq!(checksum, ChecksumEffect::Failed { mandatory: false });

        let score = score(card, value, "Contact: jane.doe@example.com, card ", "", checksum).unwrap();
        assert!((score - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_mandatory_checksum_discards() {
        let abn = rule("australian_abn");
        let checksum = ChecksumEffect::evaluate(abn, "12 345 678 901", true);
        assert_eq!(score(abn, "12 345 678 901", "ABN ", "", checksum), None);

        let checksum = ChecksumEffect::evaluate(abn, "51 824 753 556", true);
        assert_eq!(score(abn, "51 824 753 556", "ABN ", "", checksum), Some(1.0));
    }
}
