//! Regex-based detector implementation

use crate::catalog::{PatternCatalog, PatternRule, PiiType};
use crate::config::MaskingConfig;
use crate::detector::confidence::{self, CONTEXT_WINDOW, ChecksumEffect};
use crate::detector::policy::{ListPolicy, ListVerdict};
use crate::detector::resolve::{Candidate, resolve_overlaps};
use crate::detector::{Detection, Detector, LineIndex};
use crate::masker::StandardMasker;
use tracing::debug;

/// Rule name reported for literal deny-list hits
pub const DENY_LIST_RULE: &str = "deny_list";

/// Detector running the configured pattern catalog over a unit of text
#[derive(Debug, Clone)]
pub struct RegexDetector {
    config: MaskingConfig,
    catalog: PatternCatalog,
    policy: ListPolicy,
    masker: StandardMasker,
    threshold: f32,
    tag_filter: bool,
}

impl RegexDetector {
    /// Build a detector for one masking pass
    pub fn new(config: &MaskingConfig) -> Self {
        Self {
            catalog: PatternCatalog::for_config(config),
            policy: ListPolicy::new(&config.deny_list, &config.allow_list),
            masker: StandardMasker::from_config(config),
            threshold: config.effective_threshold(),
            config: config.clone(),
            tag_filter: true,
        }
    }

    /// Keep matches that look like they sit inside a tag. For callers that
    /// already confine masking to character data.
    pub fn without_tag_filter(mut self) -> Self {
        self.tag_filter = false;
        self
    }

    pub fn masker(&self) -> &StandardMasker {
        &self.masker
    }

    pub fn policy(&self) -> &ListPolicy {
        &self.policy
    }

    pub fn config(&self) -> &MaskingConfig {
        &self.config
    }

    /// Scored candidates before overlap resolution and thresholding
    pub fn candidates<'s>(&'s self, text: &str) -> Vec<Candidate<'s>> {
        let mut candidates = Vec::new();

        for rule in self.catalog.rules() {
            for caps in rule.regex.captures_iter(text) {
                let Some(m) = rule.value_group.and_then(|g| caps.get(g)).or_else(|| caps.get(0))
                else {
                    continue;
                };
                if let Some(candidate) = self.evaluate(rule, text, m.start(), m.end()) {
                    candidates.push(candidate);
                }
            }
        }

        for (start, end) in self.policy.deny_hits(text) {
            candidates.push(Candidate {
                pii_type: PiiType::Custom,
                rule: DENY_LIST_RULE,
                start,
                end,
                confidence: 1.0,
                replacement: None,
            });
        }

        candidates
    }

    fn evaluate<'s>(
        &'s self,
        rule: &'s PatternRule,
        text: &str,
        start: usize,
        end: usize,
    ) -> Option<Candidate<'s>> {
        let value = &text[start..end];

        // Empty matches and already-masked text are never candidates
        if value.trim().is_empty() || value.contains('*') {
            return None;
        }

        if (self.tag_filter && inside_tag(text, start, end)) || json_field_name(text, start, end) {
            return None;
        }

        if rule.validator.is_some_and(|validate| !validate(value)) {
            return None;
        }

        if rule.pii_type.is_numeric_identifier() && embedded_in_number(text, start, end) {
            return None;
        }

        if let Some(context) = &rule.context {
            let (before, _) = confidence::context_around(text, start, end, context.window);
            if !context.accepts(before) {
                return None;
            }
        }

        let confidence = match self.policy.verdict(value) {
            ListVerdict::Allow => return None,
            ListVerdict::Deny => 1.0,
            ListVerdict::Neutral => {
                let (before, after) = confidence::context_around(text, start, end, CONTEXT_WINDOW);
                let checksum = ChecksumEffect::evaluate(
                    rule,
                    value,
                    self.config.is_checksum_mandatory(rule.pii_type),
                );
                confidence::score(rule, value, before, after, checksum)?
            }
        };

        Some(Candidate {
            pii_type: rule.pii_type,
            rule: &rule.name,
            start,
            end,
            confidence,
            replacement: rule.replacement.as_deref(),
        })
    }

    fn to_detection(&self, text: &str, index: &LineIndex<'_>, candidate: Candidate<'_>) -> Detection {
        let value = &text[candidate.start..candidate.end];
        let (line, column) = index.position(candidate.start);

        Detection {
            pii_type: candidate.pii_type,
            rule: candidate.rule.to_string(),
            start: candidate.start,
            end: candidate.end,
            line,
            column,
            text: value.to_string(),
            masked: self
                .masker
                .mask_value(value, candidate.pii_type, candidate.replacement),
            confidence: candidate.confidence,
        }
    }
}

impl Detector for RegexDetector {
    fn detect(&self, text: &str) -> Vec<Detection> {
        if text.is_empty() || (self.catalog.is_empty() && self.policy.is_empty()) {
            return Vec::new();
        }

        let candidates = self.candidates(text);
        let raw = candidates.len();

        let index = LineIndex::new(text);
        let detections: Vec<Detection> = resolve_overlaps(candidates)
            .into_iter()
            .filter(|c| c.confidence >= self.threshold)
            .map(|c| self.to_detection(text, &index, c))
            .collect();

        debug!(
            "Detected {} values from {} raw matches ({} bytes)",
            detections.len(),
            raw,
            text.len()
        );

        detections
    }

    fn supported_types(&self) -> Vec<PiiType> {
        let mut types = self.catalog.types();
        if !self.policy.is_empty() && !types.contains(&PiiType::Custom) {
            types.push(PiiType::Custom);
        }
        types
    }
}

/// Whether the span sits in the attribute list of a start tag such as
/// `<a href="...">`
fn inside_tag(text: &str, start: usize, end: usize) -> bool {
    let before = &text[..start];
    let Some(open) = before.rfind('<') else {
        return false;
    };
    let tag = &before[open + 1..];
    if tag.contains('>') {
        return false;
    }

    // `<` must open a name followed by whitespace; `a < b` and `<jane@corp.io>` do not
    let name_len = tag
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '.' | '-')))
        .unwrap_or(tag.len());
    let opens_tag = tag.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
        && tag[name_len..].starts_with(char::is_whitespace);

    let after = &text[end..];
    opens_tag
        && after
            .find('>')
            .is_some_and(|gt| after.find('<').is_none_or(|lt| gt < lt))
}

/// Whether the span is a JSON field name, as in `{"jane@corp.io": 1}`
fn json_field_name(text: &str, start: usize, end: usize) -> bool {
    text[..start].ends_with('"')
        && text[end..]
            .strip_prefix('"')
            .is_some_and(|rest| rest.trim_start().starts_with(':'))
}

/// Whether the span is carved out of a longer run of digit groups
fn embedded_in_number(text: &str, start: usize, end: usize) -> bool {
    let spaced = text[start..end].contains(' ');
    let joins = |c: char| c == '-' || c == '.' || (spaced && c == ' ');

    let mut before = text[..start].chars().rev();
    let touches_before = match before.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some(c) if joins(c) => before.next().is_some_and(|d| d.is_ascii_digit()),
        _ => false,
    };

    let mut after = text[end..].chars();
    let touches_after = match after.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some(c) if joins(c) => after.next().is_some_and(|d| d.is_ascii_digit()),
        _ => false,
    };

    touches_before || touches_after
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inside_tag() {
        let xml = r#"<user email="jane@corp.com">jane@corp.com</user>"#;
        let first = xml.find("jane").unwrap();
        let second = xml.rfind("jane").unwrap();
        assert!(inside_tag(xml, first, first + 13));
        assert!(!inside_tag(xml, second, second + 13));
    }

    #[test]
    fn test_angle_brackets_outside_tags() {
        let mailbox = "From: Jane Doe <jane@corp.io>";
        let at = mailbox.find("jane").unwrap();
        assert!(!inside_tag(mailbox, at, at + 12));

        let comparison = "if a < b mail jane@corp.io >";
        let at = comparison.find("jane").unwrap();
        assert!(!inside_tag(comparison, at, at + 12));

        let cdata = "<m><![CDATA[x jane@corp.io]]></m>";
        let at = cdata.find("jane").unwrap();
        assert!(!inside_tag(cdata, at, at + 12));
    }

    #[test]
    fn test_json_field_name() {
        let json = r#"{"jane@corp.com": 1, "k": "jane@corp.com"}"#;
        let key = json.find("jane").unwrap();
        let value = json.rfind("jane").unwrap();
        assert!(json_field_name(json, key, key + 13));
        assert!(!json_field_name(json, value, value + 13));
    }

    #[test]
    fn test_embedded_in_number() {
        let card = "4532 1234 5678 9010";
        // A phone-shaped prefix of the card
        assert!(embedded_in_number(card, 0, 14));
        assert!(!embedded_in_number(card, 0, card.len()));

        let phones = "555-123-4567 555-987-6543";
        assert!(!embedded_in_number(phones, 0, 12));
        assert!(embedded_in_number("555-987-6543", 0, 7));
    }

    #[test]
    fn test_supported_types_include_deny_list() {
        let mut config = MaskingConfig::enabled();
        config.mode = crate::config::MaskingMode::Manual;
        config.types.insert(PiiType::Email, true);
        config.deny_list = vec!["falcon".to_string()];

        let detector = RegexDetector::new(&config);
        assert_eq!(detector.supported_types(), vec![PiiType::Email, PiiType::Custom]);
    }
}
