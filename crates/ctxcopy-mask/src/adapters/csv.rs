//! CSV/TSV/PSV adapter
//!
//! Each cell is scanned on its own, with offsets relative to the cell, and
//! rewritten in place. Delimiters, quotes and line endings are copied through
//! unchanged, so a match can never leak into a neighbouring cell.

use crate::adapters::AdapterOutput;
use crate::catalog::PiiType;
use crate::config::{CsvOptions, HeaderMode, MaskingConfig};
use crate::detector::{Detection, Detector, LineIndex, ListVerdict, RegexDetector};
use crate::error::Result;
use crate::masker::{MASK_CHAR, Masker};
use crate::memo::{BoundedMemo, DEFAULT_MEMO_CAPACITY};
use std::collections::BTreeSet;
use tracing::debug;

/// Candidate delimiters; earlier entries win ties
pub const DELIMITERS: [char; 5] = [',', '\t', '|', ';', ':'];

/// Rule name reported for whole cells masked because of their column
pub const SENSITIVE_COLUMN_RULE: &str = "sensitive_column";

const SENSITIVE_COLUMN_CONFIDENCE: f32 = 0.95;

/// Normalized header keywords and the category they imply
const SENSITIVE_COLUMNS: &[(&str, PiiType)] = &[
    ("email", PiiType::Email),
    ("phone", PiiType::Phone),
    ("mobile", PiiType::Phone),
    ("fax", PiiType::Phone),
    ("dob", PiiType::DateOfBirth),
    ("dateofbirth", PiiType::DateOfBirth),
    ("birthdate", PiiType::DateOfBirth),
    ("ssn", PiiType::Ssn),
    ("socialsecurity", PiiType::Ssn),
    ("tfn", PiiType::AustralianTfn),
    ("taxfile", PiiType::AustralianTfn),
    ("abn", PiiType::AustralianAbn),
    ("bsb", PiiType::AustralianBsb),
    ("medicare", PiiType::AustralianMedicare),
    ("iban", PiiType::Iban),
    ("creditcard", PiiType::CreditCard),
    ("cardnumber", PiiType::CreditCard),
    ("accountnumber", PiiType::AccountNumber),
    ("accountno", PiiType::AccountNumber),
    ("acctno", PiiType::AccountNumber),
    ("passport", PiiType::Passport),
    ("password", PiiType::GenericSecret),
    ("secret", PiiType::GenericSecret),
    ("apikey", PiiType::ApiKey),
    ("ipaddress", PiiType::IpAddress),
    ("swift", PiiType::Swift),
    ("routing", PiiType::RoutingNumber),
    ("driverslicense", PiiType::DriversLicense),
    ("driverslicence", PiiType::DriversLicense),
    ("driverlicense", PiiType::DriversLicense),
    ("driverlicence", PiiType::DriversLicense),
    ("licenseno", PiiType::DriversLicense),
    ("licenceno", PiiType::DriversLicense),
    ("licensenumber", PiiType::DriversLicense),
    ("licencenumber", PiiType::DriversLicense),
    ("nationalid", PiiType::NationalId),
    ("nationalinsurance", PiiType::UkNationalInsurance),
    ("clientno", PiiType::ClientNumber),
    ("clientnumber", PiiType::ClientNumber),
    ("clientid", PiiType::ClientNumber),
    ("customerno", PiiType::ClientNumber),
    ("customernumber", PiiType::ClientNumber),
    ("customerid", PiiType::ClientNumber),
    ("memberno", PiiType::ClientNumber),
    ("membernumber", PiiType::ClientNumber),
    ("memberid", PiiType::ClientNumber),
    ("referenceno", PiiType::ReferenceNumber),
    ("referencenumber", PiiType::ReferenceNumber),
    ("invoiceno", PiiType::ReferenceNumber),
    ("invoicenumber", PiiType::ReferenceNumber),
    ("policyno", PiiType::PolicyNumber),
    ("policynumber", PiiType::PolicyNumber),
    ("transactionid", PiiType::TransactionId),
    ("txnid", PiiType::TransactionId),
    // Last, so `email_address` and `ip_address` keep their own category
    ("address", PiiType::StreetAddress),
];

/// Byte layout of one field within its line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvField {
    /// Start of the raw field, including any quote
    pub start: usize,
    /// End of the raw field, excluding the delimiter
    pub end: usize,
    /// Start of the value (inside quotes when quoted)
    pub content_start: usize,
    pub content_end: usize,
    pub quote: Option<char>,
}

impl CsvField {
    /// Raw value text; doubled quotes are left escaped
    pub fn content<'a>(&self, line: &'a str) -> &'a str {
        &line[self.content_start..self.content_end]
    }

    /// Value text with doubled quotes collapsed and whitespace trimmed
    pub fn value(&self, line: &str) -> String {
        let content = self.content(line);
        match self.quote {
            Some('"') => content.replace("\"\"", "\""),
            _ => content.to_string(),
        }
        .trim()
        .to_string()
    }
}

/// Pick the delimiter that occurs most often outside double quotes
pub fn detect_delimiter(line: &str) -> char {
    let mut counts = [0usize; DELIMITERS.len()];
    let mut quoted = false;

    for c in line.chars() {
        if c == '"' {
            quoted = !quoted;
        } else if !quoted && let Some(i) = DELIMITERS.iter().position(|d| *d == c) {
            counts[i] += 1;
        }
    }

    let mut best = 0;
    for i in 1..DELIMITERS.len() {
        if counts[i] > counts[best] {
            best = i;
        }
    }
    DELIMITERS[best]
}

/// Split a line into fields, honouring single- and double-quoted values
pub fn split_fields(line: &str, delimiter: char) -> Vec<CsvField> {
    let mut fields = Vec::new();
    let mut start = 0;

    loop {
        let rest = &line[start..];
        let lead = rest.len() - rest.trim_start_matches(' ').len();
        let quote = rest[lead..].chars().next().filter(|c| *c == '"' || *c == '\'');

        let quoted = quote.and_then(|q| {
            let content_start = start + lead + 1;
            let close = closing_quote(line, content_start, q)?;
            let end = line[close + 1..]
                .find(delimiter)
                .map_or(line.len(), |i| close + 1 + i);

            // Text after the closing quote makes the quotes part of a plain value
            let quote = line[close + 1..end].trim().is_empty().then_some(q);
            let (content_start, content_end) = match quote {
                Some(_) => (content_start, close),
                None => (start, end),
            };
            Some(CsvField {
                start,
                end,
                content_start,
                content_end,
                quote,
            })
        });

        // An unterminated quote is read as a plain value
        let field = quoted.unwrap_or_else(|| {
            let end = rest.find(delimiter).map_or(line.len(), |i| start + i);
            CsvField {
                start,
                end,
                content_start: start,
                content_end: end,
                quote: None,
            }
        });

        fields.push(field);
        if field.end >= line.len() {
            break;
        }
        start = field.end + delimiter.len_utf8();
    }

    fields
}

fn closing_quote(line: &str, from: usize, quote: char) -> Option<usize> {
    let mut chars = line[from..].char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c != quote {
            continue;
        }
        if quote == '"' && chars.peek().is_some_and(|(_, next)| *next == '"') {
            chars.next();
            continue;
        }
        return Some(from + i);
    }
    None
}

/// Lines with their byte offsets; `\r\n` endings are excluded from the line
fn split_lines(text: &str) -> Vec<(usize, &str)> {
    let mut lines = Vec::new();
    let mut start = 0;

    for (i, _) in text.match_indices('\n') {
        lines.push((start, text[start..i].strip_suffix('\r').unwrap_or(&text[start..i])));
        start = i + 1;
    }
    if start < text.len() {
        lines.push((start, text[start..].strip_suffix('\r').unwrap_or(&text[start..])));
    }

    lines
}

fn row_values(line: &str, delimiter: char) -> Vec<String> {
    split_fields(line, delimiter)
        .iter()
        .map(|f| f.value(line))
        .collect()
}

fn is_numeric(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_digit())
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || " +-.()/".contains(c))
}

fn is_label(value: &str) -> bool {
    value.chars().next().is_some_and(char::is_alphabetic)
        && value
            .chars()
            .all(|c| c.is_alphanumeric() || " _-.#".contains(c))
}

/// A first row is a header when it has fewer numeric fields than the second,
/// or when it holds only labels and the second does not
fn looks_like_header(first: &[String], second: &[String]) -> bool {
    let numeric = |row: &[String]| row.iter().filter(|v| is_numeric(v)).count();
    let labels = |row: &[String]| row.iter().all(|v| is_label(v));

    numeric(first) < numeric(second) || (labels(first) && !labels(second))
}

fn normalize_header(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn is_type_label(value: &str) -> bool {
    value.starts_with('[') && value.ends_with(']')
}

fn apply_edits(text: &str, edits: &[(usize, usize, String)]) -> String {
    let mut result = String::with_capacity(text.len());
    let mut last = 0;
    for (start, end, replacement) in edits {
        result.push_str(&text[last..*start]);
        result.push_str(replacement);
        last = *end;
    }
    result.push_str(&text[last..]);
    result
}

/// Masks delimited text cell by cell
#[derive(Debug)]
pub struct CsvAdapter {
    detector: RegexDetector,
    options: CsvOptions,
    enabled: BTreeSet<PiiType>,
    threshold: f32,
    memo: BoundedMemo<String, Vec<Detection>>,
}

impl CsvAdapter {
    pub fn new(config: &MaskingConfig) -> Self {
        Self {
            detector: RegexDetector::new(config),
            options: config.csv.clone(),
            enabled: config.enabled_types(),
            threshold: config.effective_threshold(),
            memo: BoundedMemo::new(DEFAULT_MEMO_CAPACITY),
        }
    }

    /// (hits, misses) of the per-cell detection cache
    pub fn memo_stats(&self) -> (u64, u64) {
        self.memo.stats()
    }

    /// Mask `text`; `header_line_override` names the columns of data-only text
    pub fn mask(&mut self, text: &str, header_line_override: Option<&str>) -> Result<AdapterOutput> {
        let lines = split_lines(text);
        let mut non_empty = lines
            .iter()
            .enumerate()
            .filter(|(_, (_, line))| !line.trim().is_empty());

        let Some((first_row, (_, first_line))) = non_empty.next() else {
            return Ok(AdapterOutput::unchanged(text));
        };
        let second_line = non_empty.next().map(|(_, (_, line))| *line);

        let delimiter = detect_delimiter(header_line_override.unwrap_or(first_line));

        let (headers, header_row) = match header_line_override {
            Some(names) => (row_values(names, delimiter), None),
            None => {
                let first = row_values(first_line, delimiter);
                let is_header = match self.options.header {
                    HeaderMode::FirstRow => true,
                    HeaderMode::None => false,
                    HeaderMode::Auto => second_line.is_some_and(|second| {
                        looks_like_header(&first, &row_values(second, delimiter))
                    }),
                };
                if is_header {
                    (first, Some(first_row))
                } else {
                    (Vec::new(), None)
                }
            }
        };

        let sensitive: Vec<Option<PiiType>> =
            headers.iter().map(|h| self.sensitive_column(h)).collect();

        let index = LineIndex::new(text);
        let quote_replacements = !self.detector.masker().strategy().is_length_preserving();
        let mut edits = Vec::new();
        let mut detections = Vec::new();

        for (row, (line_start, line)) in lines.iter().enumerate() {
            let is_header = header_row == Some(row);
            if line.trim().is_empty() || (is_header && !self.options.mask_header) {
                continue;
            }

            for (col, field) in split_fields(line, delimiter).iter().enumerate() {
                let header = headers.get(col).map(String::as_str);
                if self.options.skip_columns.iter().any(|s| s.matches(col, header)) {
                    continue;
                }

                let content = field.content(line);
                let column_type = match (is_header, sensitive.get(col)) {
                    (false, Some(Some(t))) if self.options.mask_sensitive_columns => Some(*t),
                    _ => None,
                };

                let mut cell = match column_type.and_then(|t| self.whole_cell(content, t)) {
                    Some(detection) => vec![detection],
                    None => self.detect_cell(content),
                };

                if let Some(q) = field.quote {
                    cell.retain(|d| !d.text.contains(q));
                    if quote_replacements && q == '"' {
                        for d in &mut cell {
                            d.masked = d.masked.replace('"', "\"\"");
                        }
                    }
                }
                if cell.is_empty() {
                    continue;
                }

                let mut rewritten = self.detector.masker().rewrite(content, &cell)?;
                if quote_replacements
                    && field.quote.is_none()
                    && (rewritten.contains(delimiter) || rewritten.contains('"'))
                {
                    rewritten = format!("\"{}\"", rewritten.replace('"', "\"\""));
                }

                let base = line_start + field.content_start;
                edits.push((base, base + content.len(), rewritten));
                for mut detection in cell {
                    detection.relocate(base, &index);
                    detections.push(detection);
                }
            }
        }

        debug!(
            "Masked {} CSV values across {} lines (delimiter {:?})",
            detections.len(),
            lines.len(),
            delimiter
        );

        Ok(AdapterOutput {
            text: apply_edits(text, &edits),
            detections,
        })
    }

    /// Category implied by a header name, if it is enabled
    fn sensitive_column(&self, header: &str) -> Option<PiiType> {
        match self.detector.policy().verdict(header) {
            ListVerdict::Deny => return Some(PiiType::Custom),
            ListVerdict::Allow => return None,
            ListVerdict::Neutral => {}
        }

        let normalized = normalize_header(header);
        SENSITIVE_COLUMNS
            .iter()
            .find(|(keyword, _)| normalized.contains(keyword))
            .map(|(_, t)| *t)
            .filter(|t| self.enabled.contains(t))
    }

    /// Detection covering a whole cell of a sensitive column
    fn whole_cell(&self, content: &str, pii_type: PiiType) -> Option<Detection> {
        let value = content.trim();
        if value.is_empty()
            || value.contains(MASK_CHAR)
            || is_type_label(value)
            || SENSITIVE_COLUMN_CONFIDENCE < self.threshold
            || self.detector.policy().verdict(value) == ListVerdict::Allow
        {
            return None;
        }

        let start = content.len() - content.trim_start().len();
        Some(Detection {
            pii_type,
            rule: SENSITIVE_COLUMN_RULE.to_string(),
            start,
            end: start + value.len(),
            line: 1,
            column: content[..start].chars().count(),
            text: value.to_string(),
            masked: self.detector.masker().mask_value(value, pii_type, None),
            confidence: SENSITIVE_COLUMN_CONFIDENCE,
        })
    }

    fn detect_cell(&mut self, content: &str) -> Vec<Detection> {
        if content.trim().is_empty() {
            return Vec::new();
        }
        let Self { detector, memo, .. } = self;
        memo.get_or_insert_with(content, || detector.detect(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColumnSelector, CustomPatternConfig, MaskingStrategy};

    fn full_config() -> MaskingConfig {
        let mut config = MaskingConfig::enabled();
        config.strategy = MaskingStrategy::Full;
        config
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a,b,c"), ',');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(detect_delimiter("a|b|c"), '|');
        assert_eq!(detect_delimiter(r#""x,y,z";b;c"#), ';');
        assert_eq!(detect_delimiter("a,b;c"), ',');
        assert_eq!(detect_delimiter("plain"), ',');
    }

    #[test]
    fn test_split_fields_respects_quotes() {
        let line = r#"1,"Doe, Jane",jane@corp.io"#;
        let fields = split_fields(line, ',');

        assert_eq!(fields.len(), 3);
        assert_eq!(fields[1].content(line), "Doe, Jane");
        assert_eq!(fields[1].quote, Some('"'));
        assert_eq!(fields[2].content(line), "jane@corp.io");
    }

    #[test]
    fn test_split_fields_escaped_quotes_and_single_quotes() {
        let line = r#""say ""hi"", ok",'a,b',x"#;
        let fields = split_fields(line, ',');

        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].value(line), r#"say "hi", ok"#);
        assert_eq!(fields[1].content(line), "a,b");
        assert_eq!(fields[2].content(line), "x");
    }

    #[test]
    fn test_split_fields_trailing_delimiter_and_unterminated_quote() {
        let fields = split_fields("a,b,", ',');
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[2].content("a,b,"), "");

        let line = "O'Brien,'tis,x";
        let fields = split_fields(line, ',');
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[1].content(line), "'tis");
    }

    #[test]
    fn test_text_after_closing_quote_makes_field_plain() {
        let line = "1,'it''s jane@corp.io',x";
        let fields = split_fields(line, ',');

        assert_eq!(fields.len(), 3);
        assert_eq!(fields[1].quote, None);
        assert_eq!(fields[1].content(line), "'it''s jane@corp.io'");
        assert_eq!(fields[2].content(line), "x");

        let line = r#""a,b"  ,c"#;
        let fields = split_fields(line, ',');
        assert_eq!(fields[0].quote, Some('"'));
        assert_eq!(fields[0].content(line), "a,b");
    }

    #[test]
    fn test_malformed_quoted_cell_is_scanned() {
        let mut config = full_config();
        config.csv.header = HeaderMode::None;
        let mut adapter = CsvAdapter::new(&config);

        let output = adapter.mask("1,'it''s jane@corp.io',x", None).unwrap();
        assert_eq!(output.text, "1,'it''s ************',x");
        assert_eq!(output.detections.len(), 1);
    }

    #[test]
    fn test_mailbox_cell() {
        let mut adapter = CsvAdapter::new(&full_config());
        let output = adapter
            .mask("name,contact\nJane,Jane <jane@corp.io>", None)
            .unwrap();

        assert_eq!(output.text, "name,contact\nJane,Jane <************>");
    }

    #[test]
    fn test_header_row_left_alone() {
        let mut adapter = CsvAdapter::new(&full_config());
        let text = "name,contact\nJane,jane@corp.io\n";
        let output = adapter.mask(text, None).unwrap();

        assert_eq!(output.text, "name,contact\nJane,************\n");
        assert_eq!(output.detections.len(), 1);
        assert_eq!(output.detections[0].line, 2);
        assert_eq!(output.detections[0].column, 5);
        assert_eq!(output.detections[0].start, text.find("jane@").unwrap());
    }

    #[test]
    fn test_quoted_field_is_not_split() {
        let mut config = full_config();
        config.csv.header = HeaderMode::None;
        let mut adapter = CsvAdapter::new(&config);

        let text = "1,\"Doe, Jane\",jane@corp.io";
        let output = adapter.mask(text, None).unwrap();

        assert_eq!(output.text, "1,\"Doe, Jane\",************");
        assert_eq!(output.text.chars().count(), text.chars().count());
    }

    #[test]
    fn test_sensitive_column_masks_whole_cell() {
        let mut adapter = CsvAdapter::new(&full_config());
        // 123 456 789 fails the TFN checksum, the column name still marks it
        let output = adapter.mask("name,tfn\nJane,123 456 789", None).unwrap();

        assert_eq!(output.text, "name,tfn\nJane,***********");
        assert_eq!(output.detections[0].rule, SENSITIVE_COLUMN_RULE);
        assert_eq!(output.detections[0].pii_type, PiiType::AustralianTfn);
        assert_eq!(output.detections[0].confidence, 0.95);
    }

    #[test]
    fn test_address_column() {
        let mut adapter = CsvAdapter::new(&full_config());
        let output = adapter
            .mask("name,home_address\nJane,42 Wallaby Way", None)
            .unwrap();

        assert_eq!(output.text, "name,home_address\nJane,**************");
        assert_eq!(output.detections[0].pii_type, PiiType::StreetAddress);
    }

    #[test]
    fn test_licence_column() {
        let mut config = full_config();
        config.csv.header = HeaderMode::FirstRow;
        let mut adapter = CsvAdapter::new(&config);

        let output = adapter
            .mask("name,Driver Licence\nJane,NSW4821937", None)
            .unwrap();
        assert_eq!(output.text, "name,Driver Licence\nJane,**********");
        assert_eq!(output.detections[0].pii_type, PiiType::DriversLicense);
    }

    #[test]
    fn test_disabled_category_column_is_not_reassigned() {
        // ip_address must not fall through to the street address keyword
        let mut adapter = CsvAdapter::new(&full_config());
        let output = adapter.mask("name,ip_address\nJane,10.0.0.1", None).unwrap();

        assert_eq!(output.text, "name,ip_address\nJane,10.0.0.1");
        assert!(output.detections.is_empty());
        assert_eq!(normalize_header("Driver's Licence"), "driverslicence");
    }

    #[test]
    fn test_sensitive_columns_can_be_disabled() {
        let mut config = full_config();
        config.csv.mask_sensitive_columns = false;
        let mut adapter = CsvAdapter::new(&config);

        let output = adapter.mask("name,tfn\nJane,123 456 789", None).unwrap();
        assert!(output.detections.iter().all(|d| d.rule != SENSITIVE_COLUMN_RULE));
    }

    #[test]
    fn test_allow_listed_header_is_not_sensitive() {
        let mut config = full_config();
        config.allow_list = vec!["tfn".to_string()];
        let mut adapter = CsvAdapter::new(&config);

        let output = adapter.mask("name,tfn\nJane,123 456 789", None).unwrap();
        assert!(output.detections.iter().all(|d| d.rule != SENSITIVE_COLUMN_RULE));
    }

    #[test]
    fn test_skip_columns() {
        let mut config = full_config();
        config.csv.skip_columns = vec![ColumnSelector::Name("Contact".to_string())];
        let mut adapter = CsvAdapter::new(&config);

        let text = "name,contact\nJane,jane@corp.io";
        assert_eq!(adapter.mask(text, None).unwrap().text, text);
    }

    #[test]
    fn test_header_line_override() {
        let mut adapter = CsvAdapter::new(&full_config());
        let output = adapter
            .mask("Jane,jane@corp.io\nJohn,john@corp.io", Some("name,email"))
            .unwrap();

        assert_eq!(output.text, "Jane,************\nJohn,************");
        assert!(output.detections.iter().all(|d| d.pii_type == PiiType::Email));
        assert!(output.detections.iter().all(|d| d.rule == SENSITIVE_COLUMN_RULE));
    }

    #[test]
    fn test_mask_header_option() {
        let mut config = full_config();
        config.csv.mask_header = true;
        config.csv.header = HeaderMode::FirstRow;
        let mut adapter = CsvAdapter::new(&config);

        let output = adapter.mask("ops@corp.io,x\n1,2", None).unwrap();
        assert_eq!(output.text, "***********,x\n1,2");
    }

    #[test]
    fn test_replacement_with_delimiter_is_quoted() {
        let mut config = MaskingConfig::enabled();
        config.strategy = MaskingStrategy::TypeTag;
        config.custom_patterns.push(CustomPatternConfig {
            name: "ticket".to_string(),
            pattern: r"TICKET-\d{4}".to_string(),
            confidence: 0.9,
            enabled: true,
            replacement: Some("[TICKET,ID]".to_string()),
        });
        let mut adapter = CsvAdapter::new(&config);

        let output = adapter.mask("id,ref\n1,TICKET-1234", None).unwrap();
        assert_eq!(output.text, "id,ref\n1,\"[TICKET,ID]\"");
    }

    #[test]
    fn test_crlf_and_tabs_preserved() {
        let mut config = full_config();
        config.csv.header = HeaderMode::None;
        let mut adapter = CsvAdapter::new(&config);

        let text = "a\tjane@corp.io\r\nb\tjohn@corp.io\r\n";
        let output = adapter.mask(text, None).unwrap();
        assert_eq!(output.text, "a\t************\r\nb\t************\r\n");
    }

    #[test]
    fn test_repeated_cells_hit_memo() {
        let mut adapter = CsvAdapter::new(&full_config());
        let output = adapter
            .mask("contact\njane@corp.io\njane@corp.io", None)
            .unwrap();

        assert_eq!(output.detections.len(), 2);
        assert_eq!(adapter.memo_stats(), (1, 1));
    }

    #[test]
    fn test_empty_input() {
        let mut adapter = CsvAdapter::new(&full_config());
        let output = adapter.mask("", None).unwrap();
        assert_eq!(output, AdapterOutput::unchanged(""));
    }
}
