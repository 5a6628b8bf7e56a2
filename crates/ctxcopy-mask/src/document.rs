//! Document kind selection

use crate::adapters::csv::{detect_delimiter, split_fields};
use crate::config::LargeInputPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Lines compared when looking for a consistent delimiter
const SNIFF_CSV_LINES: usize = 5;

/// Which adapter a unit of text goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    #[default]
    PlainText,
    Csv,
    Xml,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::PlainText => "plain_text",
            DocumentKind::Csv => "csv",
            DocumentKind::Xml => "xml",
        }
    }

    /// Kind implied by a file extension, if it names a structured format
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "csv" | "tsv" | "psv" | "tab" => Some(DocumentKind::Csv),
            "xml" | "xsd" | "xsl" | "xslt" | "svg" | "xhtml" | "plist" | "config" | "csproj" => {
                Some(DocumentKind::Xml)
            }
            "txt" | "log" | "md" => Some(DocumentKind::PlainText),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Guess the kind from content.
    ///
    /// Only the first `line_threshold` lines are inspected, and inputs over
    /// `max_bytes` are treated as plain text without looking at them.
    pub fn sniff(text: &str, policy: &LargeInputPolicy) -> Self {
        if text.len() > policy.max_bytes {
            debug!(
                "Skipping document sniffing for {} bytes (limit {})",
                text.len(),
                policy.max_bytes
            );
            return DocumentKind::PlainText;
        }

        let head_len: usize = text
            .split_inclusive('\n')
            .take(policy.line_threshold)
            .map(str::len)
            .sum();
        let head = &text[..head_len];

        let trimmed = head.trim_start();
        if trimmed.starts_with('<') && (trimmed.contains("</") || trimmed.contains("/>")) {
            return DocumentKind::Xml;
        }

        let lines: Vec<&str> = head
            .lines()
            .filter(|l| !l.trim().is_empty())
            .take(SNIFF_CSV_LINES)
            .collect();
        if lines.len() < 2 {
            return DocumentKind::PlainText;
        }

        let delimiter = detect_delimiter(lines[0]);
        let columns = split_fields(lines[0], delimiter).len();
        let consistent = columns > 1
            && lines
                .iter()
                .all(|line| split_fields(line, delimiter).len() == columns);

        if consistent {
            DocumentKind::Csv
        } else {
            DocumentKind::PlainText
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(DocumentKind::from_extension("CSV"), Some(DocumentKind::Csv));
        assert_eq!(DocumentKind::from_extension(".tsv"), Some(DocumentKind::Csv));
        assert_eq!(DocumentKind::from_extension("xml"), Some(DocumentKind::Xml));
        assert_eq!(DocumentKind::from_extension("txt"), Some(DocumentKind::PlainText));
        assert_eq!(DocumentKind::from_extension("rs"), None);
        assert_eq!(
            DocumentKind::from_path(Path::new("/tmp/report.csv")),
            Some(DocumentKind::Csv)
        );
    }

    #[test]
    fn test_sniff() {
        let policy = LargeInputPolicy::default();

        assert_eq!(
            DocumentKind::sniff("  <?xml version=\"1.0\"?>\n<a>x</a>", &policy),
            DocumentKind::Xml
        );
        assert_eq!(
            DocumentKind::sniff("name,email\nJane,jane@corp.io\n", &policy),
            DocumentKind::Csv
        );
        assert_eq!(
            DocumentKind::sniff("a\tb\tc\n1\t2\t3", &policy),
            DocumentKind::Csv
        );
        assert_eq!(
            DocumentKind::sniff("Hello, world.\nNothing tabular here", &policy),
            DocumentKind::PlainText
        );
        assert_eq!(DocumentKind::sniff("", &policy), DocumentKind::PlainText);
    }

    #[test]
    fn test_large_input_skips_sniffing() {
        let policy = LargeInputPolicy {
            line_threshold: 2000,
            max_bytes: 8,
        };
        assert_eq!(
            DocumentKind::sniff("name,email\nJane,jane@corp.io", &policy),
            DocumentKind::PlainText
        );
    }

    #[test]
    fn test_sniff_inspects_only_head() {
        let policy = LargeInputPolicy {
            line_threshold: 1,
            max_bytes: 5_000_000,
        };
        // The closing tag is beyond the inspected line
        assert_eq!(
            DocumentKind::sniff("<a>\nx</a>", &policy),
            DocumentKind::PlainText
        );
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&DocumentKind::PlainText).unwrap();
        assert_eq!(json, "\"plain_text\"");
        assert_eq!(DocumentKind::PlainText.as_str(), "plain_text");
    }
}
