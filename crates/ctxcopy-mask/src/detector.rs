//! Sensitive-data detectors

mod confidence;
mod policy;
mod regex_detector;
mod resolve;

pub use policy::{ListPolicy, ListVerdict};
pub use regex_detector::{DENY_LIST_RULE, RegexDetector};
pub use resolve::{Candidate, resolve_overlaps};

use crate::catalog::PiiType;
use serde::{Deserialize, Serialize};

/// One located, classified and scored match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Category of the match
    pub pii_type: PiiType,

    /// Name of the rule that produced it (e.g. `credit_card`, `deny_list`)
    pub rule: String,

    /// Start byte offset in the scanned unit
    pub start: usize,

    /// End byte offset (exclusive)
    pub end: usize,

    /// 1-based line of `start`
    pub line: usize,

    /// 0-based character column of `start`
    pub column: usize,

    /// The matched text
    pub text: String,

    /// Replacement computed with the configured strategy
    pub masked: String,

    /// Confidence score (0.0 to 1.0)
    pub confidence: f32,
}

impl Detection {
    /// Length of the original match in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn overlaps(&self, other: &Detection) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether the replacement has the same character length as the original
    pub fn preserves_length(&self) -> bool {
        self.masked.chars().count() == self.char_len()
    }

    /// Move the detection from unit coordinates into document coordinates
    pub fn relocate(&mut self, base: usize, index: &LineIndex<'_>) {
        self.start += base;
        self.end += base;
        let (line, column) = index.position(self.start);
        self.line = line;
        self.column = column;
    }
}

/// Trait for detecting sensitive data in text
pub trait Detector: Send + Sync {
    /// Detect sensitive values; the result is sorted and non-overlapping
    fn detect(&self, text: &str) -> Vec<Detection>;

    /// Get the categories this detector can find
    fn supported_types(&self) -> Vec<PiiType>;
}

/// Maps byte offsets to line/column positions
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { text, line_starts }
    }

    /// (1-based line, 0-based character column) of a byte offset
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.text.len());
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let line_start = self.line_starts[line - 1];
        let column = self
            .text
            .get(line_start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(0);
        (line, column)
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}
