//! Masking entry points
//!
//! Every entry point runs one detect and mask pass over a unit of text and
//! never fails. An error or panic inside the pass is logged and degrades to
//! the original text with no detections.

use crate::adapters::{AdapterOutput, CsvAdapter, XmlAdapter};
use crate::catalog::PiiType;
use crate::config::MaskingConfig;
use crate::detector::{Detection, Detector, RegexDetector};
use crate::document::DocumentKind;
use crate::error::Result;
use crate::masker::Masker;
use serde::{Deserialize, Serialize};
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, error, warn};

/// Outcome of one masking pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskingResult {
    pub masked_text: String,
    /// Applied detections in document coordinates, sorted by start
    pub detections: Vec<Detection>,
    pub masking_applied: bool,
}

impl MaskingResult {
    /// The original text with nothing masked
    pub fn unchanged(text: &str) -> Self {
        Self {
            masked_text: text.to_string(),
            detections: Vec::new(),
            masking_applied: false,
        }
    }

    fn from_output(output: AdapterOutput) -> Self {
        Self {
            masking_applied: !output.detections.is_empty(),
            masked_text: output.text,
            detections: output.detections,
        }
    }

    /// Detection counts per category, in order of first appearance
    pub fn counts_by_type(&self) -> Vec<(PiiType, usize)> {
        let mut counts: Vec<(PiiType, usize)> = Vec::new();
        for detection in &self.detections {
            match counts.iter_mut().find(|(t, _)| *t == detection.pii_type) {
                Some((_, count)) => *count += 1,
                None => counts.push((detection.pii_type, 1)),
            }
        }
        counts
    }
}

/// Run a pass, converting errors and panics into the unchanged result
fn guarded<F>(operation: &str, text: &str, config: &MaskingConfig, pass: F) -> MaskingResult
where
    F: FnOnce() -> Result<AdapterOutput>,
{
    if !config.enabled {
        return MaskingResult::unchanged(text);
    }

    match catch_unwind(AssertUnwindSafe(pass)) {
        Ok(Ok(output)) => {
            debug!(
                "{}: {} detections over {} bytes",
                operation,
                output.detections.len(),
                text.len()
            );
            MaskingResult::from_output(output)
        }
        Ok(Err(e)) => {
            warn!("{} failed, copying unmasked text: {}", operation, e);
            MaskingResult::unchanged(text)
        }
        Err(_) => {
            error!("{} panicked, copying unmasked text", operation);
            MaskingResult::unchanged(text)
        }
    }
}

/// Mask free-form text
pub fn mask_text(text: &str, config: &MaskingConfig) -> MaskingResult {
    guarded("mask_text", text, config, || {
        let detector = RegexDetector::new(config);
        let detections = detector.detect(text);
        Ok(AdapterOutput {
            text: detector.masker().rewrite(text, &detections)?,
            detections,
        })
    })
}

/// Mask delimited text cell by cell.
///
/// `header_line_override` names the columns when `text` holds data rows only.
pub fn mask_csv_text(
    text: &str,
    config: &MaskingConfig,
    header_line_override: Option<&str>,
) -> MaskingResult {
    guarded("mask_csv_text", text, config, || {
        CsvAdapter::new(config).mask(text, header_line_override)
    })
}

/// Mask the payload of one CDATA section, markers excluded
pub fn mask_cdata_content(payload: &str, config: &MaskingConfig) -> MaskingResult {
    guarded("mask_cdata_content", payload, config, || {
        XmlAdapter::new(config).mask_cdata_payload(payload)
    })
}

/// Mask the text nodes and CDATA payloads of an XML document
pub fn mask_xml_text(text: &str, config: &MaskingConfig) -> MaskingResult {
    guarded("mask_xml_text", text, config, || XmlAdapter::new(config).mask(text))
}

/// Mask `text` with the adapter for `kind`
pub fn mask_document(
    text: &str,
    config: &MaskingConfig,
    kind: DocumentKind,
    header_line_override: Option<&str>,
) -> MaskingResult {
    match kind {
        DocumentKind::PlainText => mask_text(text, config),
        DocumentKind::Csv => mask_csv_text(text, config, header_line_override),
        DocumentKind::Xml => mask_xml_text(text, config),
    }
}
