//! XML and CDATA adapter
//!
//! Only character data and CDATA payloads are ever rewritten. Tags,
//! attribute values, comments, processing instructions and entity
//! references are copied through byte for byte, which is why this adapter
//! refuses strategies that change the length of a value.

use crate::adapters::{AdapterOutput, require_length_preserving, verify_length};
use crate::chain::StrategyChain;
use crate::config::MaskingConfig;
use crate::detector::{Detection, Detector, LineIndex, RegexDetector};
use crate::error::Result;
use crate::masker::Masker;
use tracing::debug;

const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    /// Character data between tags
    Text,
    /// Payload of a CDATA section, markers excluded
    CData,
}

/// Byte range of the document that may be rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafeRegion {
    pub start: usize,
    pub end: usize,
    pub kind: RegionKind,
}

/// Find the rewritable regions of an XML document.
///
/// Unterminated markup makes the remainder of the document unsafe.
pub fn safe_regions(xml: &str) -> Vec<SafeRegion> {
    let bytes = xml.as_bytes();
    let mut regions = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let markup_end = match bytes[i] {
            b'<' => {
                let rest = &xml[i..];
                let is_markup = bytes
                    .get(i + 1)
                    .is_some_and(|&b| b.is_ascii_alphabetic() || matches!(b, b'/' | b'!' | b'?'));
                if !is_markup {
                    i += 1;
                    continue;
                }

                push_text(&mut regions, text_start, i);
                if rest.starts_with(CDATA_OPEN) {
                    let payload = i + CDATA_OPEN.len();
                    xml[payload..].find(CDATA_CLOSE).map(|len| {
                        if len > 0 {
                            regions.push(SafeRegion {
                                start: payload,
                                end: payload + len,
                                kind: RegionKind::CData,
                            });
                        }
                        payload + len + CDATA_CLOSE.len()
                    })
                } else if rest.starts_with("<!--") {
                    rest[4..].find("-->").map(|p| i + 4 + p + 3)
                } else if rest.starts_with("<?") {
                    rest[2..].find("?>").map(|p| i + 2 + p + 2)
                } else {
                    tag_end(xml, i)
                }
            }
            b'&' => match entity_len(&xml[i..]) {
                Some(len) => {
                    push_text(&mut regions, text_start, i);
                    Some(i + len)
                }
                None => {
                    i += 1;
                    continue;
                }
            },
            _ => {
                i += 1;
                continue;
            }
        };

        match markup_end {
            Some(end) => {
                i = end;
                text_start = end;
            }
            None => return regions,
        }
    }

    push_text(&mut regions, text_start, xml.len());
    regions
}

fn push_text(regions: &mut Vec<SafeRegion>, start: usize, end: usize) {
    if end > start {
        regions.push(SafeRegion {
            start,
            end,
            kind: RegionKind::Text,
        });
    }
}

/// Offset just past the `>` closing a tag, skipping quoted attribute values
fn tag_end(xml: &str, from: usize) -> Option<usize> {
    let mut quote = None;
    for (offset, &b) in xml.as_bytes()[from + 1..].iter().enumerate() {
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'>') => return Some(from + 1 + offset + 1),
            _ => {}
        }
    }
    None
}

/// Length of an entity or character reference such as `&amp;` or `&#x41;`
fn entity_len(s: &str) -> Option<usize> {
    let body = s.strip_prefix('&')?;
    let name = body.strip_prefix('#').unwrap_or(body);
    let name_len = name.bytes().take_while(u8::is_ascii_alphanumeric).count();
    if name_len == 0 || name.as_bytes().get(name_len) != Some(&b';') {
        return None;
    }
    Some(s.len() - name.len() + name_len + 1)
}

/// A detection span and the regions it must fit in
struct Placement<'a> {
    start: usize,
    end: usize,
    xml: &'a str,
    regions: &'a [SafeRegion],
}

fn contained(p: &Placement<'_>) -> Option<(usize, usize)> {
    p.regions
        .iter()
        .any(|r| r.start <= p.start && p.end <= r.end)
        .then_some((p.start, p.end))
}

fn largest_safe_intersection(p: &Placement<'_>) -> Option<(usize, usize)> {
    p.regions
        .iter()
        .filter(|r| r.start < p.end && p.start < r.end)
        .filter_map(|r| {
            let start = r.start.max(p.start);
            let end = r.end.min(p.end);
            let slice = &p.xml[start..end];
            let trimmed = slice.trim();
            if trimmed.is_empty() {
                return None;
            }
            let start = start + (slice.len() - slice.trim_start().len());
            Some((start, start + trimmed.len()))
        })
        .fold(None, |best: Option<(usize, usize)>, span| match best {
            Some(b) if b.1 - b.0 >= span.1 - span.0 => Some(b),
            _ => Some(span),
        })
}

fn boundary_chain<'a>() -> StrategyChain<Placement<'a>, (usize, usize)> {
    StrategyChain::new()
        .then("contained", contained)
        .then("largest_safe_intersection", largest_safe_intersection)
}

/// Masks text nodes and CDATA payloads of XML documents
#[derive(Debug, Clone)]
pub struct XmlAdapter {
    detector: RegexDetector,
}

impl XmlAdapter {
    pub fn new(config: &MaskingConfig) -> Self {
        // Tags never reach the rewrite; safe regions exclude them
        Self {
            detector: RegexDetector::new(config).without_tag_filter(),
        }
    }

    /// Mask a whole XML document without touching its structure
    pub fn mask(&self, xml: &str) -> Result<AdapterOutput> {
        require_length_preserving(self.detector.masker().strategy(), "xml")?;

        let regions = safe_regions(xml);
        if regions.is_empty() {
            return Ok(AdapterOutput::unchanged(xml));
        }

        let index = LineIndex::new(xml);
        let chain = boundary_chain();
        let mut detections = Vec::new();
        let mut dropped = 0;

        for detection in self.detector.detect(xml) {
            let placement = Placement {
                start: detection.start,
                end: detection.end,
                xml,
                regions: &regions,
            };
            match chain.resolve(&placement) {
                Some(("contained", _)) => detections.push(detection),
                Some((_, (start, end))) => {
                    detections.push(self.narrow(detection, xml, start, end, &index));
                }
                None => dropped += 1,
            }
        }

        debug!(
            "Masked {} XML values in {} safe regions ({} dropped at boundaries)",
            detections.len(),
            regions.len(),
            dropped
        );

        let text = self.detector.masker().rewrite(xml, &detections)?;
        verify_length(xml, &text)?;
        Ok(AdapterOutput { text, detections })
    }

    /// Mask the payload of a single CDATA section, markers excluded
    pub fn mask_cdata_payload(&self, payload: &str) -> Result<AdapterOutput> {
        require_length_preserving(self.detector.masker().strategy(), "cdata")?;

        let detections = self.detector.detect(payload);
        if detections.is_empty() {
            return Ok(AdapterOutput::unchanged(payload));
        }

        let text = self.detector.masker().rewrite(payload, &detections)?;
        verify_length(payload, &text)?;
        Ok(AdapterOutput { text, detections })
    }

    fn narrow(
        &self,
        detection: Detection,
        xml: &str,
        start: usize,
        end: usize,
        index: &LineIndex<'_>,
    ) -> Detection {
        let text = &xml[start..end];
        let (line, column) = index.position(start);
        Detection {
            masked: self
                .detector
                .masker()
                .mask_value(text, detection.pii_type, None),
            text: text.to_string(),
            start,
            end,
            line,
            column,
            ..detection
        }
    }
}
