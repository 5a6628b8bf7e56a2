//! Structure-aware adapters
//!
//! Adapters run the detector per logical unit (CSV cell, XML text node or
//! CDATA payload) so a replacement never crosses a structural boundary.

pub mod csv;
pub mod xml;

pub use csv::CsvAdapter;
pub use xml::XmlAdapter;

use crate::config::MaskingStrategy;
use crate::detector::Detection;
use crate::error::{Error, Result};

/// Masked text plus the detections applied to it, in document coordinates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdapterOutput {
    pub text: String,
    pub detections: Vec<Detection>,
}

impl AdapterOutput {
    pub fn unchanged(text: &str) -> Self {
        Self {
            text: text.to_string(),
            detections: Vec::new(),
        }
    }
}

/// Refuse strategies whose replacements change the character count
pub(crate) fn require_length_preserving(
    strategy: MaskingStrategy,
    adapter: &'static str,
) -> Result<()> {
    if strategy.is_length_preserving() {
        Ok(())
    } else {
        Err(Error::StrategyNotLengthPreserving {
            strategy: strategy.as_str(),
            adapter,
        })
    }
}

/// Confirm a length-preserving pass kept the character count
pub(crate) fn verify_length(input: &str, output: &str) -> Result<()> {
    let expected = input.chars().count();
    let actual = output.chars().count();
    if expected == actual {
        Ok(())
    } else {
        Err(Error::LengthMismatch { expected, actual })
    }
}
