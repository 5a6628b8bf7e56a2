//! Masking strategies and text rewriting

mod standard_masker;

pub use standard_masker::{StandardMasker, apply_strategy};

use crate::config::MaskingStrategy;
use crate::detector::Detection;
use crate::error::Result;

/// Character used by the full and partial strategies
pub const MASK_CHAR: char = '*';

/// Trait for rewriting text from detections
pub trait Masker: Send + Sync {
    /// Substitute every detection's replacement into `text`.
    ///
    /// Detections must be sorted, non-overlapping and on character
    /// boundaries. Length-preserving strategies must leave the character
    /// count unchanged.
    fn rewrite(&self, text: &str, detections: &[Detection]) -> Result<String>;

    /// Get the masking strategy
    fn strategy(&self) -> MaskingStrategy;
}
