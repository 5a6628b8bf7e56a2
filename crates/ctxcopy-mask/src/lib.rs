//! ctxcopy sensitive-data masking
//!
//! This crate finds and masks sensitive values in copied text:
//! - Email, phone, card, bank, tax and identity number detection
//! - API keys and `key = value` secrets
//! - Full, partial, type-tag and keyed-hash masking
//! - CSV and XML/CDATA adapters that never corrupt structure

pub mod adapters;
pub mod catalog;
pub mod chain;
pub mod config;
pub mod detector;
pub mod document;
pub mod engine;
pub mod error;
pub mod masker;
pub mod memo;
pub mod presentation;

pub use adapters::{AdapterOutput, CsvAdapter, XmlAdapter};
pub use catalog::{PatternCatalog, PatternRule, PiiType};
pub use config::{
    ColumnSelector, CsvOptions, CustomPatternConfig, HeaderMode, LargeInputPolicy, MaskingConfig,
    MaskingMode, MaskingStrategy, Preset,
};
pub use detector::{Detection, Detector, ListPolicy, RegexDetector};
pub use document::DocumentKind;
pub use engine::{
    MaskingResult, mask_cdata_content, mask_csv_text, mask_document, mask_text, mask_xml_text,
};
pub use error::{Error, Result};
pub use masker::{Masker, StandardMasker, apply_strategy};
pub use presentation::{StatusIndicator, notification_message, stats_footer, status_indicator};
