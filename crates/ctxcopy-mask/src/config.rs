//! Masking configuration
//!
//! A [`MaskingConfig`] is a read-only snapshot taken at the start of a copy
//! operation. Every field has a documented default so a partially written
//! settings file deserializes into a usable configuration.

use crate::catalog::PiiType;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Which categories a pass looks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskingMode {
    /// Every enabled category
    #[default]
    Auto,

    /// Only categories explicitly switched on in `types`
    Manual,

    /// As auto, with a raised confidence threshold
    Strict,
}

/// How a detected value is rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskingStrategy {
    /// Replace every character with `*`
    Full,

    /// Keep a short prefix/suffix visible
    #[default]
    Partial,

    /// Replace with a bracketed type label such as `[EMAIL]`
    TypeTag,

    /// Replace with a deterministic HMAC token
    Hash,
}

impl MaskingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaskingStrategy::Full => "full",
            MaskingStrategy::Partial => "partial",
            MaskingStrategy::TypeTag => "type_tag",
            MaskingStrategy::Hash => "hash",
        }
    }

    /// Whether every replacement has the same character length as its original
    pub fn is_length_preserving(&self) -> bool {
        matches!(self, MaskingStrategy::Full | MaskingStrategy::Partial)
    }
}

impl std::str::FromStr for MaskingStrategy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "full" => Ok(MaskingStrategy::Full),
            "partial" => Ok(MaskingStrategy::Partial),
            "type_tag" | "structural" => Ok(MaskingStrategy::TypeTag),
            "hash" => Ok(MaskingStrategy::Hash),
            other => Err(crate::Error::Config(format!(
                "unknown masking strategy '{}'",
                other
            ))),
        }
    }
}

/// Named bundles of category toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Use the per-type toggles as written
    #[default]
    None,
    Basic,
    Financial,
    Privacy,
    Strict,
    /// Same as `None`; marks a hand-tuned toggle set
    Custom,
}

impl Preset {
    /// Categories switched on by the preset, or `None` when the toggles apply
    pub fn types(&self) -> Option<&'static [PiiType]> {
        match self {
            Preset::None | Preset::Custom => None,
            Preset::Basic => Some(&[
                PiiType::Email,
                PiiType::Phone,
                PiiType::CreditCard,
                PiiType::Ssn,
                PiiType::DateOfBirth,
                PiiType::StreetAddress,
                PiiType::Passport,
                PiiType::DriversLicense,
                PiiType::NationalId,
            ]),
            Preset::Financial => Some(&[
                PiiType::CreditCard,
                PiiType::AustralianBsb,
                PiiType::AustralianTfn,
                PiiType::AustralianAbn,
                PiiType::Iban,
                PiiType::Swift,
                PiiType::RoutingNumber,
                PiiType::AccountNumber,
                PiiType::ClientNumber,
            ]),
            Preset::Privacy => Some(&[
                PiiType::Email,
                PiiType::Phone,
                PiiType::Ssn,
                PiiType::CreditCard,
                PiiType::AustralianBsb,
                PiiType::AustralianTfn,
                PiiType::AustralianAbn,
                PiiType::AustralianMedicare,
                PiiType::Iban,
                PiiType::Swift,
                PiiType::IpAddress,
                PiiType::DateOfBirth,
                PiiType::StreetAddress,
                PiiType::Passport,
                PiiType::DriversLicense,
                PiiType::NationalId,
                PiiType::UkNationalInsurance,
                PiiType::AccountNumber,
                PiiType::ApiKey,
                PiiType::GenericSecret,
            ]),
            Preset::Strict => Some(&PiiType::ALL),
        }
    }
}

/// A user-defined detection rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomPatternConfig {
    pub name: String,

    /// Regular expression in `regex` crate syntax
    pub pattern: String,

    #[serde(default = "default_custom_confidence")]
    pub confidence: f32,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Replacement used by the type-tag strategy (defaults to `[REDACTED]`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
}

/// How the first CSV row is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderMode {
    /// Header when the first row has fewer numeric fields than the second
    #[default]
    Auto,
    FirstRow,
    None,
}

/// A CSV column named by header text or 0-based index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnSelector {
    Index(usize),
    Name(String),
}

impl ColumnSelector {
    pub fn matches(&self, index: usize, header: Option<&str>) -> bool {
        match self {
            ColumnSelector::Index(i) => *i == index,
            ColumnSelector::Name(name) => {
                header.is_some_and(|h| h.trim().eq_ignore_ascii_case(name.trim()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvOptions {
    #[serde(default)]
    pub header: HeaderMode,

    /// Also scan the header row
    #[serde(default = "default_false")]
    pub mask_header: bool,

    #[serde(default)]
    pub skip_columns: Vec<ColumnSelector>,

    /// Mask whole cells under headers that name a sensitive field
    #[serde(default = "default_true")]
    pub mask_sensitive_columns: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            header: HeaderMode::default(),
            mask_header: false,
            skip_columns: Vec::new(),
            mask_sensitive_columns: true,
        }
    }
}

/// Thresholds above which structural sniffing is skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LargeInputPolicy {
    #[serde(default = "default_line_threshold")]
    pub line_threshold: usize,

    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

impl Default for LargeInputPolicy {
    fn default() -> Self {
        Self {
            line_threshold: default_line_threshold(),
            max_bytes: default_max_bytes(),
        }
    }
}

/// Masking configuration snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskingConfig {
    #[serde(default = "default_false")]
    pub enabled: bool,

    #[serde(default)]
    pub mode: MaskingMode,

    #[serde(default)]
    pub strategy: MaskingStrategy,

    #[serde(default)]
    pub preset: Preset,

    /// Per-type toggles merged over the built-in defaults
    #[serde(default)]
    pub types: BTreeMap<PiiType, bool>,

    /// Literal strings that are always masked
    #[serde(default)]
    pub deny_list: Vec<String>,

    /// Literal strings that are never masked
    #[serde(default)]
    pub allow_list: Vec<String>,

    #[serde(default)]
    pub custom_patterns: Vec<CustomPatternConfig>,

    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// Categories whose failed checksum discards the match
    #[serde(default = "default_checksum_mandatory")]
    pub checksum_mandatory: Vec<PiiType>,

    /// HMAC key for the hash strategy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_secret: Option<String>,

    #[serde(default)]
    pub csv: CsvOptions,

    #[serde(default = "default_true")]
    pub show_indicator: bool,

    #[serde(default = "default_false")]
    pub include_stats: bool,
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: MaskingMode::default(),
            strategy: MaskingStrategy::default(),
            preset: Preset::default(),
            types: BTreeMap::new(),
            deny_list: Vec::new(),
            allow_list: Vec::new(),
            custom_patterns: Vec::new(),
            confidence_threshold: default_confidence_threshold(),
            checksum_mandatory: default_checksum_mandatory(),
            hash_secret: None,
            csv: CsvOptions::default(),
            show_indicator: true,
            include_stats: false,
        }
    }
}

impl MaskingConfig {
    /// Default configuration with masking switched on
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Clean up user-supplied values once, at load time
    pub fn normalize(mut self) -> Self {
        self.deny_list = normalize_list(&self.deny_list);
        self.allow_list = normalize_list(&self.allow_list);

        self.confidence_threshold = if self.confidence_threshold.is_nan() {
            default_confidence_threshold()
        } else {
            self.confidence_threshold.clamp(0.0, 1.0)
        };

        self.custom_patterns.retain(|p| p.enabled && !p.pattern.is_empty());
        for pattern in &mut self.custom_patterns {
            pattern.confidence = pattern.confidence.clamp(0.0, 1.0);
        }

        self.checksum_mandatory.sort();
        self.checksum_mandatory.dedup();

        debug!(
            "Normalized masking config: {} deny, {} allow, {} custom patterns",
            self.deny_list.len(),
            self.allow_list.len(),
            self.custom_patterns.len()
        );

        self
    }

    /// Categories a pass looks for, after applying the preset and mode
    pub fn enabled_types(&self) -> BTreeSet<PiiType> {
        let mut enabled: BTreeSet<PiiType> = match (self.mode, self.preset.types()) {
            (MaskingMode::Manual, _) => self
                .types
                .iter()
                .filter(|(_, on)| **on)
                .map(|(t, _)| *t)
                .collect(),
            (_, Some(bundle)) => bundle.iter().copied().collect(),
            (_, None) => PiiType::ALL
                .iter()
                .copied()
                .filter(|t| self.types.get(t).copied().unwrap_or(t.enabled_by_default()))
                .collect(),
        };

        // User patterns run unless custom detection is explicitly switched off
        if !self.custom_patterns.is_empty()
            && self.mode != MaskingMode::Manual
            && self.types.get(&PiiType::Custom) != Some(&false)
        {
            enabled.insert(PiiType::Custom);
        }

        enabled
    }

    /// Threshold in effect for this pass (strict mode raises it)
    pub fn effective_threshold(&self) -> f32 {
        match self.mode {
            MaskingMode::Strict => (self.confidence_threshold + 0.1).min(0.95),
            _ => self.confidence_threshold,
        }
    }

    pub fn is_checksum_mandatory(&self, pii_type: PiiType) -> bool {
        self.checksum_mandatory.contains(&pii_type)
    }
}

fn normalize_list(entries: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    entries
        .iter()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty() && seen.insert(e.clone()))
        .collect()
}

fn default_confidence_threshold() -> f32 {
    0.7
}

fn default_custom_confidence() -> f32 {
    0.8
}

fn default_checksum_mandatory() -> Vec<PiiType> {
    vec![PiiType::AustralianTfn, PiiType::AustralianAbn, PiiType::Iban]
}

fn default_line_threshold() -> usize {
    2000
}

fn default_max_bytes() -> usize {
    5_000_000
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MaskingConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.mode, MaskingMode::Auto);
        assert_eq!(config.strategy, MaskingStrategy::Partial);
        assert_eq!(config.confidence_threshold, 0.7);
        assert!(config.show_indicator);
        assert!(!config.include_stats);
        assert!(config.csv.mask_sensitive_columns);
        assert!(config.is_checksum_mandatory(PiiType::AustralianAbn));
        assert!(!config.is_checksum_mandatory(PiiType::CreditCard));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: MaskingConfig =
            serde_json::from_str(r#"{"enabled": true, "strategy": "type_tag"}"#).unwrap();

        assert!(config.enabled);
        assert_eq!(config.strategy, MaskingStrategy::TypeTag);
        assert_eq!(config.confidence_threshold, 0.7);
        assert_eq!(config.csv.header, HeaderMode::Auto);
    }

    #[test]
    fn test_default_enabled_types() {
        let types = MaskingConfig::enabled().enabled_types();

        assert!(types.contains(&PiiType::Email));
        assert!(types.contains(&PiiType::CreditCard));
        assert!(!types.contains(&PiiType::IpAddress));
        assert!(!types.contains(&PiiType::Url));
        assert!(!types.contains(&PiiType::Custom));
    }

    #[test]
    fn test_type_toggles_merge_over_defaults() {
        let mut config = MaskingConfig::enabled();
        config.types.insert(PiiType::Email, false);
        config.types.insert(PiiType::IpAddress, true);

        let types = config.enabled_types();
        assert!(!types.contains(&PiiType::Email));
        assert!(types.contains(&PiiType::IpAddress));
        assert!(types.contains(&PiiType::Phone));
    }

    #[test]
    fn test_manual_mode_uses_explicit_types_only() {
        let mut config = MaskingConfig::enabled();
        config.mode = MaskingMode::Manual;
        config.types.insert(PiiType::Email, true);
        config.types.insert(PiiType::Phone, false);

        let types = config.enabled_types();
        assert_eq!(types.into_iter().collect::<Vec<_>>(), vec![PiiType::Email]);
    }

    #[test]
    fn test_preset_replaces_toggles() {
        let mut config = MaskingConfig::enabled();
        config.preset = Preset::Financial;
        config.types.insert(PiiType::Email, true);

        let types = config.enabled_types();
        assert!(!types.contains(&PiiType::Email));
        assert!(types.contains(&PiiType::AustralianAbn));
        assert!(types.contains(&PiiType::Iban));
    }

    #[test]
    fn test_custom_patterns_enable_custom_type() {
        let mut config = MaskingConfig::enabled();
        config.custom_patterns.push(CustomPatternConfig {
            name: "ticket".to_string(),
            pattern: r"TICKET-\d+".to_string(),
            confidence: 0.9,
            enabled: true,
            replacement: None,
        });
        assert!(config.enabled_types().contains(&PiiType::Custom));

        config.types.insert(PiiType::Custom, false);
        assert!(!config.enabled_types().contains(&PiiType::Custom));
    }

    #[test]
    fn test_strict_mode_threshold() {
        let mut config = MaskingConfig::enabled();
        config.mode = MaskingMode::Strict;
        assert!((config.effective_threshold() - 0.8).abs() < 1e-6);

        config.confidence_threshold = 0.9;
        assert_eq!(config.effective_threshold(), 0.95);
    }

    #[test]
    fn test_normalize() {
        let mut config = MaskingConfig::enabled();
        config.deny_list = vec!["  Secret ".into(), "secret".into(), "".into()];
        config.allow_list = vec!["Example.COM".into()];
        config.confidence_threshold = 1.7;
        config.custom_patterns.push(CustomPatternConfig {
            name: "off".to_string(),
            pattern: "x".to_string(),
            confidence: 0.8,
            enabled: false,
            replacement: None,
        });

        let config = config.normalize();
        assert_eq!(config.deny_list, vec!["secret".to_string()]);
        assert_eq!(config.allow_list, vec!["example.com".to_string()]);
        assert_eq!(config.confidence_threshold, 1.0);
        assert!(config.custom_patterns.is_empty());
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("full".parse::<MaskingStrategy>().unwrap(), MaskingStrategy::Full);
        assert_eq!("type-tag".parse::<MaskingStrategy>().unwrap(), MaskingStrategy::TypeTag);
        assert!("scramble".parse::<MaskingStrategy>().is_err());
        assert!(MaskingStrategy::Partial.is_length_preserving());
        assert!(!MaskingStrategy::Hash.is_length_preserving());
    }

    #[test]
    fn test_column_selector_deserialization() {
        let options: CsvOptions =
            serde_json::from_str(r#"{"skip_columns": [2, "Notes"]}"#).unwrap();

        assert_eq!(options.skip_columns[0], ColumnSelector::Index(2));
        assert!(options.skip_columns[1].matches(5, Some(" notes ")));
        assert!(!options.skip_columns[1].matches(5, None));
    }
}
