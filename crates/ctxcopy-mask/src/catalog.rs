//! Pattern catalog
//!
//! The built-in detectors are compiled once per process and shared. A
//! [`PatternCatalog`] is the per-pass selection of enabled built-in rules plus
//! the user's custom patterns.

pub mod validators;

use crate::config::{CustomPatternConfig, MaskingConfig};
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Categories of sensitive data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiType {
    Email,
    Url,
    Phone,
    Ssn,
    CreditCard,
    AustralianBsb,
    AustralianTfn,
    AustralianAbn,
    AustralianMedicare,
    Iban,
    Swift,
    RoutingNumber,
    IpAddress,
    DateOfBirth,
    StreetAddress,
    Passport,
    DriversLicense,
    NationalId,
    UkNationalInsurance,
    AccountNumber,
    ClientNumber,
    ReferenceNumber,
    PolicyNumber,
    TransactionId,
    ApiKey,
    GenericSecret,
    /// User-defined patterns and deny-list entries
    Custom,
}

impl PiiType {
    pub const ALL: [PiiType; 27] = [
        PiiType::Email,
        PiiType::Url,
        PiiType::Phone,
        PiiType::Ssn,
        PiiType::CreditCard,
        PiiType::AustralianBsb,
        PiiType::AustralianTfn,
        PiiType::AustralianAbn,
        PiiType::AustralianMedicare,
        PiiType::Iban,
        PiiType::Swift,
        PiiType::RoutingNumber,
        PiiType::IpAddress,
        PiiType::DateOfBirth,
        PiiType::StreetAddress,
        PiiType::Passport,
        PiiType::DriversLicense,
        PiiType::NationalId,
        PiiType::UkNationalInsurance,
        PiiType::AccountNumber,
        PiiType::ClientNumber,
        PiiType::ReferenceNumber,
        PiiType::PolicyNumber,
        PiiType::TransactionId,
        PiiType::ApiKey,
        PiiType::GenericSecret,
        PiiType::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PiiType::Email => "email",
            PiiType::Url => "url",
            PiiType::Phone => "phone",
            PiiType::Ssn => "ssn",
            PiiType::CreditCard => "credit_card",
            PiiType::AustralianBsb => "australian_bsb",
            PiiType::AustralianTfn => "australian_tfn",
            PiiType::AustralianAbn => "australian_abn",
            PiiType::AustralianMedicare => "australian_medicare",
            PiiType::Iban => "iban",
            PiiType::Swift => "swift",
            PiiType::RoutingNumber => "routing_number",
            PiiType::IpAddress => "ip_address",
            PiiType::DateOfBirth => "date_of_birth",
            PiiType::StreetAddress => "street_address",
            PiiType::Passport => "passport",
            PiiType::DriversLicense => "drivers_license",
            PiiType::NationalId => "national_id",
            PiiType::UkNationalInsurance => "uk_national_insurance",
            PiiType::AccountNumber => "account_number",
            PiiType::ClientNumber => "client_number",
            PiiType::ReferenceNumber => "reference_number",
            PiiType::PolicyNumber => "policy_number",
            PiiType::TransactionId => "transaction_id",
            PiiType::ApiKey => "api_key",
            PiiType::GenericSecret => "generic_secret",
            PiiType::Custom => "custom",
        }
    }

    /// Placeholder used by the type-tag strategy
    pub fn label(&self) -> &'static str {
        match self {
            PiiType::Email => "[EMAIL]",
            PiiType::Url => "[URL]",
            PiiType::Phone => "[PHONE]",
            PiiType::Ssn => "[SSN]",
            PiiType::CreditCard => "[CREDIT_CARD]",
            PiiType::AustralianBsb => "[BSB]",
            PiiType::AustralianTfn => "[TFN]",
            PiiType::AustralianAbn => "[ABN]",
            PiiType::AustralianMedicare => "[MEDICARE]",
            PiiType::Iban => "[IBAN]",
            PiiType::Swift => "[SWIFT]",
            PiiType::RoutingNumber => "[ROUTING]",
            PiiType::IpAddress => "[IP_ADDRESS]",
            PiiType::DateOfBirth => "[DOB]",
            PiiType::StreetAddress => "[ADDRESS]",
            PiiType::Passport => "[PASSPORT]",
            PiiType::DriversLicense => "[LICENSE]",
            PiiType::NationalId => "[NATIONAL_ID]",
            PiiType::UkNationalInsurance => "[NI_NUMBER]",
            PiiType::AccountNumber => "[ACCOUNT]",
            PiiType::ClientNumber => "[CLIENT]",
            PiiType::ReferenceNumber => "[REFERENCE]",
            PiiType::PolicyNumber => "[POLICY]",
            PiiType::TransactionId => "[TRANSACTION]",
            PiiType::ApiKey => "[API_KEY]",
            PiiType::GenericSecret => "[SECRET]",
            PiiType::Custom => "[REDACTED]",
        }
    }

    /// Short prefix used in hash tokens
    pub fn abbrev(&self) -> &'static str {
        match self {
            PiiType::Email => "EM",
            PiiType::Url => "URL",
            PiiType::Phone => "PH",
            PiiType::Ssn => "SSN",
            PiiType::CreditCard => "CC",
            PiiType::AustralianBsb => "BSB",
            PiiType::AustralianTfn => "TFN",
            PiiType::AustralianAbn => "ABN",
            PiiType::AustralianMedicare => "MED",
            PiiType::Iban => "IBAN",
            PiiType::Swift => "BIC",
            PiiType::RoutingNumber => "RTN",
            PiiType::IpAddress => "IP",
            PiiType::DateOfBirth => "DOB",
            PiiType::StreetAddress => "ADR",
            PiiType::Passport => "PP",
            PiiType::DriversLicense => "DL",
            PiiType::NationalId => "NID",
            PiiType::UkNationalInsurance => "NI",
            PiiType::AccountNumber => "ACC",
            PiiType::ClientNumber => "CLI",
            PiiType::ReferenceNumber => "REF",
            PiiType::PolicyNumber => "POL",
            PiiType::TransactionId => "TXN",
            PiiType::ApiKey => "KEY",
            PiiType::GenericSecret => "SEC",
            PiiType::Custom => "CUS",
        }
    }

    /// Characters left visible by the partial strategy as (prefix, suffix),
    /// before the 30% reveal cap is applied
    pub fn partial_reveal(&self) -> (usize, usize) {
        match self {
            PiiType::Email => (1, 4),
            PiiType::CreditCard => (0, 4),
            PiiType::Iban => (2, 4),
            PiiType::Swift => (4, 0),
            PiiType::Phone
            | PiiType::AccountNumber
            | PiiType::AustralianBsb
            | PiiType::RoutingNumber => (0, 2),
            PiiType::ApiKey => (3, 0),
            PiiType::GenericSecret | PiiType::StreetAddress => (0, 0),
            _ => (1, 2),
        }
    }

    /// Field names that make a nearby match much more likely to be this type
    pub fn field_keywords(&self) -> &'static [&'static str] {
        match self {
            PiiType::Email => &["email", "e-mail", "mail"],
            PiiType::Url => &["url", "link", "href"],
            PiiType::Phone => &["phone", "mobile", "tel", "fax", "cell"],
            PiiType::Ssn => &["ssn", "social security"],
            PiiType::CreditCard => &["card", "visa", "mastercard", "amex"],
            PiiType::AustralianBsb => &["bsb", "branch"],
            PiiType::AustralianTfn => &["tfn", "tax file"],
            PiiType::AustralianAbn => &["abn", "business number"],
            PiiType::AustralianMedicare => &["medicare"],
            PiiType::Iban => &["iban"],
            PiiType::Swift => &["swift", "bic"],
            PiiType::RoutingNumber => &["routing", "aba"],
            PiiType::IpAddress => &["ip address", "ip_address", "ipaddr", "host", "server"],
            PiiType::DateOfBirth => &["dob", "birth"],
            PiiType::StreetAddress => &["address", "addr", "residential", "postal", "ship to"],
            PiiType::Passport => &["passport"],
            PiiType::DriversLicense => &["licence", "license", "driver"],
            PiiType::NationalId => &["national id", "identity", "id card"],
            PiiType::UkNationalInsurance => &["national insurance", "nino", "ni number"],
            PiiType::AccountNumber => &["account"],
            PiiType::ClientNumber => &["client", "customer", "member"],
            PiiType::ReferenceNumber => &["reference", "invoice"],
            PiiType::PolicyNumber => &["policy"],
            PiiType::TransactionId => &["transaction", "txn"],
            PiiType::ApiKey => &["key", "token", "secret"],
            PiiType::GenericSecret => &["password", "secret", "token"],
            PiiType::Custom => &[],
        }
    }

    /// Digit-structured identifiers that must not be carved out of a longer number
    pub fn is_numeric_identifier(&self) -> bool {
        matches!(
            self,
            PiiType::Phone
                | PiiType::Ssn
                | PiiType::CreditCard
                | PiiType::AustralianBsb
                | PiiType::AustralianTfn
                | PiiType::AustralianAbn
                | PiiType::AustralianMedicare
                | PiiType::RoutingNumber
        )
    }

    /// Whether the type is enabled when the configuration does not mention it
    pub fn enabled_by_default(&self) -> bool {
        !matches!(
            self,
            PiiType::Url
                | PiiType::IpAddress
                | PiiType::RoutingNumber
                | PiiType::ReferenceNumber
                | PiiType::PolicyNumber
                | PiiType::TransactionId
                | PiiType::Custom
        )
    }
}

impl fmt::Display for PiiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Algorithmic check applied to the matched text
pub type Validator = fn(&str) -> bool;

/// Keywords that must (or must not) appear shortly before a match
#[derive(Debug, Clone, Copy)]
pub struct ContextRule {
    pub required: &'static [&'static str],
    pub excluded: &'static [&'static str],
    /// Characters of preceding text to inspect
    pub window: usize,
}

impl ContextRule {
    /// Check the rule against the text preceding a match (any case)
    pub fn accepts(&self, preceding: &str) -> bool {
        let lowered = preceding.to_lowercase();
        (self.required.is_empty() || self.required.iter().any(|k| lowered.contains(k)))
            && !self.excluded.iter().any(|k| lowered.contains(k))
    }
}

/// One detector in the catalog
#[derive(Debug, Clone)]
pub struct PatternRule {
    /// Rule name reported on detections (e.g. `credit_card_amex`, `custom:ticket`)
    pub name: String,
    pub pii_type: PiiType,
    pub regex: Regex,
    /// Only this capture group is reported and masked (e.g. the value of `password=...`)
    pub value_group: Option<usize>,
    pub base_confidence: f32,
    /// Format check; a failing match is always rejected
    pub validator: Option<Validator>,
    /// Check-digit algorithm; raises confidence on success
    pub checksum: Option<Validator>,
    pub context: Option<ContextRule>,
    /// Replacement used by the type-tag strategy instead of the type label
    pub replacement: Option<String>,
}

impl PatternRule {
    fn builtin(name: &str, pii_type: PiiType, pattern: &str, base_confidence: f32) -> Self {
        Self {
            name: name.to_string(),
            pii_type,
            regex: Regex::new(pattern).expect("built-in pattern must compile"),
            value_group: None,
            base_confidence,
            validator: None,
            checksum: None,
            context: None,
            replacement: None,
        }
    }

    fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    fn checksum(mut self, checksum: Validator) -> Self {
        self.checksum = Some(checksum);
        self
    }

    fn value_group(mut self, group: usize) -> Self {
        self.value_group = Some(group);
        self
    }

    fn context(mut self, context: ContextRule) -> Self {
        self.context = Some(context);
        self
    }

    /// Compile a user-defined pattern
    pub fn custom(pattern: &CustomPatternConfig) -> Result<Self> {
        let regex = Regex::new(&pattern.pattern).map_err(|source| Error::InvalidPattern {
            name: pattern.name.clone(),
            source,
        })?;

        Ok(Self {
            name: format!("custom:{}", pattern.name),
            pii_type: PiiType::Custom,
            regex,
            value_group: None,
            base_confidence: pattern.confidence.clamp(0.0, 1.0),
            validator: None,
            checksum: None,
            context: None,
            replacement: pattern.replacement.clone(),
        })
    }
}

const SWIFT_KEYWORDS: &[&str] = &["swift", "bic"];

const ROUTING_KEYWORDS: &[&str] = &["routing", "aba", "rtn"];

const BIRTH_KEYWORDS: &[&str] = &["birth", "dob", "born", "bday"];

const NON_BIRTH_KEYWORDS: &[&str] = &[
    "eligible", "service", "start", "expiry", "expire", "effective", "transaction", "created",
    "modified", "updated", "issued", "payment", "settlement", "registration", "renewal",
    "maturity", "statement",
];

static BUILTIN_RULES: Lazy<Vec<PatternRule>> = Lazy::new(|| {
    use validators::*;

    vec![
        PatternRule::builtin(
            "email",
            PiiType::Email,
            r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
            0.85,
        )
        .validator(is_valid_email_format),
        PatternRule::builtin("url", PiiType::Url, r#"\bhttps?://[^\s<>"'()\[\]]+"#, 0.50),
        // (555) 123-4567, 555-123-4567, +1 555 123 4567, 02 9876 5432
        PatternRule::builtin(
            "phone",
            PiiType::Phone,
            r"(?:\+\d{1,3}[-.\s]?)?(?:\(\d{2,4}\)[-.\s]?|\b\d{2,4}[-.\s]?)?\b\d{3,4}[-.\s]?\d{4}\b",
            0.70,
        )
        .validator(is_valid_phone_format),
        PatternRule::builtin(
            "australian_phone",
            PiiType::Phone,
            r"(?:\+61[\s-]?|\b0)[2-478](?:[\s-]?\d){8}\b",
            0.70,
        )
        .validator(is_valid_phone_format),
        PatternRule::builtin("ssn", PiiType::Ssn, r"\b\d{3}-\d{2}-\d{4}\b", 0.90)
            .validator(is_valid_ssn),
        PatternRule::builtin(
            "credit_card",
            PiiType::CreditCard,
            r"\b(?:\d{4}[-\s]?){3}\d{4}\b",
            0.90,
        )
        .checksum(luhn_check),
        PatternRule::builtin(
            "credit_card_amex",
            PiiType::CreditCard,
            r"\b3[47]\d{2}[-\s]?\d{6}[-\s]?\d{5}\b",
            0.90,
        )
        .checksum(luhn_check),
        PatternRule::builtin("australian_bsb", PiiType::AustralianBsb, r"\b\d{3}[-\s]\d{3}\b", 0.80)
            .validator(is_valid_bsb_format),
        PatternRule::builtin(
            "australian_tfn",
            PiiType::AustralianTfn,
            r"\b\d{3}[-\s]?\d{3}[-\s]?\d{2,3}\b",
            0.85,
        )
        .checksum(tfn_check),
        PatternRule::builtin(
            "australian_abn",
            PiiType::AustralianAbn,
            r"\b\d{2}[-\s]?\d{3}[-\s]?\d{3}[-\s]?\d{3}\b",
            0.85,
        )
        .checksum(abn_check),
        PatternRule::builtin(
            "australian_medicare",
            PiiType::AustralianMedicare,
            r"\b[2-6]\d{3}[-\s]?\d{5}[-\s]?\d\b",
            0.75,
        )
        .checksum(medicare_check),
        PatternRule::builtin(
            "iban",
            PiiType::Iban,
            r"\b[A-Z]{2}\d{2}(?: ?[A-Z0-9]{4}){2,7}(?: ?[A-Z0-9]{1,4})?\b",
            0.92,
        )
        .checksum(iban_check),
        PatternRule::builtin(
            "swift",
            PiiType::Swift,
            r"\b[A-Z]{6}[A-Z0-9]{2}(?:[A-Z0-9]{3})?\b",
            0.80,
        )
        .context(ContextRule {
            required: SWIFT_KEYWORDS,
            excluded: &[],
            window: 40,
        }),
        PatternRule::builtin("routing_number", PiiType::RoutingNumber, r"\b\d{9}\b", 0.55)
            .validator(routing_number_check)
            .context(ContextRule {
                required: ROUTING_KEYWORDS,
                excluded: &[],
                window: 40,
            }),
        PatternRule::builtin(
            "ipv4",
            PiiType::IpAddress,
            r"\b(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\b",
            0.50,
        ),
        PatternRule::builtin(
            "ipv6",
            PiiType::IpAddress,
            r"\b(?:[0-9a-fA-F]{1,4}:){7}[0-9a-fA-F]{1,4}\b",
            0.50,
        ),
        PatternRule::builtin(
            "date_of_birth",
            PiiType::DateOfBirth,
            r"\b(?:\d{4}[-/.]\d{1,2}[-/.]\d{1,2}|\d{1,2}[-/.]\d{1,2}[-/.]\d{4})\b",
            0.60,
        )
        .validator(is_plausible_birth_date)
        .context(ContextRule {
            required: BIRTH_KEYWORDS,
            excluded: NON_BIRTH_KEYWORDS,
            window: 100,
        }),
        // 42 Wallaby Way, 10 Downing St
        PatternRule::builtin(
            "street_address",
            PiiType::StreetAddress,
            r"\b\d{1,5}[A-Za-z]?\s+(?:[A-Z][a-z]+\s+){1,4}(?i:street|st|road|rd|avenue|ave|lane|ln|drive|dr|court|ct|place|pl|boulevard|blvd|parade|pde|crescent|cres|terrace|tce|highway|hwy|way)\b",
            0.65,
        ),
        PatternRule::builtin(
            "passport",
            PiiType::Passport,
            r"(?i)\b(?:passport|pass)(?:\s*(?:no|number|num))?[#:.\s-]*([A-Z0-9]{6,12})\b",
            0.70,
        )
        .value_group(1)
        .validator(has_digit),
        PatternRule::builtin(
            "account_number",
            PiiType::AccountNumber,
            r"(?i)\b(?:account|acct|acc|a/c)(?:\s*(?:no|number|num))?[#:.\s-]*(\d{6,12})\b",
            0.70,
        )
        .value_group(1),
        PatternRule::builtin(
            "drivers_license",
            PiiType::DriversLicense,
            r"(?i)\b(?:driver'?s?\s*licen[cs]e|licen[cs]e|lic|dl)(?:\s*(?:no|number|num))?[#:.\s-]*([A-Z0-9]{6,15})\b",
            0.70,
        )
        .value_group(1)
        .validator(has_digit),
        // UK photocard licence: surname, birth date, initials, check digits
        PatternRule::builtin(
            "drivers_license_uk",
            PiiType::DriversLicense,
            r"\b[A-Z9]{5}\d{6}[A-Z9]{2}\d[A-Z]{2}\b",
            0.80,
        ),
        PatternRule::builtin(
            "national_id",
            PiiType::NationalId,
            r"(?i)\b(?:national\s*id(?:entity)?|identity\s*(?:card|document)?|id\s*card)(?:\s*(?:no|number|num))?[#:.\s-]*([A-Z0-9]{6,15})\b",
            0.70,
        )
        .value_group(1)
        .validator(has_digit),
        PatternRule::builtin(
            "uk_national_insurance",
            PiiType::UkNationalInsurance,
            r"\b[A-CEGHJ-PR-TW-Z][A-CEGHJ-NPR-TW-Z] ?\d{2} ?\d{2} ?\d{2} ?[A-D]\b",
            0.80,
        )
        .validator(is_valid_nino),
        PatternRule::builtin(
            "client_number",
            PiiType::ClientNumber,
            r"(?i)\b(?:client|customer|cust|member)[\s_-]*(?:number|num|no|id)\b[#:.\s-]*(\d{4,12})\b",
            0.55,
        )
        .value_group(1),
        PatternRule::builtin(
            "reference_number",
            PiiType::ReferenceNumber,
            r"(?i)\b(?:reference|invoice|ref)(?:\s*(?:number|num|no))?[#:.\s-]*([A-Z0-9]{6,15})\b",
            0.40,
        )
        .value_group(1)
        .validator(has_digit),
        PatternRule::builtin(
            "policy_number",
            PiiType::PolicyNumber,
            r"(?i)\b(?:policy|pol)(?:\s*(?:number|num|no))?[#:.\s-]*([A-Z0-9]{6,15})\b",
            0.50,
        )
        .value_group(1)
        .validator(has_digit),
        PatternRule::builtin(
            "transaction_id",
            PiiType::TransactionId,
            r"(?i)\b(?:transaction|trans|txn)(?:\s*(?:number|num|no|id))?[#:.\s-]*([A-Z0-9]{8,20})\b",
            0.45,
        )
        .value_group(1)
        .validator(has_digit),
        PatternRule::builtin(
            "api_key",
            PiiType::ApiKey,
            r"\b(?:sk-(?:proj-)?[A-Za-z0-9_-]{20,}|sk_(?:live|test)_[A-Za-z0-9]{16,}|pk_(?:live|test)_[A-Za-z0-9]{16,}|gh[pousr]_[A-Za-z0-9]{36,}|github_pat_[A-Za-z0-9_]{22,}|xox[abprs]-[A-Za-z0-9-]{10,}|AKIA[0-9A-Z]{16}|AIza[0-9A-Za-z_-]{35})",
            0.85,
        )
        .validator(is_high_entropy_token),
        PatternRule::builtin(
            "generic_secret",
            PiiType::GenericSecret,
            r#"(?i)\b(?:password|passwd|pwd|secret|token|api[_-]?key|access[_-]?key|private[_-]?key|client[_-]?secret|auth_token)\b["']?\s*[:=]\s*["']?([^\s"',;<>*]{4,})"#,
            0.90,
        )
        .value_group(1),
    ]
});

/// All built-in rules, compiled on first use
pub fn builtin_rules() -> &'static [PatternRule] {
    &BUILTIN_RULES
}

/// The rules active for one masking pass
#[derive(Debug, Clone, Default)]
pub struct PatternCatalog {
    rules: Vec<PatternRule>,
}

impl PatternCatalog {
    /// Select enabled built-in rules and compile custom patterns.
    ///
    /// A malformed custom pattern is skipped with a warning; the rest of the
    /// catalog stays usable.
    pub fn for_config(config: &MaskingConfig) -> Self {
        let enabled = config.enabled_types();

        let mut rules: Vec<PatternRule> = builtin_rules()
            .iter()
            .filter(|rule| enabled.contains(&rule.pii_type))
            .cloned()
            .collect();

        if enabled.contains(&PiiType::Custom) {
            for pattern in config.custom_patterns.iter().filter(|p| p.enabled) {
                match PatternRule::custom(pattern) {
                    Ok(rule) => rules.push(rule),
                    Err(e) => warn!("Skipping custom pattern: {}", e),
                }
            }
        }

        debug!("Pattern catalog built with {} rules", rules.len());

        Self { rules }
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Types covered by at least one active rule, in declaration order
    pub fn types(&self) -> Vec<PiiType> {
        let mut types: Vec<PiiType> = self.rules.iter().map(|r| r.pii_type).collect();
        types.sort();
        types.dedup();
        types
    }
}
