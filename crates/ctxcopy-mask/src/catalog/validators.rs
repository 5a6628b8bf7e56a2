//! Format and checksum validators for catalog rules
//!
//! Format validators reject implausible matches outright. Checksum validators
//! confirm a match as a genuine instance of its category; what happens when a
//! checksum fails is decided by the detector's mandatory-checksum policy.

use chrono::{Datelike, Local, NaiveDate};

/// ABN weights, applied after decrementing the first digit.
const ABN_WEIGHTS: [u32; 11] = [10, 1, 3, 5, 7, 9, 11, 13, 15, 17, 19];
const ABN_MODULUS: u32 = 89;

const TFN_WEIGHTS_9: [u32; 9] = [1, 4, 3, 7, 5, 8, 6, 9, 10];
const TFN_WEIGHTS_8: [u32; 8] = [10, 7, 8, 4, 6, 3, 5, 2];
const TFN_MODULUS: u32 = 11;

const MEDICARE_WEIGHTS: [u32; 8] = [1, 3, 7, 9, 1, 3, 7, 9];

const ROUTING_WEIGHTS: [u32; 9] = [3, 7, 1, 3, 7, 1, 3, 7, 1];

/// National Insurance prefixes that are never allocated
const NINO_INVALID_PREFIXES: [&str; 7] = ["BG", "GB", "KN", "NK", "NT", "TN", "ZZ"];

/// Minimum Shannon entropy (bits per character) for an API-key-like token
const MIN_API_KEY_ENTROPY: f64 = 3.0;

fn digits(value: &str) -> Vec<u32> {
    value.chars().filter_map(|c| c.to_digit(10)).collect()
}

/// Validate a credit card number using the Luhn algorithm
pub fn luhn_check(number: &str) -> bool {
    let digits = digits(number);

    if digits.len() < 13 || digits.len() > 19 {
        return false;
    }

    let checksum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();

    checksum.is_multiple_of(10)
}

/// Validate an Australian Business Number.
///
/// Non-digits are stripped first. Exactly 11 digits are required; the first
/// digit is decremented by one, every digit is weighted positionally and the
/// weighted sum must be divisible by 89.
pub fn abn_check(abn: &str) -> bool {
    let digits = digits(abn);

    if digits.len() != ABN_WEIGHTS.len() {
        return false;
    }

    // A leading zero cannot be decremented; no issued ABN starts with 0.
    let Some(first) = digits[0].checked_sub(1) else {
        return false;
    };

    let sum: u32 = std::iter::once(first)
        .chain(digits[1..].iter().copied())
        .zip(ABN_WEIGHTS)
        .map(|(d, w)| d * w)
        .sum();

    sum.is_multiple_of(ABN_MODULUS)
}

/// Validate an Australian Tax File Number (9 digits, or the legacy 8-digit form)
pub fn tfn_check(tfn: &str) -> bool {
    let digits = digits(tfn);

    let weights: &[u32] = match digits.len() {
        9 => &TFN_WEIGHTS_9,
        8 => &TFN_WEIGHTS_8,
        _ => return false,
    };

    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    sum.is_multiple_of(TFN_MODULUS)
}

/// Validate an Australian Medicare card number (10 digits, 9th is the check digit)
pub fn medicare_check(medicare: &str) -> bool {
    let digits = digits(medicare);

    if digits.len() != 10 || !(2..=6).contains(&digits[0]) {
        return false;
    }

    let sum: u32 = digits[..8]
        .iter()
        .zip(MEDICARE_WEIGHTS)
        .map(|(d, w)| d * w)
        .sum();

    sum % 10 == digits[8]
}

/// Validate a US ABA routing number (weights 3, 7, 1 repeating, mod 10)
pub fn routing_number_check(routing: &str) -> bool {
    let digits = digits(routing);

    if digits.len() != ROUTING_WEIGHTS.len() {
        return false;
    }

    let sum: u32 = digits.iter().zip(ROUTING_WEIGHTS).map(|(d, w)| d * w).sum();
    sum > 0 && sum.is_multiple_of(10)
}

/// Reject National Insurance numbers with an unallocated prefix
pub fn is_valid_nino(nino: &str) -> bool {
    let compact: String = nino.chars().filter(|c| !c.is_whitespace()).collect();
    compact.len() == 9 && !NINO_INVALID_PREFIXES.iter().any(|p| compact.starts_with(p))
}

/// Validate an IBAN with the ISO 13616 mod-97 check
pub fn iban_check(iban: &str) -> bool {
    let cleaned: String = iban
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if cleaned.len() < 15 || cleaned.len() > 34 || !cleaned.is_ascii() {
        return false;
    }

    let (head, tail) = cleaned.split_at(4);
    let mut remainder: u32 = 0;

    for c in tail.chars().chain(head.chars()) {
        let value = match c {
            '0'..='9' => c as u32 - '0' as u32,
            'A'..='Z' => c as u32 - 'A' as u32 + 10,
            _ => return false,
        };
        remainder = if value >= 10 {
            (remainder * 100 + value) % 97
        } else {
            (remainder * 10 + value) % 97
        };
    }

    remainder == 1
}

/// Basic email structure check: something@domain.tld
pub fn is_valid_email_format(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .rsplit_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && tld.len() >= 2)
        }
        None => false,
    }
}

/// Local numbers have at least 7 digits, international ones at most 15
pub fn is_valid_phone_format(phone: &str) -> bool {
    let count = digits(phone).len();
    (7..=15).contains(&count)
}

/// Reject SSNs the issuing authority never assigns
pub fn is_valid_ssn(ssn: &str) -> bool {
    let digits: String = ssn.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() != 9 {
        return false;
    }

    if digits.starts_with("000") || digits[3..5] == *"00" || digits[5..9] == *"0000" {
        return false;
    }

    // 666 is never issued and 9xx is reserved for ITINs
    !(digits.starts_with("666") || digits.starts_with('9'))
}

/// A BSB is exactly six digits
pub fn is_valid_bsb_format(bsb: &str) -> bool {
    digits(bsb).len() == 6
}

/// Keyword-prefixed identifiers must contain at least one digit
pub fn has_digit(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_digit())
}

/// Shannon entropy in bits per character
pub fn shannon_entropy(value: &str) -> f64 {
    let total = value.chars().count();
    if total == 0 {
        return 0.0;
    }

    let mut counts = std::collections::HashMap::new();
    for c in value.chars() {
        *counts.entry(c).or_insert(0usize) += 1;
    }

    counts
        .values()
        .map(|&n| {
            let p = n as f64 / total as f64;
            -p * p.log2()
        })
        .sum()
}

/// API keys are long and random; low-entropy tokens are usually identifiers
pub fn is_high_entropy_token(token: &str) -> bool {
    token.chars().count() >= 20 && shannon_entropy(token) >= MIN_API_KEY_ENTROPY
}

/// A date is a plausible birth date when it is a real calendar date and the
/// person would be between 18 and 120 years old today.
pub fn is_plausible_birth_date(value: &str) -> bool {
    let parts: Vec<&str> = value.trim().split(['-', '/', '.']).collect();
    let [a, b, c] = parts.as_slice() else {
        return false;
    };

    let (year, month, day) = if a.len() == 4 {
        (a, b, c)
    } else if c.len() == 4 {
        (c, b, a)
    } else {
        return false;
    };

    let (Ok(year), Ok(month), Ok(day)) = (year.parse::<i32>(), month.parse(), day.parse()) else {
        return false;
    };

    if NaiveDate::from_ymd_opt(year, month, day).is_none() {
        return false;
    }

    let age = Local::now().year() - year;
    (18..=120).contains(&age)
}
