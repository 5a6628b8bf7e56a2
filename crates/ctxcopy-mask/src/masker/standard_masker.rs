//! Standard masker implementation

use crate::catalog::PiiType;
use crate::config::{MaskingConfig, MaskingStrategy};
use crate::detector::Detection;
use crate::error::{Error, Result};
use crate::masker::{MASK_CHAR, Masker};
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Key used by the hash strategy when no secret is configured
const DEFAULT_HASH_KEY: &[u8] = b"ctxcopy-mask";

/// Characters of the encoded digest kept in a hash token
const TOKEN_LEN: usize = 12;

/// Share of a value's letters and digits the partial strategy may reveal
const MAX_REVEAL_RATIO: f32 = 0.3;

/// Standard implementation of the masking strategies
#[derive(Clone)]
pub struct StandardMasker {
    strategy: MaskingStrategy,
    hmac_key: Vec<u8>,
}

impl std::fmt::Debug for StandardMasker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandardMasker")
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

impl StandardMasker {
    pub fn new(strategy: MaskingStrategy, hash_secret: Option<&str>) -> Self {
        let hmac_key = hash_secret
            .map(|s| s.as_bytes().to_vec())
            .unwrap_or_else(|| DEFAULT_HASH_KEY.to_vec());

        Self { strategy, hmac_key }
    }

    pub fn from_config(config: &MaskingConfig) -> Self {
        Self::new(config.strategy, config.hash_secret.as_deref())
    }

    /// Replacement for one value.
    ///
    /// `replacement` overrides the type label for the type-tag strategy
    /// (custom rules may carry their own).
    pub fn mask_value(&self, value: &str, pii_type: PiiType, replacement: Option<&str>) -> String {
        match self.strategy {
            MaskingStrategy::Full => mask_full(value),
            MaskingStrategy::Partial => mask_partial(value, pii_type),
            MaskingStrategy::TypeTag => replacement.unwrap_or(pii_type.label()).to_string(),
            MaskingStrategy::Hash => self.hash_token(value, pii_type),
        }
    }

    /// Deterministic `[ABBREV:digest]` token
    fn hash_token(&self, value: &str, pii_type: PiiType) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.hmac_key).expect("HMAC can take key of any size");
        mac.update(value.as_bytes());
        let digest = mac.finalize().into_bytes();

        let encoded = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest);
        format!("[{}:{}]", pii_type.abbrev(), &encoded[..TOKEN_LEN.min(encoded.len())])
    }
}

/// Apply a strategy to a single value with the default hash key
pub fn apply_strategy(value: &str, pii_type: PiiType, strategy: MaskingStrategy) -> String {
    StandardMasker::new(strategy, None).mask_value(value, pii_type, None)
}

fn mask_full(value: &str) -> String {
    value.chars().map(|_| MASK_CHAR).collect()
}

/// Keep a short prefix/suffix of the letters and digits visible, capped at 30%
/// of them; separators stay in place so the value keeps its shape
fn mask_partial(value: &str, pii_type: PiiType) -> String {
    let significant = value.chars().filter(|c| c.is_alphanumeric()).count();
    let max_revealed = (significant as f32 * MAX_REVEAL_RATIO).floor() as usize;

    let (mut prefix, mut suffix) = pii_type.partial_reveal();
    while prefix + suffix > max_revealed {
        if suffix >= prefix && suffix > 0 {
            suffix -= 1;
        } else {
            prefix -= 1;
        }
    }

    let mut position = 0;
    value
        .chars()
        .map(|c| {
            if !c.is_alphanumeric() {
                return c;
            }
            let visible = position < prefix || position >= significant - suffix;
            position += 1;
            if visible { c } else { MASK_CHAR }
        })
        .collect()
}

impl Masker for StandardMasker {
    fn rewrite(&self, text: &str, detections: &[Detection]) -> Result<String> {
        if detections.is_empty() {
            return Ok(text.to_string());
        }

        let mut result = String::with_capacity(text.len());
        let mut last_end = 0;

        for detection in detections {
            let (start, end) = (detection.start, detection.end);
            if start < last_end
                || end < start
                || end > text.len()
                || !text.is_char_boundary(start)
                || !text.is_char_boundary(end)
            {
                return Err(Error::InvalidSpan { start, end });
            }

            result.push_str(&text[last_end..start]);
            result.push_str(&detection.masked);
            last_end = end;
        }

        result.push_str(&text[last_end..]);

        if self.strategy.is_length_preserving() {
            let expected = text.chars().count();
            let actual = result.chars().count();
            if expected != actual {
                return Err(Error::LengthMismatch { expected, actual });
            }
        }

        Ok(result)
    }

    fn strategy(&self) -> MaskingStrategy {
        self.strategy
    }
}
