//! User-facing summaries of a masking pass

use crate::config::MaskingConfig;
use crate::engine::MaskingResult;
use serde::{Deserialize, Serialize};

/// Short status shown after a copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusIndicator {
    pub text: String,
    pub tooltip: String,
    /// Set when something was actually masked
    pub warning: bool,
}

/// Status for a finished pass; `None` when masking is off or the indicator hidden
pub fn status_indicator(result: &MaskingResult, config: &MaskingConfig) -> Option<StatusIndicator> {
    if !config.enabled || !config.show_indicator {
        return None;
    }

    let count = result.detections.len();
    Some(if result.masking_applied {
        StatusIndicator {
            text: format!("{} masked", count),
            tooltip: format!("Data masking active: {} {} masked", count, plural("item", count)),
            warning: true,
        }
    } else {
        StatusIndicator {
            text: "Masking active".to_string(),
            tooltip: "Data masking enabled (no sensitive data detected)".to_string(),
            warning: false,
        }
    })
}

/// Notification text such as `Copied with 3 items masked: 2 emails, 1 credit_card`
pub fn notification_message(result: &MaskingResult, config: &MaskingConfig) -> Option<String> {
    if !config.enabled || result.detections.is_empty() {
        return None;
    }

    let count = result.detections.len();
    Some(format!(
        "Copied with {} {} masked: {}",
        count,
        plural("item", count),
        breakdown(result)
    ))
}

/// Line appended to copied output when `include_stats` is set
pub fn stats_footer(result: &MaskingResult, config: &MaskingConfig) -> Option<String> {
    if !config.include_stats || result.detections.is_empty() {
        return None;
    }
    Some(format!("// Data masked: {}", breakdown(result)))
}

fn breakdown(result: &MaskingResult) -> String {
    result
        .counts_by_type()
        .iter()
        .map(|(pii_type, count)| format!("{} {}", count, plural(pii_type.as_str(), *count)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn plural(noun: &str, count: usize) -> String {
    if count == 1 {
        noun.to_string()
    } else {
        format!("{}s", noun)
    }
}
