//! Payload types exchanged with the notification engine.

use chrono::NaiveTime;
use portal_core::FieldError;
use serde::{Deserialize, Serialize};

pub const MAX_BATCH_SIZE: u32 = 10_000;

/// Global mail-marketing settings owned by the notification engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailMarketingConfig {
    /// Halts all marketing sends when true.
    pub paused: bool,
    pub batch_size: u32,
    /// `HH:MM`, interpreted in `timezone`.
    pub send_window_start: String,
    pub send_window_end: String,
    pub timezone: String,
}

impl MailMarketingConfig {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            errors.push(FieldError::new(
                "batchSize",
                format!("must be between 1 and {MAX_BATCH_SIZE}"),
            ));
        }
        for (field, value) in [
            ("sendWindowStart", &self.send_window_start),
            ("sendWindowEnd", &self.send_window_end),
        ] {
            if NaiveTime::parse_from_str(value, "%H:%M").is_err() {
                errors.push(FieldError::new(field, "must be a time formatted as HH:MM"));
            }
        }
        let tz = self.timezone.trim();
        if tz.is_empty() || tz.contains(char::is_whitespace) {
            errors.push(FieldError::new(
                "timezone",
                "must be an IANA zone name such as Europe/Berlin",
            ));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Outcome counts the engine reports for one campaign batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub sent: u64,
    pub failed: u64,
    pub skipped: u64,
    #[serde(default)]
    pub queued: u64,
}
