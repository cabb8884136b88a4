//! Pure eligibility predicates over application/score snapshots.
//!
//! No I/O happens here. Anything that needs an external service is split
//! into a fetch owned by a collaborator and a pure evaluation owned by this
//! module, which is what keeps the engine testable.

use super::domain::{CreditScoreClass, ScoreSnapshot};
use super::experiments::{ExperimentSetting, HighScoreBypassSetting};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::str::FromStr;

/// Referral codes blocked from origination outright, matched
/// case-insensitively.
const BLOCKED_REFERRAL_CODES: [&str; 2] = ["mdjulo", "mduckjulo"];

/// Bucket membership is inclusive on the lower bound and exclusive on the
/// upper bound: `min <= score < max`.
pub fn score_in_bucket(score: f64, min: f64, max: f64) -> bool {
    min <= score && score < max
}

pub fn is_c_score(snapshot: &ScoreSnapshot) -> bool {
    snapshot.score_class == CreditScoreClass::C
}

/// High-score full bypass: pgood at or above the configured bottom threshold
/// (inclusive), no fraud signals, and the application id selected into the
/// rollout remainder set.
pub fn is_high_score_full_bypass(
    snapshot: &ScoreSnapshot,
    setting: &HighScoreBypassSetting,
    application_id: i64,
) -> bool {
    if !setting.is_active {
        return false;
    }
    if snapshot.fraud_device || snapshot.bank_name_mismatch {
        return false;
    }
    if snapshot.pgood < setting.bottom_pgood_threshold {
        return false;
    }
    match &setting.selector {
        Some(selector) => selector.matches(application_id.unsigned_abs()),
        None => true,
    }
}

pub fn is_blocked_referral(code: Option<&str>) -> bool {
    match code {
        Some(code) => {
            let code = code.trim().to_ascii_lowercase();
            BLOCKED_REFERRAL_CODES.contains(&code.as_str())
        }
        None => false,
    }
}

/// Experiment membership window. Permanence short-circuits both the active
/// flag and the date window.
pub fn still_in_experiment(setting: &ExperimentSetting, today: NaiveDate) -> bool {
    if setting.is_permanent {
        return true;
    }
    setting.is_active && setting.start_date <= today && today <= setting.end_date
}

/// Deterministic rollout selector over the last digits of an identifier,
/// written `#nth:-k:r1,r2,...`: take `identifier mod 10^k` and test
/// membership in the remainder set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastDigitSelector {
    digits: u32,
    remainders: BTreeSet<u64>,
}

impl LastDigitSelector {
    pub fn matches(&self, identifier: u64) -> bool {
        let modulus = 10u64.pow(self.digits);
        self.remainders.contains(&(identifier % modulus))
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SelectorParseError {
    #[error("selector '{0}' must look like '#nth:-k:r1,r2,...'")]
    Malformed(String),
    #[error("selector digit count must be between 1 and 9, got {0}")]
    DigitCount(String),
    #[error("selector remainder '{0}' is not an integer")]
    Remainder(String),
}

impl FromStr for LastDigitSelector {
    type Err = SelectorParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let rest = raw
            .strip_prefix("#nth:-")
            .ok_or_else(|| SelectorParseError::Malformed(raw.to_string()))?;
        let (digits_raw, remainders_raw) = rest
            .split_once(':')
            .ok_or_else(|| SelectorParseError::Malformed(raw.to_string()))?;

        let digits: u32 = digits_raw
            .parse()
            .map_err(|_| SelectorParseError::DigitCount(digits_raw.to_string()))?;
        if !(1..=9).contains(&digits) {
            return Err(SelectorParseError::DigitCount(digits_raw.to_string()));
        }

        let mut remainders = BTreeSet::new();
        for part in remainders_raw.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let remainder: u64 = part
                .parse()
                .map_err(|_| SelectorParseError::Remainder(part.to_string()))?;
            remainders.insert(remainder);
        }
        if remainders.is_empty() {
            return Err(SelectorParseError::Malformed(raw.to_string()));
        }

        Ok(Self { digits, remainders })
    }
}
