//! Typed settings for experiment and feature-flag gated rules.
//!
//! The feature store hands back loosely-typed JSON parameters; everything is
//! validated here, once, at load time. Rule code only ever sees the typed
//! structs.

use super::rules::{LastDigitSelector, SelectorParseError};
use chrono::NaiveDate;
use serde_json::Value;

/// Parameters for the high-score full-bypass rule.
#[derive(Debug, Clone, PartialEq)]
pub struct HighScoreBypassSetting {
    pub is_active: bool,
    /// Inclusive lower pgood bound for the bypass.
    pub bottom_pgood_threshold: f64,
    /// Optional rollout selector over the application id; `None` selects
    /// every application.
    pub selector: Option<LastDigitSelector>,
}

impl HighScoreBypassSetting {
    /// Build from the raw JSON parameter blob stored on the feature setting.
    pub fn from_parameters(is_active: bool, parameters: &Value) -> Result<Self, SettingsError> {
        let bottom_pgood_threshold = parameters
            .get("bottom_pgood_threshold")
            .and_then(Value::as_f64)
            .ok_or(SettingsError::MissingField("bottom_pgood_threshold"))?;
        if !(0.0..=1.0).contains(&bottom_pgood_threshold) {
            return Err(SettingsError::ThresholdOutOfRange(bottom_pgood_threshold));
        }

        let selector = match parameters.get("selector").and_then(Value::as_str) {
            Some(raw) => Some(raw.parse().map_err(SettingsError::Selector)?),
            None => None,
        };

        Ok(Self {
            is_active,
            bottom_pgood_threshold,
            selector,
        })
    }
}

/// An experiment with an activation window. `is_permanent` keeps the
/// experiment live regardless of the window or active flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentSetting {
    pub code: String,
    pub is_active: bool,
    pub is_permanent: bool,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// All rule-family settings the workflow engine consults.
#[derive(Debug, Clone, Default)]
pub struct WorkflowSettings {
    pub high_score_bypass: Option<HighScoreBypassSetting>,
    pub medium_score_pass: Option<ExperimentSetting>,
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("setting parameters missing required field '{0}'")]
    MissingField(&'static str),
    #[error("pgood threshold {0} must be within [0, 1]")]
    ThresholdOutOfRange(f64),
    #[error(transparent)]
    Selector(#[from] SelectorParseError),
}
