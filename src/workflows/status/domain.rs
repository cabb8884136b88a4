use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which transition graph applies to an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowType {
    JuloOne,
    JuloStarter,
}

impl WorkflowType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::JuloOne => "JULO One",
            Self::JuloStarter => "JULO Starter",
        }
    }
}

impl fmt::Display for WorkflowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Numbered application stages. The numeric codes are the durable external
/// identifiers; the enum keeps dispatch closed and exhaustively matchable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    FormCreated,
    FormPartial,
    FormPartialExpired,
    DocumentsSubmitted,
    DocumentsVerified,
    VerificationCallsOk,
    ApplicantCallsSuccessful,
    FlaggedForFraud,
    Denied,
    OfferAccepted,
    ActivationCallOk,
    Approved,
}

impl ApplicationStatus {
    pub const fn code(self) -> u16 {
        match self {
            Self::FormCreated => 100,
            Self::FormPartial => 105,
            Self::FormPartialExpired => 106,
            Self::DocumentsSubmitted => 115,
            Self::DocumentsVerified => 120,
            Self::VerificationCallsOk => 124,
            Self::ApplicantCallsSuccessful => 130,
            Self::FlaggedForFraud => 133,
            Self::Denied => 135,
            Self::OfferAccepted => 141,
            Self::ActivationCallOk => 150,
            Self::Approved => 190,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            100 => Some(Self::FormCreated),
            105 => Some(Self::FormPartial),
            106 => Some(Self::FormPartialExpired),
            115 => Some(Self::DocumentsSubmitted),
            120 => Some(Self::DocumentsVerified),
            124 => Some(Self::VerificationCallsOk),
            130 => Some(Self::ApplicantCallsSuccessful),
            133 => Some(Self::FlaggedForFraud),
            135 => Some(Self::Denied),
            141 => Some(Self::OfferAccepted),
            150 => Some(Self::ActivationCallOk),
            190 => Some(Self::Approved),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::FormCreated => "Form Created",
            Self::FormPartial => "Form Partial",
            Self::FormPartialExpired => "Form Partial Expired",
            Self::DocumentsSubmitted => "Documents Submitted",
            Self::DocumentsVerified => "Documents Verified",
            Self::VerificationCallsOk => "Verification Calls Successful",
            Self::ApplicantCallsSuccessful => "Applicant Calls Successful",
            Self::FlaggedForFraud => "Application Flagged for Fraud",
            Self::Denied => "Application Denied",
            Self::OfferAccepted => "Offer Accepted",
            Self::ActivationCallOk => "Activation Call Successful",
            Self::Approved => "Approved",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Letter grade produced by the credit scoring service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CreditScoreClass {
    A,
    BPlus,
    B,
    BMinus,
    C,
}

impl CreditScoreClass {
    pub const fn label(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::BPlus => "B+",
            Self::B => "B",
            Self::BMinus => "B-",
            Self::C => "C",
        }
    }
}

/// Scoring and fraud attributes read by handler pre-checks. Absence of the
/// whole snapshot fails checks closed; the application simply does not
/// advance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    pub score_class: CreditScoreClass,
    /// Model-estimated probability of good repayment behavior.
    pub pgood: f64,
    pub fraud_device: bool,
    pub bank_name_mismatch: bool,
}

/// Outcome classification of the fraud/device/bank checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskDecision {
    NoDvBypassAndNoPveBypass,
    DvBypass,
    PveBypass,
    DvAndPveBypass,
    FraudSuspected,
}

/// One-per-application record of risk-check outcomes; upserted as new
/// evidence arrives and read by handlers to gate bypasses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskCheckResult {
    pub application_id: i64,
    pub decision: RiskDecision,
    pub device_flagged: bool,
    pub bank_check_failed: bool,
    pub updated_at: DateTime<Utc>,
}

/// A credit application. `status` mutates only through the workflow engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: i64,
    pub workflow: WorkflowType,
    pub status: ApplicationStatus,
    pub customer_id: i64,
    pub account_id: Option<i64>,
    pub referral_code: Option<String>,
    pub submitted_on: NaiveDate,
}

/// Who is committing a transition. Threaded explicitly through every commit
/// path instead of a process-global "current user".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    pub name: String,
}

impl Actor {
    pub fn system() -> Self {
        Self {
            id: 0,
            name: "system".to_string(),
        }
    }

    pub fn agent(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Immutable audit record, appended exactly once per committed transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationHistoryEntry {
    pub application_id: i64,
    pub old_status: ApplicationStatus,
    pub new_status: ApplicationStatus,
    pub change_reason: String,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}
