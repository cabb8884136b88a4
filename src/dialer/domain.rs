use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named collections cohort. The dpd range is inclusive on the lower
/// bound, exclusive on the upper.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketConfig {
    pub name: String,
    pub dpd_min: i64,
    pub dpd_max: i64,
    pub min_outstanding: i64,
    /// Optional risk-score band, `min <= score < max` when present.
    pub risk_range: Option<(f64, f64)>,
    /// Consecutive unreachable calling days before a number is flagged.
    pub ineffective_threshold_days: u32,
    /// Days after flagging before the counter resets and the number is
    /// dialable again.
    pub ineffective_refresh_days: i64,
    pub batch_size: usize,
}

impl BucketConfig {
    pub fn dpd_in_range(&self, dpd: i64) -> bool {
        self.dpd_min <= dpd && dpd < self.dpd_max
    }
}

/// Phone slots in fixed fallback priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhoneSlot {
    Mobile1,
    Mobile2,
    Spouse,
    Kin,
    Company,
}

impl PhoneSlot {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Mobile1,
            Self::Mobile2,
            Self::Spouse,
            Self::Kin,
            Self::Company,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Mobile1 => "mobile_phone_1",
            Self::Mobile2 => "mobile_phone_2",
            Self::Spouse => "spouse",
            Self::Kin => "kin",
            Self::Company => "company",
        }
    }
}

/// Durable phone-number identity used for call history and
/// ineffective-number tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skiptrace {
    pub id: i64,
    pub customer_id: i64,
    pub phone_number: String,
}

/// Delinquent account snapshot the selector and payload constructor read.
/// Money fields are nullable upstream and treated as zero in sums.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionAccount {
    pub account_id: i64,
    pub account_payment_id: i64,
    pub customer_id: i64,
    pub dpd: i64,
    pub outstanding_amount: Option<i64>,
    pub due_amount: Option<i64>,
    pub risk_score: Option<f64>,
    pub autodebet_active: bool,
    pub phones: BTreeMap<PhoneSlot, Skiptrace>,
}

impl CollectionAccount {
    pub fn outstanding(&self) -> i64 {
        self.outstanding_amount.unwrap_or(0)
    }

    pub fn due(&self) -> i64 {
        self.due_amount.unwrap_or(0)
    }
}

/// Why an account (or one of its numbers) was left out of a batch. The first
/// matching stage wins and is what reporting shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    Blacklisted,
    ActivePtp,
    Autodebet,
    IneffectivePhoneNumber,
    OutsideDpdRange,
    BelowOutstandingFloor,
    OutsideRiskRange,
}

impl ExclusionReason {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Blacklisted => "BLACKLISTED",
            Self::ActivePtp => "ACTIVE_PTP",
            Self::Autodebet => "AUTODEBET",
            Self::IneffectivePhoneNumber => "INEFFECTIVE_PHONE_NUMBER",
            Self::OutsideDpdRange => "OUTSIDE_DPD_RANGE",
            Self::BelowOutstandingFloor => "BELOW_OUTSTANDING_FLOOR",
            Self::OutsideRiskRange => "OUTSIDE_RISK_RANGE",
        }
    }
}

/// An account that survived the exclusion pipeline, with only its dialable
/// numbers left attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactCandidate {
    pub account: CollectionAccount,
    pub bucket: String,
}

/// Denormalized per-contact row uploaded to the vendor and kept for the
/// reconciliation join. A cache, not a source of truth; superseded each run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactPayload {
    pub account_id: i64,
    pub account_payment_id: i64,
    pub customer_id: i64,
    pub bucket: String,
    pub phone_number: String,
    pub skiptrace_id: i64,
    /// Remaining numbers in fallback priority order.
    pub alternate_numbers: Vec<String>,
    pub dpd: i64,
    pub outstanding_amount: i64,
    pub due_amount: i64,
    pub sort_rank: u32,
}

/// One outbound batch submission to the vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialerTask {
    pub id: i64,
    pub bucket: String,
    pub vendor_task_id: Option<String>,
    pub status: DialerTaskStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialerTaskStatus {
    Pending,
    Uploading,
    Uploaded,
    Failed,
}

/// Append-only lifecycle events for a dialer task; together they form the
/// replayable audit trail of a run, including every retry attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DialerTaskEvent {
    Querying,
    Queried { candidates: usize },
    Constructing,
    Constructed { contacts: usize },
    Uploading,
    UploadingPerBatch { batch: usize, attempt: u32 },
    Uploaded { vendor_task_id: String },
    Failure { error: String },
}

/// How a call ended, classified from the vendor hangup reason or the
/// agent-entered outcome tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallResult {
    /// Vendor reported the call as still in flight; carries no information
    /// and must never overwrite a settled result.
    Pending,
    RpcRegular,
    RpcWithPtp,
    Wpc,
    AnsweringMachine,
    ShortCall,
    NoAnswer,
    Busy,
    PowerOff,
    NotActive,
}

impl CallResult {
    pub const fn connection(self) -> ConnectionKind {
        match self {
            Self::RpcRegular | Self::RpcWithPtp | Self::Wpc | Self::ShortCall => {
                ConnectionKind::Reachable
            }
            Self::Pending
            | Self::AnsweringMachine
            | Self::NoAnswer
            | Self::Busy
            | Self::PowerOff
            | Self::NotActive => ConnectionKind::Unreachable,
        }
    }

    pub const fn is_placeholder(self) -> bool {
        matches!(self, Self::Pending)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::RpcRegular => "RPC - Regular",
            Self::RpcWithPtp => "RPC - PTP",
            Self::Wpc => "WPC",
            Self::AnsweringMachine => "Answering Machine",
            Self::ShortCall => "Short Call",
            Self::NoAnswer => "No Answer",
            Self::Busy => "Busy",
            Self::PowerOff => "Power Off",
            Self::NotActive => "Not Active",
        }
    }
}

/// Whether the far end was actually contacted; drives the
/// ineffective-number counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    Reachable,
    Unreachable,
}

/// One row per call attempt, keyed by the vendor call id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkiptraceHistory {
    pub call_id: String,
    pub skiptrace_id: i64,
    pub account_id: i64,
    pub account_payment_id: i64,
    pub result: CallResult,
    pub agent: Option<String>,
    pub notes: Option<String>,
    pub start_ts: Option<DateTime<Utc>>,
    pub end_ts: Option<DateTime<Utc>>,
}

/// Per-skiptrace consecutive-unreachable-day counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IneffectiveCounter {
    pub skiptrace_id: i64,
    pub consecutive_days: u32,
    pub last_unreachable: Option<NaiveDate>,
    pub flag_as_unreachable_date: Option<NaiveDate>,
}

impl IneffectiveCounter {
    pub fn new(skiptrace_id: i64) -> Self {
        Self {
            skiptrace_id,
            consecutive_days: 0,
            last_unreachable: None,
            flag_as_unreachable_date: None,
        }
    }
}

/// A customer commitment to pay a specific amount by a specific date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromiseToPay {
    pub account_payment_id: i64,
    pub agent: String,
    pub date: NaiveDate,
    pub amount: i64,
}
