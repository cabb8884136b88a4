//! Per-status business-rule handlers.
//!
//! Each target status binds one handler. A handler runs its pre-checks in
//! declared order as a guarded decision list: the first definitive check
//! settles the outcome, the rest never run. Handlers are pure over the
//! context the engine assembles; side effects are returned as data and fired
//! by the engine after commit.

use super::domain::{Application, ApplicationStatus, RiskCheckResult, RiskDecision, ScoreSnapshot, WorkflowType};
use super::experiments::WorkflowSettings;
use super::rules;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

pub const REASON_HIGH_SCORE_PASS: &str = "Julo one pass high score";
pub const REASON_MEDIUM_SCORE_PASS: &str = "Julo one pass medium score";
pub const REASON_FRAUD_FLAG: &str = "Application flagged for fraud";
pub const REASON_BLOCKED_REFERRAL: &str = "Referral code blocked";

/// Everything a handler may inspect, assembled by the engine from the
/// repositories before the decision runs. Attribution and dates are explicit
/// parameters; handlers touch no global state.
#[derive(Debug)]
pub struct HandlerContext<'a> {
    pub application: &'a Application,
    pub score: Option<&'a ScoreSnapshot>,
    pub risk: Option<&'a RiskCheckResult>,
    pub settings: &'a WorkflowSettings,
    pub ever_flagged_for_fraud: bool,
    pub today: NaiveDate,
    pub requested_reason: &'a str,
}

/// Fire-and-forget actions a committed transition schedules. Dispatch
/// failures are logged, never surfaced as transition failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffect {
    NotifyCustomer { template: &'static str },
    RefreshCreditScore,
    AppendNote { note: String },
    EnqueueFraudReview,
}

impl SideEffect {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NotifyCustomer { .. } => "notify_customer",
            Self::RefreshCreditScore => "refresh_credit_score",
            Self::AppendNote { .. } => "append_note",
            Self::EnqueueFraudReview => "enqueue_fraud_review",
        }
    }
}

/// What a handler decided for the requested transition.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerDecision {
    /// Commit the requested status. `reason` overrides the caller's change
    /// reason when present.
    Advance {
        reason: Option<String>,
        actions: Vec<SideEffect>,
    },
    /// Commit a different status instead. Followed at most once; the target
    /// handler still runs.
    Redirect {
        to: ApplicationStatus,
        reason: String,
    },
    /// Leave the application where it is; nothing is committed.
    Stay { reason: String },
}

/// Closed set of handler bindings. One handler per target status, resolved
/// by exhaustive match so a missing binding cannot exist at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusHandler {
    FormPartial,
    PartialExpiry,
    FraudGate,
    CreditDecision,
    VerificationCalls,
    ApplicantCalls,
    FraudFlag,
    Denial,
    OfferAccepted,
    ActivationCall,
    Approval,
}

impl StatusHandler {
    pub fn for_status(_workflow: WorkflowType, to: ApplicationStatus) -> Self {
        match to {
            ApplicationStatus::FormCreated | ApplicationStatus::FormPartial => Self::FormPartial,
            ApplicationStatus::FormPartialExpired => Self::PartialExpiry,
            ApplicationStatus::DocumentsSubmitted => Self::FraudGate,
            ApplicationStatus::DocumentsVerified => Self::CreditDecision,
            ApplicationStatus::VerificationCallsOk => Self::VerificationCalls,
            ApplicationStatus::ApplicantCallsSuccessful => Self::ApplicantCalls,
            ApplicationStatus::FlaggedForFraud => Self::FraudFlag,
            ApplicationStatus::Denied => Self::Denial,
            ApplicationStatus::OfferAccepted => Self::OfferAccepted,
            ApplicationStatus::ActivationCallOk => Self::ActivationCall,
            ApplicationStatus::Approved => Self::Approval,
        }
    }

    pub fn decide(self, ctx: &HandlerContext<'_>) -> HandlerDecision {
        match self {
            Self::FormPartial | Self::PartialExpiry | Self::ApplicantCalls | Self::ActivationCall => {
                advance_with_caller_reason()
            }
            Self::FraudGate => decide_fraud_gate(ctx),
            Self::CreditDecision => decide_credit(ctx),
            Self::VerificationCalls => decide_verification_calls(ctx),
            Self::FraudFlag => HandlerDecision::Advance {
                reason: Some(REASON_FRAUD_FLAG.to_string()),
                actions: vec![SideEffect::EnqueueFraudReview],
            },
            Self::Denial => decide_denial(ctx),
            Self::OfferAccepted => HandlerDecision::Advance {
                reason: None,
                actions: vec![SideEffect::NotifyCustomer {
                    template: "offer_accepted",
                }],
            },
            Self::Approval => HandlerDecision::Advance {
                reason: None,
                actions: vec![
                    SideEffect::NotifyCustomer {
                        template: "loan_approved",
                    },
                    SideEffect::RefreshCreditScore,
                ],
            },
        }
    }
}

fn advance_with_caller_reason() -> HandlerDecision {
    HandlerDecision::Advance {
        reason: None,
        actions: Vec::new(),
    }
}

/// Document submission gate. Checks run in order: prior or current fraud
/// evidence redirects to 133, a blocked referral code redirects to denial,
/// otherwise the submission goes through.
fn decide_fraud_gate(ctx: &HandlerContext<'_>) -> HandlerDecision {
    let device_fraud = ctx.score.map(|s| s.fraud_device).unwrap_or(false);
    let risk_fraud = ctx
        .risk
        .map(|r| r.decision == RiskDecision::FraudSuspected)
        .unwrap_or(false);

    if device_fraud || risk_fraud || ctx.ever_flagged_for_fraud {
        return HandlerDecision::Redirect {
            to: ApplicationStatus::FlaggedForFraud,
            reason: REASON_FRAUD_FLAG.to_string(),
        };
    }

    if rules::is_blocked_referral(ctx.application.referral_code.as_deref()) {
        return HandlerDecision::Redirect {
            to: ApplicationStatus::Denied,
            reason: REASON_BLOCKED_REFERRAL.to_string(),
        };
    }

    advance_with_caller_reason()
}

/// Credit decision for document verification. Pre-check order is fixed:
/// high-score full bypass, then C-score hold, then the medium-score pass
/// experiment. First definitive check wins.
fn decide_credit(ctx: &HandlerContext<'_>) -> HandlerDecision {
    let Some(score) = ctx.score else {
        // Required input missing: fail closed, the application stays put.
        warn!(
            application_id = ctx.application.id,
            "credit decision requested before score snapshot exists"
        );
        return HandlerDecision::Stay {
            reason: "credit score not yet available".to_string(),
        };
    };

    if let Some(risk) = ctx.risk {
        if risk.decision == RiskDecision::FraudSuspected {
            return HandlerDecision::Redirect {
                to: ApplicationStatus::FlaggedForFraud,
                reason: REASON_FRAUD_FLAG.to_string(),
            };
        }
    }

    if let Some(setting) = &ctx.settings.high_score_bypass {
        if rules::is_high_score_full_bypass(score, setting, ctx.application.id) {
            return HandlerDecision::Advance {
                reason: Some(REASON_HIGH_SCORE_PASS.to_string()),
                actions: vec![SideEffect::RefreshCreditScore],
            };
        }
    }

    if rules::is_c_score(score) {
        return HandlerDecision::Stay {
            reason: "C score holds at current status".to_string(),
        };
    }

    let medium_active = ctx
        .settings
        .medium_score_pass
        .as_ref()
        .map(|setting| rules::still_in_experiment(setting, ctx.today))
        .unwrap_or(false);
    if medium_active {
        return HandlerDecision::Advance {
            reason: Some(REASON_MEDIUM_SCORE_PASS.to_string()),
            actions: Vec::new(),
        };
    }

    HandlerDecision::Stay {
        reason: "medium score pass not active".to_string(),
    }
}

fn decide_verification_calls(ctx: &HandlerContext<'_>) -> HandlerDecision {
    if ctx.score.is_none() {
        warn!(
            application_id = ctx.application.id,
            "verification calls requested before score snapshot exists"
        );
        return HandlerDecision::Stay {
            reason: "credit score not yet available".to_string(),
        };
    }
    advance_with_caller_reason()
}

fn decide_denial(ctx: &HandlerContext<'_>) -> HandlerDecision {
    let reason = if rules::is_blocked_referral(ctx.application.referral_code.as_deref()) {
        Some(REASON_BLOCKED_REFERRAL.to_string())
    } else {
        None
    };

    HandlerDecision::Advance {
        reason,
        actions: vec![SideEffect::NotifyCustomer {
            template: "application_denied",
        }],
    }
}
