//! Ingestion of asynchronous vendor call-result callbacks.
//!
//! Callbacks are delivered at least once and out of order, so everything
//! here is idempotent on the vendor call id and guarded by timestamp
//! freshness. One callback settles into a single atomic unit: the skiptrace
//! history row, an optional PTP, and the ineffective-number counter.

use super::domain::{CallResult, IneffectiveCounter, PromiseToPay, SkiptraceHistory};
use super::ineffective;
use super::repository::{CallResultUnit, DeferredActionQueue, DialerRepository, StoreError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Inbound callback as the vendor posts it.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackEnvelope {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub body: CallbackBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackBody {
    #[serde(rename = "phoneNumber")]
    pub phone_number: Option<String>,
    #[serde(rename = "callid")]
    pub call_id: Option<String>,
    #[serde(rename = "taskId")]
    pub task_id: Option<String>,
    #[serde(rename = "customerInfo")]
    pub customer_info: Option<CustomerInfo>,
    #[serde(rename = "customizeResults", default)]
    pub customize_results: BTreeMap<String, String>,
    #[serde(rename = "hangupReason")]
    pub hangup_reason: Option<u16>,
    #[serde(rename = "agentName")]
    pub agent_name: Option<String>,
    #[serde(rename = "starttime")]
    pub start_ts: Option<DateTime<Utc>>,
    #[serde(rename = "endtime")]
    pub end_ts: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CustomerInfo {
    pub account_id: Option<i64>,
    pub account_payment_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallbackKind {
    AgentStatus,
    ContactStatus,
    TaskStatus,
    Unknown,
}

impl CallbackKind {
    fn parse(raw: &str) -> Self {
        match raw.trim() {
            "AgentStatus" => Self::AgentStatus,
            "ContactStatus" => Self::ContactStatus,
            "TaskStatus" => Self::TaskStatus,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied,
    /// Acknowledged but not actionable (unknown type, no-op replay).
    Ignored,
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Malformed or unresolvable callback. Acknowledged to the vendor so it
    /// stops re-delivering, recorded for operator review.
    #[error("callback rejected: {0}")]
    Rejected(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct CallResultReconciler<R> {
    repository: Arc<R>,
    deferred: Arc<dyn DeferredActionQueue>,
    holidays: BTreeSet<NaiveDate>,
    ineffective_threshold_days: u32,
    ineffective_refresh_days: i64,
}

impl<R> CallResultReconciler<R>
where
    R: DialerRepository + 'static,
{
    pub fn new(
        repository: Arc<R>,
        deferred: Arc<dyn DeferredActionQueue>,
        holidays: BTreeSet<NaiveDate>,
        ineffective_threshold_days: u32,
        ineffective_refresh_days: i64,
    ) -> Self {
        Self {
            repository,
            deferred,
            holidays,
            ineffective_threshold_days,
            ineffective_refresh_days,
        }
    }

    pub fn apply(&self, callback: &CallbackEnvelope) -> Result<ReconcileOutcome, ReconcileError> {
        match CallbackKind::parse(&callback.kind) {
            CallbackKind::Unknown => {
                info!(kind = %callback.kind, "ignoring callback with unknown type");
                return Ok(ReconcileOutcome::Ignored);
            }
            CallbackKind::TaskStatus => {
                if let Some(task_id) = callback.body.task_id.as_deref() {
                    self.repository.mark_vendor_task_finished(task_id)?;
                }
                return Ok(ReconcileOutcome::Applied);
            }
            CallbackKind::AgentStatus | CallbackKind::ContactStatus => {}
        }

        let body = &callback.body;
        let phone_number = body
            .phone_number
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ReconcileError::Rejected("missing phoneNumber".to_string()))?;
        let call_id = body
            .call_id
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ReconcileError::Rejected("missing callid".to_string()))?;
        let info = body
            .customer_info
            .ok_or_else(|| ReconcileError::Rejected("missing customerInfo".to_string()))?;
        let (account_id, account_payment_id) = match (info.account_id, info.account_payment_id) {
            (Some(a), Some(p)) => (a, p),
            _ => {
                return Err(ReconcileError::Rejected(
                    "customerInfo missing account_id/account_payment_id".to_string(),
                ))
            }
        };
        if !self.repository.account_exists(account_id, account_payment_id)? {
            return Err(ReconcileError::Rejected(format!(
                "unresolvable account {account_id}/{account_payment_id}"
            )));
        }

        let result = classify(callback);
        let skiptrace = self
            .repository
            .find_or_create_skiptrace(account_id, phone_number)?;

        let incoming = SkiptraceHistory {
            call_id: call_id.to_string(),
            skiptrace_id: skiptrace.id,
            account_id,
            account_payment_id,
            result,
            agent: body.agent_name.clone(),
            notes: body.customize_results.get("nopaymentreason").cloned(),
            start_ts: body.start_ts,
            end_ts: body.end_ts,
        };

        let history = match self.repository.skiptrace_history(call_id)? {
            Some(existing) => match merge(&existing, incoming) {
                Some(merged) => merged,
                None => {
                    info!(call_id, "stale callback replay, nothing to update");
                    return Ok(ReconcileOutcome::Ignored);
                }
            },
            None => incoming,
        };

        let ptp = self.build_ptp(body, account_payment_id)?;

        let call_date = history
            .end_ts
            .or(history.start_ts)
            .map(|ts| ts.date_naive())
            .unwrap_or_else(|| Utc::now().date_naive());
        let mut counter = self
            .repository
            .counter(skiptrace.id)?
            .unwrap_or_else(|| IneffectiveCounter::new(skiptrace.id));
        // An expired flag must be cleared before the new result lands, or a
        // fresh streak can never re-flag the number.
        ineffective::maybe_refresh(&mut counter, call_date, self.ineffective_refresh_days);
        if !history.result.is_placeholder() {
            ineffective::record_result(
                &mut counter,
                history.result.connection(),
                call_date,
                &self.holidays,
                self.ineffective_threshold_days,
            );
        }

        self.repository.apply_call_result(CallResultUnit {
            history,
            ptp,
            counter,
        })?;

        // Outside the atomic unit, strictly best-effort.
        if let Err(err) = self.deferred.enqueue_recording_download(call_id) {
            warn!(call_id, error = %err, "recording download enqueue failed");
        }

        Ok(ReconcileOutcome::Applied)
    }

    /// Construct a PTP from the agent-entered amount and date, suppressing a
    /// duplicate of an identical (date, amount, agent, account-payment)
    /// promise.
    fn build_ptp(
        &self,
        body: &CallbackBody,
        account_payment_id: i64,
    ) -> Result<Option<PromiseToPay>, ReconcileError> {
        let amount = body
            .customize_results
            .get("PTP Amount")
            .and_then(|raw| raw.replace(['.', ','], "").parse::<i64>().ok())
            .filter(|amount| *amount > 0);
        let date = body
            .customize_results
            .get("PTP Date")
            .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok());

        let (Some(amount), Some(date)) = (amount, date) else {
            return Ok(None);
        };

        let ptp = PromiseToPay {
            account_payment_id,
            agent: body
                .agent_name
                .clone()
                .unwrap_or_else(|| "system".to_string()),
            date,
            amount,
        };

        if self.repository.ptp_exists(&ptp)? {
            return Ok(None);
        }
        Ok(Some(ptp))
    }
}

/// Classify a callback into a call result. The agent-entered outcome tag
/// wins over the automatic hangup classification when both are present.
fn classify(callback: &CallbackEnvelope) -> CallResult {
    let agent_tag = callback
        .body
        .customize_results
        .get("Spokewith")
        .and_then(|tag| classify_agent_tag(tag));

    if CallbackKind::parse(&callback.kind) == CallbackKind::AgentStatus {
        if let Some(result) = agent_tag {
            return result;
        }
    }

    agent_tag.unwrap_or_else(|| {
        callback
            .body
            .hangup_reason
            .map(classify_hangup_reason)
            .unwrap_or(CallResult::Pending)
    })
}

fn classify_agent_tag(tag: &str) -> Option<CallResult> {
    match tag.trim() {
        "RPC - Regular" => Some(CallResult::RpcRegular),
        "RPC - PTP" => Some(CallResult::RpcWithPtp),
        "WPC" => Some(CallResult::Wpc),
        "Short Call" => Some(CallResult::ShortCall),
        _ => None,
    }
}

/// Fixed mapping from vendor hangup-reason codes. Unknown codes carry no
/// information and classify as the placeholder.
fn classify_hangup_reason(code: u16) -> CallResult {
    match code {
        1 => CallResult::RpcRegular,
        10 => CallResult::NotActive,
        11 => CallResult::Busy,
        12 => CallResult::NoAnswer,
        13 => CallResult::PowerOff,
        14 => CallResult::AnsweringMachine,
        15 => CallResult::ShortCall,
        _ => CallResult::Pending,
    }
}

/// Freshness-guarded merge of a replayed/late callback into the existing
/// row. `None` means the incoming payload is not fresher and nothing should
/// change. A placeholder result never replaces a settled one.
fn merge(existing: &SkiptraceHistory, incoming: SkiptraceHistory) -> Option<SkiptraceHistory> {
    let fresher = match (incoming.end_ts, existing.end_ts) {
        (Some(new), Some(old)) => new > old,
        (Some(_), None) => true,
        (None, _) => false,
    };
    if !fresher {
        return None;
    }

    let mut merged = incoming;
    if merged.result.is_placeholder() && !existing.result.is_placeholder() {
        merged.result = existing.result;
    }
    if merged.agent.is_none() {
        merged.agent = existing.agent.clone();
    }
    if merged.notes.is_none() {
        merged.notes = existing.notes.clone();
    }
    if merged.start_ts.is_none() {
        merged.start_ts = existing.start_ts;
    }
    Some(merged)
}
