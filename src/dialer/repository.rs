use super::domain::{
    CollectionAccount, ContactPayload, DialerTaskEvent, IneffectiveCounter, PromiseToPay,
    Skiptrace, SkiptraceHistory,
};
use chrono::NaiveDate;

/// Everything one call result changes, applied as a single atomic unit: the
/// history row (insert or freshness-guarded update), an optional new PTP,
/// and the updated ineffective counter. If any part fails, none commit.
#[derive(Debug, Clone, PartialEq)]
pub struct CallResultUnit {
    pub history: SkiptraceHistory,
    pub ptp: Option<PromiseToPay>,
    pub counter: IneffectiveCounter,
}

/// Storage abstraction for the dialer pipeline and reconciler.
pub trait DialerRepository: Send + Sync {
    // Selection inputs.
    fn accounts_for_bucket(&self, bucket: &str) -> Result<Vec<CollectionAccount>, StoreError>;
    fn is_account_blacklisted(&self, account_id: i64) -> Result<bool, StoreError>;
    fn is_number_blacklisted(&self, phone_number: &str) -> Result<bool, StoreError>;
    fn has_active_ptp(&self, account_payment_id: i64, as_of: NaiveDate)
        -> Result<bool, StoreError>;
    fn counter(&self, skiptrace_id: i64) -> Result<Option<IneffectiveCounter>, StoreError>;

    // Task lifecycle.
    fn insert_task(&self, bucket: &str) -> Result<i64, StoreError>;
    fn record_event(&self, task_id: i64, event: DialerTaskEvent) -> Result<(), StoreError>;
    fn events(&self, task_id: i64) -> Result<Vec<DialerTaskEvent>, StoreError>;
    fn set_task_uploaded(
        &self,
        task_id: i64,
        vendor_task_id: &str,
        contacts: &[ContactPayload],
    ) -> Result<(), StoreError>;
    fn set_task_failed(&self, task_id: i64, error: &str) -> Result<(), StoreError>;
    /// Vendor task ids still open for the given day, used for
    /// cancel-by-phone-number.
    fn open_vendor_task_ids(&self, as_of: NaiveDate) -> Result<Vec<String>, StoreError>;
    fn mark_vendor_task_finished(&self, vendor_task_id: &str) -> Result<(), StoreError>;

    // Reconciliation.
    fn account_exists(&self, account_id: i64, account_payment_id: i64)
        -> Result<bool, StoreError>;
    /// Resolve the skiptrace for the account's customer and phone number,
    /// creating one for numbers first seen in a callback.
    fn find_or_create_skiptrace(
        &self,
        account_id: i64,
        phone_number: &str,
    ) -> Result<Skiptrace, StoreError>;
    fn skiptrace_history(&self, call_id: &str) -> Result<Option<SkiptraceHistory>, StoreError>;
    fn ptp_exists(&self, ptp: &PromiseToPay) -> Result<bool, StoreError>;
    /// Apply history + PTP + counter changes atomically.
    fn apply_call_result(&self, unit: CallResultUnit) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists or was modified concurrently")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Deferred, best-effort work queued outside the transactional boundaries:
/// report logs after an upload, recording downloads after a call result.
pub trait DeferredActionQueue: Send + Sync {
    fn enqueue_report_log(&self, task_id: i64, bucket: &str) -> Result<(), DeferredError>;
    fn enqueue_recording_download(&self, call_id: &str) -> Result<(), DeferredError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DeferredError {
    #[error("deferred queue unavailable: {0}")]
    Unavailable(String),
}
