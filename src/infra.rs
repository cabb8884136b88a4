//! In-memory adapters behind the repository and vendor traits, used by the
//! HTTP service wiring and the integration tests.

use crate::dialer::repository::CallResultUnit;
use crate::dialer::{
    BucketConfig, CollectionAccount, ContactPayload, CreateTaskRequest, DeferredActionQueue,
    DeferredError, DialerRepository, DialerTask, DialerTaskEvent, DialerTaskStatus,
    DialerVendorClient, IneffectiveCounter, PromiseToPay, Skiptrace, SkiptraceHistory, StoreError,
    VendorError, VendorTaskHandle,
};
use crate::workflows::status::{
    ActionDispatcher, Application, ApplicationHistoryEntry, ApplicationRepository,
    ApplicationStatus, DispatchError, RepositoryError, RiskCheckResult, ScoreSnapshot, SideEffect,
};
use chrono::{NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct AppState {
    pub readiness: Arc<AtomicBool>,
    pub metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub struct InMemoryApplicationRepository {
    applications: Arc<Mutex<HashMap<i64, Application>>>,
    scores: Arc<Mutex<HashMap<i64, ScoreSnapshot>>>,
    risks: Arc<Mutex<HashMap<i64, RiskCheckResult>>>,
    history: Arc<Mutex<HashMap<i64, Vec<ApplicationHistoryEntry>>>>,
}

impl InMemoryApplicationRepository {
    pub fn set_score_snapshot(&self, application_id: i64, snapshot: ScoreSnapshot) {
        let mut guard = self.scores.lock().expect("score mutex poisoned");
        guard.insert(application_id, snapshot);
    }
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut guard = self.applications.lock().expect("application mutex poisoned");
        if guard.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(application.id, application.clone());
        Ok(application)
    }

    fn fetch(&self, application_id: i64) -> Result<Option<Application>, RepositoryError> {
        let guard = self.applications.lock().expect("application mutex poisoned");
        Ok(guard.get(&application_id).cloned())
    }

    fn score_snapshot(
        &self,
        application_id: i64,
    ) -> Result<Option<ScoreSnapshot>, RepositoryError> {
        let guard = self.scores.lock().expect("score mutex poisoned");
        Ok(guard.get(&application_id).cloned())
    }

    fn risk_decision(
        &self,
        application_id: i64,
    ) -> Result<Option<RiskCheckResult>, RepositoryError> {
        let guard = self.risks.lock().expect("risk mutex poisoned");
        Ok(guard.get(&application_id).cloned())
    }

    fn upsert_risk_decision(&self, result: RiskCheckResult) -> Result<(), RepositoryError> {
        let mut guard = self.risks.lock().expect("risk mutex poisoned");
        guard.insert(result.application_id, result);
        Ok(())
    }

    fn commit_transition(
        &self,
        application_id: i64,
        expected_from: ApplicationStatus,
        new_status: ApplicationStatus,
        entry: ApplicationHistoryEntry,
    ) -> Result<(), RepositoryError> {
        let mut applications = self.applications.lock().expect("application mutex poisoned");
        let application = applications
            .get_mut(&application_id)
            .ok_or(RepositoryError::NotFound)?;
        if application.status != expected_from {
            return Err(RepositoryError::Conflict);
        }
        application.status = new_status;

        let mut history = self.history.lock().expect("history mutex poisoned");
        history.entry(application_id).or_default().push(entry);
        Ok(())
    }

    fn history(
        &self,
        application_id: i64,
    ) -> Result<Vec<ApplicationHistoryEntry>, RepositoryError> {
        let guard = self.history.lock().expect("history mutex poisoned");
        Ok(guard.get(&application_id).cloned().unwrap_or_default())
    }
}

/// Dispatcher that records fired side effects instead of delivering them.
#[derive(Default, Clone)]
pub struct RecordingActionDispatcher {
    dispatched: Arc<Mutex<Vec<(i64, String)>>>,
}

impl RecordingActionDispatcher {
    pub fn dispatched(&self) -> Vec<(i64, String)> {
        self.dispatched.lock().expect("dispatch mutex poisoned").clone()
    }
}

impl ActionDispatcher for RecordingActionDispatcher {
    fn dispatch(&self, application_id: i64, effect: &SideEffect) -> Result<(), DispatchError> {
        let mut guard = self.dispatched.lock().expect("dispatch mutex poisoned");
        guard.push((application_id, effect.name().to_string()));
        Ok(())
    }
}

#[derive(Default)]
struct DialerState {
    accounts: HashMap<String, Vec<CollectionAccount>>,
    blacklisted_accounts: HashSet<i64>,
    blacklisted_numbers: HashSet<String>,
    active_ptps: HashSet<i64>,
    known_accounts: HashSet<(i64, i64)>,
    counters: HashMap<i64, IneffectiveCounter>,
    tasks: HashMap<i64, DialerTask>,
    events: HashMap<i64, Vec<DialerTaskEvent>>,
    open_vendor_tasks: HashSet<String>,
    skiptraces: HashMap<(i64, String), Skiptrace>,
    histories: HashMap<String, SkiptraceHistory>,
    ptps: Vec<PromiseToPay>,
    next_task_id: i64,
    next_skiptrace_id: i64,
}

#[derive(Default, Clone)]
pub struct InMemoryDialerRepository {
    state: Arc<Mutex<DialerState>>,
}

impl InMemoryDialerRepository {
    pub fn seed_account(&self, bucket: &str, account: CollectionAccount) {
        let mut state = self.state.lock().expect("dialer mutex poisoned");
        state
            .known_accounts
            .insert((account.account_id, account.account_payment_id));
        for skiptrace in account.phones.values() {
            state
                .skiptraces
                .insert((account.account_id, skiptrace.phone_number.clone()), skiptrace.clone());
        }
        state.accounts.entry(bucket.to_string()).or_default().push(account);
    }

    pub fn blacklist_account(&self, account_id: i64) {
        let mut state = self.state.lock().expect("dialer mutex poisoned");
        state.blacklisted_accounts.insert(account_id);
    }

    pub fn blacklist_number(&self, phone_number: &str) {
        let mut state = self.state.lock().expect("dialer mutex poisoned");
        state.blacklisted_numbers.insert(phone_number.to_string());
    }

    pub fn set_active_ptp(&self, account_payment_id: i64) {
        let mut state = self.state.lock().expect("dialer mutex poisoned");
        state.active_ptps.insert(account_payment_id);
    }

    pub fn set_counter(&self, counter: IneffectiveCounter) {
        let mut state = self.state.lock().expect("dialer mutex poisoned");
        state.counters.insert(counter.skiptrace_id, counter);
    }

    pub fn task(&self, task_id: i64) -> Option<DialerTask> {
        let state = self.state.lock().expect("dialer mutex poisoned");
        state.tasks.get(&task_id).cloned()
    }

    pub fn promises(&self) -> Vec<PromiseToPay> {
        let state = self.state.lock().expect("dialer mutex poisoned");
        state.ptps.clone()
    }

    pub fn histories(&self) -> Vec<SkiptraceHistory> {
        let state = self.state.lock().expect("dialer mutex poisoned");
        state.histories.values().cloned().collect()
    }
}

impl DialerRepository for InMemoryDialerRepository {
    fn accounts_for_bucket(&self, bucket: &str) -> Result<Vec<CollectionAccount>, StoreError> {
        let state = self.state.lock().expect("dialer mutex poisoned");
        Ok(state.accounts.get(bucket).cloned().unwrap_or_default())
    }

    fn is_account_blacklisted(&self, account_id: i64) -> Result<bool, StoreError> {
        let state = self.state.lock().expect("dialer mutex poisoned");
        Ok(state.blacklisted_accounts.contains(&account_id))
    }

    fn is_number_blacklisted(&self, phone_number: &str) -> Result<bool, StoreError> {
        let state = self.state.lock().expect("dialer mutex poisoned");
        Ok(state.blacklisted_numbers.contains(phone_number))
    }

    fn has_active_ptp(
        &self,
        account_payment_id: i64,
        _as_of: NaiveDate,
    ) -> Result<bool, StoreError> {
        let state = self.state.lock().expect("dialer mutex poisoned");
        Ok(state.active_ptps.contains(&account_payment_id))
    }

    fn counter(&self, skiptrace_id: i64) -> Result<Option<IneffectiveCounter>, StoreError> {
        let state = self.state.lock().expect("dialer mutex poisoned");
        Ok(state.counters.get(&skiptrace_id).cloned())
    }

    fn insert_task(&self, bucket: &str) -> Result<i64, StoreError> {
        let mut state = self.state.lock().expect("dialer mutex poisoned");
        state.next_task_id += 1;
        let id = state.next_task_id;
        state.tasks.insert(
            id,
            DialerTask {
                id,
                bucket: bucket.to_string(),
                vendor_task_id: None,
                status: DialerTaskStatus::Pending,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    fn record_event(&self, task_id: i64, event: DialerTaskEvent) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("dialer mutex poisoned");
        if !state.tasks.contains_key(&task_id) {
            return Err(StoreError::NotFound);
        }
        state.events.entry(task_id).or_default().push(event);
        Ok(())
    }

    fn events(&self, task_id: i64) -> Result<Vec<DialerTaskEvent>, StoreError> {
        let state = self.state.lock().expect("dialer mutex poisoned");
        Ok(state.events.get(&task_id).cloned().unwrap_or_default())
    }

    fn set_task_uploaded(
        &self,
        task_id: i64,
        vendor_task_id: &str,
        _contacts: &[ContactPayload],
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("dialer mutex poisoned");
        state.open_vendor_tasks.insert(vendor_task_id.to_string());
        let task = state.tasks.get_mut(&task_id).ok_or(StoreError::NotFound)?;
        task.status = DialerTaskStatus::Uploaded;
        task.vendor_task_id = Some(vendor_task_id.to_string());
        Ok(())
    }

    fn set_task_failed(&self, task_id: i64, _error: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("dialer mutex poisoned");
        let task = state.tasks.get_mut(&task_id).ok_or(StoreError::NotFound)?;
        task.status = DialerTaskStatus::Failed;
        Ok(())
    }

    fn open_vendor_task_ids(&self, _as_of: NaiveDate) -> Result<Vec<String>, StoreError> {
        let state = self.state.lock().expect("dialer mutex poisoned");
        let mut ids: Vec<String> = state.open_vendor_tasks.iter().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    fn mark_vendor_task_finished(&self, vendor_task_id: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("dialer mutex poisoned");
        state.open_vendor_tasks.remove(vendor_task_id);
        Ok(())
    }

    fn account_exists(
        &self,
        account_id: i64,
        account_payment_id: i64,
    ) -> Result<bool, StoreError> {
        let state = self.state.lock().expect("dialer mutex poisoned");
        Ok(state.known_accounts.contains(&(account_id, account_payment_id)))
    }

    fn find_or_create_skiptrace(
        &self,
        account_id: i64,
        phone_number: &str,
    ) -> Result<Skiptrace, StoreError> {
        let mut state = self.state.lock().expect("dialer mutex poisoned");
        let key = (account_id, phone_number.to_string());
        if let Some(existing) = state.skiptraces.get(&key) {
            return Ok(existing.clone());
        }
        state.next_skiptrace_id += 1;
        let skiptrace = Skiptrace {
            id: 1_000_000 + state.next_skiptrace_id,
            customer_id: account_id,
            phone_number: phone_number.to_string(),
        };
        state.skiptraces.insert(key, skiptrace.clone());
        Ok(skiptrace)
    }

    fn skiptrace_history(&self, call_id: &str) -> Result<Option<SkiptraceHistory>, StoreError> {
        let state = self.state.lock().expect("dialer mutex poisoned");
        Ok(state.histories.get(call_id).cloned())
    }

    fn ptp_exists(&self, ptp: &PromiseToPay) -> Result<bool, StoreError> {
        let state = self.state.lock().expect("dialer mutex poisoned");
        Ok(state.ptps.iter().any(|existing| existing == ptp))
    }

    fn apply_call_result(&self, unit: CallResultUnit) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("dialer mutex poisoned");
        state
            .histories
            .insert(unit.history.call_id.clone(), unit.history);
        if let Some(ptp) = unit.ptp {
            state.ptps.push(ptp);
        }
        state.counters.insert(unit.counter.skiptrace_id, unit.counter);
        Ok(())
    }
}

/// Queue fake that records enqueued work.
#[derive(Default, Clone)]
pub struct InMemoryDeferredQueue {
    report_logs: Arc<Mutex<Vec<(i64, String)>>>,
    recordings: Arc<Mutex<Vec<String>>>,
}

impl InMemoryDeferredQueue {
    pub fn report_logs(&self) -> Vec<(i64, String)> {
        self.report_logs.lock().expect("queue mutex poisoned").clone()
    }

    pub fn recordings(&self) -> Vec<String> {
        self.recordings.lock().expect("queue mutex poisoned").clone()
    }
}

impl DeferredActionQueue for InMemoryDeferredQueue {
    fn enqueue_report_log(&self, task_id: i64, bucket: &str) -> Result<(), DeferredError> {
        let mut guard = self.report_logs.lock().expect("queue mutex poisoned");
        guard.push((task_id, bucket.to_string()));
        Ok(())
    }

    fn enqueue_recording_download(&self, call_id: &str) -> Result<(), DeferredError> {
        let mut guard = self.recordings.lock().expect("queue mutex poisoned");
        guard.push(call_id.to_string());
        Ok(())
    }
}

/// Vendor stub that accepts every upload and remembers the requests it saw.
#[derive(Default, Clone)]
pub struct StubVendorClient {
    requests: Arc<Mutex<Vec<CreateTaskRequest>>>,
    cancellations: Arc<Mutex<Vec<(String, String)>>>,
}

impl StubVendorClient {
    pub fn requests(&self) -> Vec<CreateTaskRequest> {
        self.requests.lock().expect("vendor mutex poisoned").clone()
    }

    pub fn cancellations(&self) -> Vec<(String, String)> {
        self.cancellations.lock().expect("vendor mutex poisoned").clone()
    }
}

impl DialerVendorClient for StubVendorClient {
    fn create_task(&self, request: &CreateTaskRequest) -> Result<VendorTaskHandle, VendorError> {
        let mut guard = self.requests.lock().expect("vendor mutex poisoned");
        guard.push(request.clone());
        Ok(VendorTaskHandle {
            task_id: format!("vendor-{}", guard.len()),
        })
    }

    fn cancel_phone_call(&self, task_id: &str, phone_number: &str) -> Result<(), VendorError> {
        let mut guard = self.cancellations.lock().expect("vendor mutex poisoned");
        guard.push((task_id.to_string(), phone_number.to_string()));
        Ok(())
    }
}

/// Standard collections buckets, ascending delinquency.
pub fn default_buckets() -> Vec<BucketConfig> {
    vec![
        BucketConfig {
            name: "B1".to_string(),
            dpd_min: 1,
            dpd_max: 11,
            min_outstanding: 0,
            risk_range: None,
            ineffective_threshold_days: 3,
            ineffective_refresh_days: 30,
            batch_size: 500,
        },
        BucketConfig {
            name: "B2".to_string(),
            dpd_min: 11,
            dpd_max: 41,
            min_outstanding: 100_000,
            risk_range: None,
            ineffective_threshold_days: 3,
            ineffective_refresh_days: 30,
            batch_size: 500,
        },
        BucketConfig {
            name: "B3".to_string(),
            dpd_min: 41,
            dpd_max: 71,
            min_outstanding: 100_000,
            risk_range: None,
            ineffective_threshold_days: 5,
            ineffective_refresh_days: 30,
            batch_size: 500,
        },
    ]
}
