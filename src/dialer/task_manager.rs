//! Batch upload driver with bounded retry and a replayable event trail.

use super::domain::{BucketConfig, ContactPayload, DialerTaskEvent, ExclusionReason};
use super::payload::{self, AllNumbersIneffective};
use super::repository::{DeferredActionQueue, DialerRepository, StoreError};
use super::selector::EligibilitySelector;
use super::vendor::{CreateTaskRequest, DialerVendorClient, VendorError};
use crate::config::DialerConfig;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum DialerError {
    #[error("batch {batch} for bucket {bucket} failed after {attempts} attempt(s): {last_error}")]
    BatchFailed {
        bucket: String,
        batch: usize,
        attempts: u32,
        #[source]
        last_error: VendorError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What one bucket run produced, for the task runner and reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketRunSummary {
    pub task_id: i64,
    pub bucket: String,
    pub candidates: usize,
    pub uploaded_contacts: usize,
    pub batches: usize,
    pub exclusions: Vec<(i64, ExclusionReason)>,
}

/// Outcome of a best-effort cancel-by-phone-number sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelSummary {
    pub attempted: usize,
    pub failed: Vec<(String, String)>,
}

/// Orchestrates one bucket's select → construct → upload run and per-batch
/// retries. Independent buckets run as independent tasks; within a batch the
/// retry loop is sequential to respect vendor rate limits.
pub struct DialerTaskManager<R, V> {
    repository: Arc<R>,
    vendor: Arc<V>,
    deferred: Arc<dyn DeferredActionQueue>,
    config: DialerConfig,
}

impl<R, V> DialerTaskManager<R, V>
where
    R: DialerRepository + 'static,
    V: DialerVendorClient + 'static,
{
    pub fn new(
        repository: Arc<R>,
        vendor: Arc<V>,
        deferred: Arc<dyn DeferredActionQueue>,
        config: DialerConfig,
    ) -> Self {
        Self {
            repository,
            vendor,
            deferred,
            config,
        }
    }

    pub fn run_bucket(
        &self,
        bucket: &BucketConfig,
        as_of: NaiveDate,
    ) -> Result<BucketRunSummary, DialerError> {
        let task_id = self.repository.insert_task(&bucket.name)?;
        self.repository
            .record_event(task_id, DialerTaskEvent::Querying)?;

        let selector = EligibilitySelector::new(self.repository.clone());
        let selection = selector.select(bucket, as_of)?;
        self.repository.record_event(
            task_id,
            DialerTaskEvent::Queried {
                candidates: selection.candidates.len(),
            },
        )?;

        self.repository
            .record_event(task_id, DialerTaskEvent::Constructing)?;
        let mut exclusions = selection.exclusions;
        let mut payloads = Vec::with_capacity(selection.candidates.len());
        for candidate in &selection.candidates {
            match payload::construct(candidate) {
                Ok(contact) => payloads.push(contact),
                Err(AllNumbersIneffective { account_id }) => {
                    exclusions.push((account_id, ExclusionReason::IneffectivePhoneNumber));
                }
            }
        }
        payload::rank(&mut payloads);
        self.repository.record_event(
            task_id,
            DialerTaskEvent::Constructed {
                contacts: payloads.len(),
            },
        )?;

        let candidates = payloads.len();
        let chunks = payload::batches(payloads, bucket.batch_size);
        let batches = chunks.len();
        self.repository
            .record_event(task_id, DialerTaskEvent::Uploading)?;

        let mut uploaded_contacts = 0usize;
        for (index, chunk) in chunks.iter().enumerate() {
            self.upload_batch(task_id, bucket, index + 1, chunk, as_of)?;
            uploaded_contacts += chunk.len();
        }

        // The run is complete; reporting happens off the critical path.
        if let Err(err) = self.deferred.enqueue_report_log(task_id, &bucket.name) {
            warn!(task_id, bucket = %bucket.name, error = %err, "report log enqueue failed");
        }

        info!(
            task_id,
            bucket = %bucket.name,
            candidates,
            uploaded_contacts,
            batches,
            excluded = exclusions.len(),
            "bucket run uploaded"
        );

        Ok(BucketRunSummary {
            task_id,
            bucket: bucket.name.clone(),
            candidates,
            uploaded_contacts,
            batches,
            exclusions,
        })
    }

    /// Upload one chunk, retrying only transient vendor errors, at most
    /// `max_upload_attempts` total attempts. Every attempt is its own task
    /// event so the backoff sequence is auditable afterwards.
    fn upload_batch(
        &self,
        task_id: i64,
        bucket: &BucketConfig,
        batch: usize,
        chunk: &[ContactPayload],
        as_of: NaiveDate,
    ) -> Result<(), DialerError> {
        let request = CreateTaskRequest::new(
            format!("{}-{}-{batch}", bucket.name, as_of.format("%Y%m%d")),
            self.config.call_start_time.clone(),
            self.config.call_end_time.clone(),
            self.config.rest_windows.clone(),
            chunk,
            &self.config.callback_url,
        );

        let mut last_error = None;
        for attempt in 1..=self.config.max_upload_attempts {
            self.repository
                .record_event(task_id, DialerTaskEvent::UploadingPerBatch { batch, attempt })?;

            match self.vendor.create_task(&request) {
                Ok(handle) => {
                    self.repository
                        .set_task_uploaded(task_id, &handle.task_id, chunk)?;
                    self.repository.record_event(
                        task_id,
                        DialerTaskEvent::Uploaded {
                            vendor_task_id: handle.task_id.clone(),
                        },
                    )?;
                    return Ok(());
                }
                Err(VendorError::Transient(message)) => {
                    warn!(
                        task_id,
                        bucket = %bucket.name,
                        batch,
                        attempt,
                        %message,
                        "transient vendor error, will retry within cap"
                    );
                    last_error = Some(VendorError::Transient(message));
                }
                Err(fatal @ VendorError::Fatal(_)) => {
                    self.repository.record_event(
                        task_id,
                        DialerTaskEvent::Failure {
                            error: fatal.to_string(),
                        },
                    )?;
                    self.repository.set_task_failed(task_id, &fatal.to_string())?;
                    return Err(DialerError::BatchFailed {
                        bucket: bucket.name.clone(),
                        batch,
                        attempts: attempt,
                        last_error: fatal,
                    });
                }
            }
        }

        let last_error =
            last_error.unwrap_or_else(|| VendorError::Transient("no attempt made".to_string()));
        self.repository.record_event(
            task_id,
            DialerTaskEvent::Failure {
                error: last_error.to_string(),
            },
        )?;
        self.repository
            .set_task_failed(task_id, &last_error.to_string())?;
        Err(DialerError::BatchFailed {
            bucket: bucket.name.clone(),
            batch,
            attempts: self.config.max_upload_attempts,
            last_error,
        })
    }

    /// Withdraw a contact from today's in-flight vendor tasks. Failures are
    /// collected and reported, never retried; the caller decides whether a
    /// partial cancellation is acceptable.
    pub fn cancel_contact(
        &self,
        phone_number: &str,
        as_of: NaiveDate,
    ) -> Result<CancelSummary, DialerError> {
        let task_ids = self.repository.open_vendor_task_ids(as_of)?;
        let mut failed = Vec::new();
        for task_id in &task_ids {
            if let Err(err) = self.vendor.cancel_phone_call(task_id, phone_number) {
                warn!(
                    vendor_task_id = %task_id,
                    phone = phone_number,
                    error = %err,
                    "cancel-by-phone-number failed"
                );
                failed.push((task_id.clone(), err.to_string()));
            }
        }
        Ok(CancelSummary {
            attempted: task_ids.len(),
            failed,
        })
    }
}
