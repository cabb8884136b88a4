//! Outbound dialer orchestration.
//!
//! A bucket run is a batch pipeline: select eligible delinquent accounts,
//! construct per-contact call payloads with fallback phone ordering, chunk
//! them, upload each chunk to the voice vendor with bounded retry, and later
//! reconcile the vendor's asynchronous call-result callbacks into skiptrace
//! history, promise-to-pay records, and ineffective-number counters.

pub mod domain;
pub mod ineffective;
pub mod payload;
pub mod reconcile;
pub mod repository;
pub mod selector;
pub mod task_manager;
pub mod vendor;

pub use domain::{
    BucketConfig, CallResult, CollectionAccount, ConnectionKind, ContactCandidate, ContactPayload,
    DialerTask, DialerTaskEvent, DialerTaskStatus, ExclusionReason, IneffectiveCounter, PhoneSlot,
    PromiseToPay, Skiptrace, SkiptraceHistory,
};
pub use payload::AllNumbersIneffective;
pub use reconcile::{
    CallResultReconciler, CallbackBody, CallbackEnvelope, CustomerInfo, ReconcileError,
    ReconcileOutcome,
};
pub use repository::{DeferredActionQueue, DeferredError, DialerRepository, StoreError};
pub use selector::{EligibilitySelector, SelectionOutcome};
pub use task_manager::{BucketRunSummary, CancelSummary, DialerError, DialerTaskManager};
pub use vendor::{CreateTaskRequest, DialerVendorClient, VendorContact, VendorError, VendorTaskHandle};
