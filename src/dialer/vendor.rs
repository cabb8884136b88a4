//! Contract with the external voice vendor.
//!
//! The vendor API is a collaborator, not re-specified here: the trait below
//! names exactly what the pipeline relies on. Its API accepts only string
//! field values and a base64-encoded callback URL.

use super::domain::ContactPayload;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Serialize;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum VendorError {
    /// Connection failures, timeouts, HTTP 429 and 5xx. Retryable.
    #[error("transient vendor failure: {0}")]
    Transient(String),
    /// Any other HTTP error. Never retried.
    #[error("vendor rejected request: {0}")]
    Fatal(String),
}

/// One contact row as the vendor wants it: every value stringified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VendorContact {
    pub account_id: String,
    pub phone_number: String,
    pub alternate_numbers: String,
    pub bucket: String,
    pub dpd: String,
    pub outstanding_amount: String,
    pub due_amount: String,
    pub sort_rank: String,
}

impl From<&ContactPayload> for VendorContact {
    fn from(payload: &ContactPayload) -> Self {
        Self {
            account_id: payload.account_id.to_string(),
            phone_number: payload.phone_number.clone(),
            alternate_numbers: payload.alternate_numbers.join(","),
            bucket: payload.bucket.clone(),
            dpd: payload.dpd.to_string(),
            outstanding_amount: payload.outstanding_amount.to_string(),
            due_amount: payload.due_amount.to_string(),
            sort_rank: payload.sort_rank.to_string(),
        }
    }
}

/// Batch-creation request: task name, the dialing window with rest windows
/// the vendor must not dial during, the stringified contacts, and the
/// callback URL base64-encoded as the vendor requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateTaskRequest {
    pub task_name: String,
    pub start_time: String,
    pub end_time: String,
    pub rest_times: Vec<(String, String)>,
    pub contacts: Vec<VendorContact>,
    pub callback_url: String,
}

impl CreateTaskRequest {
    pub fn new(
        task_name: String,
        start_time: String,
        end_time: String,
        rest_times: Vec<(String, String)>,
        contacts: &[ContactPayload],
        callback_url: &str,
    ) -> Self {
        Self {
            task_name,
            start_time,
            end_time,
            rest_times,
            contacts: contacts.iter().map(VendorContact::from).collect(),
            callback_url: BASE64.encode(callback_url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorTaskHandle {
    pub task_id: String,
}

/// The outbound surface of the vendor API the pipeline calls.
pub trait DialerVendorClient: Send + Sync {
    fn create_task(&self, request: &CreateTaskRequest) -> Result<VendorTaskHandle, VendorError>;
    /// Withdraw a single number from an in-flight task. Best-effort.
    fn cancel_phone_call(&self, task_id: &str, phone_number: &str) -> Result<(), VendorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> ContactPayload {
        ContactPayload {
            account_id: 9,
            account_payment_id: 10,
            customer_id: 11,
            bucket: "B1".to_string(),
            phone_number: "0811111".to_string(),
            skiptrace_id: 5,
            alternate_numbers: vec!["0822222".to_string(), "0833333".to_string()],
            dpd: 7,
            outstanding_amount: 250_000,
            due_amount: 0,
            sort_rank: 3,
        }
    }

    #[test]
    fn contact_fields_are_all_strings() {
        let contact = VendorContact::from(&payload());
        assert_eq!(contact.account_id, "9");
        assert_eq!(contact.dpd, "7");
        assert_eq!(contact.outstanding_amount, "250000");
        assert_eq!(contact.sort_rank, "3");
        assert_eq!(contact.alternate_numbers, "0822222,0833333");
    }

    #[test]
    fn callback_url_is_base64_encoded() {
        let request = CreateTaskRequest::new(
            "B1-20260830".to_string(),
            "08:00".to_string(),
            "20:00".to_string(),
            vec![("12:00".to_string(), "13:00".to_string())],
            &[payload()],
            "http://collections.local/api/v1/dialer/callbacks",
        );
        let decoded = BASE64.decode(&request.callback_url).expect("valid base64");
        assert_eq!(
            String::from_utf8(decoded).expect("utf8"),
            "http://collections.local/api/v1/dialer/callbacks"
        );
    }
}
