//! Per-contact call payload construction and batching.

use super::domain::{ContactCandidate, ContactPayload, PhoneSlot};

/// Every configured number for the candidate is ineffective; the candidate
/// is excluded from the batch, not a pipeline failure.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("account {account_id} has no effective phone number left")]
pub struct AllNumbersIneffective {
    pub account_id: i64,
}

/// Build the call payload for one candidate. Numbers are tried in the fixed
/// slot priority order; the first remaining slot becomes the primary number
/// and the rest become fallbacks. The selector has already stripped
/// ineffective slots, so an empty phone map means every number was
/// ineffective.
pub fn construct(candidate: &ContactCandidate) -> Result<ContactPayload, AllNumbersIneffective> {
    let account = &candidate.account;

    let mut ordered = PhoneSlot::ordered()
        .into_iter()
        .filter_map(|slot| account.phones.get(&slot));

    let primary = ordered.next().ok_or(AllNumbersIneffective {
        account_id: account.account_id,
    })?;
    let alternate_numbers = ordered.map(|s| s.phone_number.clone()).collect();

    Ok(ContactPayload {
        account_id: account.account_id,
        account_payment_id: account.account_payment_id,
        customer_id: account.customer_id,
        bucket: candidate.bucket.clone(),
        phone_number: primary.phone_number.clone(),
        skiptrace_id: primary.id,
        alternate_numbers,
        dpd: account.dpd,
        outstanding_amount: account.outstanding(),
        due_amount: account.due(),
        sort_rank: 0,
    })
}

/// Assign sort ranks: highest dpd first, ties broken by outstanding amount
/// descending. Rank 1 is dialed first.
pub fn rank(payloads: &mut [ContactPayload]) {
    payloads.sort_by(|a, b| {
        b.dpd
            .cmp(&a.dpd)
            .then(b.outstanding_amount.cmp(&a.outstanding_amount))
    });
    for (index, payload) in payloads.iter_mut().enumerate() {
        payload.sort_rank = index as u32 + 1;
    }
}

/// Chunk payloads into upload batches. Each batch is persisted and uploaded
/// independently so partial progress survives a crash mid-run.
pub fn batches(payloads: Vec<ContactPayload>, batch_size: usize) -> Vec<Vec<ContactPayload>> {
    let size = batch_size.max(1);
    let mut out = Vec::new();
    let mut current = Vec::with_capacity(size.min(payloads.len()));
    for payload in payloads {
        current.push(payload);
        if current.len() == size {
            out.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}
