//! Eligibility selection for a bucket's daily calling batch.

use super::domain::{BucketConfig, CollectionAccount, ContactCandidate, ExclusionReason};
use super::ineffective;
use super::repository::{DialerRepository, StoreError};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::debug;

/// Result of one selection pass: the surviving candidates plus every
/// excluded account with the reason that excluded it first.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionOutcome {
    pub candidates: Vec<ContactCandidate>,
    pub exclusions: Vec<(i64, ExclusionReason)>,
}

/// Applies the ordered exclusion pipeline to a bucket's account scan. Each
/// call re-queries current state; results are never cached across runs.
pub struct EligibilitySelector<R> {
    repository: Arc<R>,
}

impl<R> EligibilitySelector<R>
where
    R: DialerRepository,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Exclusion stages run in a fixed order: blacklist, active PTP,
    /// autodebet, ineffective numbers, then the bucket's numeric filters.
    /// An account stopped by an earlier stage never reaches a later one, so
    /// the recorded reason is always the first that applied.
    pub fn select(
        &self,
        bucket: &BucketConfig,
        as_of: NaiveDate,
    ) -> Result<SelectionOutcome, StoreError> {
        let accounts = self.repository.accounts_for_bucket(&bucket.name)?;

        let mut candidates = Vec::new();
        let mut exclusions = Vec::new();

        for account in accounts {
            match self.screen(&account, bucket, as_of)? {
                Ok(candidate) => candidates.push(candidate),
                Err(reason) => {
                    debug!(
                        account_id = account.account_id,
                        bucket = %bucket.name,
                        reason = reason.label(),
                        "account excluded from calling batch"
                    );
                    exclusions.push((account.account_id, reason));
                }
            }
        }

        Ok(SelectionOutcome {
            candidates,
            exclusions,
        })
    }

    fn screen(
        &self,
        account: &CollectionAccount,
        bucket: &BucketConfig,
        as_of: NaiveDate,
    ) -> Result<Result<ContactCandidate, ExclusionReason>, StoreError> {
        if self.blacklisted(account)? {
            return Ok(Err(ExclusionReason::Blacklisted));
        }

        if self
            .repository
            .has_active_ptp(account.account_payment_id, as_of)?
        {
            return Ok(Err(ExclusionReason::ActivePtp));
        }

        if account.autodebet_active {
            return Ok(Err(ExclusionReason::Autodebet));
        }

        // Drop ineffective numbers; the account survives only if at least
        // one dialable number remains.
        let mut phones = account.phones.clone();
        let mut dialable = 0usize;
        for skiptrace in account.phones.values() {
            let ineffective = match self.repository.counter(skiptrace.id)? {
                Some(mut counter) => {
                    ineffective::maybe_refresh(&mut counter, as_of, bucket.ineffective_refresh_days);
                    ineffective::is_ineffective(&counter, bucket, as_of)
                }
                None => false,
            };
            if ineffective {
                phones.retain(|_, s| s.id != skiptrace.id);
            } else {
                dialable += 1;
            }
        }
        if dialable == 0 {
            return Ok(Err(ExclusionReason::IneffectivePhoneNumber));
        }

        if !bucket.dpd_in_range(account.dpd) {
            return Ok(Err(ExclusionReason::OutsideDpdRange));
        }

        if account.outstanding() < bucket.min_outstanding {
            return Ok(Err(ExclusionReason::BelowOutstandingFloor));
        }

        if let Some((min, max)) = bucket.risk_range {
            // Missing risk scores fail closed.
            match account.risk_score {
                Some(score) if min <= score && score < max => {}
                _ => return Ok(Err(ExclusionReason::OutsideRiskRange)),
            }
        }

        let mut screened = account.clone();
        screened.phones = phones;
        Ok(Ok(ContactCandidate {
            account: screened,
            bucket: bucket.name.clone(),
        }))
    }

    fn blacklisted(&self, account: &CollectionAccount) -> Result<bool, StoreError> {
        if self.repository.is_account_blacklisted(account.account_id)? {
            return Ok(true);
        }
        for skiptrace in account.phones.values() {
            if self
                .repository
                .is_number_blacklisted(&skiptrace.phone_number)?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
