use super::domain::{
    Application, ApplicationHistoryEntry, ApplicationStatus, RiskCheckResult, ScoreSnapshot,
};
use super::handlers::SideEffect;

/// Storage abstraction for applications and their audit trail, so the engine
/// can be exercised against in-memory fakes.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError>;
    fn fetch(&self, application_id: i64) -> Result<Option<Application>, RepositoryError>;

    fn score_snapshot(&self, application_id: i64) -> Result<Option<ScoreSnapshot>, RepositoryError>;
    fn risk_decision(&self, application_id: i64)
        -> Result<Option<RiskCheckResult>, RepositoryError>;
    fn upsert_risk_decision(&self, result: RiskCheckResult) -> Result<(), RepositoryError>;

    /// Atomically set the application status and append the history entry,
    /// but only if the stored status still equals `expected_from`. A stale
    /// read maps to `RepositoryError::Conflict`, which is the row-lock
    /// equivalent keeping two concurrent transitions from both committing.
    fn commit_transition(
        &self,
        application_id: i64,
        expected_from: ApplicationStatus,
        new_status: ApplicationStatus,
        entry: ApplicationHistoryEntry,
    ) -> Result<(), RepositoryError>;

    fn history(&self, application_id: i64)
        -> Result<Vec<ApplicationHistoryEntry>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists or was modified concurrently")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook for fire-and-forget side effects (notifications, scoring
/// triggers, notes). A dispatch failure must never be observable as a
/// transition failure.
pub trait ActionDispatcher: Send + Sync {
    fn dispatch(&self, application_id: i64, effect: &SideEffect) -> Result<(), DispatchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("action transport unavailable: {0}")]
    Transport(String),
}
