//! Application status workflow engine.
//!
//! A credit application moves through numbered status codes along the edges
//! of a per-workflow transition graph. Each target status binds a handler
//! that runs an ordered list of eligibility checks before the change is
//! committed and a history entry appended. Handlers may redirect once to an
//! alternate destination (e.g. a fraud flag); side effects fire after commit
//! and never roll it back.

pub mod domain;
pub mod engine;
pub mod experiments;
pub mod graph;
pub mod handlers;
pub mod repository;
pub mod rules;

pub use domain::{
    Actor, Application, ApplicationHistoryEntry, ApplicationStatus, CreditScoreClass,
    RiskCheckResult, RiskDecision, ScoreSnapshot, WorkflowType,
};
pub use engine::{TransitionOutcome, WorkflowEngine, WorkflowError};
pub use experiments::{ExperimentSetting, HighScoreBypassSetting, SettingsError, WorkflowSettings};
pub use graph::StatusTransitionGraph;
pub use handlers::{HandlerDecision, SideEffect, StatusHandler};
pub use repository::{ActionDispatcher, ApplicationRepository, DispatchError, RepositoryError};
