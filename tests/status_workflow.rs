mod common;

use common::{application, engine_with, permanent_medium_pass, score, seeded};
use loanflow::infra::{InMemoryApplicationRepository, RecordingActionDispatcher};
use loanflow::workflows::status::{
    ActionDispatcher, Application, ApplicationHistoryEntry, ApplicationRepository,
    ApplicationStatus, CreditScoreClass, DispatchError, HighScoreBypassSetting, RepositoryError,
    RiskCheckResult, ScoreSnapshot, SideEffect, WorkflowEngine, WorkflowError, WorkflowSettings,
};
use std::sync::Arc;

fn bypass_settings() -> WorkflowSettings {
    WorkflowSettings {
        high_score_bypass: Some(HighScoreBypassSetting {
            is_active: true,
            bottom_pgood_threshold: 0.95,
            selector: None,
        }),
        medium_score_pass: Some(permanent_medium_pass()),
    }
}

fn medium_only_settings() -> WorkflowSettings {
    WorkflowSettings {
        high_score_bypass: None,
        medium_score_pass: Some(permanent_medium_pass()),
    }
}

#[test]
fn high_score_bypass_advances_with_its_own_reason() {
    let app = application(2_000_000_001, ApplicationStatus::FormPartial, None);
    let harness = seeded(
        bypass_settings(),
        app,
        Some(score(CreditScoreClass::A, 0.97)),
    );

    let outcome = harness
        .engine
        .run_transition(
            &loanflow::workflows::status::Actor::system(),
            2_000_000_001,
            ApplicationStatus::DocumentsVerified,
            "system_triggered",
        )
        .expect("transition settles");

    assert_eq!(outcome.committed_status, ApplicationStatus::DocumentsVerified);
    assert_eq!(outcome.fired_actions, vec!["refresh_credit_score"]);

    let history = harness
        .repository
        .history(2_000_000_001)
        .expect("history reads");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].change_reason, "Julo one pass high score");
    assert_eq!(history[0].old_status, ApplicationStatus::FormPartial);
    assert_eq!(history[0].new_status, ApplicationStatus::DocumentsVerified);
}

#[test]
fn medium_score_experiment_advances_with_literal_reason() {
    let app = application(2_000_000_002, ApplicationStatus::FormPartial, None);
    let harness = seeded(
        medium_only_settings(),
        app,
        Some(score(CreditScoreClass::B, 0.82)),
    );

    let outcome = harness
        .engine
        .run_transition(
            &loanflow::workflows::status::Actor::system(),
            2_000_000_002,
            ApplicationStatus::DocumentsVerified,
            "system_triggered",
        )
        .expect("transition settles");

    assert_eq!(outcome.committed_status, ApplicationStatus::DocumentsVerified);
    let history = harness
        .repository
        .history(2_000_000_002)
        .expect("history reads");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].change_reason, "Julo one pass medium score");
}

#[test]
fn c_score_holds_without_commit_or_actions() {
    let app = application(2_000_000_003, ApplicationStatus::FormPartial, None);
    let harness = seeded(
        medium_only_settings(),
        app,
        Some(score(CreditScoreClass::C, 0.40)),
    );

    let outcome = harness
        .engine
        .run_transition(
            &loanflow::workflows::status::Actor::system(),
            2_000_000_003,
            ApplicationStatus::DocumentsVerified,
            "system_triggered",
        )
        .expect("hold is not an error");

    assert_eq!(outcome.committed_status, ApplicationStatus::FormPartial);
    assert!(outcome.fired_actions.is_empty());
    assert!(harness
        .repository
        .history(2_000_000_003)
        .expect("history reads")
        .is_empty());
    assert!(harness.dispatcher.dispatched().is_empty());
}

#[test]
fn illegal_transition_is_rejected_and_status_untouched() {
    let app = application(2_000_000_004, ApplicationStatus::FormPartial, None);
    let harness = seeded(medium_only_settings(), app, None);

    let err = harness
        .engine
        .run_transition(
            &loanflow::workflows::status::Actor::system(),
            2_000_000_004,
            ApplicationStatus::Approved,
            "system_triggered",
        )
        .expect_err("no 105 to 190 edge exists");

    assert!(matches!(err, WorkflowError::IllegalTransition { .. }));
    let stored = harness
        .repository
        .fetch(2_000_000_004)
        .expect("fetch works")
        .expect("application present");
    assert_eq!(stored.status, ApplicationStatus::FormPartial);
    assert!(harness
        .repository
        .history(2_000_000_004)
        .expect("history reads")
        .is_empty());
}

#[test]
fn fraud_redirect_commits_once_at_the_redirect_target() {
    let app = application(2_000_000_005, ApplicationStatus::FormPartial, None);
    let mut snapshot = score(CreditScoreClass::B, 0.82);
    snapshot.fraud_device = true;
    let harness = seeded(medium_only_settings(), app, Some(snapshot));

    let outcome = harness
        .engine
        .run_transition(
            &loanflow::workflows::status::Actor::system(),
            2_000_000_005,
            ApplicationStatus::DocumentsSubmitted,
            "system_triggered",
        )
        .expect("redirect settles");

    assert_eq!(outcome.committed_status, ApplicationStatus::FlaggedForFraud);
    assert_eq!(outcome.fired_actions, vec!["enqueue_fraud_review"]);

    let history = harness
        .repository
        .history(2_000_000_005)
        .expect("history reads");
    assert_eq!(history.len(), 1, "redirect must not add a per-hop entry");
    assert_eq!(history[0].old_status, ApplicationStatus::FormPartial);
    assert_eq!(history[0].new_status, ApplicationStatus::FlaggedForFraud);
    assert_eq!(history[0].change_reason, "Application flagged for fraud");
}

#[test]
fn blocked_referral_redirects_to_denial() {
    let app = application(
        2_000_000_006,
        ApplicationStatus::FormPartial,
        Some(" MdJulo "),
    );
    let harness = seeded(medium_only_settings(), app, None);

    let outcome = harness
        .engine
        .run_transition(
            &loanflow::workflows::status::Actor::system(),
            2_000_000_006,
            ApplicationStatus::DocumentsSubmitted,
            "system_triggered",
        )
        .expect("redirect settles");

    assert_eq!(outcome.committed_status, ApplicationStatus::Denied);
    let history = harness
        .repository
        .history(2_000_000_006)
        .expect("history reads");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].change_reason, "Referral code blocked");
}

/// Repository that serves a stale snapshot on fetch, simulating another
/// worker advancing the application between read and commit.
struct StaleReadRepository {
    inner: InMemoryApplicationRepository,
    stale: Application,
}

impl ApplicationRepository for StaleReadRepository {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        self.inner.insert(application)
    }

    fn fetch(&self, application_id: i64) -> Result<Option<Application>, RepositoryError> {
        if application_id == self.stale.id {
            return Ok(Some(self.stale.clone()));
        }
        self.inner.fetch(application_id)
    }

    fn score_snapshot(
        &self,
        application_id: i64,
    ) -> Result<Option<ScoreSnapshot>, RepositoryError> {
        self.inner.score_snapshot(application_id)
    }

    fn risk_decision(
        &self,
        application_id: i64,
    ) -> Result<Option<RiskCheckResult>, RepositoryError> {
        self.inner.risk_decision(application_id)
    }

    fn upsert_risk_decision(&self, result: RiskCheckResult) -> Result<(), RepositoryError> {
        self.inner.upsert_risk_decision(result)
    }

    fn commit_transition(
        &self,
        application_id: i64,
        expected_from: ApplicationStatus,
        new_status: ApplicationStatus,
        entry: ApplicationHistoryEntry,
    ) -> Result<(), RepositoryError> {
        self.inner
            .commit_transition(application_id, expected_from, new_status, entry)
    }

    fn history(
        &self,
        application_id: i64,
    ) -> Result<Vec<ApplicationHistoryEntry>, RepositoryError> {
        self.inner.history(application_id)
    }
}

#[test]
fn concurrent_advance_surfaces_as_conflict() {
    let inner = InMemoryApplicationRepository::default();
    let mut app = application(2_000_000_007, ApplicationStatus::FormPartial, None);
    let stale = app.clone();
    app.status = ApplicationStatus::DocumentsSubmitted;
    inner.insert(app).expect("application seeds");
    inner.set_score_snapshot(2_000_000_007, score(CreditScoreClass::B, 0.82));

    let repository = Arc::new(StaleReadRepository { inner, stale });
    let dispatcher = Arc::new(RecordingActionDispatcher::default());
    let engine = WorkflowEngine::new(repository, dispatcher, medium_only_settings());

    let err = engine
        .run_transition(
            &loanflow::workflows::status::Actor::system(),
            2_000_000_007,
            ApplicationStatus::DocumentsVerified,
            "system_triggered",
        )
        .expect_err("stale expected status must not commit");

    match err {
        WorkflowError::Conflict {
            application_id,
            expected,
        } => {
            assert_eq!(application_id, 2_000_000_007);
            assert_eq!(expected, ApplicationStatus::FormPartial);
        }
        other => panic!("expected conflict, got {other:?}"),
    }
}

struct FailingDispatcher;

impl ActionDispatcher for FailingDispatcher {
    fn dispatch(&self, _application_id: i64, _effect: &SideEffect) -> Result<(), DispatchError> {
        Err(DispatchError::Transport("amqp down".to_string()))
    }
}

#[test]
fn side_effect_failure_never_rolls_back_a_commit() {
    let repository = Arc::new(InMemoryApplicationRepository::default());
    let app = application(2_000_000_008, ApplicationStatus::ActivationCallOk, None);
    repository.insert(app).expect("application seeds");

    let engine = WorkflowEngine::new(
        repository.clone(),
        Arc::new(FailingDispatcher),
        WorkflowSettings::default(),
    );

    let outcome = engine
        .run_transition(
            &loanflow::workflows::status::Actor::agent(9, "agent_sari"),
            2_000_000_008,
            ApplicationStatus::Approved,
            "activation verified",
        )
        .expect("dispatch failure is swallowed");

    assert_eq!(outcome.committed_status, ApplicationStatus::Approved);
    assert_eq!(
        outcome.fired_actions,
        vec!["notify_customer", "refresh_credit_score"]
    );
    let stored = repository
        .fetch(2_000_000_008)
        .expect("fetch works")
        .expect("application present");
    assert_eq!(stored.status, ApplicationStatus::Approved);
    let history = repository.history(2_000_000_008).expect("history reads");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].changed_by, "agent_sari");
}

#[test]
fn unknown_application_reports_not_found() {
    let harness = engine_with(WorkflowSettings::default());
    let err = harness
        .engine
        .run_transition(
            &loanflow::workflows::status::Actor::system(),
            404,
            ApplicationStatus::FormPartial,
            "system_triggered",
        )
        .expect_err("nothing seeded");
    assert!(matches!(err, WorkflowError::NotFound(404)));
}
