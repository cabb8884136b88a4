use super::domain::{
    Actor, Application, ApplicationHistoryEntry, ApplicationStatus, WorkflowType,
};
use super::experiments::WorkflowSettings;
use super::graph::StatusTransitionGraph;
use super::handlers::{HandlerContext, HandlerDecision, SideEffect};
use super::repository::{ActionDispatcher, ApplicationRepository, RepositoryError};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of a settled transition request.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionOutcome {
    pub committed_status: ApplicationStatus,
    /// Names of the side-effect actions that were dispatched, for
    /// observability and tests. Empty when the handler held the application
    /// in place.
    pub fired_actions: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("no {workflow} edge permits moving an application from {from} to {to}")]
    IllegalTransition {
        workflow: WorkflowType,
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    #[error("application {0} not found")]
    NotFound(i64),
    #[error("unknown application status code {0}")]
    UnknownStatus(u16),
    #[error("application {application_id} was advanced concurrently (expected status {expected})")]
    Conflict {
        application_id: i64,
        expected: ApplicationStatus,
    },
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for WorkflowError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound => Self::Repository(RepositoryError::NotFound),
            other => Self::Repository(other),
        }
    }
}

/// Drives an application through the transition graph: validates the edge,
/// runs the target handler's decision list, follows at most one redirect,
/// commits with a compare-and-set, and fires declared side effects after
/// the commit.
pub struct WorkflowEngine<R, D> {
    graph: StatusTransitionGraph,
    repository: Arc<R>,
    dispatcher: Arc<D>,
    settings: WorkflowSettings,
}

impl<R, D> WorkflowEngine<R, D>
where
    R: ApplicationRepository + 'static,
    D: ActionDispatcher + 'static,
{
    pub fn new(repository: Arc<R>, dispatcher: Arc<D>, settings: WorkflowSettings) -> Self {
        Self {
            graph: StatusTransitionGraph::standard(),
            repository,
            dispatcher,
            settings,
        }
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    /// Request a transition to `to` for the given application. Returns the
    /// committed status (which may differ from `to` after a handler
    /// redirect, or equal the current status when the handler holds the
    /// application in place) plus the actions fired.
    pub fn run_transition(
        &self,
        actor: &Actor,
        application_id: i64,
        to: ApplicationStatus,
        change_reason: &str,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let application = self
            .repository
            .fetch(application_id)?
            .ok_or(WorkflowError::NotFound(application_id))?;

        if !self.graph.is_legal(application.workflow, application.status, to) {
            return Err(WorkflowError::IllegalTransition {
                workflow: application.workflow,
                from: application.status,
                to,
            });
        }

        let score = self.repository.score_snapshot(application_id)?;
        let risk = self.repository.risk_decision(application_id)?;
        let ever_flagged = self
            .repository
            .history(application_id)?
            .iter()
            .any(|entry| entry.new_status == ApplicationStatus::FlaggedForFraud);

        let ctx = HandlerContext {
            application: &application,
            score: score.as_ref(),
            risk: risk.as_ref(),
            settings: &self.settings,
            ever_flagged_for_fraud: ever_flagged,
            today: Utc::now().date_naive(),
            requested_reason: change_reason,
        };

        let decision = self.graph.handler_for(application.workflow, to).decide(&ctx);
        let (settled, reason, actions) = match decision {
            HandlerDecision::Stay { reason } => {
                info!(
                    application_id,
                    requested = %to,
                    %reason,
                    "transition held, application stays at current status"
                );
                return Ok(TransitionOutcome {
                    committed_status: application.status,
                    fired_actions: Vec::new(),
                });
            }
            HandlerDecision::Advance { reason, actions } => (
                to,
                reason.unwrap_or_else(|| change_reason.to_string()),
                actions,
            ),
            HandlerDecision::Redirect { to: alternate, reason } => {
                self.follow_redirect(&ctx, &application, alternate, reason)?
            }
        };

        self.commit(actor, &application, settled, &reason)?;
        let fired = self.fire_side_effects(application_id, &actions);

        Ok(TransitionOutcome {
            committed_status: settled,
            fired_actions: fired,
        })
    }

    /// Follow a single handler redirect. The alternate destination must be a
    /// legal edge from the current status and its handler must settle
    /// definitively: a second redirect is treated as a configuration bug and
    /// surfaces as `IllegalTransition` naming the attempted hop.
    fn follow_redirect(
        &self,
        ctx: &HandlerContext<'_>,
        application: &Application,
        alternate: ApplicationStatus,
        redirect_reason: String,
    ) -> Result<(ApplicationStatus, String, Vec<SideEffect>), WorkflowError> {
        if !self
            .graph
            .is_legal(application.workflow, application.status, alternate)
        {
            return Err(WorkflowError::IllegalTransition {
                workflow: application.workflow,
                from: application.status,
                to: alternate,
            });
        }

        let decision = self
            .graph
            .handler_for(application.workflow, alternate)
            .decide(ctx);
        settle_redirect(
            application.workflow,
            application.id,
            application.status,
            alternate,
            redirect_reason,
            decision,
        )
    }

    fn commit(
        &self,
        actor: &Actor,
        application: &Application,
        settled: ApplicationStatus,
        reason: &str,
    ) -> Result<(), WorkflowError> {
        if settled == application.status {
            return Ok(());
        }

        let entry = ApplicationHistoryEntry {
            application_id: application.id,
            old_status: application.status,
            new_status: settled,
            change_reason: reason.to_string(),
            changed_by: actor.name.clone(),
            changed_at: Utc::now(),
        };

        self.repository
            .commit_transition(application.id, application.status, settled, entry)
            .map_err(|err| match err {
                RepositoryError::Conflict => WorkflowError::Conflict {
                    application_id: application.id,
                    expected: application.status,
                },
                other => WorkflowError::Repository(other),
            })?;

        info!(
            application_id = application.id,
            from = %application.status,
            to = %settled,
            %reason,
            changed_by = %actor.name,
            "application transition committed"
        );
        Ok(())
    }

    /// Best-effort dispatch after the commit. Failures are logged with full
    /// context and swallowed; the returned list names every action that was
    /// handed to the dispatcher.
    fn fire_side_effects(&self, application_id: i64, actions: &[SideEffect]) -> Vec<String> {
        let mut fired = Vec::with_capacity(actions.len());
        for action in actions {
            if let Err(err) = self.dispatcher.dispatch(application_id, action) {
                warn!(
                    application_id,
                    action = action.name(),
                    error = %err,
                    "side effect dispatch failed after committed transition"
                );
            }
            fired.push(action.name().to_string());
        }
        fired
    }
}

/// Settle what the redirect target decided. The target must settle
/// definitively: an advance commits the alternate, a hold keeps the current
/// status, and a second redirect is a configuration bug that surfaces as
/// `IllegalTransition` naming the attempted hop.
fn settle_redirect(
    workflow: WorkflowType,
    application_id: i64,
    current: ApplicationStatus,
    alternate: ApplicationStatus,
    redirect_reason: String,
    decision: HandlerDecision,
) -> Result<(ApplicationStatus, String, Vec<SideEffect>), WorkflowError> {
    match decision {
        HandlerDecision::Advance { reason, actions } => {
            Ok((alternate, reason.unwrap_or(redirect_reason), actions))
        }
        HandlerDecision::Stay { reason } => {
            // The redirect target declined as well; treat as a hold at the
            // redirect destination's reason.
            Ok((current, reason, Vec::new()))
        }
        HandlerDecision::Redirect { to: second, .. } => {
            warn!(
                application_id,
                first = %alternate,
                second = %second,
                "redirect chain exceeded depth 1"
            );
            Err(WorkflowError::IllegalTransition {
                workflow,
                from: alternate,
                to: second,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_target_redirecting_again_is_rejected() {
        let chained = HandlerDecision::Redirect {
            to: ApplicationStatus::Denied,
            reason: "chained hop".to_string(),
        };

        let err = settle_redirect(
            WorkflowType::JuloOne,
            7,
            ApplicationStatus::DocumentsSubmitted,
            ApplicationStatus::FlaggedForFraud,
            "first hop".to_string(),
            chained,
        )
        .expect_err("second hop must not settle");

        match err {
            WorkflowError::IllegalTransition { from, to, .. } => {
                assert_eq!(from, ApplicationStatus::FlaggedForFraud);
                assert_eq!(to, ApplicationStatus::Denied);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn redirect_target_holding_keeps_the_current_status() {
        let (settled, reason, actions) = settle_redirect(
            WorkflowType::JuloOne,
            7,
            ApplicationStatus::DocumentsSubmitted,
            ApplicationStatus::FlaggedForFraud,
            "first hop".to_string(),
            HandlerDecision::Stay {
                reason: "held at destination".to_string(),
            },
        )
        .expect("hold settles in place");

        assert_eq!(settled, ApplicationStatus::DocumentsSubmitted);
        assert_eq!(reason, "held at destination");
        assert!(actions.is_empty());
    }
}
