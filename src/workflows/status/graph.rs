use super::domain::{ApplicationStatus, WorkflowType};
use super::handlers::StatusHandler;
use std::collections::HashSet;

use ApplicationStatus::*;

/// The legal `(from, to)` edges per workflow, built once from static
/// configuration and read-only afterwards. The graph certifies reachability
/// only; choosing between multiple edges sharing a `from` status is handler
/// business.
#[derive(Debug)]
pub struct StatusTransitionGraph {
    edges: HashSet<(WorkflowType, ApplicationStatus, ApplicationStatus)>,
}

impl StatusTransitionGraph {
    pub fn standard() -> Self {
        let mut edges = HashSet::new();

        for (from, to) in julo_one_edges() {
            edges.insert((WorkflowType::JuloOne, from, to));
        }
        for (from, to) in julo_starter_edges() {
            edges.insert((WorkflowType::JuloStarter, from, to));
        }

        Self { edges }
    }

    pub fn is_legal(
        &self,
        workflow: WorkflowType,
        from: ApplicationStatus,
        to: ApplicationStatus,
    ) -> bool {
        self.edges.contains(&(workflow, from, to))
    }

    /// Handler bound to a target status. Total over the status enum, so a
    /// missing binding is impossible by construction.
    pub fn handler_for(&self, workflow: WorkflowType, to: ApplicationStatus) -> StatusHandler {
        StatusHandler::for_status(workflow, to)
    }
}

fn julo_one_edges() -> Vec<(ApplicationStatus, ApplicationStatus)> {
    vec![
        (FormCreated, FormPartial),
        (FormPartial, FormPartialExpired),
        (FormPartial, DocumentsSubmitted),
        (FormPartial, DocumentsVerified),
        (FormPartial, FlaggedForFraud),
        (FormPartial, Denied),
        (DocumentsSubmitted, DocumentsVerified),
        (DocumentsSubmitted, FlaggedForFraud),
        (DocumentsSubmitted, Denied),
        (DocumentsVerified, VerificationCallsOk),
        (DocumentsVerified, FlaggedForFraud),
        (DocumentsVerified, Denied),
        (VerificationCallsOk, ApplicantCallsSuccessful),
        (VerificationCallsOk, Denied),
        (ApplicantCallsSuccessful, OfferAccepted),
        (ApplicantCallsSuccessful, Denied),
        (FlaggedForFraud, Denied),
        (FlaggedForFraud, DocumentsVerified),
        (OfferAccepted, ActivationCallOk),
        (OfferAccepted, Denied),
        (ActivationCallOk, Approved),
        (ActivationCallOk, Denied),
    ]
}

fn julo_starter_edges() -> Vec<(ApplicationStatus, ApplicationStatus)> {
    vec![
        (FormCreated, FormPartial),
        (FormPartial, FormPartialExpired),
        (FormPartial, DocumentsVerified),
        (FormPartial, FlaggedForFraud),
        (FormPartial, Denied),
        (DocumentsVerified, Approved),
        (DocumentsVerified, FlaggedForFraud),
        (DocumentsVerified, Denied),
        (FlaggedForFraud, Denied),
    ]
}
