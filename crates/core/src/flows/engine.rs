use thiserror::Error;

use crate::flows::states::{
    SubmissionAction, SubmissionEvent, SubmissionStatus, TransitionOutcome,
};

#[derive(Clone, Debug, Default)]
pub struct SubmissionFlow;

impl SubmissionFlow {
    pub fn initial_state(&self) -> SubmissionStatus {
        SubmissionStatus::Idle
    }

    pub fn apply(
        &self,
        current: &SubmissionStatus,
        event: &SubmissionEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition(current, event)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: SubmissionStatus, event: SubmissionEvent },
}

fn transition(
    current: &SubmissionStatus,
    event: &SubmissionEvent,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use SubmissionAction::{
        ClearSignaturePad, DisableSubmit, EnableSubmit, ResetForm, SendPayload, ShowErrorNotice,
        ShowSuccessNotice,
    };
    use SubmissionEvent::{Abandoned, Accepted, Dispatched, Rejected, Reset, ValidationFailed};
    use SubmissionStatus::{Failed, Idle, Invalid, Pending, Succeeded};

    let (to, actions) = match (current, event) {
        (Pending, Reset) => {
            return Err(FlowTransitionError::InvalidTransition {
                state: current.clone(),
                event: event.clone(),
            })
        }
        (_, Reset) => (Idle, vec![]),
        (Idle, ValidationFailed { message }) => {
            (Invalid { message: message.clone() }, vec![ShowErrorNotice])
        }
        (Idle, Dispatched) => (Pending, vec![DisableSubmit, SendPayload]),
        (Pending, Accepted { message }) => (
            Succeeded { message: message.clone() },
            vec![ShowSuccessNotice, ResetForm, ClearSignaturePad, EnableSubmit],
        ),
        (Pending, Rejected { message }) => {
            (Failed { message: message.clone() }, vec![ShowErrorNotice, EnableSubmit])
        }
        (Pending, Abandoned) => (Idle, vec![EnableSubmit]),
        _ => {
            return Err(FlowTransitionError::InvalidTransition {
                state: current.clone(),
                event: event.clone(),
            })
        }
    };

    Ok(TransitionOutcome { from: current.clone(), to, event: event.clone(), actions })
}
