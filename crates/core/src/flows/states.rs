use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SubmissionStatus {
    #[default]
    Idle,
    Pending,
    Succeeded {
        message: String,
    },
    Failed {
        message: String,
    },
    /// Local validation stopped the attempt before any request was made.
    Invalid {
        message: String,
    },
}

impl SubmissionStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Whether the submit control accepts clicks.
    pub fn submit_enabled(&self) -> bool {
        !self.is_pending()
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Succeeded { message } | Self::Failed { message } | Self::Invalid { message } => {
                Some(message)
            }
            Self::Idle | Self::Pending => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionEvent {
    Reset,
    ValidationFailed { message: String },
    Dispatched,
    Accepted { message: String },
    Rejected { message: String },
    /// The caller stopped waiting on a dispatched request.
    Abandoned,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionAction {
    DisableSubmit,
    SendPayload,
    ShowSuccessNotice,
    ShowErrorNotice,
    ResetForm,
    ClearSignaturePad,
    EnableSubmit,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: SubmissionStatus,
    pub to: SubmissionStatus,
    pub event: SubmissionEvent,
    pub actions: Vec<SubmissionAction>,
}
