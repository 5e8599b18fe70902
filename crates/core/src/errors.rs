use thiserror::Error;

use crate::domain::form::{FieldKind, FieldName};

pub const GENERIC_REJECTION_MESSAGE: &str = "Submission failed. Please try again.";
pub const GENERIC_TRANSPORT_MESSAGE: &str = "An error occurred. Please try again.";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("unknown form field `{0}`")]
    UnknownField(String),
    #[error("field `{field}` expects a {expected:?} value")]
    KindMismatch { field: FieldName, expected: FieldKind },
    #[error("unsupported country code `{0}`")]
    UnknownCountryCode(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("required fields are empty: {}", join_fields(fields))]
    MissingRequiredFields { fields: Vec<FieldName> },
    #[error("consent was not given: {}", join_fields(fields))]
    ConsentNotGiven { fields: Vec<FieldName> },
    #[error("a signature is required")]
    SignatureMissing,
    #[error("attachment `{file_name}` has unsupported type `{media_type}`")]
    UnsupportedAttachmentType { file_name: String, media_type: String },
    #[error("attachment is {size} bytes, limit is {limit}")]
    AttachmentTooLarge { size: u64, limit: u64 },
}

impl ValidationError {
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingRequiredFields { .. } => "Please fill in all required fields.".to_string(),
            Self::ConsentNotGiven { .. } => {
                "Please confirm your details and accept the terms.".to_string()
            }
            Self::SignatureMissing => "Please draw your signature before submitting.".to_string(),
            Self::UnsupportedAttachmentType { .. } => {
                "Attachments must be an image or a PDF.".to_string()
            }
            Self::AttachmentTooLarge { limit, .. } => {
                format!("Attachments must be at most {} KB.", limit / 1024)
            }
        }
    }
}

/// Failure reported by a submission endpoint.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("submission rejected (status {status:?}): {}", message.as_deref().unwrap_or("no message"))]
    Rejected { status: Option<u16>, message: Option<String> },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("a submission is already in flight")]
    InFlight,
    #[error("application rejected submission {correlation_id}: {source}")]
    Application { correlation_id: String, source: EndpointError },
    #[error("transport failure for submission {correlation_id}: {source}")]
    Transport { correlation_id: String, source: EndpointError },
}

impl SubmissionError {
    pub fn from_endpoint(error: EndpointError, correlation_id: impl Into<String>) -> Self {
        let correlation_id = correlation_id.into();
        match error {
            EndpointError::Rejected { .. } => Self::Application { correlation_id, source: error },
            EndpointError::Transport(_)
            | EndpointError::Timeout
            | EndpointError::MalformedResponse(_) => {
                Self::Transport { correlation_id, source: error }
            }
        }
    }

    /// Text shown in the error notification.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(error) => error.user_message(),
            Self::InFlight => "Your registration is already being submitted.".to_string(),
            Self::Application { source: EndpointError::Rejected { message, .. }, .. } => message
                .as_deref()
                .map(str::trim)
                .filter(|message| !message.is_empty())
                .unwrap_or(GENERIC_REJECTION_MESSAGE)
                .to_string(),
            Self::Application { .. } => GENERIC_REJECTION_MESSAGE.to_string(),
            Self::Transport { .. } => GENERIC_TRANSPORT_MESSAGE.to_string(),
        }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::InFlight => "in_flight",
            Self::Application { .. } => "application",
            Self::Transport { .. } => "transport",
        }
    }
}

fn join_fields(fields: &[FieldName]) -> String {
    fields.iter().map(|field| field.input_name()).collect::<Vec<_>>().join(", ")
}
