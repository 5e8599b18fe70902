use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::payload::SubmissionPayload;
use crate::errors::EndpointError;

/// Positive answer from the registration backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Acknowledgement {
    pub message: Option<String>,
}

#[async_trait]
pub trait SubmissionEndpoint: Send + Sync {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<Acknowledgement, EndpointError>;
}

#[async_trait]
impl<E> SubmissionEndpoint for Arc<E>
where
    E: SubmissionEndpoint + ?Sized,
{
    async fn submit(&self, payload: &SubmissionPayload) -> Result<Acknowledgement, EndpointError> {
        (**self).submit(payload).await
    }
}

/// Keeps every payload in memory and answers with scripted outcomes,
/// acknowledging once the script runs out.
#[derive(Clone, Default)]
pub struct RecordingEndpoint {
    payloads: Arc<Mutex<Vec<SubmissionPayload>>>,
    outcomes: Arc<Mutex<VecDeque<Result<Acknowledgement, EndpointError>>>>,
}

impl RecordingEndpoint {
    pub fn with_outcomes(
        outcomes: impl IntoIterator<Item = Result<Acknowledgement, EndpointError>>,
    ) -> Self {
        let endpoint = Self::default();
        lock(&endpoint.outcomes).extend(outcomes);
        endpoint
    }

    pub fn push_outcome(&self, outcome: Result<Acknowledgement, EndpointError>) {
        lock(&self.outcomes).push_back(outcome);
    }

    pub fn payloads(&self) -> Vec<SubmissionPayload> {
        lock(&self.payloads).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.payloads).len()
    }
}

#[async_trait]
impl SubmissionEndpoint for RecordingEndpoint {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<Acknowledgement, EndpointError> {
        lock(&self.payloads).push(payload.clone());
        lock(&self.outcomes).pop_front().unwrap_or_else(|| Ok(Acknowledgement::default()))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
