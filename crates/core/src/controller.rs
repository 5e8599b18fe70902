//! Glue between the registration form, the signature pad and the endpoint.
//!
//! The controller owns every piece of mutable state the form screen renders
//! from. Views subscribe to the form and status stores; `submit` drives the
//! request through [`SubmissionFlow`] and executes the actions each
//! transition emits.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::domain::attachment::Attachment;
use crate::domain::form::{FieldName, FieldValue, FormPolicy, FormState};
use crate::domain::payload::SubmissionPayload;
use crate::endpoint::SubmissionEndpoint;
use crate::errors::{EndpointError, FieldError, SubmissionError};
use crate::flows::{
    FlowTransitionError, SubmissionAction, SubmissionEvent, SubmissionFlow, SubmissionStatus,
    TransitionOutcome,
};
use crate::notification::Notifier;
use crate::signature::{PadUpdate, PointerEvent, SignaturePad, SurfaceSize};
use crate::store::{Store, SubscriptionId};

pub const DEFAULT_SUCCESS_MESSAGE: &str = "Registration submitted successfully.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub correlation_id: String,
    pub submitted_at: DateTime<Utc>,
    pub message: String,
}

pub struct SubmissionController<E> {
    endpoint: E,
    form: Store<FormState>,
    status: Store<SubmissionStatus>,
    pad: Mutex<SignaturePad>,
    notifier: Notifier,
    policy: FormPolicy,
    flow: SubmissionFlow,
    request_timeout: Duration,
}

impl<E> SubmissionController<E>
where
    E: SubmissionEndpoint,
{
    pub fn new(endpoint: E, config: &AppConfig) -> Self {
        Self::with_parts(
            endpoint,
            FormPolicy::from(&config.form),
            SignaturePad::new(config.signature.surface(), config.signature.stroke_width),
            Notifier::new(config.notification.dismiss_after()),
            config.endpoint.timeout(),
        )
    }

    pub fn with_parts(
        endpoint: E,
        policy: FormPolicy,
        pad: SignaturePad,
        notifier: Notifier,
        request_timeout: Duration,
    ) -> Self {
        let flow = SubmissionFlow;
        Self {
            endpoint,
            form: Store::default(),
            status: Store::new(flow.initial_state()),
            pad: Mutex::new(pad),
            notifier,
            policy,
            flow,
            request_timeout,
        }
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    pub fn form(&self) -> FormState {
        self.form.get()
    }

    pub fn status(&self) -> SubmissionStatus {
        self.status.get()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn policy(&self) -> &FormPolicy {
        &self.policy
    }

    pub fn subscribe_form(
        &self,
        listener: impl Fn(&FormState) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.form.subscribe(listener)
    }

    pub fn subscribe_status(
        &self,
        listener: impl Fn(&SubmissionStatus) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.status.subscribe(listener)
    }

    pub fn unsubscribe_form(&self, id: SubscriptionId) -> bool {
        self.form.unsubscribe(id)
    }

    pub fn unsubscribe_status(&self, id: SubscriptionId) -> bool {
        self.status.unsubscribe(id)
    }

    pub fn update_field(&self, name: FieldName, value: impl Into<FieldValue>) -> Result<(), FieldError> {
        let value = value.into();
        self.form.update(|form| form.apply(name, value))
    }

    pub fn attach_file(&self, attachment: Option<Attachment>) {
        self.form.update(|form| form.attachment = attachment);
    }

    pub fn resize_signature_pad(&self, size: SurfaceSize) {
        let update = self.lock_pad().resize(size);
        self.apply_pad_update(update);
    }

    pub fn pointer(&self, event: PointerEvent) {
        let update = self.lock_pad().handle(event);
        self.apply_pad_update(update);
    }

    pub fn clear_signature(&self) {
        let update = self.lock_pad().clear();
        self.apply_pad_update(update);
    }

    pub fn signature_pad_size(&self) -> SurfaceSize {
        self.lock_pad().size()
    }

    /// Runs one submission attempt. At most one attempt is in flight; a
    /// second call made while the first awaits the endpoint fails with
    /// [`SubmissionError::InFlight`] without touching the network.
    pub async fn submit(&self) -> Result<SubmissionReceipt, SubmissionError> {
        if let Err(FlowTransitionError::InvalidTransition { .. }) =
            self.transition(SubmissionEvent::Reset)
        {
            warn!(event_name = "submission.in_flight", "submit ignored while a request is pending");
            return Err(SubmissionError::InFlight);
        }

        let snapshot = self.form.get();
        if let Err(error) = snapshot.validate(&self.policy) {
            let message = error.user_message();
            warn!(
                event_name = "submission.validation_failed",
                reason = %error,
                "registration failed local validation"
            );
            let outcome = self.transition(SubmissionEvent::ValidationFailed { message: message.clone() });
            self.perform(outcome, &message);
            return Err(SubmissionError::Validation(error));
        }

        let outcome = self.transition(SubmissionEvent::Dispatched);
        self.perform(outcome, "");

        let payload = SubmissionPayload::assemble(&snapshot, Utc::now());
        let correlation_id = payload.correlation_id.clone();
        let mut pending = PendingGuard::new(&self.status, &self.flow, correlation_id.clone());
        info!(
            event_name = "submission.dispatched",
            correlation_id = %correlation_id,
            text_parts = payload.text_parts.len(),
            binary_parts = payload.binary_parts.len(),
            "registration sent"
        );

        let result = match tokio::time::timeout(self.request_timeout, self.endpoint.submit(&payload)).await {
            Ok(result) => result,
            Err(_) => Err(EndpointError::Timeout),
        };

        pending.disarm();
        match result {
            Ok(acknowledgement) => {
                let message = acknowledgement
                    .message
                    .filter(|message| !message.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_SUCCESS_MESSAGE.to_string());
                info!(
                    event_name = "submission.accepted",
                    correlation_id = %correlation_id,
                    "registration accepted"
                );
                let outcome = self.transition(SubmissionEvent::Accepted { message: message.clone() });
                self.perform(outcome, &message);
                Ok(SubmissionReceipt { correlation_id, submitted_at: payload.submitted_at, message })
            }
            Err(source) => {
                let error = SubmissionError::from_endpoint(source, correlation_id.clone());
                let message = error.user_message();
                warn!(
                    event_name = "submission.rejected",
                    correlation_id = %correlation_id,
                    error_class = error.error_class(),
                    error = %error,
                    "registration was not accepted"
                );
                let outcome = self.transition(SubmissionEvent::Rejected { message: message.clone() });
                self.perform(outcome, &message);
                Err(error)
            }
        }
    }

    fn transition(&self, event: SubmissionEvent) -> Result<TransitionOutcome, FlowTransitionError> {
        advance(&self.status, &self.flow, event)
    }

    fn perform(&self, outcome: Result<TransitionOutcome, FlowTransitionError>, message: &str) {
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(event_name = "submission.transition_rejected", error = %error);
                return;
            }
        };

        for action in outcome.actions {
            match action {
                SubmissionAction::ShowSuccessNotice => {
                    self.notifier.success(message);
                }
                SubmissionAction::ShowErrorNotice => {
                    self.notifier.error(message);
                }
                SubmissionAction::ResetForm => {
                    self.form.replace(FormState::default());
                }
                SubmissionAction::ClearSignaturePad => self.clear_signature(),
                // Reflected by the status store.
                SubmissionAction::DisableSubmit
                | SubmissionAction::EnableSubmit
                | SubmissionAction::SendPayload => {}
            }
        }
    }

    fn apply_pad_update(&self, update: PadUpdate) {
        match update {
            PadUpdate::Unchanged => {}
            PadUpdate::Committed(image) => self.form.update(|form| form.signature = Some(image)),
            PadUpdate::Invalidated => {
                let had_signature = self.form.read(|form| form.signature.is_some());
                if had_signature {
                    self.form.update(|form| form.signature = None);
                }
            }
        }
    }

    fn lock_pad(&self) -> MutexGuard<'_, SignaturePad> {
        match self.pad.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn advance(
    status: &Store<SubmissionStatus>,
    flow: &SubmissionFlow,
    event: SubmissionEvent,
) -> Result<TransitionOutcome, FlowTransitionError> {
    status.update(|status| {
        let outcome = flow.apply(status, &event)?;
        *status = outcome.to.clone();
        Ok(outcome)
    })
}

/// Held while a request is in flight. If the `submit` future is dropped
/// before the endpoint answers, the status leaves `Pending` so the form can
/// be submitted again.
struct PendingGuard<'a> {
    status: &'a Store<SubmissionStatus>,
    flow: &'a SubmissionFlow,
    correlation_id: String,
    armed: bool,
}

impl<'a> PendingGuard<'a> {
    fn new(
        status: &'a Store<SubmissionStatus>,
        flow: &'a SubmissionFlow,
        correlation_id: String,
    ) -> Self {
        Self { status, flow, correlation_id, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!(
            event_name = "submission.abandoned",
            correlation_id = %self.correlation_id,
            "submit dropped before the endpoint answered"
        );
        if let Err(error) = advance(self.status, self.flow, SubmissionEvent::Abandoned) {
            warn!(event_name = "submission.transition_rejected", error = %error);
        }
    }
}
