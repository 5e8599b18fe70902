//! HTTP implementation of [`SubmissionEndpoint`].
//!
//! The payload is sent as one `multipart/form-data` POST. The backend answers
//! with an optional JSON object; `ok: false` or a non-2xx status is an
//! application-level rejection, anything that prevents reading an answer is a
//! transport fault.

use std::time::Duration;

use async_trait::async_trait;
use referral_core::config::EndpointConfig;
use referral_core::domain::payload::SubmissionPayload;
use referral_core::endpoint::{Acknowledgement, SubmissionEndpoint};
use referral_core::errors::EndpointError;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid submission url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("could not build http client: {0}")]
    Build(#[from] reqwest::Error),
}

#[derive(Clone, Debug)]
pub struct HttpSubmissionEndpoint {
    client: Client,
    url: Url,
}

impl HttpSubmissionEndpoint {
    pub fn from_config(config: &EndpointConfig) -> Result<Self, ClientError> {
        Self::new(&config.submit_url(), config.timeout())
    }

    pub fn new(url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let url = Url::parse(url)
            .map_err(|error| ClientError::InvalidUrl { url: url.to_string(), reason: error.to_string() })?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl SubmissionEndpoint for HttpSubmissionEndpoint {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<Acknowledgement, EndpointError> {
        let form = multipart_form(payload)?;

        let response = self
            .client
            .post(self.url.clone())
            .header("X-Correlation-Id", payload.correlation_id.as_str())
            .multipart(form)
            .send()
            .await
            .map_err(|error| {
                warn!(
                    event_name = "http.submit_failed",
                    correlation_id = %payload.correlation_id,
                    error = %error,
                    "submission request failed"
                );
                transport_error(error)
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;
        debug!(
            event_name = "http.response_received",
            correlation_id = %payload.correlation_id,
            status = status.as_u16(),
            body_bytes = body.len(),
            "submission response received"
        );

        interpret_response(status, &body)
    }
}

fn multipart_form(payload: &SubmissionPayload) -> Result<Form, EndpointError> {
    let mut form = Form::new();
    for part in &payload.text_parts {
        form = form.text(part.name, part.value.clone());
    }
    for part in &payload.binary_parts {
        let file = Part::bytes(part.bytes.clone())
            .file_name(part.file_name.clone())
            .mime_str(&part.media_type)
            .map_err(|error| {
                EndpointError::Transport(format!("invalid media type for `{}`: {error}", part.name))
            })?;
        form = form.part(part.name, file);
    }
    Ok(form)
}

fn transport_error(error: reqwest::Error) -> EndpointError {
    if error.is_timeout() {
        EndpointError::Timeout
    } else {
        EndpointError::Transport(error.to_string())
    }
}

fn interpret_response(status: StatusCode, body: &[u8]) -> Result<Acknowledgement, EndpointError> {
    let text = String::from_utf8_lossy(body);
    let document = if text.trim().is_empty() {
        None
    } else {
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => Some(value),
            Err(error) if status.is_success() => {
                return Err(EndpointError::MalformedResponse(error.to_string()))
            }
            // Error pages are often HTML; the status alone decides.
            Err(_) => None,
        }
    };

    if !status.is_success() {
        return Err(EndpointError::Rejected {
            status: Some(status.as_u16()),
            message: document.as_ref().and_then(server_message),
        });
    }

    let Some(document) = document else {
        return Ok(Acknowledgement::default());
    };
    if !document.is_object() {
        return Err(EndpointError::MalformedResponse(format!(
            "expected a JSON object, got `{document}`"
        )));
    }

    if document.get("ok").and_then(Value::as_bool) == Some(false) {
        return Err(EndpointError::Rejected {
            status: Some(status.as_u16()),
            message: server_message(&document),
        });
    }

    Ok(Acknowledgement {
        message: document.get("message").and_then(Value::as_str).map(str::to_string),
    })
}

fn server_message(document: &Value) -> Option<String> {
    ["error", "message"]
        .into_iter()
        .filter_map(|key| document.get(key).and_then(Value::as_str))
        .map(str::trim)
        .find(|message| !message.is_empty())
        .map(str::to_string)
}
