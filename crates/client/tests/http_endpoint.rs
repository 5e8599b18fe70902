use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use referral_client::HttpSubmissionEndpoint;
use referral_core::config::AppConfig;
use referral_core::controller::SubmissionController;
use referral_core::domain::attachment::Attachment;
use referral_core::domain::form::{FieldName, FormState};
use referral_core::domain::payload::SubmissionPayload;
use referral_core::domain::signature::SignatureImage;
use referral_core::endpoint::{Acknowledgement, SubmissionEndpoint};
use referral_core::errors::{EndpointError, SubmissionError};
use referral_core::signature::{Point, PointerEvent, PointerId};
use serde_json::json;
use tokio::net::TcpListener;

#[derive(Clone, Debug)]
struct CapturedField {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

type Captured = Arc<Mutex<Vec<CapturedField>>>;

async fn collect(mut multipart: Multipart) -> Result<Vec<CapturedField>, StatusCode> {
    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(|_| StatusCode::BAD_REQUEST)? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?.to_vec();
        fields.push(CapturedField { name, file_name, content_type, bytes });
    }
    Ok(fields)
}

async fn accept(State(captured): State<Captured>, multipart: Multipart) -> Response {
    match collect(multipart).await {
        Ok(fields) => {
            captured.lock().expect("lock").extend(fields);
            Json(json!({ "ok": true, "message": "Registration received" })).into_response()
        }
        Err(status) => status.into_response(),
    }
}

async fn empty(multipart: Multipart) -> StatusCode {
    let _ = collect(multipart).await;
    StatusCode::OK
}

async fn ok_false(multipart: Multipart) -> Json<serde_json::Value> {
    let _ = collect(multipart).await;
    Json(json!({ "ok": false, "error": "Referral code expired" }))
}

async fn conflict(multipart: Multipart) -> (StatusCode, Json<serde_json::Value>) {
    let _ = collect(multipart).await;
    (StatusCode::CONFLICT, Json(json!({ "error": "Email already registered" })))
}

async fn html(multipart: Multipart) -> &'static str {
    let _ = collect(multipart).await;
    "<html>thanks</html>"
}

async fn slow(multipart: Multipart) -> StatusCode {
    let _ = collect(multipart).await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    StatusCode::OK
}

async fn spawn_server() -> (SocketAddr, Captured) {
    let captured = Captured::default();
    let app = Router::new()
        .route("/add", post(accept))
        .route("/empty", post(empty))
        .route("/ok-false", post(ok_false))
        .route("/conflict", post(conflict))
        .route("/html", post(html))
        .route("/slow", post(slow))
        .with_state(captured.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, captured)
}

fn endpoint(addr: SocketAddr, path: &str, timeout: Duration) -> HttpSubmissionEndpoint {
    HttpSubmissionEndpoint::new(&format!("http://{addr}{path}"), timeout).expect("endpoint")
}

fn payload() -> SubmissionPayload {
    let mut form = FormState::default();
    form.full_name = "Amira Haddad".to_string();
    form.email = "amira@example.com".to_string();
    form.agree_to_terms = true;
    form.signature = Some(SignatureImage { png: vec![0x89, b'P', b'N', b'G'], width: 4, height: 2 });
    form.attachment = Some(Attachment::new("license.pdf", b"%PDF-1.7".to_vec()));
    SubmissionPayload::assemble_with_id(&form, Utc::now(), "test-correlation")
}

#[tokio::test]
async fn multipart_body_carries_text_and_file_parts() {
    let (addr, captured) = spawn_server().await;

    let acknowledgement = endpoint(addr, "/add", Duration::from_secs(5))
        .submit(&payload())
        .await
        .expect("submission should be acknowledged");

    assert_eq!(acknowledgement.message.as_deref(), Some("Registration received"));
    let fields = captured.lock().expect("lock").clone();
    let field = |name: &str| fields.iter().find(|field| field.name == name).cloned();

    assert_eq!(field("fullName").map(|f| f.bytes), Some(b"Amira Haddad".to_vec()));
    assert_eq!(field("agreed").map(|f| f.bytes), Some(b"true".to_vec()));
    assert_eq!(field("confirmedAccuracy").map(|f| f.bytes), Some(b"false".to_vec()));
    assert_eq!(field("contactCountryCode").map(|f| f.bytes), Some(b"+971".to_vec()));
    assert!(field("submittedAt").is_some());

    let signature = field("signature").expect("signature part");
    assert_eq!(signature.file_name.as_deref(), Some("signature.png"));
    assert_eq!(signature.content_type.as_deref(), Some("image/png"));
    assert_eq!(signature.bytes, vec![0x89, b'P', b'N', b'G']);

    let attachment = field("attachment").expect("attachment part");
    assert_eq!(attachment.file_name.as_deref(), Some("license.pdf"));
    assert_eq!(attachment.content_type.as_deref(), Some("application/pdf"));
}

#[tokio::test]
async fn empty_success_body_is_acknowledged() {
    let (addr, _) = spawn_server().await;
    let result = endpoint(addr, "/empty", Duration::from_secs(5)).submit(&payload()).await;
    assert_eq!(result, Ok(Acknowledgement::default()));
}

#[tokio::test]
async fn ok_false_body_is_rejected_with_server_message() {
    let (addr, _) = spawn_server().await;
    let result = endpoint(addr, "/ok-false", Duration::from_secs(5)).submit(&payload()).await;
    assert_eq!(
        result,
        Err(EndpointError::Rejected {
            status: Some(200),
            message: Some("Referral code expired".to_string()),
        })
    );
}

#[tokio::test]
async fn error_status_is_rejected_with_server_message() {
    let (addr, _) = spawn_server().await;
    let result = endpoint(addr, "/conflict", Duration::from_secs(5)).submit(&payload()).await;
    assert_eq!(
        result,
        Err(EndpointError::Rejected {
            status: Some(409),
            message: Some("Email already registered".to_string()),
        })
    );
}

#[tokio::test]
async fn non_json_success_body_is_malformed() {
    let (addr, _) = spawn_server().await;
    let result = endpoint(addr, "/html", Duration::from_secs(5)).submit(&payload()).await;
    assert!(matches!(result, Err(EndpointError::MalformedResponse(_))));
}

#[tokio::test]
async fn slow_server_hits_client_timeout() {
    let (addr, _) = spawn_server().await;
    let result = endpoint(addr, "/slow", Duration::from_secs(1)).submit(&payload()).await;
    assert_eq!(result, Err(EndpointError::Timeout));
}

#[tokio::test]
async fn unreachable_server_is_a_transport_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("address");
    drop(listener);

    let result = endpoint(addr, "/add", Duration::from_secs(2)).submit(&payload()).await;
    assert!(matches!(result, Err(EndpointError::Transport(_))));
}

#[tokio::test]
async fn controller_submits_through_http_and_resets_on_success() {
    let (addr, captured) = spawn_server().await;
    let mut config = AppConfig::default();
    config.endpoint.base_url = format!("http://{addr}");
    let endpoint = HttpSubmissionEndpoint::from_config(&config.endpoint).expect("endpoint");
    let controller = SubmissionController::new(endpoint, &config);

    for (field, value) in [
        (FieldName::FullName, "Omar Saleh"),
        (FieldName::Email, "omar@example.com"),
        (FieldName::ContactNo, "55 000 1111"),
        (FieldName::CountryOfResidence, "India"),
        (FieldName::CurrentCompanyName, "Skyline Homes"),
        (FieldName::ProfessionalRole, "Agent"),
        (FieldName::LanguagesSpoken, "Hindi, English"),
        (FieldName::YearsOfExperience, "3"),
    ] {
        controller.update_field(field, value).expect("field update");
    }
    controller.update_field(FieldName::AgreeToTerms, true).expect("field update");
    controller.update_field(FieldName::ConfirmAccuracy, true).expect("field update");
    let pointer = PointerId(1);
    controller.pointer(PointerEvent::Down { pointer, at: Point::new(10.0, 10.0) });
    controller.pointer(PointerEvent::Move { pointer, at: Point::new(90.0, 60.0) });
    controller.pointer(PointerEvent::Up { pointer });

    let receipt = controller.submit().await.expect("submission should succeed");

    assert_eq!(receipt.message, "Registration received");
    assert_eq!(controller.form(), FormState::default());
    let fields = captured.lock().expect("lock").clone();
    assert!(fields.iter().any(|field| field.name == "fullName" && field.bytes == b"Omar Saleh"));
    let signature = fields.iter().find(|field| field.name == "signature").expect("signature");
    assert_eq!(&signature.bytes[..4], &[0x89, b'P', b'N', b'G']);
}

#[tokio::test]
async fn controller_maps_http_rejection_to_application_error() {
    let (addr, _) = spawn_server().await;
    let mut config = AppConfig::default();
    config.endpoint.base_url = format!("http://{addr}");
    config.endpoint.submit_path = "/conflict".to_string();
    config.form.require_signature = false;
    let endpoint = HttpSubmissionEndpoint::from_config(&config.endpoint).expect("endpoint");
    let controller = SubmissionController::new(endpoint, &config);

    for field in FieldName::REQUIRED_TEXT {
        controller.update_field(field, "filled").expect("field update");
    }
    controller.update_field(FieldName::AgreeToTerms, true).expect("field update");
    controller.update_field(FieldName::ConfirmAccuracy, true).expect("field update");
    let before = controller.form();

    let error = controller.submit().await.expect_err("rejection expected");

    assert!(matches!(error, SubmissionError::Application { .. }));
    assert_eq!(error.user_message(), "Email already registered");
    assert_eq!(controller.form(), before);
}
