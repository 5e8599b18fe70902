pub mod config;
pub mod controller;
pub mod domain;
pub mod endpoint;
pub mod errors;
pub mod flows;
pub mod notification;
pub mod signature;
pub mod store;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use controller::{SubmissionController, SubmissionReceipt, DEFAULT_SUCCESS_MESSAGE};
pub use domain::attachment::Attachment;
pub use domain::form::{CountryCode, FieldName, FieldValue, FormPolicy, FormState};
pub use domain::payload::{BinaryPart, SubmissionPayload, TextPart};
pub use domain::signature::SignatureImage;
pub use endpoint::{Acknowledgement, RecordingEndpoint, SubmissionEndpoint};
pub use errors::{EndpointError, FieldError, SubmissionError, ValidationError};
pub use flows::{SubmissionFlow, SubmissionStatus};
pub use notification::{Notification, NotificationKind, Notifier};
pub use signature::{PadUpdate, Point, PointerEvent, PointerId, SignaturePad, SignatureScript, SurfaceSize};
pub use store::{Store, SubscriptionId};
