use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::form::{FieldName, FormState};
use crate::domain::signature::{SIGNATURE_FILE_NAME, SIGNATURE_MEDIA_TYPE};

pub const SUBMITTED_AT_PART: &str = "submittedAt";
pub const SIGNATURE_PART: &str = "signature";
pub const SIGNATURE_DATA_URL_PART: &str = "signatureDataUrl";
pub const ATTACHMENT_PART: &str = "attachment";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TextPart {
    pub name: &'static str,
    pub value: String,
}

#[derive(Clone, PartialEq, Eq)]
pub struct BinaryPart {
    pub name: &'static str,
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for BinaryPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryPart")
            .field("name", &self.name)
            .field("file_name", &self.file_name)
            .field("media_type", &self.media_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// Everything sent to the submission endpoint for one attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionPayload {
    pub correlation_id: String,
    pub submitted_at: DateTime<Utc>,
    pub text_parts: Vec<TextPart>,
    pub binary_parts: Vec<BinaryPart>,
}

impl SubmissionPayload {
    pub fn assemble(form: &FormState, submitted_at: DateTime<Utc>) -> Self {
        Self::assemble_with_id(form, submitted_at, Uuid::new_v4().to_string())
    }

    pub fn assemble_with_id(
        form: &FormState,
        submitted_at: DateTime<Utc>,
        correlation_id: impl Into<String>,
    ) -> Self {
        let mut text_parts: Vec<TextPart> = FieldName::ALL
            .into_iter()
            .map(|field| TextPart { name: field.part_name(), value: form.value_of(field) })
            .collect();
        text_parts.push(TextPart {
            name: SUBMITTED_AT_PART,
            value: submitted_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        });

        let mut binary_parts = Vec::new();
        if let Some(signature) = &form.signature {
            text_parts
                .push(TextPart { name: SIGNATURE_DATA_URL_PART, value: signature.to_data_url() });
            binary_parts.push(BinaryPart {
                name: SIGNATURE_PART,
                file_name: SIGNATURE_FILE_NAME.to_string(),
                media_type: SIGNATURE_MEDIA_TYPE.to_string(),
                bytes: signature.png.clone(),
            });
        }
        if let Some(attachment) = &form.attachment {
            binary_parts.push(BinaryPart {
                name: ATTACHMENT_PART,
                file_name: attachment.file_name.clone(),
                media_type: attachment.media_type.clone(),
                bytes: attachment.bytes.clone(),
            });
        }

        Self { correlation_id: correlation_id.into(), submitted_at, text_parts, binary_parts }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.text_parts.iter().find(|part| part.name == name).map(|part| part.value.as_str())
    }

    pub fn binary(&self, name: &str) -> Option<&BinaryPart> {
        self.binary_parts.iter().find(|part| part.name == name)
    }
}
