use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::attachment::Attachment;
use crate::domain::signature::SignatureImage;
use crate::errors::{FieldError, ValidationError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountryCode {
    #[default]
    Uae,
    India,
    Usa,
    Uk,
    Australia,
}

impl CountryCode {
    pub const ALL: [CountryCode; 5] =
        [CountryCode::Uae, CountryCode::India, CountryCode::Usa, CountryCode::Uk, CountryCode::Australia];

    pub fn dial_code(self) -> &'static str {
        match self {
            Self::Uae => "+971",
            Self::India => "+91",
            Self::Usa => "+1",
            Self::Uk => "+44",
            Self::Australia => "+61",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Uae => "UAE",
            Self::India => "India",
            Self::Usa => "USA",
            Self::Uk => "UK",
            Self::Australia => "Australia",
        }
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.dial_code(), self.label())
    }
}

impl FromStr for CountryCode {
    type Err = FieldError;

    /// Accepts either the dial code (`+971`) or the label (`uae`, any case).
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|code| code.dial_code() == value || code.label().eq_ignore_ascii_case(value))
            .ok_or_else(|| FieldError::UnknownCountryCode(value.to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldName {
    FullName,
    Email,
    ContactCountryCode,
    ContactNo,
    WhatsappCountryCode,
    WhatsappNo,
    CountryOfResidence,
    CurrentCompanyName,
    ProfessionalRole,
    LanguagesSpoken,
    YearsOfExperience,
    ReferralEmployeeName,
    AgreeToTerms,
    ConfirmAccuracy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    CountryCode,
    Checkbox,
}

impl FieldName {
    pub const ALL: [FieldName; 14] = [
        FieldName::FullName,
        FieldName::Email,
        FieldName::ContactCountryCode,
        FieldName::ContactNo,
        FieldName::WhatsappCountryCode,
        FieldName::WhatsappNo,
        FieldName::CountryOfResidence,
        FieldName::CurrentCompanyName,
        FieldName::ProfessionalRole,
        FieldName::LanguagesSpoken,
        FieldName::YearsOfExperience,
        FieldName::ReferralEmployeeName,
        FieldName::AgreeToTerms,
        FieldName::ConfirmAccuracy,
    ];

    pub const REQUIRED_TEXT: [FieldName; 8] = [
        FieldName::FullName,
        FieldName::Email,
        FieldName::ContactNo,
        FieldName::CountryOfResidence,
        FieldName::CurrentCompanyName,
        FieldName::ProfessionalRole,
        FieldName::LanguagesSpoken,
        FieldName::YearsOfExperience,
    ];

    /// Name used by form inputs and applicant files.
    pub fn input_name(self) -> &'static str {
        match self {
            Self::FullName => "fullName",
            Self::Email => "email",
            Self::ContactCountryCode => "contactCountryCode",
            Self::ContactNo => "contactNo",
            Self::WhatsappCountryCode => "whatsappCountryCode",
            Self::WhatsappNo => "whatsappNo",
            Self::CountryOfResidence => "countryOfResidence",
            Self::CurrentCompanyName => "currentCompanyName",
            Self::ProfessionalRole => "professionalRole",
            Self::LanguagesSpoken => "languagesSpoken",
            Self::YearsOfExperience => "yearsOfExperience",
            Self::ReferralEmployeeName => "referralEmployeeName",
            Self::AgreeToTerms => "agreeToTerms",
            Self::ConfirmAccuracy => "confirmAccuracy",
        }
    }

    /// Name of the multipart part carrying this field. Consent flags are
    /// sent under shorter names than their inputs.
    pub fn part_name(self) -> &'static str {
        match self {
            Self::AgreeToTerms => "agreed",
            Self::ConfirmAccuracy => "confirmedAccuracy",
            other => other.input_name(),
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Self::ContactCountryCode | Self::WhatsappCountryCode => FieldKind::CountryCode,
            Self::AgreeToTerms | Self::ConfirmAccuracy => FieldKind::Checkbox,
            _ => FieldKind::Text,
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.input_name())
    }
}

impl FromStr for FieldName {
    type Err = FieldError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.input_name() == value || field.part_name() == value)
            .ok_or_else(|| FieldError::UnknownField(value.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Checked(bool),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Checked(value)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormState {
    pub full_name: String,
    pub email: String,
    pub contact_country_code: CountryCode,
    pub contact_no: String,
    pub whatsapp_country_code: CountryCode,
    pub whatsapp_no: String,
    pub country_of_residence: String,
    pub current_company_name: String,
    pub professional_role: String,
    pub languages_spoken: String,
    pub years_of_experience: String,
    pub referral_employee_name: String,
    pub signature: Option<SignatureImage>,
    pub attachment: Option<Attachment>,
    pub agree_to_terms: bool,
    pub confirm_accuracy: bool,
}

/// Which checks `FormState::validate` enforces beyond required text fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormPolicy {
    pub require_consent: bool,
    pub require_signature: bool,
    pub enforce_attachment_type: bool,
    pub max_attachment_bytes: Option<u64>,
}

impl Default for FormPolicy {
    fn default() -> Self {
        Self {
            require_consent: true,
            require_signature: true,
            enforce_attachment_type: true,
            max_attachment_bytes: None,
        }
    }
}

impl FormState {
    pub fn apply(&mut self, name: FieldName, value: FieldValue) -> Result<(), FieldError> {
        match (name.kind(), value) {
            (FieldKind::Text, FieldValue::Text(text)) => {
                if let Some(slot) = self.text_field_mut(name) {
                    *slot = text;
                }
                Ok(())
            }
            (FieldKind::CountryCode, FieldValue::Text(text)) => {
                let code = text.parse::<CountryCode>()?;
                if name == FieldName::ContactCountryCode {
                    self.contact_country_code = code;
                } else {
                    self.whatsapp_country_code = code;
                }
                Ok(())
            }
            (FieldKind::Checkbox, FieldValue::Checked(checked)) => {
                if name == FieldName::AgreeToTerms {
                    self.agree_to_terms = checked;
                } else {
                    self.confirm_accuracy = checked;
                }
                Ok(())
            }
            (kind, _) => Err(FieldError::KindMismatch { field: name, expected: kind }),
        }
    }

    /// Current value of a field as it is sent over the wire.
    pub fn value_of(&self, name: FieldName) -> String {
        match name {
            FieldName::ContactCountryCode => self.contact_country_code.dial_code().to_string(),
            FieldName::WhatsappCountryCode => self.whatsapp_country_code.dial_code().to_string(),
            FieldName::AgreeToTerms => self.agree_to_terms.to_string(),
            FieldName::ConfirmAccuracy => self.confirm_accuracy.to_string(),
            text => self.text_field(text).to_string(),
        }
    }

    pub fn missing_required_fields(&self) -> Vec<FieldName> {
        FieldName::REQUIRED_TEXT
            .into_iter()
            .filter(|field| self.text_field(*field).trim().is_empty())
            .collect()
    }

    pub fn validate(&self, policy: &FormPolicy) -> Result<(), ValidationError> {
        let missing = self.missing_required_fields();
        if !missing.is_empty() {
            return Err(ValidationError::MissingRequiredFields { fields: missing });
        }

        if policy.require_consent {
            let mut missing_consent = Vec::new();
            if !self.confirm_accuracy {
                missing_consent.push(FieldName::ConfirmAccuracy);
            }
            if !self.agree_to_terms {
                missing_consent.push(FieldName::AgreeToTerms);
            }
            if !missing_consent.is_empty() {
                return Err(ValidationError::ConsentNotGiven { fields: missing_consent });
            }
        }

        if policy.require_signature && self.signature.is_none() {
            return Err(ValidationError::SignatureMissing);
        }

        if let Some(attachment) = &self.attachment {
            if policy.enforce_attachment_type && !attachment.is_accepted_media_type() {
                return Err(ValidationError::UnsupportedAttachmentType {
                    file_name: attachment.file_name.clone(),
                    media_type: attachment.media_type.clone(),
                });
            }
            if let Some(limit) = policy.max_attachment_bytes {
                let size = attachment.size();
                if size > limit {
                    return Err(ValidationError::AttachmentTooLarge { size, limit });
                }
            }
        }

        Ok(())
    }

    fn text_field(&self, name: FieldName) -> &str {
        match name {
            FieldName::FullName => &self.full_name,
            FieldName::Email => &self.email,
            FieldName::ContactNo => &self.contact_no,
            FieldName::WhatsappNo => &self.whatsapp_no,
            FieldName::CountryOfResidence => &self.country_of_residence,
            FieldName::CurrentCompanyName => &self.current_company_name,
            FieldName::ProfessionalRole => &self.professional_role,
            FieldName::LanguagesSpoken => &self.languages_spoken,
            FieldName::YearsOfExperience => &self.years_of_experience,
            FieldName::ReferralEmployeeName => &self.referral_employee_name,
            FieldName::ContactCountryCode
            | FieldName::WhatsappCountryCode
            | FieldName::AgreeToTerms
            | FieldName::ConfirmAccuracy => "",
        }
    }

    fn text_field_mut(&mut self, name: FieldName) -> Option<&mut String> {
        let slot = match name {
            FieldName::FullName => &mut self.full_name,
            FieldName::Email => &mut self.email,
            FieldName::ContactNo => &mut self.contact_no,
            FieldName::WhatsappNo => &mut self.whatsapp_no,
            FieldName::CountryOfResidence => &mut self.country_of_residence,
            FieldName::CurrentCompanyName => &mut self.current_company_name,
            FieldName::ProfessionalRole => &mut self.professional_role,
            FieldName::LanguagesSpoken => &mut self.languages_spoken,
            FieldName::YearsOfExperience => &mut self.years_of_experience,
            FieldName::ReferralEmployeeName => &mut self.referral_employee_name,
            FieldName::ContactCountryCode
            | FieldName::WhatsappCountryCode
            | FieldName::AgreeToTerms
            | FieldName::ConfirmAccuracy => return None,
        };
        Some(slot)
    }
}
