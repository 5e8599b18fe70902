use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;

pub const SIGNATURE_MEDIA_TYPE: &str = "image/png";
pub const SIGNATURE_FILE_NAME: &str = "signature.png";

/// A committed, PNG-encoded drawing of the applicant's signature.
#[derive(Clone, PartialEq, Eq)]
pub struct SignatureImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Debug for SignatureImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("encoded_bytes", &self.png.len())
            .finish()
    }
}

impl SignatureImage {
    pub fn to_data_url(&self) -> String {
        format!("data:{SIGNATURE_MEDIA_TYPE};base64,{}", B64.encode(&self.png))
    }
}
