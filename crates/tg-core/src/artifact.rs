use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use crate::error::{CoreError, Result};

/// Raw image bytes returned by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageArtifact {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ImageArtifact {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Embeddable `data:<mime>;base64,<payload>` reference
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data))
    }

    pub fn from_data_url(url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| CoreError::InvalidDataUrl("missing data: scheme".into()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| CoreError::InvalidDataUrl("missing payload separator".into()))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| CoreError::InvalidDataUrl("only base64 payloads are supported".into()))?;

        let data = STANDARD
            .decode(payload)
            .map_err(|e| CoreError::InvalidDataUrl(e.to_string()))?;

        Ok(Self::new(mime_type, data))
    }

    /// File extension matching the MIME type
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "bin",
        }
    }
}
