mod prompt;
pub mod schemas;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;
use tracing::debug;
use tg_core::{GenerationSettings, ImageArtifact, ImageModel};
use crate::generator::backend::schemas::{
    Content, ErrorEnvelope, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    ImageConfig, Part,
};
use crate::session::ApiKey;

pub use prompt::build_prompt;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("API Key is missing. Please provide the API Key.")]
    MissingApiKey,

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("No candidates returned from Gemini.")]
    NoCandidates,

    #[error("Model returned text instead of image: {0}")]
    TextInsteadOfImage(String),

    #[error("Unexpected response format: No image data found.")]
    NoImageData,

    #[error("Invalid image payload: {0}")]
    InvalidPayload(String),
}

/// The remote image-generation call. One invocation, one image or one error.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    async fn generate(
        &self,
        settings: &GenerationSettings,
        api_key: Option<&ApiKey>,
    ) -> Result<ImageArtifact, BackendError>;
}

/// Gemini `generateContent` over REST.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: reqwest::Client,
    api_base: String,
}

impl GeminiBackend {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn build_request(settings: &GenerationSettings) -> GenerateContentRequest {
        let mut parts = vec![Part::text(build_prompt(settings))];
        parts.extend(
            settings.references
                .iter()
                .map(|image| Part::inline(&image.mime_type, image.base64_data())),
        );
        parts.extend(
            settings.actors
                .iter()
                .map(|actor| Part::inline(&actor.image.mime_type, actor.image.base64_data())),
        );

        let image_size = ImageModel::from_id(model_id(settings))
            .is_some_and(|model| model.supports_image_size())
            .then(|| settings.image_resolution.as_str().to_string());

        GenerateContentRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                response_modalities: vec!["TEXT".into(), "IMAGE".into()],
                image_config: ImageConfig {
                    aspect_ratio: settings.aspect_ratio.as_str().to_string(),
                    image_size,
                },
            },
        }
    }

    pub fn parse_response(response: GenerateContentResponse) -> Result<ImageArtifact, BackendError> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or(BackendError::NoCandidates)?;
        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();

        if let Some(inline) = parts.iter().find_map(|p| p.inline_data.as_ref()) {
            let data = STANDARD
                .decode(&inline.data)
                .map_err(|e| BackendError::InvalidPayload(e.to_string()))?;
            return Ok(ImageArtifact::new(inline.mime_type.clone(), data));
        }

        if let Some(text) = parts.iter().find_map(|p| p.text.as_ref()) {
            return Err(BackendError::TextInsteadOfImage(text.clone()));
        }

        Err(BackendError::NoImageData)
    }
}

#[async_trait]
impl ImageBackend for GeminiBackend {
    async fn generate(
        &self,
        settings: &GenerationSettings,
        api_key: Option<&ApiKey>,
    ) -> Result<ImageArtifact, BackendError> {
        let api_key = api_key.ok_or(BackendError::MissingApiKey)?;
        let model = model_id(settings);
        let url = format!("{}/models/{}:generateContent", self.api_base, model);

        debug!(model, "Requesting image");

        let response = self.client
            .post(url)
            .header("x-goog-api-key", api_key.expose())
            .json(&Self::build_request(settings))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or(body);
            return Err(BackendError::Http {
                status: status.as_u16(),
                message,
            });
        }

        Self::parse_response(response.json().await?)
    }
}

fn model_id(settings: &GenerationSettings) -> &str {
    let id = settings.model_id.trim();
    if id.is_empty() {
        ImageModel::default().id()
    } else {
        id
    }
}
