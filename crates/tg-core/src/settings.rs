use serde::{Deserialize, Serialize};
use crate::error::{CoreError, Result};
use crate::model_types::{ImageModel, STYLE_PRESETS};

pub const MAX_ACTORS: usize = 5;
pub const MAX_REFERENCES: usize = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ImageResolution {
    #[default]
    #[serde(rename = "1K")]
    OneK,
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
}

impl ImageResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneK => "1K",
            Self::TwoK => "2K",
            Self::FourK => "4K",
        }
    }
}

/// An uploaded image passed to the model alongside the prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InputImage {
    pub mime_type: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl InputImage {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn base64_data(&self) -> String {
        use base64::Engine as _;
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }
}

/// A subject photo plus the emotion/action the model should give it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub image: InputImage,
    #[serde(default)]
    pub emotion: String,
}

/// Everything the generation form produces. A job keeps its own copy of this,
/// so edits made after submission never reach jobs already created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    pub model_id: String,
    pub main_prompt: String,
    pub background_prompt: String,
    pub headline_text: String,
    pub aspect_ratio: AspectRatio,
    pub style_preset: String,
    #[serde(default)]
    pub actors: Vec<Actor>,
    #[serde(default)]
    pub references: Vec<InputImage>,
    #[serde(default)]
    pub logo: Option<InputImage>,
    pub image_resolution: ImageResolution,
    pub generation_count: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model_id: ImageModel::default().id().to_string(),
            main_prompt: String::new(),
            background_prompt: String::new(),
            headline_text: String::new(),
            aspect_ratio: AspectRatio::default(),
            style_preset: STYLE_PRESETS[0].to_string(),
            actors: Vec::new(),
            references: Vec::new(),
            logo: None,
            image_resolution: ImageResolution::default(),
            generation_count: 1,
        }
    }
}

impl GenerationSettings {
    /// The known model for `model_id`, if any. Unknown ids are still sent as-is.
    pub fn model(&self) -> Option<ImageModel> {
        ImageModel::from_id(&self.model_id)
    }

    pub fn validate(&self) -> Result<()> {
        if self.actors.len() > MAX_ACTORS {
            return Err(CoreError::InvalidSettings(format!(
                "at most {MAX_ACTORS} actors are allowed, got {}",
                self.actors.len()
            )));
        }
        if self.references.len() > MAX_REFERENCES {
            return Err(CoreError::InvalidSettings(format!(
                "at most {MAX_REFERENCES} reference images are allowed, got {}",
                self.references.len()
            )));
        }

        let images = self.actors.iter().map(|a| &a.image)
            .chain(self.references.iter())
            .chain(self.logo.iter());
        for image in images {
            if !image.mime_type.starts_with("image/") {
                return Err(CoreError::InvalidSettings(format!(
                    "unsupported input type '{}'",
                    image.mime_type
                )));
            }
        }

        Ok(())
    }
}

mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(bytes: &[u8]) -> InputImage {
        InputImage::new("image/png", bytes.to_vec())
    }

    #[test]
    fn test_defaults() {
        let settings = GenerationSettings::default();
        assert_eq!(settings.model(), Some(ImageModel::FlashImage));
        assert_eq!(settings.aspect_ratio.as_str(), "16:9");
        assert_eq!(settings.image_resolution.as_str(), "1K");
        assert_eq!(settings.generation_count, 1);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_too_many_actors_rejected() {
        let settings = GenerationSettings {
            actors: (0..6).map(|_| Actor { image: png(b"a"), emotion: "shocked".into() }).collect(),
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(CoreError::InvalidSettings(_))));
    }

    #[test]
    fn test_too_many_references_rejected() {
        let settings = GenerationSettings {
            references: (0..4).map(|_| png(b"r")).collect(),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_non_image_input_rejected() {
        let settings = GenerationSettings {
            logo: Some(InputImage::new("application/pdf", vec![1, 2, 3])),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_images_serialize_as_base64() {
        let image = png(&[0xde, 0xad, 0xbe, 0xef]);
        let json = serde_json::to_value(&image).unwrap();
        assert_eq!(json["mimeType"], "image/png");
        assert_eq!(json["data"], "3q2+7w==");
        assert_eq!(image.base64_data(), "3q2+7w==");

        let back: InputImage = serde_json::from_value(json).unwrap();
        assert_eq!(back, image);
    }

    #[test]
    fn test_enum_wire_names() {
        let json = serde_json::to_value(GenerationSettings {
            aspect_ratio: AspectRatio::Portrait,
            image_resolution: ImageResolution::FourK,
            ..Default::default()
        }).unwrap();
        assert_eq!(json["aspectRatio"], "9:16");
        assert_eq!(json["imageResolution"], "4K");
    }
}
