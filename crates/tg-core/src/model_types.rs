/// Image models the remote service can be asked to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageModel {
    #[default]
    FlashImage,
    ProImage,
}

impl ImageModel {
    /// Model name for display in UI
    pub fn name(&self) -> &'static str {
        match self {
            Self::FlashImage => "Gemini 2.5 Flash Image (Fast)",
            Self::ProImage => "Gemini 3 Pro Image (High Quality)",
        }
    }

    /// Model ID for API communication
    pub fn id(&self) -> &'static str {
        match self {
            Self::FlashImage => "gemini-2.5-flash-image",
            Self::ProImage => "gemini-3-pro-image-preview",
        }
    }

    /// Only the pro model accepts an explicit output size
    pub fn supports_image_size(&self) -> bool {
        matches!(self, Self::ProImage)
    }

    /// Resolve a model id, returning `None` for ids we don't know about
    pub fn from_id(id: &str) -> Option<Self> {
        Self::all().into_iter().find(|m| m.id() == id)
    }

    /// All available models
    pub fn all() -> [ImageModel; 2] {
        [Self::FlashImage, Self::ProImage]
    }
}

pub const STYLE_PRESETS: [&str; 6] = [
    "Mr. Beast Style (High Saturation, Shocked, Big Text)",
    "Vlogger Reaction (Close-up, Blur Background, Emoji)",
    "Gaming Cinematic (Dark, Neon, Action-Oriented)",
    "Minimalist Aesthetic (Clean, Pastel, Typography-Focus)",
    "Tech Review (Sharp, Clean Lighting, Product Focus)",
    "Horror/Mystery (Dark, Grainy, Vignette)",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_ids() {
        assert_eq!(ImageModel::FlashImage.id(), "gemini-2.5-flash-image");
        assert_eq!(ImageModel::ProImage.id(), "gemini-3-pro-image-preview");
    }

    #[test]
    fn test_from_id() {
        assert_eq!(ImageModel::from_id("gemini-3-pro-image-preview"), Some(ImageModel::ProImage));
        assert_eq!(ImageModel::from_id("dall-e"), None);
    }

    #[test]
    fn test_image_size_support() {
        assert!(!ImageModel::FlashImage.supports_image_size());
        assert!(ImageModel::ProImage.supports_image_size());
    }

    #[test]
    fn test_all_models() {
        assert_eq!(ImageModel::all().len(), 2);
        assert_eq!(ImageModel::default().name(), "Gemini 2.5 Flash Image (Fast)");
    }
}
