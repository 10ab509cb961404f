use std::fmt::Write as _;
use tg_core::GenerationSettings;

/// Compose the text instructions sent ahead of the input images.
pub fn build_prompt(settings: &GenerationSettings) -> String {
    let mut prompt = format!(
        "Role: Expert YouTube Thumbnail Designer.
Task: Create a high-engagement composite thumbnail based on the following specifications.

COMPOSITION DETAILS:
- Aspect Ratio: {aspect}
- Style: {style}
- Main Scene Description: {scene}
- Background Environment: {background}

TEXT OVERLAY:
- Text content: \"{headline}\"
- Text Style: Render this text explicitly in the image. Use a bold, high-contrast font with a thick outline and shadow to ensure readability on small screens. Place it strategically (usually top or center) to not obscure faces.

ACTOR/SUBJECT INSTRUCTIONS:
",
        aspect = settings.aspect_ratio.as_str(),
        style = settings.style_preset,
        scene = settings.main_prompt,
        background = settings.background_prompt,
        headline = settings.headline_text,
    );

    if settings.actors.is_empty() {
        prompt.push_str(
            "\nNo specific actor images provided. Generate a suitable subject based on the main scene description.",
        );
    } else {
        let _ = write!(
            prompt,
            "\nI have provided {} image(s) of actors/subjects. You MUST:
1. Crop the subject from their original background.
2. Place them into the generated background scene seamlessly.
3. Apply the requested lighting to match the environment.
4. Adjust their expression if possible or emphasize the existing emotion.
",
            settings.actors.len()
        );
        for (index, actor) in settings.actors.iter().enumerate() {
            let _ = write!(
                prompt,
                "\n- Actor {}: Requested Emotion/Action: \"{}\". Place prominently in the composition.",
                index + 1,
                actor.emotion
            );
        }
    }

    if !settings.references.is_empty() {
        let _ = write!(
            prompt,
            "\n\nREFERENCE MATERIAL:
I have provided {} reference image(s). Use them for inspiration regarding color palette, lighting, and composition layout.",
            settings.references.len()
        );
    }

    prompt
}
