//! Instruction texts sent with each generation call

use crate::types::{Classification, JewelryCategory, SubjectGender};

/// Retouch onto pure white, no watermarks
#[must_use]
pub fn treatment() -> &'static str {
    "TASK: Professional high-end jewelry retouching.
1. BACKGROUND: Remove the original background completely. Replace it with a PURE, SOLID WHITE background (#FFFFFF).
2. CLEANLINESS: Do NOT add any watermarks, text, logos, signatures, or borders. The image must be 100% clean.
3. JEWELRY ENHANCEMENT:
   - Enhance the metallic luster (Gold/Silver/Platinum) to a mirror-like finish.
   - Increase the brilliance and fire of all gemstones.
   - Ensure all edges are perfectly sharp and aliasing-free.
4. NATURAL SHADOW: Place a very subtle, soft contact shadow at the base of the item.
5. COMPOSITION: Center the item and fill the frame appropriately for a professional catalog.

OUTPUT: Return ONLY the processed image."
}

/// Category, material and target gender as strict JSON
#[must_use]
pub fn classification() -> &'static str {
    r#"TASK: Classify the jewelry item in the photo.
Answer with a single JSON object and nothing else:
{"category": "RING" | "EARRING" | "NECKLACE" | "BRACELET" | "PENDANT" | "OTHER",
 "material": short description of metal and stones,
 "gender": "FEMALE" | "MALE" | "UNISEX"}"#
}

fn model_for(gender: SubjectGender) -> &'static str {
    match gender {
        SubjectGender::Female => "an elegant female model",
        SubjectGender::Male => "a refined male model",
        SubjectGender::Unisex => "an elegant model",
    }
}

fn placement_for(category: JewelryCategory) -> &'static str {
    match category {
        JewelryCategory::Ring => "worn on the ring finger, hand posed gracefully near the face",
        JewelryCategory::Earring => "worn on the ear, hair swept back, three-quarter profile",
        JewelryCategory::Necklace => "worn around the neck, resting on the collarbone",
        JewelryCategory::Bracelet => "worn on the wrist, forearm relaxed in frame",
        JewelryCategory::Pendant => "hanging on a fine chain at the center of the chest",
        JewelryCategory::Other => "worn naturally and clearly visible",
    }
}

/// Campaign photo of the exact piece on a generated model
#[must_use]
pub fn editorial(classification: &Classification) -> String {
    let material = classification
        .material
        .as_deref()
        .map(|m| format!(" made of {m}"))
        .unwrap_or_default();
    format!(
        "TASK: EDITORIAL luxury campaign photo.
Show {model} wearing this exact {category}{material}, {placement}.
Keep the jewelry identical to the reference image: same shape, metal color and stones.
Soft studio lighting, shallow depth of field, neutral warm backdrop, magazine quality.
No text, no logos, no watermarks.
OUTPUT: Return ONLY the image.",
        model = model_for(classification.gender),
        category = classification.category,
        placement = placement_for(classification.category),
    )
}

/// Free-text refinement of the current edit
#[must_use]
pub fn refine(instruction: &str) -> String {
    format!(
        "TASK: Refine this jewelry photo.
Apply exactly this change: {}.
Keep the white background, framing and the jewelry design unchanged otherwise.
OUTPUT: Return ONLY the image.",
        instruction.trim()
    )
}

/// Text-to-image product design
#[must_use]
pub fn pro_design(description: &str) -> String {
    format!(
        "TASK: Create a photorealistic catalog photo of a new jewelry design.
Design: {}.
Pure solid white background (#FFFFFF), centered, soft contact shadow, studio lighting.
No text, no logos, no watermarks.
OUTPUT: Return ONLY the image.",
        description.trim()
    )
}

/// Person photo + jewelry photo -> person wearing the piece
#[must_use]
pub fn photo_try_on() -> &'static str {
    "Aplique a joia da imagem 2 no corpo da pessoa da imagem 1 de forma ultra-realista. \
Ajuste perspectiva, luz e sombras para parecer uma foto original. Resultado minimalista e elegante."
}

/// Short rotating product video
#[must_use]
pub fn video(classification: &Classification) -> String {
    format!(
        "Slow 360-degree turntable rotation of this {} on a pure white background. \
Studio lighting with sparkling highlights on metal and stones. Smooth camera, no text, no people.",
        classification.category
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editorial_mentions_category_material_and_model() {
        let c = Classification {
            category: JewelryCategory::Earring,
            material: Some("ouro 18k".to_string()),
            gender: SubjectGender::Male,
        };
        let prompt = editorial(&c);
        assert!(prompt.contains("EDITORIAL"));
        assert!(prompt.contains("earring made of ouro 18k"));
        assert!(prompt.contains("male model"));
    }

    #[test]
    fn test_refine_and_design_embed_user_text() {
        assert!(refine("  more shine ").contains("Apply exactly this change: more shine."));
        assert!(pro_design("art deco emerald ring").contains("art deco emerald ring"));
        assert!(treatment().contains("#FFFFFF"));
        assert!(classification().contains("\"category\""));
    }
}
