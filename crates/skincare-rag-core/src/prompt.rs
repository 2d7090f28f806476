//! Grounding-constrained prompt construction.
//!
//! The prompt has three parts: the retrieved context, the user profile
//! with every field rendered, and a fixed instruction block that pins the
//! model to the context and to an exact JSON output shape.

use crate::models::{ScoredChunk, UserProfile, NO_RELIABLE_INFORMATION};

/// Rendered in place of any absent optional profile field.
pub const NOT_SPECIFIED: &str = "Not specified";

const PREAMBLE: &str = "\
You are a professional skincare consultant with expertise in dermatology and cosmetic science.
Your role is to give evidence-based skincare recommendations based ONLY on the context below, \
taken from authoritative skincare and dermatology sources.";

const OUTPUT_SHAPE: &str = r#"{
    "morning_routine": ["step 1", "step 2", "step 3"],
    "evening_routine": ["step 1", "step 2", "step 3"],
    "lifestyle_tips": ["tip 1", "tip 2", "tip 3"],
    "remedies": ["remedy 1", "remedy 2", "remedy 3"],
    "warnings": ["warning 1 if applicable"]
}"#;

/// Build the full prompt for one request.
pub fn build_prompt(context: &[ScoredChunk], profile: &UserProfile) -> String {
    let context_text = context
        .iter()
        .map(|c| c.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut prompt = String::with_capacity(context_text.len() + 2048);
    prompt.push_str(PREAMBLE);
    prompt.push_str("\n\nRULES:\n");
    prompt.push_str("1. Base every recommendation ONLY on the provided context.\n");
    prompt.push_str(&format!(
        "2. For any category the context does not support, answer with exactly: \"{}\".\n",
        NO_RELIABLE_INFORMATION
    ));
    prompt.push_str(
        "3. Never give medical advice for severe conditions; recommend consulting a dermatologist.\n",
    );
    prompt.push_str("4. Prefer evidence-based recommendations over marketing claims.\n");
    prompt.push_str("5. Respect the user's allergies and sensitive ingredients.\n");

    prompt.push_str("\nCONTEXT FROM SKINCARE LITERATURE:\n");
    prompt.push_str(&context_text);
    prompt.push_str("\n\nUSER PROFILE:\n");
    prompt.push_str(&render_profile(profile));

    prompt.push_str("\nRespond in this exact JSON format:\n\n");
    prompt.push_str(OUTPUT_SHAPE);
    prompt.push_str(
        "\n\nReturn ONLY the JSON object. Do not write any text before or after it.\n",
    );
    prompt
}

fn render_profile(profile: &UserProfile) -> String {
    let concerns: Vec<&str> = profile.concerns.iter().map(|c| c.term()).collect();
    let fields: [(&str, String); 13] = [
        ("Skin Type", profile.skin_type.to_string()),
        ("Primary Concerns", or_not_specified(Some(concerns.join(", ")))),
        ("Allergies", or_not_specified(profile.allergies.clone())),
        (
            "Sensitive Ingredients",
            list_or_not_specified(profile.sensitive_ingredients.as_deref()),
        ),
        (
            "Prefers Natural Products",
            if profile.prefers_natural { "yes" } else { "no" }.to_string(),
        ),
        ("Budget", or_not_specified(profile.budget_range.clone())),
        (
            "Product Preferences",
            list_or_not_specified(profile.product_preferences.as_deref()),
        ),
        ("Sun Exposure", or_not_specified(profile.sun_exposure.clone())),
        ("Stress Level", or_not_specified(profile.stress_level.clone())),
        ("Sleep Quality", or_not_specified(profile.sleep_quality.clone())),
        ("Diet", or_not_specified(profile.diet_notes.clone())),
        ("Current Routine", or_not_specified(profile.current_routine.clone())),
        ("Additional Notes", or_not_specified(profile.additional_notes.clone())),
    ];

    fields
        .iter()
        .map(|(label, value)| format!("- {}: {}\n", label, value))
        .collect()
}

fn or_not_specified(value: Option<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => NOT_SPECIFIED.to_string(),
    }
}

fn list_or_not_specified(values: Option<&[String]>) -> String {
    let joined = values
        .unwrap_or_default()
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    or_not_specified(Some(joined))
}
