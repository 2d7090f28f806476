//! Turn a [`UserProfile`] into the text used for similarity retrieval.

use crate::models::UserProfile;

/// Render the retrieval query for `profile`.
///
/// Clauses appear in a fixed order and only when their source is present:
/// `skin type <type>`, `concerns <terms>`, `allergies <text>`,
/// `natural skincare`.
///
/// ```rust
/// use skincare_rag_core::models::{SkinConcern, SkinType, UserProfile};
/// use skincare_rag_core::query::format_query;
///
/// let profile = UserProfile::new(SkinType::Oily, [SkinConcern::Acne, SkinConcern::DarkSpots]);
/// assert_eq!(format_query(&profile), "skin type oily concerns acne dark spots");
/// ```
pub fn format_query(profile: &UserProfile) -> String {
    let mut clauses = vec![format!("skin type {}", profile.skin_type)];

    if !profile.concerns.is_empty() {
        let terms: Vec<&str> = profile.concerns.iter().map(|c| c.term()).collect();
        clauses.push(format!("concerns {}", terms.join(" ")));
    }

    if let Some(allergies) = profile.allergies.as_deref().map(str::trim) {
        if !allergies.is_empty() {
            clauses.push(format!("allergies {}", allergies));
        }
    }

    if profile.prefers_natural {
        clauses.push("natural skincare".to_string());
    }

    clauses.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SkinConcern, SkinType};

    #[test]
    fn test_all_clauses_in_order() {
        let mut profile = UserProfile::new(SkinType::Sensitive, [SkinConcern::Redness]);
        profile.allergies = Some("  fragrance ".to_string());
        profile.prefers_natural = true;
        assert_eq!(
            format_query(&profile),
            "skin type sensitive concerns redness allergies fragrance natural skincare"
        );
    }

    #[test]
    fn test_blank_allergies_and_no_concerns_are_omitted() {
        let mut profile = UserProfile::new(SkinType::Normal, []);
        profile.allergies = Some("   ".to_string());
        assert_eq!(format_query(&profile), "skin type normal");
    }

    #[test]
    fn test_concerns_follow_enumeration_order() {
        let profile = UserProfile::new(
            SkinType::Dry,
            [SkinConcern::UnevenTexture, SkinConcern::Acne, SkinConcern::LargePores],
        );
        assert_eq!(
            format_query(&profile),
            "skin type dry concerns acne large pores uneven texture"
        );
    }
}
