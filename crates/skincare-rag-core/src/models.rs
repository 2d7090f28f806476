//! Core data models used throughout skincare-rag.
//!
//! These types represent the source documents, chunks, user profiles and
//! recommendations that flow through the indexing and generation pipeline.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Marker placed in every category when retrieval found nothing to ground on.
pub const NO_RELIABLE_INFORMATION: &str = "No reliable information found in documents";

/// Marker placed in every category of a degraded recommendation.
pub const ERROR_PROCESSING: &str = "Error processing recommendations";

/// Warning attached to the insufficient-information recommendation.
pub const INSUFFICIENT_INFORMATION_WARNING: &str =
    "Insufficient information available - consult a dermatologist";

/// A source document after text extraction, before chunking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Stable identifier of the document (path relative to the corpus root).
    pub source_id: String,
    /// Cleaned plain text.
    pub text: String,
}

/// A bounded segment of one source document.
///
/// Chunks are immutable once created. `overlap` counts the leading
/// characters of `text` that repeat the tail of the previous chunk of the
/// same document, so [`Chunk::fresh_text`] of consecutive chunks concatenates
/// back to the original document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source_id: String,
    pub sequence_index: usize,
    pub sibling_count: usize,
    #[serde(default)]
    pub overlap: usize,
}

impl Chunk {
    /// The part of the chunk not shared with its predecessor.
    pub fn fresh_text(&self) -> &str {
        match self.text.char_indices().nth(self.overlap) {
            Some((idx, _)) => &self.text[idx..],
            None => "",
        }
    }
}

/// A chunk together with its embedding vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// A retrieved chunk and its similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Primary skin type reported by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkinType {
    Oily,
    Dry,
    Sensitive,
    Combination,
    Normal,
}

impl SkinType {
    pub const ALL: [SkinType; 5] = [
        SkinType::Oily,
        SkinType::Dry,
        SkinType::Sensitive,
        SkinType::Combination,
        SkinType::Normal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkinType::Oily => "oily",
            SkinType::Dry => "dry",
            SkinType::Sensitive => "sensitive",
            SkinType::Combination => "combination",
            SkinType::Normal => "normal",
        }
    }
}

impl fmt::Display for SkinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkinType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| {
                format!(
                    "unknown skin type '{}': expected one of oily, dry, sensitive, combination, normal",
                    s
                )
            })
    }
}

/// A skin concern drawn from the fixed questionnaire enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkinConcern {
    Acne,
    Pigmentation,
    Wrinkles,
    Dullness,
    DarkSpots,
    Redness,
    LargePores,
    UnevenTexture,
}

impl SkinConcern {
    pub const ALL: [SkinConcern; 8] = [
        SkinConcern::Acne,
        SkinConcern::Pigmentation,
        SkinConcern::Wrinkles,
        SkinConcern::Dullness,
        SkinConcern::DarkSpots,
        SkinConcern::Redness,
        SkinConcern::LargePores,
        SkinConcern::UnevenTexture,
    ];

    /// Wire identifier (`dark_spots`).
    pub fn as_str(&self) -> &'static str {
        match self {
            SkinConcern::Acne => "acne",
            SkinConcern::Pigmentation => "pigmentation",
            SkinConcern::Wrinkles => "wrinkles",
            SkinConcern::Dullness => "dullness",
            SkinConcern::DarkSpots => "dark_spots",
            SkinConcern::Redness => "redness",
            SkinConcern::LargePores => "large_pores",
            SkinConcern::UnevenTexture => "uneven_texture",
        }
    }

    /// Natural-language term (`dark spots`), used in queries and prompts.
    pub fn term(&self) -> &'static str {
        match self {
            SkinConcern::DarkSpots => "dark spots",
            SkinConcern::LargePores => "large pores",
            SkinConcern::UnevenTexture => "uneven texture",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for SkinConcern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkinConcern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("unknown skin concern '{}'", s))
    }
}

/// Questionnaire answers for a single recommendation request.
///
/// Only `skin_type` and `concerns` are required; every other field is
/// optional free text (or a free-text list).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub skin_type: SkinType,
    pub concerns: BTreeSet<SkinConcern>,
    pub allergies: Option<String>,
    pub sensitive_ingredients: Option<Vec<String>>,
    #[serde(default)]
    pub prefers_natural: bool,
    pub budget_range: Option<String>,
    pub product_preferences: Option<Vec<String>>,
    pub sun_exposure: Option<String>,
    pub stress_level: Option<String>,
    pub sleep_quality: Option<String>,
    pub diet_notes: Option<String>,
    pub current_routine: Option<String>,
    pub additional_notes: Option<String>,
}

impl UserProfile {
    /// A profile with only the required fields set.
    pub fn new(skin_type: SkinType, concerns: impl IntoIterator<Item = SkinConcern>) -> Self {
        Self {
            skin_type,
            concerns: concerns.into_iter().collect(),
            allergies: None,
            sensitive_ingredients: None,
            prefers_natural: false,
            budget_range: None,
            product_preferences: None,
            sun_exposure: None,
            stress_level: None,
            sleep_quality: None,
            diet_notes: None,
            current_routine: None,
            additional_notes: None,
        }
    }

    /// One-line summary, e.g. `User with oily skin type, primary concerns: acne, redness`.
    pub fn summary(&self) -> String {
        let concerns = self
            .concerns
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "User with {} skin type, primary concerns: {}",
            self.skin_type, concerns
        )
    }
}

/// Why a recommendation was degraded to fixed markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradedCause {
    /// The model answered, but no JSON object could be recovered.
    UnparseableResponse,
    /// Retrieval or generation failed before a response existed.
    SystemError,
}

impl DegradedCause {
    pub fn advisory(&self) -> &'static str {
        match self {
            DegradedCause::UnparseableResponse => {
                "Error in recommendation generation - consult a dermatologist"
            }
            DegradedCause::SystemError => "System error - consult a dermatologist",
        }
    }
}

/// A structured skincare recommendation.
///
/// `sources` always holds `source_id`s of the chunks retrieved for the
/// request; it is never taken from model output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub morning_routine: Vec<String>,
    pub evening_routine: Vec<String>,
    pub lifestyle_tips: Vec<String>,
    pub remedies: Vec<String>,
    pub sources: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
}

impl Recommendation {
    /// The fixed result returned when retrieval yields no context.
    pub fn insufficient_information() -> Self {
        Self::filled(
            NO_RELIABLE_INFORMATION,
            BTreeSet::new(),
            INSUFFICIENT_INFORMATION_WARNING,
        )
    }

    /// The fully-degraded result: every category carries [`ERROR_PROCESSING`].
    pub fn degraded(cause: DegradedCause, sources: BTreeSet<String>) -> Self {
        Self::filled(ERROR_PROCESSING, sources, cause.advisory())
    }

    fn filled(marker: &str, sources: BTreeSet<String>, warning: &str) -> Self {
        Self {
            morning_routine: vec![marker.to_string()],
            evening_routine: vec![marker.to_string()],
            lifestyle_tips: vec![marker.to_string()],
            remedies: vec![marker.to_string()],
            sources,
            warnings: Some(vec![warning.to_string()]),
        }
    }

    /// True when every category holds only the degraded marker.
    pub fn is_degraded(&self) -> bool {
        self.categories()
            .iter()
            .all(|items| items.len() == 1 && items[0] == ERROR_PROCESSING)
    }

    /// Keep at most `max` entries per category. Sources and warnings are untouched.
    pub fn truncate_categories(&mut self, max: usize) {
        self.morning_routine.truncate(max);
        self.evening_routine.truncate(max);
        self.lifestyle_tips.truncate(max);
        self.remedies.truncate(max);
    }

    fn categories(&self) -> [&Vec<String>; 4] {
        [
            &self.morning_routine,
            &self.evening_routine,
            &self.lifestyle_tips,
            &self.remedies,
        ]
    }
}
