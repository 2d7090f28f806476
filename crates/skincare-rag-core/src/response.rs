//! Parsing of semi-trusted model output into a [`Recommendation`].
//!
//! Model text is never trusted to be clean JSON. A fixed, ordered list of
//! [`ExtractionStrategy`]s each proposes a candidate substring; the first
//! candidate that parses as a JSON object wins. Fields are then decoded
//! permissively, and `sources` is always replaced with the set the caller
//! retrieved.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{DegradedCause, Recommendation};

const LOG_PREVIEW_CHARS: usize = 1000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("model response is empty")]
    Empty,
    #[error("no JSON object found in model response ({tried} candidates tried)")]
    NoJsonObject { tried: usize },
}

/// Ways of locating a JSON object inside free text, in the order tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// From the first `{` to the last `}`.
    BracketSpan,
    /// Between the first code fence (language tag optional) and the next
    /// closing fence, or the end of text when unterminated.
    FencedBlock,
    /// The whole trimmed text.
    Verbatim,
}

impl ExtractionStrategy {
    pub const ORDER: [ExtractionStrategy; 3] = [
        ExtractionStrategy::BracketSpan,
        ExtractionStrategy::FencedBlock,
        ExtractionStrategy::Verbatim,
    ];

    pub fn extract<'a>(&self, raw: &'a str) -> Option<&'a str> {
        match self {
            ExtractionStrategy::BracketSpan => {
                let start = raw.find('{')?;
                let end = raw.rfind('}')?;
                (end > start).then(|| &raw[start..=end])
            }
            ExtractionStrategy::FencedBlock => fenced_block(raw),
            ExtractionStrategy::Verbatim => {
                let trimmed = raw.trim();
                (!trimmed.is_empty()).then_some(trimmed)
            }
        }
    }
}

fn fenced_block(raw: &str) -> Option<&str> {
    const FENCE: &str = "```";
    let open = raw.find(FENCE)?;
    let mut body = &raw[open + FENCE.len()..];

    // Skip a language tag such as `json` when it sits alone on the fence line.
    if let Some(newline) = body.find('\n') {
        let tag = body[..newline].trim();
        if tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            body = &body[newline + 1..];
        }
    }

    let inner = match body.find(FENCE) {
        Some(close) => &body[..close],
        None => body,
    };
    let inner = inner.trim();
    (!inner.is_empty()).then_some(inner)
}

/// Parse `raw`, or report why no JSON object could be recovered.
pub fn try_parse_response(
    raw: &str,
    known_sources: &BTreeSet<String>,
) -> Result<Recommendation, ParseError> {
    if raw.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let mut tried = 0;
    for strategy in ExtractionStrategy::ORDER {
        let Some(candidate) = strategy.extract(raw) else {
            continue;
        };
        tried += 1;
        match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Object(object)) => {
                tracing::debug!(?strategy, "extracted JSON object from model response");
                return Ok(decode(&object, known_sources));
            }
            Ok(_) => tracing::debug!(?strategy, "candidate is JSON but not an object"),
            Err(e) => tracing::debug!(?strategy, error = %e, "candidate is not valid JSON"),
        }
    }
    Err(ParseError::NoJsonObject { tried })
}

/// Parse `raw`, degrading to fixed markers when no JSON object is found.
pub fn parse_response(raw: &str, known_sources: &BTreeSet<String>) -> Recommendation {
    match try_parse_response(raw, known_sources) {
        Ok(recommendation) => recommendation,
        Err(e) => {
            let preview: String = raw.chars().take(LOG_PREVIEW_CHARS).collect();
            tracing::error!(
                error = %e,
                raw_len = raw.len(),
                preview = %preview,
                "failed to parse model response"
            );
            Recommendation::degraded(DegradedCause::UnparseableResponse, known_sources.clone())
        }
    }
}

fn decode(object: &Map<String, Value>, known_sources: &BTreeSet<String>) -> Recommendation {
    Recommendation {
        morning_routine: decode_list(object.get("morning_routine")),
        evening_routine: decode_list(object.get("evening_routine")),
        lifestyle_tips: decode_list(object.get("lifestyle_tips")),
        remedies: decode_list(object.get("remedies")),
        sources: known_sources.clone(),
        warnings: Some(decode_list(object.get("warnings"))),
    }
}

fn decode_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}
